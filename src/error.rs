use std::io;

use thiserror::Error;

use crate::common::socks::status_reason;

/// Boxed cause carried by the phase-wrapping variants of [`ConnectError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while opening a tunnel through a SOCKS4 proxy.
///
/// Variants that wrap a collaborator failure keep it reachable through
/// [`std::error::Error::source`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConnectError {
    #[error("Unable to connect to socks server")]
    ProxyDialFailed(#[source] BoxError),

    #[error("Unable to resolve remote hostname")]
    ResolutionFailed(#[source] BoxError),

    /// The deadline fired before both the proxy connection and the target
    /// address were available.
    #[error("Timeout while connecting to socks server")]
    ConnectTimeout,

    #[error("Timeout while establishing socks session")]
    HandshakeTimeout,

    #[error("Premature end while establishing socks session")]
    PrematureClose,

    /// The proxy answered with a malformed frame or did not grant the request.
    #[error("Invalid SOCKS response ({})", describe(.leading, .status))]
    InvalidResponse { leading: u8, status: u8 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The host can not be expressed in a SOCKS4/4a request.
    #[error("Target host can not be sent over socks4: {0:?}")]
    InvalidTarget(String),

    #[error("I/O error while establishing socks session")]
    Io(#[source] io::Error),
}

fn describe(leading: &u8, status: &u8) -> String {
    if *leading != 0 {
        format!(
            "reply version {:#04x}, expected 0x00; status {:#04x}",
            leading, status
        )
    } else {
        format!("status {:#04x}: {}", status, status_reason(*status))
    }
}

impl ConnectError {
    /// Status code reported by the proxy, if the failure came from its reply.
    pub fn status(&self) -> Option<u8> {
        match self {
            Self::InvalidResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout | Self::HandshakeTimeout)
    }
}
