use std::{fmt::Display, net::Ipv4Addr, str::FromStr};

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

pub const SOCKS_VER_4: u8 = 4u8;
pub const SOCKS_CMD_CONNECT: u8 = 1u8;
pub const SOCKS_REPLY_VERSION: u8 = 0u8;
pub const SOCKS_REPLY_GRANTED: u8 = 0x5au8;
pub const SOCKS_REPLY_REJECTED: u8 = 0x5bu8;
pub const SOCKS_REPLY_NO_IDENTD: u8 = 0x5cu8;
pub const SOCKS_REPLY_BAD_IDENTD: u8 = 0x5du8;
pub const SOCKS_RESPONSE_LEN: usize = 8;

/// IP field sent when the hostname follows the request (0.0.0.1).
pub const SOCKS4A_PLACEHOLDER: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolVersion {
    V4,
    #[default]
    V4A,
}

impl FromStr for ProtocolVersion {
    type Err = ConnectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" => Ok(Self::V4),
            "4a" => Ok(Self::V4A),
            _ => Err(ConnectError::InvalidConfiguration(format!(
                "invalid protocol version given: {:?}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = ConnectError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(v: ProtocolVersion) -> Self {
        v.to_string()
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "4"),
            Self::V4A => write!(f, "4a"),
        }
    }
}

/// Destination as it will be written into the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTarget {
    Ip(Ipv4Addr),
    /// Resolution is left to the proxy (SOCKS4A).
    Deferred(String),
}

impl Display for ResolvedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{}", ip),
            Self::Deferred(host) => write!(f, "{} (remote)", host),
        }
    }
}

/// Builds a CONNECT request with an empty user id.
pub fn encode_request(target: &ResolvedTarget, port: u16) -> BytesMut {
    let (ip, host) = match target {
        ResolvedTarget::Ip(ip) => (*ip, None),
        ResolvedTarget::Deferred(host) => (SOCKS4A_PLACEHOLDER, Some(host.as_bytes())),
    };
    let mut buf = BytesMut::with_capacity(9 + host.map_or(0, |h| h.len() + 1));
    buf.put_u8(SOCKS_VER_4);
    buf.put_u8(SOCKS_CMD_CONNECT);
    buf.put_u16(port);
    buf.put_u32(ip.into());
    // user id
    buf.put_u8(0);
    if let Some(host) = host {
        buf.put_slice(host);
        buf.put_u8(0);
    }
    buf
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocksResponse {
    pub status: u8,
    pub port: u16,
    pub ip: Ipv4Addr,
}

impl SocksResponse {
    pub fn granted(&self) -> bool {
        self.status == SOCKS_REPLY_GRANTED
    }
}

/// Parses the reply and fails unless the proxy granted the request.
pub fn decode_response(buf: &[u8; SOCKS_RESPONSE_LEN]) -> Result<SocksResponse, ConnectError> {
    let leading = buf[0];
    let status = buf[1];
    if leading != SOCKS_REPLY_VERSION || status != SOCKS_REPLY_GRANTED {
        return Err(ConnectError::InvalidResponse { leading, status });
    }
    Ok(SocksResponse {
        status,
        port: u16::from_be_bytes([buf[2], buf[3]]),
        ip: Ipv4Addr::new(buf[4], buf[5], buf[6], buf[7]),
    })
}

pub fn status_reason(status: u8) -> &'static str {
    match status {
        SOCKS_REPLY_GRANTED => "request granted",
        SOCKS_REPLY_REJECTED => "request rejected or failed",
        SOCKS_REPLY_NO_IDENTD => "identd unreachable",
        SOCKS_REPLY_BAD_IDENTD => "identd user mismatch",
        _ => "unknown status",
    }
}
