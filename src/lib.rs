//! SOCKS4/4a client connector.
//!
//! Opens TCP tunnels through a SOCKS4 or SOCKS4a proxy. The resulting stream
//! behaves as if it were connected straight to the target.

pub mod cli;
pub mod common;
pub mod config;
pub mod connectors;
pub mod error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use common::{BoxedStream, IoStream, dns::Resolver, socks::ProtocolVersion};
pub use config::Config;
pub use connectors::{Connector, DirectConnector, SocksConfig, SocksConnector};
pub use error::ConnectError;
