use std::sync::Arc;

use async_trait::async_trait;

use crate::common::BoxedStream;

pub mod direct;
pub mod socks;

pub use direct::DirectConnector;
pub use socks::{SocksConfig, SocksConnector};

/// Opens a byte stream to `host:port`.
///
/// [`SocksConnector`] both consumes and implements this trait, so tunnels can
/// be layered over any other connector.
#[async_trait]
pub trait Connector: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, Self::Error>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<C: Connector + ?Sized> Connector for Arc<C> {
    type Error = C::Error;

    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, Self::Error> {
        (**self).connect(host, port).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
