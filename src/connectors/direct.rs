use std::{
    io::{Error as IoError, ErrorKind},
    net::{IpAddr, SocketAddr},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpSocket, lookup_host};
use tracing::{debug, trace};

use crate::common::{BoxedStream, make_boxed_stream};

/// Plain TCP connector, the base case every tunnel is built on.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DirectConnector {
    #[serde(default)]
    bind: Option<IpAddr>,
    #[serde(default = "default_keepalive")]
    keepalive: bool,
}

fn default_keepalive() -> bool {
    true
}

impl Default for DirectConnector {
    fn default() -> Self {
        Self {
            bind: None,
            keepalive: default_keepalive(),
        }
    }
}

impl DirectConnector {
    pub fn new(bind: Option<IpAddr>, keepalive: bool) -> Self {
        Self { bind, keepalive }
    }

    async fn connect_addr(&self, remote: SocketAddr) -> Result<BoxedStream, IoError> {
        let socket = if remote.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if let Some(bind) = self.bind {
            socket.bind(SocketAddr::new(bind, 0))?;
        }
        if self.keepalive {
            socket.set_keepalive(true)?;
        }
        let stream = socket.connect(remote).await?;
        stream.set_nodelay(true)?;
        trace!(
            "connected {} -> {}",
            stream.local_addr()?,
            stream.peer_addr()?
        );
        Ok(make_boxed_stream(stream))
    }
}

#[async_trait]
impl super::Connector for DirectConnector {
    type Error = IoError;

    fn name(&self) -> &str {
        "direct"
    }

    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, IoError> {
        let mut last_err = None;
        for remote in lookup_host((host, port)).await? {
            // a bound socket can only reach its own address family
            if self
                .bind
                .is_some_and(|bind| bind.is_ipv4() != remote.is_ipv4())
            {
                continue;
            }
            match self.connect_addr(remote).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("connect to {} failed: {}", remote, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            IoError::new(
                ErrorKind::AddrNotAvailable,
                format!("no usable address for {}:{}", host, port),
            )
        }))
    }
}
