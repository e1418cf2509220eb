use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::Connector;
use crate::{
    common::{
        BoxedStream,
        deadline::Deadline,
        dns::Resolver,
        handshake,
        policy::{self, Resolution},
        socks::{ProtocolVersion, ResolvedTarget},
    },
    error::ConnectError,
};

/// PHP's `default_socket_timeout`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SocksConfig {
    pub server: String,
    pub port: u16,
    #[serde(default)]
    pub version: ProtocolVersion,
    #[serde(default = "default_resolve_local")]
    pub resolve_local: bool,
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_resolve_local() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl SocksConfig {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            version: ProtocolVersion::default(),
            resolve_local: default_resolve_local(),
            timeout: default_timeout(),
        }
    }
}

/// Tunnels connections through a SOCKS4/4a proxy reached with `C`.
pub struct SocksConnector<C, R> {
    name: String,
    server: String,
    port: u16,
    version: ProtocolVersion,
    resolve_local: bool,
    timeout: Duration,
    connector: C,
    resolver: R,
}

impl<C, R> SocksConnector<C, R>
where
    C: Connector,
    R: Resolver,
{
    pub fn new(config: SocksConfig, connector: C, resolver: R) -> Self {
        Self {
            name: format!("socks{}://{}:{}", config.version, config.server, config.port),
            server: config.server,
            port: config.port,
            version: config.version,
            resolve_local: config.resolve_local,
            timeout: Duration::from_secs(config.timeout),
            connector,
            resolver,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_resolve_local(&mut self, resolve_local: bool) {
        self.resolve_local = resolve_local;
    }

    /// Accepts `"4"` or `"4a"`; anything else leaves the version unchanged.
    pub fn set_protocol_version(&mut self, version: &str) -> Result<(), ConnectError> {
        self.version = version.parse()?;
        self.name = format!("socks{}://{}:{}", self.version, self.server, self.port);
        Ok(())
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn resolve_local(&self) -> bool {
        self.resolve_local
    }

    async fn resolve(&self, host: &str, resolution: Resolution) -> Result<ResolvedTarget, ConnectError> {
        match resolution {
            Resolution::UseLiteral(ip) => Ok(ResolvedTarget::Ip(ip)),
            Resolution::DeferToProxy => Ok(ResolvedTarget::Deferred(host.to_owned())),
            Resolution::ResolveNow => self
                .resolver
                .resolve(host)
                .await
                .map(ResolvedTarget::Ip)
                .map_err(|e| ConnectError::ResolutionFailed(e.into())),
        }
    }

    async fn dial(&self) -> Result<BoxedStream, ConnectError> {
        trace!("{} connecting to socks server via {}", self.name, self.connector.name());
        self.connector
            .connect(&self.server, self.port)
            .await
            .map_err(|e| ConnectError::ProxyDialFailed(e.into()))
    }
}

#[async_trait]
impl<C, R> Connector for SocksConnector<C, R>
where
    C: Connector,
    R: Resolver,
{
    type Error = ConnectError;

    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, ConnectError> {
        let deadline = Deadline::after(self.timeout);
        let resolution = policy::decide(self.version, host, self.resolve_local)?;
        trace!("{} target {}:{} resolution {:?}", self.name, host, port, resolution);

        // dropping the join cancels whichever side is still pending
        let (stream, target) = deadline
            .run(async { tokio::try_join!(self.dial(), self.resolve(host, resolution)) })
            .await
            .map_err(|_| ConnectError::ConnectTimeout)?
            .inspect_err(|e| debug!("{} failed to reach {}:{}: {}", self.name, host, port, e))?;

        debug!("{} connected, requesting {}:{}", self.name, target, port);
        handshake::negotiate(stream, &target, port, deadline.remaining()).await
    }
}
