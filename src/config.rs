use easy_error::{Error, ResultExt};
use serde::{Deserialize, Serialize};

use crate::{
    common::{dns::DnsConfig, socks::ProtocolVersion},
    connectors::{DirectConnector, SocksConfig, SocksConnector},
};

pub type ConfiguredConnector = SocksConnector<DirectConnector, DnsConfig>;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub proxy: SocksConfig,
    #[serde(default)]
    pub dns: DnsConfig,
    #[serde(default)]
    pub direct: DirectConnector,
}

impl Config {
    pub fn new(proxy: SocksConfig) -> Self {
        Self {
            proxy,
            dns: Default::default(),
            direct: Default::default(),
        }
    }

    pub async fn load(path: &str) -> Result<Self, Error> {
        let s = tokio::fs::read(path).await.context("read file")?;
        let s = String::from_utf8(s).context("parse utf8")?;
        Self::parse(&s)
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        serde_yaml_ng::from_str(s).context("parse yaml")
    }

    /// Name servers are only needed when some host may be resolved locally.
    pub fn needs_dns(&self) -> bool {
        self.proxy.version == ProtocolVersion::V4 || self.proxy.resolve_local
    }

    pub fn build(mut self) -> Result<ConfiguredConnector, Error> {
        if self.needs_dns() {
            self.dns.init().context("init dns")?;
        }
        Ok(SocksConnector::new(self.proxy, self.direct, self.dns))
    }
}
