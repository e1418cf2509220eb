use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
};

use async_trait::async_trait;
use hickory_resolver::{
    ResolveError, TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig},
    name_server::TokioConnectionProvider,
};
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

/// Turns a symbolic host name into an IPv4 address.
#[async_trait]
pub trait Resolver: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, Self::Error>;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    type Error = R::Error;
    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, Self::Error> {
        (**self).resolve(host).await
    }
}

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("resolver not initialized")]
    NotInitialized,
    #[error("failed to set up resolver: {0}")]
    Config(String),
    #[error("lookup of {host} failed")]
    Lookup {
        host: String,
        #[source]
        source: ResolveError,
    },
    #[error("no IPv4 address found for {0}")]
    NoAddress(String),
}

#[derive(Serialize, Deserialize, Clone)]
pub struct DnsConfig {
    #[serde(default = "default_servers")]
    pub servers: String,
    #[serde(skip)]
    resolver: Option<Arc<TokioResolver>>,
}

fn default_servers() -> String {
    "system".to_string()
}

impl std::fmt::Debug for DnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsConfig")
            .field("servers", &self.servers)
            .field("initialized", &self.resolver.is_some())
            .finish()
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        DnsConfig {
            servers: default_servers(),
            resolver: None,
        }
    }
}

impl DnsConfig {
    pub fn new(servers: &str) -> Self {
        DnsConfig {
            servers: servers.to_owned(),
            resolver: None,
        }
    }

    pub fn init(&mut self) -> Result<(), DnsError> {
        let resolver = if self.servers == "system" {
            TokioResolver::builder_tokio()
                .map_err(|e| DnsError::Config(format!("read system configuration: {}", e)))?
                .build()
        } else {
            let config = Self::parse_servers(&self.servers)?;
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
                .build()
        };
        self.resolver = Some(Arc::new(resolver));
        Ok(())
    }

    fn parse_servers(servers: &str) -> Result<ResolverConfig, DnsError> {
        match servers {
            "google" => Ok(ResolverConfig::google()),
            "cloudflare" => Ok(ResolverConfig::cloudflare()),
            _ => {
                let ips = servers
                    .split(',')
                    .map(str::trim)
                    .map(|s| {
                        s.parse::<IpAddr>().map_err(|_| {
                            DnsError::Config(format!("failed to parse DNS server address: {}", s))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
                Ok(ResolverConfig::from_parts(None, vec![], group))
            }
        }
    }
}

#[async_trait]
impl Resolver for DnsConfig {
    type Error = DnsError;

    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, DnsError> {
        let resolver = self.resolver.as_ref().ok_or(DnsError::NotInitialized)?;
        let addr = resolver
            .ipv4_lookup(host)
            .await
            .map_err(|source| DnsError::Lookup {
                host: host.to_owned(),
                source,
            })?
            .into_iter()
            .choose(&mut rand::rng())
            .map(|a| a.0)
            .ok_or_else(|| DnsError::NoAddress(host.to_owned()))?;
        trace!("{} resolved to {}", host, addr);
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_server_list() {
        let config = DnsConfig::parse_servers("1.1.1.1, 8.8.8.8").unwrap();
        assert_eq!(config.name_servers().len(), 4);
        assert!(DnsConfig::parse_servers("not-an-ip").is_err());
    }

    #[tokio::test]
    async fn uninitialized_resolver() {
        let dns = DnsConfig::new("google");
        assert!(matches!(
            dns.resolve("example.com").await,
            Err(DnsError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn named_presets_init() {
        let mut dns = DnsConfig::new("cloudflare");
        dns.init().unwrap();
        assert!(dns.resolver.is_some());
    }
}
