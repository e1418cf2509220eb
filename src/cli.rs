use clap::{ArgAction, ArgMatches, builder::PossibleValuesParser, value_parser};
use easy_error::{Error, ResultExt, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{
    common::socks::ProtocolVersion,
    config::Config,
    connectors::SocksConfig,
};

#[derive(Debug, Clone, Default)]
pub struct AppArgs {
    pub config_file: Option<String>,
    pub config_test: bool,
    pub log_level: String,
    pub server: Option<(String, u16)>,
    pub version: Option<String>,
    pub remote_dns: bool,
    pub timeout: Option<u64>,
    pub targets: Vec<(String, u16)>,
}

fn command() -> clap::Command {
    clap::Command::new("socks4-connect")
        .version(crate::VERSION)
        .about("Opens tunnels through a SOCKS4/4a proxy and reports the outcome")
        .arg(
            clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Config filename")
                .value_parser(value_parser!(String))
                .num_args(1),
        )
        .arg(
            clap::Arg::new("log-level")
                .short('l')
                .long("log")
                .help("Set log level")
                .value_parser(PossibleValuesParser::new([
                    "error", "warn", "info", "debug", "trace",
                ]))
                .num_args(1),
        )
        .arg(
            clap::Arg::new("config-check")
                .short('t')
                .long("test")
                .action(ArgAction::SetTrue)
                .help("Load and check config then exits"),
        )
        .arg(
            clap::Arg::new("server")
                .short('s')
                .long("server")
                .help("Proxy address as HOST:PORT, overrides the config file")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("socks-version")
                .short('v')
                .long("socks-version")
                .help("Protocol version")
                .value_parser(PossibleValuesParser::new(["4", "4a"]))
                .num_args(1),
        )
        .arg(
            clap::Arg::new("remote-dns")
                .short('r')
                .long("remote-dns")
                .action(ArgAction::SetTrue)
                .help("Let the proxy resolve host names (4a only)"),
        )
        .arg(
            clap::Arg::new("timeout")
                .short('T')
                .long("timeout")
                .help("Connect timeout in seconds")
                .value_parser(value_parser!(u64))
                .num_args(1),
        )
        .arg(
            clap::Arg::new("targets")
                .help("Targets as HOST:PORT")
                .num_args(0..)
                .value_name("TARGET"),
        )
}

pub fn parse_args() -> Result<AppArgs, Error> {
    let args = from_matches(command().get_matches())?;
    init_logging(&args.log_level)?;
    Ok(args)
}

pub fn parse_from<I, T>(itr: I) -> Result<AppArgs, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let args = command()
        .try_get_matches_from(itr)
        .context("parse arguments")?;
    from_matches(args)
}

fn from_matches(args: ArgMatches) -> Result<AppArgs, Error> {
    let server = args
        .get_one::<String>("server")
        .map(|s| parse_host_port(s))
        .transpose()?;
    let targets = args
        .get_many::<String>("targets")
        .into_iter()
        .flatten()
        .map(|s| parse_host_port(s))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AppArgs {
        config_file: args.get_one::<String>("config").cloned(),
        config_test: args.get_flag("config-check"),
        log_level: args
            .get_one::<String>("log-level")
            .cloned()
            .unwrap_or_else(|| "info".to_string()),
        server,
        version: args.get_one::<String>("socks-version").cloned(),
        remote_dns: args.get_flag("remote-dns"),
        timeout: args.get_one::<u64>("timeout").copied(),
        targets,
    })
}

/// Splits `host:port`, accepting `[v6]:port` as well.
pub fn parse_host_port(s: &str) -> Result<(String, u16), Error> {
    let Some((host, port)) = s.rsplit_once(':') else {
        bail!("missing port in {:?}", s)
    };
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        bail!("missing host in {:?}", s)
    }
    let port = port
        .parse()
        .with_context(|| format!("bad port in {:?}", s))?;
    Ok((host.to_string(), port))
}

impl AppArgs {
    /// Loads the config file (if any) and applies command line overrides.
    pub async fn load_config(&self) -> Result<Config, Error> {
        let mut cfg = match (&self.config_file, &self.server) {
            (Some(path), _) => Config::load(path).await?,
            (None, Some((host, port))) => Config::new(SocksConfig::new(host.clone(), *port)),
            (None, None) => bail!("either --config or --server is required"),
        };
        self.apply(&mut cfg.proxy)?;
        Ok(cfg)
    }

    pub fn apply(&self, proxy: &mut SocksConfig) -> Result<(), Error> {
        if let Some((host, port)) = &self.server {
            proxy.server = host.clone();
            proxy.port = *port;
        }
        if let Some(version) = &self.version {
            proxy.version = version
                .parse::<ProtocolVersion>()
                .context("socks version")?;
        }
        if self.remote_dns {
            proxy.resolve_local = false;
        }
        if let Some(timeout) = self.timeout {
            proxy.timeout = timeout;
        }
        Ok(())
    }
}

pub fn init_logging(log_level: &str) -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.parse().context("log level")?)
                .from_env()
                .context("RUST_LOG")?,
        )
        .init();
    Ok(())
}
