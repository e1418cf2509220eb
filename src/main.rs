use easy_error::{Terminator, bail};
use socks4_connector::{cli, connectors::Connector};
use tokio::io::AsyncWriteExt;
use tracing::{info, trace, warn};

#[tokio::main]
async fn main() -> Result<(), Terminator> {
    let args = cli::parse_args()?;
    let cfg = args.load_config().await?;
    trace!("config={:?}", cfg);
    let socks = cfg.build()?;

    if args.config_test {
        info!("config OK: {}", socks.name());
        return Ok(());
    }
    if args.targets.is_empty() {
        bail!("no targets given");
    }

    let mut failed = 0;
    for (host, port) in &args.targets {
        match socks.connect(host, *port).await {
            Ok(mut stream) => {
                info!("connection to {}:{} OK", host, port);
                if let Err(e) = stream.shutdown().await {
                    trace!("shutdown: {}", e);
                }
            }
            Err(e) => {
                failed += 1;
                warn!("connection to {}:{} failed: {}", host, port, e);
                let mut cause = std::error::Error::source(&e);
                while let Some(c) = cause {
                    warn!("  caused by: {}", c);
                    cause = std::error::Error::source(c);
                }
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} connections failed", failed, args.targets.len());
    }
    Ok(())
}
