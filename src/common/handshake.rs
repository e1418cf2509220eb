//! Request/response exchange over an already connected proxy stream.
//!
//! The stream moves through `Idle -> RequestSent -> AwaitingResponse` and
//! ends up either handed back to the caller (granted) or shut down and dropped.

use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    time::timeout,
};
use tracing::{debug, trace};

use super::{
    deadline::MIN_BUDGET,
    reader::read_exact,
    socks::{ResolvedTarget, SOCKS_RESPONSE_LEN, SocksResponse, decode_response, encode_request},
};
use crate::error::ConnectError;

/// Runs the SOCKS4 handshake within `budget`.
///
/// On success the stream is returned untouched past the 8 byte reply, so
/// anything the target sends right away is still readable. On failure the
/// stream is shut down once and dropped before the error is returned.
pub async fn negotiate<S>(
    mut stream: S,
    target: &ResolvedTarget,
    port: u16,
    budget: Duration,
) -> Result<S, ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let budget = budget.max(MIN_BUDGET);
    let ret = match timeout(budget, exchange(&mut stream, target, port)).await {
        Ok(ret) => ret,
        Err(_) => Err(ConnectError::HandshakeTimeout),
    };
    match ret {
        Ok(resp) => {
            trace!("socks session established to {}:{}, bound {}:{}", target, port, resp.ip, resp.port);
            Ok(stream)
        }
        Err(e) => {
            debug!("socks handshake to {}:{} failed: {}", target, port, e);
            close(stream).await;
            Err(e)
        }
    }
}

async fn exchange<S>(
    stream: &mut S,
    target: &ResolvedTarget,
    port: u16,
) -> Result<SocksResponse, ConnectError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = encode_request(target, port);
    trace!("socks request: {:?}", &request[..]);
    stream.write_all(&request).await.map_err(ConnectError::Io)?;
    stream.flush().await.map_err(ConnectError::Io)?;

    // a complete reply wins over an EOF that follows it
    let reply = read_exact::<SOCKS_RESPONSE_LEN, _>(stream).await?;
    trace!("socks response: {:?}", reply);
    decode_response(&reply)
}

async fn close<S: AsyncWrite + Unpin>(mut stream: S) {
    match timeout(MIN_BUDGET, stream.shutdown()).await {
        Ok(Err(e)) => trace!("shutdown: {}", e),
        Err(_) => trace!("shutdown timed out"),
        Ok(Ok(())) => {}
    }
}
