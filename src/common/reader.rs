use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::error::ConnectError;

/// Reads exactly `N` bytes, however the transport splits them up.
///
/// Every read is capped at the number of bytes still missing, so anything the
/// peer sends after the first `N` bytes stays in the stream.
pub async fn read_exact<const N: usize, IO>(io: &mut IO) -> Result<[u8; N], ConnectError>
where
    IO: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; N];
    let mut filled = 0;
    while filled < N {
        let n = io
            .read(&mut buf[filled..])
            .await
            .map_err(ConnectError::Io)?;
        if n == 0 {
            trace!("eof after {} of {} bytes", filled, N);
            return Err(ConnectError::PrematureClose);
        }
        filled += n;
    }
    Ok(buf)
}
