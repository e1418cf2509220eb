use tokio::io::{AsyncRead, AsyncWrite};

pub mod deadline;
pub mod dns;
pub mod handshake;
pub mod policy;
pub mod reader;
pub mod socks;

#[cfg(test)]
pub mod mocks;

pub trait IoStream: AsyncRead + AsyncWrite + Send + Sync + Unpin {}
impl<T> IoStream for T where T: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

pub type BoxedStream = Box<dyn IoStream>;

pub fn make_boxed_stream<T: IoStream + 'static>(stream: T) -> BoxedStream {
    Box::new(stream)
}
