use std::{
    collections::{HashMap, VecDeque},
    io::{Error as IoError, ErrorKind, Result as IoResult},
    net::Ipv4Addr,
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf},
    task::JoinHandle,
};

use super::{BoxedStream, IoStream, dns::Resolver, make_boxed_stream};
use crate::connectors::Connector;

// --- TrackedStream ---
/// Counts completed shutdowns of the wrapped stream.
pub struct TrackedStream<T> {
    inner: T,
    shutdowns: Arc<AtomicUsize>,
}

#[derive(Clone)]
pub struct ShutdownCounter(Arc<AtomicUsize>);

impl ShutdownCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<T: IoStream> TrackedStream<T> {
    pub fn new(inner: T) -> (Self, ShutdownCounter) {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        (
            Self {
                inner,
                shutdowns: shutdowns.clone(),
            },
            ShutdownCounter(shutdowns),
        )
    }
}

impl<T: IoStream> AsyncRead for TrackedStream<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<IoResult<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: IoStream> AsyncWrite for TrackedStream<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<IoResult<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }
    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }
    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<IoResult<()>> {
        let ret = Pin::new(&mut self.inner).poll_shutdown(cx);
        if ret.is_ready() {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        ret
    }
}

// --- MockConnector ---
pub enum Dial {
    Stream(BoxedStream),
    Fail(ErrorKind),
    Hang,
}

impl From<DuplexStream> for Dial {
    fn from(stream: DuplexStream) -> Self {
        Dial::Stream(make_boxed_stream(stream))
    }
}

#[derive(Default)]
pub struct MockConnector {
    dials: Mutex<VecDeque<Dial>>,
    calls: Mutex<Vec<(String, u16)>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(dial: impl Into<Dial>) -> Self {
        let ret = Self::new();
        ret.push(dial);
        ret
    }
    pub fn push(&self, dial: impl Into<Dial>) {
        self.dials.lock().unwrap().push_back(dial.into());
    }
    pub fn calls(&self) -> Vec<(String, u16)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Error = IoError;

    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self, host: &str, port: u16) -> Result<BoxedStream, IoError> {
        self.calls.lock().unwrap().push((host.to_owned(), port));
        let dial = self.dials.lock().unwrap().pop_front();
        match dial {
            Some(Dial::Stream(stream)) => Ok(stream),
            Some(Dial::Fail(kind)) => Err(IoError::new(kind, "mock dial failure")),
            Some(Dial::Hang) => std::future::pending().await,
            None => Err(IoError::new(ErrorKind::NotFound, "no more mock streams")),
        }
    }
}

// --- MockResolver ---
#[derive(Default)]
pub struct MockResolver {
    records: HashMap<String, Ipv4Addr>,
    hang: bool,
    calls: AtomicUsize,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_record(mut self, host: &str, ip: Ipv4Addr) -> Self {
        self.records.insert(host.to_owned(), ip);
        self
    }
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    type Error = IoError;

    async fn resolve(&self, host: &str) -> Result<Ipv4Addr, IoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            return std::future::pending().await;
        }
        self.records
            .get(host)
            .copied()
            .ok_or_else(|| IoError::new(ErrorKind::NotFound, format!("no record for {}", host)))
    }
}

// --- Fake SOCKS4 server ---
pub const GRANTED: [u8; 8] = [0, 0x5a, 0, 0x50, 0, 0, 0, 0];

async fn read_until_nul(io: &mut DuplexStream, buf: &mut Vec<u8>) -> IoResult<()> {
    loop {
        let b = io.read_u8().await?;
        buf.push(b);
        if b == 0 {
            return Ok(());
        }
    }
}

/// Reads one request off the wire, including the 4a hostname if present.
pub async fn read_request(io: &mut DuplexStream) -> IoResult<Vec<u8>> {
    let mut req = vec![0u8; 8];
    io.read_exact(&mut req).await?;
    read_until_nul(io, &mut req).await?;
    if req[4..7] == [0, 0, 0] && req[7] != 0 {
        read_until_nul(io, &mut req).await?;
    }
    Ok(req)
}

/// Answers one handshake per entry of `replies`, then echoes until EOF.
///
/// Stops answering after the first reply that is not a grant. Resolves to the
/// requests it received.
pub fn spawn_fake_proxy(mut io: DuplexStream, replies: Vec<[u8; 8]>) -> JoinHandle<Vec<Vec<u8>>> {
    tokio::spawn(async move {
        let mut requests = Vec::new();
        for reply in replies {
            let Ok(req) = read_request(&mut io).await else {
                return requests;
            };
            requests.push(req);
            if io.write_all(&reply).await.is_err() || reply[1] != 0x5a {
                break;
            }
        }
        let (mut r, mut w) = tokio::io::split(io);
        let _ = tokio::io::copy(&mut r, &mut w).await;
        requests
    })
}
