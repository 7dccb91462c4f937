#![allow(dead_code)]
//! Shared test doubles: a scripted in-memory [`HttpSender`] and data sources
//! that count how often their streams are opened and closed.

use async_trait::async_trait;
use bytes::Bytes;
use clickhouse_link::compression::decompress_gzip;
use clickhouse_link::streams::TrackedStream;
use clickhouse_link::transport::wire::{PartContent, TransportFailure, WireBody, WireRequest, WireResponse};
use clickhouse_link::{AttachedSource, HttpSender, HttpTransport, Server, SourceReader, TransportOptions};
use futures_util::{stream, TryStreamExt};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING};
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FAKE_HOST: &str = "fake-ch";

pub fn server() -> Server {
    Server::new(FAKE_HOST).with_credentials("tester", "secret")
}

/// A request as the fake server saw it, with streams drained and gzip undone.
#[derive(Debug, Clone)]
pub struct Captured {
    pub params: BTreeMap<String, String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub parts: Vec<(String, Vec<u8>)>,
}

impl Captured {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// SQL text wherever the request carries it.
    pub fn sql(&self) -> String {
        if let Some(sql) = self.param("query") {
            return sql.to_string();
        }
        if let Some((_, sql)) = self.parts.iter().find(|(name, _)| name == "query") {
            return String::from_utf8_lossy(sql).into_owned();
        }
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub enum Outcome {
    Reply(Reply),
    NoResponse(String),
}

type Handler = Box<dyn Fn(&Captured) -> Outcome + Send + Sync>;

/// Scripted sender that records requests and tracks how many are in flight.
pub struct FakeSender {
    handler: Handler,
    requests: Mutex<Vec<Captured>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeSender {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Captured) -> Outcome + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    /// Sender answering every request with the same reply.
    pub fn replying(reply: Reply) -> Arc<Self> {
        Self::new(move |_| Outcome::Reply(reply.clone()))
    }

    pub fn transport(self: &Arc<Self>, options: TransportOptions) -> HttpTransport {
        HttpTransport::with_sender(Arc::clone(self) as Arc<dyn HttpSender>, options)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn drain(stream: &TrackedStream) -> std::io::Result<Vec<u8>> {
    let chunks: Vec<Bytes> = stream.body_stream().try_collect().await?;
    Ok(chunks.concat())
}

async fn capture(request: WireRequest) -> std::io::Result<Captured> {
    let params = request
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let gzipped = request.headers.contains_key(CONTENT_ENCODING);

    let (body, parts) = match request.body {
        WireBody::Bytes(bytes) => (bytes.to_vec(), Vec::new()),
        WireBody::Stream(stream) => (drain(&stream).await?, Vec::new()),
        WireBody::Multipart(parts) => {
            let mut captured = Vec::new();
            for part in parts {
                let data = match part.content {
                    PartContent::Text(text) => text.into_bytes(),
                    PartContent::Stream(stream) => drain(&stream).await?,
                };
                captured.push((part.name, data));
            }
            (Vec::new(), captured)
        }
    };
    let body = if gzipped { decompress_gzip(&body)? } else { body };

    Ok(Captured {
        params,
        headers: request.headers,
        body,
        parts,
    })
}

#[async_trait]
impl HttpSender for FakeSender {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        let captured = capture(request)
            .await
            .map_err(|e| TransportFailure::Other(e.into()))?;
        let outcome = (self.handler)(&captured);
        self.requests.lock().push(captured);

        let reply = match outcome {
            Outcome::NoResponse(message) => return Err(TransportFailure::NoResponse(message)),
            Outcome::Reply(reply) => reply,
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &reply.headers {
            headers.insert(
                HeaderName::from_static(*name),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        // Split the body so decoders see more than one chunk.
        let bytes = Bytes::from(reply.body);
        let mid = bytes.len() / 2;
        let chunks: Vec<clickhouse_link::Result<Bytes>> =
            vec![Ok(bytes.slice(..mid)), Ok(bytes.slice(mid..))];

        Ok(WireResponse {
            status: StatusCode::from_u16(reply.status).unwrap(),
            headers,
            body: Box::pin(stream::iter(chunks)),
        })
    }
}

/// Counters shared by a [`CountingSource`] and every reader it opens.
#[derive(Debug, Default)]
pub struct StreamCounters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl StreamCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct CountingSource {
    data: String,
    counters: Arc<StreamCounters>,
}

impl CountingSource {
    pub fn new(data: impl Into<String>, counters: &Arc<StreamCounters>) -> Arc<Self> {
        Arc::new(Self {
            data: data.into(),
            counters: Arc::clone(counters),
        })
    }
}

struct CountingReader {
    inner: Cursor<Vec<u8>>,
    counters: Arc<StreamCounters>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for CountingReader {
    fn drop(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl AttachedSource for CountingSource {
    fn open(&self, gzip: bool) -> std::io::Result<SourceReader> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let reader = CountingReader {
            inner: Cursor::new(self.data.clone().into_bytes()),
            counters: Arc::clone(&self.counters),
        };
        if gzip {
            Ok(Box::new(clickhouse_link::compression::gzip_reader(reader)))
        } else {
            Ok(Box::new(reader))
        }
    }
}

pub fn json_body(rows: serde_json::Value, rows_read: u64, bytes_read: u64, elapsed: f64) -> String {
    serde_json::json!({
        "meta": [],
        "data": rows,
        "statistics": { "rows_read": rows_read, "bytes_read": bytes_read, "elapsed": elapsed }
    })
    .to_string()
}
