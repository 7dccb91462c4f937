//! Wire-level request and response values exchanged with an [`HttpSender`].
//!
//! [`HttpSender`]: super::sender::HttpSender

use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::time::Duration;

use crate::error::{LinkError, Result};
use crate::streams::TrackedStream;

/// Response body as a stream of chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// One `POST` to a ClickHouse server.
#[derive(Debug)]
pub struct WireRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: WireBody,
    pub timeout: Option<Duration>,
}

impl WireRequest {
    /// Value of a query-string parameter, if present.
    pub fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Debug)]
pub enum WireBody {
    /// SQL text, possibly gzip-encoded.
    Bytes(Bytes),
    /// An attached source streamed as the whole body.
    Stream(TrackedStream),
    /// `multipart/form-data` with a `query` part and one part per temp table.
    Multipart(Vec<WirePart>),
}

#[derive(Debug)]
pub struct WirePart {
    pub name: String,
    pub file_name: Option<String>,
    pub content: PartContent,
}

#[derive(Debug)]
pub enum PartContent {
    Text(String),
    Stream(TrackedStream),
}

/// A received HTTP response with a not-yet-consumed body.
pub struct WireResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl std::fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Why a request attempt produced no usable response.
#[derive(Debug)]
pub enum TransportFailure {
    /// Nothing came back: DNS failure, refused connection, timeout.
    NoResponse(String),
    /// Any other failure; surfaced to the caller unchanged.
    Other(LinkError),
}
