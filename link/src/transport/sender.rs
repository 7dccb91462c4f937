//! The seam between request building and the HTTP client.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::time::Instant;

use super::wire::{PartContent, TransportFailure, WireBody, WirePart, WireRequest, WireResponse};
use crate::error::{LinkError, Result};
use crate::timeouts::TransportTimeouts;

/// Executes one wire request.
///
/// Implementations must not retry; a failed attempt is reported as a
/// [`TransportFailure`] and classified by the transport.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: WireRequest) -> std::result::Result<WireResponse, TransportFailure>;
}

/// [`HttpSender`] backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    pub fn new(timeouts: &TransportTimeouts) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            // Keep-alive connections reduce TCP handshake overhead across a batch
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(std::time::Duration::from_secs(90));
        if !TransportTimeouts::is_no_timeout(timeouts.connect_timeout) {
            builder = builder.connect_timeout(timeouts.connect_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| LinkError::Configuration(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn build_form(parts: Vec<WirePart>) -> Form {
    parts.into_iter().fold(Form::new(), |form, part| {
        let mut body = match part.content {
            PartContent::Text(text) => Part::text(text),
            PartContent::Stream(stream) => Part::stream(Body::wrap_stream(stream.body_stream())),
        };
        if let Some(file_name) = part.file_name {
            body = body.file_name(file_name);
        }
        form.part(part.name, body)
    })
}

fn failure_from_reqwest(err: reqwest::Error) -> TransportFailure {
    // `send` only fails before a response arrives; builder and body errors are
    // local problems rather than connectivity ones.
    if err.is_builder() || err.is_body() {
        TransportFailure::Other(err.into())
    } else {
        TransportFailure::NoResponse(err.to_string())
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn send(&self, request: WireRequest) -> std::result::Result<WireResponse, TransportFailure> {
        let WireRequest {
            url,
            headers,
            body,
            timeout,
        } = request;

        let host = url.host_str().unwrap_or_default().to_string();
        let mut builder = self.client.post(url).headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder = match body {
            WireBody::Bytes(bytes) => builder.body(bytes),
            WireBody::Stream(stream) => builder.body(Body::wrap_stream(stream.body_stream())),
            WireBody::Multipart(parts) => builder.multipart(build_form(parts)),
        };

        let start = Instant::now();
        let response = builder.send().await.map_err(failure_from_reqwest)?;
        debug!(
            "[CH_HTTP] Response from {}: status={} duration_ms={}",
            host,
            response.status(),
            start.elapsed().as_millis()
        );

        Ok(WireResponse {
            status: response.status(),
            headers: response.headers().clone(),
            body: Box::pin(response.bytes_stream().map_err(LinkError::from)),
        })
    }
}
