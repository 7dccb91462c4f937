//! HTTP transport: turns batches of queries into wire requests, runs them
//! under a concurrency ceiling and decodes the responses.
//!
//! Every stream opened for a batch is registered in that batch's
//! [`StreamRegistry`] and closed exactly once when the batch settles.
//!
//! Writes are not atomic. When one upload of a batch fails, uploads that
//! already completed stay committed on the server; the caller only sees the
//! error.

pub mod assembler;
pub mod classify;
pub mod delimited;
pub mod dispatcher;
pub mod request;
pub mod sender;
pub mod temp_table;
pub mod wire;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::models::{Attachment, Query, QueryResult, Server};
use crate::streams::StreamRegistry;
use crate::timeouts::TransportOptions;

pub use dispatcher::dispatch;
pub use request::RequestBuilder;
pub use sender::{HttpSender, ReqwestSender};
pub use wire::{TransportFailure, WireBody, WirePart, WireRequest, WireResponse};

use classify::{check_response, classify_failure, read_body};
use request::{read_temp_tables, write_targets};

/// Executes batches of read and write queries.
///
/// A process-based implementation can stand in for [`HttpTransport`] behind
/// this trait; both return the same result types.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run read queries, returning one result per query in input order.
    async fn read(&self, queries: &[Query], concurrency: usize) -> Result<Vec<QueryResult>>;

    /// Run write queries one after another. Each query's uploads run in
    /// parallel; the inner vector has one entry per upload.
    async fn write(&self, queries: &[Query], concurrency: usize) -> Result<Vec<Vec<bool>>>;
}

/// [`Transport`] over ClickHouse's HTTP interface.
pub struct HttpTransport {
    sender: Arc<dyn HttpSender>,
    requests: RequestBuilder,
}

impl HttpTransport {
    /// Transport backed by a pooled `reqwest` client.
    pub fn new(options: TransportOptions) -> Result<Self> {
        let sender = ReqwestSender::new(&options.timeouts)?;
        Ok(Self::with_sender(Arc::new(sender), options))
    }

    /// Transport using a custom sender.
    pub fn with_sender(sender: Arc<dyn HttpSender>, options: TransportOptions) -> Self {
        Self {
            sender,
            requests: RequestBuilder::new(&options),
        }
    }

    async fn send(&self, server: &Server, request: WireRequest) -> Result<WireResponse> {
        self.sender
            .send(request)
            .await
            .map_err(|failure| classify_failure(server, failure))
    }

    async fn read_unit(&self, query: &Query, registry: &StreamRegistry) -> Result<QueryResult> {
        let request = self.requests.read_request(query, registry)?;
        let response = self.send(query.server(), request).await?;
        let response = check_response(query, response).await?;
        assembler::assemble(query, response).await
    }

    async fn write_unit(
        &self,
        query: &Query,
        attachment: Option<&Attachment>,
        registry: &StreamRegistry,
    ) -> Result<bool> {
        let request = self.requests.write_request(query, attachment, registry)?;
        let response = self.send(query.server(), request).await?;
        let response = check_response(query, response).await?;
        read_body(response.body).await?;
        Ok(true)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn read(&self, queries: &[Query], concurrency: usize) -> Result<Vec<QueryResult>> {
        // Reject malformed queries before anything goes on the wire.
        for query in queries {
            read_temp_tables(query)?;
        }

        let start = Instant::now();
        let registry = StreamRegistry::new();
        let units: Box<dyn Iterator<Item = BoxFuture<'_, Result<QueryResult>>> + Send + '_> =
            Box::new(queries.iter()
            .map(|query| -> BoxFuture<'_, Result<QueryResult>> {
                Box::pin(self.read_unit(query, &registry))
            }));
        let outcome = dispatch(units, concurrency).await;
        registry.close_all();

        debug!(
            "[CH_READ] {} queries settled in {} ms (ok={})",
            queries.len(),
            start.elapsed().as_millis(),
            outcome.is_ok()
        );
        outcome
    }

    async fn write(&self, queries: &[Query], concurrency: usize) -> Result<Vec<Vec<bool>>> {
        let mut written = Vec::with_capacity(queries.len());

        for query in queries {
            let start = Instant::now();
            let registry = StreamRegistry::new();
            let targets = write_targets(query);
            let uploads = targets.len();
            let units: Box<dyn Iterator<Item = BoxFuture<'_, Result<bool>>> + Send + '_> =
                Box::new(targets.into_iter()
                .map(|attachment| -> BoxFuture<'_, Result<bool>> {
                    Box::pin(self.write_unit(query, attachment, &registry))
                }));
            let outcome = dispatch(units, concurrency).await;
            registry.close_all();

            let statuses = outcome?;
            info!(
                "[CH_WRITE] {} upload(s) to {} done in {} ms",
                uploads,
                query.server().host,
                start.elapsed().as_millis()
            );
            written.push(statuses);
        }

        Ok(written)
    }
}
