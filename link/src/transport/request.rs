//! Turns logical queries into wire requests.
//!
//! A read query becomes exactly one request. A write query becomes one
//! request per attached source, or a single request when nothing is attached.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING};
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;

use super::temp_table;
use super::wire::{PartContent, WireBody, WirePart, WireRequest};
use crate::compression::compress_gzip;
use crate::error::{LinkError, Result};
use crate::models::{Attachment, Format, Query, Server, TempTable};
use crate::streams::StreamRegistry;
use crate::timeouts::{TransportOptions, TransportTimeouts};

/// Builds [`WireRequest`]s according to transport-wide options.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    deflate: bool,
    timeouts: TransportTimeouts,
}

impl RequestBuilder {
    pub fn new(options: &TransportOptions) -> Self {
        Self {
            deflate: options.deflate,
            timeouts: options.timeouts.clone(),
        }
    }

    /// Request for a read query. Temp tables are opened and registered with
    /// `registry`; any other kind of attachment is rejected.
    pub fn read_request(&self, query: &Query, registry: &StreamRegistry) -> Result<WireRequest> {
        let sql = sql_with_format(query.sql(), query.format());
        let tables = read_temp_tables(query)?;

        // Make the server finish the query before answering, so errors get a
        // proper status and the summary header carries final statistics.
        let mut params = vec![("wait_end_of_query".to_string(), "1".to_string())];
        let timeout = request_timeout(self.timeouts.read_timeout);

        if tables.is_empty() {
            let (body, gzipped) = self.sql_body(&sql)?;
            return Ok(WireRequest {
                url: build_url(query.server(), &params, query.settings())?,
                headers: default_headers(gzipped),
                body: WireBody::Bytes(body),
                timeout,
            });
        }

        let mut parts = vec![WirePart {
            name: "query".to_string(),
            file_name: None,
            content: PartContent::Text(sql),
        }];
        for table in tables {
            let (table_params, part) = temp_table::encode(table, registry)?;
            params.extend(table_params);
            parts.push(part);
        }

        Ok(WireRequest {
            url: build_url(query.server(), &params, query.settings())?,
            headers: default_headers(false),
            body: WireBody::Multipart(parts),
            timeout,
        })
    }

    /// Request for a write query, either carrying the SQL itself as the body
    /// or uploading one attached source with the SQL as a parameter.
    pub fn write_request(
        &self,
        query: &Query,
        attachment: Option<&Attachment>,
        registry: &StreamRegistry,
    ) -> Result<WireRequest> {
        let timeout = request_timeout(self.timeouts.write_timeout);

        match attachment {
            None => {
                let (body, gzipped) = self.sql_body(query.sql())?;
                Ok(WireRequest {
                    url: build_url(query.server(), &[], query.settings())?,
                    headers: default_headers(gzipped),
                    body: WireBody::Bytes(body),
                    timeout,
                })
            }
            Some(attachment) => {
                let params = [("query".to_string(), query.sql().to_string())];
                let url = build_url(query.server(), &params, query.settings())?;
                let stream = registry.open(attachment.source().as_ref(), self.deflate)?;
                Ok(WireRequest {
                    url,
                    headers: default_headers(self.deflate),
                    body: WireBody::Stream(stream),
                    timeout,
                })
            }
        }
    }

    fn sql_body(&self, sql: &str) -> Result<(Bytes, bool)> {
        if self.deflate {
            Ok((Bytes::from(compress_gzip(sql.as_bytes())?), true))
        } else {
            Ok((Bytes::from(sql.to_string()), false))
        }
    }
}

/// The temp tables of a read query. Any other kind of attachment is an error.
pub fn read_temp_tables(query: &Query) -> Result<Vec<&TempTable>> {
    query
        .attachments()
        .iter()
        .map(|attachment| {
            attachment.as_temp_table().ok_or_else(|| {
                LinkError::InvalidQuery(format!(
                    "read queries accept only temp tables as attachments: {}",
                    query.sql()
                ))
            })
        })
        .collect()
}

/// What each request of a write query uploads: one entry per attachment, or a
/// single `None` when the SQL itself is the body.
pub fn write_targets(query: &Query) -> Vec<Option<&Attachment>> {
    if query.attachments().is_empty() {
        vec![None]
    } else {
        query.attachments().iter().map(Some).collect()
    }
}

/// Append the `FORMAT` clause the assembler expects.
pub fn sql_with_format(sql: &str, format: Format) -> String {
    let sql = sql.trim_end().trim_end_matches(';').trim_end();
    format!("{} FORMAT {}", sql, format.as_str())
}

/// `protocol://host:port/?<params>&database=..&user=..&password=..&<settings>`
pub fn build_url(
    server: &Server,
    params: &[(String, String)],
    settings: &BTreeMap<String, String>,
) -> Result<Url> {
    let mut url = Url::parse(&server.base_url()).map_err(|e| {
        LinkError::Configuration(format!(
            "Invalid server address [{}:{}]: {}",
            server.host, server.port, e
        ))
    })?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
        if let Some(database) = &server.database {
            pairs.append_pair("database", database);
        }
        if let Some(username) = &server.username {
            pairs.append_pair("user", username);
        }
        if let Some(password) = &server.password {
            pairs.append_pair("password", password);
        }
        for (key, value) in settings {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

fn default_headers(gzipped_body: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    if gzipped_body {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    headers
}

fn request_timeout(timeout: Duration) -> Option<Duration> {
    if TransportTimeouts::is_no_timeout(timeout) {
        None
    } else {
        Some(timeout)
    }
}
