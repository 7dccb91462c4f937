//! Reconstructs typed results from successful responses.
//!
//! JSON-family bodies are buffered and parsed as one document carrying rows,
//! column metadata and statistics. CSV/TSV bodies are decoded record by record
//! as chunks arrive; their statistics come from the `X-ClickHouse-Summary`
//! header instead.

use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use super::classify::read_body;
use super::delimited::DelimitedDecoder;
use super::wire::WireResponse;
use crate::error::{LinkError, Result};
use crate::models::{ColumnMeta, Format, Meta, Query, QueryResult, QueryStatistic, Row};

pub const SUMMARY_HEADER: &str = "x-clickhouse-summary";

#[derive(Debug, Deserialize)]
struct JsonEnvelope {
    #[serde(default)]
    meta: Vec<ColumnMeta>,
    #[serde(default)]
    data: Vec<JsonValue>,
    #[serde(default)]
    statistics: JsonStatistics,
    #[serde(default)]
    rows_before_limit_at_least: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonStatistics {
    #[serde(default)]
    rows_read: u64,
    #[serde(default)]
    bytes_read: u64,
    #[serde(default)]
    elapsed: f64,
}

/// `X-ClickHouse-Summary`. Counters arrive as quoted numbers.
#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default, deserialize_with = "lenient_u64")]
    read_rows: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    read_bytes: u64,
}

fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Decode `response` under the query's declared format.
pub async fn assemble(query: &Query, response: WireResponse) -> Result<QueryResult> {
    let format = query.format();
    if format.is_json() {
        let body = read_body(response.body).await?;
        let (rows, meta, statistic) = parse_json(format, &body)?;
        return Ok(QueryResult::new(query.clone(), rows, meta, statistic));
    }

    let statistic = summary_statistic(&response.headers)?;
    let mut decoder = DelimitedDecoder::new(format);
    let mut body = response.body;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if !chunk.is_empty() {
            decoder.feed(&chunk)?;
        }
    }
    let rows = decoder.finish()?;

    Ok(QueryResult::new(query.clone(), rows, Meta::default(), statistic))
}

fn parse_json(format: Format, body: &[u8]) -> Result<(Vec<Row>, Meta, QueryStatistic)> {
    let raw = || String::from_utf8_lossy(body).into_owned();
    let envelope: JsonEnvelope =
        serde_json::from_slice(body).map_err(|e| LinkError::malformed(raw(), e))?;

    let meta = Meta::new(envelope.meta);
    let rows = envelope
        .data
        .into_iter()
        .map(|row| normalize_row(format, row, &meta))
        .collect::<std::result::Result<Vec<Row>, String>>()
        .map_err(|reason| LinkError::malformed(raw(), reason))?;

    let statistic = QueryStatistic::new(
        envelope.statistics.rows_read,
        envelope.statistics.bytes_read,
        envelope.statistics.elapsed,
        envelope.rows_before_limit_at_least,
    );
    Ok((rows, meta, statistic))
}

/// Objects are taken as they are; arrays (JSONCompact) are zipped against the
/// column metadata.
fn normalize_row(format: Format, row: JsonValue, meta: &Meta) -> std::result::Result<Row, String> {
    match row {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Array(values) => {
            if values.len() != meta.len() {
                return Err(format!(
                    "{} row has {} values but meta declares {} columns",
                    format,
                    values.len(),
                    meta.len()
                ));
            }
            Ok(meta
                .names()
                .map(str::to_string)
                .zip(values)
                .collect())
        }
        other => Err(format!("{} row is neither an object nor an array: {}", format, other)),
    }
}

/// Statistics for delimited formats. Elapsed time and rows-before-limit are
/// not reported by the header.
fn summary_statistic(headers: &HeaderMap) -> Result<QueryStatistic> {
    let Some(value) = headers.get(SUMMARY_HEADER) else {
        return Ok(QueryStatistic::default());
    };
    let raw = String::from_utf8_lossy(value.as_bytes()).into_owned();
    let summary: Summary = serde_json::from_str(&raw).map_err(|e| LinkError::malformed(raw.clone(), e))?;
    Ok(QueryStatistic::new(summary.read_rows, summary.read_bytes, 0.0, None))
}
