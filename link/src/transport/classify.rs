//! Maps transport outcomes onto the closed set of error kinds.

use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use log::warn;

use super::wire::{BodyStream, TransportFailure, WireResponse};
use crate::error::{LinkError, Result};
use crate::models::{Query, Server};

/// Set by ClickHouse when a query fails, even if the status line was already
/// sent as 200.
pub const EXCEPTION_CODE_HEADER: &str = "x-clickhouse-exception-code";

/// Classify an attempt that produced no usable response.
///
/// Only "nothing came back" gains meaning here; other failures pass through.
pub fn classify_failure(server: &Server, failure: TransportFailure) -> LinkError {
    match failure {
        TransportFailure::NoResponse(message) => {
            warn!(
                "[CH_HTTP] No response from {}:{}: {}",
                server.host, server.port, message
            );
            LinkError::Connection {
                host: server.host.clone(),
                port: server.port,
                message,
            }
        }
        TransportFailure::Other(err) => err,
    }
}

/// Pass a successful response through, or turn a failed one into
/// [`LinkError::ServerReturned`] carrying the body, host and SQL.
pub async fn check_response(query: &Query, response: WireResponse) -> Result<WireResponse> {
    let failed = !response.status.is_success()
        || response.headers.contains_key(EXCEPTION_CODE_HEADER);
    if !failed {
        return Ok(response);
    }

    let status = response.status.as_u16();
    let body = match read_body(response.body).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Err(e) => format!("<unreadable response body: {}>", e),
    };
    warn!(
        "[CH_HTTP] Server {} returned status {}: {}",
        query.server().host,
        status,
        body
    );

    Err(LinkError::ServerReturned {
        host: query.server().host.clone(),
        status,
        body,
        sql: query.sql().to_string(),
    })
}

/// Buffer a whole response body.
pub async fn read_body(body: BodyStream) -> Result<Bytes> {
    let buf = body
        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::StatusCode;

    fn response(status: StatusCode, headers: HeaderMap, chunks: Vec<Result<Bytes>>) -> WireResponse {
        WireResponse {
            status,
            headers,
            body: Box::pin(stream::iter(chunks)),
        }
    }

    fn query() -> Query {
        Query::new(Server::new("ch-1"), "SELEC 1")
    }

    #[test]
    fn test_no_response_is_connection_error() {
        let server = Server::new("10.0.0.1").with_port(8124);
        let err = classify_failure(&server, TransportFailure::NoResponse("refused".into()));
        assert!(matches!(
            err,
            LinkError::Connection { ref host, port: 8124, .. } if host == "10.0.0.1"
        ));
    }

    #[test]
    fn test_other_failure_passes_through() {
        let err = classify_failure(
            &Server::new("h"),
            TransportFailure::Other(std::io::Error::other("disk").into()),
        );
        assert!(matches!(err, LinkError::Io(_)));
    }

    #[tokio::test]
    async fn test_non_success_status_is_server_error() {
        let resp = response(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            vec![Ok(Bytes::from_static(b"Syntax error\n"))],
        );
        let err = check_response(&query(), resp).await.unwrap_err();
        match err {
            LinkError::ServerReturned { host, status, body, sql } => {
                assert_eq!(host, "ch-1");
                assert_eq!(status, 500);
                assert_eq!(body, "Syntax error");
                assert_eq!(sql, "SELEC 1");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exception_header_on_ok_status_is_server_error() {
        let mut headers = HeaderMap::new();
        headers.insert(EXCEPTION_CODE_HEADER, HeaderValue::from_static("62"));
        let resp = response(StatusCode::OK, headers, vec![Ok(Bytes::from_static(b"Code: 62"))]);
        let err = check_response(&query(), resp).await.unwrap_err();
        assert!(matches!(err, LinkError::ServerReturned { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_still_classified() {
        let resp = response(
            StatusCode::BAD_GATEWAY,
            HeaderMap::new(),
            vec![Err(std::io::Error::other("reset").into())],
        );
        let err = check_response(&query(), resp).await.unwrap_err();
        assert!(
            matches!(err, LinkError::ServerReturned { ref body, .. } if body.contains("unreadable"))
        );
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let resp = response(StatusCode::OK, HeaderMap::new(), vec![Ok(Bytes::from_static(b"{}"))]);
        let resp = check_response(&query(), resp).await.unwrap();
        assert_eq!(read_body(resp.body).await.unwrap().as_ref(), b"{}");
    }
}
