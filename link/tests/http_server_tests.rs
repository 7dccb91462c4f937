//! End-to-end tests against a fake ClickHouse HTTP endpoint served by actix-web.
//!
//! The fake server records every request and answers by looking at the SQL:
//! `SELEC` is a syntax error, multipart requests get a CSV body with a summary
//! header, uploads (SQL in the `query` parameter) get an empty 200 and
//! everything else gets a JSON envelope echoing the selected number.

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use clickhouse_link::compression::{decompress_gzip, is_gzip};
use clickhouse_link::{
    Client, Format, HttpTransport, LinkError, Query, Server, ServerProvider, StringSource,
    TableStructure, TempTable, Transport, TransportOptions,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Seen {
    params: HashMap<String, String>,
    content_type: String,
    body: Vec<u8>,
}

impl Seen {
    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
struct Recorded {
    requests: Mutex<Vec<Seen>>,
}

fn plain(body: &[u8]) -> Vec<u8> {
    // actix may already have undone Content-Encoding
    if is_gzip(body) {
        decompress_gzip(body).unwrap()
    } else {
        body.to_vec()
    }
}

async fn handle(
    req: HttpRequest,
    params: web::Query<HashMap<String, String>>,
    body: web::Bytes,
    state: web::Data<Recorded>,
) -> HttpResponse {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let seen = Seen {
        params: params.into_inner(),
        content_type,
        body: plain(&body),
    };
    state.requests.lock().push(seen.clone());

    if seen.content_type.starts_with("multipart/form-data") {
        return HttpResponse::Ok()
            .insert_header(("X-ClickHouse-Summary", r#"{"read_rows":"2","read_bytes":"16"}"#))
            .body("1\n2\n");
    }
    if seen.params.contains_key("query") {
        return HttpResponse::Ok().finish();
    }

    let sql = seen.body_text();
    if sql.starts_with("SELEC ") {
        return HttpResponse::InternalServerError()
            .insert_header(("X-ClickHouse-Exception-Code", "62"))
            .body("Code: 62. DB::Exception: Syntax error: failed at position 1");
    }

    let n: u64 = sql
        .split_whitespace()
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or_default();
    HttpResponse::Ok().content_type("application/json").body(
        json!({
            "meta": [{ "name": "n", "type": "UInt64" }],
            "data": [{ "n": n }],
            "rows": 1,
            "statistics": { "rows_read": 1, "bytes_read": 8, "elapsed": 0.0005 }
        })
        .to_string(),
    )
}

/// Start the fake server on a free port.
fn start(state: web::Data<Recorded>) -> std::io::Result<Server> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .default_service(web::to(handle))
    })
    .workers(1)
    .listen(listener)?
    .run();
    actix_web::rt::spawn(server);

    Ok(Server::new("127.0.0.1")
        .with_port(port)
        .with_credentials("default", ""))
}

fn transport() -> HttpTransport {
    HttpTransport::new(TransportOptions::new()).unwrap()
}

#[actix_web::test]
async fn test_json_reads_over_http() {
    let state = web::Data::new(Recorded::default());
    let server = start(state.clone()).unwrap();

    let queries: Vec<Query> = (1..=4)
        .map(|i| Query::new(server.clone(), format!("SELECT {}", i)))
        .collect();
    let results = transport().read(&queries, 2).await.unwrap();

    let values: Vec<u64> = results
        .iter()
        .map(|r| r[0]["n"].as_u64().unwrap())
        .collect();
    assert_eq!(values, vec![1, 2, 3, 4]);
    assert_eq!(results[0].meta().len(), 1);
    assert_eq!(results[0].statistic().bytes(), 8);

    let requests = state.requests.lock().clone();
    assert_eq!(requests.len(), 4);
    for request in &requests {
        assert_eq!(request.params.get("wait_end_of_query").map(String::as_str), Some("1"));
        assert_eq!(request.params.get("user").map(String::as_str), Some("default"));
        assert!(request.body_text().ends_with("FORMAT JSON"));
    }
}

#[actix_web::test]
async fn test_server_error_over_http() {
    let state = web::Data::new(Recorded::default());
    let server = start(state.clone()).unwrap();

    let err = transport()
        .read(&[Query::new(server, "SELEC 1")], 1)
        .await
        .unwrap_err();

    match &err {
        LinkError::ServerReturned { host, status, body, sql } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(*status, 500);
            assert!(body.contains("Syntax error"));
            assert_eq!(sql, "SELEC 1");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[actix_web::test]
async fn test_temp_table_over_http() {
    let state = web::Data::new(Recorded::default());
    let server = start(state.clone()).unwrap();

    let query = Query::builder(server, "SELECT number FROM numbers(10) WHERE number IN ids")
        .temp_table(TempTable::new(
            "ids",
            Arc::new(StringSource::new("1\n2\n")),
            TableStructure::positional(["UInt64"]),
        ))
        .format(Format::Csv)
        .build();
    let results = transport().read(&[query], 1).await.unwrap();

    let result = &results[0];
    assert_eq!(result.len(), 2);
    assert_eq!(result[1]["0"], json!("2"));
    assert_eq!(result.statistic().rows(), 2);
    assert_eq!(result.statistic().bytes(), 16);

    let request = state.requests.lock()[0].clone();
    assert!(request.content_type.starts_with("multipart/form-data"));
    assert_eq!(request.params.get("ids_types").map(String::as_str), Some("UInt64"));
    assert_eq!(request.params.get("ids_format").map(String::as_str), Some("CSV"));
    let body = request.body_text();
    assert!(body.contains("name=\"query\""));
    assert!(body.contains("WHERE number IN ids FORMAT CSV"));
    assert!(body.contains("name=\"ids\""));
    assert!(body.contains("1\n2\n"));
}

#[actix_web::test]
async fn test_file_upload_over_http() {
    let state = web::Data::new(Recorded::default());
    let server = start(state.clone()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.tsv");
    std::fs::write(&path, "1\tone\n2\ttwo\n").unwrap();

    let mut provider = ServerProvider::new();
    provider.add_server(server).unwrap();
    let client = Client::builder().server_provider(provider).build().unwrap();

    let written = client
        .write_files(
            "events",
            &[],
            [path],
            "TSV",
            Vec::<(String, String)>::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(written, vec![true]);

    let request = state.requests.lock()[0].clone();
    assert_eq!(
        request.params.get("query").map(String::as_str),
        Some("INSERT INTO events FORMAT TSV")
    );
    assert_eq!(request.body_text(), "1\tone\n2\ttwo\n");
}

#[actix_web::test]
async fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let server = Server::new("127.0.0.1").with_port(port);

    let err = transport()
        .read(&[Query::new(server, "SELECT 1")], 1)
        .await
        .unwrap_err();

    match err {
        LinkError::Connection { host, port: reported, .. } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(reported, port);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
