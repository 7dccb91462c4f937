use serde_json::json;
use std::sync::Arc;

use super::*;
use crate::error::LinkError;
use crate::source::StringSource;

// ==================== Format Tests ====================

#[test]
fn test_format_parsing() {
    assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
    assert_eq!("jsoncompact".parse::<Format>().unwrap(), Format::JsonCompact);
    assert_eq!("CSV".parse::<Format>().unwrap(), Format::Csv);
    assert_eq!("TabSeparated".parse::<Format>().unwrap(), Format::Tsv);
    assert_eq!(Format::JsonCompact.to_string(), "JSONCompact");
}

#[test]
fn test_format_unsupported() {
    let err = "XML".parse::<Format>().unwrap_err();
    assert!(matches!(err, LinkError::UnsupportedFormat(ref name) if name == "XML"));
}

#[test]
fn test_query_builder_rejects_unknown_format() {
    let result = Query::builder(Server::new("localhost"), "SELECT 1").format_name("Parquet");
    assert!(matches!(result, Err(LinkError::UnsupportedFormat(_))));
}

// ==================== Server Tests ====================

#[test]
fn test_server_defaults() {
    let server = Server::new("ch-1");
    assert_eq!(server.port, 8123);
    assert_eq!(server.database.as_deref(), Some("default"));
    assert!(server.username.is_none());
    assert_eq!(server.protocol(), Protocol::Http);
    assert_eq!(server.options.timeout, 5.0);
    assert_eq!(server.base_url(), "http://ch-1:8123/");
}

#[test]
fn test_server_options_builder() {
    let server = Server::new("ch-2").with_port(8443).with_options(
        ServerOptions::new()
            .with_protocol(Protocol::Https)
            .with_tags(["ssd", "eu"]),
    );
    assert_eq!(server.base_url(), "https://ch-2:8443/");
    assert!(server.tags().contains("ssd"));
    assert!(server.tags().contains("eu"));
}

#[test]
fn test_server_deserializes_with_defaults() {
    let server: Server = serde_json::from_value(json!({ "host": "ch-3" })).unwrap();
    assert_eq!(server, Server::new("ch-3"));
}

// ==================== Query Tests ====================

#[test]
fn test_query_builder() {
    let table = TempTable::new(
        "ids",
        Arc::new(StringSource::new("1\n2\n")),
        TableStructure::positional(["UInt64"]),
    );
    let query = Query::builder(Server::new("localhost"), "SELECT * FROM t WHERE id IN ids")
        .temp_table(table)
        .setting("max_threads", "2")
        .settings([("readonly", "1")])
        .format(Format::Tsv)
        .build();

    assert_eq!(query.sql(), "SELECT * FROM t WHERE id IN ids");
    assert_eq!(query.attachments().len(), 1);
    assert_eq!(query.attachments()[0].as_temp_table().unwrap().name(), "ids");
    assert_eq!(query.settings().get("max_threads").map(String::as_str), Some("2"));
    assert_eq!(query.settings().len(), 2);
    assert_eq!(query.format(), Format::Tsv);
}

#[test]
fn test_temp_table_defaults() {
    let table = TempTable::from_file(
        "numbers",
        "/tmp/numbers.csv",
        TableStructure::named([("number", "UInt64")]),
    );
    assert_eq!(table.format(), "CSV");
    assert!(table.structure().is_named());
    assert_eq!(table.with_format("TSV").format(), "TSV");
}

// ==================== Meta Tests ====================

#[test]
fn test_meta_push_replaces_same_name() {
    let mut meta = Meta::new([
        ColumnMeta::new("id", "UInt64"),
        ColumnMeta::new("name", "String"),
    ]);
    meta.push(ColumnMeta::new("id", "Int32"));

    assert_eq!(meta.len(), 2);
    assert_eq!(meta.all()[0], ColumnMeta::new("id", "Int32"));
    assert_eq!(meta.get("name").unwrap().data_type, "String");
    assert!(meta.get("missing").is_none());
    assert_eq!(meta.names().collect::<Vec<_>>(), vec!["id", "name"]);
}

#[test]
fn test_column_meta_deserialization() {
    let column: ColumnMeta =
        serde_json::from_value(json!({ "name": "number", "type": "UInt64" })).unwrap();
    assert_eq!(column, ColumnMeta::new("number", "UInt64"));
}

// ==================== Result Tests ====================

#[test]
fn test_query_result_accessors() {
    let query = Query::new(Server::new("localhost"), "SELECT 1");
    let mut row = Row::new();
    row.insert("1".to_string(), json!(1));
    let result = QueryResult::new(
        query,
        vec![row.clone()],
        Meta::new([ColumnMeta::new("1", "UInt8")]),
        QueryStatistic::new(1, 1, 0.1, None),
    );

    assert_eq!(result.len(), 1);
    assert!(!result.is_empty());
    assert_eq!(result[0], row);
    assert_eq!(result.get(0), Some(&row));
    assert!(result.get(1).is_none());
    assert_eq!(result.iter().count(), 1);
    assert_eq!((&result).into_iter().count(), 1);
    assert_eq!(result.query().sql(), "SELECT 1");
    assert_eq!(result.statistic().rows(), 1);
    assert_eq!(result.statistic().bytes(), 1);
    assert_eq!(result.statistic().time(), 0.1);
    assert_eq!(result.statistic().rows_before_limit_at_least(), None);
    assert_eq!(result.meta().len(), 1);
}
