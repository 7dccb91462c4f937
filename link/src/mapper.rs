//! Placeholder binding for SQL templates.
//!
//! Two strategies share the [`QueryMapper`] interface: [`NamedMapper`]
//! substitutes `:name` placeholders, [`UnnamedMapper`] substitutes `?`
//! placeholders in order. Both reject the other kind of bindings and a
//! binding count that differs from the number of placeholders.
//!
//! # Example
//!
//! ```rust
//! use clickhouse_link::mapper::{Bindings, NamedMapper, QueryMapper};
//! use serde_json::json;
//!
//! let sql = NamedMapper
//!     .bind(
//!         "SELECT * FROM t WHERE id = :id AND name = :name",
//!         &Bindings::named([("id", json!(7)), ("name", json!("O'Neil"))]),
//!     )
//!     .unwrap();
//! assert_eq!(sql, r"SELECT * FROM t WHERE id = 7 AND name = 'O\'Neil'");
//! ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

use crate::error::{LinkError, Result};

static NAMED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r":([a-zA-Z0-9_]+)").unwrap());
static UNNAMED_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?").unwrap());

/// Values to substitute into a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Bindings {
    Positional(Vec<JsonValue>),
    /// Names may be given with or without the leading `:`.
    Named(Vec<(String, JsonValue)>),
}

impl Bindings {
    pub fn positional<I>(values: I) -> Self
    where
        I: IntoIterator<Item = JsonValue>,
    {
        Bindings::Positional(values.into_iter().collect())
    }

    pub fn named<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, JsonValue)>,
        K: Into<String>,
    {
        Bindings::Named(values.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Bindings::Positional(values) => values.len(),
            Bindings::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns a template and bindings into the final SQL text.
pub trait QueryMapper: Send + Sync {
    fn bind(&self, template: &str, bindings: &Bindings) -> Result<String>;
}

/// `SELECT * FROM t WHERE a = :a AND b = :b`
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedMapper;

/// `SELECT * FROM t WHERE a = ? AND b = ?`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnnamedMapper;

fn check_count(pattern: &Regex, template: &str, bindings: &Bindings) -> Result<()> {
    let in_template = pattern.find_iter(template).count();
    if in_template != bindings.len() {
        return Err(LinkError::QueryMapper(format!(
            "Wrong bindings number: template has {} placeholder(s) but {} binding(s) given",
            in_template,
            bindings.len()
        )));
    }
    Ok(())
}

fn mixed_bindings() -> LinkError {
    LinkError::QueryMapper("Both named and unnamed bindings found".to_string())
}

impl QueryMapper for NamedMapper {
    fn bind(&self, template: &str, bindings: &Bindings) -> Result<String> {
        let Bindings::Named(values) = bindings else {
            return Err(mixed_bindings());
        };
        check_count(&NAMED_PLACEHOLDER, template, bindings)?;

        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| key.strip_prefix(':').unwrap_or(key) == name)
                .map(|(_, value)| escape_value(value))
        };

        let mut missing = None;
        let bound = NAMED_PLACEHOLDER.replace_all(template, |caps: &Captures| {
            match lookup(&caps[1]) {
                Some(escaped) => escaped,
                None => {
                    missing.get_or_insert_with(|| caps[0].to_string());
                    caps[0].to_string()
                }
            }
        });

        match missing {
            Some(placeholder) => Err(LinkError::QueryMapper(format!(
                "No binding given for placeholder {}",
                placeholder
            ))),
            None => Ok(bound.into_owned()),
        }
    }
}

impl QueryMapper for UnnamedMapper {
    fn bind(&self, template: &str, bindings: &Bindings) -> Result<String> {
        let Bindings::Positional(values) = bindings else {
            return Err(mixed_bindings());
        };
        check_count(&UNNAMED_PLACEHOLDER, template, bindings)?;

        let mut values = values.iter();
        let bound = UNNAMED_PLACEHOLDER.replace_all(template, |_: &Captures| {
            values.next().map(escape_value).unwrap_or_default()
        });
        Ok(bound.into_owned())
    }
}

/// Render a value as a SQL literal.
///
/// Strings are single-quoted with `'`, `"`, `\` and NUL backslash-escaped;
/// numbers are emitted as-is, booleans as `1`/`0`, null as `NULL` and arrays
/// as `[a, b]`. Objects are rendered as quoted JSON text.
pub fn escape_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(true) => "1".to_string(),
        JsonValue::Bool(false) => "0".to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => quote(s),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(escape_value).collect();
            format!("[{}]", items.join(", "))
        }
        JsonValue::Object(_) => quote(&value.to_string()),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' | '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
