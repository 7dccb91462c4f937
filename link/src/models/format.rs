use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LinkError;

/// Output formats the response assembler knows how to decode.
///
/// Formats are parsed at the boundary (see [`FromStr`]), so an unknown format
/// name is rejected before any request is built.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Format {
    #[default]
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "JSONCompact")]
    JsonCompact,
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "TSV")]
    Tsv,
}

impl Format {
    /// Name used in the `FORMAT` clause.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "JSON",
            Format::JsonCompact => "JSONCompact",
            Format::Csv => "CSV",
            Format::Tsv => "TSV",
        }
    }

    /// JSON-family formats are parsed as one buffered document.
    pub fn is_json(&self) -> bool {
        matches!(self, Format::Json | Format::JsonCompact)
    }
}

impl FromStr for Format {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "jsoncompact" => Ok(Format::JsonCompact),
            "csv" => Ok(Format::Csv),
            "tsv" | "tabseparated" => Ok(Format::Tsv),
            _ => Err(LinkError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
