//! Encoding of temporary tables into query parameters and multipart parts.

use super::wire::{PartContent, WirePart};
use crate::models::{TableStructure, TempTable};
use crate::streams::StreamRegistry;

/// Render a structure as the server expects it.
///
/// Returns the parameter suffix (`structure` for named columns, `types` for
/// positional ones) and the rendered value.
pub fn render_structure(structure: &TableStructure) -> (&'static str, String) {
    match structure {
        TableStructure::Named(columns) => {
            let rendered: Vec<String> = columns
                .iter()
                .map(|(name, ty)| format!("{} {}", name, ty))
                .collect();
            ("structure", rendered.join(", "))
        }
        TableStructure::Positional(types) => ("types", types.join(", ")),
    }
}

/// Query-string parameters describing `table`.
pub fn table_params(table: &TempTable) -> Vec<(String, String)> {
    let (suffix, structure) = render_structure(table.structure());
    vec![
        (format!("{}_{}", table.name(), suffix), structure),
        (format!("{}_format", table.name()), table.format().to_string()),
    ]
}

/// Parameters plus the multipart part carrying the table's data.
///
/// The data is never gzip-encoded: the server streams it while the query runs.
pub fn encode(
    table: &TempTable,
    registry: &StreamRegistry,
) -> std::io::Result<(Vec<(String, String)>, WirePart)> {
    let stream = registry.open(table.source().as_ref(), false)?;
    let part = WirePart {
        name: table.name().to_string(),
        file_name: Some(table.name().to_string()),
        content: PartContent::Stream(stream),
    };
    Ok((table_params(table), part))
}
