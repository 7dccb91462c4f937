use std::path::PathBuf;
use std::sync::Arc;

use crate::source::{AttachedSource, FileSource};

/// Schema of a temporary table.
///
/// Either every column is named or none is; a mixed map cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStructure {
    /// `(column, type)` pairs, sent as `<table>_structure`.
    Named(Vec<(String, String)>),
    /// Bare ordered types, sent as `<table>_types`.
    Positional(Vec<String>),
}

impl TableStructure {
    pub fn named<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Named(
            columns
                .into_iter()
                .map(|(name, ty)| (name.into(), ty.into()))
                .collect(),
        )
    }

    pub fn positional<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Positional(types.into_iter().map(Into::into).collect())
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Named(columns) => columns.len(),
            Self::Positional(types) => types.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inline, named dataset shipped alongside a read query.
///
/// The server treats it as a lookup table for the duration of that query.
#[derive(Debug, Clone)]
pub struct TempTable {
    name: String,
    source: Arc<dyn AttachedSource>,
    structure: TableStructure,
    format: String,
}

impl TempTable {
    /// Default data format of the source.
    pub const DEFAULT_FORMAT: &'static str = "CSV";

    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn AttachedSource>,
        structure: TableStructure,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            structure,
            format: Self::DEFAULT_FORMAT.to_string(),
        }
    }

    /// Temp table backed by a file on disk.
    pub fn from_file(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        structure: TableStructure,
    ) -> Self {
        Self::new(name, Arc::new(FileSource::new(path)), structure)
    }

    /// Data format of the source (`CSV`, `TSV`, `JSONEachRow`, ...).
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Arc<dyn AttachedSource> {
        &self.source
    }

    pub fn structure(&self) -> &TableStructure {
        &self.structure
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}
