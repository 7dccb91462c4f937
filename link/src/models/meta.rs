use serde::{Deserialize, Serialize};

/// Name and declared type of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Ordered column metadata, unique by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    columns: Vec<ColumnMeta>,
}

impl Meta {
    pub fn new<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = ColumnMeta>,
    {
        let mut meta = Self::default();
        for column in columns {
            meta.push(column);
        }
        meta
    }

    /// Add a column; a column with the same name is replaced in place.
    pub fn push(&mut self, column: ColumnMeta) {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn all(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnMeta> {
        self.columns.iter()
    }
}

impl<'a> IntoIterator for &'a Meta {
    type Item = &'a ColumnMeta;
    type IntoIter = std::slice::Iter<'a, ColumnMeta>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
