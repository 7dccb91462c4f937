//! Data sources that can be attached to a query.
//!
//! Anything that can be opened as a byte stream qualifies. Plain sources are
//! uploaded as INSERT payloads; wrapped in a [`TempTable`](crate::TempTable)
//! they become inline lookup tables for SELECT queries.

use csv_core::{Terminator, WriteResult, Writer, WriterBuilder};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::compression::gzip_reader;

/// Reader handed out by [`AttachedSource::open`].
pub type SourceReader = Box<dyn Read + Send>;

/// Something that can be opened as a byte stream, optionally gzip-encoded.
///
/// Every call to `open` yields a fresh, independent reader. The reader is
/// closed when it is dropped.
pub trait AttachedSource: Send + Sync + std::fmt::Debug {
    fn open(&self, gzip: bool) -> std::io::Result<SourceReader>;
}

fn maybe_gzip<R>(reader: R, gzip: bool) -> SourceReader
where
    R: Read + Send + 'static,
{
    if gzip {
        Box::new(gzip_reader(reader))
    } else {
        Box::new(reader)
    }
}

/// A file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AttachedSource for FileSource {
    fn open(&self, gzip: bool) -> std::io::Result<SourceReader> {
        let file = File::open(&self.path)?;
        Ok(maybe_gzip(BufReader::new(file), gzip))
    }
}

/// In-memory text.
#[derive(Debug, Clone)]
pub struct StringSource {
    data: String,
}

impl StringSource {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

impl AttachedSource for StringSource {
    fn open(&self, gzip: bool) -> std::io::Result<SourceReader> {
        Ok(maybe_gzip(Cursor::new(self.data.clone().into_bytes()), gzip))
    }
}

/// Rows of values rendered as CSV when opened.
///
/// Nulls are written as `\N` and booleans as `1`/`0`, which is how
/// ClickHouse reads them back.
#[derive(Debug, Clone)]
pub struct CsvRowsSource {
    headers: Option<Vec<String>>,
    rows: Vec<Vec<JsonValue>>,
}

impl CsvRowsSource {
    pub fn new(rows: Vec<Vec<JsonValue>>) -> Self {
        Self {
            headers: None,
            rows,
        }
    }

    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    fn render(&self) -> Vec<u8> {
        let mut csv = CsvOutput::new();
        if let Some(headers) = &self.headers {
            csv.record(headers.iter().map(String::as_bytes));
        }
        for row in &self.rows {
            csv.record(row.iter().map(csv_value));
        }
        csv.out
    }
}

impl AttachedSource for CsvRowsSource {
    fn open(&self, gzip: bool) -> std::io::Result<SourceReader> {
        Ok(maybe_gzip(Cursor::new(self.render()), gzip))
    }
}

fn csv_value(value: &JsonValue) -> Vec<u8> {
    match value {
        JsonValue::Null => b"\\N".to_vec(),
        JsonValue::Bool(true) => b"1".to_vec(),
        JsonValue::Bool(false) => b"0".to_vec(),
        JsonValue::String(s) => s.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

/// RFC 4180 output with `\n` line endings.
struct CsvOutput {
    writer: Writer,
    out: Vec<u8>,
}

impl CsvOutput {
    fn new() -> Self {
        Self {
            writer: WriterBuilder::new().terminator(Terminator::Any(b'\n')).build(),
            out: Vec::new(),
        }
    }

    fn record<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        for (index, field) in fields.into_iter().enumerate() {
            if index > 0 {
                self.drain(|writer, buf| writer.delimiter(buf));
            }
            let mut input = field.as_ref();
            let mut buf = [0u8; 256];
            loop {
                let (result, nin, nout) = self.writer.field(input, &mut buf);
                self.out.extend_from_slice(&buf[..nout]);
                input = &input[nin..];
                if matches!(result, WriteResult::InputEmpty) {
                    break;
                }
            }
        }
        self.drain(|writer, buf| writer.terminator(buf));
    }

    /// Run a writer call until it no longer reports a full buffer.
    fn drain<F>(&mut self, mut write: F)
    where
        F: FnMut(&mut Writer, &mut [u8]) -> (WriteResult, usize),
    {
        let mut buf = [0u8; 16];
        loop {
            let (result, nout) = write(&mut self.writer, &mut buf);
            self.out.extend_from_slice(&buf[..nout]);
            if matches!(result, WriteResult::InputEmpty) {
                return;
            }
        }
    }
}

/// Several files streamed back to back as one body.
///
/// Files are opened one at a time as the previous one is exhausted.
#[derive(Debug, Clone)]
pub struct MergedFiles {
    paths: Vec<PathBuf>,
}

impl MergedFiles {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl AttachedSource for MergedFiles {
    fn open(&self, gzip: bool) -> std::io::Result<SourceReader> {
        let mut pending: VecDeque<PathBuf> = self.paths.iter().cloned().collect();
        // Surface a missing first file at open time rather than mid-upload.
        let current = match pending.pop_front() {
            Some(path) => Some(BufReader::new(File::open(path)?)),
            None => None,
        };
        Ok(maybe_gzip(ConcatReader { pending, current }, gzip))
    }
}

struct ConcatReader {
    pending: VecDeque<PathBuf>,
    current: Option<BufReader<File>>,
}

impl Read for ConcatReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let Some(reader) = self.current.as_mut() else {
                return Ok(0);
            };
            let n = reader.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }
            self.current = match self.pending.pop_front() {
                Some(path) => Some(BufReader::new(File::open(path)?)),
                None => None,
            };
        }
    }
}
