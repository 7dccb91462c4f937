//! Incremental decoder for CSV and TSV response bodies.
//!
//! Chunks are fed as they arrive from the network; complete records are
//! turned into rows immediately so the body is never held in memory as a
//! whole. Rows are keyed by column position (`"0"`, `"1"`, ...).

use csv_core::{ReadRecordResult, Reader, ReaderBuilder};
use serde_json::Value as JsonValue;

use crate::error::{LinkError, Result};
use crate::models::{Format, Row};

/// ClickHouse's marker for NULL in text formats.
const NULL_MARKER: &[u8] = b"\\N";

pub struct DelimitedDecoder {
    reader: Reader,
    tsv: bool,
    output: Vec<u8>,
    ends: Vec<usize>,
    out_len: usize,
    ends_len: usize,
    /// Bytes of the current record have been consumed.
    in_record: bool,
    /// The last record ended with `\r`, so a following `\n` belongs to it.
    after_cr: bool,
    rows: Vec<Row>,
}

impl DelimitedDecoder {
    pub fn new(format: Format) -> Self {
        let tsv = format == Format::Tsv;
        let reader = if tsv {
            // TSV has no quoting; special characters are backslash-escaped.
            ReaderBuilder::new().delimiter(b'\t').quoting(false).build()
        } else {
            ReaderBuilder::new().build()
        };

        Self {
            reader,
            tsv,
            output: vec![0; 1024],
            ends: vec![0; 16],
            out_len: 0,
            ends_len: 0,
            in_record: false,
            after_cr: false,
            rows: Vec::new(),
        }
    }

    /// Decode the next body chunk.
    pub fn feed(&mut self, mut input: &[u8]) -> Result<()> {
        // An empty slice signals end of input to csv-core.
        while let Some(&first) = input.first() {
            // csv-core skips blank lines, but in ClickHouse output a blank
            // line is a row holding one empty value.
            if !self.in_record && matches!(first, b'\n' | b'\r') {
                input = &input[1..];
                if first == b'\n' && self.after_cr {
                    self.after_cr = false;
                } else {
                    self.after_cr = first == b'\r';
                    self.emit_blank()?;
                }
                continue;
            }

            let (result, nin) = self.step(input);
            if nin > 0 {
                self.in_record = true;
                self.after_cr = input[nin - 1] == b'\r';
            }
            input = &input[nin..];
            if matches!(result, ReadRecordResult::Record) {
                self.emit_record()?;
            }
        }
        Ok(())
    }

    /// Flush a trailing record without a line terminator and return all rows.
    pub fn finish(mut self) -> Result<Vec<Row>> {
        loop {
            let (result, _) = self.step(&[]);
            match result {
                ReadRecordResult::Record => self.emit_record()?,
                ReadRecordResult::End => return Ok(self.rows),
                _ => {}
            }
        }
    }

    fn step(&mut self, input: &[u8]) -> (ReadRecordResult, usize) {
        let (result, nin, nout, nend) = self.reader.read_record(
            input,
            &mut self.output[self.out_len..],
            &mut self.ends[self.ends_len..],
        );
        self.out_len += nout;
        self.ends_len += nend;

        match result {
            ReadRecordResult::OutputFull => {
                let len = self.output.len();
                self.output.resize(len * 2, 0);
            }
            ReadRecordResult::OutputEndsFull => {
                let len = self.ends.len();
                self.ends.resize(len * 2, 0);
            }
            _ => {}
        }
        (result, nin)
    }

    fn emit_record(&mut self) -> Result<()> {
        let mut row = Row::new();
        let mut start = 0;
        for (index, &end) in self.ends[..self.ends_len].iter().enumerate() {
            let field = &self.output[start..end];
            start = end;
            row.insert(index.to_string(), self.decode_field(field)?);
        }
        self.out_len = 0;
        self.ends_len = 0;
        self.in_record = false;
        self.rows.push(row);
        Ok(())
    }

    fn emit_blank(&mut self) -> Result<()> {
        let mut row = Row::new();
        row.insert("0".to_string(), self.decode_field(b"")?);
        self.rows.push(row);
        Ok(())
    }

    fn decode_field(&self, field: &[u8]) -> Result<JsonValue> {
        if field == NULL_MARKER {
            return Ok(JsonValue::Null);
        }
        let text = std::str::from_utf8(field).map_err(|e| {
            LinkError::malformed(String::from_utf8_lossy(field), format!("invalid UTF-8: {}", e))
        })?;
        if self.tsv {
            Ok(JsonValue::String(unescape_tsv(text)))
        } else {
            Ok(JsonValue::String(text.to_string()))
        }
    }
}

/// Decode TabSeparated escape sequences. Unknown escapes keep the escaped char.
pub fn unescape_tsv(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }

    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
