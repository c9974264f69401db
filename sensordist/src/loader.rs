//! Reads a delimited text file into an Arrow [`RecordBatch`] of string
//! columns.
//!
//! The separator is sniffed from the first lines of the file. When sniffing
//! or parsing with the sniffed separator fails, the file is parsed once more
//! as tab separated before giving up.

use std::{fs, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};

use crate::{Error, Result};

/// Separators tried by [`sniff_delimiter`], in order of preference.
pub const CANDIDATE_DELIMITERS: [u8; 5] = [b',', b'\t', b';', b'|', b' '];
/// Separator used when sniffing fails.
pub const FALLBACK_DELIMITER: u8 = b'\t';

const SNIFF_LINES: usize = 20;

/// Raw input table: every column is nullable `Utf8`, named after the header.
#[derive(Debug, Clone)]
pub struct Table {
    pub batch: RecordBatch,
    pub delimiter: u8,
}

impl Table {
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_owned())
            .collect()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingInput(path.to_owned()));
    }
    let data = fs::read(path)?;
    let text = String::from_utf8_lossy(&data);

    let sniffed = sniff_delimiter(&text);
    let first_attempt = match sniffed {
        Some(delimiter) => parse(&data, delimiter).map(|batch| Table { batch, delimiter }),
        None => Err(Error::Unparseable {
            path: path.to_owned(),
            reason: "could not detect the delimiter".to_owned(),
        }),
    };
    let table = match first_attempt {
        Ok(table) => table,
        Err(error) => {
            tracing::debug!(%error, "delimiter detection failed, retrying as tab separated");
            let batch = parse(&data, FALLBACK_DELIMITER).map_err(|e| Error::Unparseable {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;
            // One column whose header still holds separators is a misread.
            if batch.num_columns() < 2 && header_has_separator(&text) {
                return Err(Error::Unparseable {
                    path: path.to_owned(),
                    reason: error.to_string(),
                });
            }
            Table {
                batch,
                delimiter: FALLBACK_DELIMITER,
            }
        }
    };
    tracing::info!(
        path = %path.display(),
        rows = table.num_rows(),
        delimiter = ?char::from(table.delimiter),
        "loaded input"
    );
    Ok(table)
}

/// Picks the first candidate separator that splits the header into at least
/// two fields and no sampled line into more fields than the header. Shorter
/// lines are allowed; their missing fields are read as nulls.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let sample = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    if sample.is_empty() {
        return None;
    }
    CANDIDATE_DELIMITERS
        .into_iter()
        .find(|&delimiter| is_consistent(&sample, delimiter))
}

fn header_has_separator(text: &str) -> bool {
    let header = text.lines().next().unwrap_or_default();
    CANDIDATE_DELIMITERS
        .into_iter()
        .filter(|&d| d != FALLBACK_DELIMITER && d != b' ')
        .any(|d| header.as_bytes().contains(&d))
}

fn is_consistent(sample: &str, delimiter: u8) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());
    let mut widths = reader.records().map(|r| r.map(|r| r.len()));
    let header_width = match widths.next() {
        Some(Ok(n)) if n >= 2 => n,
        _ => return false,
    };
    widths.all(|w| matches!(w, Ok(n) if n <= header_width))
}

fn parse(data: &[u8], delimiter: u8) -> Result<RecordBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let names = reader
        .headers()?
        .iter()
        .map(|h| h.to_owned())
        .collect::<Vec<_>>();
    if names.is_empty() || names.iter().all(|n| n.is_empty()) {
        return Err(Error::Internal("missing header row".to_owned()));
    }

    let mut columns = vec![Vec::<Option<String>>::new(); names.len()];
    for record in reader.records() {
        let record = record?;
        if record.len() > names.len() {
            return Err(Error::RaggedRow {
                line: record.position().map_or(0, |p| p.line()),
                fields: record.len(),
                expected: names.len(),
            });
        }
        for (i, column) in columns.iter_mut().enumerate() {
            let field = record.get(i).filter(|f| !f.is_empty());
            column.push(field.map(|f| f.to_owned()));
        }
    }

    let schema = Schema::new(
        names
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let columns = columns
        .into_iter()
        .map(|values| Arc::new(StringArray::from(values)) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}
