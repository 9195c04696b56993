use csv::{ReaderBuilder, StringRecordsIntoIter, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use crate::error::Result;

/// One CSV data row keyed by header. Header lookups ignore case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    values: HashMap<String, String>,
    /// 1-based line number in the source file, when known
    pub line: Option<u64>,
}

impl RawRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (normalize_header(k.as_ref()), v.into()))
            .collect();
        Self { values, line: None }
    }

    /// First non-blank value among `aliases`, trimmed.
    pub fn get(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.values.get(&normalize_header(alias)))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A CSV file of broker rows.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the file and reads the header line. Rows are read lazily.
    pub fn rows(&self) -> Result<CsvRows> {
        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        Ok(CsvRows {
            records: reader.into_records(),
            headers,
        })
    }
}

/// Streaming iterator over the rows of a [`CsvSource`].
///
/// Short rows are padded by omission: columns past the end of a record are
/// simply absent from its [`RawRow`].
pub struct CsvRows {
    records: StringRecordsIntoIter<File>,
    headers: Vec<String>,
}

impl CsvRows {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Iterator for CsvRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e.into())),
        };

        let mut row = RawRow::from_pairs(
            self.headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.as_str(), v.to_string())),
        );
        row.line = record.position().map(|p| p.line());
        Some(Ok(row))
    }
}
