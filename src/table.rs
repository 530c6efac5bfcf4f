use std::collections::HashSet;
use std::{fs, io, path::Path};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Format error on line {line}: {message}")]
    FormatError { line: usize, message: String },

    #[error("Column `{0}` not found in the table header")]
    KeyError(String),

    #[error("Key path must name at least one column")]
    EmptyKeyPath,

    #[error("Duplicate key sequence {0}")]
    KeyCollision(String),

    #[error("Structured document error: {0}")]
    DocumentError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Runs of whitespace separate fields.
    Whitespace,
    /// A single ASCII character separates fields.
    Char(u8),
}

/// A header plus string rows, every row as wide as the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, Error> {
        check_headers(&headers, 1)?;
        for (idx, row) in rows.iter().enumerate() {
            check_width(&headers, row, idx + 2)?;
        }

        return Ok(Self { headers, rows });
    }

    /// Builds a table from rows already known to be as wide as `headers`.
    pub(crate) fn from_checked(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Like [`Table::column_index`] but missing columns are a `KeyError`.
    pub fn require_column(&self, name: &str) -> Result<usize, Error> {
        self.column_index(name)
            .ok_or_else(|| Error::KeyError(name.to_string()))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Appends a column holding each row's zero-based position.
    pub fn with_row_ids(&self, column: &str) -> Result<Self, Error> {
        if self.column_index(column).is_some() {
            return Err(Error::FormatError {
                line: 1,
                message: format!("column `{}` already exists", column),
            });
        }

        let mut headers = self.headers.clone();
        headers.push(column.to_string());
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let mut row = row.clone();
                row.push(idx.to_string());
                row
            })
            .collect();

        return Ok(Self { headers, rows });
    }
}

/// Reads a whole source file, mapping a missing file to `FileNotFound` and
/// invalid UTF-8 to a `FormatError` on the offending line.
pub fn read_source(path: &Path) -> Result<String, Error> {
    let raw_contents = match fs::read(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    match String::from_utf8(raw_contents) {
        Ok(contents) => Ok(contents),
        Err(error) => {
            let valid = &error.as_bytes()[..error.utf8_error().valid_up_to()];
            let line = valid.iter().filter(|byte| **byte == b'\n').count() + 1;
            Err(Error::FormatError {
                line,
                message: format!("{} is not valid UTF-8", path.display()),
            })
        }
    }
}

pub fn load(path: &Path, delimiter: Delimiter) -> Result<Table, Error> {
    let contents = read_source(path)?;
    let table = parse(&contents, delimiter)?;
    log::debug!(
        "loaded {} with {} columns and {} rows",
        path.display(),
        table.headers.len(),
        table.row_count()
    );

    return Ok(table);
}

pub fn parse(contents: &str, delimiter: Delimiter) -> Result<Table, Error> {
    let lines = match delimiter {
        Delimiter::Whitespace => split_whitespace(contents),
        Delimiter::Char(byte) => split_delimited(contents, byte)?,
    };

    let mut lines = lines.into_iter();
    let (header_line, headers) = match lines.next() {
        Some(header) => header,
        None => {
            return Err(Error::FormatError {
                line: 1,
                message: String::from("missing header row"),
            })
        }
    };
    check_headers(&headers, header_line)?;

    let mut rows = Vec::new();
    for (line, row) in lines {
        check_width(&headers, &row, line)?;
        rows.push(row);
    }

    return Ok(Table { headers, rows });
}

fn split_whitespace(contents: &str) -> Vec<(usize, Vec<String>)> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let fields = line.split_whitespace().map(String::from).collect();
            (idx + 1, fields)
        })
        .collect()
}

fn split_delimited(contents: &str, delimiter: u8) -> Result<Vec<(usize, Vec<String>)>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut lines = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                let line = error
                    .position()
                    .map(|position| position.line() as usize)
                    .unwrap_or(idx + 1);
                return Err(Error::FormatError {
                    line,
                    message: error.to_string(),
                });
            }
        };

        // A whitespace-only line trims down to a single empty field.
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(idx + 1);
        lines.push((line, record.iter().map(String::from).collect()));
    }

    return Ok(lines);
}

fn check_headers(headers: &[String], line: usize) -> Result<(), Error> {
    if headers.is_empty() {
        return Err(Error::FormatError {
            line,
            message: String::from("missing header row"),
        });
    }

    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header.as_str()) {
            return Err(Error::FormatError {
                line,
                message: format!("duplicate column `{}`", header),
            });
        }
    }

    return Ok(());
}

fn check_width(headers: &[String], row: &[String], line: usize) -> Result<(), Error> {
    if row.len() != headers.len() {
        return Err(Error::FormatError {
            line,
            message: format!("expected {} fields, found {}", headers.len(), row.len()),
        });
    }

    return Ok(());
}
