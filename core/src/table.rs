/// Reading keys from, and appending rows to, `localization_table.csv`
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::key::LocalizationEntry;

/// Field separator of the game's localization table.
pub const DELIMITER: char = '~';

const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum TableError {
    #[error("localization table not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }

    /// Style of the first line break in `content`, or the platform default.
    pub fn detect(content: &[u8]) -> Self {
        match content.iter().position(|&b| b == b'\n') {
            Some(index) if index > 0 && content[index - 1] == b'\r' => LineEnding::Crlf,
            Some(_) => LineEnding::Lf,
            None => Self::platform_default(),
        }
    }

    fn platform_default() -> Self {
        if cfg!(windows) {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }
}

/// True when `value` can be written as one field without breaking the row.
pub fn is_storable_field(value: &str) -> bool {
    !value.contains(DELIMITER) && !value.contains('\n') && !value.contains('\r')
}

/// Collects the key (first field) of every row in the table.
///
/// A missing file yields an empty set.
pub fn load_existing_keys(path: &Path) -> Result<HashSet<String>, TableError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(err) => return Err(err.into()),
    };

    let content = String::from_utf8_lossy(&bytes);
    let keys: HashSet<String> = content
        .lines()
        .filter_map(|line| {
            let line = line.trim_start_matches(BOM);
            let key = line.split(DELIMITER).next().unwrap_or_default().trim();
            (!key.is_empty()).then(|| key.to_string())
        })
        .collect();

    debug!("loaded {} existing keys from {}", keys.len(), path.display());
    Ok(keys)
}

/// A fully translated record, ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub key: String,
    pub english: String,
    /// One column per language, in `Language::ALL` order.
    pub translations: Vec<String>,
}

impl TableRow {
    pub fn new(entry: &LocalizationEntry, translations: Vec<String>) -> Self {
        Self {
            key: entry.key.clone(),
            english: entry.english.clone(),
            translations,
        }
    }

    pub fn to_line(&self) -> String {
        let mut fields: Vec<&str> = Vec::with_capacity(self.translations.len() + 2);
        fields.push(&self.key);
        fields.push(&self.english);
        fields.extend(self.translations.iter().map(String::as_str));
        fields.join(&DELIMITER.to_string())
    }
}

/// Append-only handle on an existing table. Never creates or truncates.
#[derive(Debug)]
pub struct TableAppender<W: Write = File> {
    writer: W,
    line_ending: LineEnding,
    needs_leading_break: bool,
}

impl TableAppender<File> {
    pub fn open(path: &Path) -> Result<Self, TableError> {
        if !path.is_file() {
            return Err(TableError::NotFound(path.to_path_buf()));
        }

        let existing = fs::read(path)?;
        let line_ending = LineEnding::detect(&existing);
        let needs_leading_break = existing.last().map_or(false, |&b| b != b'\n');

        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self::with_writer(file, line_ending, needs_leading_break))
    }
}

impl<W: Write> TableAppender<W> {
    pub fn with_writer(writer: W, line_ending: LineEnding, needs_leading_break: bool) -> Self {
        Self {
            writer,
            line_ending,
            needs_leading_break,
        }
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Writes one row and flushes it.
    pub fn append(&mut self, row: &TableRow) -> Result<(), TableError> {
        let mut buffer = String::new();
        if self.needs_leading_break {
            buffer.push_str(self.line_ending.as_str());
        }
        buffer.push_str(&row.to_line());
        buffer.push_str(self.line_ending.as_str());

        self.writer.write_all(buffer.as_bytes())?;
        self.writer.flush()?;
        self.needs_leading_break = false;
        Ok(())
    }
}
