//! Source file reading.
//!
//! The file is read once into raw string records. Values are kept exactly as
//! they appear in the file (no trimming); each stage parses the fields it
//! needs when it needs them, so a malformed year only aborts the run once
//! the first stage that reads years gets to it.

use anyhow::{Context, Result};
use encoding_rs::UTF_8;
use std::num::{ParseFloatError, ParseIntError};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

pub const CONTINENT: &str = "continent";
pub const COUNTRY: &str = "country";
pub const ISO_ALPHA: &str = "iso_alpha";
pub const ISO_NUM: &str = "iso_num";
pub const YEAR: &str = "year";
pub const GDP_PER_CAPITA: &str = "gdppercap";

// =============================================================================
// HEADER NORMALIZATION
// =============================================================================
// " ISO Alpha", "iso alpha" and "ISO_ALPHA" all resolve to iso_alpha.

/// Normalize one header: trim, lowercase, spaces -> underscores
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Normalize a full header row. Output has the same length and order as the input.
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter().map(|h| normalize_header(h.as_ref())).collect()
}

// =============================================================================
// RECORD ERRORS - abort the run
// =============================================================================

#[derive(Error, Debug)]
pub enum RecordError {
    /// The header lacks the column, or the row is shorter than the header.
    #[error("line {line}: missing '{field}' field")]
    MissingField { line: u64, field: &'static str },

    #[error("line {line}: invalid integer in '{field}': {value:?}")]
    InvalidInteger {
        line: u64,
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("line {line}: invalid number in '{field}': {value:?}")]
    InvalidFloat {
        line: u64,
        field: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

// =============================================================================
// SOURCE RECORDS
// =============================================================================

/// One input line, fields as raw strings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    pub line: u64,
    pub continent: Option<String>,
    pub country: Option<String>,
    pub iso_alpha: Option<String>,
    pub iso_num: Option<String>,
    pub year: Option<String>,
    /// `None` only when the header has no gdppercap column; a short row reads as empty
    pub gdp_per_capita: Option<String>,
}

impl SourceRecord {
    fn required<'a>(
        &self,
        value: &'a Option<String>,
        field: &'static str,
    ) -> Result<&'a str, RecordError> {
        value.as_deref().ok_or(RecordError::MissingField {
            line: self.line,
            field,
        })
    }

    fn integer(&self, value: &Option<String>, field: &'static str) -> Result<i32, RecordError> {
        let raw = self.required(value, field)?;
        raw.trim()
            .parse()
            .map_err(|source| RecordError::InvalidInteger {
                line: self.line,
                field,
                value: raw.to_string(),
                source,
            })
    }

    pub fn continent(&self) -> Result<&str, RecordError> {
        self.required(&self.continent, CONTINENT)
    }

    pub fn country(&self) -> Result<&str, RecordError> {
        self.required(&self.country, COUNTRY)
    }

    pub fn iso_alpha(&self) -> Result<&str, RecordError> {
        self.required(&self.iso_alpha, ISO_ALPHA)
    }

    pub fn iso_num(&self) -> Result<i32, RecordError> {
        self.integer(&self.iso_num, ISO_NUM)
    }

    pub fn year(&self) -> Result<i32, RecordError> {
        self.integer(&self.year, YEAR)
    }

    /// GDP per capita. An empty cell means 0.0; whitespace-only is malformed.
    pub fn gdp_per_capita(&self) -> Result<f64, RecordError> {
        match self.required(&self.gdp_per_capita, GDP_PER_CAPITA)? {
            "" => Ok(0.0),
            raw => raw
                .trim()
                .parse()
                .map_err(|source| RecordError::InvalidFloat {
                    line: self.line,
                    field: GDP_PER_CAPITA,
                    value: raw.to_string(),
                    source,
                }),
        }
    }
}

/// Column positions of the recognized fields after header normalization
#[derive(Debug, Default)]
struct ColumnMapping {
    continent: Option<usize>,
    country: Option<usize>,
    iso_alpha: Option<usize>,
    iso_num: Option<usize>,
    year: Option<usize>,
    gdp_per_capita: Option<usize>,
}

impl ColumnMapping {
    fn from_headers(headers: &[String]) -> Self {
        // Duplicate headers: the rightmost column wins
        let find = |name: &str| headers.iter().rposition(|h| h == name);
        Self {
            continent: find(CONTINENT),
            country: find(COUNTRY),
            iso_alpha: find(ISO_ALPHA),
            iso_num: find(ISO_NUM),
            year: find(YEAR),
            gdp_per_capita: find(GDP_PER_CAPITA),
        }
    }
}

// =============================================================================
// READING
// =============================================================================

/// Parse delimited text (header row required) into raw records
pub fn parse_source(content: &str, delimiter: u8) -> Result<Vec<SourceRecord>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(content.as_bytes());

    let raw_headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if raw_headers.is_empty() {
        anyhow::bail!("Source has no header row");
    }
    let mapping = ColumnMapping::from_headers(&normalize_headers(&raw_headers));

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
        let line = row
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2); // +2 for 1-indexed + header

        let field = |col: Option<usize>| col.and_then(|i| row.get(i)).map(str::to_string);

        records.push(SourceRecord {
            line,
            continent: field(mapping.continent),
            country: field(mapping.country),
            iso_alpha: field(mapping.iso_alpha),
            iso_num: field(mapping.iso_num),
            year: field(mapping.year),
            gdp_per_capita: mapping
                .gdp_per_capita
                .map(|i| row.get(i).unwrap_or_default().to_string()),
        });
    }

    Ok(records)
}

/// Read and parse the source file. Content must be UTF-8 (BOM optional).
pub async fn read_source(path: &Path, delimiter: u8) -> Result<Vec<SourceRecord>> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read source file {}", path.display()))?;

    let (content, had_errors) = UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        anyhow::bail!("Source file {} is not valid UTF-8", path.display());
    }

    parse_source(&content, delimiter)
        .with_context(|| format!("Failed to parse source file {}", path.display()))
}
