//! Declarative normalization of inventory query output
//!
//! Every probe names a [`ParseRule`]; the rule turns raw text into a
//! [`Table`] of header fields and deduplicated data rows. Collectors then read
//! fields by header name instead of slicing strings by position.

use crate::error::ProbeError;

/// How a probe's output is framed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRule {
    /// Comma-separated with a header row (`wmic ... /format:csv`)
    Csv,
    /// One `key<separator>value` pair per line (`lscpu`, `/proc/meminfo`)
    KeyValue { separator: &'static str },
}

/// A data row and how many times it occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub values: Vec<String>,
    pub count: usize,
}

/// Parsed probe output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Command (or file) that produced the text, for error messages
    source: String,
    header: Vec<String>,
    /// Distinct rows in first-seen order
    rows: Vec<Row>,
}

impl Table {
    pub fn parse(source: &str, text: &str, rule: ParseRule) -> Self {
        match rule {
            ParseRule::Csv => parse_csv(source, text),
            ParseRule::KeyValue { separator } => parse_key_value(source, text, separator),
        }
    }

    /// Parse and fail when no data rows were found
    pub fn parse_non_empty(source: &str, text: &str, rule: ParseRule) -> Result<Self, ProbeError> {
        let table = Self::parse(source, text, rule);
        if table.is_empty() {
            return Err(ProbeError::EmptyOutput {
                command: source.to_string(),
            });
        }
        Ok(table)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct rows as records
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |row| Record { table: self, row })
    }

    pub fn first(&self) -> Result<Record<'_>, ProbeError> {
        self.records().next().ok_or_else(|| ProbeError::EmptyOutput {
            command: self.source.clone(),
        })
    }
}

/// One distinct row zipped with the header
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a Table,
    row: &'a Row,
}

impl<'a> Record<'a> {
    /// Value of a header field, matched case-insensitively
    pub fn get(&self, field: &str) -> Option<&'a str> {
        self.table
            .header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(field))
            .and_then(|i| self.row.values.get(i))
            .map(String::as_str)
    }

    pub fn require(&self, field: &str) -> Result<&'a str, ProbeError> {
        match self.get(field) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ProbeError::MissingField {
                command: self.table.source.clone(),
                field: field.to_string(),
            }),
        }
    }

    /// Fields whose header contains `needle`, in header order
    pub fn matching(&self, needle: &str) -> Vec<&'a str> {
        self.table
            .header
            .iter()
            .zip(&self.row.values)
            .filter(|(h, _)| h.contains(needle))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// How many identical rows collapsed into this one
    pub fn count(&self) -> usize {
        self.row.count
    }
}

fn split_csv(line: &str) -> Vec<String> {
    line.split(',').map(|f| f.trim().to_string()).collect()
}

fn parse_csv(source: &str, text: &str) -> Table {
    // wmic frames lines with \r\r\n and blank lines; drop both
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines.next().map(split_csv).unwrap_or_default();

    let mut rows: Vec<Row> = Vec::new();
    for line in lines {
        let values = split_csv(line);
        match rows.iter_mut().find(|r| r.values == values) {
            Some(existing) => existing.count += 1,
            None => rows.push(Row { values, count: 1 }),
        }
    }

    Table {
        source: source.to_string(),
        header,
        rows,
    }
}

fn parse_key_value(source: &str, text: &str, separator: &str) -> Table {
    let mut header = Vec::new();
    let mut values = Vec::new();

    for (key, value) in text.lines().filter_map(|l| l.split_once(separator)) {
        let key = key.trim();
        if key.is_empty() || header.iter().any(|h: &String| h == key) {
            continue;
        }
        header.push(key.to_string());
        values.push(value.trim().to_string());
    }

    let rows = if header.is_empty() {
        Vec::new()
    } else {
        vec![Row { values, count: 1 }]
    };

    Table {
        source: source.to_string(),
        header,
        rows,
    }
}
