//! Low-level reader for the tab-separated tables shipped with an asset pack.
//!
//! Both the info tables and the layers tables are plain text with one record
//! per line and `\t` between columns. This module only splits lines into
//! columns and converts individual cells; record semantics live in
//! [`crate::layers`] and [`crate::info`].

use std::str::FromStr;

use thiserror::Error;

pub const SEPARATOR: char = '\t';
pub const COMMENT_PREFIX: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: malformed {kind} row, expected {expected} columns, found {found}")]
    MalformedRow {
        line: usize,
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: column {column} is not a valid integer: {value:?}")]
    InvalidInteger {
        line: usize,
        column: usize,
        value: String,
    },
}

/// One split line of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row<'a> {
    /// 1-based line number in the source text.
    pub line: usize,
    pub columns: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cell text, or `""` past the end of the row.
    pub fn get(&self, column: usize) -> &'a str {
        self.columns.get(column).copied().unwrap_or("")
    }

    pub fn first(&self) -> &'a str {
        self.get(0)
    }

    pub fn is_comment(&self) -> bool {
        self.first().starts_with(COMMENT_PREFIX)
    }

    /// Parse a numeric cell, substituting `default` when the cell is empty.
    pub fn parse_or<T: FromStr>(&self, column: usize, default: T) -> Result<T, ParseError> {
        let cell = self.get(column).trim();
        if cell.is_empty() {
            return Ok(default);
        }
        cell.parse().map_err(|_| ParseError::InvalidInteger {
            line: self.line,
            column,
            value: cell.to_string(),
        })
    }
}

/// Iterator over the rows of a table.
///
/// Blank lines are yielded as empty rows unless [`TableReader::trimmed`] is
/// used, in which case each line is trimmed and blank lines are skipped.
pub struct TableReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    trim: bool,
}

impl<'a> TableReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            trim: false,
        }
    }

    pub fn trimmed(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            trim: true,
        }
    }
}

impl<'a> Iterator for TableReader<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, line) = self.lines.next()?;
            let line = if self.trim { line.trim() } else { line };
            if line.is_empty() {
                if self.trim {
                    continue;
                }
                return Some(Row {
                    line: idx + 1,
                    columns: Vec::new(),
                });
            }
            return Some(Row {
                line: idx + 1,
                columns: line.split(SEPARATOR).collect(),
            });
        }
    }
}
