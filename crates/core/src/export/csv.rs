//! Minimal CSV tables
//!
//! Values are plain numbers and identifiers, never quoted. NaN is written as
//! an empty cell.

use std::io::{self, Write};

/// Header plus string rows, ready to write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Empty table with the given column names
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            header: header.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row of numbers
    pub fn push_numbers(&mut self, values: &[f64]) {
        self.rows.push(values.iter().map(|&v| format_number(v)).collect());
    }

    /// Append a row led by a label
    pub fn push_labeled(&mut self, label: &str, values: &[f64]) {
        let mut row = Vec::with_capacity(values.len() + 1);
        row.push(label.to_string());
        row.extend(values.iter().map(|&v| format_number(v)));
        self.rows.push(row);
    }

    /// Column names
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write header and rows, one line each
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "{}", self.header.join(","))?;
        for row in &self.rows {
            writeln!(w, "{}", row.join(","))?;
        }
        w.flush()
    }

    /// Render to a string
    pub fn to_csv_string(&self) -> String {
        let mut out = self.header.join(",");
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

fn format_number(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}
