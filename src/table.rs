use crate::{FactsheetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub index: usize,
    table: &'a Table,
    cells: &'a [String],
}

impl Table {
    // Pads or truncates every row to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, String::new());
                cells
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(FactsheetError::EmptyInput);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_csv_reader(bytes)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_set(&self) -> HashSet<&str> {
        self.headers.iter().map(String::as_str).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(index, cells)| Row {
            index,
            table: self,
            cells,
        })
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            index,
            table: self,
            cells,
        })
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column_index(column)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }
}
