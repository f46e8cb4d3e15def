//! Flattening of extracted tables into budgeted text chunks.

use crate::error::{Error, Result};
use crate::splitter::BudgetTokenizer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    /// Cells by row; `None` marks a missing value.
    pub rows: Vec<Vec<Option<String>>>,
}

/// Render one row as `column = value, ...`, skipping missing and blank
/// cells. With `show_index` each entry is suffixed with `. {row_number}`.
pub fn format_row(columns: &[String], row: &[Option<String>], row_number: usize, show_index: bool) -> String {
    columns
        .iter()
        .zip(row)
        .filter_map(|(column, cell)| {
            let value = cell.as_deref()?;
            if value.trim().is_empty() {
                return None;
            }
            Some(if show_index {
                format!("{column} = {value}. {row_number}")
            } else {
                format!("{column} = {value}")
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct TableRowChunker<T> {
    tokenizer: T,
    max_tokens: usize,
    show_index: bool,
}

impl<T: BudgetTokenizer> TableRowChunker<T> {
    pub fn new(tokenizer: T, max_tokens: usize) -> Result<Self> {
        if max_tokens < 1 {
            return Err(Error::invalid("max_tokens must be at least 1"));
        }
        Ok(Self { tokenizer, max_tokens, show_index: false })
    }

    pub fn show_index(mut self, show_index: bool) -> Self {
        self.show_index = show_index;
        self
    }

    /// Row numbers are 1-based.
    pub fn format_rows(&self, table: &Table) -> Vec<String> {
        table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| format_row(&table.columns, row, i + 1, self.show_index))
            .collect()
    }

    /// Pack consecutive formatted rows, newline separated, while their token
    /// counts fit the budget. A row is never split; one that alone exceeds
    /// the budget becomes its own chunk.
    pub fn chunk_rows(&self, table: &Table) -> Result<Vec<String>> {
        let mut chunks = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_tokens = 0;
        for row in self.format_rows(table) {
            let row_tokens = self.tokenizer.count(&row)?;
            if current_tokens + row_tokens > self.max_tokens && !current.is_empty() {
                chunks.push(current.join("\n"));
                current.clear();
                current_tokens = 0;
            }
            current.push(row);
            current_tokens += row_tokens;
        }
        if !current.is_empty() {
            chunks.push(current.join("\n"));
        }
        Ok(chunks)
    }
}
