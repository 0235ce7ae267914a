//! Common types for the scanner
//!
//! Tables as loaded from a worksheet, and the views the board serves.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalize a header name so lookups ignore case and surrounding whitespace
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A single scalar value from the sheet
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl Cell {
    /// Convert a raw JSON cell, numericising numeric strings
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Blank,
            serde_json::Value::Number(n) => n.as_f64().map_or(Cell::Blank, Cell::Number),
            serde_json::Value::String(s) => Cell::numericise(s),
            serde_json::Value::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }

    /// `"105"` becomes a number, `""` becomes blank, anything else stays text
    pub fn numericise(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Blank;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Cell::Blank => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Blank => Ok(()),
        }
    }
}

/// Result of looking up a column on a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    /// The table has no such column
    Missing,
    /// The column exists but this row has nothing in it
    Blank,
    Value(&'a Cell),
}

impl Field<'_> {
    pub fn number(self) -> Option<f64> {
        match self {
            Field::Value(cell) => cell.as_number(),
            Field::Missing | Field::Blank => None,
        }
    }

    pub fn text(self) -> Option<String> {
        match self {
            Field::Value(cell) => Some(cell.to_string()),
            Field::Missing | Field::Blank => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Field::Missing)
    }
}

/// One scanned instrument
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: HashMap<String, Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and the in-memory sheet
    #[must_use]
    pub fn with(mut self, column: &str, cell: Cell) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn insert(&mut self, column: &str, cell: Cell) {
        self.cells.insert(normalize_column(column), cell);
    }

    pub fn field(&self, column: &str) -> Field<'_> {
        match self.cells.get(&normalize_column(column)) {
            None => Field::Missing,
            Some(cell) if cell.is_blank() => Field::Blank,
            Some(cell) => Field::Value(cell),
        }
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.field(column).number()
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.field(column).text()
    }
}

/// All rows of one worksheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub title: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from a header row and raw value rows.
    ///
    /// Header names are normalized; blank and repeated headers are dropped
    /// (first occurrence wins). Short rows are padded with blanks.
    pub fn from_records(title: &str, header: &[String], records: Vec<Vec<Cell>>) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(header.len());
        let mut positions: Vec<Option<usize>> = Vec::with_capacity(header.len());

        for raw in header {
            let name = normalize_column(raw);
            if name.is_empty() || columns.contains(&name) {
                positions.push(None);
            } else {
                positions.push(Some(columns.len()));
                columns.push(name);
            }
        }

        let rows = records
            .into_iter()
            .map(|values| {
                let mut row = Row::new();
                for (idx, slot) in positions.iter().enumerate() {
                    if let Some(col) = slot {
                        let cell = values.get(idx).cloned().unwrap_or(Cell::Blank);
                        row.cells.insert(columns[*col].clone(), cell);
                    }
                }
                row
            })
            .collect();

        Self {
            title: title.to_string(),
            columns,
            rows,
        }
    }

    /// Build a table from already-built rows (columns given explicitly)
    pub fn new(title: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        Self {
            title: title.to_string(),
            columns: columns.iter().map(|c| normalize_column(c)).collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn has_column(&self, column: &str) -> bool {
        let wanted = normalize_column(column);
        self.columns.iter().any(|c| *c == wanted)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One summary card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub symbol: String,
    /// False when the row has no name; such cards are not selectable
    pub selectable: bool,
    pub label: String,
    pub price: String,
    pub entry: String,
    pub stop_loss: String,
    pub take_profits: Vec<TakeProfit>,
}

/// One take-profit level on a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfit {
    pub label: String,
    pub value: String,
}

/// User-visible message shown instead of a failed or empty part of the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    /// The user can wait for the next refresh
    pub retryable: bool,
}

impl Notice {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// One tab on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketView {
    pub name: String,
    pub count: usize,
    pub cards: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

/// API response for the board endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardResponse {
    pub title: String,
    pub sheet: String,
    pub sheets: Vec<String>,
    pub rule: String,
    pub buckets: Vec<BucketView>,
    /// Names the user can pick from, in row order
    pub symbols: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub timestamp: String,
}

/// API response for the chart endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ChartResponse {
    pub symbol: String,
    pub url: String,
}

/// API response listing the worksheets the board can show
#[derive(Debug, Serialize, Deserialize)]
pub struct SheetsResponse {
    pub primary: String,
    pub sheets: Vec<String>,
    pub rule: String,
}

/// API response for a manual refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Cached worksheets dropped
    pub cleared: usize,
    /// Ignored because the previous refresh was too recent
    pub throttled: bool,
    pub timestamp: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numericise() {
        assert_eq!(Cell::numericise("105"), Cell::Number(105.0));
        assert_eq!(Cell::numericise(" 2.5 "), Cell::Number(2.5));
        assert_eq!(Cell::numericise(""), Cell::Blank);
        assert_eq!(Cell::numericise("BREAKOUT"), Cell::Text("BREAKOUT".to_string()));
    }

    #[test]
    fn test_cell_from_json() {
        assert_eq!(Cell::from_json(&serde_json::json!(12.5)), Cell::Number(12.5));
        assert_eq!(Cell::from_json(&serde_json::json!("7")), Cell::Number(7.0));
        assert_eq!(Cell::from_json(&serde_json::Value::Null), Cell::Blank);
        assert_eq!(Cell::from_json(&serde_json::json!(true)), Cell::Text("TRUE".into()));
    }

    #[test]
    fn test_columns_normalized() {
        let header = vec![" Name ".to_string(), "CLOSE".to_string(), "High20".to_string()];
        let table = Table::from_records(
            "Data_Scan",
            &header,
            vec![vec![Cell::Text("AAA".into()), Cell::Number(105.0), Cell::Number(100.0)]],
        );

        assert_eq!(table.columns(), ["name", "close", "high20"]);
        assert!(table.has_column("Close"));
        assert!(table.has_column(" high20"));

        let row = &table.rows()[0];
        assert_eq!(row.text("NAME").as_deref(), Some("AAA"));
        assert_eq!(row.number("close"), Some(105.0));
    }

    #[test]
    fn test_short_rows_padded_and_duplicate_headers_dropped() {
        let header = vec!["name".to_string(), "close".to_string(), "Name".to_string(), String::new()];
        let table = Table::from_records("t", &header, vec![vec![Cell::Text("AAA".into())]]);

        assert_eq!(table.columns(), ["name", "close"]);
        assert_eq!(table.rows()[0].field("close"), Field::Blank);
        assert_eq!(table.rows()[0].text("name").as_deref(), Some("AAA"));
    }

    #[test]
    fn test_field_lookup_distinguishes_missing_and_blank() {
        let row = Row::new()
            .with("name", Cell::Text("AAA".into()))
            .with("low10", Cell::Text("  ".into()))
            .with("signals", Cell::Text("n/a".into()));

        assert!(row.field("tp1_rr1_1").is_missing());
        assert_eq!(row.field("low10"), Field::Blank);
        assert_eq!(row.number("signals"), None);
        assert_eq!(row.number("low10"), None);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Number(100.0).to_string(), "100");
        assert_eq!(Cell::Number(1.25).to_string(), "1.25");
        assert_eq!(Cell::Blank.to_string(), "");
    }
}
