//! Card and tab views
//!
//! Turns partitioned rows into the display strings the page paints.
//! Absent columns and blank cells become the `-` placeholder.

use crate::error::ScanError;
use crate::rules::Bucket;
use crate::types::{BucketView, Card, Field, Notice, Row, TakeProfit, Table};

pub const PLACEHOLDER: &str = "-";

/// Title used for cards whose row has no name
pub const UNNAMED: &str = "(unnamed)";

/// Which columns feed each card field
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub name_column: String,
    pub label_column: String,
    pub price_column: String,
    pub entry_column: String,
    pub stop_loss_column: String,
    /// At most three
    pub take_profit_columns: Vec<String>,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            name_column: "name".to_string(),
            label_column: "signals".to_string(),
            price_column: "close".to_string(),
            entry_column: "entry".to_string(),
            stop_loss_column: "stop_loss".to_string(),
            take_profit_columns: vec![
                "tp1_rr1_1".to_string(),
                "tp2_rr1_2".to_string(),
                "tp3_rr1_3".to_string(),
            ],
        }
    }
}

impl CardLayout {
    pub fn card(&self, row: &Row) -> Card {
        let name = row.text(&self.name_column).map(|n| n.trim().to_string());

        let take_profits = self
            .take_profit_columns
            .iter()
            .take(3)
            .enumerate()
            .map(|(idx, column)| TakeProfit {
                label: format!("TP{}", idx + 1),
                value: format_price(row.field(column)),
            })
            .collect();

        Card {
            selectable: name.as_deref().is_some_and(|n| !n.is_empty()),
            symbol: name.filter(|n| !n.is_empty()).unwrap_or_else(|| UNNAMED.to_string()),
            label: row
                .text(&self.label_column)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            price: format_price(row.field(&self.price_column)),
            entry: format_price(row.field(&self.entry_column)),
            stop_loss: format_price(row.field(&self.stop_loss_column)),
            take_profits,
        }
    }

    /// One tab. Failed buckets and empty buckets carry a notice instead of cards.
    pub fn bucket_view(&self, bucket: &Bucket<'_>) -> BucketView {
        match &bucket.rows {
            Ok(rows) if rows.is_empty() => BucketView {
                name: bucket.name.clone(),
                count: 0,
                cards: Vec::new(),
                notice: Some(Notice::empty(format!("No {} signals right now.", bucket.name))),
            },
            Ok(rows) => BucketView {
                name: bucket.name.clone(),
                count: rows.len(),
                cards: rows.iter().map(|row| self.card(row)).collect(),
                notice: None,
            },
            Err(err) => BucketView {
                name: bucket.name.clone(),
                count: 0,
                cards: Vec::new(),
                notice: Some(notice_for(err)),
            },
        }
    }

    /// Distinct non-empty names in row order
    pub fn symbol_options(&self, table: &Table) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for name in table
            .rows()
            .iter()
            .filter_map(|row| row.text(&self.name_column))
            .map(|n| n.trim().to_string())
        {
            if !name.is_empty() && !symbols.contains(&name) {
                symbols.push(name);
            }
        }
        symbols
    }
}

/// Two decimals for numbers, raw text otherwise, placeholder when absent
pub fn format_price(field: Field<'_>) -> String {
    match field {
        Field::Value(cell) => match cell.as_number() {
            Some(n) => format!("{n:.2}"),
            None => cell.to_string(),
        },
        Field::Missing | Field::Blank => PLACEHOLDER.to_string(),
    }
}

pub fn notice_for(err: &ScanError) -> Notice {
    Notice {
        message: err.user_message(),
        retryable: err.is_retryable(),
    }
}
