//! Spreadsheet service seam
//!
//! The loader only needs three calls from the remote service: open a
//! spreadsheet by title, find a worksheet by name, and read every record.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Cell;

/// Handle to an opened spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
}

/// Handle to one worksheet (tab) of a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub spreadsheet_id: String,
    pub title: String,
}

/// Raw worksheet content: the header row and the value rows under it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Remote spreadsheet service
#[async_trait]
pub trait SpreadsheetService: Send + Sync {
    /// Fails with `NotFound` when no spreadsheet has this title
    async fn open(&self, title: &str) -> Result<Spreadsheet>;

    /// Fails with `NotFound` when the spreadsheet has no such worksheet
    async fn worksheet(&self, spreadsheet: &Spreadsheet, name: &str) -> Result<Worksheet>;

    async fn get_all_records(&self, worksheet: &Worksheet) -> Result<Records>;
}
