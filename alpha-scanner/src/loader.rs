//! Worksheet loader
//!
//! Reads worksheets through a `SpreadsheetService` and memoizes each
//! table for the configured TTL so page refreshes inside that window
//! never hit the network.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::error::Result;
use crate::sheets::{Spreadsheet, SpreadsheetService};
use crate::types::Table;

/// Loads named worksheets of one spreadsheet as tables
pub struct DataLoader {
    service: Arc<dyn SpreadsheetService>,
    spreadsheet_title: String,
    cache: TtlCache<Table>,
    /// Collapses concurrent cache misses into one fetch
    fetch_guard: tokio::sync::Mutex<()>,
}

impl DataLoader {
    pub fn new(service: Arc<dyn SpreadsheetService>, spreadsheet_title: &str, ttl: Duration) -> Self {
        Self {
            service,
            spreadsheet_title: spreadsheet_title.to_string(),
            cache: TtlCache::new(ttl),
            fetch_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// One table per requested worksheet, in request order
    pub async fn load(&self, worksheets: &[String]) -> Result<Vec<Arc<Table>>> {
        self.load_at(worksheets, Utc::now()).await
    }

    pub async fn load_at(&self, worksheets: &[String], now: DateTime<Utc>) -> Result<Vec<Arc<Table>>> {
        if let Some(tables) = self.cached(worksheets, now) {
            debug!("Cache hit for {:?}", worksheets);
            return Ok(tables);
        }

        let _guard = self.fetch_guard.lock().await;

        let mut tables = Vec::with_capacity(worksheets.len());
        let mut spreadsheet: Option<Spreadsheet> = None;

        for name in worksheets {
            // Another request may have filled it while we waited
            if let Some(table) = self.cache.get(name, now) {
                tables.push(table);
                continue;
            }

            if spreadsheet.is_none() {
                spreadsheet = Some(self.open().await?);
            }
            if let Some(sheet) = &spreadsheet {
                let table = self.fetch_table(sheet, name).await?;
                info!(
                    "Loaded worksheet '{}' ({} rows, {} columns)",
                    name,
                    table.len(),
                    table.columns().len()
                );
                tables.push(self.cache.insert(name, table, now));
            }
        }

        Ok(tables)
    }

    /// Forget every cached table; the next load re-fetches
    pub fn invalidate(&self) -> usize {
        let dropped = self.cache.clear();
        info!("Cleared {} cached worksheet(s)", dropped);
        dropped
    }

    pub fn ttl(&self) -> Duration {
        self.cache.ttl()
    }

    fn cached(&self, worksheets: &[String], now: DateTime<Utc>) -> Option<Vec<Arc<Table>>> {
        worksheets
            .iter()
            .map(|name| self.cache.get(name, now))
            .collect()
    }

    async fn open(&self) -> Result<Spreadsheet> {
        self.service
            .open(&self.spreadsheet_title)
            .await
            .inspect_err(|e| warn!("Opening '{}' failed: {}", self.spreadsheet_title, e))
    }

    async fn fetch_table(&self, spreadsheet: &Spreadsheet, name: &str) -> Result<Table> {
        let worksheet = self.service.worksheet(spreadsheet, name).await?;
        let records = self
            .service
            .get_all_records(&worksheet)
            .await
            .inspect_err(|e| warn!("Reading worksheet '{}' failed: {}", name, e))?;
        Ok(Table::from_records(name, &records.header, records.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::sheets::memory::MemorySheets;
    use crate::types::Cell;

    const HEADER: [&str; 3] = ["Name", " Close ", "HIGH20"];

    fn sheets() -> Arc<MemorySheets> {
        let sheets = Arc::new(MemorySheets::new("Stock_Scan_Result"));
        sheets.put(
            "Data_Scan",
            &HEADER,
            vec![vec![Cell::Text("AAA".into()), Cell::Number(105.0), Cell::Number(100.0)]],
        );
        sheets
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_normalizes_columns() {
        let loader = DataLoader::new(sheets(), "Stock_Scan_Result", Duration::seconds(600));
        let tables = loader.load(&names(&["Data_Scan"])).await.unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].title, "Data_Scan");
        assert_eq!(tables[0].columns(), ["name", "close", "high20"]);
        assert_eq!(tables[0].rows()[0].number("close"), Some(105.0));
    }

    #[tokio::test]
    async fn test_cached_within_ttl_refreshed_after() {
        let source = sheets();
        let loader = DataLoader::new(source.clone(), "Stock_Scan_Result", Duration::seconds(600));
        let t0 = Utc::now();
        let wanted = names(&["Data_Scan"]);

        let first = loader.load_at(&wanted, t0).await.unwrap();

        // Remote changes inside the window are not visible
        source.put(
            "Data_Scan",
            &HEADER,
            vec![vec![Cell::Text("ZZZ".into()), Cell::Number(1.0), Cell::Number(2.0)]],
        );
        let second = loader.load_at(&wanted, t0 + Duration::seconds(300)).await.unwrap();
        assert_eq!(first[0], second[0]);
        assert_eq!(source.fetches(), 1);

        // After expiry the change shows up
        let third = loader.load_at(&wanted, t0 + Duration::seconds(601)).await.unwrap();
        assert_eq!(third[0].rows()[0].text("name").as_deref(), Some("ZZZ"));
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let source = sheets();
        let loader = DataLoader::new(source.clone(), "Stock_Scan_Result", Duration::seconds(600));
        let wanted = names(&["Data_Scan"]);

        let (first, second) = tokio::join!(loader.load(&wanted), loader.load(&wanted));

        assert_eq!(first.unwrap()[0], second.unwrap()[0]);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fetch() {
        let source = sheets();
        let loader = DataLoader::new(source.clone(), "Stock_Scan_Result", Duration::seconds(600));
        let wanted = names(&["Data_Scan"]);

        loader.load(&wanted).await.unwrap();
        assert_eq!(loader.invalidate(), 1);
        loader.load(&wanted).await.unwrap();
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_missing_spreadsheet_and_worksheet() {
        let loader = DataLoader::new(sheets(), "Other_Title", Duration::seconds(600));
        let err = loader.load(&names(&["Data_Scan"])).await.unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));

        let loader = DataLoader::new(sheets(), "Stock_Scan_Result", Duration::seconds(600));
        let err = loader.load(&names(&["Data_Scan", "Swing"])).await.unwrap_err();
        assert!(matches!(err, ScanError::NotFound(ref what) if what.contains("Swing")));
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_cached() {
        let source = sheets();
        let loader = DataLoader::new(source.clone(), "Stock_Scan_Result", Duration::seconds(600));
        let wanted = names(&["Data_Scan"]);

        source.set_offline(true);
        let err = loader.load(&wanted).await.unwrap_err();
        assert!(matches!(err, ScanError::Connection(_)));

        source.set_offline(false);
        assert!(loader.load(&wanted).await.is_ok());
    }
}
