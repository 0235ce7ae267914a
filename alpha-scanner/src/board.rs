//! Scan board - orchestrates one page render
//!
//! Coordinates loader, partition rule, and presenter. Every failure is
//! turned into a notice on the response; rendering itself never fails.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ScanError;
use crate::loader::DataLoader;
use crate::presenter::{CardLayout, notice_for};
use crate::rules::PartitionRule;
use crate::selection::{ChartWidget, Selection};
use crate::types::{BoardResponse, BucketView, ChartResponse, Notice, RefreshResponse, SheetsResponse, Table};

/// Board coordinating all components
pub struct ScanBoard {
    loader: DataLoader,
    rule: PartitionRule,
    layout: CardLayout,
    chart: ChartWidget,
    title: String,
    worksheets: Vec<String>,
    refresh_cooldown: Duration,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
}

impl ScanBoard {
    /// Create new board
    pub fn new(loader: DataLoader, config: &Config) -> Self {
        Self {
            loader,
            rule: config.partition_rule.clone(),
            layout: config.card_layout(),
            chart: config.chart_widget(),
            title: config.page_title.clone(),
            worksheets: config.worksheets.clone(),
            refresh_cooldown: Duration::try_seconds(config.refresh_cooldown_seconds)
                .unwrap_or_else(Duration::zero),
            last_refresh: Mutex::new(None),
        }
    }

    pub async fn render(&self, sheet: Option<&str>, selection: &Selection) -> BoardResponse {
        self.render_at(sheet, selection, Utc::now()).await
    }

    /// Build the board for one worksheet as of `now`.
    ///
    /// The primary worksheet is always loaded too: it supplies the symbol
    /// list and the default selection.
    pub async fn render_at(
        &self,
        sheet: Option<&str>,
        selection: &Selection,
        now: DateTime<Utc>,
    ) -> BoardResponse {
        let sheet = self.resolve_sheet(sheet);
        let primary = self.primary().to_string();

        let mut wanted = vec![primary.clone()];
        if sheet != primary {
            wanted.push(sheet.clone());
        }

        let mut response = BoardResponse {
            title: self.title.clone(),
            sheet: sheet.clone(),
            sheets: self.worksheets.clone(),
            rule: self.rule.to_string(),
            buckets: Vec::new(),
            symbols: Vec::new(),
            selected: None,
            chart_url: None,
            notice: None,
            timestamp: now.to_rfc3339(),
        };

        let tables = match self.loader.load_at(&wanted, now).await {
            Ok(tables) => tables,
            Err(e) => {
                warn!("Board for '{}' unavailable: {}", sheet, e);
                response.notice = Some(notice_for(&e));
                self.select(&mut response, selection, None);
                return response;
            }
        };

        let (Some(primary_table), Some(table)) = (tables.first(), tables.last()) else {
            return response;
        };

        response.symbols = self.layout.symbol_options(primary_table);
        self.select(&mut response, selection, Some(primary_table.as_ref()));

        match self.buckets(table) {
            Ok(buckets) => response.buckets = buckets,
            Err(notice) => response.notice = Some(notice),
        }
        response
    }

    /// Chart URL for a symbol, `None` for a blank symbol
    pub fn chart(&self, symbol: &str) -> Option<ChartResponse> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }
        Some(ChartResponse {
            symbol: symbol.to_string(),
            url: self.chart.url(symbol),
        })
    }

    pub fn sheets(&self) -> SheetsResponse {
        SheetsResponse {
            primary: self.primary().to_string(),
            sheets: self.worksheets.clone(),
            rule: self.rule.to_string(),
        }
    }

    pub fn refresh(&self) -> RefreshResponse {
        self.refresh_at(Utc::now())
    }

    /// Drop cached tables so the next render reads the spreadsheet.
    /// Inside the cooldown after the previous refresh nothing is dropped.
    pub fn refresh_at(&self, now: DateTime<Utc>) -> RefreshResponse {
        let mut last = self.last_refresh.lock();
        if let Some(previous) = *last {
            if now - previous < self.refresh_cooldown {
                info!("Refresh ignored, last one was at {}", previous.to_rfc3339());
                return RefreshResponse {
                    cleared: 0,
                    throttled: true,
                    timestamp: now.to_rfc3339(),
                };
            }
        }
        *last = Some(now);

        RefreshResponse {
            cleared: self.loader.invalidate(),
            throttled: false,
            timestamp: now.to_rfc3339(),
        }
    }

    fn primary(&self) -> &str {
        self.worksheets.first().map_or("", String::as_str)
    }

    /// Requested worksheet if configured, the primary otherwise
    fn resolve_sheet(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) if self.worksheets.iter().any(|w| w == name) => name.to_string(),
            Some(name) => {
                debug!("Unknown worksheet '{}', showing '{}'", name, self.primary());
                self.primary().to_string()
            }
            None => self.primary().to_string(),
        }
    }

    fn select(&self, response: &mut BoardResponse, selection: &Selection, primary: Option<&Table>) {
        response.selected = selection.resolve(primary, &self.layout.name_column);
        response.chart_url = response.selected.as_deref().map(|s| self.chart.url(s));
    }

    fn buckets(&self, table: &Table) -> Result<Vec<BucketView>, Notice> {
        if table.is_empty() {
            debug!("Worksheet '{}' is empty", table.title);
            return Err(notice_for(&ScanError::EmptyResult(table.title.clone())));
        }

        let buckets = self.rule.partition(table).map_err(|e| {
            warn!("Partition of '{}' failed: {}", table.title, e);
            notice_for(&e)
        })?;

        if buckets.is_empty() {
            return Err(notice_for(&ScanError::EmptyResult(table.title.clone())));
        }

        for bucket in &buckets {
            if let Err(e) = &bucket.rows {
                warn!("Tab '{}' of '{}' unavailable: {}", bucket.name, table.title, e);
            }
        }

        Ok(buckets.iter().map(|b| self.layout.bucket_view(b)).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::client::GoogleSheetsClient;
    use crate::config::Credentials;
    use crate::sheets::memory::MemorySheets;
    use crate::types::Cell;

    const HEADER: [&str; 6] = ["name", "signals", "close", "entry", "stop_loss", "tp1_rr1_1"];

    fn scan_row(name: &str, signals: &str, close: f64) -> Vec<Cell> {
        vec![
            Cell::Text(name.into()),
            Cell::Text(signals.into()),
            Cell::Number(close),
            Cell::Number(close),
            Cell::Number(close * 0.95),
            Cell::Number(close * 1.05),
        ]
    }

    fn sheets() -> Arc<MemorySheets> {
        let sheets = Arc::new(MemorySheets::new("Stock_Scan_Result"));
        sheets.put(
            "Data_Scan",
            &HEADER,
            vec![
                scan_row("AAA", "BREAKOUT", 105.0),
                scan_row("BBB", "BREAKOUT_PULLBACK", 90.0),
                scan_row("CCC", "SMC", 50.0),
            ],
        );
        sheets.put(
            "Swing",
            &["name", "strategy", "close", "high20"],
            vec![vec![
                Cell::Text("DDD".into()),
                Cell::Text("Swing".into()),
                Cell::Number(12.0),
                Cell::Number(11.0),
            ]],
        );
        sheets.put("Long_Term", &["name", "signals", "close"], vec![]);
        sheets
    }

    fn config(vars: &[(&str, &str)]) -> Config {
        let mut all = vec![
            ("WORKSHEETS", "Data_Scan,Swing,Long_Term"),
            ("GCP_SERVICE_ACCOUNT_JSON", "{}"),
        ];
        all.extend_from_slice(vars);
        Config::from_lookup(|key| {
            all.iter()
                .rev()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        })
        .unwrap()
    }

    fn board_with(source: Arc<MemorySheets>, vars: &[(&str, &str)]) -> ScanBoard {
        let config = config(vars);
        let loader = DataLoader::new(source, &config.spreadsheet_title, Duration::seconds(600));
        ScanBoard::new(loader, &config)
    }

    fn board() -> ScanBoard {
        board_with(sheets(), &[])
    }

    #[tokio::test]
    async fn test_primary_board() {
        let response = board().render(None, &Selection::default()).await;

        assert_eq!(response.sheet, "Data_Scan");
        assert!(response.notice.is_none());
        assert_eq!(response.buckets.len(), 4);
        assert_eq!(response.buckets[0].name, "BREAKOUT");
        assert_eq!(response.buckets[0].count, 2);
        assert_eq!(response.buckets[1].cards[0].symbol, "BBB");
        assert!(response.buckets[3].notice.is_some()); // no MOMENTUM rows
        assert_eq!(response.symbols, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(response.selected.as_deref(), Some("AAA"));
        assert!(response.chart_url.unwrap().contains("symbol=AAA"));
    }

    #[tokio::test]
    async fn test_secondary_sheet_missing_label_column() {
        let response = board().render(Some("Swing"), &Selection::from_query(Some("DDD"))).await;

        assert_eq!(response.sheet, "Swing");
        // Symbols still come from the primary sheet
        assert_eq!(response.symbols, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(response.selected.as_deref(), Some("DDD"));
        // Swing has no signals column: every tab reports it, none fails the page
        assert!(response.notice.is_none());
        assert!(response.buckets.iter().all(|b| {
            b.notice.as_ref().is_some_and(|n| n.message.contains("signals"))
        }));
    }

    #[tokio::test]
    async fn test_categorical_missing_column_is_sheet_notice() {
        let board = board_with(sheets(), &[("PARTITION_RULE", "categorical:strategy")]);
        let response = board.render(Some("Data_Scan"), &Selection::default()).await;

        assert!(response.buckets.is_empty());
        assert!(response.notice.unwrap().message.contains("strategy"));

        let response = board.render(Some("Swing"), &Selection::default()).await;
        assert_eq!(response.buckets.len(), 1);
        assert_eq!(response.buckets[0].name, "Swing");
        assert_eq!(response.buckets[0].cards[0].label, "Swing");
    }

    #[tokio::test]
    async fn test_empty_sheet_shows_empty_state() {
        let response = board().render(Some("Long_Term"), &Selection::default()).await;

        assert!(response.buckets.is_empty());
        let notice = response.notice.unwrap();
        assert!(notice.message.contains("Long_Term"));
        assert!(!notice.retryable);
    }

    #[tokio::test]
    async fn test_unknown_sheet_falls_back_to_primary() {
        let response = board().render(Some("Intraday"), &Selection::default()).await;
        assert_eq!(response.sheet, "Data_Scan");
        assert_eq!(response.buckets.len(), 4);
    }

    #[tokio::test]
    async fn test_connection_failure_becomes_retryable_notice() {
        let source = sheets();
        source.set_offline(true);
        let board = board_with(source, &[]);

        let response = board.render(None, &Selection::from_query(Some("PTT"))).await;
        assert!(response.buckets.is_empty());
        let notice = response.notice.unwrap();
        assert!(notice.retryable);
        // An explicit selection still gets its chart
        assert!(response.chart_url.unwrap().contains("symbol=PTT"));
    }

    #[tokio::test]
    async fn test_unusable_credentials_become_retryable_notice() {
        let client = GoogleSheetsClient::new(
            &Credentials::new(r#"{"client_email":"a","private_key":"x"}"#),
            std::time::Duration::from_secs(1),
        )
        .unwrap();
        let config = config(&[]);
        let loader = DataLoader::new(Arc::new(client), &config.spreadsheet_title, Duration::seconds(600));
        let board = ScanBoard::new(loader, &config);

        let response = board.render(None, &Selection::default()).await;
        assert!(response.buckets.is_empty());
        let notice = response.notice.unwrap();
        assert!(notice.retryable);
        assert!(notice.message.contains("wait for the next refresh"));
    }

    #[tokio::test]
    async fn test_refresh_clears_cache() {
        let source = sheets();
        let board = board_with(source.clone(), &[]);
        let t0 = Utc::now();

        board.render_at(Some("Swing"), &Selection::default(), t0).await;
        board.render_at(Some("Swing"), &Selection::default(), t0).await;
        assert_eq!(source.fetches(), 2);

        assert_eq!(board.refresh().cleared, 2);
        board.render_at(None, &Selection::default(), t0).await;
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_refresh_cooldown() {
        let source = sheets();
        let board = board_with(source.clone(), &[("REFRESH_COOLDOWN_SECONDS", "30")]);
        let t0 = Utc::now();

        board.render_at(None, &Selection::default(), t0).await;
        let first = board.refresh_at(t0);
        assert!(!first.throttled);
        assert_eq!(first.cleared, 1);

        board.render_at(None, &Selection::default(), t0).await;
        let second = board.refresh_at(t0 + Duration::seconds(10));
        assert!(second.throttled);
        assert_eq!(second.cleared, 0);

        // Cache survived the ignored refresh
        board.render_at(None, &Selection::default(), t0).await;
        assert_eq!(source.fetches(), 2);

        let third = board.refresh_at(t0 + Duration::seconds(31));
        assert!(!third.throttled);
        assert_eq!(third.cleared, 1);
    }

    #[test]
    fn test_chart_lookup() {
        let board = board();
        assert!(board.chart("  ").is_none());
        let chart = board.chart("AAA").unwrap();
        assert_eq!(chart.symbol, "AAA");
        assert!(chart.url.starts_with("https://s.tradingview.com/widgetembed/?symbol=AAA"));
        assert_eq!(board.sheets().primary, "Data_Scan");
    }
}
