//! Configuration management for the scanner

use std::fmt;
use std::net::SocketAddr;

use crate::error::{Result, ScanError};
use crate::presenter::CardLayout;
use crate::rules::PartitionRule;
use crate::selection::ChartWidget;

const DEFAULT_RULE: &str = "label:signals:BREAKOUT,PULLBACK,SMC,MOMENTUM";

/// Upper bound for `CACHE_TTL_SECONDS` (one day)
pub const MAX_CACHE_TTL_SECONDS: i64 = 86_400;

pub const MAX_REFRESH_COOLDOWN_SECONDS: i64 = 3_600;

/// Label column for rules that do not group on one
const FALLBACK_LABEL_COLUMN: &str = "signals";

/// Service-account credential bundle, kept as the raw JSON text.
/// Only the auth module looks inside it.
#[derive(Clone)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (production, staging, development)
    pub environment: String,

    /// Log level
    pub log_level: String,

    pub bind_addr: SocketAddr,

    /// Page heading
    pub page_title: String,

    /// Data source
    pub spreadsheet_title: String,
    pub worksheets: Vec<String>, // first is primary
    pub cache_ttl_seconds: i64,
    pub http_timeout_seconds: u64,

    /// Minimum gap between manual refreshes
    pub refresh_cooldown_seconds: i64,

    /// Grouping of rows into tabs
    pub partition_rule: PartitionRule,

    /// Card fields
    pub name_column: String,
    pub price_column: String,
    pub entry_column: String,
    pub stop_loss_column: String,
    pub take_profit_columns: Vec<String>, // at most three

    /// Chart widget
    pub chart_base_url: String,
    pub chart_symbol_prefix: String,
    pub chart_interval: String,
    pub chart_theme: String,
    pub chart_timezone: String,
    pub chart_locale: String,

    /// Inline `GCP_SERVICE_ACCOUNT_JSON`, if set
    pub credentials_json: Option<Credentials>,

    /// `GCP_SERVICE_ACCOUNT_FILE`, if set
    pub credentials_file: Option<String>,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| -> String {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let list = |key: &str, default: &str| -> Vec<String> {
            text(key, default)
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect()
        };

        let bind_addr = text("BIND_ADDR", "0.0.0.0:8080");
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| ScanError::Config(format!("BIND_ADDR '{bind_addr}' is not a socket address: {e}")))?;

        let partition_rule = text("PARTITION_RULE", DEFAULT_RULE)
            .parse::<PartitionRule>()
            .map_err(|e| ScanError::Config(format!("PARTITION_RULE: {e}")))?;

        Ok(Self {
            environment: text("ENVIRONMENT", "production"),

            log_level: text("LOG_LEVEL", "info"),

            bind_addr,

            page_title: text("PAGE_TITLE", "Alpha Quant Scanner"),

            spreadsheet_title: text("SPREADSHEET_TITLE", "Stock_Scan_Result"),

            worksheets: list("WORKSHEETS", "Data_Scan"),

            cache_ttl_seconds: var("CACHE_TTL_SECONDS")
                .map(|v| v.trim().parse().unwrap_or(600))
                .unwrap_or(600),

            http_timeout_seconds: var("HTTP_TIMEOUT_SECONDS")
                .map(|v| v.trim().parse().unwrap_or(30))
                .unwrap_or(30),

            refresh_cooldown_seconds: var("REFRESH_COOLDOWN_SECONDS")
                .map(|v| v.trim().parse().unwrap_or(30))
                .unwrap_or(30),

            partition_rule,

            name_column: text("NAME_COLUMN", "name"),
            price_column: text("PRICE_COLUMN", "close"),
            entry_column: text("ENTRY_COLUMN", "entry"),
            stop_loss_column: text("STOP_LOSS_COLUMN", "stop_loss"),
            take_profit_columns: list("TAKE_PROFIT_COLUMNS", "tp1_rr1_1,tp2_rr1_2,tp3_rr1_3"),

            chart_base_url: text("CHART_BASE_URL", "https://s.tradingview.com/widgetembed/"),
            chart_symbol_prefix: text("CHART_SYMBOL_PREFIX", ""),
            chart_interval: text("CHART_INTERVAL", "D"),
            chart_theme: text("CHART_THEME", "dark"),
            chart_timezone: text("CHART_TIMEZONE", "Asia/Bangkok"),
            chart_locale: text("CHART_LOCALE", "en"),

            credentials_json: var("GCP_SERVICE_ACCOUNT_JSON")
                .filter(|v| !v.trim().is_empty())
                .map(Credentials::new),
            credentials_file: var("GCP_SERVICE_ACCOUNT_FILE").filter(|v| !v.trim().is_empty()),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.worksheets.is_empty() {
            return Err(ScanError::Config("At least one worksheet required".into()));
        }
        if !(1..=MAX_CACHE_TTL_SECONDS).contains(&self.cache_ttl_seconds) {
            return Err(ScanError::Config(format!(
                "cache_ttl_seconds must be between 1 and {MAX_CACHE_TTL_SECONDS}"
            )));
        }
        if !(0..=MAX_REFRESH_COOLDOWN_SECONDS).contains(&self.refresh_cooldown_seconds) {
            return Err(ScanError::Config(format!(
                "refresh_cooldown_seconds must be between 0 and {MAX_REFRESH_COOLDOWN_SECONDS}"
            )));
        }
        if self.http_timeout_seconds == 0 {
            return Err(ScanError::Config("http_timeout_seconds must be positive".into()));
        }
        if self.take_profit_columns.len() > 3 {
            return Err(ScanError::Config("At most three take-profit columns".into()));
        }
        if self.credentials_json.is_none() && self.credentials_file.is_none() {
            return Err(ScanError::Config(
                "Set GCP_SERVICE_ACCOUNT_JSON or GCP_SERVICE_ACCOUNT_FILE".into(),
            ));
        }
        Ok(())
    }

    /// Worksheet shown when none is requested
    pub fn primary_worksheet(&self) -> &str {
        self.worksheets.first().map_or("", String::as_str)
    }

    /// Credential bundle, read from the file when no inline JSON is set
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(credentials) = &self.credentials_json {
            return Ok(credentials.clone());
        }
        match &self.credentials_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Credentials::new)
                .map_err(|e| ScanError::Config(format!("Reading {path}: {e}"))),
            None => Err(ScanError::Config("No service-account credentials configured".into())),
        }
    }

    pub fn card_layout(&self) -> CardLayout {
        CardLayout {
            name_column: self.name_column.clone(),
            label_column: self
                .partition_rule
                .label_column()
                .unwrap_or(FALLBACK_LABEL_COLUMN)
                .to_string(),
            price_column: self.price_column.clone(),
            entry_column: self.entry_column.clone(),
            stop_loss_column: self.stop_loss_column.clone(),
            take_profit_columns: self.take_profit_columns.clone(),
        }
    }

    pub fn chart_widget(&self) -> ChartWidget {
        ChartWidget {
            base_url: self.chart_base_url.clone(),
            symbol_prefix: self.chart_symbol_prefix.clone(),
            interval: self.chart_interval.clone(),
            theme: self.chart_theme.clone(),
            timezone: self.chart_timezone.clone(),
            locale: self.chart_locale.clone(),
        }
    }
}
