//! Symbol selection and chart lookup
//!
//! The selected symbol belongs to one browser session. It arrives with each
//! board request and is never stored on the server.

use crate::types::Table;

/// The session's selected symbol, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Option<String>);

impl Selection {
    /// Blank input means nothing is selected
    pub fn from_query(symbol: Option<&str>) -> Self {
        Self(
            symbol
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        )
    }

    pub fn symbol(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Selected symbol, or the first named row of the primary table.
    /// A selected symbol is used as-is, even if no row carries it.
    pub fn resolve(&self, primary: Option<&Table>, name_column: &str) -> Option<String> {
        if let Some(symbol) = &self.0 {
            return Some(symbol.clone());
        }
        primary?
            .rows()
            .iter()
            .find_map(|row| row.text(name_column))
            .map(|name| name.trim().to_string())
    }
}

/// Embedded chart widget parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ChartWidget {
    pub base_url: String,
    /// Exchange prefix such as `SET:`; empty for none
    pub symbol_prefix: String,
    pub interval: String,
    pub theme: String,
    pub timezone: String,
    pub locale: String,
}

impl Default for ChartWidget {
    fn default() -> Self {
        Self {
            base_url: "https://s.tradingview.com/widgetembed/".to_string(),
            symbol_prefix: String::new(),
            interval: "D".to_string(),
            theme: "dark".to_string(),
            timezone: "Asia/Bangkok".to_string(),
            locale: "en".to_string(),
        }
    }
}

impl ChartWidget {
    /// Widget URL for a symbol. Whether the chart service knows the
    /// symbol is not checked.
    pub fn url(&self, symbol: &str) -> String {
        let full_symbol = format!("{}{}", self.symbol_prefix, symbol.trim());
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        format!(
            "{base}{separator}symbol={symbol}&interval={interval}&theme={theme}&timezone={timezone}&locale={locale}",
            base = self.base_url,
            symbol = urlencoding::encode(&full_symbol),
            interval = urlencoding::encode(&self.interval),
            theme = urlencoding::encode(&self.theme),
            timezone = urlencoding::encode(&self.timezone),
            locale = urlencoding::encode(&self.locale),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, Row};

    fn primary() -> Table {
        Table::new(
            "Data_Scan",
            &["name", "close"],
            vec![
                Row::new().with("name", Cell::Blank).with("close", Cell::Number(1.0)),
                Row::new().with("name", Cell::Text("AAA".into())),
                Row::new().with("name", Cell::Text("BBB".into())),
            ],
        )
    }

    #[test]
    fn test_blank_query_is_unset() {
        assert_eq!(Selection::from_query(Some("  ")), Selection::default());
        assert_eq!(Selection::from_query(None).symbol(), None);
        assert_eq!(Selection::from_query(Some(" PTT ")).symbol(), Some("PTT"));
    }

    #[test]
    fn test_defaults_to_first_named_row() {
        let table = primary();
        let selection = Selection::default();
        assert_eq!(selection.resolve(Some(&table), "name").as_deref(), Some("AAA"));
        assert_eq!(selection.resolve(None, "name"), None);
    }

    #[test]
    fn test_explicit_selection_not_validated() {
        let table = primary();
        let selection = Selection::from_query(Some("XYZ"));
        assert_eq!(selection.resolve(Some(&table), "name").as_deref(), Some("XYZ"));
    }

    #[test]
    fn test_chart_url_encodes_parameters() {
        let widget = ChartWidget {
            symbol_prefix: "SET:".to_string(),
            ..ChartWidget::default()
        };
        let url = widget.url("PTT");
        assert!(url.starts_with("https://s.tradingview.com/widgetembed/?symbol=SET%3APTT"));
        assert!(url.contains("&interval=D"));
        assert!(url.contains("&theme=dark"));
        assert!(url.contains("&timezone=Asia%2FBangkok"));
        assert!(url.ends_with("&locale=en"));
    }

    #[test]
    fn test_chart_url_appends_to_existing_query() {
        let widget = ChartWidget {
            base_url: "https://charts.example/embed?frame=1".to_string(),
            ..ChartWidget::default()
        };
        assert!(widget.url("AAA").starts_with("https://charts.example/embed?frame=1&symbol=AAA"));
    }
}
