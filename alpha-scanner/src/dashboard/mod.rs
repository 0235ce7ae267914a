//! Dashboard module - Scanner web interface
//!
//! Provides a single-page dashboard for browsing scan results.
//! Separated into HTML, CSS, and JS submodules for maintainability.
//!
//! # Architecture
//! - `html.rs`: Page structure and layout
//! - `css.rs`: Styling with CSS custom properties
//! - `js.rs`: API calls, UI updates, user interactions
//!
//! # Features
//! - Worksheet tabs and signal tabs with row counts
//! - Signal cards with entry, stop-loss and take-profit levels
//! - Symbol picker driving an embedded chart
//! - 5-minute auto-refresh plus a manual refresh

mod css;
mod html;
mod js;

/// Generate the complete dashboard HTML page
pub fn dashboard_html(title: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{css}
    </style>
</head>
<body>
{html}
    <script>
{js}
    </script>
</body>
</html>"#,
        css = css::STYLES,
        html = html::TEMPLATE.replace("__PAGE_TITLE__", &title),
        js = js::SCRIPT
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
