//! Dashboard HTML template
//!
//! Contains the main page structure including:
//! - Header with title, refresh time and refresh button
//! - Worksheet tabs and signal tabs
//! - Card grid for the active signal tab
//! - Symbol picker and chart frame

pub const TEMPLATE: &str = r#"
    <div class="container">
        <header>
            <div>
                <h1 id="pageTitle">__PAGE_TITLE__</h1>
                <span class="refresh-time" id="refreshTime">Loading...</span>
            </div>
            <div class="header-controls">
                <span class="rule-badge" id="ruleBadge"></span>
                <button class="btn btn-secondary" onclick="refreshNow()" id="refreshBtn">🔄 Refresh</button>
            </div>
        </header>

        <nav class="sheet-tabs" id="sheetTabs"></nav>

        <div class="notice hidden" id="boardNotice"></div>

        <div class="grid">
            <!-- Signal Tabs -->
            <div class="panel wide">
                <nav class="bucket-tabs" id="bucketTabs"></nav>
                <div class="bucket-notice hidden" id="bucketNotice"></div>
                <div class="card-grid" id="cardGrid"></div>
            </div>

            <!-- Chart -->
            <div class="panel wide">
                <div class="panel-header">
                    <span class="panel-title">📈 Chart</span>
                    <select id="symbolSelect" onchange="selectSymbol(this.value)"></select>
                </div>
                <div class="chart-frame">
                    <iframe id="chartFrame" title="Chart" allowfullscreen></iframe>
                    <div class="chart-empty" id="chartEmpty">Pick a symbol to show its chart</div>
                </div>
            </div>
        </div>
    </div>
"#;
