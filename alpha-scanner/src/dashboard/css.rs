//! Dashboard CSS styles
//!
//! Contains all styling for the scanner UI.
//! Uses CSS custom properties (variables) for theming.

pub const STYLES: &str = r"
* { box-sizing: border-box; margin: 0; padding: 0; }

:root {
    --bg: #0d1117;
    --panel: #161b22;
    --border: #30363d;
    --text: #c9d1d9;
    --text-dim: #8b949e;
    --green: #3fb950;
    --red: #f85149;
    --blue: #58a6ff;
    --yellow: #d29922;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: var(--bg);
    color: var(--text);
    padding: 20px;
    min-height: 100vh;
}

.container { max-width: 1280px; margin: 0 auto; }
.hidden { display: none !important; }

/* Header */
header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 16px;
    padding-bottom: 16px;
    border-bottom: 1px solid var(--border);
}

h1 { font-size: 24px; font-weight: 600; }

.header-controls {
    display: flex;
    align-items: center;
    gap: 12px;
}

.refresh-time { font-size: 12px; color: var(--text-dim); }

.rule-badge {
    padding: 6px 12px;
    border-radius: 20px;
    font-size: 12px;
    font-family: monospace;
    background: rgba(88, 166, 255, 0.15);
    color: var(--blue);
}

/* Buttons */
.btn {
    padding: 8px 16px;
    border-radius: 6px;
    border: none;
    font-size: 13px;
    font-weight: 500;
    cursor: pointer;
    transition: all 0.2s;
}

.btn:disabled { opacity: 0.6; cursor: not-allowed; }
.btn-secondary { background: var(--border); color: var(--text); }
.btn-secondary:hover:not(:disabled) { background: #3d444d; }
.btn-chart { background: rgba(88, 166, 255, 0.15); color: var(--blue); margin-top: 12px; width: 100%; }
.btn-chart:hover:not(:disabled) { background: rgba(88, 166, 255, 0.3); }

/* Tabs */
.sheet-tabs, .bucket-tabs {
    display: flex;
    flex-wrap: wrap;
    gap: 8px;
    margin-bottom: 16px;
}

.tab {
    padding: 8px 14px;
    border-radius: 6px;
    border: 1px solid var(--border);
    background: transparent;
    color: var(--text-dim);
    font-size: 13px;
    cursor: pointer;
}

.tab.active { background: var(--blue); border-color: var(--blue); color: #fff; }
.tab .count { margin-left: 6px; opacity: 0.8; }

/* Notices */
.notice, .bucket-notice {
    border-radius: 8px;
    padding: 12px 16px;
    margin-bottom: 16px;
    font-size: 14px;
    background: rgba(139, 148, 158, 0.15);
    color: var(--text-dim);
}

.notice.retryable, .bucket-notice.retryable { background: rgba(210, 153, 34, 0.15); color: var(--yellow); }

/* Grid Layout */
.grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(300px, 1fr));
    gap: 16px;
}

.wide { grid-column: 1 / -1; }

.panel {
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 12px;
    padding: 20px;
}

.panel-header {
    display: flex;
    justify-content: space-between;
    align-items: center;
    margin-bottom: 16px;
}

.panel-title {
    font-size: 14px;
    color: var(--text-dim);
    text-transform: uppercase;
    letter-spacing: 0.5px;
}

select {
    background: var(--bg);
    color: var(--text);
    border: 1px solid var(--border);
    border-radius: 6px;
    padding: 6px 10px;
}

/* Signal Cards */
.card-grid {
    display: grid;
    grid-template-columns: repeat(auto-fill, minmax(220px, 1fr));
    gap: 12px;
}

.signal-card {
    background: rgba(255, 255, 255, 0.03);
    border: 1px solid transparent;
    border-radius: 8px;
    padding: 14px;
}

.signal-card.selected { border-color: var(--blue); }

.signal-symbol { font-weight: 600; font-size: 16px; }

.signal-label {
    font-size: 11px;
    margin-top: 4px;
    padding: 3px 8px;
    border-radius: 4px;
    display: inline-block;
    background: rgba(63, 185, 80, 0.2);
    color: var(--green);
}

.signal-row {
    display: flex;
    justify-content: space-between;
    padding: 3px 0;
    font-size: 13px;
}

.signal-row .label { color: var(--text-dim); }
.signal-row.stop .value { color: var(--red); }
.signal-row.target .value { color: var(--green); }

/* Chart */
.chart-frame { position: relative; height: 520px; }
.chart-frame iframe { width: 100%; height: 100%; border: none; border-radius: 8px; }

.chart-empty {
    position: absolute;
    inset: 0;
    display: flex;
    align-items: center;
    justify-content: center;
    color: var(--text-dim);
}

/* Responsive */
@media (max-width: 600px) {
    .grid { grid-template-columns: 1fr; }
    header { flex-direction: column; gap: 12px; }
    .header-controls { flex-wrap: wrap; justify-content: center; }
    .chart-frame { height: 360px; }
}
";
