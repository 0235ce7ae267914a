//! Dashboard JavaScript
//!
//! Client-side logic for the scan board:
//! - Fetches the board for the active worksheet and selection
//! - Renders sheet tabs, signal tabs, cards and the chart frame
//! - Keeps sheet, tab and symbol in the page URL (per browser tab)
//! - Auto-refresh every 5 minutes, manual refresh clears the server cache

pub const SCRIPT: &str = r#"
// ============================================================================
// Configuration
// ============================================================================
const CONFIG = {
    refreshInterval: 300000,  // 5 minutes
    apiBase: ''
};

// ============================================================================
// State (mirrored in the URL so each browser tab keeps its own)
// ============================================================================
const params = new URLSearchParams(window.location.search);
const view = {
    sheet: params.get('sheet') || '',
    tab: params.get('tab') || '',
    symbol: params.get('symbol') || ''
};
let board = null;

function saveView() {
    const next = new URLSearchParams();
    if (view.sheet) next.set('sheet', view.sheet);
    if (view.tab) next.set('tab', view.tab);
    if (view.symbol) next.set('symbol', view.symbol);
    const query = next.toString();
    history.replaceState(null, '', query ? '?' + query : window.location.pathname);
}

// ============================================================================
// API Functions
// ============================================================================
async function fetchJSON(endpoint, options) {
    try {
        const res = await fetch(CONFIG.apiBase + endpoint, options);
        return await res.json();
    } catch (e) {
        console.error(`Error fetching ${endpoint}:`, e);
        return null;
    }
}

function boardEndpoint() {
    const query = new URLSearchParams();
    if (view.sheet) query.set('sheet', view.sheet);
    if (view.symbol) query.set('symbol', view.symbol);
    return '/api/board?' + query.toString();
}

// ============================================================================
// Formatting Utilities
// ============================================================================
function esc(value) {
    return String(value ?? '')
        .replace(/&/g, '&amp;')
        .replace(/</g, '&lt;')
        .replace(/>/g, '&gt;')
        .replace(/"/g, '&quot;')
        .replace(/'/g, '&#39;');
}

function showNotice(el, notice) {
    if (!notice) {
        el.classList.add('hidden');
        return;
    }
    el.textContent = notice.message;
    el.className = el.className.split(' ')[0] + (notice.retryable ? ' retryable' : '');
}

// ============================================================================
// UI Update Functions
// ============================================================================
function updateTimestamp() {
    document.getElementById('refreshTime').textContent = 'Updated: ' + new Date().toLocaleTimeString();
}

function updateHeader() {
    document.getElementById('pageTitle').textContent = board.title;
    document.title = board.title;
    document.getElementById('ruleBadge').textContent = board.rule;
}

function updateSheetTabs() {
    const nav = document.getElementById('sheetTabs');
    if (board.sheets.length < 2) {
        nav.innerHTML = '';
        return;
    }
    nav.innerHTML = board.sheets.map(name =>
        `<button class="tab ${name === board.sheet ? 'active' : ''}" data-sheet="${esc(name)}">${esc(name)}</button>`
    ).join('');
    nav.querySelectorAll('button').forEach(btn => {
        btn.onclick = () => selectSheet(btn.dataset.sheet);
    });
}

function updateBucketTabs() {
    const nav = document.getElementById('bucketTabs');
    const buckets = board.buckets;
    if (!buckets.some(b => b.name === view.tab)) {
        view.tab = buckets.length ? buckets[0].name : '';
    }
    nav.innerHTML = buckets.map(b =>
        `<button class="tab ${b.name === view.tab ? 'active' : ''}" data-tab="${esc(b.name)}">${esc(b.name)}<span class="count">${b.count}</span></button>`
    ).join('');
    nav.querySelectorAll('button').forEach(btn => {
        btn.onclick = () => selectTab(btn.dataset.tab);
    });
}

function renderCard(card) {
    const selected = card.selectable && card.symbol === board.selected ? ' selected' : '';
    const targets = card.take_profits.map(tp =>
        `<div class="signal-row target"><span class="label">${esc(tp.label)}</span><span class="value">${esc(tp.value)}</span></div>`
    ).join('');
    const chartBtn = card.selectable
        ? `<button class="btn btn-chart" data-symbol="${esc(card.symbol)}">📈 Chart</button>`
        : '';
    return `<div class="signal-card${selected}">
        <div class="signal-symbol">${esc(card.symbol)}</div>
        <div class="signal-label">${esc(card.label)}</div>
        <div class="signal-row"><span class="label">Close</span><span class="value">${esc(card.price)}</span></div>
        <div class="signal-row"><span class="label">Entry</span><span class="value">${esc(card.entry)}</span></div>
        <div class="signal-row stop"><span class="label">Stop</span><span class="value">${esc(card.stop_loss)}</span></div>
        ${targets}
        ${chartBtn}
    </div>`;
}

function updateCards() {
    const grid = document.getElementById('cardGrid');
    const bucket = board.buckets.find(b => b.name === view.tab);
    showNotice(document.getElementById('bucketNotice'), bucket ? bucket.notice : null);
    grid.innerHTML = bucket ? bucket.cards.map(renderCard).join('') : '';
    grid.querySelectorAll('button[data-symbol]').forEach(btn => {
        btn.onclick = () => selectSymbol(btn.dataset.symbol);
    });
}

function updateSymbolSelect() {
    const select = document.getElementById('symbolSelect');
    const symbols = board.symbols.slice();
    if (board.selected && !symbols.includes(board.selected)) symbols.unshift(board.selected);
    select.innerHTML = symbols.map(s =>
        `<option value="${esc(s)}" ${s === board.selected ? 'selected' : ''}>${esc(s)}</option>`
    ).join('');
}

function updateChart() {
    const frame = document.getElementById('chartFrame');
    const empty = document.getElementById('chartEmpty');
    if (board.chart_url) {
        if (frame.getAttribute('src') !== board.chart_url) frame.src = board.chart_url;
        empty.classList.add('hidden');
    } else {
        frame.removeAttribute('src');
        empty.classList.remove('hidden');
    }
}

function render() {
    updateHeader();
    updateSheetTabs();
    showNotice(document.getElementById('boardNotice'), board.notice);
    updateBucketTabs();
    updateCards();
    updateSymbolSelect();
    updateChart();
    saveView();
}

// ============================================================================
// Main Update Function
// ============================================================================
async function updateDashboard() {
    const data = await fetchJSON(boardEndpoint());
    if (!data) {
        showNotice(document.getElementById('boardNotice'), {
            message: 'Could not reach the scanner. Please wait for the next refresh.',
            retryable: true
        });
        return;
    }
    board = data;
    updateTimestamp();
    render();
}

// ============================================================================
// User Actions
// ============================================================================
function selectSheet(name) {
    view.sheet = name;
    view.tab = '';
    updateDashboard();
}

function selectTab(name) {
    view.tab = name;
    updateBucketTabs();
    updateCards();
    saveView();
}

async function selectSymbol(symbol) {
    view.symbol = symbol;
    if (!board) return updateDashboard();
    const chart = await fetchJSON('/api/chart?symbol=' + encodeURIComponent(symbol));
    if (chart && chart.url) {
        board.selected = chart.symbol;
        board.chart_url = chart.url;
    }
    updateCards();
    updateSymbolSelect();
    updateChart();
    saveView();
}

async function refreshNow() {
    const btn = document.getElementById('refreshBtn');
    btn.disabled = true;
    btn.textContent = '⏳';

    const result = await fetchJSON('/api/refresh', { method: 'POST' });
    await updateDashboard();
    if (result && result.throttled) {
        showNotice(document.getElementById('boardNotice'), {
            message: 'Refreshed moments ago. Showing cached results.',
            retryable: false
        });
    }

    btn.disabled = false;
    btn.textContent = '🔄 Refresh';
}

// ============================================================================
// Initialization
// ============================================================================
updateDashboard();
setInterval(updateDashboard, CONFIG.refreshInterval);
"#;
