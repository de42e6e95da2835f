//! Embedded HTML/CSS/JS frontend for the gridsight dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>gridsight Dashboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: baseline;
  gap: 12px;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }
header h1 .logo { color: var(--accent); font-family: var(--mono); font-weight: 700; }
header .subtitle { color: var(--text-muted); font-size: 13px; }

nav {
  display: flex;
  gap: 4px;
  margin-bottom: 24px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav button {
  flex: 1;
  padding: 8px 16px;
  border: none;
  border-radius: 6px;
  background: transparent;
  color: var(--text-muted);
  font-size: 13px;
  font-weight: 500;
  cursor: pointer;
}
nav button:hover { color: var(--text); background: rgba(255,255,255,0.04); }
nav button.active { background: var(--accent); color: #fff; }

.page { display: none; }
.page.active { display: block; }

.grid { display: grid; grid-template-columns: 1fr 2fr; gap: 16px; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 16px; }

label { display: block; font-size: 12px; color: var(--text-muted); margin: 8px 0 4px; }
input {
  width: 100%;
  padding: 6px 10px;
  background: var(--bg);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: 6px;
  font-family: var(--mono);
}
.row { display: flex; gap: 8px; }

button.btn {
  margin-top: 12px;
  padding: 8px 14px;
  border: none;
  border-radius: 6px;
  background: var(--accent);
  color: #fff;
  font-weight: 500;
  cursor: pointer;
}
button.btn.secondary { background: var(--border); }
button.btn:disabled { opacity: 0.5; cursor: default; }

.value { font-size: 32px; font-weight: 700; font-family: var(--mono); color: var(--accent); }
.value.red { color: var(--red); }
.value.green { color: var(--green); }
.muted { color: var(--text-muted); font-size: 12px; }
.error { color: var(--red); margin-top: 8px; }
.ok { color: var(--green); margin-top: 8px; }
.insight { white-space: pre-wrap; margin-top: 12px; font-size: 13px; }
.insight.error { color: var(--red); }

table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-weight: 500; }
td { font-family: var(--mono); }
tbody tr.clickable { cursor: pointer; }
tbody tr.clickable:hover { background: rgba(255,255,255,0.04); }
</style>
</head>
<body>
<div class="app">
<header>
  <h1><span class="logo">gridsight</span></h1>
  <span class="subtitle">smart-grid predictions</span>
</header>

<nav>
  <button data-page="energy" class="active">Energy Demand</button>
  <button data-page="fault">Fault Prediction</button>
  <button data-page="search">Timestamp Search</button>
</nav>

<!-- Energy -->
<section id="page-energy" class="page active">
  <div class="grid">
    <div class="card">
      <h2>Forecast inputs</h2>
      <form id="energy-form"></form>
      <button class="btn" id="energy-submit">Predict</button>
      <div id="energy-error" class="error"></div>
    </div>
    <div class="card">
      <h2>Forecast</h2>
      <div id="energy-result" class="muted">Prediction results will be shown here.</div>
      <button class="btn secondary" id="energy-insights" disabled>Generate insights</button>
      <div id="energy-insight" class="insight"></div>
    </div>
  </div>
  <div class="card">
    <h2>History <button class="btn secondary" data-clear="energy">Clear</button></h2>
    <div id="energy-log"></div>
  </div>
</section>

<!-- Fault -->
<section id="page-fault" class="page">
  <div class="grid">
    <div class="card">
      <h2>Sensor reading</h2>
      <form id="fault-form"></form>
      <button class="btn" id="fault-submit">Predict</button>
      <div id="fault-error" class="error"></div>
    </div>
    <div class="card">
      <h2>Verdict</h2>
      <div id="fault-result" class="muted">Prediction results will be shown here.</div>
      <button class="btn secondary" id="fault-insights" disabled>Suggest diagnostic steps</button>
      <div id="fault-insight" class="insight"></div>
    </div>
  </div>
  <div class="card">
    <h2>History <button class="btn secondary" data-clear="fault">Clear</button></h2>
    <div id="fault-log"></div>
  </div>
</section>

<!-- Search -->
<section id="page-search" class="page">
  <div class="grid">
    <div class="card">
      <h2>1. Upload data</h2>
      <input type="file" id="search-file" accept=".csv">
      <button class="btn" id="search-upload" disabled>Upload</button>
      <div id="search-upload-status" class="muted"></div>
      <h2 style="margin-top:20px">2. Search</h2>
      <input id="search-timestamp">
      <button class="btn" id="search-submit" disabled>Search</button>
      <div id="search-error" class="error"></div>
    </div>
    <div class="card">
      <h2>Nearest readings</h2>
      <div class="row" id="filter-form"></div>
      <button class="btn secondary" id="filter-apply">Apply filters</button>
      <button class="btn secondary" id="filter-reset">Reset</button>
      <div id="search-meta" class="muted" style="margin-top:12px"></div>
      <div id="search-results"></div>
      <button class="btn secondary" id="search-insights" disabled>Analyze cluster</button>
      <div id="search-insight" class="insight"></div>
    </div>
  </div>
  <div class="card">
    <h2>Add a reading</h2>
    <form id="bulb-form" class="row" style="flex-wrap:wrap"></form>
    <button class="btn" id="bulb-submit">Add</button>
    <div id="bulb-status"></div>
  </div>
</section>
</div>

<script>
const $ = id => document.getElementById(id);
const now = n => new Date().toISOString().slice(0, n).replace('T', ' ');

const ENERGY_FIELDS = [
  ['timestamp', now(16)], ['lag_24h', 135.5], ['Temp', 22.5], ['RH', 55], ['FF', 15], ['P', 1012],
];
const FAULT_FIELDS = [
  ['bulbNumber', '101'], ['timestamp', now(19)], ['powerConsumption', '120'],
  ['voltageLevels', '230'], ['currentFluctuations', '5'], ['temperature', '25'],
  ['currentFluctuationsEnv', '3'], ['environmentalConditions', 'Rainy'],
];
const FILTER_FIELDS = [
  ['bulb_number', ''], ['env_cond', ''], ['power_min', ''], ['power_max', ''],
  ['voltage_min', ''], ['voltage_max', ''], ['temp_min', ''], ['temp_max', ''],
];
const BULB_FIELDS = [
  ['bulb_number', ''], ['timestamp', now(19)], ['power_consumption', ''],
  ['voltage_levels', ''], ['current_fluctuations', ''], ['temperature', ''],
  ['current_fluctuations_env', ''], ['environmental_conditions', 'Clear'],
];
const NEIGHBOR_COLUMNS = [
  'bulb_number', 'timestamp', 'power_consumption', 'voltage_levels',
  'temperature', 'environmental_conditions', 'distance',
];

function buildForm(id, fields) {
  $(id).innerHTML = fields.map(([name, value]) =>
    `<div><label>${name}</label><input name="${name}" value="${value}"></div>`).join('');
}

function readForm(id) {
  const out = {};
  $(id).querySelectorAll('input').forEach(i => { out[i.name] = i.value; });
  return out;
}

function fillForm(id, values) {
  $(id).querySelectorAll('input').forEach(i => {
    if (i.name in values) i.value = values[i.name];
  });
}

async function api(method, path, body, raw) {
  const opts = { method };
  if (body !== undefined) {
    opts.body = raw ? body : JSON.stringify(body);
    if (!raw) opts.headers = { 'Content-Type': 'application/json' };
  }
  const resp = await fetch(path, opts);
  const data = await resp.json().catch(() => ({}));
  if (!resp.ok) throw new Error(data.error || `request failed (${resp.status})`);
  return data;
}

function table(rows, columns, onClick) {
  if (!rows.length) return '<div class="muted">Nothing yet.</div>';
  const head = columns.map(c => `<th>${c}</th>`).join('');
  const body = rows.map((r, i) =>
    `<tr class="${onClick ? 'clickable' : ''}" data-row="${i}">` +
    columns.map(c => `<td>${r[c] ?? ''}</td>`).join('') + '</tr>').join('');
  return `<table><thead><tr>${head}</tr></thead><tbody>${body}</tbody></table>`;
}

// -- History --

async function loadLog(log, formId) {
  const data = await api('GET', `/api/history/${log}`);
  const rows = data.entries.map(e => ({ ...e.inputs, ...e.results }));
  const columns = [...new Set(rows.flatMap(Object.keys))];
  $(`${log}-log`).innerHTML = table(rows, columns, true);
  $(`${log}-log`).querySelectorAll('tr.clickable').forEach(tr => {
    tr.onclick = async () => {
      const inputs = await api('GET', `/api/history/${log}/${tr.dataset.row}`);
      fillForm(formId, inputs);
    };
  });
}

document.querySelectorAll('[data-clear]').forEach(b => {
  b.onclick = async () => {
    const log = b.dataset.clear;
    await api('DELETE', `/api/history/${log}`);
    loadLog(log, `${log}-form`);
  };
});

// -- Insights --

async function insights(kind, target) {
  $(target).className = 'insight muted';
  $(target).textContent = 'Generating...';
  try {
    const data = await api('POST', `/api/insights/${kind}`);
    $(target).className = data.error ? 'insight error' : 'insight';
    $(target).textContent = data.text;
  } catch (e) {
    $(target).className = 'insight error';
    $(target).textContent = e.message;
  }
}

// -- Energy --

$('energy-submit').onclick = async () => {
  $('energy-error').textContent = '';
  $('energy-insight').textContent = '';
  $('energy-insights').disabled = true;
  try {
    const data = await api('POST', '/api/energy/predict', readForm('energy-form'));
    const models = Object.entries(data.prediction.predictions)
      .map(([m, v]) => `<tr><td>${m}</td><td>${v} W</td></tr>`).join('');
    $('energy-result').innerHTML =
      `<div class="value">${data.average} W</div>` +
      `<div class="muted">average for ${data.prediction.timestamp}</div>` +
      `<table><tbody>${models}</tbody></table>`;
    $('energy-insights').disabled = false;
    loadLog('energy', 'energy-form');
  } catch (e) {
    $('energy-error').textContent = e.message;
  }
};
$('energy-insights').onclick = () => insights('energy', 'energy-insight');

// -- Fault --

$('fault-submit').onclick = async () => {
  $('fault-error').textContent = '';
  $('fault-insight').textContent = '';
  $('fault-insights').disabled = true;
  try {
    const data = await api('POST', '/api/faults/predict', readForm('fault-form'));
    const s = data.summary;
    const probs = Object.entries(s.multiclass.probabilities)
      .map(([k, v]) => `<tr><td>${k}</td><td>${v}%</td></tr>`).join('');
    $('fault-result').innerHTML =
      `<div class="value ${data.is_fault ? 'red' : 'green'}">${s.binary.prediction}</div>` +
      `<div class="muted">fault ${s.binary.probability}% / no fault ${data.no_fault_percent}%</div>` +
      `<div style="margin-top:12px">Type: <strong>${s.multiclass.prediction}</strong></div>` +
      `<table><tbody>${probs}</tbody></table>`;
    $('fault-insights').disabled = !data.is_fault;
    loadLog('fault', 'fault-form');
  } catch (e) {
    $('fault-error').textContent = e.message;
  }
};
$('fault-insights').onclick = () => insights('fault', 'fault-insight');

// -- Search --

function showNeighbours(rows, total) {
  $('search-results').innerHTML = table(rows, NEIGHBOR_COLUMNS, false);
  if (total !== undefined) $('search-meta').textContent += ` (${rows.length} of ${total} shown)`;
}

$('search-file').onchange = () => {
  $('search-upload').disabled = !$('search-file').files.length;
  $('search-submit').disabled = true;
  $('search-upload-status').textContent = '';
};

$('search-upload').onclick = async () => {
  const file = $('search-file').files[0];
  if (!file) return;
  $('search-upload-status').textContent = 'Uploading...';
  try {
    const data = await api('POST', `/api/search/upload?name=${encodeURIComponent(file.name)}`, file, true);
    $('search-upload-status').textContent = data.message || `${data.file} loaded`;
    $('search-submit').disabled = !data.loaded;
  } catch (e) {
    $('search-upload-status').textContent = e.message;
  }
};

$('search-submit').onclick = async () => {
  $('search-error').textContent = '';
  $('search-insight').textContent = '';
  try {
    const data = await api('POST', '/api/search/query', { timestamp: $('search-timestamp').value });
    $('search-meta').textContent =
      `query ${data.result.query_timestamp} answered in ${data.result.elapsed_ms} ms`;
    showNeighbours(data.filtered, data.result.neighbours.length);
    $('search-insights').disabled = false;
  } catch (e) {
    $('search-error').textContent = e.message;
  }
};

async function applyFilters() {
  const data = await api('POST', '/api/search/filter', readForm('filter-form'));
  $('search-meta').textContent = '';
  showNeighbours(data.filtered, data.total);
}
$('filter-apply').onclick = applyFilters;
$('filter-reset').onclick = () => { buildForm('filter-form', FILTER_FIELDS); applyFilters(); };
$('search-insights').onclick = () => insights('cluster', 'search-insight');

$('bulb-submit').onclick = async () => {
  $('bulb-status').className = '';
  try {
    await api('POST', '/api/search/add', readForm('bulb-form'));
    $('bulb-status').className = 'ok';
    $('bulb-status').textContent = 'Bulb record added successfully!';
  } catch (e) {
    $('bulb-status').className = 'error';
    $('bulb-status').textContent = e.message;
  }
};

// -- Navigation --

document.querySelectorAll('nav button').forEach(b => {
  b.onclick = () => {
    document.querySelectorAll('nav button').forEach(x => x.classList.toggle('active', x === b));
    document.querySelectorAll('.page').forEach(p =>
      p.classList.toggle('active', p.id === `page-${b.dataset.page}`));
  };
});

buildForm('energy-form', ENERGY_FIELDS);
buildForm('fault-form', FAULT_FIELDS);
buildForm('filter-form', FILTER_FIELDS);
buildForm('bulb-form', BULB_FIELDS);
$('search-timestamp').value = now(19);
loadLog('energy', 'energy-form');
loadLog('fault', 'fault-form');
</script>
</body>
</html>"##;
