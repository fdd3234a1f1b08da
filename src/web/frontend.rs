//! Embedded HTML/CSS/JS frontend for the loadwatch dashboard.
//!
//! The page holds no state of its own: it renders whatever
//! `/api/snapshot` returns and sends filter, selection and refresh
//! requests back to the server.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>loadwatch</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --surface-2: #1f2630;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --blue: #388bfd;
  --gray: #6e7681;
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

.app { max-width: 1280px; margin: 0 auto; padding: 24px; }

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 20px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 22px; font-weight: 600; }
header .meta { color: var(--text-muted); font-size: 12px; }

nav { display: flex; gap: 8px; margin-bottom: 20px; }
button {
  background: var(--surface-2);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 6px 14px;
  cursor: pointer;
  font: inherit;
}
button:hover { border-color: var(--accent); }
button.active { background: var(--accent); border-color: var(--accent); color: #0d1117; }

.hidden { display: none !important; }

.toolbar { display: flex; flex-wrap: wrap; gap: 8px; margin-bottom: 12px; align-items: center; }
.toolbar input {
  flex: 1;
  min-width: 200px;
  background: var(--surface);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 6px 10px;
  font: inherit;
}

.split { display: grid; grid-template-columns: 380px 1fr; gap: 16px; }
.panel {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
}
.loads { max-height: 70vh; overflow-y: auto; display: flex; flex-direction: column; gap: 8px; }

.card {
  background: var(--surface-2);
  border: 1px solid transparent;
  border-radius: var(--radius);
  padding: 12px;
  cursor: pointer;
}
.card:hover { border-color: var(--border); }
.card.selected { border-color: var(--accent); }
.card .top { display: flex; justify-content: space-between; margin-bottom: 6px; }
.card .route { display: flex; justify-content: space-between; color: var(--text-muted); }
.card .foot { display: flex; justify-content: space-between; font-size: 12px; color: var(--text-muted); margin-top: 6px; }

.badge { padding: 1px 8px; border-radius: 10px; font-size: 12px; color: #fff; }
.badge.Available { background: var(--green); }
.badge.Booked { background: var(--blue); }
.badge.Covered { background: var(--gray); }

.empty { text-align: center; color: var(--text-muted); padding: 32px 0; }

.details h2 { font-size: 20px; margin-bottom: 12px; display: flex; gap: 12px; align-items: center; }
.grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 12px; }
.field .label { color: var(--text-muted); font-size: 12px; }
.field .value { font-size: 16px; }
.notes { margin-top: 16px; color: var(--text-muted); }

table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 8px; border-bottom: 1px solid var(--border); }
th { color: var(--text-muted); font-weight: 500; font-size: 12px; text-transform: uppercase; }
td.num { text-align: right; font-family: var(--mono); }

.kpis { display: grid; grid-template-columns: repeat(5, 1fr); gap: 12px; margin-bottom: 16px; }
.kpi .value { font-size: 24px; font-weight: 600; }
.kpi .label { color: var(--text-muted); font-size: 12px; }

.charts { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
.bar-row { display: grid; grid-template-columns: 140px 1fr 40px; gap: 8px; align-items: center; margin: 6px 0; }
.bar { height: 14px; background: var(--accent); border-radius: 3px; }
.bar-row .count { text-align: right; font-family: var(--mono); color: var(--text-muted); }
</style>
</head>
<body>
<div class="app">
  <header>
    <h1>loadwatch</h1>
    <div>
      <span class="meta" id="updated">waiting for data…</span>
      <button id="refreshBtn" onclick="refreshNow()">Refresh</button>
    </div>
  </header>

  <nav>
    <button class="view-btn active" data-view="loads" onclick="switchView('loads')">Loads</button>
    <button class="view-btn" data-view="calls" onclick="switchView('calls')">Calls</button>
    <button class="view-btn" data-view="analytics" onclick="switchView('analytics')">Analytics</button>
  </nav>

  <section id="loadsView" class="view">
    <div class="toolbar">
      <button class="tab-btn" data-tab="available" onclick="setFilters({tab: 'available'})">Available</button>
      <button class="tab-btn" data-tab="booked" onclick="setFilters({tab: 'booked'})">Booked</button>
      <button class="tab-btn" data-tab="all" onclick="setFilters({tab: 'all'})">All</button>
      <span style="width: 16px"></span>
      <button class="eq-btn" data-eq="" onclick="setFilters({equipment_type: ''})">All equipment</button>
      <button class="eq-btn" data-eq="Dry Van" onclick="setFilters({equipment_type: 'Dry Van'})">Dry Van</button>
      <button class="eq-btn" data-eq="Reefer" onclick="setFilters({equipment_type: 'Reefer'})">Reefer</button>
      <button class="eq-btn" data-eq="Flatbed" onclick="setFilters({equipment_type: 'Flatbed'})">Flatbed</button>
      <input id="search" type="search" placeholder="Search id, city or equipment">
    </div>
    <div class="split">
      <div class="panel loads" id="loadsList"></div>
      <div class="panel details" id="details"></div>
    </div>
  </section>

  <section id="callsView" class="view hidden">
    <div class="panel">
      <table>
        <thead>
          <tr><th>Time</th><th>Carrier</th><th>MC</th><th>Load</th><th>Route</th><th>Outcome</th><th>Rate</th><th>Sentiment</th></tr>
        </thead>
        <tbody id="callsBody"></tbody>
      </table>
    </div>
  </section>

  <section id="analyticsView" class="view hidden">
    <div class="kpis" id="kpis"></div>
    <div class="charts">
      <div class="panel"><h3>Call outcomes</h3><div id="outcomes"></div></div>
      <div class="panel"><h3>Carrier sentiment</h3><div id="sentiment"></div></div>
    </div>
  </section>
</div>

<script>
const POLL_MS = 2000;
let snapshot = null;
let searchTimer = null;

function esc(value) {
  return String(value ?? '').replace(/[&<>"']/g, c => ({
    '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'
  })[c]);
}

function money(n) {
  return '$' + Math.round(n || 0).toLocaleString();
}

function city(location) {
  return String(location || '').split(',')[0].trim();
}

function rate(load) {
  return load.posted_carrier_rate ?? load.loadboard_rate ?? 0;
}

function perMile(load) {
  if (load.rate_per_mile != null) return load.rate_per_mile;
  return load.miles > 0 ? rate(load) / load.miles : 0;
}

function when(raw) {
  const d = new Date(raw);
  return isNaN(d) ? (raw || '-') : d.toLocaleString();
}

function label(key) {
  return String(key).split('_').map(w => w.charAt(0).toUpperCase() + w.slice(1)).join(' ');
}

async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body !== undefined) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  if (!res.ok) throw new Error(`${method} ${path}: ${res.status}`);
  return res.json();
}

async function poll() {
  try {
    const next = await api('GET', '/api/snapshot');
    if (!snapshot || next.version !== snapshot.version) {
      snapshot = next;
      render();
    }
  } catch (e) {
    console.warn(e);
  }
}

async function setFilters(update) {
  try {
    snapshot = await api('PUT', '/api/filters', update);
    render();
  } catch (e) {
    console.warn(e);
  }
}

async function selectLoad(loadId) {
  try {
    snapshot = await api('PUT', '/api/selection', { load_id: loadId });
    render();
  } catch (e) {
    console.warn(e);
  }
}

async function refreshNow() {
  try {
    await api('POST', '/api/refresh');
  } catch (e) {
    console.warn(e);
  }
}

function switchView(view) {
  document.querySelectorAll('.view-btn').forEach(b => b.classList.toggle('active', b.dataset.view === view));
  document.querySelectorAll('.view').forEach(v => v.classList.add('hidden'));
  document.getElementById(view + 'View').classList.remove('hidden');
}

function render() {
  if (!snapshot) return;
  const updated = snapshot.updated_at ? new Date(snapshot.updated_at).toLocaleTimeString() : 'never';
  document.getElementById('updated').textContent =
    `${snapshot.filtered.length} of ${snapshot.total_loads} loads · updated ${updated}`;

  const params = snapshot.params;
  document.querySelectorAll('.tab-btn').forEach(b => b.classList.toggle('active', b.dataset.tab === params.tab));
  document.querySelectorAll('.eq-btn').forEach(b => b.classList.toggle('active', b.dataset.eq === params.equipment_type));
  const search = document.getElementById('search');
  if (document.activeElement !== search) search.value = params.search_query;

  renderLoads();
  renderDetails();
  renderCalls();
  renderAnalytics();
}

function renderLoads() {
  const list = document.getElementById('loadsList');
  if (snapshot.filtered.length === 0) {
    list.innerHTML = '<div class="empty">No loads found</div>';
    return;
  }
  list.innerHTML = snapshot.filtered.map(load => `
    <div class="card ${load.load_id === snapshot.selection ? 'selected' : ''}" data-id="${esc(load.load_id)}">
      <div class="top"><strong>${esc(load.load_id)}</strong><span class="badge ${esc(load.status)}">${esc(load.status)}</span></div>
      <div class="route"><span>${esc(city(load.origin))}</span><span>→</span><span>${esc(city(load.destination))}</span></div>
      <div class="foot"><span>${esc(load.miles)} miles · ${esc(load.equipment_type)}</span><span>${money(rate(load))}</span></div>
    </div>`).join('');
  list.querySelectorAll('.card').forEach(card => card.addEventListener('click', () => selectLoad(card.dataset.id)));
}

function renderDetails() {
  const panel = document.getElementById('details');
  const load = snapshot.selected;
  if (!load) {
    panel.innerHTML = '<div class="empty">Select a load to view details</div>';
    return;
  }
  const field = (name, value) => `<div class="field"><div class="label">${name}</div><div class="value">${esc(value)}</div></div>`;
  panel.innerHTML = `
    <h2>${esc(load.load_id)} <span class="badge ${esc(load.status)}">${esc(load.status)}</span></h2>
    <div class="grid">
      ${field('Origin', load.origin)}
      ${field('Destination', load.destination)}
      ${field('Equipment', load.equipment_type)}
      ${field('Pickup', when(load.pickup_datetime))}
      ${field('Delivery', when(load.delivery_datetime))}
      ${field('Commodity', load.commodity_type || 'General')}
      ${field('Miles', load.miles)}
      ${field('Rate', money(rate(load)))}
      ${field('Rate per mile', '$' + perMile(load).toFixed(2))}
      ${field('Max buy', money(load.max_buy))}
      ${field('Weight', load.weight != null ? load.weight.toLocaleString() + ' lbs' : '-')}
    </div>
    ${load.notes ? `<div class="notes">${esc(load.notes)}</div>` : ''}`;
}

function renderCalls() {
  const body = document.getElementById('callsBody');
  if (!snapshot.calls.length) {
    body.innerHTML = '<tr><td colspan="8" class="empty">No calls recorded</td></tr>';
    return;
  }
  body.innerHTML = snapshot.calls.map(call => `
    <tr>
      <td>${esc(when(call.timestamp))}</td>
      <td>${esc(call.carrier_name || 'Unknown')}</td>
      <td>${esc(call.mc_number)}</td>
      <td>${esc(call.load_id || '-')}</td>
      <td>${esc(call.route || '-')}</td>
      <td>${esc(label(call.outcome))}</td>
      <td class="num">${call.agreed_rate != null ? money(call.agreed_rate) : '-'}</td>
      <td>${esc(label(call.sentiment))}</td>
    </tr>`).join('');
}

function renderBars(id, series) {
  const el = document.getElementById(id);
  if (!series.length) {
    el.innerHTML = '<div class="empty">No data</div>';
    return;
  }
  const max = Math.max(...series.map(([, n]) => n), 1);
  el.innerHTML = series.map(([name, n]) => `
    <div class="bar-row">
      <span>${esc(name)}</span>
      <div class="bar" style="width: ${(n / max) * 100}%"></div>
      <span class="count">${n}</span>
    </div>`).join('');
}

function renderAnalytics() {
  const m = snapshot.metrics;
  const kpi = (name, value) => `<div class="panel kpi"><div class="value">${esc(value)}</div><div class="label">${name}</div></div>`;
  document.getElementById('kpis').innerHTML = m ? [
    kpi('Total calls', m.total_calls),
    kpi('Bookings', m.successful_bookings),
    kpi('Success rate', m.success_rate.toFixed(1) + '%'),
    kpi('Booked value', money(m.total_booked_value)),
    kpi('Avg negotiation rounds', m.avg_negotiation_rounds.toFixed(1)),
  ].join('') : '<div class="empty">Metrics unavailable</div>';
  renderBars('outcomes', snapshot.outcome_series);
  renderBars('sentiment', snapshot.sentiment_series);
}

document.getElementById('search').addEventListener('input', e => {
  clearTimeout(searchTimer);
  const value = e.target.value;
  searchTimer = setTimeout(() => setFilters({ search: value }), 150);
});

poll();
setInterval(poll, POLL_MS);
</script>
</body>
</html>
"##;
