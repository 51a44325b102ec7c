//! HTTP handlers for the dashboard API.

use crate::web::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::error;

/// Query parameters for `/api/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Only the most recent `limit` ticks
    pub limit: Option<usize>,
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let ticks = state.session.history().await.len();
    Json(json!({
        "status": if state.session.is_stopped() { "stopped" } else { "ok" },
        "service": "pipewatch",
        "version": env!("CARGO_PKG_VERSION"),
        "session": state.session.id(),
        "ticks": ticks,
        "websocket_clients": state.client_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Latest tick and the latest narration.
pub async fn get_latest(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let history = state.session.history().await;
    let Some(latest) = history.latest() else {
        return Err(StatusCode::NO_CONTENT);
    };

    Ok(Json(json!({
        "tick": latest,
        "narration": history.last_narration(),
    })))
}

/// Trend data for charts.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(state.config.history_window);
    let history = state.session.history().await;
    let start = history.len().saturating_sub(limit);

    let mut series = Map::new();
    for channel in history.channels() {
        if let Some(values) = history.series(channel) {
            series.insert(channel.name().to_string(), json!(&values[start..]));
        }
    }

    Json(json!({
        "ticks": history.len(),
        "abnormal_ticks": history.abnormal_count(),
        "timestamps": &history.timestamps()[start..],
        "statuses": &history.statuses()[start..],
        "series": series,
        "energy": history.energy(),
        "grid_kwh": &history.grid_series()[start..],
        "carbon_kg": &history.carbon_series()[start..],
    }))
}

/// Configured safe ranges in declared order.
pub async fn get_ranges(State(state): State<AppState>) -> Json<Value> {
    let ranges: Vec<Value> = state
        .session
        .safe_ranges()
        .iter()
        .map(|(channel, range)| {
            json!({
                "channel": channel,
                "label": channel.label(),
                "unit": channel.unit(),
                "min": range.min,
                "max": range.max,
            })
        })
        .collect();
    Json(Value::Array(ranges))
}

/// Serve `index.html` from the configured static directory.
pub async fn serve_index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let Some(dir) = &state.config.static_path else {
        return Ok(Html(DEFAULT_INDEX_HTML.to_string()));
    };
    let index = PathBuf::from(dir).join("index.html");

    match tokio::fs::read_to_string(&index).await {
        Ok(content) => Ok(Html(content)),
        Err(e) => {
            error!("Failed to read {:?}: {}", index, e);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Built-in dashboard page.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

const DEFAULT_INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>pipewatch - Pipeline Integrity Monitor</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f4f6f8; color: #222; margin: 0; padding: 20px; }
        h1 { margin: 0 0 4px 0; }
        .subtitle { color: #666; margin-bottom: 20px; }
        .banner { padding: 12px 16px; border-radius: 6px; font-weight: 600; margin-bottom: 20px; }
        .banner.normal { background: #e3f6e8; color: #1b7a35; }
        .banner.abnormal { background: #fde7e7; color: #b3261e; }
        .banner.idle { background: #eceff1; color: #555; }
        .grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 16px; margin-bottom: 20px; }
        .card { background: white; border-radius: 8px; padding: 16px; box-shadow: 0 1px 3px rgba(0,0,0,0.1); }
        .card h3 { margin: 0 0 8px 0; text-transform: capitalize; font-size: 1rem; }
        .value { font-size: 1.8rem; font-weight: 600; }
        .value.normal { color: #1b7a35; }
        .value.abnormal { color: #b3261e; }
        .range { color: #777; font-size: 0.85rem; }
        svg { width: 100%; height: 60px; }
        .narration { white-space: pre-wrap; line-height: 1.5; }
        .narration.failed { color: #b3261e; }
        .energy td { padding: 2px 12px 2px 0; }
    </style>
</head>
<body>
    <h1>Pipeline Integrity Monitor</h1>
    <div class="subtitle">Live readings against configured safe ranges</div>
    <div id="banner" class="banner idle">Waiting for the first reading...</div>
    <div id="channels" class="grid"></div>
    <div class="card">
        <h3>Analysis</h3>
        <div id="narration" class="narration">No narration yet.</div>
    </div>
    <div class="card energy" id="energy-card" style="display:none; margin-top:16px;">
        <h3>Energy</h3>
        <table id="energy"></table>
    </div>
    <script>
        const ranges = {};
        const series = {};
        const WINDOW = 120;

        function fmt(v) { return v === null || v === undefined ? '-' : Number(v).toFixed(2); }
        function span(min, max) {
            if (min === null) return 'at most ' + fmt(max);
            if (max === null) return 'at least ' + fmt(min);
            return fmt(min) + ' to ' + fmt(max);
        }

        function card(channel) {
            let el = document.getElementById('ch-' + channel);
            if (!el) {
                el = document.createElement('div');
                el.className = 'card';
                el.id = 'ch-' + channel;
                el.innerHTML = '<h3></h3><div class="value"></div><div class="range"></div><svg viewBox="0 0 100 30" preserveAspectRatio="none"><polyline fill="none" stroke="#3367d6" stroke-width="1"/></svg>';
                document.getElementById('channels').appendChild(el);
            }
            return el;
        }

        function draw(channel) {
            const values = (series[channel] || []).filter(v => v !== null);
            if (values.length < 2) return;
            const min = Math.min(...values), max = Math.max(...values);
            const span = max - min || 1;
            const points = values.map((v, i) => (i * 100 / (values.length - 1)).toFixed(2) + ',' + (30 - (v - min) * 30 / span).toFixed(2));
            card(channel).querySelector('polyline').setAttribute('points', points.join(' '));
        }

        function showTick(tick) {
            const status = tick.assessment.status;
            const banner = document.getElementById('banner');
            banner.className = 'banner ' + status;
            banner.textContent = 'Reading #' + tick.reading.sequence + ': pipeline ' + status.toUpperCase();

            for (const c of tick.assessment.channels) {
                const el = card(c.channel);
                const r = ranges[c.channel] || {};
                el.querySelector('h3').textContent = r.label || c.channel;
                const value = el.querySelector('.value');
                value.className = 'value ' + c.status;
                value.textContent = fmt(c.value) + (r.unit ? ' ' + r.unit : '');
                el.querySelector('.range').textContent = 'safe ' + span(c.range.min, c.range.max) + ' (' + c.status + ')';
            }
            for (const [channel, value] of Object.entries(tick.reading.values)) {
                (series[channel] = series[channel] || []).push(value);
                if (series[channel].length > WINDOW) series[channel].shift();
                draw(channel);
            }
        }

        function showNarration(record) {
            const el = document.getElementById('narration');
            if (record.outcome.kind === 'text') {
                el.className = 'narration';
                el.textContent = record.outcome.text;
            } else {
                el.className = 'narration failed';
                el.textContent = 'Analysis unavailable for reading #' + record.sequence + ': ' + record.outcome.error;
            }
        }

        function showEnergy(energy) {
            if (!energy || !energy.ticks) return;
            document.getElementById('energy-card').style.display = '';
            document.getElementById('energy').innerHTML =
                '<tr><td>Total energy consumed</td><td>' + fmt(energy.consumed_kwh) + ' kWh</td></tr>' +
                '<tr><td>Renewable generation</td><td>' + fmt(energy.renewable_kwh) + ' kWh</td></tr>' +
                '<tr><td>Grid energy after offset</td><td>' + fmt(energy.grid_kwh) + ' kWh</td></tr>' +
                '<tr><td>Carbon footprint</td><td>' + fmt(energy.carbon_kg) + ' kg CO2</td></tr>';
        }

        async function load() {
            for (const r of await (await fetch('/api/ranges')).json()) ranges[r.channel] = r;
            const history = await (await fetch('/api/history?limit=' + WINDOW)).json();
            for (const [channel, values] of Object.entries(history.series)) {
                series[channel] = values;
                draw(channel);
            }
            showEnergy(history.energy);
            const latest = await fetch('/api/latest');
            if (latest.status === 200) {
                const body = await latest.json();
                showTick(Object.assign({}, body.tick, { reading: Object.assign({}, body.tick.reading, { values: {} }) }));
                if (body.narration) showNarration(body.narration);
            }
        }

        function connect() {
            const ws = new WebSocket((location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '/ws');
            ws.onmessage = async (msg) => {
                const event = JSON.parse(msg.data);
                if (event.type === 'tick') {
                    showTick(event);
                    if (event.energy) showEnergy((await (await fetch('/api/history?limit=0')).json()).energy);
                } else if (event.type === 'narration') {
                    showNarration(event);
                } else if (event.type === 'stopped') {
                    const banner = document.getElementById('banner');
                    banner.className = 'banner idle';
                    banner.textContent = 'Monitoring stopped after ' + event.ticks + ' readings.';
                }
            };
            ws.onclose = () => setTimeout(connect, 2000);
        }

        load().then(connect);
    </script>
</body>
</html>"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::{NarrativeReporter, OfflineGenerator};
    use crate::session::{MonitorConfig, Session};
    use crate::web::WebConfig;
    use std::sync::Arc;

    fn state() -> (Session, AppState) {
        let reporter = NarrativeReporter::new(Arc::new(OfflineGenerator));
        let session = Session::simulated(MonitorConfig::default().with_seed(Some(1)), reporter)
            .unwrap();
        let state = AppState::new(WebConfig::default(), session.handle());
        (session, state)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_session, state) = state();
        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "pipewatch");
        assert_eq!(body["ticks"], 0);
    }

    #[tokio::test]
    async fn test_built_in_dashboard_is_complete() {
        let (_session, state) = state();
        let Html(page) = serve_index(State(state)).await.unwrap();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("#3367d6"));
        assert!(page.contains("new WebSocket"));
        assert!(page.trim_end().ends_with("</html>"));
    }

    #[tokio::test]
    async fn test_latest_before_and_after_first_tick() {
        let (mut session, state) = state();
        assert_eq!(
            get_latest(State(state.clone())).await.unwrap_err(),
            StatusCode::NO_CONTENT
        );

        session.tick().await;
        let Json(body) = get_latest(State(state)).await.unwrap();
        assert_eq!(body["tick"]["reading"]["sequence"], 1);
        assert_eq!(body["narration"]["outcome"]["kind"], "text");
    }

    #[tokio::test]
    async fn test_history_window() {
        let (mut session, state) = state();
        for _ in 0..5 {
            session.tick().await;
        }
        let Json(body) = get_history(State(state), Query(HistoryQuery { limit: Some(2) })).await;
        assert_eq!(body["ticks"], 5);
        assert_eq!(body["timestamps"].as_array().unwrap().len(), 2);
        assert_eq!(body["series"]["pressure"].as_array().unwrap().len(), 2);
        // The standard profile meters no energy.
        assert_eq!(body["grid_kwh"], json!([null, null]));
        assert_eq!(body["carbon_kg"], json!([null, null]));
    }

    #[tokio::test]
    async fn test_history_energy_series() {
        let reporter = NarrativeReporter::new(Arc::new(OfflineGenerator));
        let config = MonitorConfig::default()
            .with_profile(crate::monitoring::ProfileKind::OilTransmission)
            .with_seed(Some(2));
        let mut session = Session::simulated(config, reporter).unwrap();
        let state = AppState::new(WebConfig::default(), session.handle());
        for _ in 0..3 {
            session.tick().await;
        }

        let Json(body) = get_history(State(state), Query(HistoryQuery { limit: None })).await;
        let grid = body["grid_kwh"].as_array().unwrap();
        let carbon = body["carbon_kg"].as_array().unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(carbon.len(), 3);
        assert!(grid.iter().all(|v| v.as_f64().unwrap() >= 0.0));
    }

    #[tokio::test]
    async fn test_ranges_in_declared_order() {
        let (_session, state) = state();
        let Json(body) = get_ranges(State(state)).await;
        let channels: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["channel"].as_str().unwrap())
            .collect();
        assert_eq!(channels, vec!["pressure", "vibration", "temperature"]);
    }
}
