//! Embedded web dashboard for loadwatch.
//!
//! A small synchronous HTTP server (`tiny_http`) that serves:
//! - A single-page load board with details, recent calls and analytics
//! - JSON endpoints for the current snapshot, filter and selection changes,
//!   manual refresh, config and health
//!
//! Reads come from a [`SharedSnapshot`] published by the control thread.
//! Writes are sent to the control thread as commands.
//!
//! Launched via `loadwatch serve` (default: `http://127.0.0.1:9850`).

mod api;
mod frontend;

use std::io::Cursor;
use std::time::Instant;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::activity::ActivityLog;
use crate::config::schema::LoadwatchConfig;
use crate::poller::PollerClient;
use crate::render::SharedSnapshot;

pub(crate) type HttpResponse = Response<Cursor<Vec<u8>>>;

/// Everything a request handler may touch.
#[derive(Debug, Clone)]
pub struct WebState {
    pub snapshot: SharedSnapshot,
    pub client: PollerClient,
    pub config: LoadwatchConfig,
    pub log: ActivityLog,
    pub started_at: Instant,
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Bind the dashboard server.
pub fn bind(addr: &str) -> Result<Server> {
    Server::http(addr).map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))
}

/// Bind and serve on `addr`. Blocks the current thread.
pub fn serve(addr: &str, state: &WebState) -> Result<()> {
    let server = bind(addr)?;
    let url = format!("http://{addr}");

    println!("loadwatch dashboard running at {url}");
    println!("Press Ctrl+C to stop.\n");

    if state.config.web.open_browser {
        launch_browser(&url, &state.log, open_browser);
    }

    serve_on(&server, state, true);
    Ok(())
}

/// Handle requests from an already bound server until it is unblocked.
///
/// Requests are handled sequentially. A failing handler produces a 500
/// response and never stops the server.
pub fn serve_on(server: &Server, state: &WebState, access_log: bool) {
    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let response = match dispatch(state, &method, &url, body.as_deref()) {
            Ok(resp) => resp,
            Err(e) => {
                state.log.warn("web_error", format!("{method} {url}: {e:#}"), None);
                error_response(500, &e.to_string())
            }
        };
        let status = response.status_code().0;
        let _ = request.respond(response);

        if access_log {
            println!(
                "{} {} {} {}",
                method,
                url,
                status,
                chrono::Local::now().format("%H:%M:%S")
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn dispatch(state: &WebState, method: &Method, url: &str, body: Option<&str>) -> Result<HttpResponse> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API: board
        (&Method::Get, "/api/snapshot") => api::get_snapshot(state),
        (&Method::Put, "/api/filters") => api::put_filters(state, body.unwrap_or("{}")),
        (&Method::Put, "/api/selection") => api::put_selection(state, body.unwrap_or("{}")),
        (&Method::Post, "/api/refresh") => api::post_refresh(state),

        // API: config and health
        (&Method::Get, "/api/config") => api::get_config(state),
        (&Method::Get, "/api/health") => api::get_health(state),

        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn serve_frontend() -> HttpResponse {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

pub(crate) fn error_response(status: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Open `url` with `open`, recording a failure in the activity log.
fn launch_browser(url: &str, log: &ActivityLog, open: impl FnOnce(&str) -> Result<()>) {
    if let Err(err) = open(url) {
        log.debug("open_browser_failed", format!("{url}: {err:#}"), None);
    }
}

fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Level, read_entries};

    #[test]
    fn failed_browser_launch_is_logged() {
        let path = std::env::temp_dir().join(format!("loadwatch-browser-log-{}.jsonl", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let log = ActivityLog::to_file(&path, Level::Debug);

        launch_browser("http://127.0.0.1:9850", &log, |_| Ok(()));
        assert!(read_entries(&path).is_empty());

        launch_browser("http://127.0.0.1:9850", &log, |_| {
            Err(anyhow::anyhow!("no browser found"))
        });
        let entries = read_entries(&path);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "open_browser_failed");
        assert_eq!(entries[0].level, Level::Debug);
        assert!(entries[0].detail.contains("no browser found"));

        let _ = std::fs::remove_file(&path);
    }
}
