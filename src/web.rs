//! Dashboard web server.
//!
//! A deliberately small HTTP/1.1 server over `tokio::net::TcpListener`: one
//! request per connection, request head parsed with `httparse`, response
//! written with `Connection: close`. The page itself is rendered from the
//! shared [`Page`] and keeps itself current by polling `/fragments`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use colored::*;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::api::{DataSource, MonitoringApi};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::render::page::{
    ALERTS_CONTAINER, ERROR_BANNER, METRICS_CONTAINER, REFRESH_COUNTDOWN, STATUS_CONTAINER, TIMESTAMP,
};
use crate::render::{html_escape, Page, SharedPage};

/// Upper bound on the request head; anything larger is rejected with 400.
const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// Clients that do not finish their request head in time get a 408.
const REQUEST_HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Matches the default refresh interval.
pub const DEFAULT_API_MAX_AGE: Duration = Duration::from_secs(30);

/// Stylesheet embedded in every rendered page.
pub const DASHBOARD_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:system-ui,-apple-system,"Segoe UI",Roboto,sans-serif;background:#0f172a;color:#e2e8f0;padding:24px}
header{display:flex;justify-content:space-between;align-items:baseline;margin-bottom:20px;gap:16px;flex-wrap:wrap}
h1{font-size:1.4rem;font-weight:600}
h2{font-size:1rem;font-weight:600;margin:20px 0 10px;color:#94a3b8;text-transform:uppercase;letter-spacing:.05em}
.meta{font-size:.85rem;color:#94a3b8}
#error-banner:empty{display:none}
.error-banner-message{background:#7f1d1d;color:#fee2e2;border-radius:8px;padding:10px 14px;margin-bottom:16px}
.metrics-grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(220px,1fr));gap:14px}
.metric-card{display:flex;gap:12px;background:#1e293b;border-radius:10px;padding:16px;border-left:4px solid #22c55e}
.metric-card.warning{border-left-color:#f59e0b}
.metric-card.error{border-left-color:#ef4444}
.metric-icon{font-size:1.6rem}
.metric-title{font-size:.85rem;font-weight:500;color:#94a3b8}
.metric-value{font-size:1.5rem;font-weight:700}
.metric-status{font-size:.8rem;color:#94a3b8}
.alerts-list{display:flex;flex-direction:column;gap:10px}
.alert{display:flex;gap:10px;background:#1e293b;border-radius:8px;padding:12px;border-left:4px solid #38bdf8}
.alert-critical,.alert-error{border-left-color:#ef4444}
.alert-warning{border-left-color:#f59e0b}
.alert-title{font-weight:600}
.alert-message{font-size:.9rem}
.alert-meta{display:flex;gap:12px;font-size:.75rem;color:#94a3b8;margin-top:4px}
.no-alerts{text-align:center;padding:20px;color:#86efac}
.no-alerts-icon{font-size:1.8rem}
.status{display:flex;gap:8px;padding:8px 12px;border-radius:6px;background:#1e293b;margin-bottom:6px}
.status.warning{color:#fcd34d}
.status.error{color:#fca5a5}
.fade-in{animation:fadeIn .4s ease both}
@keyframes fadeIn{from{opacity:0;transform:translateY(6px)}to{opacity:1;transform:none}}
"#;

/// Replaces each container's markup with the latest server-side render.
pub const POLL_SCRIPT: &str = r#"
async function pollFragments(){
  try{
    const r=await fetch('/fragments');
    if(!r.ok)return;
    const frags=await r.json();
    for(const [id,html] of Object.entries(frags)){
      const el=document.getElementById(id);
      if(el&&el.innerHTML!==html)el.innerHTML=html;
    }
  }catch(e){}
}
setInterval(pollFragments,1000);
"#;

/// State shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub page: SharedPage,
    pub api: Arc<MonitoringApi>,
    pub title: Arc<str>,
    /// How old a batch already fetched by the controllers may be before
    /// `/api/*` fetches a new one instead of republishing it.
    pub api_max_age: Duration,
}

impl AppState {
    pub fn new(page: SharedPage, api: Arc<MonitoringApi>, title: impl Into<Arc<str>>) -> Self {
        Self {
            page,
            api,
            title: title.into(),
            api_max_age: DEFAULT_API_MAX_AGE,
        }
    }

    pub fn with_api_max_age(mut self, max_age: Duration) -> Self {
        self.api_max_age = max_age;
        self
    }

    fn document(&self) -> String {
        let page = self.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        render_document(&page, &self.title)
    }
}

/// Render the whole HTML document for `page`. Sections whose container the
/// page lacks are left out.
pub fn render_document(page: &Page, title: &str) -> String {
    let slot = |id: &str, tag: &str, class: &str| -> String {
        match page.container_html(id) {
            Some(inner) => format!("<{tag} id=\"{id}\" class=\"{class}\">{inner}</{tag}>"),
            None => String::new(),
        }
    };

    let mut body = String::new();
    body.push_str("<header>");
    body.push_str(&format!("<h1>{}</h1>", html_escape(title)));
    body.push_str("<div class=\"meta\">");
    body.push_str(&slot(TIMESTAMP, "span", "timestamp"));
    if page.has(REFRESH_COUNTDOWN) {
        body.push_str(" · próxima atualização em ");
        body.push_str(&slot(REFRESH_COUNTDOWN, "span", "refresh-countdown"));
    }
    body.push_str("</div></header>");
    body.push_str(&slot(ERROR_BANNER, "div", "error-banner"));
    if page.has(STATUS_CONTAINER) {
        body.push_str("<h2>Serviços</h2>");
        body.push_str(&slot(STATUS_CONTAINER, "section", "status-list"));
    }
    if page.has(METRICS_CONTAINER) {
        body.push_str("<h2>Métricas</h2>");
        body.push_str(&slot(METRICS_CONTAINER, "section", "metrics-grid"));
    }
    if page.has(ALERTS_CONTAINER) {
        body.push_str("<h2>Alertas</h2>");
        body.push_str(&slot(ALERTS_CONTAINER, "section", "alerts-panel"));
    }

    format!(
        concat!(
            "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
            "<title>{title}</title>\n<style>{css}</style>\n</head>\n",
            "<body>\n{body}\n<script>{script}</script>\n</body>\n</html>\n",
        ),
        title = html_escape(title),
        css = DASHBOARD_CSS,
        body = body,
        script = POLL_SCRIPT,
    )
}

/// Simple percent-decoding for URL query parameters.
pub fn url_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();
    while let Some(b) = iter.next() {
        match b {
            b'+' => bytes.push(b' '),
            b'%' => {
                let hex: Vec<u8> = iter.by_ref().take(2).collect();
                match std::str::from_utf8(&hex).ok().and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => bytes.push(byte),
                    None => {
                        bytes.push(b'%');
                        bytes.extend_from_slice(&hex);
                    }
                }
            }
            _ => bytes.push(b),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse query string into key-value pairs. Later duplicates win.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let val = parts.next().unwrap_or("");
            Some((url_decode(key), url_decode(val)))
        })
        .collect()
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    pub fn text(status: u16, reason: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            reason,
            content_type: "text/plain; charset=utf-8",
            body: body.into(),
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Self {
        Self::json_with_status(200, "OK", value)
    }

    pub fn json_with_status<T: Serialize>(status: u16, reason: &'static str, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status,
                reason,
                content_type: "application/json",
                body,
            },
            Err(e) => Self::text(500, "Internal Server Error", e.to_string()),
        }
    }

    pub fn not_found() -> Self {
        Self::text(404, "Not Found", "Not Found")
    }

    /// Serialize status line, headers and body.
    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-cache\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n\r\n{}",
            self.status,
            self.reason,
            self.content_type,
            self.body.len(),
            self.body,
        )
    }
}

fn api_response<T: Serialize>(what: &str, result: Result<T>) -> Response {
    match result {
        Ok(value) => Response::json(&value),
        Err(e) => {
            warn!(error = %e, what, "upstream fetch failed");
            Response::json_with_status(502, "Bad Gateway", &serde_json::json!({ "error": e.to_string() }))
        }
    }
}

/// Dispatch one request. `target` is the raw request target (path and query).
pub async fn route(method: &str, target: &str, state: &AppState) -> Response {
    if method != "GET" {
        return Response::text(405, "Method Not Allowed", "Method Not Allowed");
    }
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    match path {
        "/" | "/index.html" => Response::html(state.document()),
        "/fragments" => {
            let fragments = {
                let page = state.page.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                page.fragments()
            };
            let params = parse_query(query);
            match params.get("container") {
                Some(id) => Response::json(&fragments.retain_only(id)),
                None => Response::json(&fragments),
            }
        }
        // Republish what the page shows while it is fresh; fetch otherwise.
        "/api/metrics" => match state.api.latest_metrics(state.api_max_age) {
            Some(metrics) => Response::json(&metrics),
            None => api_response("metrics", state.api.get_metrics().await),
        },
        "/api/alerts" => match state.api.latest_alerts(state.api_max_age) {
            Some(alerts) => Response::json(&alerts),
            None => api_response("alerts", state.api.get_alerts().await),
        },
        "/api/health" => match state.api.latest_health_checks(state.api_max_age) {
            Some(checks) => Response::json(&checks),
            None => api_response("health checks", state.api.get_health_checks().await),
        },
        "/healthz" => Response::text(200, "OK", "ok"),
        _ => Response::not_found(),
    }
}

/// Method and target from a request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
}

/// Parse a complete request head. `Ok(None)` means more bytes are needed.
pub fn parse_request_head(buf: &[u8]) -> std::result::Result<Option<RequestHead>, httparse::Error> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(buf)? {
        httparse::Status::Complete(_) => Ok(Some(RequestHead {
            method: req.method.unwrap_or("GET").to_string(),
            target: req.path.unwrap_or("/").to_string(),
        })),
        httparse::Status::Partial => Ok(None),
    }
}

enum HeadRead {
    Head(RequestHead),
    Closed,
    Malformed(String),
    TimedOut,
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<HeadRead> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 2048];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(HeadRead::Closed);
        }
        buf.extend_from_slice(&chunk[..n]);
        match parse_request_head(&buf) {
            Ok(Some(head)) => return Ok(HeadRead::Head(head)),
            Ok(None) if buf.len() < MAX_REQUEST_HEAD => continue,
            Ok(None) => return Ok(HeadRead::Malformed("request head too large".into())),
            Err(e) => return Ok(HeadRead::Malformed(e.to_string())),
        }
    }
}

async fn handle_connection(mut stream: TcpStream, state: AppState) -> std::io::Result<()> {
    let head = tokio::time::timeout(REQUEST_HEAD_TIMEOUT, read_request_head(&mut stream))
        .await
        .unwrap_or(Ok(HeadRead::TimedOut))?;
    let response = match head {
        HeadRead::Closed => return Ok(()),
        HeadRead::TimedOut => {
            debug!("request head not received in time");
            Response::text(408, "Request Timeout", "Request Timeout")
        }
        HeadRead::Malformed(reason) => {
            debug!(%reason, "rejecting malformed request");
            Response::text(400, "Bad Request", "Bad Request")
        }
        HeadRead::Head(head) => {
            let response = route(&head.method, &head.target, &state).await;
            debug!(method = %head.method, target = %head.target, status = response.status, "request served");
            response
        }
    };
    stream.write_all(response.to_http().as_bytes()).await?;
    stream.shutdown().await
}

/// Bind the listener described by `config`.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    Ok(TcpListener::bind((config.bind.as_str(), config.port)).await?)
}

/// Startup banner on stderr.
pub fn print_banner(addr: SocketAddr, source: DataSource, base_url: &str) {
    eprintln!(
        "{}",
        format!("  Dashboard running at http://{addr}").bright_green()
    );
    match source {
        DataSource::Mock => eprintln!("{}", "  Data source: mock (no --base-url given)".yellow()),
        DataSource::Remote => eprintln!("{}", format!("  Data source: {base_url}").bright_cyan()),
    }
    eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), "web server accepting connections");
    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                warn!(%peer, error = %e, "connection error");
            }
        });
    }
}
