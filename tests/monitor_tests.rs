//! End-to-end tests: one instance serves mock data on `/api/*`, a second
//! instance consumes it as its remote backend and renders the dashboard.

use std::sync::Arc;
use std::time::Duration;

use auditoria_monitor::config::MonitorConfig;
use auditoria_monitor::render::page::{ALERTS_CONTAINER, ERROR_BANNER, METRICS_CONTAINER, STATUS_CONTAINER};
use auditoria_monitor::web::{self, AppState};
use auditoria_monitor::{
    AutoRefresh, BasicMonitor, DataSource, MonitoringApi, MonitoringDashboard, Page, Renderers, SharedPage,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a mock-backed server; returns its base URL for `/api`.
async fn spawn_backend(seed: u64) -> (String, tokio::task::JoinHandle<auditoria_monitor::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(
        Page::basic(Renderers::default()).into_shared(),
        Arc::new(MonitoringApi::mock(seed)),
        "backend",
    );
    let handle = tokio::spawn(web::serve(listener, state));
    (format!("http://{addr}/api"), handle)
}

fn html(page: &SharedPage, id: &str) -> String {
    page.lock().unwrap().container_html(id).unwrap_or_default()
}

async fn get(addr: std::net::SocketAddr, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn test_remote_client_reads_backend_api() {
    let (base, backend) = spawn_backend(11).await;
    let api = MonitoringApi::remote(base);
    assert_eq!(api.source(), DataSource::Remote);

    let metrics = api.get_metrics().await.unwrap();
    assert_eq!(metrics.len(), 6);
    assert!(metrics.iter().any(|m| m.id == "cpu"));

    let checks = api.get_health_checks().await.unwrap();
    assert_eq!(checks[0].service, "Sistema");
    assert!(api.get_alerts().await.is_ok());
    backend.abort();
}

#[tokio::test]
async fn test_dashboard_over_remote_backend() {
    let (base, backend) = spawn_backend(12).await;
    let api = Arc::new(MonitoringApi::remote(base));
    let page = Page::dashboard(Renderers::default()).into_shared();

    let status = BasicMonitor::start(Arc::clone(&api), Arc::clone(&page)).await;
    let mut dashboard = MonitoringDashboard::start(
        Arc::clone(&api),
        Arc::clone(&page),
        AutoRefresh::new(Duration::from_secs(60)),
    )
    .await;

    assert!(status.refresh().await);
    assert!(html(&page, STATUS_CONTAINER).contains("Sistema: Operacional"));
    assert_eq!(html(&page, METRICS_CONTAINER).matches("data-metric-id=").count(), 6);
    assert!(!html(&page, ALERTS_CONTAINER).is_empty());
    assert_eq!(html(&page, ERROR_BANNER), "");

    dashboard.shutdown();
    backend.abort();
}

#[tokio::test]
async fn test_backend_outage_shows_banner_then_recovers() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = Arc::new(MonitoringApi::remote(format!("http://{addr}/api")));
    let page = Page::basic(Renderers::default()).into_shared();
    let monitor = BasicMonitor::start(api, Arc::clone(&page)).await;
    assert!(html(&page, ERROR_BANNER).contains("Falha ao carregar"));

    // Bring the backend up on the same port.
    let listener = TcpListener::bind(addr).await.unwrap();
    let state = AppState::new(
        Page::basic(Renderers::default()).into_shared(),
        Arc::new(MonitoringApi::mock(3)),
        "backend",
    );
    let backend = tokio::spawn(web::serve(listener, state));

    assert!(monitor.refresh().await);
    assert_eq!(html(&page, ERROR_BANNER), "");
    assert!(html(&page, STATUS_CONTAINER).contains("data-service=\"Sistema\""));
    backend.abort();
}

#[tokio::test]
async fn test_served_page_and_fragments_reflect_dashboard() {
    let api = Arc::new(MonitoringApi::mock(21));
    let page = Page::dashboard(Renderers::default()).into_shared();
    let mut dashboard = MonitoringDashboard::start(
        Arc::clone(&api),
        Arc::clone(&page),
        AutoRefresh::new(Duration::from_secs(60)),
    )
    .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(web::serve(listener, AppState::new(Arc::clone(&page), api, "Painel")));

    let index = get(addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200 OK"));
    assert!(index.contains("id=\"metrics-container\""));
    assert!(index.contains("metric-card"));

    let frag = get(addr, "/fragments?container=metrics-container").await;
    let body = frag.split("\r\n\r\n").nth(1).unwrap();
    let v: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(v.as_object().unwrap().len(), 1);
    assert!(v["metrics-container"].as_str().unwrap().contains("data-metric-id=\"cpu\""));

    assert!(get(addr, "/missing").await.starts_with("HTTP/1.1 404"));

    dashboard.shutdown();
    server.abort();
}

#[test]
fn test_config_defaults_drive_mock_source() {
    let config = MonitorConfig::default();
    let api = MonitoringApi::new(config.api.clone());
    assert_eq!(api.source(), DataSource::Mock);
    assert_eq!(config.refresh.interval(), Duration::from_secs(30));
}

#[tokio::test]
async fn test_config_file_base_url_with_trailing_slash() {
    let (base, backend) = spawn_backend(13).await;
    let config = MonitorConfig::from_toml_str(&format!("[api]\nbase_url = \"{base}/\"\n"), "inline").unwrap();
    let api = MonitoringApi::new(config.api);
    assert_eq!(api.base_url(), base);

    let metrics = api.get_metrics().await.unwrap();
    assert_eq!(metrics.len(), 6);
    assert!(api.get_health_checks().await.is_ok());
    backend.abort();
}

#[tokio::test]
async fn test_backend_api_matches_its_rendered_dashboard() {
    let api = Arc::new(MonitoringApi::mock(22));
    let page = Page::dashboard(Renderers::default()).into_shared();
    assert!(MonitoringDashboard::render_once(Arc::clone(&api), Arc::clone(&page)).await);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(web::serve(listener, AppState::new(Arc::clone(&page), api, "Painel")));

    let consumer = MonitoringApi::remote(format!("http://{addr}/api"));
    let served = consumer.get_metrics().await.unwrap();
    let panel = html(&page, METRICS_CONTAINER);
    for m in &served {
        assert!(panel.contains(&format!("<div class=\"metric-value\">{}</div>", m.value)), "{} missing", m.id);
    }
    assert_eq!(consumer.get_metrics().await.unwrap(), served);
    server.abort();
}
