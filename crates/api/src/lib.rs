//! Baby Monitor API Server
//!
//! HTTP surface of the camera device: MJPEG stream, event and expression
//! endpoints polled by the viewer, status/health/metrics, captures and
//! streaming control.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use bms::{AnalyzerHandle, EventPublisher};
use camera_capture::{FrameBuffer, FrameSource};
use gallery::{EventLog, Gallery};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod capture;
mod error;
mod routes;
pub mod settings;

pub use capture::GalleryCaptureSink;
pub use error::ApiError;
pub use settings::{ServerSettings, ViewerSettings};

/// Application state shared across handlers
pub struct AppState {
    pub settings: ServerSettings,
    pub publisher: Arc<EventPublisher>,
    pub frames: Arc<FrameBuffer>,
    pub gallery: Gallery,
    pub event_log: Arc<EventLog>,
    /// Absent when the server runs without an analyzer
    pub analyzer: Option<AnalyzerHandle>,
    /// Absent when no Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: ServerSettings,
        publisher: Arc<EventPublisher>,
        frames: Arc<FrameBuffer>,
        gallery: Gallery,
        event_log: Arc<EventLog>,
    ) -> Self {
        Self {
            settings,
            publisher,
            frames,
            gallery,
            event_log,
            analyzer: None,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerHandle) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn with_metrics(mut self, metrics: PrometheusHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Reject requests whose `pin` does not match
    pub(crate) fn check_pin(&self, pin: Option<&str>) -> Result<(), ApiError> {
        if pin == Some(self.settings.pin.as_str()) {
            Ok(())
        } else {
            debug!("Rejected request with invalid PIN");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub analyzer: String,
    pub streaming: bool,
    pub gallery: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::camera::stream))
        .route("/stream", get(routes::camera::stream))
        .route("/sleep", get(routes::camera::sleep_message))
        .route("/expression", get(routes::camera::expression))
        .route("/camera_name", get(routes::camera::camera_name))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/logs", get(routes::status::get_logs))
        .route("/api/v1/capture", post(routes::control::capture))
        .route("/api/v1/streaming", post(routes::control::set_streaming))
        .route("/api/v1/camera", post(routes::control::switch_camera))
        .route("/api/v1/gallery", get(routes::gallery::list))
        .route("/api/v1/gallery/:name", get(routes::gallery::image))
        .route("/api/v1/gallery/:name", delete(routes::gallery::remove))
        .route("/metrics", get(routes::status::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let analyzer = match &state.analyzer {
        Some(handle) if handle.is_running() => "ok",
        Some(_) => "stopped",
        None => "disabled",
    };
    let gallery = if state.gallery.dir().is_dir() { "ok" } else { "missing" };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            analyzer: analyzer.to_string(),
            streaming: state.frames.is_streaming(),
            gallery: gallery.to_string(),
        },
    })
}

/// Initialize logging
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("Tracing subscriber already set");
    }
}

/// Append `lines` to the event log on the blocking pool
pub(crate) async fn append_log(
    event_log: &Arc<EventLog>,
    lines: Vec<String>,
) -> Result<(), ApiError> {
    let event_log = event_log.clone();
    tokio::task::spawn_blocking(move || {
        lines.iter().try_for_each(|line| event_log.append(line))
    })
    .await??;
    Ok(())
}

/// Feed frames from `source` to the analyzer until it stops. Events of each
/// analyzed frame are appended to the event log.
pub async fn run_camera_loop<S: FrameSource>(
    mut source: S,
    analyzer: AnalyzerHandle,
    event_log: Arc<EventLog>,
) {
    info!("Camera loop started");
    while analyzer.is_running() {
        let frame = match source.next_frame().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame capture failed: {}", e);
                continue;
            }
        };

        let ticket = analyzer.submit(frame);
        let event_log = event_log.clone();
        tokio::spawn(async move {
            let Ok(analysis) = ticket.await else {
                return;
            };
            if analysis.events.is_empty() {
                return;
            }
            let lines = analysis
                .events
                .iter()
                .map(|event| event.message().to_string())
                .collect();
            if let Err(e) = append_log(&event_log, lines).await {
                warn!("Event log write failed: {}", e);
            }
        });
    }
    info!("Camera loop stopped");
}

/// Serve the router until ctrl-c
pub async fn run_server(state: Arc<AppState>) -> Result<(), ApiError> {
    let addr = state.settings.addr();
    let app = create_router(state);

    info!("Starting camera server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
