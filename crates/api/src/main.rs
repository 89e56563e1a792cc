//! Baby Monitor camera device - Main Entry Point

use api::{
    init_logging, run_camera_loop, run_server, AppState, GalleryCaptureSink, ServerSettings,
};
use bms::{
    classifier_from_config, EventPublisher, ExpressionClassifier, FrameAnalyzer, MockFaceDetector,
};
use camera_capture::{FrameBuffer, TestPatternSource};
use gallery::{EventLog, Gallery};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_file = std::env::args().nth(1);
    let settings = ServerSettings::load(config_file.as_deref())?;
    init_logging(&settings.log_level);

    info!("=== Baby Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let publisher = Arc::new(EventPublisher::new());
    let frames = Arc::new(FrameBuffer::new());
    let gallery = Gallery::open(&settings.gallery_dir)?;
    let event_log = Arc::new(EventLog::open(&settings.log_path)?);

    let detector = Arc::new(MockFaceDetector::new());
    let classifier: Arc<dyn ExpressionClassifier> = classifier_from_config(&settings.bms)?.into();
    let sink = Arc::new(GalleryCaptureSink::new(
        gallery.clone(),
        event_log.clone(),
        settings.camera_name.clone(),
    ));

    let (analyzer, handle) = FrameAnalyzer::new(
        settings.bms.clone(),
        detector,
        classifier,
        publisher.clone(),
        frames.clone(),
    );
    let analyzer_task = analyzer
        .with_camera(&settings.camera)
        .with_view(settings.view)
        .with_display(settings.display)
        .with_capture_sink(sink)
        .spawn();

    let source = TestPatternSource::new(&settings.camera);
    let camera_task = tokio::spawn(run_camera_loop(source, handle.clone(), event_log.clone()));

    let mut state = AppState::new(settings, publisher, frames, gallery, event_log)
        .with_analyzer(handle.clone());
    if let Some(metrics) = metrics {
        state = state.with_metrics(metrics);
    }

    let served = run_server(Arc::new(state)).await;

    handle.shutdown();
    let _ = camera_task.await;
    let _ = analyzer_task.await;
    info!("Camera stopped");

    served.map_err(Into::into)
}
