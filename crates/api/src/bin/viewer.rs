//! Baby Monitor viewer - polls a camera and raises notifications

use alerting::{LogNotifier, NotificationFilter, NotificationPoller, ViewerClient};
use api::{init_logging, ViewerSettings};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_file = std::env::args().nth(1);
    let settings = ViewerSettings::load(config_file.as_deref())?;
    init_logging(&settings.log_level);

    info!("=== Baby Monitor Viewer v{} ===", env!("CARGO_PKG_VERSION"));

    let client = ViewerClient::new(&settings.camera_host, settings.camera_port, &settings.pin)?;
    let poller = NotificationPoller::new(
        client,
        NotificationFilter::new(settings.preferences()),
        LogNotifier,
    )
    .with_period(Duration::from_millis(settings.poll_interval_ms));

    tokio::select! {
        _ = poller.run() => {}
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    Ok(())
}
