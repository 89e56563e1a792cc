//! HTTP polling of the camera device

use crate::filter::NotificationFilter;
use crate::AlertError;
use bms::MonitorEvent;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Longest status body read before giving up on the rest
pub const MAX_RESPONSE_BYTES: usize = 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for the camera device's PIN-protected text endpoints
#[derive(Debug, Clone)]
pub struct ViewerClient {
    http: Client,
    base_url: String,
    pin: String,
}

impl ViewerClient {
    pub fn new(host: &str, port: u16, pin: &str) -> Result<Self, AlertError> {
        if host.is_empty() || pin.is_empty() {
            return Err(AlertError::Config("camera address or PIN missing".into()));
        }

        let http = Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: format!("http://{}:{}", host, port),
            pin: pin.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a text endpoint, reading at most [`MAX_RESPONSE_BYTES`]
    async fn fetch_text(&self, path: &str) -> Result<String, AlertError> {
        let mut response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("pin", &self.pin)])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(AlertError::Unauthorized),
            other => return Err(AlertError::Status(other.as_u16())),
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() >= MAX_RESPONSE_BYTES {
                body.truncate(MAX_RESPONSE_BYTES);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).trim().to_string())
    }

    /// Pending event message; reading it clears it on the camera
    pub async fn fetch_sleep_message(&self) -> Result<String, AlertError> {
        self.fetch_text("/sleep").await
    }

    /// Current stable expression, or `face not detected`
    pub async fn fetch_expression(&self) -> Result<String, AlertError> {
        let expression = self.fetch_text("/expression").await?;
        if expression.is_empty() || expression.eq_ignore_ascii_case("unknown") {
            return Ok("face not detected".to_string());
        }
        Ok(expression)
    }

    pub async fn fetch_camera_name(&self) -> Result<String, AlertError> {
        self.fetch_text("/camera_name").await
    }
}

/// Delivers accepted events to the parent
pub trait Notifier: Send + Sync {
    fn notify(&self, camera_name: &str, event: MonitorEvent);
}

/// Notifier that writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, camera_name: &str, event: MonitorEvent) {
        info!("[{}] {}", camera_name, event.message());
    }
}

/// Polls `/sleep` on a fixed period and forwards filtered events
pub struct NotificationPoller<N: Notifier> {
    client: ViewerClient,
    filter: NotificationFilter,
    notifier: N,
    period: Duration,
    camera_name: String,
}

impl<N: Notifier> NotificationPoller<N> {
    pub fn new(client: ViewerClient, filter: NotificationFilter, notifier: N) -> Self {
        Self {
            client,
            filter,
            notifier,
            period: Duration::from_secs(1),
            camera_name: String::new(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn filter(&self) -> &NotificationFilter {
        &self.filter
    }

    /// One poll: fetch, filter, notify
    pub async fn poll_once(&mut self) -> Result<Option<MonitorEvent>, AlertError> {
        let message = self.client.fetch_sleep_message().await?;
        let Some(event) = self.filter.accept(&message) else {
            return Ok(None);
        };

        if self.camera_name.is_empty() {
            self.camera_name = self
                .client
                .fetch_camera_name()
                .await
                .unwrap_or_else(|e| {
                    warn!("Camera name unavailable: {}", e);
                    String::new()
                });
        }
        self.notifier.notify(&self.camera_name, event);
        Ok(Some(event))
    }

    /// Poll until the task is dropped. Failed polls are logged and retried
    /// on the next tick.
    pub async fn run(mut self) {
        info!(
            "Polling {} every {:?}",
            self.client.base_url(),
            self.period
        );
        let mut ticker = interval(self.period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(Some(event)) => debug!("Notified {}", event.as_str()),
                Ok(None) => {}
                Err(e) => warn!("Poll failed: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode as HttpStatus;
    use axum::routing::get;
    use axum::Router;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Camera {
        messages: Mutex<VecDeque<String>>,
        expression: Mutex<String>,
    }

    fn authorized(params: &HashMap<String, String>) -> bool {
        params.get("pin").map(String::as_str) == Some("1234")
    }

    async fn sleep(
        State(camera): State<Arc<Camera>>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (HttpStatus, String) {
        if !authorized(&params) {
            return (HttpStatus::UNAUTHORIZED, "Invalid PIN".into());
        }
        let message = camera.messages.lock().unwrap().pop_front().unwrap_or_default();
        (HttpStatus::OK, message)
    }

    async fn expression(State(camera): State<Arc<Camera>>) -> String {
        camera.expression.lock().unwrap().clone()
    }

    async fn serve(camera: Arc<Camera>) -> u16 {
        let app = Router::new()
            .route("/sleep", get(sleep))
            .route("/expression", get(expression))
            .route("/camera_name", get(|| async { "BABY" }))
            .route("/big", get(|| async { "x".repeat(5000) }))
            .with_state(camera);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        port
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<(String, MonitorEvent)>>>);

    impl Notifier for Collect {
        fn notify(&self, camera_name: &str, event: MonitorEvent) {
            self.0.lock().unwrap().push((camera_name.to_string(), event));
        }
    }

    #[test]
    fn test_client_requires_pin() {
        assert!(matches!(
            ViewerClient::new("192.168.0.10", 8080, ""),
            Err(AlertError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_poll_sequence() {
        let camera = Arc::new(Camera::default());
        camera.messages.lock().unwrap().extend(
            ["수면", "", "수면", "--BoundaryString", "기상"].map(String::from),
        );
        let port = serve(camera).await;

        let notifier = Collect::default();
        let client = ViewerClient::new("127.0.0.1", port, "1234").unwrap();
        let mut poller = NotificationPoller::new(client, NotificationFilter::default(), notifier.clone());

        let mut results = Vec::new();
        for _ in 0..5 {
            results.push(poller.poll_once().await.unwrap());
        }
        assert_eq!(
            results,
            vec![Some(MonitorEvent::Sleep), None, None, None, Some(MonitorEvent::Wake)]
        );
        assert_eq!(
            *notifier.0.lock().unwrap(),
            vec![
                ("BABY".to_string(), MonitorEvent::Sleep),
                ("BABY".to_string(), MonitorEvent::Wake),
            ]
        );
    }

    #[tokio::test]
    async fn test_wrong_pin() {
        let port = serve(Arc::new(Camera::default())).await;
        let client = ViewerClient::new("127.0.0.1", port, "0000").unwrap();
        assert!(matches!(
            client.fetch_sleep_message().await,
            Err(AlertError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_expression_unknown_mapped() {
        let camera = Arc::new(Camera::default());
        *camera.expression.lock().unwrap() = "unknown".into();
        let port = serve(camera.clone()).await;
        let client = ViewerClient::new("127.0.0.1", port, "1234").unwrap();

        assert_eq!(client.fetch_expression().await.unwrap(), "face not detected");
        *camera.expression.lock().unwrap() = "Happiness".into();
        assert_eq!(client.fetch_expression().await.unwrap(), "Happiness");
    }

    #[tokio::test]
    async fn test_body_capped() {
        let port = serve(Arc::new(Camera::default())).await;
        let client = ViewerClient::new("127.0.0.1", port, "1234").unwrap();
        let body = client.fetch_text("/big").await.unwrap();
        assert_eq!(body.len(), MAX_RESPONSE_BYTES);
    }
}
