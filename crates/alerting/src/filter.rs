//! Notification filtering

use bms::MonitorEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Multipart boundary of the camera's MJPEG stream. A status response
/// containing it is a stream body, not an event.
pub const MJPEG_BOUNDARY: &str = "--BoundaryString";

/// Which events the parent wants to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub notify_sleep: bool,
    pub notify_wakeup: bool,
    pub notify_face: bool,
    pub notify_smile: bool,
    pub notify_cry: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            notify_sleep: true,
            notify_wakeup: true,
            notify_face: true,
            notify_smile: true,
            notify_cry: true,
        }
    }
}

impl NotificationPreferences {
    /// Only sleep, wake and face-lost notifications
    pub fn safety_only() -> Self {
        Self {
            notify_smile: false,
            notify_cry: false,
            ..Default::default()
        }
    }

    pub fn allows(&self, event: MonitorEvent) -> bool {
        match event {
            MonitorEvent::Sleep => self.notify_sleep,
            MonitorEvent::Wake => self.notify_wakeup,
            MonitorEvent::FaceUndetected => self.notify_face,
            MonitorEvent::Happy => self.notify_smile,
            MonitorEvent::Sad => self.notify_cry,
        }
    }
}

/// Turns raw `/sleep` responses into notifications.
///
/// An event identical to the last one notified is dropped, so a message the
/// camera keeps serving is only shown once.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    preferences: NotificationPreferences,
    last_notified: Option<MonitorEvent>,
}

impl NotificationFilter {
    pub fn new(preferences: NotificationPreferences) -> Self {
        info!("Creating notification filter with {:?}", preferences);
        Self {
            preferences,
            last_notified: None,
        }
    }

    /// Decide whether a raw response should be notified, recording it if so
    pub fn accept(&mut self, response: &str) -> Option<MonitorEvent> {
        let response = response.trim();
        if response.is_empty() || response.contains(MJPEG_BOUNDARY) {
            return None;
        }

        let Some(event) = MonitorEvent::from_message(response) else {
            debug!("Ignoring unrecognised message {:?}", response);
            return None;
        };

        if self.last_notified == Some(event) {
            debug!("Suppressed repeat of {}", event.as_str());
            return None;
        }
        if !self.preferences.allows(event) {
            debug!("{} disabled by preferences", event.as_str());
            return None;
        }

        self.last_notified = Some(event);
        Some(event)
    }

    pub fn last_notified(&self) -> Option<MonitorEvent> {
        self.last_notified
    }

    pub fn preferences(&self) -> &NotificationPreferences {
        &self.preferences
    }

    pub fn clear(&mut self) {
        self.last_notified = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_events() {
        let mut filter = NotificationFilter::default();
        assert_eq!(filter.accept("수면"), Some(MonitorEvent::Sleep));
        assert_eq!(filter.accept(" 기상\n"), Some(MonitorEvent::Wake));
        assert_eq!(filter.last_notified(), Some(MonitorEvent::Wake));
    }

    #[test]
    fn test_ignores_noise() {
        let mut filter = NotificationFilter::default();
        assert_eq!(filter.accept(""), None);
        assert_eq!(filter.accept("   "), None);
        assert_eq!(filter.accept("--BoundaryString\r\nContent-Type: image/jpeg"), None);
        assert_eq!(filter.accept("hello"), None);
        assert_eq!(filter.last_notified(), None);
    }

    #[test]
    fn test_repeat_suppressed_until_other_event() {
        let mut filter = NotificationFilter::default();
        assert!(filter.accept("얼굴 미감지").is_some());
        assert!(filter.accept("얼굴 미감지").is_none());
        assert!(filter.accept("기상").is_some());
        assert!(filter.accept("얼굴 미감지").is_some());
    }

    #[test]
    fn test_preferences_gate() {
        let mut filter = NotificationFilter::new(NotificationPreferences::safety_only());
        assert_eq!(filter.accept("행복"), None);
        assert_eq!(filter.accept("슬픔"), None);
        // a disabled event does not become the last notified one
        assert_eq!(filter.last_notified(), None);
        assert_eq!(filter.accept("수면"), Some(MonitorEvent::Sleep));
    }

    #[test]
    fn test_preferences_default_on() {
        let prefs: NotificationPreferences = serde_json::from_str(r#"{"notify_cry": false}"#).unwrap();
        assert!(prefs.notify_sleep && prefs.notify_smile);
        assert!(!prefs.allows(MonitorEvent::Sad));
    }
}
