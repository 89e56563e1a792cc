//! Settings for the camera server and the viewer

use crate::ApiError;
use alerting::NotificationPreferences;
use bms::{BmsConfig, DisplayConfig, Size};
use camera_capture::CameraConfig;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Camera device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    /// PIN every viewer request must carry
    pub pin: String,
    /// Name served to viewers and used in capture file names
    pub camera_name: String,
    pub gallery_dir: PathBuf,
    pub log_path: PathBuf,
    pub log_level: String,
    /// Preview size the face box overlay is mapped onto
    pub view: Size,
    pub bms: BmsConfig,
    pub camera: CameraConfig,
    pub display: DisplayConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let camera = CameraConfig::default();
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            pin: "1234".to_string(),
            camera_name: "BABY".to_string(),
            gallery_dir: PathBuf::from("BaMIA"),
            log_path: PathBuf::from("camera_mode_log.txt"),
            log_level: "info".to_string(),
            view: Size::new(camera.width as f32, camera.height as f32),
            bms: BmsConfig::default(),
            camera,
            display: DisplayConfig::default(),
        }
    }
}

impl ServerSettings {
    /// Load from an optional `baby-monitor.toml` (or `file`) and `BAMIA__*` variables
    pub fn load(file: Option<&str>) -> Result<Self, ApiError> {
        let settings: Self = load_layered(file.unwrap_or("baby-monitor"), "BAMIA")?;
        settings.bms.validate()?;
        if settings.pin.is_empty() {
            return Err(ApiError::Settings("pin must not be empty".into()));
        }
        Ok(settings)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Viewer (parent device) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub camera_host: String,
    pub camera_port: u16,
    pub pin: String,
    pub poll_interval_ms: u64,
    pub log_level: String,
    /// Only sleep, wake and face-lost notifications; overrides `notifications`
    pub safety_only: bool,
    pub notifications: NotificationPreferences,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            camera_host: String::new(),
            camera_port: 8080,
            pin: String::new(),
            poll_interval_ms: 1000,
            log_level: "info".to_string(),
            safety_only: false,
            notifications: NotificationPreferences::default(),
        }
    }
}

impl ViewerSettings {
    /// Load from an optional `baby-viewer.toml` (or `file`) and `BAMIA_VIEWER__*` variables
    pub fn load(file: Option<&str>) -> Result<Self, ApiError> {
        load_layered(file.unwrap_or("baby-viewer"), "BAMIA_VIEWER")
    }

    /// Notification preferences in effect
    pub fn preferences(&self) -> NotificationPreferences {
        if self.safety_only {
            NotificationPreferences::safety_only()
        } else {
            self.notifications.clone()
        }
    }
}

fn load_layered<T: DeserializeOwned>(file: &str, env_prefix: &str) -> Result<T, ApiError> {
    let settings = Config::builder()
        .add_source(File::with_name(file).required(false))
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::CameraFacing;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = ServerSettings::default();
        assert_eq!(settings.addr(), "0.0.0.0:8080");
        assert_eq!(settings.pin, "1234");
        assert_eq!(settings.camera_name, "BABY");
        assert_eq!(settings.view, Size::new(640.0, 480.0));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = 9090
camera_name = "Dana"

[bms]
sleep_threshold_ms = 5000

[camera]
facing = "front"
"#
        )
        .unwrap();

        let settings = ServerSettings::load(file.path().to_str()).unwrap();
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.camera_name, "Dana");
        assert_eq!(settings.pin, "1234");
        assert_eq!(settings.bms.sleep_threshold_ms, 5000);
        assert_eq!(settings.bms.eyes_closed_threshold, 0.3);
        assert_eq!(settings.camera.facing, CameraFacing::Front);
    }

    #[test]
    fn test_load_rejects_bad_thresholds() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[bms]\neyes_closed_threshold = 0.8\neyes_open_threshold = 0.2"
        )
        .unwrap();
        assert!(matches!(
            ServerSettings::load(file.path().to_str()),
            Err(ApiError::Bms(_))
        ));
    }

    #[test]
    fn test_viewer_defaults() {
        let settings = ViewerSettings::default();
        assert_eq!(settings.camera_port, 8080);
        assert_eq!(settings.poll_interval_ms, 1000);
        assert!(settings.notifications.notify_sleep);
        assert_eq!(settings.preferences(), NotificationPreferences::default());
    }

    #[test]
    fn test_viewer_safety_only() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "camera_host = \"192.168.0.7\"\npin = \"0000\"\nsafety_only = true"
        )
        .unwrap();

        let settings = ViewerSettings::load(file.path().to_str()).unwrap();
        assert_eq!(settings.camera_host, "192.168.0.7");
        let preferences = settings.preferences();
        assert!(preferences.notify_sleep && preferences.notify_wakeup && preferences.notify_face);
        assert!(!preferences.notify_smile && !preferences.notify_cry);
    }
}
