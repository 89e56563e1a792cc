//! Eye-state tracking: debounced sleep/wake detection

use crate::analysis::{MonitorEvent, SleepState};
use crate::BmsConfig;
use tracing::{debug, info};

/// Classification of one frame's eye probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeReading {
    /// Both eyes below the closed threshold
    Closed,
    /// Both eyes above the open threshold
    Open,
    /// In the hysteresis band, mixed, or not reported
    Indeterminate,
}

/// Sleep/wake state machine driven by eye-open probabilities.
///
/// Sleep is declared only after the eyes stay closed for the whole sleep
/// threshold, wake only after they stay open for the whole wake threshold.
/// Any frame that breaks the run restarts the corresponding timer.
#[derive(Debug, Clone)]
pub struct EyeStateTracker {
    closed_threshold: f32,
    open_threshold: f32,
    sleep_threshold_ms: u64,
    wake_threshold_ms: u64,
    state: SleepState,
    eyes_closed_since: Option<u64>,
    eyes_open_since: Option<u64>,
    face_undetected_notified: bool,
}

impl EyeStateTracker {
    pub fn new(config: &BmsConfig) -> Self {
        Self {
            closed_threshold: config.eyes_closed_threshold,
            open_threshold: config.eyes_open_threshold,
            sleep_threshold_ms: config.sleep_threshold_ms,
            wake_threshold_ms: config.wake_threshold_ms,
            state: SleepState::Awake,
            eyes_closed_since: None,
            eyes_open_since: None,
            face_undetected_notified: false,
        }
    }

    /// Classify a pair of eye-open probabilities
    pub fn classify(&self, eyes: Option<(f32, f32)>) -> EyeReading {
        match eyes {
            Some((left, right)) if left < self.closed_threshold && right < self.closed_threshold => {
                EyeReading::Closed
            }
            Some((left, right)) if left > self.open_threshold && right > self.open_threshold => {
                EyeReading::Open
            }
            _ => EyeReading::Indeterminate,
        }
    }

    /// Update with a frame where a face was detected
    pub fn observe_face(&mut self, eyes: Option<(f32, f32)>, now_ms: u64) -> Option<MonitorEvent> {
        self.face_undetected_notified = false;

        match self.classify(eyes) {
            EyeReading::Closed => {
                self.eyes_open_since = None;
                let since = *self.eyes_closed_since.get_or_insert_with(|| {
                    debug!("Eyes closed detected. Timer started.");
                    now_ms
                });
                if self.state == SleepState::Awake
                    && now_ms.saturating_sub(since) >= self.sleep_threshold_ms
                {
                    self.state = SleepState::Asleep;
                    self.eyes_open_since = None;
                    self.face_undetected_notified = false;
                    info!("Sleep started (eyes closed for {}ms)", now_ms - since);
                    return Some(MonitorEvent::Sleep);
                }
            }
            EyeReading::Open => {
                self.eyes_closed_since = None;
                let since = *self.eyes_open_since.get_or_insert_with(|| {
                    debug!("Eyes open detected. Timer started.");
                    now_ms
                });
                if self.state == SleepState::Asleep
                    && now_ms.saturating_sub(since) >= self.wake_threshold_ms
                {
                    self.state = SleepState::Awake;
                    self.eyes_closed_since = None;
                    self.face_undetected_notified = false;
                    info!("Sleep ended (eyes open for {}ms)", now_ms - since);
                    return Some(MonitorEvent::Wake);
                }
            }
            EyeReading::Indeterminate => {
                self.eyes_closed_since = None;
                self.eyes_open_since = None;
            }
        }

        None
    }

    /// Update with a frame where no face was detected
    pub fn observe_no_face(&mut self) -> Option<MonitorEvent> {
        self.eyes_closed_since = None;
        self.eyes_open_since = None;

        if self.state == SleepState::Asleep && !self.face_undetected_notified {
            self.face_undetected_notified = true;
            info!("Face lost while asleep");
            return Some(MonitorEvent::FaceUndetected);
        }
        None
    }

    pub fn state(&self) -> SleepState {
        self.state
    }

    pub fn eyes_closed_since(&self) -> Option<u64> {
        self.eyes_closed_since
    }

    pub fn eyes_open_since(&self) -> Option<u64> {
        self.eyes_open_since
    }

    pub fn face_undetected_notified(&self) -> bool {
        self.face_undetected_notified
    }

    /// Back to awake with no timers running
    pub fn reset(&mut self) {
        self.state = SleepState::Awake;
        self.eyes_closed_since = None;
        self.eyes_open_since = None;
        self.face_undetected_notified = false;
    }
}
