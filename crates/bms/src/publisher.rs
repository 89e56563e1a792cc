//! Latest-event publication for remote viewers

use crate::analysis::{Expression, FrameAnalysis, MonitorEvent, SleepState};
use crate::overlay::FaceOverlay;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

/// Latest analysis state served as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub sleep_state: SleepState,
    pub face_detected: bool,
    pub current_expression: Expression,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<FaceOverlay>,
    pub timestamp_ms: u64,
}

/// Shared between the analysis pipeline (writer) and HTTP handlers (readers).
///
/// Every cell is last-write-wins; a viewer polling slower than events are
/// produced only sees the latest one.
#[derive(Debug, Default)]
pub struct EventPublisher {
    sleep_message: Mutex<Option<MonitorEvent>>,
    current_expression: RwLock<Expression>,
    snapshot: RwLock<StatusSnapshot>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the pending event message
    pub fn publish_event(&self, event: MonitorEvent) {
        debug!("Publishing event {}", event.as_str());
        *self
            .sleep_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(event);
    }

    /// Return the pending event message and clear it.
    ///
    /// Returns an empty string when nothing was published since the last read.
    pub fn take_sleep_message(&self) -> String {
        self.sleep_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|event| event.message().to_string())
            .unwrap_or_default()
    }

    /// Pending event without clearing it
    pub fn peek_event(&self) -> Option<MonitorEvent> {
        *self
            .sleep_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_current_expression(&self, expression: Expression) {
        *self
            .current_expression
            .write()
            .unwrap_or_else(PoisonError::into_inner) = expression;
    }

    pub fn current_expression(&self) -> Expression {
        *self
            .current_expression
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish everything a processed frame produced
    pub fn record(&self, analysis: &FrameAnalysis) {
        for event in &analysis.events {
            self.publish_event(*event);
        }
        if let Some(expression) = analysis.stable_expression {
            self.set_current_expression(expression);
        }

        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *snapshot = StatusSnapshot {
            sleep_state: analysis.sleep_state,
            face_detected: analysis.face_detected,
            current_expression: self.current_expression(),
            overlay: analysis.overlay.clone(),
            timestamp_ms: analysis.timestamp_ms,
        };
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the current expression and snapshot (camera switched). A
    /// pending event message stays until a viewer reads it.
    pub fn reset_status(&self) {
        self.set_current_expression(Expression::Unknown);
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = StatusSnapshot::default();
    }
}
