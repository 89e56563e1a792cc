//! Per-frame tracker combining eye state, expression stability and the
//! daily capture gate

use crate::analysis::{CaptureDecision, Expression, FrameAnalysis, FrameObservation, SleepState};
use crate::capture::DailyCaptureGate;
use crate::eyes::EyeStateTracker;
use crate::expression::ExpressionStabilizer;
use crate::BmsConfig;
use chrono::NaiveDate;

/// Tracker state for one analysis session.
///
/// Must only be driven from a single execution context; it holds no locks.
#[derive(Debug, Clone)]
pub struct FrameTracker {
    config: BmsConfig,
    eyes: EyeStateTracker,
    expression: ExpressionStabilizer,
    gate: DailyCaptureGate,
}

impl FrameTracker {
    pub fn new(config: BmsConfig, today: NaiveDate) -> Self {
        Self {
            eyes: EyeStateTracker::new(&config),
            expression: ExpressionStabilizer::new(config.expression_stable_ms),
            gate: DailyCaptureGate::new(today),
            config,
        }
    }

    /// Advance the state machines by one frame
    pub fn process(&mut self, observation: &FrameObservation, today: NaiveDate) -> FrameAnalysis {
        let now = observation.timestamp_ms;
        let mut events = Vec::new();

        // frames without a face count as "unknown" for expression tracking
        let expression = if observation.face_detected {
            events.extend(self.eyes.observe_face(observation.eye_probabilities(), now));
            observation.expression
        } else {
            events.extend(self.eyes.observe_no_face());
            Expression::Unknown
        };

        let update = self.expression.observe(expression, now);
        events.extend(update.alert);

        let capture = update
            .stable
            .filter(|_| self.config.auto_capture)
            .filter(|e| self.gate.should_capture(*e, today))
            .map(|expression| CaptureDecision { expression });

        FrameAnalysis {
            timestamp_ms: now,
            face_detected: observation.face_detected,
            sleep_state: self.eyes.state(),
            events,
            stable_expression: update.stable,
            capture,
            overlay: None,
        }
    }

    pub fn sleep_state(&self) -> SleepState {
        self.eyes.state()
    }

    pub fn capture_gate(&self) -> &DailyCaptureGate {
        &self.gate
    }

    /// Restart eye and expression tracking (camera switched). The daily
    /// capture gate is kept, so a switch never re-arms today's captures.
    pub fn reset(&mut self) {
        self.eyes.reset();
        self.expression.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MonitorEvent;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn face(t: u64, eyes: f32, expression: Expression) -> FrameObservation {
        FrameObservation {
            timestamp_ms: t,
            face_detected: true,
            left_eye_open: Some(eyes),
            right_eye_open: Some(eyes),
            expression,
            ..Default::default()
        }
    }

    fn run(
        tracker: &mut FrameTracker,
        frames: impl IntoIterator<Item = FrameObservation>,
        date: NaiveDate,
    ) -> Vec<FrameAnalysis> {
        frames
            .into_iter()
            .map(|f| tracker.process(&f, date))
            .collect()
    }

    #[test]
    fn test_full_scenario() {
        let mut tracker = FrameTracker::new(BmsConfig::default(), today());

        // eyes shut, neutral face
        let out = run(
            &mut tracker,
            (0..=3100).step_by(100).map(|t| face(t, 0.1, Expression::Neutral)),
            today(),
        );
        let sleeps: Vec<_> = out
            .iter()
            .filter(|a| a.events.contains(&MonitorEvent::Sleep))
            .map(|a| a.timestamp_ms)
            .collect();
        assert_eq!(sleeps, vec![3000]);
        assert_eq!(tracker.sleep_state(), SleepState::Asleep);

        // eyes open, happy face
        let out = run(
            &mut tracker,
            (3200..=6300).step_by(100).map(|t| face(t, 0.9, Expression::Happiness)),
            today(),
        );
        let events: Vec<_> = out
            .iter()
            .flat_map(|a| a.events.iter().map(move |e| (a.timestamp_ms, *e)))
            .collect();
        assert_eq!(
            events,
            vec![(4200, MonitorEvent::Happy), (6200, MonitorEvent::Wake)]
        );

        let captures: Vec<_> = out.iter().filter_map(|a| a.capture).collect();
        assert_eq!(
            captures,
            vec![CaptureDecision {
                expression: Expression::Happiness
            }]
        );
    }

    #[test]
    fn test_capture_once_per_day_and_again_tomorrow() {
        let mut tracker = FrameTracker::new(BmsConfig::default(), today());
        let happy = |range: std::ops::RangeInclusive<u64>| {
            range
                .step_by(100)
                .map(|t| face(t, 0.9, Expression::Happiness))
                .collect::<Vec<_>>()
        };

        let out = run(&mut tracker, happy(0..=5000), today());
        assert_eq!(out.iter().filter(|a| a.capture.is_some()).count(), 1);

        // break the run, then come back the same day
        run(&mut tracker, [face(5100, 0.9, Expression::Neutral)], today());
        let out = run(&mut tracker, happy(5200..=8000), today());
        assert_eq!(out.iter().filter(|a| a.capture.is_some()).count(), 0);

        let tomorrow = today().succ_opt().unwrap();
        let out = run(&mut tracker, happy(8100..=9000), tomorrow);
        assert_eq!(out.iter().filter(|a| a.capture.is_some()).count(), 1);
    }

    #[test]
    fn test_auto_capture_disabled() {
        let config = BmsConfig {
            auto_capture: false,
            ..Default::default()
        };
        let mut tracker = FrameTracker::new(config, today());
        let out = run(
            &mut tracker,
            (0..=3000).step_by(100).map(|t| face(t, 0.9, Expression::Happiness)),
            today(),
        );
        assert!(out.iter().all(|a| a.capture.is_none()));
        assert!(out.iter().any(|a| a.events.contains(&MonitorEvent::Happy)));
    }

    #[test]
    fn test_no_face_decays_to_unknown_without_capture() {
        let mut tracker = FrameTracker::new(BmsConfig::default(), today());
        let out = run(
            &mut tracker,
            (0..=2000).step_by(100).map(FrameObservation::no_face),
            today(),
        );
        let last = out.last().unwrap();
        assert!(!last.face_detected);
        assert_eq!(last.stable_expression, Some(Expression::Unknown));
        assert!(out.iter().all(|a| a.capture.is_none() && a.events.is_empty()));
    }

    #[test]
    fn test_face_undetected_while_asleep() {
        let mut tracker = FrameTracker::new(BmsConfig::default(), today());
        run(
            &mut tracker,
            (0..=3000).step_by(100).map(|t| face(t, 0.1, Expression::Neutral)),
            today(),
        );

        let out = run(
            &mut tracker,
            (3100..=6000).step_by(100).map(FrameObservation::no_face),
            today(),
        );
        let undetected = out
            .iter()
            .filter(|a| a.events.contains(&MonitorEvent::FaceUndetected))
            .count();
        assert_eq!(undetected, 1);
    }

    #[test]
    fn test_reset_returns_to_awake_and_keeps_gate() {
        let mut tracker = FrameTracker::new(BmsConfig::default(), today());
        run(
            &mut tracker,
            (0..=3000).step_by(100).map(|t| face(t, 0.1, Expression::Happiness)),
            today(),
        );
        assert_eq!(tracker.sleep_state(), SleepState::Asleep);
        assert!(tracker
            .capture_gate()
            .captured_today()
            .contains(&Expression::Happiness));

        tracker.reset();
        assert_eq!(tracker.sleep_state(), SleepState::Awake);
        assert!(tracker
            .capture_gate()
            .captured_today()
            .contains(&Expression::Happiness));

        // a new stable run after the reset is not captured again
        let out = run(
            &mut tracker,
            (3100..=5000).step_by(100).map(|t| face(t, 0.9, Expression::Happiness)),
            today(),
        );
        assert!(out.iter().any(|a| a.stable_expression == Some(Expression::Happiness)));
        assert!(out.iter().all(|a| a.capture.is_none()));
    }

    #[test]
    fn test_capture_used_up_even_if_never_saved() {
        let mut tracker = FrameTracker::new(BmsConfig::default(), today());
        let happy = |range: std::ops::RangeInclusive<u64>| {
            range
                .step_by(100)
                .map(|t| face(t, 0.9, Expression::Happiness))
                .collect::<Vec<_>>()
        };

        // the decision is handed out once; whatever happens to the save,
        // nothing is rolled back
        let first = run(&mut tracker, happy(0..=2000), today());
        assert_eq!(first.iter().filter(|a| a.capture.is_some()).count(), 1);

        run(&mut tracker, [face(2100, 0.9, Expression::Sadness)], today());
        let second = run(&mut tracker, happy(2200..=4000), today());
        assert!(second.iter().all(|a| a.capture.is_none()));
    }
}
