//! Expression stability tracking

use crate::analysis::{Expression, MonitorEvent};
use std::collections::HashSet;
use tracing::debug;

/// Result of feeding one raw label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpressionUpdate {
    /// Set while the current run has lasted at least the stability window
    pub stable: Option<Expression>,
    /// Alert raised by this frame (first stable frame of a happy/sad run)
    pub alert: Option<MonitorEvent>,
}

/// Debounces raw per-frame labels into stable runs.
///
/// A run starts whenever the label changes and becomes stable once it has
/// lasted the window. Only a label change ends a run.
#[derive(Debug, Clone)]
pub struct ExpressionStabilizer {
    stable_window_ms: u64,
    last_expression: Option<Expression>,
    stable_since_ms: u64,
    alerted: HashSet<Expression>,
}

impl ExpressionStabilizer {
    pub fn new(stable_window_ms: u64) -> Self {
        Self {
            stable_window_ms,
            last_expression: None,
            stable_since_ms: 0,
            alerted: HashSet::new(),
        }
    }

    pub fn observe(&mut self, expression: Expression, now_ms: u64) -> ExpressionUpdate {
        if self.last_expression != Some(expression) {
            debug!(
                "Expression changed {:?} -> {:?}",
                self.last_expression, expression
            );
            self.last_expression = Some(expression);
            self.stable_since_ms = now_ms;
            self.alerted.clear();
            return ExpressionUpdate::default();
        }

        if now_ms.saturating_sub(self.stable_since_ms) < self.stable_window_ms {
            return ExpressionUpdate::default();
        }

        let alert = expression
            .alert_event()
            .filter(|_| self.alerted.insert(expression));

        ExpressionUpdate {
            stable: Some(expression),
            alert,
        }
    }

    pub fn last_expression(&self) -> Option<Expression> {
        self.last_expression
    }

    pub fn stable_since_ms(&self) -> u64 {
        self.stable_since_ms
    }

    pub fn reset(&mut self) {
        self.last_expression = None;
        self.stable_since_ms = 0;
        self.alerted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(
        stabilizer: &mut ExpressionStabilizer,
        expression: Expression,
        start: u64,
        end: u64,
    ) -> Vec<(u64, ExpressionUpdate)> {
        (start..=end)
            .step_by(100)
            .map(|t| (t, stabilizer.observe(expression, t)))
            .collect()
    }

    #[test]
    fn test_becomes_stable_after_window() {
        let mut stabilizer = ExpressionStabilizer::new(1000);
        let updates = feed(&mut stabilizer, Expression::Neutral, 0, 1200);

        for (t, update) in &updates {
            if *t < 1000 {
                assert_eq!(update.stable, None, "stable too early at {t}");
            } else {
                assert_eq!(update.stable, Some(Expression::Neutral));
            }
            assert_eq!(update.alert, None);
        }
    }

    #[test]
    fn test_happy_alert_once_per_run() {
        let mut stabilizer = ExpressionStabilizer::new(1000);
        let alerts: Vec<_> = feed(&mut stabilizer, Expression::Happiness, 0, 10_000)
            .into_iter()
            .filter_map(|(t, u)| u.alert.map(|a| (t, a)))
            .collect();
        assert_eq!(alerts, vec![(1000, MonitorEvent::Happy)]);
    }

    #[test]
    fn test_alert_rearms_after_label_change() {
        let mut stabilizer = ExpressionStabilizer::new(1000);
        feed(&mut stabilizer, Expression::Sadness, 0, 1500);
        feed(&mut stabilizer, Expression::Neutral, 1600, 1700);

        let alerts: Vec<_> = feed(&mut stabilizer, Expression::Sadness, 1800, 3000)
            .into_iter()
            .filter_map(|(_, u)| u.alert)
            .collect();
        assert_eq!(alerts, vec![MonitorEvent::Sad]);
    }

    #[test]
    fn test_flicker_never_stabilizes() {
        let mut stabilizer = ExpressionStabilizer::new(1000);
        for i in 0..100u64 {
            let expression = if i % 2 == 0 {
                Expression::Happiness
            } else {
                Expression::Surprise
            };
            assert_eq!(stabilizer.observe(expression, i * 400), ExpressionUpdate::default());
        }
    }

    #[test]
    fn test_unknown_is_stable_but_silent() {
        let mut stabilizer = ExpressionStabilizer::new(1000);
        let last = feed(&mut stabilizer, Expression::Unknown, 0, 1000).pop().unwrap().1;
        assert_eq!(last.stable, Some(Expression::Unknown));
        assert_eq!(last.alert, None);
    }
}
