//! Daily auto-capture gate

use crate::analysis::Expression;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::info;

/// Allows at most one automatic capture per distinct expression per day.
///
/// An expression is recorded as captured as soon as the gate opens for it,
/// before the photo is actually saved. A failed save therefore uses up that
/// expression's capture for the day.
#[derive(Debug, Clone)]
pub struct DailyCaptureGate {
    capture_date: NaiveDate,
    captured_today: HashSet<Expression>,
}

impl DailyCaptureGate {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            capture_date: today,
            captured_today: HashSet::new(),
        }
    }

    /// Decide whether a stable `expression` should be auto-captured on `today`
    pub fn should_capture(&mut self, expression: Expression, today: NaiveDate) -> bool {
        self.roll_date(today);

        if !expression.is_capturable() {
            return false;
        }
        if !self.captured_today.insert(expression) {
            return false;
        }

        info!("Auto-capture for {:?} on {}", expression, self.capture_date);
        true
    }

    fn roll_date(&mut self, today: NaiveDate) {
        if today != self.capture_date {
            info!(
                "Capture date rolled {} -> {}, clearing {} entries",
                self.capture_date,
                today,
                self.captured_today.len()
            );
            self.capture_date = today;
            self.captured_today.clear();
        }
    }

    pub fn capture_date(&self) -> NaiveDate {
        self.capture_date
    }

    pub fn captured_today(&self) -> &HashSet<Expression> {
        &self.captured_today
    }
}
