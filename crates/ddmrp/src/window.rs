//! Calendar-day activity windows shared by demand and buffer adjustments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flowplan_core::{DomainError, DomainResult};

/// `[start, end]` window of an adjustment.
///
/// Bounds are stored as timestamps, but activity is decided per calendar day:
/// time-of-day is dropped on both sides of every comparison, so an adjustment
/// ending at `2024-03-10T00:00:00Z` is still active for all of March 10th.
///
/// Construction is stricter: `end` must not precede `start` as a timestamp,
/// even when both fall on the same calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ActiveWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if end < start {
            return Err(DomainError::validation("end date must be after start date"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_day(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Whether `day` falls within the window, both ends inclusive.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_day() <= day && day <= self.end_day()
    }
}
