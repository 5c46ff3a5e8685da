use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::work_schedule::WorkSchedule;

pub const DEFAULT_TOLERANCE_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Arrival {
    pub late_minutes: u32,
    pub is_late: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Departure {
    pub early_minutes: u32,
    pub is_early: bool,
}

/// Whole minutes in `d`, truncated; negative spans count as zero.
fn whole_minutes(d: Duration) -> u32 {
    u32::try_from(d.num_minutes().max(0)).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy)]
pub struct PunctualityCalculator {
    tolerance: Duration,
}

impl Default for PunctualityCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_MINUTES)
    }
}

impl PunctualityCalculator {
    pub fn new(tolerance_minutes: u32) -> Self {
        Self {
            tolerance: Duration::minutes(i64::from(tolerance_minutes)),
        }
    }

    pub fn tolerance_minutes(&self) -> i64 {
        self.tolerance.num_minutes()
    }

    /// `actual` is the local wall-clock time of the check-in; the window is
    /// anchored on the same calendar day.
    pub fn evaluate_check_in(&self, actual: NaiveDateTime, window: &WorkSchedule) -> Arrival {
        let deadline = actual.date().and_time(window.start_time) + self.tolerance;
        let late_minutes = whole_minutes(actual - deadline);

        Arrival {
            late_minutes,
            is_late: late_minutes > 0,
        }
    }

    pub fn evaluate_check_out(&self, actual: NaiveDateTime, window: &WorkSchedule) -> Departure {
        let expected_end = actual.date().and_time(window.end_time);
        let early_minutes = whole_minutes(expected_end - actual);

        Departure {
            early_minutes,
            is_early: early_minutes > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::service::schedule::fixtures::shift;

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn office() -> WorkSchedule {
        shift(1, 1, 1, (8, 0), (17, 0))
    }

    #[test]
    fn twenty_past_eight_is_five_minutes_late() {
        let arrival = PunctualityCalculator::default().evaluate_check_in(at(8, 20, 0), &office());
        assert_eq!(arrival, Arrival { late_minutes: 5, is_late: true });
    }

    #[test]
    fn before_the_deadline_is_on_time() {
        let calc = PunctualityCalculator::default();
        for t in [at(7, 50, 0), at(8, 0, 0), at(8, 15, 0)] {
            assert_eq!(calc.evaluate_check_in(t, &office()), Arrival { late_minutes: 0, is_late: false });
        }
    }

    #[test]
    fn partial_minutes_are_truncated() {
        let calc = PunctualityCalculator::default();
        assert_eq!(calc.evaluate_check_in(at(8, 17, 59), &office()).late_minutes, 2);
        assert_eq!(
            calc.evaluate_check_in(at(8, 15, 40), &office()),
            Arrival { late_minutes: 0, is_late: false }
        );
    }

    #[test]
    fn tolerance_is_configurable() {
        let strict = PunctualityCalculator::new(0);
        assert_eq!(strict.evaluate_check_in(at(8, 20, 0), &office()).late_minutes, 20);
    }

    #[test]
    fn tardiness_never_decreases_as_arrival_gets_later() {
        let calc = PunctualityCalculator::default();
        let mut previous = 0;
        for seconds in (0..4 * 3600).step_by(37) {
            let t = at(8, 15, 0) + Duration::seconds(seconds);
            let late = calc.evaluate_check_in(t, &office()).late_minutes;
            assert!(late >= previous, "tardiness went from {previous} to {late} at {t}");
            previous = late;
        }
    }

    #[test]
    fn early_departure_is_measured_without_tolerance() {
        let calc = PunctualityCalculator::default();
        assert_eq!(
            calc.evaluate_check_out(at(16, 50, 30), &office()),
            Departure { early_minutes: 9, is_early: true }
        );
        assert_eq!(
            calc.evaluate_check_out(at(17, 5, 0), &office()),
            Departure { early_minutes: 0, is_early: false }
        );
    }
}
