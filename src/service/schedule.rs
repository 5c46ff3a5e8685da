use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use super::error::ServiceError;
use crate::model::work_schedule::WorkSchedule;
use crate::repository::ScheduleRepository;

/// ISO weekday number, 1 = Monday .. 7 = Sunday. Used for every schedule lookup.
pub fn iso_weekday(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Earliest-starting well-formed row; normally there is at most one.
pub fn pick_window(rows: Vec<WorkSchedule>) -> Option<WorkSchedule> {
    rows.into_iter()
        .filter(|row| {
            let ok = row.is_well_formed();
            if !ok {
                tracing::warn!(schedule_id = row.id, "Ignoring malformed work schedule");
            }
            ok
        })
        .min_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)))
}

pub struct ScheduleResolver {
    schedules: Arc<dyn ScheduleRepository>,
}

impl ScheduleResolver {
    pub fn new(schedules: Arc<dyn ScheduleRepository>) -> Self {
        Self { schedules }
    }

    /// `Ok(None)` means a non-working day, not a failure.
    pub async fn expected_window(
        &self,
        person_id: u64,
        date: NaiveDate,
    ) -> Result<Option<WorkSchedule>, ServiceError> {
        let weekday = iso_weekday(date);
        let rows = self.schedules.find_active(person_id, weekday).await?;
        Ok(pick_window(rows))
    }
}

#[cfg(test)]
pub mod fixtures {
    use chrono::NaiveTime;

    use crate::model::work_schedule::WorkSchedule;

    pub fn shift(id: u64, person_id: u64, weekday: u8, start: (u32, u32), end: (u32, u32)) -> WorkSchedule {
        WorkSchedule {
            id,
            person_id,
            weekday,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            active: true,
        }
    }

    /// 08:00-17:00 on every weekday.
    pub fn office_week(person_id: u64) -> Vec<WorkSchedule> {
        (1..=5)
            .map(|day| shift(100 + day as u64, person_id, day, (8, 0), (17, 0)))
            .collect()
    }
}
