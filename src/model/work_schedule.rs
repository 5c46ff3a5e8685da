use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Expected work window of a person on one weekday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkSchedule {
    #[schema(example = 7)]
    pub id: u64,

    #[schema(example = 1000)]
    pub person_id: u64,

    /// ISO weekday: 1 = Monday .. 7 = Sunday
    #[schema(example = 1)]
    pub weekday: u8,

    #[schema(example = "08:00:00", value_type = String)]
    pub start_time: NaiveTime,

    #[schema(example = "17:00:00", value_type = String)]
    pub end_time: NaiveTime,

    pub active: bool,
}

impl WorkSchedule {
    pub fn is_well_formed(&self) -> bool {
        (1..=7).contains(&self.weekday) && self.start_time < self.end_time
    }
}
