use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::geo_zone::Coordinates;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Justified,
}

/// Where a record sits in the daily check-in/check-out progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttendancePhase {
    CheckedIn,
    CheckedOut,
}

/// One person's attendance for one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "person_id": 1000,
    "date": "2026-03-02",
    "check_in_at": "2026-03-02T13:20:00Z",
    "check_out_at": null,
    "check_in_location": { "latitude": -12.0461, "longitude": -77.0428 },
    "check_out_location": null,
    "check_in_zone_id": 1,
    "check_out_zone_id": null,
    "tardiness_minutes": 5,
    "status": "late",
    "worked_hours": null
}))]
pub struct AttendanceRecord {
    pub id: u64,
    pub person_id: u64,

    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,

    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_in_at: Option<DateTime<Utc>>,

    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_out_at: Option<DateTime<Utc>>,

    pub check_in_location: Option<Coordinates>,
    pub check_out_location: Option<Coordinates>,
    pub check_in_zone_id: Option<u64>,
    pub check_out_zone_id: Option<u64>,
    pub tardiness_minutes: u32,
    pub status: AttendanceStatus,

    #[schema(example = "8.25", value_type = Option<String>)]
    pub worked_hours: Option<Decimal>,
}

impl AttendanceRecord {
    pub fn phase(&self) -> AttendancePhase {
        if self.check_out_at.is_some() {
            AttendancePhase::CheckedOut
        } else {
            AttendancePhase::CheckedIn
        }
    }
}
