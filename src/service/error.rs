use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::justification::JustificationStatus;
use crate::repository::StoreError;

/// Every way an attendance or justification operation can be refused.
///
/// All variants except `Storage` are deterministic business outcomes: retrying
/// the same call cannot succeed.
#[derive(Debug, Error)]
pub enum ServiceError {
    // input validation
    #[error("invalid coordinates ({latitude}, {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("GPS accuracy of {accuracy_meters:.0}m is worse than the required {max_meters:.0}m")]
    LowAccuracy { accuracy_meters: f64, max_meters: f64 },

    #[error("GPS fix is {age_minutes} minutes old, refresh your location and try again")]
    StaleFix { age_minutes: i64 },

    #[error("GPS fix is timestamped in the future, check the device clock")]
    FutureFix,

    #[error("a reason is required")]
    MissingReason,

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    // configuration state
    #[error("no permitted locations are configured, contact an administrator")]
    NoZonesConfigured,

    #[error("no work schedule is assigned for {date}")]
    NonWorkingDay { date: NaiveDate },

    // geofence
    #[error("outside the permitted area: {distance_meters:.0}m from {zone_name}, allowed radius {radius_meters:.0}m")]
    OutsideGeofence {
        zone_id: u64,
        zone_name: String,
        distance_meters: f64,
        radius_meters: f64,
    },

    // sequencing
    #[error("already checked in on {date}")]
    DuplicateCheckIn { date: NaiveDate },

    #[error("no check-in found for {date}, check in first")]
    NoCheckInFound { date: NaiveDate },

    #[error("already checked out at {at}")]
    AlreadyCheckedOut { at: DateTime<Utc> },

    #[error("check-out time must be after the check-in time")]
    InvalidOrdering,

    // authorization
    #[error("the resource belongs to another person")]
    NotOwner,

    #[error("attendance record {0} not found")]
    RecordNotFound(u64),

    #[error("justification {0} not found")]
    RequestNotFound(u64),

    // workflow
    #[error("attendance record {record_id} already has a pending justification")]
    DuplicatePending { record_id: u64 },

    #[error("justification {existing_id} already covers part of this period")]
    OverlappingJustification { existing_id: u64 },

    #[error("justification was already {status}")]
    AlreadyDecided { status: JustificationStatus },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable code for API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidCoordinates { .. } => "invalid_coordinates",
            ServiceError::LowAccuracy { .. } => "low_accuracy",
            ServiceError::StaleFix { .. } => "stale_fix",
            ServiceError::FutureFix => "future_fix",
            ServiceError::MissingReason => "missing_reason",
            ServiceError::InvalidDateRange(_) => "invalid_date_range",
            ServiceError::NoZonesConfigured => "no_zones_configured",
            ServiceError::NonWorkingDay { .. } => "non_working_day",
            ServiceError::OutsideGeofence { .. } => "outside_geofence",
            ServiceError::DuplicateCheckIn { .. } => "duplicate_check_in",
            ServiceError::NoCheckInFound { .. } => "no_check_in_found",
            ServiceError::AlreadyCheckedOut { .. } => "already_checked_out",
            ServiceError::InvalidOrdering => "invalid_ordering",
            ServiceError::NotOwner => "not_owner",
            ServiceError::RecordNotFound(_) => "record_not_found",
            ServiceError::RequestNotFound(_) => "request_not_found",
            ServiceError::DuplicatePending { .. } => "duplicate_pending",
            ServiceError::OverlappingJustification { .. } => "overlapping_justification",
            ServiceError::AlreadyDecided { .. } => "already_decided",
            ServiceError::Storage(_) => "storage",
        }
    }
}
