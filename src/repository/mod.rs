//! Persistence boundary of the attendance core.
//!
//! The services only ever see these traits. `mysql` is the production
//! implementation; `memory` backs the test suite.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::model::attendance::AttendanceRecord;
use crate::model::geo_zone::GeoZone;
use crate::model::justification::{JustificationRequest, JustificationStatus};
use crate::model::work_schedule::WorkSchedule;

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated")]
    Conflict,

    /// A guarded write matched no row because the row changed underneath it.
    #[error("row was modified concurrently")]
    Stale,

    /// A row the write depends on does not exist.
    #[error("{table}#{id} does not exist")]
    Missing { table: &'static str, id: u64 },

    #[error("row {table}#{id} could not be decoded: {reason}")]
    Corrupt {
        table: &'static str,
        id: u64,
        reason: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ZoneRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<GeoZone>, StoreError>;
}

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Active schedules of `person_id` on the ISO `weekday` (1 = Monday).
    async fn find_active(&self, person_id: u64, weekday: u8)
    -> Result<Vec<WorkSchedule>, StoreError>;
}

#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_by_person_and_date(
        &self,
        person_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Inserts a new record and returns it with its assigned id.
    /// Fails with `StoreError::Conflict` if (person_id, date) already exists.
    async fn insert(&self, record: AttendanceRecord) -> Result<AttendanceRecord, StoreError>;

    /// Writes only the check-out half of `record` (time, location, zone, worked
    /// hours) and returns the stored row. The status is left as stored, so a
    /// justification approved meanwhile survives.
    /// Fails with `StoreError::Stale` if the stored record is already checked out.
    async fn record_check_out(
        &self,
        record: &AttendanceRecord,
    ) -> Result<AttendanceRecord, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct JustificationFilter {
    pub status: Option<JustificationStatus>,
    pub page: u64,
    pub per_page: u64,
}

#[async_trait]
pub trait JustificationRepository: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<JustificationRequest>, StoreError>;

    async fn find_pending_by_record(
        &self,
        record_id: u64,
    ) -> Result<Option<JustificationRequest>, StoreError>;

    /// Pending or approved requests of `person_id` intersecting [start, end].
    async fn find_active_overlapping(
        &self,
        person_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<JustificationRequest>, StoreError>;

    /// One page of a person's requests, newest first, plus the total count.
    async fn list_for_person(
        &self,
        person_id: u64,
        filter: &JustificationFilter,
    ) -> Result<(Vec<JustificationRequest>, u64), StoreError>;

    /// Fails with `StoreError::Conflict` if the record already has a pending request.
    async fn insert(
        &self,
        request: JustificationRequest,
    ) -> Result<JustificationRequest, StoreError>;

    /// Persists a decided request and, when `justify_record` is set, marks that
    /// attendance record `justified`. Both writes commit together or not at all.
    /// Fails with `StoreError::Stale` if the stored request is no longer pending
    /// and with `StoreError::Missing` if `justify_record` does not exist.
    async fn apply_decision(
        &self,
        request: &JustificationRequest,
        justify_record: Option<u64>,
    ) -> Result<(), StoreError>;

    /// Replaces category, reason and evidence of a pending request.
    /// Fails with `StoreError::Stale` if the request is no longer pending.
    async fn update_pending(&self, request: &JustificationRequest) -> Result<(), StoreError>;

    /// Fails with `StoreError::Stale` if the request is no longer pending.
    async fn delete_pending(&self, id: u64) -> Result<(), StoreError>;
}
