use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, instrument};

use super::clock::local_datetime;
use super::error::ServiceError;
use super::geo::{FixPolicy, GeoValidator, GpsFix, ZoneMatch};
use super::punctuality::{Arrival, Departure, PunctualityCalculator};
use super::schedule::ScheduleResolver;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::geo_zone::Coordinates;
use crate::model::work_schedule::WorkSchedule;
use crate::repository::{AttendanceRepository, StoreError};

#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub person_id: u64,
    pub fix: GpsFix,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckOutRequest {
    pub person_id: u64,
    pub fix: GpsFix,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub record: AttendanceRecord,
    pub zone: ZoneMatch,
    pub window: WorkSchedule,
    pub arrival: Arrival,
}

#[derive(Debug, Clone)]
pub struct CheckOutOutcome {
    pub record: AttendanceRecord,
    pub zone: ZoneMatch,
    /// `None` when no schedule covers the day
    pub departure: Option<Departure>,
}

/// (out - in) in hours, two decimals, halves rounded up.
pub fn worked_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Decimal {
    let millis = (check_out - check_in).num_milliseconds();
    (Decimal::from(millis) / Decimal::from(3_600_000))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub struct AttendanceRegistrar {
    geo: GeoValidator,
    schedules: ScheduleResolver,
    punctuality: PunctualityCalculator,
    fix_policy: FixPolicy,
    attendance: Arc<dyn AttendanceRepository>,
    offset: FixedOffset,
}

impl AttendanceRegistrar {
    pub fn new(
        geo: GeoValidator,
        schedules: ScheduleResolver,
        punctuality: PunctualityCalculator,
        fix_policy: FixPolicy,
        attendance: Arc<dyn AttendanceRepository>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            geo,
            schedules,
            punctuality,
            fix_policy,
            attendance,
            offset,
        }
    }

    pub fn geo(&self) -> &GeoValidator {
        &self.geo
    }

    pub fn tolerance_minutes(&self) -> i64 {
        self.punctuality.tolerance_minutes()
    }

    /// Local calendar day an instant belongs to.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        local_datetime(instant, self.offset).date()
    }

    async fn locate(&self, fix: &GpsFix, at: DateTime<Utc>) -> Result<ZoneMatch, ServiceError> {
        self.fix_policy.check(fix, at)?;
        self.geo.require_within(fix.latitude, fix.longitude).await
    }

    #[instrument(name = "check_in", skip(self, request), fields(person_id = request.person_id))]
    pub async fn register_check_in(
        &self,
        request: CheckInRequest,
    ) -> Result<CheckInOutcome, ServiceError> {
        let local = local_datetime(request.timestamp, self.offset);
        let date = local.date();

        if self
            .attendance
            .find_by_person_and_date(request.person_id, date)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateCheckIn { date });
        }

        let zone = self.locate(&request.fix, request.timestamp).await?;

        let window = self
            .schedules
            .expected_window(request.person_id, date)
            .await?
            .ok_or(ServiceError::NonWorkingDay { date })?;

        let arrival = self.punctuality.evaluate_check_in(local, &window);

        let record = AttendanceRecord {
            id: 0,
            person_id: request.person_id,
            date,
            check_in_at: Some(request.timestamp),
            check_out_at: None,
            check_in_location: Some(Coordinates {
                latitude: request.fix.latitude,
                longitude: request.fix.longitude,
            }),
            check_out_location: None,
            check_in_zone_id: Some(zone.zone.id),
            check_out_zone_id: None,
            tardiness_minutes: arrival.late_minutes,
            status: if arrival.is_late {
                AttendanceStatus::Late
            } else {
                AttendanceStatus::Present
            },
            worked_hours: None,
        };

        // the (person_id, date) unique key settles concurrent check-ins
        let record = match self.attendance.insert(record).await {
            Ok(record) => record,
            Err(StoreError::Conflict) => return Err(ServiceError::DuplicateCheckIn { date }),
            Err(e) => return Err(e.into()),
        };

        info!(
            record_id = record.id,
            zone = %zone.zone.name,
            distance = zone.distance_meters.round(),
            late_minutes = arrival.late_minutes,
            status = %record.status,
            "Check-in registered"
        );

        Ok(CheckInOutcome {
            record,
            zone,
            window,
            arrival,
        })
    }

    #[instrument(name = "check_out", skip(self, request), fields(person_id = request.person_id))]
    pub async fn register_check_out(
        &self,
        request: CheckOutRequest,
    ) -> Result<CheckOutOutcome, ServiceError> {
        let local = local_datetime(request.timestamp, self.offset);
        let date = local.date();

        let mut record = self
            .attendance
            .find_by_person_and_date(request.person_id, date)
            .await?
            .ok_or(ServiceError::NoCheckInFound { date })?;

        if let Some(at) = record.check_out_at {
            return Err(ServiceError::AlreadyCheckedOut { at });
        }
        let check_in_at = record
            .check_in_at
            .ok_or(ServiceError::NoCheckInFound { date })?;

        if request.timestamp <= check_in_at {
            return Err(ServiceError::InvalidOrdering);
        }

        let zone = self.locate(&request.fix, request.timestamp).await?;

        let departure = self
            .schedules
            .expected_window(request.person_id, date)
            .await?
            .map(|window| self.punctuality.evaluate_check_out(local, &window));

        record.check_out_at = Some(request.timestamp);
        record.check_out_location = Some(Coordinates {
            latitude: request.fix.latitude,
            longitude: request.fix.longitude,
        });
        record.check_out_zone_id = Some(zone.zone.id);
        record.worked_hours = Some(worked_hours(check_in_at, request.timestamp));

        let record = match self.attendance.record_check_out(&record).await {
            Ok(stored) => stored,
            Err(StoreError::Stale) => {
                // a concurrent check-out won
                let at = self
                    .attendance
                    .find_by_id(record.id)
                    .await?
                    .and_then(|current| current.check_out_at)
                    .unwrap_or(request.timestamp);
                return Err(ServiceError::AlreadyCheckedOut { at });
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            record_id = record.id,
            zone = %zone.zone.name,
            distance = zone.distance_meters.round(),
            worked_hours = ?record.worked_hours,
            early_minutes = departure.map(|d| d.early_minutes),
            "Check-out registered"
        );

        Ok(CheckOutOutcome {
            record,
            zone,
            departure,
        })
    }

    /// The person's record for the local day containing `now`, if any.
    pub async fn today(
        &self,
        person_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<AttendanceRecord>, ServiceError> {
        let date = self.local_date(now);
        Ok(self.attendance.find_by_person_and_date(person_id, date).await?)
    }
}
