//! In-process store with the same uniqueness and atomicity rules as the
//! MySQL schema. Test-only.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    AttendanceRepository, JustificationFilter, JustificationRepository, ScheduleRepository,
    StoreError, ZoneRepository,
};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::geo_zone::GeoZone;
use crate::model::justification::{JustificationRequest, JustificationStatus};
use crate::model::work_schedule::WorkSchedule;

#[derive(Default)]
struct Tables {
    zones: Vec<GeoZone>,
    schedules: Vec<WorkSchedule>,
    attendance: BTreeMap<u64, AttendanceRecord>,
    justifications: BTreeMap<u64, JustificationRequest>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    zone_reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(self, zone: GeoZone) -> Self {
        self.tables.lock().unwrap().zones.push(zone);
        self
    }

    pub fn with_schedule(self, schedule: WorkSchedule) -> Self {
        self.tables.lock().unwrap().schedules.push(schedule);
        self
    }

    pub fn zone_reads(&self) -> usize {
        self.zone_reads.load(Ordering::SeqCst)
    }

    pub fn attendance_rows(&self) -> Vec<AttendanceRecord> {
        self.tables.lock().unwrap().attendance.values().cloned().collect()
    }

    pub fn remove_attendance(&self, id: u64) {
        self.tables.lock().unwrap().attendance.remove(&id);
    }

    pub fn justification(&self, id: u64) -> Option<JustificationRequest> {
        self.tables.lock().unwrap().justifications.get(&id).cloned()
    }
}

#[async_trait]
impl ZoneRepository for MemoryStore {
    async fn list_active(&self) -> Result<Vec<GeoZone>, StoreError> {
        self.zone_reads.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        Ok(tables.zones.iter().filter(|z| z.active).cloned().collect())
    }
}

#[async_trait]
impl ScheduleRepository for MemoryStore {
    async fn find_active(
        &self,
        person_id: u64,
        weekday: u8,
    ) -> Result<Vec<WorkSchedule>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .schedules
            .iter()
            .filter(|s| s.active && s.person_id == person_id && s.weekday == weekday)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn find_by_person_and_date(
        &self,
        person_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attendance
            .values()
            .find(|r| r.person_id == person_id && r.date == date)
            .cloned())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.tables.lock().unwrap().attendance.get(&id).cloned())
    }

    async fn insert(&self, mut record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let taken = tables
            .attendance
            .values()
            .any(|r| r.person_id == record.person_id && r.date == record.date);
        if taken {
            return Err(StoreError::Conflict);
        }

        record.id = tables.next_id();
        tables.attendance.insert(record.id, record.clone());
        Ok(record)
    }

    async fn record_check_out(
        &self,
        record: &AttendanceRecord,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.attendance.get_mut(&record.id) {
            Some(row) if row.check_out_at.is_none() => {
                row.check_out_at = record.check_out_at;
                row.check_out_location = record.check_out_location;
                row.check_out_zone_id = record.check_out_zone_id;
                row.worked_hours = record.worked_hours;
                Ok(row.clone())
            }
            _ => Err(StoreError::Stale),
        }
    }
}

#[async_trait]
impl JustificationRepository for MemoryStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<JustificationRequest>, StoreError> {
        Ok(self.justification(id))
    }

    async fn find_pending_by_record(
        &self,
        record_id: u64,
    ) -> Result<Option<JustificationRequest>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .justifications
            .values()
            .find(|j| j.is_pending() && j.attendance_record_id == Some(record_id))
            .cloned())
    }

    async fn find_active_overlapping(
        &self,
        person_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<JustificationRequest>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .justifications
            .values()
            .filter(|j| j.person_id == person_id && j.status != JustificationStatus::Rejected)
            .filter(|j| j.overlaps(start, end))
            .cloned()
            .collect())
    }

    async fn list_for_person(
        &self,
        person_id: u64,
        filter: &JustificationFilter,
    ) -> Result<(Vec<JustificationRequest>, u64), StoreError> {
        let tables = self.tables.lock().unwrap();
        let matching: Vec<_> = tables
            .justifications
            .values()
            .rev()
            .filter(|j| j.person_id == person_id)
            .filter(|j| filter.status.is_none_or(|s| j.status == s))
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let offset = ((filter.page.max(1) - 1) * filter.per_page) as usize;
        let page = matching
            .into_iter()
            .skip(offset)
            .take(filter.per_page as usize)
            .collect();
        Ok((page, total))
    }

    async fn insert(
        &self,
        mut request: JustificationRequest,
    ) -> Result<JustificationRequest, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(record_id) = request.attendance_record_id {
            let pending_exists = tables
                .justifications
                .values()
                .any(|j| j.is_pending() && j.attendance_record_id == Some(record_id));
            if request.is_pending() && pending_exists {
                return Err(StoreError::Conflict);
            }
        }

        request.id = tables.next_id();
        tables.justifications.insert(request.id, request.clone());
        Ok(request)
    }

    async fn apply_decision(
        &self,
        request: &JustificationRequest,
        justify_record: Option<u64>,
    ) -> Result<(), StoreError> {
        // one lock for both tables: the decision and the record change are atomic
        let mut tables = self.tables.lock().unwrap();

        let still_pending = tables
            .justifications
            .get(&request.id)
            .is_some_and(|j| j.is_pending());
        if !still_pending {
            return Err(StoreError::Stale);
        }
        if let Some(record_id) = justify_record {
            if !tables.attendance.contains_key(&record_id) {
                return Err(StoreError::Missing {
                    table: "attendance_records",
                    id: record_id,
                });
            }
        }

        tables.justifications.insert(request.id, request.clone());
        if let Some(record) = justify_record.and_then(|id| tables.attendance.get_mut(&id)) {
            record.status = AttendanceStatus::Justified;
        }
        Ok(())
    }

    async fn update_pending(&self, request: &JustificationRequest) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.justifications.get_mut(&request.id) {
            Some(row) if row.is_pending() => {
                row.category = request.category;
                row.priority = request.priority;
                row.reason = request.reason.clone();
                row.evidence_reference = request.evidence_reference.clone();
                Ok(())
            }
            _ => Err(StoreError::Stale),
        }
    }

    async fn delete_pending(&self, id: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.justifications.get(&id) {
            Some(j) if j.is_pending() => {
                tables.justifications.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::Stale),
        }
    }
}
