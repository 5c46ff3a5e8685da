use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};

use super::{
    AttendanceRepository, JustificationFilter, JustificationRepository, ScheduleRepository,
    StoreError, ZoneRepository,
};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::geo_zone::{Coordinates, GeoZone};
use crate::model::justification::{
    JustificationCategory, JustificationPriority, JustificationRequest, JustificationStatus,
};
use crate::model::work_schedule::WorkSchedule;

/// Only duplicate keys are conflicts. SQLSTATE 23000 also covers foreign-key
/// and NOT NULL failures, which stay database errors.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn map_write_err(e: sqlx::Error) -> StoreError {
    if is_unique_violation(&e) {
        StoreError::Conflict
    } else {
        StoreError::Database(e)
    }
}

fn parse_column<T: FromStr>(table: &'static str, id: u64, value: &str) -> Result<T, StoreError> {
    value.parse().map_err(|_| StoreError::Corrupt {
        table,
        id,
        reason: format!("unexpected value '{value}'"),
    })
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Option<Coordinates> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

#[derive(FromRow)]
struct GeoZoneRow {
    id: u64,
    name: String,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
    active: bool,
}

impl From<GeoZoneRow> for GeoZone {
    fn from(row: GeoZoneRow) -> Self {
        GeoZone {
            id: row.id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            radius_meters: row.radius_meters,
            active: row.active,
        }
    }
}

#[derive(FromRow)]
struct WorkScheduleRow {
    id: u64,
    person_id: u64,
    weekday: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
    active: bool,
}

impl From<WorkScheduleRow> for WorkSchedule {
    fn from(row: WorkScheduleRow) -> Self {
        WorkSchedule {
            id: row.id,
            person_id: row.person_id,
            weekday: row.weekday,
            start_time: row.start_time,
            end_time: row.end_time,
            active: row.active,
        }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    person_id: u64,
    date: NaiveDate,
    check_in_at: Option<DateTime<Utc>>,
    check_out_at: Option<DateTime<Utc>>,
    check_in_latitude: Option<f64>,
    check_in_longitude: Option<f64>,
    check_out_latitude: Option<f64>,
    check_out_longitude: Option<f64>,
    check_in_zone_id: Option<u64>,
    check_out_zone_id: Option<u64>,
    tardiness_minutes: u32,
    status: String,
    worked_hours: Option<Decimal>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = parse_column::<AttendanceStatus>("attendance_records", row.id, &row.status)?;

        Ok(AttendanceRecord {
            id: row.id,
            person_id: row.person_id,
            date: row.date,
            check_in_at: row.check_in_at,
            check_out_at: row.check_out_at,
            check_in_location: location(row.check_in_latitude, row.check_in_longitude),
            check_out_location: location(row.check_out_latitude, row.check_out_longitude),
            check_in_zone_id: row.check_in_zone_id,
            check_out_zone_id: row.check_out_zone_id,
            tardiness_minutes: row.tardiness_minutes,
            status,
            worked_hours: row.worked_hours,
        })
    }
}

#[derive(FromRow)]
struct JustificationRow {
    id: u64,
    person_id: u64,
    attendance_record_id: Option<u64>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    category: String,
    evidence_reference: Option<String>,
    priority: String,
    status: String,
    reviewer_id: Option<u64>,
    reviewer_comment: Option<String>,
    decision_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JustificationRow> for JustificationRequest {
    type Error = StoreError;

    fn try_from(row: JustificationRow) -> Result<Self, Self::Error> {
        const TABLE: &str = "justification_requests";

        Ok(JustificationRequest {
            id: row.id,
            person_id: row.person_id,
            attendance_record_id: row.attendance_record_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            category: parse_column::<JustificationCategory>(TABLE, row.id, &row.category)?,
            evidence_reference: row.evidence_reference,
            priority: parse_column::<JustificationPriority>(TABLE, row.id, &row.priority)?,
            status: parse_column::<JustificationStatus>(TABLE, row.id, &row.status)?,
            reviewer_id: row.reviewer_id,
            reviewer_comment: row.reviewer_comment,
            decision_at: row.decision_at,
            created_at: row.created_at,
        })
    }
}

const ATTENDANCE_COLUMNS: &str = r#"
    id, person_id, date, check_in_at, check_out_at,
    check_in_latitude, check_in_longitude, check_out_latitude, check_out_longitude,
    check_in_zone_id, check_out_zone_id, tardiness_minutes, status, worked_hours
"#;

const JUSTIFICATION_COLUMNS: &str = r#"
    id, person_id, attendance_record_id, start_date, end_date, reason, category,
    evidence_reference, priority, status, reviewer_id, reviewer_comment, decision_at, created_at
"#;

/// Production store backed by the shared connection pool.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ZoneRepository for MySqlStore {
    async fn list_active(&self) -> Result<Vec<GeoZone>, StoreError> {
        let rows = sqlx::query_as::<_, GeoZoneRow>(
            r#"
            SELECT id, name, latitude, longitude, radius_meters, active
            FROM geo_zones
            WHERE active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GeoZone::from).collect())
    }
}

#[async_trait]
impl ScheduleRepository for MySqlStore {
    async fn find_active(
        &self,
        person_id: u64,
        weekday: u8,
    ) -> Result<Vec<WorkSchedule>, StoreError> {
        let rows = sqlx::query_as::<_, WorkScheduleRow>(
            r#"
            SELECT id, person_id, weekday, start_time, end_time, active
            FROM work_schedules
            WHERE person_id = ?
            AND weekday = ?
            AND active = TRUE
            ORDER BY start_time, id
            "#,
        )
        .bind(person_id)
        .bind(weekday)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WorkSchedule::from).collect())
    }
}

#[async_trait]
impl AttendanceRepository for MySqlStore {
    async fn find_by_person_and_date(
        &self,
        person_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE person_id = ? AND date = ?"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(person_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE id = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn insert(&self, mut record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance_records
                (person_id, date, check_in_at, check_in_latitude, check_in_longitude,
                 check_in_zone_id, tardiness_minutes, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.person_id)
        .bind(record.date)
        .bind(record.check_in_at)
        .bind(record.check_in_location.map(|c| c.latitude))
        .bind(record.check_in_location.map(|c| c.longitude))
        .bind(record.check_in_zone_id)
        .bind(record.tardiness_minutes)
        .bind(record.status.as_ref())
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        record.id = result.last_insert_id();
        Ok(record)
    }

    async fn record_check_out(
        &self,
        record: &AttendanceRecord,
    ) -> Result<AttendanceRecord, StoreError> {
        // status is not written: an approval may have justified the row since it was read
        let result = sqlx::query(
            r#"
            UPDATE attendance_records
            SET check_out_at = ?,
                check_out_latitude = ?,
                check_out_longitude = ?,
                check_out_zone_id = ?,
                worked_hours = ?
            WHERE id = ?
            AND check_out_at IS NULL
            "#,
        )
        .bind(record.check_out_at)
        .bind(record.check_out_location.map(|c| c.latitude))
        .bind(record.check_out_location.map(|c| c.longitude))
        .bind(record.check_out_zone_id)
        .bind(record.worked_hours)
        .bind(record.id)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        // a concurrent check-out got there first
        if result.rows_affected() == 0 {
            return Err(StoreError::Stale);
        }

        AttendanceRepository::find_by_id(self, record.id)
            .await?
            .ok_or(StoreError::Missing {
                table: "attendance_records",
                id: record.id,
            })
    }
}

// Helper enum for typed binding of dynamic filters
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[async_trait]
impl JustificationRepository for MySqlStore {
    async fn find_by_id(&self, id: u64) -> Result<Option<JustificationRequest>, StoreError> {
        let sql = format!("SELECT {JUSTIFICATION_COLUMNS} FROM justification_requests WHERE id = ?");
        sqlx::query_as::<_, JustificationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(JustificationRequest::try_from)
            .transpose()
    }

    async fn find_pending_by_record(
        &self,
        record_id: u64,
    ) -> Result<Option<JustificationRequest>, StoreError> {
        let sql = format!(
            "SELECT {JUSTIFICATION_COLUMNS} FROM justification_requests \
             WHERE attendance_record_id = ? AND status = 'pending'"
        );
        sqlx::query_as::<_, JustificationRow>(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?
            .map(JustificationRequest::try_from)
            .transpose()
    }

    async fn find_active_overlapping(
        &self,
        person_id: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<JustificationRequest>, StoreError> {
        let sql = format!(
            "SELECT {JUSTIFICATION_COLUMNS} FROM justification_requests \
             WHERE person_id = ? AND status IN ('pending', 'approved') \
             AND start_date <= ? AND end_date >= ? \
             ORDER BY id"
        );
        sqlx::query_as::<_, JustificationRow>(&sql)
            .bind(person_id)
            .bind(end)
            .bind(start)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(JustificationRequest::try_from)
            .collect()
    }

    async fn list_for_person(
        &self,
        person_id: u64,
        filter: &JustificationFilter,
    ) -> Result<(Vec<JustificationRequest>, u64), StoreError> {
        let per_page = filter.per_page.max(1);
        let offset = (filter.page.max(1) - 1) * per_page;

        let mut where_sql = String::from(" WHERE person_id = ?");
        let mut args = vec![FilterValue::U64(person_id)];

        if let Some(status) = filter.status.as_ref() {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.as_ref()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM justification_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "SELECT {JUSTIFICATION_COLUMNS} FROM justification_requests{where_sql} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, JustificationRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let rows = data_q
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let data = rows
            .into_iter()
            .map(JustificationRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((data, u64::try_from(total).unwrap_or_default()))
    }

    async fn insert(
        &self,
        mut request: JustificationRequest,
    ) -> Result<JustificationRequest, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO justification_requests
                (person_id, attendance_record_id, start_date, end_date, reason, category,
                 evidence_reference, priority, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.person_id)
        .bind(request.attendance_record_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.reason)
        .bind(request.category.as_ref())
        .bind(&request.evidence_reference)
        .bind(request.priority.as_ref())
        .bind(request.status.as_ref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        request.id = result.last_insert_id();
        Ok(request)
    }

    async fn apply_decision(
        &self,
        request: &JustificationRequest,
        justify_record: Option<u64>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let decided = sqlx::query(
            r#"
            UPDATE justification_requests
            SET status = ?,
                reviewer_id = ?,
                reviewer_comment = ?,
                decision_at = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(request.status.as_ref())
        .bind(request.reviewer_id)
        .bind(&request.reviewer_comment)
        .bind(request.decision_at)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        // dropping the transaction rolls it back
        if decided.rows_affected() == 0 {
            return Err(StoreError::Stale);
        }

        if let Some(record_id) = justify_record {
            let updated = sqlx::query(
                r#"
                UPDATE attendance_records
                SET status = ?
                WHERE id = ?
                "#,
            )
            .bind(AttendanceStatus::Justified.as_ref())
            .bind(record_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                // MySQL does not count rows whose value did not change
                let exists = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM attendance_records WHERE id = ?",
                )
                .bind(record_id)
                .fetch_one(&mut *tx)
                .await?;
                if exists == 0 {
                    return Err(StoreError::Missing {
                        table: "attendance_records",
                        id: record_id,
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_pending(&self, request: &JustificationRequest) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE justification_requests
            SET category = ?,
                priority = ?,
                reason = ?,
                evidence_reference = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(request.category.as_ref())
        .bind(request.priority.as_ref())
        .bind(&request.reason)
        .bind(&request.evidence_reference)
        .bind(request.id)
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        if result.rows_affected() == 0 {
            // MySQL does not count rows whose values did not change
            let pending = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM justification_requests WHERE id = ? AND status = 'pending'",
            )
            .bind(request.id)
            .fetch_one(&self.pool)
            .await?;
            if pending == 0 {
                return Err(StoreError::Stale);
            }
        }
        Ok(())
    }

    async fn delete_pending(&self, id: u64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM justification_requests
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Stale);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// Integrity error as the MySQL driver reports it: SQLSTATE 23000 plus a kind.
    #[derive(Debug, thiserror::Error)]
    #[error("integrity constraint violation")]
    struct IntegrityError(ErrorKind);

    impl DatabaseError for IntegrityError {
        fn message(&self) -> &str {
            "integrity constraint violation"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                ErrorKind::NotNullViolation => ErrorKind::NotNullViolation,
                ErrorKind::CheckViolation => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn integrity(kind: ErrorKind) -> sqlx::Error {
        sqlx::Error::Database(Box::new(IntegrityError(kind)))
    }

    #[test]
    fn only_duplicate_keys_are_conflicts() {
        assert!(matches!(
            map_write_err(integrity(ErrorKind::UniqueViolation)),
            StoreError::Conflict
        ));
        // e.g. a zone deleted while still cached
        assert!(matches!(
            map_write_err(integrity(ErrorKind::ForeignKeyViolation)),
            StoreError::Database(_)
        ));
        assert!(matches!(
            map_write_err(integrity(ErrorKind::NotNullViolation)),
            StoreError::Database(_)
        ));
        assert!(matches!(map_write_err(sqlx::Error::RowNotFound), StoreError::Database(_)));
    }

    #[test]
    fn corrupt_status_names_the_row() {
        let err = parse_column::<AttendanceStatus>("attendance_records", 42, "absent").unwrap_err();
        assert_eq!(
            err.to_string(),
            "row attendance_records#42 could not be decoded: unexpected value 'absent'"
        );
    }

    #[test]
    fn stored_status_strings_round_trip() {
        for status in [
            JustificationStatus::Pending,
            JustificationStatus::Approved,
            JustificationStatus::Rejected,
        ] {
            let parsed = parse_column::<JustificationStatus>("t", 1, status.as_ref()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn partial_location_is_dropped() {
        assert_eq!(location(Some(1.0), None), None);
        assert_eq!(
            location(Some(1.0), Some(2.0)),
            Some(Coordinates { latitude: 1.0, longitude: 2.0 })
        );
    }
}
