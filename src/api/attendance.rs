use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendancePhase, AttendanceRecord};
use crate::service::clock::Clock;
use crate::service::geo::{GpsFix, ZoneMatch};
use crate::service::registrar::{AttendanceRegistrar, CheckInRequest, CheckOutRequest};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ZoneSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Campus A")]
    pub name: String,
    /// Distance from the zone centre, rounded to the metre
    #[schema(example = 30.0)]
    pub distance_meters: f64,
    #[schema(example = 50.0)]
    pub radius_meters: f64,
    pub within_radius: bool,
}

impl From<&ZoneMatch> for ZoneSummary {
    fn from(found: &ZoneMatch) -> Self {
        Self {
            id: found.zone.id,
            name: found.zone.name.clone(),
            distance_meters: found.distance_meters.round(),
            radius_meters: found.zone.radius_meters,
            within_radius: found.within_radius,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub record: AttendanceRecord,
    pub zone: ZoneSummary,
    #[schema(example = "08:00:00", value_type = String)]
    pub scheduled_start: NaiveTime,
    #[schema(example = 15)]
    pub tolerance_minutes: i64,
    #[schema(example = 5)]
    pub late_minutes: u32,
    pub is_late: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CheckOutResponse {
    #[schema(example = "Checked out successfully")]
    pub message: String,
    pub record: AttendanceRecord,
    pub zone: ZoneSummary,
    /// Minutes before the scheduled end; absent on unscheduled days
    #[schema(example = 0)]
    pub early_minutes: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct TodayResponse {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Absent until the first check-in of the day
    pub phase: Option<AttendancePhase>,
    pub record: Option<AttendanceRecord>,
}

#[derive(Deserialize, ToSchema)]
pub struct LocationPayload {
    #[schema(example = -12.0461)]
    pub latitude: f64,
    #[schema(example = -77.0428)]
    pub longitude: f64,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(
        content = GpsFix,
        description = "Current device position",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Checked in successfully", body = CheckInResponse),
        (status = 400, description = "Invalid position, outside the geofence or no schedule today", body = Object, example = json!({
            "error": "outside_geofence",
            "message": "outside the permitted area: 200m from Campus A, allowed radius 50m",
            "details": {
                "zone_id": 1,
                "zone_name": "Campus A",
                "distance_meters": 200.0,
                "radius_meters": 50.0,
                "excess_meters": 150.0
            }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "error": "duplicate_check_in",
            "message": "already checked in on 2026-03-02"
        })),
        (status = 503, description = "No permitted locations configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    registrar: web::Data<AttendanceRegistrar>,
    clock: web::Data<dyn Clock>,
    payload: web::Json<GpsFix>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;

    let outcome = registrar
        .register_check_in(CheckInRequest {
            person_id,
            fix: payload.into_inner(),
            timestamp: clock.now(),
        })
        .await?;

    Ok(HttpResponse::Created().json(CheckInResponse {
        message: "Checked in successfully".to_string(),
        zone: ZoneSummary::from(&outcome.zone),
        scheduled_start: outcome.window.start_time,
        tolerance_minutes: registrar.tolerance_minutes(),
        late_minutes: outcome.arrival.late_minutes,
        is_late: outcome.arrival.is_late,
        record: outcome.record,
    }))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body(
        content = GpsFix,
        description = "Current device position",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Checked out successfully", body = CheckOutResponse),
        (status = 400, description = "Invalid position or outside the geofence"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile"),
        (status = 404, description = "No check-in found for today", body = Object, example = json!({
            "error": "no_check_in_found",
            "message": "no check-in found for 2026-03-02, check in first"
        })),
        (status = 409, description = "Already checked out"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    registrar: web::Data<AttendanceRegistrar>,
    clock: web::Data<dyn Clock>,
    payload: web::Json<GpsFix>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;

    let outcome = registrar
        .register_check_out(CheckOutRequest {
            person_id,
            fix: payload.into_inner(),
            timestamp: clock.now(),
        })
        .await?;

    Ok(HttpResponse::Ok().json(CheckOutResponse {
        message: "Checked out successfully".to_string(),
        zone: ZoneSummary::from(&outcome.zone),
        early_minutes: outcome.departure.map(|d| d.early_minutes),
        record: outcome.record,
    }))
}

/// Today's attendance of the caller
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's record, if any", body = TodayResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No staff profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    registrar: web::Data<AttendanceRegistrar>,
    clock: web::Data<dyn Clock>,
) -> actix_web::Result<impl Responder> {
    let person_id = auth.person_id()?;
    let now = clock.now();

    let record = registrar.today(person_id, now).await?;

    Ok(HttpResponse::Ok().json(TodayResponse {
        date: registrar.local_date(now),
        phase: record.as_ref().map(AttendanceRecord::phase),
        record,
    }))
}

/// Nearest permitted location to a position, without registering anything
#[utoipa::path(
    post,
    path = "/api/attendance/nearest-zone",
    request_body = LocationPayload,
    responses(
        (status = 200, description = "Nearest zone and whether the position is inside it", body = ZoneSummary),
        (status = 400, description = "Invalid coordinates"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "No permitted locations configured")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn nearest_zone(
    _auth: AuthUser,
    registrar: web::Data<AttendanceRegistrar>,
    payload: web::Json<LocationPayload>,
) -> actix_web::Result<impl Responder> {
    let found = registrar
        .geo()
        .nearest(payload.latitude, payload.longitude)
        .await?;

    Ok(HttpResponse::Ok().json(ZoneSummary::from(&found)))
}
