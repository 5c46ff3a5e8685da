use crate::api::attendance::{
    CheckInResponse, CheckOutResponse, LocationPayload, TodayResponse, ZoneSummary,
};
use crate::api::justification::{
    CreateJustification, DecisionPayload, JustificationListResponse, JustificationQuery,
    UpdateJustification,
};
use crate::model::attendance::{AttendancePhase, AttendanceRecord, AttendanceStatus};
use crate::model::geo_zone::Coordinates;
use crate::model::justification::{
    JustificationCategory, JustificationPriority, JustificationRequest, JustificationStatus,
};
use crate::service::geo::GpsFix;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo Attendance API",
        version = "1.0.0",
        description = r#"
## GPS-geofenced attendance

Staff check in and out from their devices. Each position is matched against the
configured **permitted locations** and the day's **work schedule**.

### 🔹 Key Features
- **Attendance**
  - Check-in/check-out only inside a permitted location
  - Tardiness against the scheduled start plus a tolerance window
  - Worked hours on check-out
- **Justifications**
  - Staff explain a late arrival or an absence
  - HR/Admin approve or reject; approval marks the record `justified`

### 🔐 Security
Every endpoint requires a **JWT Bearer** access token.
Only **Admin** or **HR** can decide justifications.

### 📦 Errors
`{"error": "<kind>", "message": "..."}` with a stable snake_case `kind`.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::nearest_zone,

        crate::api::justification::submit_justification,
        crate::api::justification::list_justifications,
        crate::api::justification::get_justification,
        crate::api::justification::update_justification,
        crate::api::justification::withdraw_justification,
        crate::api::justification::approve_justification,
        crate::api::justification::reject_justification
    ),
    components(
        schemas(
            GpsFix,
            Coordinates,
            LocationPayload,
            ZoneSummary,
            AttendanceRecord,
            AttendanceStatus,
            AttendancePhase,
            CheckInResponse,
            CheckOutResponse,
            TodayResponse,
            CreateJustification,
            UpdateJustification,
            DecisionPayload,
            JustificationQuery,
            JustificationRequest,
            JustificationListResponse,
            JustificationCategory,
            JustificationPriority,
            JustificationStatus
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Geofenced check-in and check-out"),
        (name = "Justification", description = "Tardiness and absence justifications"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented_with_bearer_auth() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/attendance/check-in",
            "/api/attendance/check-out",
            "/api/attendance/today",
            "/api/attendance/nearest-zone",
            "/api/justifications",
            "/api/justifications/{id}",
            "/api/justifications/{id}/approve",
            "/api/justifications/{id}/reject",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }

        let item = &doc.paths.paths["/api/justifications/{id}"];
        assert!(item.operations.contains_key(&utoipa::openapi::PathItemType::Put));

        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
