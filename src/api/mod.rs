pub mod attendance;
pub mod justification;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::service::error::ServiceError;

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidCoordinates { .. }
            | ServiceError::LowAccuracy { .. }
            | ServiceError::StaleFix { .. }
            | ServiceError::FutureFix
            | ServiceError::MissingReason
            | ServiceError::InvalidDateRange(_)
            | ServiceError::NonWorkingDay { .. }
            | ServiceError::OutsideGeofence { .. } => StatusCode::BAD_REQUEST,

            ServiceError::NotOwner => StatusCode::FORBIDDEN,

            ServiceError::NoCheckInFound { .. }
            | ServiceError::RecordNotFound(_)
            | ServiceError::RequestNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::DuplicateCheckIn { .. }
            | ServiceError::AlreadyCheckedOut { .. }
            | ServiceError::InvalidOrdering
            | ServiceError::DuplicatePending { .. }
            | ServiceError::OverlappingJustification { .. }
            | ServiceError::AlreadyDecided { .. } => StatusCode::CONFLICT,

            ServiceError::NoZonesConfigured => StatusCode::SERVICE_UNAVAILABLE,

            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ServiceError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                json!({ "error": self.kind(), "message": "Internal Server Error" })
            }
            ServiceError::OutsideGeofence {
                zone_id,
                zone_name,
                distance_meters,
                radius_meters,
            } => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "details": {
                    "zone_id": zone_id,
                    "zone_name": zone_name,
                    "distance_meters": distance_meters.round(),
                    "radius_meters": radius_meters.round(),
                    "excess_meters": (distance_meters - radius_meters).round(),
                }
            }),
            _ => json!({ "error": self.kind(), "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use chrono::NaiveDate;

    use super::*;
    use crate::repository::StoreError;

    async fn body_of(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn geofence_rejection_carries_details() {
        let (status, body) = body_of(ServiceError::OutsideGeofence {
            zone_id: 1,
            zone_name: "Campus A".to_string(),
            distance_meters: 200.4,
            radius_meters: 50.0,
        })
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "outside_geofence");
        assert_eq!(body["details"]["distance_meters"], 200.0);
        assert_eq!(body["details"]["excess_meters"], 150.0);
    }

    #[actix_web::test]
    async fn storage_details_are_not_leaked() {
        let (status, body) = body_of(ServiceError::Storage(StoreError::Corrupt {
            table: "attendance_records",
            id: 1,
            reason: "bad".to_string(),
        }))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");
    }

    #[test]
    fn sequencing_errors_are_conflicts() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(
            ServiceError::DuplicateCheckIn { date }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::NoCheckInFound { date }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::NoZonesConfigured.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
