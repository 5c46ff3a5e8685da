use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::service::error::ServiceError;

/// A circular permitted area staff may check in from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Campus A",
    "latitude": -12.0464,
    "longitude": -77.0428,
    "radius_meters": 50.0,
    "active": true
}))]
pub struct GeoZone {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Campus A")]
    pub name: String,

    #[schema(example = -12.0464)]
    pub latitude: f64,

    #[schema(example = -77.0428)]
    pub longitude: f64,

    /// Always > 0
    #[schema(example = 50.0)]
    pub radius_meters: f64,

    pub active: bool,
}

impl GeoZone {
    pub fn center(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = -12.0464)]
    pub latitude: f64,
    #[schema(example = -77.0428)]
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ServiceError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);

        if !lat_ok || !lng_ok {
            return Err(ServiceError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }
}
