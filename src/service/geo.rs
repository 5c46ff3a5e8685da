use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ServiceError;
use crate::model::geo_zone::{Coordinates, GeoZone};
use crate::repository::ZoneRepository;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Device clocks may run slightly ahead of the server.
const FUTURE_FIX_SLACK_SECS: i64 = 60;

/// Great-circle distance in meters (Haversine).
pub fn haversine_distance(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let d_phi = (to.latitude - from.latitude).to_radians();
    let d_lambda = (to.longitude - from.longitude).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMatch {
    pub zone: GeoZone,
    pub distance_meters: f64,
    pub within_radius: bool,
}

/// Nearest active zone to `point`; equal distances resolve to the lowest zone id.
pub fn nearest_zone(zones: &[GeoZone], point: Coordinates) -> Result<ZoneMatch, ServiceError> {
    zones
        .iter()
        .filter(|zone| zone.active)
        .map(|zone| (zone, haversine_distance(point, zone.center())))
        .min_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)))
        .map(|(zone, distance_meters)| ZoneMatch {
            zone: zone.clone(),
            distance_meters,
            within_radius: distance_meters <= zone.radius_meters,
        })
        .ok_or(ServiceError::NoZonesConfigured)
}

/// A position report as sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GpsFix {
    #[schema(example = -12.0461)]
    pub latitude: f64,

    #[schema(example = -77.0428)]
    pub longitude: f64,

    /// Reported horizontal accuracy (meters)
    #[schema(example = 12.5)]
    pub accuracy_meters: Option<f64>,

    /// When the device took the fix
    #[schema(format = "date-time", value_type = Option<String>)]
    pub captured_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl GpsFix {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters: None,
            captured_at: None,
        }
    }
}

/// Minimum quality a fix must have before it is matched against zones.
#[derive(Debug, Clone, Copy)]
pub struct FixPolicy {
    pub max_accuracy_meters: f64,
    pub max_age: Duration,
}

impl Default for FixPolicy {
    fn default() -> Self {
        Self {
            max_accuracy_meters: 100.0,
            max_age: Duration::minutes(5),
        }
    }
}

impl FixPolicy {
    pub fn check(&self, fix: &GpsFix, attempted_at: DateTime<Utc>) -> Result<(), ServiceError> {
        if let Some(accuracy) = fix.accuracy_meters {
            if accuracy > self.max_accuracy_meters {
                return Err(ServiceError::LowAccuracy {
                    accuracy_meters: accuracy,
                    max_meters: self.max_accuracy_meters,
                });
            }
        }

        if let Some(captured_at) = fix.captured_at {
            let age = attempted_at - captured_at;
            if age > self.max_age {
                return Err(ServiceError::StaleFix {
                    age_minutes: age.num_minutes(),
                });
            }
            if age < -Duration::seconds(FUTURE_FIX_SLACK_SECS) {
                return Err(ServiceError::FutureFix);
            }
        }

        Ok(())
    }
}

pub struct GeoValidator {
    zones: Arc<dyn ZoneRepository>,
}

impl GeoValidator {
    pub fn new(zones: Arc<dyn ZoneRepository>) -> Self {
        Self { zones }
    }

    pub async fn nearest(&self, latitude: f64, longitude: f64) -> Result<ZoneMatch, ServiceError> {
        let point = Coordinates::new(latitude, longitude)?;
        let zones = self.zones.list_active().await?;
        nearest_zone(&zones, point)
    }

    /// Like [`nearest`](Self::nearest) but refuses points outside the nearest zone.
    pub async fn require_within(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ZoneMatch, ServiceError> {
        let found = self.nearest(latitude, longitude).await?;
        if !found.within_radius {
            tracing::warn!(
                zone = %found.zone.name,
                distance = found.distance_meters.round(),
                radius = found.zone.radius_meters,
                "Position outside geofence"
            );
            return Err(ServiceError::OutsideGeofence {
                zone_id: found.zone.id,
                zone_name: found.zone.name,
                distance_meters: found.distance_meters,
                radius_meters: found.zone.radius_meters,
            });
        }
        Ok(found)
    }
}

#[cfg(test)]
pub mod fixtures {
    use crate::model::geo_zone::GeoZone;

    /// Meters per degree of latitude on the Haversine sphere.
    pub const METERS_PER_DEGREE: f64 = super::EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    pub const CAMPUS_A: (f64, f64) = (-12.0464, -77.0428);

    pub fn zone(id: u64, name: &str, (latitude, longitude): (f64, f64), radius: f64) -> GeoZone {
        GeoZone {
            id,
            name: name.to_string(),
            latitude,
            longitude,
            radius_meters: radius,
            active: true,
        }
    }

    pub fn campus_a() -> GeoZone {
        zone(1, "Campus A", CAMPUS_A, 50.0)
    }

    /// A point `meters` due north of `origin`.
    pub fn north_of((latitude, longitude): (f64, f64), meters: f64) -> (f64, f64) {
        (latitude + meters / METERS_PER_DEGREE, longitude)
    }
}
