use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;

use crate::service::justification::DEFAULT_MAX_SPAN_DAYS;
use crate::service::punctuality::DEFAULT_TOLERANCE_MINUTES;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    // Attendance rules
    pub late_tolerance_minutes: u32,
    pub utc_offset_minutes: i32,
    pub gps_max_accuracy_meters: f64,
    pub gps_max_fix_age_secs: i64,
    pub zone_cache_ttl_secs: u64,
    pub justification_max_days: i64,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", 1000)?,

            late_tolerance_minutes: env_or("LATE_TOLERANCE_MINUTES", DEFAULT_TOLERANCE_MINUTES)?,
            utc_offset_minutes: env_or("ATTENDANCE_UTC_OFFSET_MINUTES", -300)?, // Lima
            gps_max_accuracy_meters: env_or("GPS_MAX_ACCURACY_METERS", 100.0)?,
            gps_max_fix_age_secs: env_or("GPS_MAX_FIX_AGE_SECS", 300)?,
            zone_cache_ttl_secs: env_or("ZONE_CACHE_TTL_SECS", 60)?,
            justification_max_days: env_or("JUSTIFICATION_MAX_DAYS", DEFAULT_MAX_SPAN_DAYS)?,
        };

        config.utc_offset()?;
        Ok(config)
    }

    /// Offset that decides which calendar day a check-in belongs to.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            anyhow!(
                "ATTENDANCE_UTC_OFFSET_MINUTES out of range: {}",
                self.utc_offset_minutes
            )
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::config;

    #[test]
    fn default_offset_is_lima() {
        let offset = config().utc_offset().unwrap();
        assert_eq!(offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn out_of_range_offset_is_an_error() {
        let mut config = config();
        config.utc_offset_minutes = 24 * 60;
        assert!(config.utc_offset().is_err());
    }
}
