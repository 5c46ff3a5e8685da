use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock time at the deployment's fixed UTC offset.
pub fn local_datetime(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDateTime {
    instant.with_timezone(&offset).naive_local()
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

    use super::Clock;

    /// Lima, the default deployment offset.
    pub fn lima() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    /// UTC instant for a Lima wall-clock time.
    pub fn lima_time(date: NaiveDate, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        lima()
            .from_local_datetime(&date.and_hms_opt(hour, minute, second).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    }

    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn at(instant: DateTime<Utc>) -> Self {
            Self(Mutex::new(instant))
        }

        pub fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::testing::{lima, lima_time};
    use super::*;

    #[test]
    fn late_evening_utc_is_still_the_same_local_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        // 21:30 in Lima is 02:30 UTC on the next day
        let instant = lima_time(date, 21, 30, 0);
        assert_eq!(instant.date_naive(), date.succ_opt().unwrap());

        let local = local_datetime(instant, lima());
        assert_eq!(local.date(), date);
        assert_eq!(local.hour(), 21);
    }
}
