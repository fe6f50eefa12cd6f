//! Injectable time source

use chrono::{DateTime, Datelike, TimeZone, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn current_year(&self) -> i32 {
        self.now().year()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant, for reproducible runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC on the given date; `None` for an invalid date
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::at_date(2024, 1, 31).unwrap();
        assert_eq!(clock.current_year(), 2024);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_invalid_date() {
        assert!(FixedClock::at_date(2024, 2, 30).is_none());
    }
}
