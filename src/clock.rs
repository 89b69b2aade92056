//! Time sources.
//!
//! Everything that reads the current time (plant date derivation, token
//! issuance, the overdue sweep) goes through [`Clock`] so that tests can pin
//! or advance time instead of sleeping.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};

/// A source of "now" and of the current calendar day's start.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The instant the current calendar day began.
    fn start_of_day(&self) -> DateTime<Utc>;
}

/// Wall-clock time; days begin at local midnight.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn start_of_day(&self) -> DateTime<Utc> {
        let today = Local::now().date_naive();
        let midnight = today.and_time(NaiveTime::MIN);
        match midnight.and_local_timezone(Local).earliest() {
            Some(local) => local.with_timezone(&Utc),
            // Midnight skipped by a DST transition.
            None => Utc.from_utc_datetime(&midnight),
        }
    }
}

/// A manually driven clock; days begin at UTC midnight.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn start_of_day(&self) -> DateTime<Utc> {
        let now = self.now();
        Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
    }
}
