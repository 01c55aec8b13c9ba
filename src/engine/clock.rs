//! Clock abstraction. The engine keys everything on the caller's local
//! calendar day, so "now" is injected rather than read ambiently; tests pin
//! it, production uses the system clock.

use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};

pub trait Clock: Send + Sync {
    /// Local wall-clock time; its date is the day key for quests and history.
    fn now_local(&self) -> NaiveDateTime;

    /// Instant used for completion timestamps.
    fn now_utc(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now_local().date()
    }

    fn hour(&self) -> u32 {
        self.now_local().hour()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for tests: pin a date and hour, then move them to walk
/// the engine across day boundaries.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(date: NaiveDate, hour: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        FixedClock {
            now: Mutex::new(NaiveDateTime::new(date, time)),
        }
    }

    pub fn set_date(&self, date: NaiveDate) {
        let mut now = self.lock();
        *now = NaiveDateTime::new(date, now.time());
    }

    pub fn set_hour(&self, hour: u32) {
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let mut now = self.lock();
        *now = NaiveDateTime::new(now.date(), time);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        *self.lock()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.now_local())
    }
}
