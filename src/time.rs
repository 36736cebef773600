//! Simulated time: the current instant, its rate, and the host clock.
//!
//! Instants are Julian Day numbers. Rates are days of simulated time per
//! second of real time, so `JD_SECOND` means "real time".

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use log::{debug, warn};

use crate::body::Body;

// ---------- Constants ----------
pub const JD_DAY: f64 = 1.0;
pub const JD_HOUR: f64 = JD_DAY / 24.0;
pub const JD_MINUTE: f64 = JD_DAY / 1440.0;
pub const JD_SECOND: f64 = JD_DAY / 86400.0;

pub const J2000_JD: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Earliest supported instant (about -100000 years).
pub const MIN_INSTANT: f64 = -34_803_211.500_012;
/// Latest supported instant (about +100000 years).
pub const MAX_INSTANT: f64 = 38_245_309.499_988;

/// Saturate an instant to the supported range.
pub fn clamp_instant(jd: f64) -> f64 {
    jd.clamp(MIN_INSTANT, MAX_INSTANT)
}

pub fn datetime_to_jd<Tz: TimeZone>(dt: &DateTime<Tz>) -> f64 {
    dt.timestamp_millis() as f64 / MS_PER_DAY + UNIX_EPOCH_JD
}

/// Julian Day of a naive date-time, reading its fields as if they were UTC.
pub fn naive_to_jd(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_millis() as f64 / MS_PER_DAY + UNIX_EPOCH_JD
}

pub fn jd_to_datetime(jd: f64) -> Option<DateTime<Utc>> {
    let ms = ((jd - UNIX_EPOCH_JD) * MS_PER_DAY).round();
    if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
}

/// Parse `"HH:MM:SS"` or `"HH:MM"`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Parse a calendar date-time (no zone) into a Julian Day.
pub fn parse_calendar_jd(s: &str) -> Option<f64> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive_to_jd(&dt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| naive_to_jd(&d.and_time(NaiveTime::MIN)))
}

// ---------- Host clock ----------

/// Source of real-world time.
pub trait Clock {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current civil time in the host's zone.
    fn now_local(&self) -> DateTime<FixedOffset>;

    /// Host UTC offset, in hours, in effect at the given instant.
    fn utc_offset_hours(&self, jd: f64) -> f64;

    fn now_jd(&self) -> f64 {
        datetime_to_jd(&self.now_utc())
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_utc(&self) -> DateTime<Utc> {
        (**self).now_utc()
    }
    fn now_local(&self) -> DateTime<FixedOffset> {
        (**self).now_local()
    }
    fn utc_offset_hours(&self, jd: f64) -> f64 {
        (**self).utc_offset_hours(jd)
    }
}

/// The operating system clock and time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    fn utc_offset_hours(&self, jd: f64) -> f64 {
        let offset = match jd_to_datetime(jd) {
            Some(utc) => Local.offset_from_utc_datetime(&utc.naive_utc()).fix(),
            None => Local::now().offset().fix(),
        };
        offset.local_minus_utc() as f64 / 3600.0
    }
}

/// A clock that only moves when told to. Useful for replay and tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now: Cell::new(now), offset }
    }

    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance_seconds(&self, seconds: f64) {
        let step = chrono::Duration::milliseconds((seconds * 1000.0).round() as i64);
        self.now.set(self.now.get() + step);
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        self.now.get().with_timezone(&self.offset)
    }

    fn utc_offset_hours(&self, _jd: f64) -> f64 {
        self.offset.local_minus_utc() as f64 / 3600.0
    }
}

// ---------- Speed ladder ----------

fn step_up(rate: f64, factor: f64) -> f64 {
    if rate >= JD_SECOND {
        rate * factor
    } else if rate < -JD_SECOND {
        rate / factor
    } else if rate >= 0.0 {
        JD_SECOND
    } else {
        0.0
    }
}

fn step_down(rate: f64, factor: f64) -> f64 {
    if rate > JD_SECOND {
        rate / factor
    } else if rate <= -JD_SECOND {
        rate * factor
    } else if rate <= 0.0 {
        -JD_SECOND
    } else {
        0.0
    }
}

// ---------- Time model ----------

#[derive(Debug, Clone, Copy)]
struct NowCheck {
    instant: f64,
    is_now: bool,
}

/// Current simulated instant, its rate, and conversions to host time.
pub struct TimeModel {
    instant: f64,
    rate: f64,
    clock: Box<dyn Clock>,
    // Last "is it now?" answer and the instant it was computed for.
    now_check: Cell<Option<NowCheck>>,
}

impl fmt::Debug for TimeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeModel")
            .field("instant", &self.instant)
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl TimeModel {
    /// Starts at J2000.0, running at real-time rate.
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            instant: J2000_JD,
            rate: JD_SECOND,
            clock,
            now_check: Cell::new(None),
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn instant(&self) -> f64 {
        self.instant
    }

    pub fn set_instant(&mut self, jd: f64) {
        if jd.is_nan() {
            warn!("[set_instant] ignoring NaN instant");
            return;
        }
        self.instant = clamp_instant(jd);
    }

    pub fn time_rate(&self) -> f64 {
        self.rate
    }

    pub fn set_time_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    /// Move the instant forward by `rate * real_seconds`.
    pub fn advance(&mut self, real_seconds: f64) {
        self.set_instant(self.instant + self.rate * real_seconds);
    }

    pub fn set_to_now(&mut self) {
        let now = self.clock.now_jd();
        self.set_instant(now);
    }

    /// Set the instant to today's date at `time_of_day` in host civil time.
    ///
    /// An unparsable time of day falls back to the current real time.
    pub fn set_to_calendar_time_today(&mut self, time_of_day: &str) {
        match parse_time_of_day(time_of_day) {
            Some(t) => self.set_to_naive_time_today(t),
            None => {
                warn!(
                    "[set_today_time] time {:?} is not valid, the system time will be used",
                    time_of_day
                );
                self.set_to_now();
            }
        }
    }

    pub fn set_to_naive_time_today(&mut self, time_of_day: NaiveTime) {
        let today = self.clock.now_local().date_naive().and_time(time_of_day);
        let shift = self.clock.utc_offset_hours(self.clock.now_jd());
        debug!("[set_today_time] {} local, utc offset {}h", today, shift);
        self.set_instant(naive_to_jd(&today) - shift * JD_HOUR);
    }

    /// Whether the instant is within one simulated second of the host clock.
    ///
    /// The answer is cached and only recomputed once the instant has moved
    /// by more than a quarter of a second since the last check.
    pub fn is_approximately_now(&self) -> bool {
        if let Some(check) = self.now_check.get() {
            if (check.instant - self.instant).abs() <= JD_SECOND / 4.0 {
                return check.is_now;
            }
        }
        let is_now = (self.instant - self.clock.now_jd()).abs() < JD_SECOND;
        self.now_check.set(Some(NowCheck {
            instant: self.instant,
            is_now,
        }));
        is_now
    }

    pub fn increase_speed(&mut self) {
        self.rate = step_up(self.rate, 10.0);
    }

    pub fn decrease_speed(&mut self) {
        self.rate = step_down(self.rate, 10.0);
    }

    pub fn increase_speed_less(&mut self) {
        self.rate = step_up(self.rate, 2.0);
    }

    pub fn decrease_speed_less(&mut self) {
        self.rate = step_down(self.rate, 2.0);
    }

    pub fn add_solar_days(&mut self, days: f64) {
        self.set_instant(self.instant + days);
    }

    /// Add whole rotations of `home`. The root frame has no rotation, so
    /// days are added unscaled there.
    pub fn add_sidereal_days(&mut self, days: f64, home: &dyn Body) {
        let days = if home.is_root() {
            days
        } else {
            days * home.sidereal_day()
        };
        self.set_instant(self.instant + days);
    }
}
