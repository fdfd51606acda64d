//! Weekly wall-clock slots in a fixed timezone.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("expected `<weekday> <HH:MM>`, got {0:?}")]
    Format(String),
    #[error("unknown weekday: {0:?}")]
    Weekday(String),
    #[error("invalid time of day: {0:?}")]
    Time(String),
    #[error("unknown timezone: {0:?}")]
    Timezone(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
    pub tz: Tz,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, time: NaiveTime, tz: Tz) -> Self {
        Self { weekday, time, tz }
    }

    /// Parses `thu 13:00` plus an IANA timezone name.
    pub fn parse(slot: &str, tz: &str) -> Result<Self, ScheduleError> {
        let mut parts = slot.split_whitespace();
        let (Some(day), Some(time), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ScheduleError::Format(slot.to_string()));
        };
        let weekday = day
            .parse::<Weekday>()
            .map_err(|_| ScheduleError::Weekday(day.to_string()))?;
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| ScheduleError::Time(time.to_string()))?;
        let tz = tz
            .parse::<Tz>()
            .map_err(|_| ScheduleError::Timezone(tz.to_string()))?;
        Ok(Self::new(weekday, time, tz))
    }

    /// First slot strictly after `instant`.
    pub fn next_after(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let today = instant.with_timezone(&self.tz).date_naive();
        (0..=7)
            .map(|offset| today + Duration::days(offset))
            .filter(|d| d.weekday() == self.weekday)
            .map(|d| self.slot_on(d))
            .find(|slot| *slot > instant)
            .unwrap_or_else(|| self.slot_on(today + Duration::days(14)))
    }

    /// Most recent slot at or before `instant`.
    pub fn latest_at_or_before(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let today = instant.with_timezone(&self.tz).date_naive();
        (0..=7)
            .map(|offset| today - Duration::days(offset))
            .filter(|d| d.weekday() == self.weekday)
            .map(|d| self.slot_on(d))
            .find(|slot| *slot <= instant)
            .unwrap_or_else(|| self.slot_on(today - Duration::days(14)))
    }

    fn slot_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(self.time);
        let resolved = match self.tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            // wall time skipped by a DST jump; fire right after it
            LocalResult::None => self
                .tz
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest(),
        };
        match resolved {
            Some(dt) => dt.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&local),
        }
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.weekday, self.time.format("%H:%M"), self.tz)
    }
}
