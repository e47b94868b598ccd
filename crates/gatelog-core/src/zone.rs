//! The fixed reference time zone that defines "today".
//!
//! Devices report instants in UTC (or with an offset); the facility, however,
//! reasons in calendar days of one local zone. Day windows are computed here
//! and handed to the store as plain UTC ranges.

use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{Error, Result, query::TimeRange};

/// The zone used when nothing is configured.
pub const DEFAULT_REFERENCE_ZONE: &str = "America/Ciudad_Juarez";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(Tz);

impl ReferenceZone {
  pub fn new(tz: Tz) -> Self { Self(tz) }

  /// Parse an IANA zone name such as `"America/Ciudad_Juarez"`.
  pub fn parse(name: &str) -> Result<Self> {
    name
      .trim()
      .parse::<Tz>()
      .map(Self)
      .map_err(|_| Error::UnknownTimeZone(name.to_owned()))
  }

  pub fn tz(&self) -> Tz { self.0 }

  /// The reference-zone calendar date containing `now`.
  pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&self.0).date_naive()
  }

  /// The first instant of `date` in the reference zone, in UTC.
  pub fn start_of(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
    let midnight = date
      .and_hms_opt(0, 0, 0)
      .ok_or(Error::NonexistentMidnight(date))?;
    // A zone may skip local midnight on a DST change; the day then starts at
    // the first local time that exists.
    (0..=2)
      .find_map(|hours| {
        self
          .0
          .from_local_datetime(&(midnight + TimeDelta::hours(hours)))
          .earliest()
      })
      .map(|dt| dt.with_timezone(&Utc))
      .ok_or(Error::NonexistentMidnight(date))
  }

  /// The inclusive UTC range covering the whole reference day of `date`.
  ///
  /// The upper bound is one nanosecond before the next local midnight, the
  /// resolution of `DateTime<Utc>`.
  pub fn day(&self, date: NaiveDate) -> Result<TimeRange> {
    let start = self.start_of(date)?;
    let next = date
      .checked_add_days(Days::new(1))
      .ok_or(Error::NonexistentMidnight(date))?;
    let end = self.start_of(next)? - TimeDelta::nanoseconds(1);
    Ok(TimeRange { from: Some(start), to: Some(end) })
  }

  /// The reference day containing `now`.
  pub fn today(&self, now: DateTime<Utc>) -> Result<TimeRange> {
    self.day(self.local_date(now))
  }
}

impl Default for ReferenceZone {
  fn default() -> Self { Self(chrono_tz::America::Ciudad_Juarez) }
}
