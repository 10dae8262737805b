//! Conversions between UTC instants and the calendar of the configured local timezone.

use std::fmt::Debug;

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use time_tz::{Offset, TimeZone, Tz};

use crate::Error;

/// The timezone that calendar days are derived in.
///
/// Day keys, month windows and the times shown next to entries all use the
/// local calendar, not UTC.
#[derive(Clone)]
pub struct LocalTimezone {
    name: String,
    tz: &'static Tz,
}

impl Debug for LocalTimezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LocalTimezone").field(&self.name).finish()
    }
}

impl LocalTimezone {
    /// Look up a timezone by its canonical name, e.g. "Asia/Manila".
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezoneError] if the name is not a known timezone.
    pub fn from_name(canonical_timezone: &str) -> Result<Self, Error> {
        time_tz::timezones::get_by_name(canonical_timezone)
            .map(|tz| Self {
                name: canonical_timezone.to_owned(),
                tz,
            })
            .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))
    }

    /// The canonical name of the timezone.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The UTC offset in effect at `instant`.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        self.tz.get_offset_utc(&instant).to_utc()
    }

    /// Express `instant` in local time.
    pub fn to_local(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant.to_offset(self.offset_at(instant))
    }

    /// The local calendar day that `instant` falls on.
    pub fn local_date(&self, instant: OffsetDateTime) -> Date {
        self.to_local(instant).date()
    }

    /// The UTC offset in effect now.
    pub fn current_offset(&self) -> UtcOffset {
        self.offset_at(OffsetDateTime::now_utc())
    }

    /// The current local time.
    pub fn now(&self) -> OffsetDateTime {
        self.to_local(OffsetDateTime::now_utc())
    }

    /// The instant of a local wall-clock time.
    ///
    /// For wall-clock times that are skipped or repeated by a DST transition,
    /// the offset in effect just after the transition is used.
    pub fn from_local(&self, local: PrimitiveDateTime) -> OffsetDateTime {
        let first_guess = local.assume_offset(self.offset_at(local.assume_utc()));
        local.assume_offset(self.offset_at(first_guess))
    }

    /// The instant local midnight starts on `date`.
    pub fn start_of_day(&self, date: Date) -> OffsetDateTime {
        self.from_local(PrimitiveDateTime::new(date, Time::MIDNIGHT))
    }
}
