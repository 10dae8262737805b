//! The month a ledger page shows and the links for moving between months.

use std::{fmt::Display, ops::Range, str::FromStr};

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

use crate::timezone::LocalTimezone;

/// A calendar month in the viewer's local timezone, anchored on its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewMonth {
    first_day: Date,
}

impl ViewMonth {
    /// The month that `date` falls in.
    pub fn containing(date: Date) -> Self {
        Self {
            first_day: date.replace_day(1).unwrap_or(date),
        }
    }

    /// The month it currently is in `local_timezone`.
    pub fn current(local_timezone: &LocalTimezone) -> Self {
        Self::containing(local_timezone.now().date())
    }

    /// Parse the `month` query parameter, falling back to the current month
    /// when it is missing or malformed.
    pub fn from_query(query: Option<&str>, local_timezone: &LocalTimezone) -> Self {
        match query.map(str::parse::<Self>) {
            Some(Ok(month)) => month,
            Some(Err(_)) => {
                tracing::warn!(
                    "Invalid month {:?} in query, showing the current month",
                    query.unwrap_or_default()
                );
                Self::current(local_timezone)
            }
            None => Self::current(local_timezone),
        }
    }

    /// The first day of the month.
    pub fn first_day(self) -> Date {
        self.first_day
    }

    /// The month before this one.
    pub fn previous(self) -> Option<Self> {
        self.first_day
            .previous_day()
            .map(Self::containing)
    }

    /// The month after this one.
    pub fn next(self) -> Option<Self> {
        let (year, month) = match self.first_day.month() {
            Month::December => (self.first_day.year() + 1, Month::January),
            month => (self.first_day.year(), month.next()),
        };

        Date::from_calendar_date(year, month, 1)
            .ok()
            .map(|first_day| Self { first_day })
    }

    /// Whether `date` is a day of this month.
    pub fn contains(self, date: Date) -> bool {
        date.year() == self.first_day.year() && date.month() == self.first_day.month()
    }

    /// The instants from local midnight on the first day of the month up to,
    /// but not including, local midnight on the first day of the next month.
    pub fn utc_range(self, local_timezone: &LocalTimezone) -> Range<OffsetDateTime> {
        let start = local_timezone.start_of_day(self.first_day);
        let end = match self.next() {
            Some(next) => local_timezone.start_of_day(next.first_day),
            None => PrimitiveDateTime::MAX.assume_utc(),
        };

        start..end
    }

    /// The month and year for headings, e.g. "August 2025".
    pub fn label(self) -> String {
        format!("{} {}", self.first_day.month(), self.first_day.year())
    }

    /// The value of the `month` query parameter for this month, e.g. "2025-08".
    pub fn query_value(self) -> String {
        self.to_string()
    }
}

impl Display for ViewMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}",
            self.first_day.year(),
            u8::from(self.first_day.month())
        )
    }
}

/// The text could not be read as a `YYYY-MM` month between year 1 and the
/// last month with a following month.
#[derive(Debug, PartialEq, Eq)]
pub struct InvalidMonth;

impl FromStr for ViewMonth {
    type Err = InvalidMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.trim().split_once('-').ok_or(InvalidMonth)?;

        if year.len() != 4 || month.len() != 2 {
            return Err(InvalidMonth);
        }

        let year: i32 = year.parse().map_err(|_| InvalidMonth)?;
        let month: u8 = month.parse().map_err(|_| InvalidMonth)?;
        let month = Month::try_from(month).map_err(|_| InvalidMonth)?;

        if year < 1 {
            return Err(InvalidMonth);
        }

        let month = Date::from_calendar_date(year, month, 1)
            .map(|first_day| Self { first_day })
            .map_err(|_| InvalidMonth)?;

        // The page needs the start of the following month for its range.
        month.next().map(|_| month).ok_or(InvalidMonth)
    }
}

/// Links to the months around the one being viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthNavigation {
    /// The month being viewed.
    pub month: ViewMonth,
    /// The month before the viewed one.
    pub previous: Option<ViewMonth>,
    /// The month after the viewed one, `None` if that month has not started yet.
    pub next: Option<ViewMonth>,
    /// The month it is now, for the "this month" link.
    pub current: ViewMonth,
}

impl MonthNavigation {
    /// Build the links around `month`, never linking past `current`.
    pub fn new(month: ViewMonth, current: ViewMonth) -> Self {
        Self {
            month,
            previous: month.previous(),
            next: month.next().filter(|next| *next <= current),
            current,
        }
    }

    /// Whether the viewed month is the current month.
    pub fn is_current(&self) -> bool {
        self.month == self.current
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use crate::timezone::LocalTimezone;

    use super::{InvalidMonth, MonthNavigation, ViewMonth};

    fn month(text: &str) -> ViewMonth {
        text.parse().unwrap()
    }

    #[test]
    fn parses_year_and_month() {
        assert_eq!(month("2025-08").first_day(), date!(2025 - 08 - 01));
        assert_eq!(month("2025-08").to_string(), "2025-08");
    }

    #[test]
    fn rejects_malformed_months() {
        for text in [
            "", "2025", "2025-13", "2025-00", "25-08", "2025-8", "august", "9999-12", "0000-01",
            "-001-01",
        ] {
            assert_eq!(text.parse::<ViewMonth>(), Err(InvalidMonth), "parsing {text:?}");
        }
    }

    #[test]
    fn from_query_falls_back_to_current_month() {
        let tz = LocalTimezone::from_name("Asia/Manila").unwrap();
        let current = ViewMonth::current(&tz);

        assert_eq!(ViewMonth::from_query(None, &tz), current);
        assert_eq!(ViewMonth::from_query(Some("nope"), &tz), current);
        assert_eq!(ViewMonth::from_query(Some("2024-02"), &tz), month("2024-02"));
    }

    #[test]
    fn previous_and_next_cross_year_boundaries() {
        assert_eq!(month("2025-01").previous(), Some(month("2024-12")));
        assert_eq!(month("2024-12").next(), Some(month("2025-01")));
        assert_eq!(month("2025-03").previous(), Some(month("2025-02")));
    }

    #[test]
    fn utc_range_starts_at_local_midnight() {
        let tz = LocalTimezone::from_name("Asia/Manila").unwrap();

        let range = month("2025-08").utc_range(&tz);

        assert_eq!(range.start, datetime!(2025-07-31 16:00 UTC));
        assert_eq!(range.end, datetime!(2025-08-31 16:00 UTC));
    }

    #[test]
    fn last_supported_months_have_a_range() {
        let tz = LocalTimezone::from_name("Asia/Manila").unwrap();
        let current = ViewMonth::current(&tz);

        assert_eq!(ViewMonth::from_query(Some("9999-12"), &tz), current);

        let range = month("9999-11").utc_range(&tz);
        assert_eq!(range.end, datetime!(9999-11-30 16:00 UTC));
        assert!(range.start < range.end);
    }

    #[test]
    fn contains_only_days_of_the_month() {
        let august = month("2025-08");

        assert!(august.contains(date!(2025 - 08 - 01)));
        assert!(august.contains(date!(2025 - 08 - 31)));
        assert!(!august.contains(date!(2025 - 09 - 01)));
        assert!(!august.contains(date!(2024 - 08 - 15)));
    }

    #[test]
    fn label_is_month_and_year() {
        assert_eq!(month("2025-08").label(), "August 2025");
    }

    #[test]
    fn next_is_disabled_for_current_month() {
        let current = month("2025-08");

        let navigation = MonthNavigation::new(current, current);

        assert!(navigation.is_current());
        assert_eq!(navigation.previous, Some(month("2025-07")));
        assert_eq!(navigation.next, None);
    }

    #[test]
    fn next_is_enabled_for_past_months() {
        let navigation = MonthNavigation::new(month("2025-06"), month("2025-08"));

        assert!(!navigation.is_current());
        assert_eq!(navigation.next, Some(month("2025-07")));
    }
}
