// crates/bulk-ingest-core/src/core/time.rs
// ============================================================================
// Module: Bulk Ingest Time Model
// Description: Calendar dates and the clock used to stamp imports.
// Purpose: Keep the wall clock behind an injectable seam.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Dates are stored as `YYYY-MM-DD` strings. The runtime never reads wall
//! clock time directly: the host injects a [`Clock`], and tests pin the date
//! with [`FixedClock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Date;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Canonical date layout.
const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    /// Returns today's date.
    fn today(&self) -> Date;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

/// Clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    /// Date returned by every call.
    date: Date,
}

impl FixedClock {
    /// Creates a clock that always reports `date`.
    #[must_use]
    pub const fn new(date: Date) -> Self {
        Self {
            date,
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.date
    }
}

// ============================================================================
// SECTION: Date Helpers
// ============================================================================

/// Parses a calendar-valid `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(value: &str) -> Option<Date> {
    if value.len() != 10 {
        return None;
    }
    Date::parse(value, DATE_FORMAT).ok()
}

/// Formats a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use time::macros::date;

    use super::Clock;
    use super::FixedClock;
    use super::format_date;
    use super::parse_date;

    #[test]
    fn parses_calendar_dates_only() {
        assert_eq!(parse_date("2024-02-29"), Some(date!(2024 - 02 - 29)));
        assert_eq!(parse_date("2023-02-29"), None);
        assert_eq!(parse_date("2024-2-9"), None);
        assert_eq!(parse_date("2024-02-29T00:00:00Z"), None);
    }

    #[test]
    fn fixed_clock_formats_as_iso_date() {
        let clock = FixedClock::new(date!(2025 - 01 - 07));
        assert_eq!(format_date(clock.today()), "2025-01-07");
    }
}
