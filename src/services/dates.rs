//! Calendar-date helpers shared by the row builder and the HTTP layer.
//!
//! Stays are half-open `[arrival, departure)`; requested ranges are inclusive
//! `[from, to]` and are turned into `[from, to + 1 day)` before intersecting.

use chrono::{Datelike, Days, NaiveDate};

/// Caller-supplied reporting window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn parse(from: &str, to: &str) -> Option<Self> {
        Some(Self {
            from: parse_calendar_date(from)?,
            to: parse_calendar_date(to)?,
        })
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// Whole nights between arrival and departure, never negative.
pub fn night_count(arrival: NaiveDate, departure: NaiveDate) -> i64 {
    (departure - arrival).num_days().max(0)
}

fn range_end_exclusive(to: NaiveDate) -> NaiveDate {
    to.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

/// Whether the stay `[arrival, departure)` touches the inclusive range `[from, to]`.
pub fn overlaps(arrival: NaiveDate, departure: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    arrival < range_end_exclusive(to) && departure > from
}

/// Nights of the stay that fall inside the inclusive range `[from, to]`.
pub fn clamped_nights_in_range(
    arrival: NaiveDate,
    departure: NaiveDate,
    from: NaiveDate,
    to: NaiveDate,
) -> i64 {
    let start = arrival.max(from);
    let end = departure.min(range_end_exclusive(to));
    night_count(start, end)
}

/// `MM/DD/YYYY`, zero padded.
pub fn format_display_date(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{:04}", date.month(), date.day(), date.year())
}
