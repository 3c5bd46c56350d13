use chrono::{Datelike, NaiveDate, Weekday};

use crate::{Error, Result};

/// Week numbering used to turn (year, week, weekday) into dates
///
/// The timetable only speaks in week numbers, so every date computation goes
/// through this trait instead of the host's locale settings.
pub trait WeekCalendar: Send + Sync {
    /// Number of weeks the given week-year has
    fn weeks_in_year(&self, year: i32) -> Option<u32>;

    /// Date of `weekday` in week `week` of week-year `year`
    fn date_of(&self, year: i32, week: u32, weekday: Weekday) -> Option<NaiveDate>;

    /// Week-year and week number containing `date`
    fn week_of(&self, date: NaiveDate) -> (i32, u32);
}

/// ISO 8601 week dates (DIN 1355): weeks start on Monday and week 1 holds the
/// first Thursday of the year.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoWeekCalendar;

impl WeekCalendar for IsoWeekCalendar {
    fn weeks_in_year(&self, year: i32) -> Option<u32> {
        // 28 December always falls into the last week of its week-year
        NaiveDate::from_ymd_opt(year, 12, 28).map(|d| d.iso_week().week())
    }

    fn date_of(&self, year: i32, week: u32, weekday: Weekday) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(year, week, weekday)
    }

    fn week_of(&self, date: NaiveDate) -> (i32, u32) {
        let week = date.iso_week();
        (week.year(), week.week())
    }
}

/// Maps the German day abbreviations of the grid header to weekdays.
///
/// The grid has no Sunday column, so only Monday to Saturday are known.
pub fn weekday_from_label(label: &str) -> Result<Weekday> {
    match label.trim() {
        "Mo" => Ok(Weekday::Mon),
        "Di" => Ok(Weekday::Tue),
        "Mi" => Ok(Weekday::Wed),
        "Do" => Ok(Weekday::Thu),
        "Fr" => Ok(Weekday::Fri),
        "Sa" => Ok(Weekday::Sat),
        other => Err(Error::UnknownWeekday(other.to_string())),
    }
}
