//! Reconstruction of events from one week's schedule grid.
//!
//! The grid is a table in which every row covers one time slot. Header cells
//! name the weekdays (spanning as many slot columns as the day has parallel
//! tracks), the first cell of a row names the time, and every event is a cell
//! spanning as many rows as it has slots.

mod classifier;

pub use classifier::{CellKind, FieldRole, GridClassifier};

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use scraper::{ElementRef, Html};

use crate::{
    Error, Event, Result,
    calendar::{IsoWeekCalendar, WeekCalendar, weekday_from_label},
    catalog::{child_elements, element_text, selector},
};

/// Year information of one week page, read from its week selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekContext {
    pub target_week: u32,
    /// Year of the selected week option; empty when none is selected
    pub selected_year: String,
    /// Year of the first week option the page lists
    pub first_listed_year: String,
}

impl WeekContext {
    /// Week-year and week number the page's dates belong to.
    ///
    /// The site keeps counting weeks past the end of the first year of an
    /// academic year, so on pages of the second year a week beyond the first
    /// year's week count is folded back. `None` when a year is unreadable or
    /// the week is zero.
    pub fn resolve(&self, calendar: &dyn WeekCalendar) -> Option<(i32, u32)> {
        let year: i32 = self.selected_year.parse().ok()?;
        let mut week = self.target_week;

        if self.selected_year != self.first_listed_year {
            let first_year: i32 = self.first_listed_year.parse().ok()?;
            let weeks = calendar.weeks_in_year(first_year)?;
            if week > weeks {
                week -= weeks;
            }
        }

        (week > 0).then_some((year, week))
    }
}

#[derive(Debug, Default)]
struct CellFields {
    title: Option<String>,
    description: Option<String>,
    location: Option<String>,
    presenter: Option<String>,
}

/// Turns a week page into the events it shows
#[derive(Clone)]
pub struct GridInterpreter {
    classifier: GridClassifier,
    calendar: Arc<dyn WeekCalendar>,
}

impl GridInterpreter {
    pub fn new(classifier: GridClassifier, calendar: Arc<dyn WeekCalendar>) -> Self {
        Self {
            classifier,
            calendar,
        }
    }

    pub fn classifier(&self) -> &GridClassifier {
        &self.classifier
    }

    /// Events of the page in scan order (rows top to bottom, cells left to
    /// right).
    ///
    /// A cell whose date or time cannot be resolved still yields an event,
    /// without start and end. A cell without a known weekday aborts the page.
    pub fn interpret(&self, html: &str, week: u32) -> Result<Vec<Event>> {
        let document = Html::parse_document(html);
        let context = self.week_context(&document, week)?;
        let resolved = context.resolve(self.calendar.as_ref());
        if resolved.is_none() {
            tracing::warn!(
                "Cannot resolve week {} (selected year {:?}, first year {:?}), events stay undated",
                week,
                context.selected_year,
                context.first_listed_year
            );
        }

        let table = self.classifier.grid_table(&document)?;

        // position 0 is the time label column
        let mut day_columns = vec![String::new()];
        let mut time_label: Option<String> = None;
        let mut events = Vec::new();

        for row in grid_rows(table) {
            for (position, cell) in child_elements(row).enumerate() {
                match self.classifier.classify(cell) {
                    CellKind::DayLabel => {
                        let span = self.classifier.span(cell, "colspan")?;
                        let label = element_text(cell);
                        day_columns.extend((0..span).map(|_| label.clone()));
                    }
                    CellKind::TimeLabel => time_label = Some(element_text(cell)),
                    CellKind::Event => {
                        let day = day_columns.get(position).ok_or(Error::DayIndexOutOfRange {
                            index: position,
                            columns: day_columns.len(),
                        })?;
                        let weekday = weekday_from_label(day)?;
                        let slots = self.classifier.span(cell, "rowspan")?;
                        let length =
                            Duration::minutes(i64::from(slots) * self.classifier.slot_minutes);

                        let start = resolved.and_then(|(year, week)| {
                            let date = self.calendar.date_of(year, week, weekday)?;
                            let time = parse_time(time_label.as_deref()?)?;
                            Some(NaiveDateTime::new(date, time))
                        });

                        let fields = self.read_fields(cell)?;
                        if start.is_none() {
                            tracing::warn!(
                                "Undated event {:?} on {} at {:?} in week {}",
                                fields.title.as_deref().unwrap_or_default(),
                                day,
                                time_label,
                                week
                            );
                        }

                        events.push(Event::new(
                            start,
                            length,
                            fields.title.unwrap_or_default(),
                            fields.description.unwrap_or_default(),
                            fields.location.unwrap_or_default(),
                            fields.presenter.unwrap_or_default(),
                        ));
                    }
                    CellKind::Other => {}
                }
            }
        }

        tracing::debug!("Week {}: {} events", week, events.len());
        Ok(events)
    }

    /// Reads the year context from the page's week selector
    pub fn week_context(&self, document: &Html, week: u32) -> Result<WeekContext> {
        let options = self.classifier.week_options(document)?;
        let (first_label, first_selected) = options
            .first()
            .ok_or_else(|| Error::Layout("week selector has no options".to_string()))?;

        let selected_year = options
            .iter()
            .rev()
            .find(|(_, selected)| *selected)
            .map(|(label, _)| self.classifier.selected_year(label))
            .unwrap_or_default();

        // the selection marker shifts the year of the first label as well
        let first_listed_year = if *first_selected {
            self.classifier.selected_year(first_label)
        } else {
            self.classifier.first_listed_year(first_label)
        };

        Ok(WeekContext {
            target_week: week,
            selected_year,
            first_listed_year,
        })
    }

    fn read_fields(&self, cell: ElementRef<'_>) -> Result<CellFields> {
        let td = selector("td")?;
        let mut fields = CellFields::default();

        for sub_cell in cell.select(&td) {
            let text = element_text(sub_cell);
            match self.classifier.field_role(sub_cell) {
                FieldRole::Heading if fields.title.is_none() => fields.title = Some(text),
                FieldRole::Heading => fields.description = Some(text),
                FieldRole::Location => fields.location = Some(text),
                FieldRole::Presenter => fields.presenter = Some(text),
            }
        }

        Ok(fields)
    }
}

impl Default for GridInterpreter {
    fn default() -> Self {
        Self::new(GridClassifier::default(), Arc::new(IsoWeekCalendar))
    }
}

/// Rows of `table` itself, not of tables nested in its cells
fn grid_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|el| el.value().name() == "tr"));
            }
            _ => {}
        }
    }
    rows
}

fn parse_time(label: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(label.trim(), "%H:%M").ok()
}
