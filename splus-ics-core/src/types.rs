use std::{
    fmt,
    hash::{Hash, Hasher},
};

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One selectable entry scraped from a Splus selection list
///
/// Two choices are the same choice when label and value match; the index only
/// records the discovery order within its catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Position in the catalog it was scraped from (starting with 0)
    pub index: usize,
    /// Visible label
    pub label: String,
    /// Opaque navigation token (link target or form value)
    pub value: String,
}

impl Choice {
    pub fn new(index: usize, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            value: value.into(),
        }
    }
}

impl PartialEq for Choice {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.value == other.value
    }
}

impl Eq for Choice {}

impl Hash for Choice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.index, self.label, self.value)
    }
}

/// A list of choices for one settings level
pub type Catalog = Vec<Choice>;

/// The levels of the settings chain, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingLevel {
    Faculty,
    Plan,
    StudyPath,
    Group,
}

impl fmt::Display for SettingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettingLevel::Faculty => "faculty",
            SettingLevel::Plan => "plan",
            SettingLevel::StudyPath => "study path",
            SettingLevel::Group => "group",
        };
        f.write_str(name)
    }
}

/// How a caller picks an entry of a freshly fetched catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// An already known choice, used as is
    Choice(Choice),
    /// Position in the catalog (starting with 0)
    Index(usize),
    /// Exact label; the first matching entry wins
    Label(String),
}

impl Selection {
    /// Numbers are read as indices, anything else as a label.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<usize>() {
            Ok(index) => Selection::Index(index),
            Err(_) => Selection::Label(input.to_string()),
        }
    }
}

impl From<Choice> for Selection {
    fn from(choice: Choice) -> Self {
        Selection::Choice(choice)
    }
}

impl From<usize> for Selection {
    fn from(index: usize) -> Self {
        Selection::Index(index)
    }
}

impl From<&str> for Selection {
    fn from(label: &str) -> Self {
        Selection::Label(label.to_string())
    }
}

impl From<String> for Selection {
    fn from(label: String) -> Self {
        Selection::Label(label)
    }
}

/// The user's position in the settings chain
///
/// A later level is only meaningful when every earlier level is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub faculty: Option<Choice>,
    pub plan: Option<Choice>,
    pub study_path: Option<Choice>,
    pub group: Option<Choice>,
}

impl Settings {
    pub fn get(&self, level: SettingLevel) -> Option<&Choice> {
        match level {
            SettingLevel::Faculty => self.faculty.as_ref(),
            SettingLevel::Plan => self.plan.as_ref(),
            SettingLevel::StudyPath => self.study_path.as_ref(),
            SettingLevel::Group => self.group.as_ref(),
        }
    }

    pub fn set(&mut self, level: SettingLevel, choice: Option<Choice>) {
        match level {
            SettingLevel::Faculty => self.faculty = choice,
            SettingLevel::Plan => self.plan = choice,
            SettingLevel::StudyPath => self.study_path = choice,
            SettingLevel::Group => self.group = choice,
        }
    }

    /// Returns the choice of `level` or a missing setting error
    pub fn require(&self, level: SettingLevel) -> crate::Result<&Choice> {
        self.get(level)
            .ok_or(crate::Error::MissingSetting(level))
    }
}

/// One timetabled occurrence read from a schedule grid
///
/// Times are the wall-clock times printed on the timetable. A cell whose date
/// or time could not be resolved keeps `start` and `end` empty. Events order
/// by start first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Event {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub title: String,
    pub description: String,
    pub location: String,
    pub presenter: String,
}

impl Event {
    /// Builds an event lasting `length` from `start`
    pub fn new(
        start: Option<NaiveDateTime>,
        length: Duration,
        title: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
        presenter: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end: start.map(|s| s + length),
            title: title.into(),
            description: description.into(),
            location: location.into(),
            presenter: presenter.into(),
        }
    }

    /// Title, followed by ` -- description` when there is one
    pub fn summary(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{} -- {}", self.title, self.description)
        }
    }

    /// Length of the event, if both ends are known
    pub fn length(&self) -> Option<Duration> {
        Some(self.end? - self.start?)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_time = |t: Option<NaiveDateTime>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        writeln!(f, "Begin:\t{}", fmt_time(self.start))?;
        writeln!(f, "End:\t{}", fmt_time(self.end))?;
        writeln!(f, "Title:\t{}", self.title)?;
        writeln!(f, "Description:\t{}", self.description)?;
        writeln!(f, "Location:\t{}", self.location)?;
        writeln!(f, "Presenter:\t{}", self.presenter)
    }
}

/// Result of a schedule query, as returned to JSON consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    /// Settings the events were fetched with
    pub settings: Settings,
    /// First and last requested week
    pub weeks: (u32, u32),
    pub events: Vec<Event>,
    pub generated_at: DateTime<FixedOffset>,
}

/// ICS generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    /// Calendar name (X-WR-CALNAME)
    pub calendar_name: Option<String>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            calendar_name: Some("Splus Stundenplan".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_choice_identity_ignores_index() {
        let a = Choice::new(0, "Informatik", "faculty.php?id=1");
        let b = Choice::new(7, "Informatik", "faculty.php?id=1");
        let c = Choice::new(0, "Informatik", "faculty.php?id=2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "0 Informatik (faculty.php?id=1)");
    }

    #[test]
    fn test_selection_parse() {
        assert_eq!(Selection::parse("25"), Selection::Index(25));
        assert_eq!(
            Selection::parse("Semesterpläne"),
            Selection::Label("Semesterpläne".to_string())
        );
    }

    #[test]
    fn test_settings_require() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.require(SettingLevel::Plan),
            Err(crate::Error::MissingSetting(SettingLevel::Plan))
        ));
        settings.set(SettingLevel::Plan, Some(Choice::new(0, "Semesterpläne", "p")));
        assert_eq!(settings.require(SettingLevel::Plan).unwrap().label, "Semesterpläne");
    }

    #[test]
    fn test_event_end_and_summary() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 6)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap();
        let event = Event::new(
            Some(start),
            Duration::minutes(60),
            "Mathematik I",
            "Vorlesung",
            "A 101",
            "Prof. Muster",
        );
        assert_eq!(event.length(), Some(Duration::minutes(60)));
        assert_eq!(event.summary(), "Mathematik I -- Vorlesung");

        let bare = Event::new(None, Duration::minutes(30), "Tutorium", "", "", "");
        assert_eq!(bare.end, None);
        assert_eq!(bare.summary(), "Tutorium");
    }

    #[test]
    fn test_events_order_by_start() {
        let at = |h| {
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_opt(h, 0, 0)
        };
        let mut events = vec![
            Event::new(at(12), Duration::minutes(15), "B", "", "", ""),
            Event::new(at(8), Duration::minutes(15), "Z", "", "", ""),
        ];
        events.sort();
        assert_eq!(events[0].title, "Z");
    }
}
