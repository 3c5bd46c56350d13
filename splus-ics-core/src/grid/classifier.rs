use scraper::{ElementRef, Html};

use crate::{Error, Result, catalog::selector};

/// What a cell of the schedule grid stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Weekday header spanning one or more slot columns
    DayLabel,
    /// Time of day for the cells that follow
    TimeLabel,
    /// One timetabled event
    Event,
    Other,
}

/// Meaning of a cell inside an event's nested table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Centered text: the first is the title, a second the description
    Heading,
    Location,
    Presenter,
}

/// Every attribute of the Splus page layout the interpreter relies on.
///
/// The site marks its cells only by presentation (CSS classes, alignment), so
/// a layout change of the site is handled here and nowhere else.
#[derive(Debug, Clone)]
pub struct GridClassifier {
    pub grid_table_class: String,
    pub day_label_class: String,
    pub time_label_class: String,
    pub event_class: String,
    /// `name` of the week selector control
    pub week_selector_name: String,
    /// Characters after the year in the first week option's label
    pub first_label_trailing: usize,
    /// Characters after the year in the selected week option's label
    pub selected_label_trailing: usize,
    /// Minutes covered by one grid row
    pub slot_minutes: i64,
}

impl Default for GridClassifier {
    fn default() -> Self {
        Self {
            grid_table_class: "grid-border-args".to_string(),
            day_label_class: "col-label-one".to_string(),
            time_label_class: "row-label-one".to_string(),
            event_class: "object-cell-border".to_string(),
            week_selector_name: "weeks".to_string(),
            first_label_trailing: 6,
            selected_label_trailing: 7,
            slot_minutes: 15,
        }
    }
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

impl GridClassifier {
    pub fn classify(&self, cell: ElementRef<'_>) -> CellKind {
        if cell.value().name() != "td" {
            CellKind::Other
        } else if has_class(cell, &self.day_label_class) {
            CellKind::DayLabel
        } else if has_class(cell, &self.time_label_class) {
            CellKind::TimeLabel
        } else if has_class(cell, &self.event_class) {
            CellKind::Event
        } else {
            CellKind::Other
        }
    }

    pub fn field_role(&self, sub_cell: ElementRef<'_>) -> FieldRole {
        match sub_cell.value().attr("align") {
            Some("center") => FieldRole::Heading,
            Some("left") => FieldRole::Location,
            _ => FieldRole::Presenter,
        }
    }

    /// The schedule grid table of a week page
    pub fn grid_table<'a>(&self, document: &'a Html) -> Result<ElementRef<'a>> {
        let tables = selector("table")?;
        document
            .select(&tables)
            .find(|table| has_class(*table, &self.grid_table_class))
            .ok_or_else(|| {
                Error::Layout(format!(
                    "schedule grid table .{} not found",
                    self.grid_table_class
                ))
            })
    }

    /// The `<option>` labels of the week selector, paired with their
    /// `selected` flag
    pub fn week_options(&self, document: &Html) -> Result<Vec<(String, bool)>> {
        let named = selector("[name]")?;
        let options = selector("option")?;
        let control = document
            .select(&named)
            .find(|el| el.value().attr("name") == Some(self.week_selector_name.as_str()))
            .ok_or_else(|| {
                Error::Layout(format!(
                    "week selector {:?} not found",
                    self.week_selector_name
                ))
            })?;

        Ok(control
            .select(&options)
            .map(|option| {
                (
                    crate::catalog::element_text(option),
                    option.value().attr("selected").is_some(),
                )
            })
            .collect())
    }

    /// Number of grid columns or rows a cell spans; absent means one
    pub fn span(&self, cell: ElementRef<'_>, attribute: &str) -> Result<u32> {
        match cell.value().attr(attribute) {
            None => Ok(1),
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::Layout(format!("invalid {} value {:?}", attribute, raw))
            }),
        }
    }

    pub fn first_listed_year(&self, label: &str) -> String {
        year_before(label, self.first_label_trailing)
    }

    pub fn selected_year(&self, label: &str) -> String {
        year_before(label, self.selected_label_trailing)
    }
}

/// The four characters preceding the last `trailing` characters of `label`,
/// or an empty string when the label is too short
fn year_before(label: &str, trailing: usize) -> String {
    let chars: Vec<char> = label.chars().collect();
    let Some(end) = chars.len().checked_sub(trailing) else {
        return String::new();
    };
    let Some(start) = end.checked_sub(4) else {
        return String::new();
    };
    chars[start..end].iter().collect()
}
