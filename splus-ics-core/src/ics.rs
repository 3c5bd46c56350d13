use std::{io::Write, path::Path};

use chrono::{NaiveDateTime, Utc};
use icalendar::{Calendar, Component, EventLike, Property};
use uuid::Uuid;

use crate::{Event, IcsOptions, Result};

/// Language of the timetable texts
const SUMMARY_LANGUAGE: &str = "de-de";

/// Organizer value without a contact address
const NO_ADDRESS: &str = "mailto:";

/// ICS calendar writer
pub struct IcsExporter {
    options: IcsOptions,
}

impl IcsExporter {
    pub fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Renders one VEVENT per event, in the given order
    pub fn generate(&self, events: &[Event]) -> Result<String> {
        let mut calendar = Calendar::new();
        if let Some(ref name) = self.options.calendar_name {
            calendar.name(name);
        }

        for event in events {
            calendar.push(self.build_event(event));
        }

        let calendar = calendar.done();
        tracing::debug!("Rendered {} events", events.len());
        Ok(calendar.to_string())
    }

    /// Renders the whole calendar before writing the first byte
    pub fn write<W: Write>(&self, events: &[Event], mut writer: W) -> Result<()> {
        let content = self.generate(events)?;
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    pub async fn write_to_file(&self, events: &[Event], path: impl AsRef<Path>) -> Result<()> {
        let content = self.generate(events)?;
        tokio::fs::write(path.as_ref(), content).await?;
        tracing::info!("Wrote {} events to {}", events.len(), path.as_ref().display());
        Ok(())
    }

    fn build_event(&self, event: &Event) -> icalendar::Event {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&Uuid::new_v4().to_string());
        ics_event.add_property("DTSTAMP", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());

        let summary = event.summary();
        if !summary.is_empty() {
            let mut prop = Property::new("SUMMARY", summary);
            prop.add_parameter("LANGUAGE", SUMMARY_LANGUAGE);
            ics_event.append_property(prop);
        }

        if !event.location.is_empty() {
            ics_event.location(&event.location);
        }

        let mut organizer = Property::new("ORGANIZER", NO_ADDRESS);
        if !event.presenter.is_empty() {
            organizer.add_parameter("CN", &event.presenter);
        }
        ics_event.append_property(organizer);

        match (event.start, event.end) {
            (Some(start), Some(end)) => {
                add_floating_time(&mut ics_event, "DTSTART", start);
                add_floating_time(&mut ics_event, "DTEND", end);
            }
            _ => tracing::warn!("Event {:?} has no date, writing it without times", event.title),
        }

        ics_event.done()
    }
}

impl Default for IcsExporter {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

/// Wall-clock time without Z or TZID
fn add_floating_time(ics_event: &mut icalendar::Event, name: &str, time: NaiveDateTime) {
    ics_event.add_property(name, time.format("%Y%m%dT%H%M%S").to_string());
}
