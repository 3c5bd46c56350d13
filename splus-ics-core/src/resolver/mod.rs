//! Navigation of the Splus settings chain and retrieval of week schedules.
//!
//! A schedule is identified by faculty, plan, study path and (for student set
//! plans with more than one group) group. Every level's catalog is fetched
//! from the site using the choices made on the earlier levels.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::{
    Catalog, Choice, Error, Event, Result, ScheduleResponse, Selection, SettingLevel, Settings,
    calendar::{IsoWeekCalendar, WeekCalendar},
    catalog::{find_by_label, form_catalog, links_catalog, marked_catalog},
    config::SourceConfig,
    grid::{GridClassifier, GridInterpreter},
    source::RemoteSource,
};

/// What a multi-week query does when a single week cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeekErrorPolicy {
    /// The first failing week fails the whole range
    #[default]
    FailRange,
    /// Weeks that cannot be fetched or interpreted are logged and left out.
    /// Missing settings still fail the range.
    SkipBadWeeks,
}

/// Holds the user's settings chain and fetches catalogs and schedules for it
pub struct SettingsResolver<S: RemoteSource> {
    source: S,
    config: SourceConfig,
    calendar: Arc<dyn WeekCalendar>,
    interpreter: GridInterpreter,
    settings: Settings,
    policy: WeekErrorPolicy,
}

impl<S: RemoteSource> SettingsResolver<S> {
    pub fn new(source: S, config: SourceConfig) -> Self {
        let calendar: Arc<dyn WeekCalendar> = Arc::new(IsoWeekCalendar);
        Self {
            source,
            config,
            interpreter: GridInterpreter::new(GridClassifier::default(), calendar.clone()),
            calendar,
            settings: Settings::default(),
            policy: WeekErrorPolicy::default(),
        }
    }

    /// Replaces the week numbering used for dates and week ranges
    pub fn with_calendar(mut self, calendar: Arc<dyn WeekCalendar>) -> Self {
        self.interpreter = GridInterpreter::new(self.interpreter.classifier().clone(), calendar.clone());
        self.calendar = calendar;
        self
    }

    pub fn with_classifier(mut self, classifier: GridClassifier) -> Self {
        self.interpreter = GridInterpreter::new(classifier, self.calendar.clone());
        self
    }

    pub fn with_policy(mut self, policy: WeekErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn is_student_set_plan(&self, plan: &Choice) -> bool {
        plan.label == self.config.student_set_plan_label
    }

    /// Faculties listed on the start page
    pub async fn faculties(&self) -> Result<Catalog> {
        let html = self.source.get(&self.config.base_url).await?;
        let catalog = links_catalog(&html)?;
        tracing::info!("Fetched {} faculties", catalog.len());
        Ok(catalog)
    }

    /// Plans of the selected faculty
    pub async fn plans(&self) -> Result<Catalog> {
        let faculty = self.settings.require(SettingLevel::Faculty)?;
        let html = self.source.get(&self.config.url_for(&faculty.value)).await?;
        let catalog = links_catalog(&html)?;
        tracing::info!("Fetched {} plans of {}", catalog.len(), faculty.label);
        Ok(catalog)
    }

    /// Study paths of the selected plan
    pub async fn study_paths(&self) -> Result<Catalog> {
        let plan = self.settings.require(SettingLevel::Plan)?;
        let html = self.source.get(&self.config.url_for(&plan.value)).await?;
        let catalog = if self.is_student_set_plan(plan) {
            form_catalog(&html, &self.config.filter_form)?
        } else {
            marked_catalog(&html, &self.config.study_path_marker)?
        };
        tracing::info!("Fetched {} study paths of {}", catalog.len(), plan.label);
        Ok(catalog)
    }

    /// Groups of the selected study path
    pub async fn groups(&self) -> Result<Catalog> {
        let plan = self.settings.require(SettingLevel::Plan)?;
        let study_path = self.settings.require(SettingLevel::StudyPath)?;
        let fields = [("filter".to_string(), study_path.value.clone())];
        let html = self
            .source
            .post_form(&self.config.url_for(&plan.value), &fields)
            .await?;
        let catalog = form_catalog(&html, &self.config.group_form)?;
        tracing::info!("Fetched {} groups of {}", catalog.len(), study_path.label);
        Ok(catalog)
    }

    /// Catalog of one settings level
    pub async fn catalog(&self, level: SettingLevel) -> Result<Catalog> {
        match level {
            SettingLevel::Faculty => self.faculties().await,
            SettingLevel::Plan => self.plans().await,
            SettingLevel::StudyPath => self.study_paths().await,
            SettingLevel::Group => self.groups().await,
        }
    }

    /// Sets one level of the chain.
    ///
    /// Indices and labels are looked up in the level's freshly fetched
    /// catalog. An unknown label leaves the level unset; an index past the
    /// end of the catalog is an error.
    pub async fn select(
        &mut self,
        level: SettingLevel,
        selection: impl Into<Selection>,
    ) -> Result<Option<Choice>> {
        let choice = match selection.into() {
            Selection::Choice(choice) => Some(choice),
            Selection::Index(index) => {
                let catalog = self.catalog(level).await?;
                let available = catalog.len();
                let choice = catalog.into_iter().nth(index).ok_or(Error::OptionIndex {
                    level,
                    index,
                    available,
                })?;
                Some(choice)
            }
            Selection::Label(label) => {
                let catalog = self.catalog(level).await?;
                let choice = find_by_label(&catalog, &label).cloned();
                if choice.is_none() {
                    tracing::warn!("No {} labelled {:?}, leaving it unset", level, label);
                }
                choice
            }
        };

        if let Some(ref choice) = choice {
            tracing::info!("Selected {}: {}", level, choice);
        }
        self.settings.set(level, choice.clone());
        Ok(choice)
    }

    pub async fn set_faculty(&mut self, selection: impl Into<Selection>) -> Result<Option<Choice>> {
        self.select(SettingLevel::Faculty, selection).await
    }

    pub async fn set_plan(&mut self, selection: impl Into<Selection>) -> Result<Option<Choice>> {
        self.select(SettingLevel::Plan, selection).await
    }

    pub async fn set_study_path(
        &mut self,
        selection: impl Into<Selection>,
    ) -> Result<Option<Choice>> {
        self.select(SettingLevel::StudyPath, selection).await
    }

    pub async fn set_group(&mut self, selection: impl Into<Selection>) -> Result<Option<Choice>> {
        self.select(SettingLevel::Group, selection).await
    }

    /// Group used for week requests.
    ///
    /// Only student set plans need one. Without an explicit group, a study
    /// path offering a single group (next to the placeholder entry) uses it.
    async fn effective_group(&self) -> Result<Option<Choice>> {
        let plan = self.settings.require(SettingLevel::Plan)?;
        self.settings.require(SettingLevel::StudyPath)?;
        if !self.is_student_set_plan(plan) {
            return Ok(None);
        }
        if let Some(group) = &self.settings.group {
            return Ok(Some(group.clone()));
        }

        let groups = self.groups().await?;
        match <[Choice; 2]>::try_from(groups) {
            Ok([_, only]) => {
                tracing::info!("Using the only group {}", only.label);
                Ok(Some(only))
            }
            Err(_) => Err(Error::MissingSetting(SettingLevel::Group)),
        }
    }

    async fn fetch_week_document(&self, week: u32, group: Option<&Choice>) -> Result<String> {
        let plan = self.settings.require(SettingLevel::Plan)?;
        let study_path = self.settings.require(SettingLevel::StudyPath)?;
        let url = self.config.url_for(&plan.value);

        if self.is_student_set_plan(plan) {
            let group = group.ok_or(Error::MissingSetting(SettingLevel::Group))?;
            let fields = [
                ("identifier[]".to_string(), group.value.clone()),
                ("filter".to_string(), study_path.value.clone()),
                ("weeks".to_string(), week.to_string()),
            ];
            return self.source.post_form(&url, &fields).await;
        }

        let url = format!("{}&identifier={}", url, study_path.value.replace('#', "%23"));
        self.source
            .post_form(&url, &[("weeks".to_string(), week.to_string())])
            .await
    }

    async fn week_events(&self, week: u32, group: Option<&Choice>) -> Result<Vec<Event>> {
        let html = self.fetch_week_document(week, group).await?;
        let events = self.interpreter.interpret(&html, week)?;
        tracing::info!("Week {}: {} events", week, events.len());
        Ok(events)
    }

    /// Events of one week of the selected schedule
    pub async fn events_from_week(&self, week: u32) -> Result<Vec<Event>> {
        let group = self.effective_group().await?;
        self.week_events(week, group.as_ref()).await
    }

    /// Events of weeks `first..=last`, one week after the other, in ascending
    /// week order.
    pub async fn events_between_weeks(&self, first: u32, last: u32) -> Result<Vec<Event>> {
        let group = self.effective_group().await?;
        let mut events = Vec::new();
        let mut skipped = Vec::new();

        for week in first..=last {
            match self.week_events(week, group.as_ref()).await {
                Ok(week_events) => events.extend(week_events),
                Err(e)
                    if self.policy == WeekErrorPolicy::SkipBadWeeks
                        && (e.is_source_unavailable() || e.is_grid_error()) =>
                {
                    tracing::warn!("Skipping week {}: {}", week, e);
                    skipped.push(week);
                }
                Err(e) => {
                    tracing::error!("Failed to fetch week {}: {}", week, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Fetched {} events from weeks {}-{} ({} skipped)",
            events.len(),
            first,
            last,
            skipped.len()
        );
        Ok(events)
    }

    /// Week numbers covering `from..=to` in the site's numbering, which keeps
    /// counting past the end of the first week-year. `None` for an empty
    /// range.
    pub fn week_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Option<(u32, u32)>> {
        if from > to {
            return Ok(None);
        }
        let (from_year, first) = self.calendar.week_of(from);
        let (to_year, mut last) = self.calendar.week_of(to);

        for year in from_year..to_year {
            last += self.calendar.weeks_in_year(year).ok_or_else(|| {
                Error::Config(format!("No week count for year {}", year))
            })?;
        }

        Ok(Some((first, last)))
    }

    /// Events of all weeks touching `from..=to`
    pub async fn events_between_dates(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        match self.week_range(from, to)? {
            Some((first, last)) => {
                tracing::debug!("{} to {} covers weeks {}-{}", from, to, first, last);
                self.events_between_weeks(first, last).await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Packs events fetched for `weeks` with the current settings
    pub fn response(&self, weeks: (u32, u32), events: Vec<Event>) -> ScheduleResponse {
        ScheduleResponse {
            settings: self.settings.clone(),
            weeks,
            events,
            generated_at: Local::now().fixed_offset(),
        }
    }
}

#[cfg(test)]
mod tests;
