use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use super::*;

const BASE: &str = "http://splus.test/";

/// Serves canned pages and records every request
#[derive(Default)]
struct FakeSource {
    pages: HashMap<String, String>,
    groups_page: String,
    week_pages: HashMap<u32, String>,
    failing_weeks: HashSet<u32>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeSource {
    fn page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(format!("{BASE}{path}"), html.to_string());
        self
    }

    fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().unwrap().clone()
    }

    fn posted_weeks(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|(_, fields)| {
                fields
                    .into_iter()
                    .find(|(key, _)| key == "weeks")
                    .map(|(_, value)| value)
            })
            .collect()
    }
}

#[async_trait]
impl RemoteSource for FakeSource {
    async fn get(&self, url: &str) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), Vec::new()));
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::SourceUnavailable {
                url: url.to_string(),
                message: "HTTP 404 Not Found error".to_string(),
            })
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), fields.to_vec()));

        let week = fields
            .iter()
            .find(|(key, _)| key == "weeks")
            .map(|(_, value)| value.parse::<u32>().unwrap());
        match week {
            Some(week) if self.failing_weeks.contains(&week) => Err(Error::Timeout),
            Some(week) => self.week_pages.get(&week).cloned().ok_or_else(|| {
                Error::SourceUnavailable {
                    url: url.to_string(),
                    message: format!("no page for week {week}"),
                }
            }),
            None => Ok(self.groups_page.clone()),
        }
    }
}

const START_PAGE: &str = r#"<ul>
    <li><a href="fak.php?f=I">Informatik</a></li>
    <li><a href="fak.php?f=R">Recht</a></li>
</ul>"#;

const INFORMATIK_PLANS: &str = r#"<ul>
    <li><a href="plan.php?p=sem">Semesterpläne</a></li>
    <li><a href="plan.php?p=set">Studentensetpläne</a></li>
</ul>"#;

const SEMESTER_PLAN: &str = r##"<select name="identifier">
    <option value="#SPLUS111">Informatik 1. Sem</option>
    <option value="#SPLUS555">IT-Management 5. Sem</option>
</select>"##;

const STUDENT_SET_PLAN: &str = r##"<form name="formfilter"><select name="filter">
    <option value="WR2">Wirtschaftsrecht 2. Sem</option>
</select></form>"##;

fn groups_page(groups: &[&str]) -> String {
    let options: String = groups
        .iter()
        .map(|g| format!(r#"<option value="{g}">{g}</option>"#))
        .collect();
    format!(
        r#"<form name="form33"><select name="identifier[]">
        <option value="">-- Gruppe --</option>{options}</select></form>"#
    )
}

/// Page of a 2024 week with one Monday 08:00 event titled after the week
fn week_page(week: u32) -> String {
    format!(
        r#"<select name="weeks">
            <option value="38">KW 38: 16.09.2024 (Mo.)</option>
            <option value="{week}" selected>KW {week}: 01.01.2024 (Mo.)*</option>
        </select>
        <table class="grid-border-args">
            <tr><td></td><td class="col-label-one" colspan="1">Mo</td></tr>
            <tr><td class="row-label-one">08:00</td>
                <td class="object-cell-border" rowspan="6"><table>
                    <tr><td align="center">Woche {week}</td></tr>
                    <tr><td align="left">A 101</td></tr>
                </table></td></tr>
        </table>"#
    )
}

fn site() -> FakeSource {
    let mut source = FakeSource::default()
        .page("", START_PAGE)
        .page("fak.php?f=I", INFORMATIK_PLANS)
        .page("plan.php?p=sem", SEMESTER_PLAN)
        .page("plan.php?p=set", STUDENT_SET_PLAN);
    source.groups_page = groups_page(&["WR2-A"]);
    for week in 39..=42 {
        source.week_pages.insert(week, week_page(week));
    }
    source
}

fn resolver(source: FakeSource) -> SettingsResolver<FakeSource> {
    let config = SourceConfig::default().with_base_url(BASE).unwrap();
    SettingsResolver::new(source, config)
}

fn semester_settings() -> Settings {
    Settings {
        faculty: Some(Choice::new(0, "Informatik", "fak.php?f=I")),
        plan: Some(Choice::new(0, "Semesterpläne", "plan.php?p=sem")),
        study_path: Some(Choice::new(1, "IT-Management 5. Sem", "#SPLUS555")),
        group: None,
    }
}

fn student_set_settings() -> Settings {
    Settings {
        faculty: Some(Choice::new(1, "Recht", "fak.php?f=R")),
        plan: Some(Choice::new(1, "Studentensetpläne", "plan.php?p=set")),
        study_path: Some(Choice::new(0, "Wirtschaftsrecht 2. Sem", "WR2")),
        group: None,
    }
}

fn titles(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.title.as_str()).collect()
}

#[tokio::test]
async fn test_walks_settings_chain_by_label_and_index() {
    let mut resolver = resolver(site());

    let faculty = resolver.set_faculty("Informatik").await.unwrap();
    assert_eq!(faculty.unwrap().value, "fak.php?f=I");

    resolver.set_plan("Semesterpläne").await.unwrap();
    let study_paths = resolver.study_paths().await.unwrap();
    assert_eq!(study_paths.len(), 2);

    let study_path = resolver.set_study_path(1usize).await.unwrap().unwrap();
    assert_eq!(study_path.label, "IT-Management 5. Sem");
    assert_eq!(resolver.settings(), &semester_settings());
}

#[tokio::test]
async fn test_unknown_label_leaves_level_unset() {
    let mut resolver = resolver(site());
    let choice = resolver.set_faculty("Maschinenbau").await.unwrap();
    assert!(choice.is_none());
    assert!(resolver.settings().faculty.is_none());
}

#[tokio::test]
async fn test_index_past_catalog_end_is_an_error() {
    let mut resolver = resolver(site());
    let result = resolver.set_faculty(5usize).await;
    assert!(matches!(
        result,
        Err(Error::OptionIndex {
            level: SettingLevel::Faculty,
            index: 5,
            available: 2
        })
    ));
}

#[tokio::test]
async fn test_explicit_choice_needs_no_request() {
    let source = site();
    let mut resolver = resolver(source);
    let choice = Choice::new(3, "Informatik", "fak.php?f=I");
    resolver.set_faculty(choice.clone()).await.unwrap();
    assert_eq!(resolver.settings().faculty, Some(choice));
    assert!(resolver.source.requests().is_empty());
}

#[tokio::test]
async fn test_catalogs_require_previous_levels() {
    let resolver = resolver(site());
    assert!(matches!(
        resolver.plans().await,
        Err(Error::MissingSetting(SettingLevel::Faculty))
    ));
    assert!(matches!(
        resolver.study_paths().await,
        Err(Error::MissingSetting(SettingLevel::Plan))
    ));

    let resolver = resolver.with_settings(Settings {
        study_path: None,
        ..semester_settings()
    });
    assert!(matches!(
        resolver.groups().await,
        Err(Error::MissingSetting(SettingLevel::StudyPath))
    ));
}

#[tokio::test]
async fn test_events_require_settings_before_any_request() {
    let resolver = resolver(site());
    let result = resolver.events_between_weeks(39, 41).await;
    assert!(matches!(
        result,
        Err(Error::MissingSetting(SettingLevel::Plan))
    ));
    assert!(resolver.source.requests().is_empty());
}

#[tokio::test]
async fn test_semester_plan_week_request() {
    let resolver = resolver(site()).with_settings(semester_settings());
    let events = resolver.events_from_week(39).await.unwrap();

    assert_eq!(titles(&events), vec!["Woche 39"]);
    let requests = resolver.source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].0,
        "http://splus.test/plan.php?p=sem&identifier=%23SPLUS555"
    );
    assert_eq!(
        requests[0].1,
        vec![("weeks".to_string(), "39".to_string())]
    );
}

#[tokio::test]
async fn test_student_set_plan_lists_filter_form() {
    let resolver = resolver(site()).with_settings(student_set_settings());
    let study_paths = resolver.study_paths().await.unwrap();
    assert_eq!(study_paths, vec![Choice::new(0, "Wirtschaftsrecht 2. Sem", "WR2")]);

    let groups = resolver.groups().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].label, "WR2-A");
}

#[tokio::test]
async fn test_single_group_is_used_automatically() {
    let resolver = resolver(site()).with_settings(student_set_settings());
    let events = resolver.events_between_weeks(39, 40).await.unwrap();
    assert_eq!(titles(&events), vec!["Woche 39", "Woche 40"]);

    let requests = resolver.source.requests();
    // one group lookup, then one request per week
    assert_eq!(requests.len(), 3);
    assert_eq!(
        requests[0].1,
        vec![("filter".to_string(), "WR2".to_string())]
    );
    assert_eq!(
        requests[1].1,
        vec![
            ("identifier[]".to_string(), "WR2-A".to_string()),
            ("filter".to_string(), "WR2".to_string()),
            ("weeks".to_string(), "39".to_string()),
        ]
    );
    assert!(resolver.settings().group.is_none());
}

#[tokio::test]
async fn test_several_groups_require_a_choice() {
    let mut source = site();
    source.groups_page = groups_page(&["WR2-A", "WR2-B"]);
    let mut resolver = resolver(source).with_settings(student_set_settings());

    assert!(matches!(
        resolver.events_from_week(39).await,
        Err(Error::MissingSetting(SettingLevel::Group))
    ));

    resolver.set_group("WR2-B").await.unwrap();
    let events = resolver.events_from_week(39).await.unwrap();
    assert_eq!(events.len(), 1);
    let last = resolver.source.requests().pop().unwrap();
    assert_eq!(last.1[0], ("identifier[]".to_string(), "WR2-B".to_string()));
}

#[tokio::test]
async fn test_weeks_are_fetched_in_ascending_order() {
    let resolver = resolver(site()).with_settings(semester_settings());
    let events = resolver.events_between_weeks(39, 42).await.unwrap();

    assert_eq!(
        titles(&events),
        vec!["Woche 39", "Woche 40", "Woche 41", "Woche 42"]
    );
    assert_eq!(resolver.source.posted_weeks(), vec!["39", "40", "41", "42"]);
}

#[tokio::test]
async fn test_failing_week_fails_whole_range_by_default() {
    let mut source = site();
    source.failing_weeks.insert(40);
    let resolver = resolver(source).with_settings(semester_settings());

    let result = resolver.events_between_weeks(39, 42).await;
    assert!(matches!(result, Err(Error::Timeout)));
    // nothing after the failing week is requested
    assert_eq!(resolver.source.posted_weeks(), vec!["39", "40"]);
}

#[tokio::test]
async fn test_skip_policy_leaves_out_bad_weeks() {
    let mut source = site();
    source.failing_weeks.insert(40);
    source.week_pages.insert(41, "<p>maintenance</p>".to_string());
    let resolver = resolver(source)
        .with_settings(semester_settings())
        .with_policy(WeekErrorPolicy::SkipBadWeeks);

    let events = resolver.events_between_weeks(39, 42).await.unwrap();
    assert_eq!(titles(&events), vec!["Woche 39", "Woche 42"]);
}

#[tokio::test]
async fn test_skip_policy_still_fails_on_missing_group() {
    let mut source = site();
    source.groups_page = groups_page(&["WR2-A", "WR2-B"]);
    let resolver = resolver(source)
        .with_settings(student_set_settings())
        .with_policy(WeekErrorPolicy::SkipBadWeeks);

    assert!(matches!(
        resolver.events_between_weeks(39, 40).await,
        Err(Error::MissingSetting(SettingLevel::Group))
    ));
}

#[tokio::test]
async fn test_events_between_dates() {
    let resolver = resolver(site()).with_settings(semester_settings());
    let from = NaiveDate::from_ymd_opt(2024, 9, 25).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 10, 7).unwrap();

    let events = resolver.events_between_dates(from, to).await.unwrap();
    assert_eq!(titles(&events), vec!["Woche 39", "Woche 40", "Woche 41"]);

    let empty = resolver.events_between_dates(to, from).await.unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_week_range_continues_past_year_end() {
    let resolver = resolver(FakeSource::default());
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    assert_eq!(
        resolver
            .week_range(date(2024, 9, 23), date(2024, 12, 20))
            .unwrap(),
        Some((39, 51))
    );
    // 2026 has 53 weeks: week 2 of 2027 continues as week 55
    assert_eq!(
        resolver
            .week_range(date(2026, 9, 21), date(2027, 1, 15))
            .unwrap(),
        Some((39, 55))
    );
    assert_eq!(
        resolver
            .week_range(date(2024, 10, 1), date(2024, 9, 1))
            .unwrap(),
        None
    );
}
