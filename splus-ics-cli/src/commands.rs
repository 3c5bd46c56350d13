use std::io;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use splus_ics_core::{
    ics::IcsExporter,
    prelude::*,
    resolver::{SettingsResolver, WeekErrorPolicy},
    source::HttpSource,
};

/// Where to fetch from
pub struct SourceParams {
    pub config: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Ics,
    Json,
}

/// Requested span of the schedule
pub enum Range {
    Weeks(u32, u32),
    Dates(NaiveDate, NaiveDate),
}

/// Export command parameters
pub struct ExportParams {
    pub faculty: String,
    pub plan: String,
    pub study_path: String,
    pub group: Option<String>,
    pub range: Range,
    pub output: Option<String>,
    pub format: OutputFormat,
    pub calendar_name: Option<String>,
    pub skip_bad_weeks: bool,
}

fn create_resolver(params: SourceParams) -> Result<SettingsResolver<HttpSource>> {
    let mut config = match params.config {
        Some(path) => SourceConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => SourceConfig::default(),
    };
    if let Some(timeout) = params.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(base_url) = params.base_url {
        config = config.with_base_url(base_url)?;
    }
    let source = HttpSource::new(&config)?;
    Ok(SettingsResolver::new(source, config))
}

/// Walks the chain level by level, failing on the first unknown entry
async fn select_chain(
    resolver: &mut SettingsResolver<HttpSource>,
    chain: &[(SettingLevel, &str)],
) -> Result<()> {
    for &(level, input) in chain {
        let choice = resolver
            .select(level, Selection::parse(input))
            .await?
            .with_context(|| format!("No {} matching {:?}", level, input))?;
        eprintln!("✓ {}: {}", level, choice.label);
    }
    Ok(())
}

fn print_catalog(level: SettingLevel, catalog: &Catalog) {
    if catalog.is_empty() {
        println!("No {} found", level);
        return;
    }
    for choice in catalog {
        println!("  {}", choice);
    }
}

/// List faculties command
pub async fn faculties_command(source: SourceParams) -> Result<()> {
    let resolver = create_resolver(source)?;
    let catalog = resolver.faculties().await?;
    print_catalog(SettingLevel::Faculty, &catalog);
    Ok(())
}

/// List plans command
pub async fn plans_command(source: SourceParams, faculty: String) -> Result<()> {
    let mut resolver = create_resolver(source)?;
    select_chain(&mut resolver, &[(SettingLevel::Faculty, faculty.as_str())]).await?;
    let catalog = resolver.plans().await?;
    print_catalog(SettingLevel::Plan, &catalog);
    Ok(())
}

/// List study paths command
pub async fn study_paths_command(source: SourceParams, faculty: String, plan: String) -> Result<()> {
    let mut resolver = create_resolver(source)?;
    select_chain(
        &mut resolver,
        &[(SettingLevel::Faculty, faculty.as_str()), (SettingLevel::Plan, plan.as_str())],
    )
    .await?;
    let catalog = resolver.study_paths().await?;
    print_catalog(SettingLevel::StudyPath, &catalog);
    Ok(())
}

/// List groups command
pub async fn groups_command(
    source: SourceParams,
    faculty: String,
    plan: String,
    study_path: String,
) -> Result<()> {
    let mut resolver = create_resolver(source)?;
    select_chain(
        &mut resolver,
        &[
            (SettingLevel::Faculty, faculty.as_str()),
            (SettingLevel::Plan, plan.as_str()),
            (SettingLevel::StudyPath, study_path.as_str()),
        ],
    )
    .await?;
    let catalog = resolver.groups().await?;
    print_catalog(SettingLevel::Group, &catalog);
    Ok(())
}

/// Export command
pub async fn export_command(source: SourceParams, params: ExportParams) -> Result<()> {
    let policy = if params.skip_bad_weeks {
        WeekErrorPolicy::SkipBadWeeks
    } else {
        WeekErrorPolicy::FailRange
    };
    let mut resolver = create_resolver(source)?.with_policy(policy);

    let mut chain = vec![
        (SettingLevel::Faculty, params.faculty.as_str()),
        (SettingLevel::Plan, params.plan.as_str()),
        (SettingLevel::StudyPath, params.study_path.as_str()),
    ];
    if let Some(ref group) = params.group {
        chain.push((SettingLevel::Group, group.as_str()));
    }
    select_chain(&mut resolver, &chain).await?;

    let (first, last) = match params.range {
        Range::Weeks(first, last) => (first, last),
        Range::Dates(from, to) => match resolver.week_range(from, to)? {
            Some(weeks) => weeks,
            None => anyhow::bail!("{} is after {}", from, to),
        },
    };

    tracing::info!("Fetching weeks {}-{}", first, last);
    let events = resolver.events_between_weeks(first, last).await?;
    eprintln!("✓ Fetched {} events from weeks {}-{}", events.len(), first, last);

    let content = match params.format {
        OutputFormat::Ics => {
            let study_path = resolver.settings().require(SettingLevel::StudyPath)?;
            let options = IcsOptions {
                calendar_name: params
                    .calendar_name
                    .or_else(|| Some(format!("Splus {}", study_path.label))),
            };
            IcsExporter::new(options).generate(&events)?
        }
        OutputFormat::Json => serde_json::to_string_pretty(&resolver.response((first, last), events))?,
    };

    match params.output {
        Some(path) => {
            tokio::fs::write(&path, content).await?;
            eprintln!("✓ Saved to {}", path);
        }
        None => {
            use io::Write;
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}
