mod commands;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{ExportParams, OutputFormat};

#[derive(Parser)]
#[command(name = "splus-ics")]
#[command(about = "Splus timetable export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with source settings
    #[arg(long, global = true)]
    config: Option<String>,

    /// Base URL of the Splus installation
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Settings chain, each level given as catalog index or label
#[derive(Args)]
struct Chain {
    /// Faculty
    #[arg(short, long)]
    faculty: String,

    /// Plan
    #[arg(short, long)]
    plan: String,

    /// Study path
    #[arg(short, long)]
    study_path: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List faculties
    Faculties,

    /// List the plans of a faculty
    Plans {
        /// Faculty
        #[arg(short, long)]
        faculty: String,
    },

    /// List the study paths of a plan
    StudyPaths {
        /// Faculty
        #[arg(short, long)]
        faculty: String,

        /// Plan
        #[arg(short, long)]
        plan: String,
    },

    /// List the groups of a study path
    Groups {
        #[command(flatten)]
        chain: Chain,
    },

    /// Fetch a range of weeks and export the events
    Export {
        #[command(flatten)]
        chain: Chain,

        /// Group (student set plans only)
        #[arg(short, long)]
        group: Option<String>,

        /// First week number
        #[arg(long, requires = "to_week", conflicts_with = "from")]
        from_week: Option<u32>,

        /// Last week number, may exceed the week count of the year
        #[arg(long, requires = "from_week")]
        to_week: Option<u32>,

        /// First day (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "ics")]
        format: OutputFormat,

        /// Calendar name
        #[arg(long)]
        calendar_name: Option<String>,

        /// Leave out weeks that cannot be fetched instead of failing
        #[arg(long)]
        skip_bad_weeks: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("splus_ics_cli={0},splus_ics_core={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let source = commands::SourceParams {
        config: cli.config,
        base_url: cli.base_url,
        timeout: cli.timeout,
    };

    match cli.command {
        Commands::Faculties => commands::faculties_command(source).await,

        Commands::Plans { faculty } => commands::plans_command(source, faculty).await,

        Commands::StudyPaths { faculty, plan } => {
            commands::study_paths_command(source, faculty, plan).await
        }

        Commands::Groups { chain } => {
            commands::groups_command(source, chain.faculty, chain.plan, chain.study_path).await
        }

        Commands::Export {
            chain,
            group,
            from_week,
            to_week,
            from,
            to,
            output,
            format,
            calendar_name,
            skip_bad_weeks,
        } => {
            let range = match (from_week, to_week, from, to) {
                (Some(first), Some(last), _, _) => commands::Range::Weeks(first, last),
                (_, _, Some(from), Some(to)) => commands::Range::Dates(from, to),
                _ => anyhow::bail!("Give either --from-week/--to-week or --from/--to"),
            };

            commands::export_command(
                source,
                ExportParams {
                    faculty: chain.faculty,
                    plan: chain.plan,
                    study_path: chain.study_path,
                    group,
                    range,
                    output,
                    format,
                    calendar_name,
                    skip_bad_weeks,
                },
            )
            .await
        }
    }
}
