use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use splus_ics_core::{
    ics::IcsExporter,
    prelude::*,
    resolver::{SettingsResolver, WeekErrorPolicy},
    source::HttpSource,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: SourceConfig,
    pub source: HttpSource,
}

impl AppState {
    fn resolver(&self) -> SettingsResolver<HttpSource> {
        SettingsResolver::new(self.source.clone(), self.config.clone())
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Catalog query; the deepest given level decides which catalog is listed
#[derive(Deserialize)]
struct CatalogQuery {
    faculty: Option<String>,
    plan: Option<String>,
    study_path: Option<String>,
}

#[derive(Serialize)]
struct CatalogResponse {
    level: SettingLevel,
    entries: Catalog,
}

/// Calendar query, levels given as catalog index or label
#[derive(Deserialize)]
struct CalendarQuery {
    faculty: String,
    plan: String,
    study_path: String,
    group: Option<String>,
    from_week: Option<u32>,
    to_week: Option<u32>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    format: Option<String>, // "json" or "ics", defaults to "ics"
    calendar_name: Option<String>,
    #[serde(default)]
    skip_bad_weeks: bool,
}

pub fn create_app(config: SourceConfig) -> Result<Router, splus_ics_core::Error> {
    let source = HttpSource::new(&config)?;
    let state = AppState { config, source };

    let router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/catalog", get(catalog_handler))
        .route("/calendar", get(calendar_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    Ok(router)
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "Splus ICS Calendar Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Exports Splus timetables as ICS calendars",
        "endpoints": {
            "health": "/health",
            "catalog": "/catalog",
            "calendar": "/calendar"
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Sets each given level, in chain order
async fn select_all(
    resolver: &mut SettingsResolver<HttpSource>,
    chain: &[(SettingLevel, Option<&String>)],
) -> Result<(), AppError> {
    for &(level, input) in chain {
        if let Some(input) = input {
            resolver.select(level, Selection::parse(input)).await?;
        }
    }
    Ok(())
}

async fn catalog_handler(
    Query(params): Query<CatalogQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let level = if params.study_path.is_some() {
        SettingLevel::Group
    } else if params.plan.is_some() {
        SettingLevel::StudyPath
    } else if params.faculty.is_some() {
        SettingLevel::Plan
    } else {
        SettingLevel::Faculty
    };

    let mut resolver = state.resolver();
    select_all(
        &mut resolver,
        &[
            (SettingLevel::Faculty, params.faculty.as_ref()),
            (SettingLevel::Plan, params.plan.as_ref()),
            (SettingLevel::StudyPath, params.study_path.as_ref()),
        ],
    )
    .await?;

    let entries = resolver.catalog(level).await?;
    Ok(Json(CatalogResponse { level, entries }))
}

async fn calendar_handler(
    Query(params): Query<CalendarQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let policy = if params.skip_bad_weeks {
        WeekErrorPolicy::SkipBadWeeks
    } else {
        WeekErrorPolicy::FailRange
    };
    let mut resolver = state.resolver().with_policy(policy);

    let weeks = match (params.from_week, params.to_week, params.from, params.to) {
        (Some(first), Some(last), _, _) => Some((first, last)),
        (_, _, Some(from), Some(to)) => resolver.week_range(from, to)?,
        _ => {
            return Err(AppError(splus_ics_core::Error::Config(
                "Either from_week and to_week or from and to are required".to_string(),
            )));
        }
    };

    select_all(
        &mut resolver,
        &[
            (SettingLevel::Faculty, Some(&params.faculty)),
            (SettingLevel::Plan, Some(&params.plan)),
            (SettingLevel::StudyPath, Some(&params.study_path)),
            (SettingLevel::Group, params.group.as_ref()),
        ],
    )
    .await?;

    let events = match weeks {
        Some((first, last)) => resolver.events_between_weeks(first, last).await?,
        None => Vec::new(),
    };

    match params.format.as_deref() {
        Some("json") => {
            let weeks = weeks.unwrap_or_default();
            Ok(Json(resolver.response(weeks, events)).into_response())
        }
        _ => {
            let study_path = resolver.settings().require(SettingLevel::StudyPath)?;
            let options = IcsOptions {
                calendar_name: params
                    .calendar_name
                    .or_else(|| Some(format!("Splus {}", study_path.label))),
            };
            let ics_content = IcsExporter::new(options).generate(&events)?;

            Ok((
                StatusCode::OK,
                [("Content-Type", "text/calendar; charset=utf-8")],
                ics_content,
            )
                .into_response())
        }
    }
}

/// Application error type
#[derive(Debug)]
struct AppError(splus_ics_core::Error);

impl AppError {
    fn status(&self) -> (StatusCode, &'static str) {
        use splus_ics_core::Error;

        match &self.0 {
            Error::MissingSetting(_) | Error::OptionIndex { .. } | Error::Config(_) => {
                (StatusCode::BAD_REQUEST, "Invalid settings")
            }
            Error::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Request timeout"),
            e if e.is_source_unavailable() => (StatusCode::BAD_GATEWAY, "Splus unavailable"),
            e if e.is_grid_error() => (StatusCode::BAD_GATEWAY, "Unreadable timetable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        }

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            message: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<splus_ics_core::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
