use thiserror::Error;

use crate::types::SettingLevel;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing setting: {0} has to be selected first")]
    MissingSetting(SettingLevel),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network timeout")]
    Timeout,

    #[error("Source unavailable: {url} - {message}")]
    SourceUnavailable { url: String, message: String },

    #[error("Unexpected page layout: {0}")]
    Layout(String),

    #[error("Unknown weekday label: {0:?}")]
    UnknownWeekday(String),

    #[error("Event cell at column {index} has no day label ({columns} columns known)")]
    DayIndexOutOfRange { index: usize, columns: usize },

    #[error("No {level} at index {index} ({available} available)")]
    OptionIndex {
        level: SettingLevel,
        index: usize,
        available: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the remote site could not be reached or returned a page that
    /// cannot be interpreted.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout | Error::SourceUnavailable { .. } | Error::Layout(_)
        )
    }

    /// Errors raised by the grid interpreter for a single week document.
    pub fn is_grid_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownWeekday(_) | Error::DayIndexOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
