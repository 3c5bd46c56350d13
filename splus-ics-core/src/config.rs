use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://splus.ostfalia.de/";

/// Where the Splus site lives and how its navigation pages are laid out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root of the site; every catalog value is appended to it
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Plans with this label are browsed by student set and need a group
    pub student_set_plan_label: String,
    /// Substring of the option values that denote study paths
    pub study_path_marker: String,
    /// Form listing the study paths of a student set plan
    pub filter_form: String,
    /// Form listing the groups of a study path
    pub group_form: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("Splus-ICS-Rust/", env!("CARGO_PKG_VERSION")).to_string(),
            student_set_plan_label: "Studentensetpläne".to_string(),
            study_path_marker: "SPLUS".to_string(),
            filter_form: "formfilter".to_string(),
            group_form: "form33".to_string(),
        }
    }
}

impl SourceConfig {
    /// Reads a JSON file; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        let base_url = config.base_url.clone();
        config.with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let mut base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://: {}",
                base_url
            )));
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Absolute URL of a catalog value
    pub fn url_for(&self, value: &str) -> String {
        format!("{}{}", self.base_url, value)
    }
}
