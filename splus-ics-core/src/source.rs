use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};

use crate::{Error, Result, config::SourceConfig};

/// Access to the pages of the Splus site
///
/// Kept behind a trait so the settings resolver can be driven by canned
/// pages in tests.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetches a page with GET
    async fn get(&self, url: &str) -> Result<String>;

    /// Submits a form with POST and returns the resulting page
    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<String>;
}

/// `RemoteSource` over HTTP
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("text/html,*/*;q=0.8"),
                );
                headers.insert(
                    header::ACCEPT_LANGUAGE,
                    header::HeaderValue::from_static("de-DE,de;q=0.9"),
                );
                headers
            })
            .build()?;

        Ok(Self { client })
    }

    fn handle_error_req(&self, url: &str, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else if error.is_request() || error.is_connect() {
            Error::SourceUnavailable {
                url: url.to_string(),
                message: format!("Request failed: {}", error),
            }
        } else {
            Error::Http(error)
        }
    }

    async fn read_page(&self, url: &str, response: reqwest::Response) -> Result<String> {
        if !response.status().is_success() {
            return Err(Error::SourceUnavailable {
                url: url.to_string(),
                message: format!("HTTP {} error", response.status()),
            });
        }
        response
            .text()
            .await
            .map_err(|e| self.handle_error_req(url, e))
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn get(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.handle_error_req(url, e))?;
        self.read_page(url, response).await
    }

    async fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<String> {
        tracing::debug!("POST {} {:?}", url, fields);
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(|e| self.handle_error_req(url, e))?;
        self.read_page(url, response).await
    }
}
