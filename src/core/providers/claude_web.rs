use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::core::auth::ClaudeSession;
use crate::core::models::usage::{parse_reset_time, UsageWindow, WebUsage};
use crate::core::providers::fetch::{http_client, validate_endpoint, FetchFuture, UsageSource};
use crate::core::providers::Source;

const DEFAULT_API_BASE: &str = "https://claude.ai/api";

#[derive(Error, Debug)]
pub enum WebUsageError {
    #[error("Please enter both Organization ID and Session Key.")]
    InvalidCredentials,
    #[error("Session expired. Please update your session key.")]
    SessionExpired,
    #[error("Unable to connect: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid response from server.")]
    InvalidResponse,
}

#[derive(Deserialize)]
struct ClaudeWindowRaw {
    utilization: f64,
    resets_at: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeUsageResponse {
    five_hour: Option<ClaudeWindowRaw>,
    seven_day: Option<ClaudeWindowRaw>,
}

fn parse_window(raw: Option<ClaudeWindowRaw>) -> UsageWindow {
    let Some(raw) = raw else {
        return UsageWindow::new(0.0, None);
    };
    let resets_at = raw.resets_at.as_deref().and_then(|s| match parse_reset_time(s) {
        Ok(dt) => Some(dt),
        Err(e) => {
            debug!("Ignoring Claude reset time: {}", e);
            None
        }
    });
    UsageWindow::new(raw.utilization, resets_at)
}

fn decode_usage(body: &str) -> Result<WebUsage, WebUsageError> {
    let data: ClaudeUsageResponse = serde_json::from_str(body).map_err(|e| {
        debug!("Failed to decode Claude usage: {}", e);
        WebUsageError::InvalidResponse
    })?;
    Ok(WebUsage {
        five_hour: parse_window(data.five_hour),
        seven_day: parse_window(data.seven_day),
    })
}

fn check_status(status: StatusCode) -> Result<(), WebUsageError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(WebUsageError::SessionExpired);
    }
    if status != StatusCode::OK {
        return Err(WebUsageError::InvalidResponse);
    }
    Ok(())
}

/// Client for the claude.ai organization usage endpoint.
pub struct ClaudeWebClient {
    session: ClaudeSession,
    api_base: String,
    http: reqwest::Client,
}

impl ClaudeWebClient {
    pub fn new(session: ClaudeSession, endpoint: Option<&str>) -> anyhow::Result<Self> {
        let api_base = endpoint
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        validate_endpoint(&api_base, Source::Claude)?;
        Ok(Self {
            session,
            api_base,
            http: http_client()?,
        })
    }

    fn usage_url(&self) -> String {
        format!(
            "{}/organizations/{}/usage",
            self.api_base, self.session.organization_id
        )
    }

    /// Fetch usage for the configured organization.
    pub async fn fetch_usage(&self) -> Result<WebUsage, WebUsageError> {
        if !self.session.is_complete() {
            return Err(WebUsageError::InvalidCredentials);
        }

        let response = self
            .http
            .get(self.usage_url())
            .header("Cookie", format!("sessionKey={}", self.session.session_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        check_status(response.status())?;

        let body = response.text().await?;
        decode_usage(&body)
    }
}

impl UsageSource for ClaudeWebClient {
    type Usage = WebUsage;
    type Error = WebUsageError;

    fn has_credentials(&self) -> bool {
        self.session.is_complete()
    }

    fn fetch(&self) -> FetchFuture<'_, WebUsage, WebUsageError> {
        Box::pin(self.fetch_usage())
    }
}
