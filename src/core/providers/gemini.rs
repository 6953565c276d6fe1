use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::auth::has_gemini_credentials;
use crate::core::models::usage::{CliUsage, ModelBucket};
use crate::core::process::{run_command, which};
use crate::core::providers::fetch::{http_client, validate_endpoint, FetchFuture, UsageSource};
use crate::core::providers::Source;

const QUOTA_URL: &str = "https://cloudcode-pa.googleapis.com/v1internal:retrieveUserQuota";
const QUOTA_PROJECT: &str = "gemini-cli-placeholder";

/// How long the Gemini CLI gets to refresh its token.
const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum CliUsageError {
    #[error("Gemini CLI credentials not found. Run 'gemini auth login' in your terminal.")]
    CredentialsNotFound,
    #[error("Invalid Gemini CLI credentials. Try running 'gemini auth login' again.")]
    InvalidCredentials,
    #[error("Gemini session expired. Run any 'gemini' command to refresh.")]
    SessionExpired,
    #[error("API Error {code}: {message}")]
    Api { code: u16, message: String },
    #[error("Could not parse API response.")]
    InvalidResponse,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

// --- Credential file ---

#[derive(Deserialize)]
struct GeminiOAuthCreds {
    access_token: String,
    #[allow(dead_code)]
    expiry_date: Option<u64>, // Unix timestamp in milliseconds
}

fn parse_access_token(content: &str) -> Result<String, CliUsageError> {
    let creds: GeminiOAuthCreds = serde_json::from_str(content).map_err(|e| {
        warn!("Failed to parse Gemini credentials: {}", e);
        CliUsageError::InvalidCredentials
    })?;
    if creds.access_token.trim().is_empty() {
        return Err(CliUsageError::InvalidCredentials);
    }
    Ok(creds.access_token)
}

// --- API response ---

#[derive(Deserialize)]
struct QuotaResponse {
    #[serde(default)]
    buckets: Vec<ModelBucket>,
}

fn decode_quota(body: &str, fetched_at: DateTime<Utc>) -> Result<CliUsage, CliUsageError> {
    let data: QuotaResponse = serde_json::from_str(body).map_err(|e| {
        warn!("Failed to decode Gemini quota response: {}", e);
        CliUsageError::InvalidResponse
    })?;
    Ok(CliUsage {
        buckets: data.buckets,
        last_updated: fetched_at,
    })
}

/// Ask the Gemini CLI to refresh its OAuth token by running a cheap command.
async fn refresh_session() -> anyhow::Result<()> {
    if which("gemini").is_none() {
        anyhow::bail!("`gemini` not found in PATH");
    }
    run_command("gemini", &["models", "list"], REFRESH_TIMEOUT).await?;
    Ok(())
}

/// Client for the Gemini CLI quota endpoint.
pub struct GeminiCliClient {
    credentials_path: PathBuf,
    quota_url: String,
    http: reqwest::Client,
}

impl GeminiCliClient {
    pub fn new(credentials_path: PathBuf, endpoint: Option<&str>) -> anyhow::Result<Self> {
        let quota_url = endpoint.unwrap_or(QUOTA_URL).to_string();
        validate_endpoint(&quota_url, Source::Gemini)?;
        Ok(Self {
            credentials_path,
            quota_url,
            http: http_client()?,
        })
    }

    fn read_access_token(&self) -> Result<String, CliUsageError> {
        if !has_gemini_credentials(&self.credentials_path) {
            return Err(CliUsageError::CredentialsNotFound);
        }
        let content = std::fs::read_to_string(&self.credentials_path).map_err(|e| {
            warn!("Failed to read {}: {}", self.credentials_path.display(), e);
            CliUsageError::InvalidCredentials
        })?;
        parse_access_token(&content)
    }

    async fn request_quota(&self, token: &str) -> Result<reqwest::Response, CliUsageError> {
        let response = self
            .http
            .post(&self.quota_url)
            .bearer_auth(token)
            .json(&serde_json::json!({ "project": QUOTA_PROJECT }))
            .send()
            .await?;
        Ok(response)
    }

    /// Fetch quota buckets, refreshing the CLI session once on 401.
    pub async fn fetch_usage(&self) -> Result<CliUsage, CliUsageError> {
        let token = self.read_access_token()?;
        let mut response = self.request_quota(&token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            info!("Gemini token expired, attempting refresh via gemini CLI");
            if let Err(e) = refresh_session().await {
                warn!("Gemini auto-refresh failed: {:#}", e);
                return Err(CliUsageError::SessionExpired);
            }
            let token = self.read_access_token()?;
            response = self.request_quota(&token).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(CliUsageError::SessionExpired);
            }
        }

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            debug!("Gemini quota API returned {}: {}", status, body);
            return Err(CliUsageError::Api {
                code: status.as_u16(),
                message: body,
            });
        }

        decode_quota(&body, Utc::now())
    }
}

impl UsageSource for GeminiCliClient {
    type Usage = CliUsage;
    type Error = CliUsageError;

    fn has_credentials(&self) -> bool {
        has_gemini_credentials(&self.credentials_path)
    }

    fn fetch(&self) -> FetchFuture<'_, CliUsage, CliUsageError> {
        Box::pin(self.fetch_usage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_quota_buckets() {
        let json = r#"{
          "buckets": [
            {
              "remainingAmount": "45",
              "remainingFraction": 0.45,
              "resetTime": "2025-10-30T10:00:00Z",
              "tokenType": "requests_per_minute",
              "modelId": "gemini-1.5-pro"
            },
            {
              "remainingAmount": "100",
              "remainingFraction": 1.0,
              "resetTime": "2025-10-30T10:00:00Z",
              "tokenType": "requests_per_minute",
              "modelId": "gemini-1.5-flash"
            }
          ]
        }"#;
        let now = Utc::now();
        let usage = decode_quota(json, now).unwrap();
        assert_eq!(usage.buckets.len(), 2);
        assert_eq!(usage.last_updated, now);

        let pro = usage.pro_bucket().unwrap();
        assert!((pro.usage_percentage() - 55.0).abs() < 1e-9);
        let flash = usage
            .buckets
            .iter()
            .find(|b| b.model_id == "gemini-1.5-flash")
            .unwrap();
        assert_eq!(flash.usage_percentage(), 0.0);
    }

    #[test]
    fn decode_missing_buckets_is_empty() {
        let usage = decode_quota("{}", Utc::now()).unwrap();
        assert!(usage.buckets.is_empty());
        assert_eq!(usage.max_usage_percentage(), 0.0);
    }

    #[test]
    fn decode_garbage_is_invalid_response() {
        let err = decode_quota("not json", Utc::now()).unwrap_err();
        assert!(matches!(err, CliUsageError::InvalidResponse));
    }

    #[test]
    fn parse_access_token_minimal() {
        let token = parse_access_token(r#"{ "access_token": "ya29.abc", "expiry_date": 1234567890 }"#)
            .unwrap();
        assert_eq!(token, "ya29.abc");
    }

    #[test]
    fn parse_access_token_rejects_empty_or_missing() {
        assert!(matches!(
            parse_access_token(r#"{ "access_token": "" }"#),
            Err(CliUsageError::InvalidCredentials)
        ));
        assert!(matches!(
            parse_access_token(r#"{ "refresh_token": "1//x" }"#),
            Err(CliUsageError::InvalidCredentials)
        ));
    }

    #[test]
    fn api_error_message_includes_code() {
        let err = CliUsageError::Api {
            code: 429,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "API Error 429: quota exceeded");
    }

    #[tokio::test]
    async fn missing_credentials_file() {
        let client = GeminiCliClient::new(
            PathBuf::from("/nonexistent/burnout/oauth_creds.json"),
            None,
        )
        .unwrap();
        assert!(!client.has_credentials());
        let err = client.fetch_usage().await.unwrap_err();
        assert!(matches!(err, CliUsageError::CredentialsNotFound));
    }

    #[tokio::test]
    async fn unreadable_credentials_are_invalid() {
        let path = std::env::temp_dir().join("burnout_gemini_bad_creds.json");
        std::fs::write(&path, "{ not json").unwrap();
        let client = GeminiCliClient::new(path.clone(), None).unwrap();
        assert!(client.has_credentials());
        let err = client.fetch_usage().await.unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, CliUsageError::InvalidCredentials));
    }

    #[test]
    fn rejects_plain_http_endpoint() {
        assert!(GeminiCliClient::new(PathBuf::from("/tmp/x"), Some("http://quota.local")).is_err());
    }
}
