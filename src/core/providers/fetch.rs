use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::core::providers::Source;

/// Per-request bound for source HTTP calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Boxed future returned by [`UsageSource::fetch`].
pub type FetchFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Fetch contract the monitor consumes for each source.
pub trait UsageSource: Send + Sync {
    type Usage: Clone + PartialEq + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Cheap local check; must not block on I/O beyond a stat or env read.
    fn has_credentials(&self) -> bool;

    fn fetch(&self) -> FetchFuture<'_, Self::Usage, Self::Error>;
}

/// Build the shared HTTP client used by the source clients.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("burnout/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Validate that a resolved endpoint URL uses HTTPS.
///
/// Sources that allow endpoint overrides call this before sending
/// credentials, to prevent exfiltration over plain HTTP or other schemes.
pub fn validate_endpoint(url: &str, source: Source) -> anyhow::Result<()> {
    if !url.starts_with("https://") {
        anyhow::bail!(
            "{}: endpoint must use HTTPS, got: {}",
            source.display_name(),
            url
        );
    }
    Ok(())
}
