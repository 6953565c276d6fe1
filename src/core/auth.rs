use std::path::{Path, PathBuf};

use crate::core::config::{ClaudeConfig, GeminiConfig};

pub const CLAUDE_SESSION_KEY_ENV: &str = "CLAUDE_SESSION_KEY";
pub const CLAUDE_ORG_ID_ENV: &str = "CLAUDE_ORG_ID";

// --- Claude web session ---

/// claude.ai session cookie plus the organization it belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaudeSession {
    pub session_key: String,
    pub organization_id: String,
}

impl ClaudeSession {
    /// Resolve the session from config, letting environment variables win.
    /// Both values are trimmed; pasted cookies often carry a trailing newline.
    pub fn resolve(config: &ClaudeConfig) -> Self {
        let pick = |env: &str, fallback: &str| {
            std::env::var(env)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
                .trim()
                .to_string()
        };
        Self {
            session_key: pick(CLAUDE_SESSION_KEY_ENV, &config.session_key),
            organization_id: pick(CLAUDE_ORG_ID_ENV, &config.organization_id),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.session_key.is_empty() && !self.organization_id.is_empty()
    }
}

// --- Gemini CLI credentials ---

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
}

/// Expand a leading `~/` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None if path == "~" => home_dir(),
        None => PathBuf::from(path),
    }
}

/// Location of the Gemini CLI OAuth credentials file.
pub fn gemini_credentials_path(config: &GeminiConfig) -> PathBuf {
    match config.credentials_path.as_deref() {
        Some(p) if !p.trim().is_empty() => expand_tilde(p.trim()),
        _ => home_dir().join(".gemini").join("oauth_creds.json"),
    }
}

/// Presence probe only; content is validated at fetch time.
pub fn has_gemini_credentials(path: &Path) -> bool {
    path.is_file()
}
