pub mod claude_web;
pub mod fetch;
pub mod gemini;

use serde::{Deserialize, Serialize};

/// One of the two independent usage providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// claude.ai usage, authenticated with a web session cookie
    Claude,
    /// Gemini CLI quota, authenticated with the CLI's OAuth credentials
    Gemini,
}

impl Source {
    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_lowercase().as_str() {
            "claude" => Some(Self::Claude),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Lowercase id, also the prefix of notification identifiers.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Claude => "asterisk",
            Self::Gemini => "sparkle",
        }
    }

    pub fn auth_hint(&self) -> &'static str {
        match self {
            Self::Claude => "session_key + organization_id (or CLAUDE_SESSION_KEY / CLAUDE_ORG_ID)",
            Self::Gemini => "auto-detected (~/.gemini/oauth_creds.json)",
        }
    }

    pub fn all() -> &'static [Source] {
        &[Source::Claude, Source::Gemini]
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_id_roundtrips() {
        for source in Source::all() {
            assert_eq!(Source::from_id(source.id()), Some(*source));
        }
        assert_eq!(Source::from_id("GEMINI"), Some(Source::Gemini));
        assert_eq!(Source::from_id("codex"), None);
    }

    #[test]
    fn icons_differ_per_source() {
        assert_eq!(Source::Claude.icon(), "asterisk");
        assert_eq!(Source::Gemini.icon(), "sparkle");
    }
}
