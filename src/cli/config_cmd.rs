use anyhow::Result;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::core::auth::{gemini_credentials_path, has_gemini_credentials, ClaudeSession};
use crate::core::config::AppConfig;
use crate::core::providers::Source;

pub fn init(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    match AppConfig::default().save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
            println!(
                "  Add your Claude {} to enable the Claude source.",
                Source::Claude.auth_hint()
            );
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn path(_opts: &OutputOptions) -> Result<()> {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

fn credentials_present(config: &AppConfig, source: Source) -> bool {
    match source {
        Source::Claude => ClaudeSession::resolve(&config.claude).is_complete(),
        Source::Gemini => has_gemini_credentials(&gemini_credentials_path(&config.gemini)),
    }
}

/// Flip a source on or off. Returns false when it was already in that state.
fn set_enabled(config: &mut AppConfig, source: Source, enabled: bool) -> bool {
    let flag = match source {
        Source::Claude => &mut config.claude.enabled,
        Source::Gemini => &mut config.gemini.enabled,
    };
    if *flag == enabled {
        return false;
    }
    *flag = enabled;
    true
}

fn toggle(source_id: &str, enabled: bool) -> Result<()> {
    let source = match Source::from_id(source_id) {
        Some(s) => s,
        None => {
            eprintln!("Unknown source: {} (expected claude or gemini)", source_id);
            std::process::exit(1);
        }
    };

    let mut config = AppConfig::load()?;
    let verb = if enabled { "enabled" } else { "disabled" };
    if !set_enabled(&mut config, source, enabled) {
        eprintln!("Source '{}' is already {}", source.id(), verb);
        std::process::exit(1);
    }

    config.save()?;
    println!("{} source: {}", if enabled { "Enabled" } else { "Disabled" }, source.id());
    Ok(())
}

pub fn enable(source_id: &str, _opts: &OutputOptions) -> Result<()> {
    toggle(source_id, true)
}

pub fn disable(source_id: &str, _opts: &OutputOptions) -> Result<()> {
    toggle(source_id, false)
}

#[derive(serde::Serialize)]
struct SourceCheck {
    source: Source,
    enabled: bool,
    credentials: bool,
}

fn source_checks(config: &AppConfig) -> Vec<SourceCheck> {
    Source::all()
        .iter()
        .map(|&source| SourceCheck {
            source,
            enabled: config.is_enabled(source),
            credentials: credentials_present(config, source),
        })
        .collect()
}

pub fn check(opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `burnout config init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    let checks = source_checks(&config);

    if opts.format == OutputFormat::Json {
        let payload = serde_json::json!({
            "path": path,
            "valid": issues.is_empty(),
            "issues": issues,
            "sources": checks,
        });
        println!("{}", opts.to_json(&payload)?);
        if !issues.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    if !issues.is_empty() {
        eprintln!("Config issues found in {}:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }

    println!("Config is valid: {}", path.display());
    for check in &checks {
        let status = match (check.enabled, check.credentials) {
            (false, _) => "disabled".to_string(),
            (true, true) => "ready".to_string(),
            (true, false) => format!("missing credentials: {}", check.source.auth_hint()),
        };
        println!("  {:<7} {}", check.source.display_name(), status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_enabled_reports_change() {
        let mut config = AppConfig::default();
        assert!(!set_enabled(&mut config, Source::Claude, true));
        assert!(set_enabled(&mut config, Source::Claude, false));
        assert!(!config.claude.enabled);
        assert!(config.gemini.enabled);
        assert!(set_enabled(&mut config, Source::Claude, true));
    }

    #[test]
    fn checks_cover_both_sources() {
        let mut config = AppConfig::default();
        config.gemini.enabled = false;
        config.gemini.credentials_path = Some("/nonexistent/burnout/oauth_creds.json".to_string());
        let checks = source_checks(&config);
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].source, Source::Claude);
        assert!(checks[0].enabled);
        assert_eq!(checks[1].source, Source::Gemini);
        assert!(!checks[1].enabled);
        assert!(!checks[1].credentials);
    }
}
