use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
    pub verbose: bool,
}

impl OutputOptions {
    /// Serialize a payload according to `pretty`.
    pub fn to_json<T: serde::Serialize>(&self, value: &T) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

pub fn parse_format(json_flag: bool, format: Option<&str>) -> OutputFormat {
    if json_flag {
        return OutputFormat::Json;
    }
    match format {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Text,
    }
}

pub fn detect_color(color_flag: bool) -> bool {
    if !color_flag {
        return false;
    }
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins() {
        assert_eq!(parse_format(true, Some("text")), OutputFormat::Json);
        assert_eq!(parse_format(false, Some("json")), OutputFormat::Json);
        assert_eq!(parse_format(false, Some("yaml")), OutputFormat::Text);
        assert_eq!(parse_format(false, None), OutputFormat::Text);
    }

    #[test]
    fn color_disabled_by_flag() {
        assert!(!detect_color(false));
    }

    #[test]
    fn to_json_respects_pretty() {
        let mut opts = OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
            use_color: false,
            verbose: false,
        };
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(opts.to_json(&value).unwrap(), r#"{"a":1}"#);
        opts.pretty = true;
        assert!(opts.to_json(&value).unwrap().contains('\n'));
    }
}
