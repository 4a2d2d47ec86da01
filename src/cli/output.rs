use std::io::IsTerminal;

use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(format: &str) -> Option<Self> {
        match format {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub pretty: bool,
    pub use_color: bool,
}

/// Resolve whether to emit ANSI colors from the flag and the config's
/// `color` setting (auto|always|never).
pub fn detect_color(color_flag: bool, setting: &str) -> bool {
    if !color_flag || setting == "never" {
        return false;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    setting == "always" || std::io::stdout().is_terminal()
}

pub fn print_json<T: Serialize>(value: &T, opts: &OutputOptions) -> Result<()> {
    let json = if opts.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_formats() {
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn no_color_flag_disables_color() {
        assert!(!detect_color(false, "always"));
        assert!(!detect_color(true, "never"));
    }
}
