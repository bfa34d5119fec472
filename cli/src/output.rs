//! Output utilities for the CLI.

use std::io::Write;

use serde::Serialize;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// YAML format (default).
    #[default]
    Yaml,
    /// JSON format.
    Json,
}

/// How structured results are printed to stdout.
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    /// Picks JSON when `json` is set, YAML otherwise.
    pub fn stdout(json: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Yaml
        };
        Self { format }
    }

    /// Renders `value` in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        Ok(match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)? + "\n",
        })
    }

    /// Outputs the result.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let output = self.render(value)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(output.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        score: f64,
    }

    #[test]
    fn test_render_formats() {
        let row = Row {
            name: "alice",
            score: 1.5,
        };
        let yaml = Output::stdout(false).render(&row).unwrap();
        assert_eq!(yaml, "name: alice\nscore: 1.5\n");

        let json = Output::stdout(true).render(&row).unwrap();
        let back: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["name"], "alice");
        assert_eq!(back["score"], 1.5);
    }

    #[test]
    fn test_format_selection() {
        assert_eq!(Output::stdout(true).format, OutputFormat::Json);
        assert_eq!(Output::stdout(false).format, OutputFormat::Yaml);
        let list = Output::stdout(true).render(&vec![1, 2, 3]).unwrap();
        assert_eq!(serde_json::from_str::<Vec<i32>>(&list).unwrap(), vec![1, 2, 3]);
    }
}
