//! Output utilities for CLI tools.

use std::fs::File;
use std::io::Write;
use std::path::Path;

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

/// Output configuration.
pub struct Output {
    pub format: OutputFormat,
    pub file: Option<String>,
}

impl Output {
    /// Creates a new output configuration.
    pub fn new(format: OutputFormat, file: Option<String>) -> Self {
        Self { format, file }
    }

    /// Renders a value in the configured format.
    pub fn render<T: Serialize>(&self, value: &T) -> anyhow::Result<String> {
        let output = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
        };
        Ok(output)
    }

    /// Outputs the result to the output file, or stdout.
    pub fn write<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let output = self.render(value)?;

        match &self.file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(output.as_bytes())?;
            }
            None => {
                println!("{}", output);
            }
        }

        Ok(())
    }

    /// Writes binary data to a file.
    pub fn write_binary(&self, data: &[u8], path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(data)?;
        Ok(())
    }
}
