//! Job configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Conversion job configuration (loaded from a TOML file)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    pub input: InputConfig,
    pub signals: SignalsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// BLF files to convert, each producing its own output folder
    pub blf_files: Vec<PathBuf>,
    pub dbc_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalsConfig {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: TargetFormat,
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub sequential: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Mf4,
    #[default]
    Csv,
}

impl From<TargetFormat> for blf_convert::OutputFormat {
    fn from(format: TargetFormat) -> Self {
        match format {
            TargetFormat::Mf4 => blf_convert::OutputFormat::Mf4,
            TargetFormat::Csv => blf_convert::OutputFormat::Csv,
        }
    }
}

/// Load a job configuration from a TOML file
pub fn load_config(path: &Path) -> Result<JobConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: JobConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            blf_files = ["trace.blf"]
            dbc_files = ["powertrain.dbc"]

            [signals]
            names = ["EngineSpeed", "VehicleSpeed"]

            [output]
            format = "csv"
            chunk_size = 50000
            overwrite = true
        "#;

        let config: JobConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.blf_files.len(), 1);
        assert_eq!(config.signals.names.len(), 2);
        assert_eq!(config.output.format, TargetFormat::Csv);
        assert_eq!(config.output.chunk_size, Some(50000));
        assert!(config.output.overwrite);
        assert!(!config.output.sequential);
    }

    #[test]
    fn test_config_defaults() {
        let toml_content = r#"
            [input]
            blf_files = ["trace.blf"]
            dbc_files = ["powertrain.dbc"]

            [signals]
            names = ["EngineSpeed"]
        "#;

        let config: JobConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.output.format, TargetFormat::Csv);
        assert_eq!(config.output.chunk_size, None);
        assert!(!config.output.overwrite);
    }
}
