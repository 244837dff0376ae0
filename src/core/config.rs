use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::builders::validator::{ConfigValidator, StandardValidator};
use crate::core::extractor::EofPolicy;
use crate::core::router::star_separator;

pub const CONFIG_VERSION: &str = "1.0";

/// Program identity, built once in `main` and handed to whoever prints it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub prog_name: String,
    pub version: String,
    pub title: String,
}

impl Default for Settings {
    fn default() -> Self {
        let prog_name = env!("CARGO_PKG_NAME").to_string();
        let version = env!("CARGO_PKG_VERSION").to_string();
        let title = format!("NTS Parser {}", version);
        Self {
            prog_name,
            version,
            title,
        }
    }
}

/// A report described in the config file instead of the built-in catalog.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportDefinition {
    /// Array type the report runs for (`vnx`, `3par`, ...).
    pub array: String,
    pub sheet: String,
    pub table: String,
    /// Member-name globs selecting the input text, applied in order.
    pub patterns: Vec<String>,
    /// Overrides the config-wide separator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    /// Template file, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
    /// Inline template source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eof_policy: Option<EofPolicy>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParserConfig {
    pub version: String,
    /// End-of-text behaviour for templates without an `EOF` state.
    #[serde(default)]
    pub eof_policy: EofPolicy,
    /// Text placed between concatenated members.
    #[serde(default = "star_separator")]
    pub separator: String,
    #[serde(default)]
    pub reports: Vec<ReportDefinition>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            eof_policy: EofPolicy::default(),
            separator: star_separator(),
            reports: Vec::new(),
        }
    }
}

impl ParserConfig {
    /// Custom reports declared for `array`.
    pub fn reports_for<'a>(&'a self, array: &'a str) -> impl Iterator<Item = &'a ReportDefinition> {
        self.reports
            .iter()
            .filter(move |r| r.array.eq_ignore_ascii_case(array))
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Writes a default config unless one already exists.
    pub fn initialize(&self) -> Result<()> {
        if self.config_path.exists() {
            return Ok(());
        }

        let default_config = ParserConfig::default();
        self.save_config(&default_config)?;
        Ok(())
    }

    /// Directory `template_file` entries are resolved against.
    pub fn base_dir(&self) -> &Path {
        self.config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn validate_config(&self) -> Result<()> {
        let config = self.load_config()?;
        let validator = StandardValidator::new(self.base_dir());
        let issues = validator.validate_config(&config)?;

        if issues.is_empty() {
            println!("✓ Configuration is valid.");
            Ok(())
        } else {
            println!("⚠️  Found issues in configuration:");
            for issue in issues {
                println!("  - {issue}");
            }
            anyhow::bail!("Configuration validation failed.");
        }
    }

    pub fn list_reports(&self) -> Result<()> {
        let config = self.load_config()?;

        if config.reports.is_empty() {
            println!("No custom reports configured.");
            return Ok(());
        }

        for report in &config.reports {
            println!(
                "  📄 {} | Sheet: {} | Table: {} | Patterns: {}",
                report.array,
                report.sheet,
                report.table,
                report.patterns.join(", ")
            );
        }
        Ok(())
    }
}

pub trait ConfigProvider {
    fn load_config(&self) -> Result<ParserConfig>;
    fn save_config(&self, config: &ParserConfig) -> Result<()>;
    fn get_config_path(&self) -> Result<PathBuf>;
}

impl ConfigProvider for ConfigManager {
    fn load_config(&self) -> Result<ParserConfig> {
        if !self.config_path.exists() {
            return Ok(ParserConfig::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    fn save_config(&self, config: &ParserConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn get_config_path(&self) -> Result<PathBuf> {
        Ok(self.config_path.clone())
    }
}
