use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::builders::importer::FileImporter;
use crate::builders::patterns::NamePattern;
use crate::core::config::{self, CONFIG_VERSION};
use crate::reports::{self, ArrayType};

/// The `ConfigValidator` trait defines the public interface for validating the
/// parser configuration.
///
/// Validation collects every problem it finds instead of stopping at the
/// first one, so `--check` can report them all at once.
pub trait ConfigValidator {
    /// Performs a full validation of the `ParserConfig` and returns a list of
    /// issues found.
    ///
    /// # Arguments
    /// * `config`: The `ParserConfig` to be validated.
    ///
    /// # Returns
    /// A `Result<Vec<String>>` where each string describes one issue. An empty
    /// vector means the configuration is usable.
    fn validate_config(&self, config: &config::ParserConfig) -> Result<Vec<String>>;

    /// Validates a single member-name pattern.
    ///
    /// # Arguments
    /// * `pattern`: The glob to be validated.
    fn validate_pattern(&self, pattern: &str) -> Result<Vec<String>>;
}

/// The `StandardValidator` checks versions, array types, patterns and that
/// every custom template compiles.
pub struct StandardValidator {
    importer: FileImporter,
}

impl StandardValidator {
    /// # Arguments
    /// * `base_dir`: Directory relative template files are resolved against.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            importer: FileImporter::new(base_dir),
        }
    }

    /// Two reports writing the same table for the same array would clobber
    /// each other's output.
    fn check_table_conflicts(&self, reports: &[config::ReportDefinition]) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for report in reports {
            let key = (report.array.to_ascii_lowercase(), report.table.clone());
            if !seen.insert(key) {
                warnings.push(format!(
                    "Duplicate table {} for array {}",
                    report.table, report.array
                ));
            }
        }
        warnings
    }

    /// Compiles every template bundled with the catalog.
    pub fn validate_builtin_templates(&self) -> Vec<String> {
        reports::builtin_templates()
            .filter_map(|template| template.compile().err())
            .map(|e| format!("{:#}", e))
            .collect()
    }
}

impl ConfigValidator for StandardValidator {
    fn validate_config(&self, config: &config::ParserConfig) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if config.version != CONFIG_VERSION {
            issues.push(format!("Unsupported config version: {}", config.version));
        }

        issues.extend(self.check_table_conflicts(&config.reports));

        for report in &config.reports {
            if let Err(e) = report.array.parse::<ArrayType>() {
                issues.push(format!("Report {}: {}", report.table, e));
            }
            if report.patterns.is_empty() {
                issues.push(format!("Report {} has no patterns", report.table));
            }
            for pattern in &report.patterns {
                for issue in self.validate_pattern(pattern)? {
                    issues.push(format!("Report {}: {}", report.table, issue));
                }
            }
            if let Err(e) = self.importer.import_report(report) {
                issues.push(format!("Report {}: {:#}", report.table, e));
            }
        }

        Ok(issues)
    }

    fn validate_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if let Err(e) = NamePattern::new(pattern) {
            issues.push(format!("{:#}", e));
        }

        if pattern.is_empty() {
            issues.push("Empty pattern will match nothing".to_string());
        }
        if pattern == "*" {
            issues.push("Pattern '*' will match every member".to_string());
        }

        Ok(issues)
    }
}
