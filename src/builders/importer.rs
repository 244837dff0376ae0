use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::ReportDefinition;
use crate::core::template::{TemplateDefinition, compile};

/// A trait that defines how template source text is obtained and compiled.
///
/// Built-in reports compile sources embedded in the binary; custom reports
/// from the config file go through an importer so their templates can live
/// next to the config or inline in it.
pub trait TemplateImporter {
    /// Reads and compiles a template file.
    ///
    /// # Arguments
    /// * `path`: Path to the template, resolved by the importer.
    ///
    /// # Returns
    /// The compiled template, or an error naming the file and, for syntax
    /// errors, the offending template line.
    fn import_from_file(&self, path: &Path) -> Result<TemplateDefinition>;

    /// Compiles template source that is already in memory.
    ///
    /// # Arguments
    /// * `name`: Label used in error messages.
    /// * `source`: The template text.
    fn import_from_str(&self, name: &str, source: &str) -> Result<TemplateDefinition> {
        compile(source).with_context(|| format!("Failed to compile template {}", name))
    }
}

/// Importer for templates on disk, resolving relative paths against a base
/// directory (normally the directory holding the config file).
pub struct FileImporter {
    base_dir: PathBuf,
}

impl TemplateImporter for FileImporter {
    fn import_from_file(&self, path: &Path) -> Result<TemplateDefinition> {
        let resolved = self.resolve(path);
        let source = fs::read_to_string(&resolved)
            .with_context(|| format!("Failed to read template file {}", resolved.display()))?;
        self.import_from_str(&resolved.display().to_string(), &source)
    }
}

impl FileImporter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Compiles the template of a custom report, inline or from its file.
    /// Exactly one of the two has to be given.
    pub fn import_report(&self, report: &ReportDefinition) -> Result<TemplateDefinition> {
        match (&report.template, &report.template_file) {
            (Some(source), None) => self.import_from_str(&report.table, source),
            (None, Some(path)) => self.import_from_file(path),
            (Some(_), Some(_)) => anyhow::bail!(
                "Report {} sets both 'template' and 'template_file'",
                report.table
            ),
            (None, None) => anyhow::bail!(
                "Report {} needs either 'template' or 'template_file'",
                report.table
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn report() -> ReportDefinition {
        ReportDefinition {
            array: "vmax".to_string(),
            sheet: "Sheet".to_string(),
            table: "Table".to_string(),
            patterns: vec!["*.txt".to_string()],
            separator: None,
            template_file: None,
            template: None,
            eof_policy: None,
        }
    }

    #[test]
    fn test_import_relative_file() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("templates")).unwrap();
        fs::write(
            dir.path().join("templates/ids.textfsm"),
            "Value Id (\\d+)\n\nStart\n  ^${Id} -> Record\n",
        )
        .unwrap();

        let importer = FileImporter::new(dir.path());
        let def = importer
            .import_from_file(Path::new("templates/ids.textfsm"))
            .unwrap();
        assert_eq!(def.header(), vec!["Id"]);
    }

    #[test]
    fn test_compile_error_mentions_template() {
        let importer = FileImporter::new(".");
        let err = importer
            .import_from_str("broken", "Value Id (\\d+)\n\nStart\n  ^${Nope}\n")
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("broken"));
        assert!(message.contains("line 4"));
    }

    #[test]
    fn test_report_needs_exactly_one_source() {
        let importer = FileImporter::new(".");
        assert!(importer.import_report(&report()).is_err());

        let mut both = report();
        both.template = Some("Value A (a)\n\nStart\n  ^a\n".to_string());
        both.template_file = Some(PathBuf::from("a.textfsm"));
        assert!(importer.import_report(&both).is_err());

        let mut inline = report();
        inline.template = Some("Value A (a)\n\nStart\n  ^${A} -> Record\n".to_string());
        assert_eq!(importer.import_report(&inline).unwrap().header(), vec!["A"]);
    }
}
