use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::builders::importer::FileImporter;
use crate::builders::patterns::NamePattern;
use crate::core::archive::ArchiveLoader;
use crate::core::config::{ConfigManager, ConfigProvider, ParserConfig, ReportDefinition};
use crate::core::extractor::Extractor;
use crate::core::router::{self, ContentItem};
use crate::reports::{ArrayType, ReportContext, Table, Workbook, catalog};

/// Runs a whole report: load the inputs, run the built-in reports of the
/// array type, then the custom reports from the config.
pub struct ReportEngine {
    config: ParserConfig,
    importer: FileImporter,
    loader: ArchiveLoader,
}

impl ReportEngine {
    /// # Arguments
    /// * `config`: The parser configuration.
    /// * `base_dir`: Directory relative `template_file` entries resolve against.
    pub fn new(config: ParserConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            importer: FileImporter::new(base_dir),
            loader: ArchiveLoader::default(),
        }
    }

    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let config = manager.load_config()?;
        Ok(Self::new(config, manager.base_dir()))
    }

    pub fn with_loader(mut self, loader: ArchiveLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn load<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<Vec<ContentItem>> {
        let items = self.loader.load(inputs)?;
        if items.is_empty() {
            warn!("no readable members found in the inputs");
        }
        Ok(items)
    }

    pub fn run<P: AsRef<Path>>(&self, array: ArrayType, inputs: &[P]) -> Result<Workbook> {
        let items = self.load(inputs)?;
        self.build(array, &items)
    }

    /// Builds every table for `array` from already loaded items.
    pub fn build(&self, array: ArrayType, items: &[ContentItem]) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        let ctx = ReportContext::new(array, items);

        info!(array = %array, items = items.len(), "building reports");
        (catalog().get(&array))(&ctx, &mut workbook)
            .with_context(|| format!("Failed to build the {} reports", array))?;

        for report in self.config.reports_for(array.as_str()) {
            self.run_custom(report, items, &mut workbook)?;
        }
        Ok(workbook)
    }

    fn run_custom(
        &self,
        report: &ReportDefinition,
        items: &[ContentItem],
        workbook: &mut Workbook,
    ) -> Result<()> {
        let definition = self.importer.import_report(report)?;
        let patterns = NamePattern::parse_all(&report.patterns)
            .with_context(|| format!("Invalid patterns in report {}", report.table))?;
        let separator = report.separator.as_deref().unwrap_or(&self.config.separator);
        let text = router::concatenate(items, &patterns, separator);
        debug!(table = %report.table, bytes = text.len(), "custom report input");

        let policy = report.eof_policy.unwrap_or(self.config.eof_policy);
        // An aborted scan empties this table only; the other reports still run.
        let rows = match Extractor::new(&definition).with_eof_policy(policy).run(&text) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table = %report.table, error = %e, "template aborted, table left empty");
                Vec::new()
            }
        };

        workbook.add(Table::new(
            report.table.as_str(),
            report.sheet.as_str(),
            definition.header(),
            rows,
        ));
        Ok(())
    }
}
