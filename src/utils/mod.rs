use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

use ntsparser::builders::importer::{FileImporter, TemplateImporter};
use ntsparser::builders::reporter::{ConsoleReporter, RunReporter, RunSummary};
use ntsparser::builders::validator::StandardValidator;
use ntsparser::builders::writer::TableWriter;
use ntsparser::core::config::{ConfigManager, ConfigProvider};
use ntsparser::core::engine::ReportEngine;
use ntsparser::reports::{self, ArrayType};

pub fn initialize_config(config_path: &Path) -> Result<()> {
    let config_manager = ConfigManager::new(config_path);
    if config_path.exists() {
        println!("✓ Config already exists at {}", config_path.display());
    } else {
        config_manager.initialize()?;
        println!("✓ Wrote default config to {}", config_path.display());
    }
    Ok(())
}

/// Validates the config file and every bundled template.
pub fn check_config(config_path: &Path) -> Result<()> {
    let config_manager = ConfigManager::new(config_path);

    let broken = StandardValidator::new(config_manager.base_dir()).validate_builtin_templates();
    if broken.is_empty() {
        println!("✓ All {} built-in templates compile.", reports::builtin_templates().count());
    } else {
        println!("⚠️  Found broken built-in templates:");
        for issue in &broken {
            println!("  - {issue}");
        }
    }

    config_manager.validate_config()?;
    config_manager.list_reports()?;

    if !broken.is_empty() {
        bail!("Built-in template validation failed.");
    }
    Ok(())
}

/// Prints the header of a built-in template (by its catalog name, e.g.
/// `vnx/getrg.textfsm`) or of a template file.
pub fn print_header(template: &str) -> Result<()> {
    let definition = match reports::find_builtin(template) {
        Some(builtin) => builtin.compile()?,
        None => FileImporter::new(".").import_from_file(Path::new(template))?,
    };
    println!("{}", definition.header().join(", "));

    let keys = definition.key_columns();
    if !keys.is_empty() {
        println!("Key: {}", keys.join(", "));
    }
    Ok(())
}

pub fn generate_report(
    config_path: &Path,
    array: ArrayType,
    inputs: &[PathBuf],
    output: &Path,
    verbose: bool,
) -> Result<()> {
    // Reject the output format before the inputs are read.
    let writer = TableWriter::for_path(output)?;

    let config_manager = ConfigManager::new(config_path);
    tracing::debug!(config = %config_manager.get_config_path()?.display(), "loading config");
    let engine = ReportEngine::from_manager(&config_manager)?;

    let items = engine.load(inputs)?;
    let workbook = engine.build(array, &items)?;
    writer.write(&workbook, output)?;

    ConsoleReporter::new(verbose).report_run(&RunSummary {
        array,
        members: items.len(),
        output,
        workbook: &workbook,
    })
}
