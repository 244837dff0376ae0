use anyhow::Result;
use std::path::Path;

use crate::reports::{ArrayType, Table, Workbook};

/// Summary of one run, handed from `main` to the reporter once the output
/// file has been written.
#[derive(Debug)]
pub struct RunSummary<'a> {
    pub array: ArrayType,
    /// Number of archive or directory members that were read.
    pub members: usize,
    pub output: &'a Path,
    pub workbook: &'a Workbook,
}

pub trait RunReporter {
    fn report_run(&self, summary: &RunSummary<'_>) -> Result<()>;
}

/// Prints the run summary to standard output.
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// One line per table: icon, table and sheet name, row count.
    ///
    /// 🟢: the table has rows.
    /// 🟡: header only.
    fn format_table(&self, table: &Table) -> String {
        let icon = if table.is_empty() { "🟡" } else { "🟢" };
        format!(
            "{} {} [{}] ({} rows, {} columns)",
            icon,
            table.name,
            table.sheet,
            table.rows.len(),
            table.header.len()
        )
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl RunReporter for ConsoleReporter {
    fn report_run(&self, summary: &RunSummary<'_>) -> Result<()> {
        println!("📊 {} report", summary.array);
        println!("=====================================");

        if summary.workbook.tables.is_empty() {
            println!("No tables were produced.");
        }

        for table in &summary.workbook.tables {
            println!("{}", self.format_table(table));
            if self.verbose {
                println!("  └─ {}", table.header.join(", "));
            }
        }

        let empty = summary.workbook.empty_tables().count();
        println!("\n📈 Summary:");
        println!("  Members read: {}", summary.members);
        println!("  Tables: {}", summary.workbook.tables.len());
        println!("  Rows: {}", summary.workbook.row_count());
        println!("  Empty tables: {empty}");
        println!("  Output: {}", summary.output.display());

        if empty > 0 {
            println!("\n⚠️  Empty tables mean the source files were missing or held no data");
        }

        Ok(())
    }
}
