//! Built-in report catalog.
//!
//! Each text-based vendor module ships its templates (compiled from
//! `templates/<vendor>/`) and a builder that routes the loaded content
//! through them into named tables. The array type picks the builder through
//! a [`Dispatch`] table; vendors without built-in text reports fall through
//! to a default that only logs.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builders::dispatch::Dispatch;
use crate::builders::patterns::NamePattern;
use crate::core::extractor::{EofPolicy, Extractor, FieldValue, Record};
use crate::core::router::{self, ContentItem};
use crate::core::template::{TemplateDefinition, compile};

pub mod celerra;
pub mod helpers;
pub mod three_par;
pub mod vmax;
pub mod vnx;
pub mod xiv;
pub mod xtremio;

/// Storage platforms accepted by `--array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayType {
    Vnx,
    Vmax,
    Xtremio,
    Celerra,
    #[serde(rename = "3par")]
    ThreePar,
    Ibmds,
    Isilon,
    Xiv,
    Eva,
}

impl ArrayType {
    pub const ALL: [ArrayType; 9] = [
        ArrayType::Vnx,
        ArrayType::Vmax,
        ArrayType::Xtremio,
        ArrayType::Celerra,
        ArrayType::ThreePar,
        ArrayType::Ibmds,
        ArrayType::Isilon,
        ArrayType::Xiv,
        ArrayType::Eva,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayType::Vnx => "vnx",
            ArrayType::Vmax => "vmax",
            ArrayType::Xtremio => "xtremio",
            ArrayType::Celerra => "celerra",
            ArrayType::ThreePar => "3par",
            ArrayType::Ibmds => "ibmds",
            ArrayType::Isilon => "isilon",
            ArrayType::Xiv => "xiv",
            ArrayType::Eva => "eva",
        }
    }

    /// Comma-separated list of accepted names, for help and error text.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for ArrayType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        match Self::ALL
            .iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(wanted))
        {
            Some(array) => Ok(*array),
            None => bail!(
                "Unknown array type '{}' (expected one of: {})",
                wanted,
                Self::names()
            ),
        }
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One output table: where it goes, its header and its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub sheet: String,
    /// 1-based column of the header's first cell.
    pub start_col: usize,
    /// 1-based row of the header.
    pub start_row: usize,
    pub header: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Builds a table anchored at `A1`. Every cell value is stripped of
    /// surrounding whitespace.
    pub fn new(
        name: impl Into<String>,
        sheet: impl Into<String>,
        header: Vec<String>,
        rows: Vec<Record>,
    ) -> Self {
        Self {
            name: name.into(),
            sheet: sheet.into(),
            start_col: 1,
            start_row: 1,
            header,
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(strip).collect())
                .collect(),
        }
    }

    pub fn at(mut self, start_col: usize, start_row: usize) -> Self {
        self.start_col = start_col;
        self.start_row = start_row;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn strip(field: FieldValue) -> FieldValue {
    match field {
        FieldValue::Single(s) => FieldValue::Single(s.trim().to_string()),
        FieldValue::List(items) => {
            FieldValue::List(items.iter().map(|i| i.trim().to_string()).collect())
        }
    }
}

/// The ordered set of tables produced by one run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Workbook {
    pub tables: Vec<Table>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a table. Empty tables are kept (header only) and reported.
    pub fn add(&mut self, table: Table) {
        if table.is_empty() {
            warn!(
                "There are no rows for the {} Table, {} sheet (source file or data not found)",
                table.name, table.sheet
            );
        } else {
            info!(table = %table.name, sheet = %table.sheet, rows = table.rows.len(), "table built");
        }
        self.tables.push(table);
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn empty_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| t.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

/// A template bundled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTemplate {
    /// Path below `templates/`, e.g. `vnx/getrg.textfsm`.
    pub name: &'static str,
    pub source: &'static str,
}

impl BuiltinTemplate {
    pub fn compile(&self) -> Result<TemplateDefinition> {
        compile(self.source)
            .with_context(|| format!("Failed to compile built-in template {}", self.name))
    }

    pub fn header(&self) -> Result<Vec<String>> {
        Ok(self.compile()?.header())
    }
}

/// Every template the catalog ships, vendor by vendor.
pub fn builtin_templates() -> impl Iterator<Item = &'static BuiltinTemplate> {
    vnx::TEMPLATES
        .iter()
        .chain(celerra::TEMPLATES)
        .chain(three_par::TEMPLATES)
        .chain(vmax::TEMPLATES)
        .chain(xtremio::TEMPLATES)
        .chain(xiv::TEMPLATES)
}

pub fn find_builtin(name: &str) -> Option<&'static BuiltinTemplate> {
    builtin_templates().find(|t| t.name == name)
}

/// What a report builder gets to work with.
pub struct ReportContext<'a> {
    pub array: ArrayType,
    pub items: &'a [ContentItem],
}

impl<'a> ReportContext<'a> {
    pub fn new(array: ArrayType, items: &'a [ContentItem]) -> Self {
        Self { array, items }
    }

    /// Text of the members matching `globs`, joined with `separator`.
    pub fn content(&self, globs: &[&str], separator: &str) -> Result<String> {
        let patterns = NamePattern::parse_all(globs)?;
        Ok(router::concatenate(self.items, &patterns, separator))
    }

    /// Runs a built-in template over `text`.
    pub fn run(&self, template: &BuiltinTemplate, text: &str) -> Result<Vec<Record>> {
        let definition = template.compile()?;
        let records = Extractor::new(&definition)
            .with_eof_policy(EofPolicy::Discard)
            .run(text)
            .with_context(|| format!("Template {} aborted", template.name))?;
        debug!(template = template.name, records = records.len(), "template run");
        Ok(records)
    }
}

/// Builds the tables of one array type into the workbook.
pub type ReportBuilder = fn(&ReportContext<'_>, &mut Workbook) -> Result<()>;

fn no_builtin_reports(ctx: &ReportContext<'_>, _workbook: &mut Workbook) -> Result<()> {
    warn!(
        array = %ctx.array,
        "no built-in text reports for this array type, only configured reports will run"
    );
    Ok(())
}

/// Array type to report builder.
pub fn catalog() -> Dispatch<ArrayType, ReportBuilder> {
    Dispatch::new(no_builtin_reports as ReportBuilder)
        .with(ArrayType::Vnx, vnx::build as ReportBuilder)
        .with(ArrayType::Celerra, celerra::build as ReportBuilder)
        .with(ArrayType::ThreePar, three_par::build as ReportBuilder)
        .with(ArrayType::Vmax, vmax::build as ReportBuilder)
        .with(ArrayType::Xtremio, xtremio::build as ReportBuilder)
        .with(ArrayType::Xiv, xiv::build as ReportBuilder)
}
