//! XtremIO reports, read from the XMS `Show*.out` command dumps.

use anyhow::Result;

use crate::core::router::star_separator;
use crate::reports::{BuiltinTemplate, ReportContext, Table, Workbook};

pub const SHOW_TARGETS: BuiltinTemplate = BuiltinTemplate {
    name: "xtremio/show_targets.textfsm",
    source: include_str!("../../templates/xtremio/show_targets.textfsm"),
};

pub const TEMPLATES: &[BuiltinTemplate] = &[SHOW_TARGETS];

pub fn build(ctx: &ReportContext<'_>, workbook: &mut Workbook) -> Result<()> {
    let content = ctx.content(&["*ShowTargets.out"], &star_separator())?;
    let rows = ctx.run(&SHOW_TARGETS, &content)?;
    workbook.add(Table::new("TargetPortsTable", "Target Ports", SHOW_TARGETS.header()?, rows));
    Ok(())
}
