//! VMAX reports, read from the `symcfg` text dumps.

use anyhow::Result;

use crate::reports::{BuiltinTemplate, ReportContext, Table, Workbook};

pub const LIST_TDEV: BuiltinTemplate = BuiltinTemplate {
    name: "vmax/list_tdev.textfsm",
    source: include_str!("../../templates/vmax/list_tdev.textfsm"),
};

pub const TEMPLATES: &[BuiltinTemplate] = &[LIST_TDEV];

pub fn build(ctx: &ReportContext<'_>, workbook: &mut Workbook) -> Result<()> {
    let content = ctx.content(&["*_list_tdev_gb_detail.txt"], "\n")?;
    thin_devices(ctx, &content, workbook)
}

/// thin_devices: one row per thin device and bound pool.
pub fn thin_devices(ctx: &ReportContext<'_>, content: &str, workbook: &mut Workbook) -> Result<()> {
    let rows = ctx.run(&LIST_TDEV, content)?;
    workbook.add(Table::new("ThinDevTable", "thin_devices", LIST_TDEV.header()?, rows));
    Ok(())
}
