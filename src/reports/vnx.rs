//! VNX reports, read from the SP collect `cfg_info` and `mirror_info` dumps.

use std::collections::HashMap;

use anyhow::Result;

use crate::reports::helpers::{capacity_conversion, check_empty_arrays, take_array_names, unique_by};
use crate::reports::{BuiltinTemplate, ReportContext, Table, Workbook};

pub const ARRAY_NAME: BuiltinTemplate = BuiltinTemplate {
    name: "vnx/arrayname.textfsm",
    source: include_str!("../../templates/vnx/arrayname.textfsm"),
};

pub const GET_ARRAY_UID: BuiltinTemplate = BuiltinTemplate {
    name: "vnx/getarrayuid.textfsm",
    source: include_str!("../../templates/vnx/getarrayuid.textfsm"),
};

pub const GET_AGENT: BuiltinTemplate = BuiltinTemplate {
    name: "vnx/getagent.textfsm",
    source: include_str!("../../templates/vnx/getagent.textfsm"),
};

pub const GET_RG: BuiltinTemplate = BuiltinTemplate {
    name: "vnx/getrg.textfsm",
    source: include_str!("../../templates/vnx/getrg.textfsm"),
};

pub const MIRROR_SYNC: BuiltinTemplate = BuiltinTemplate {
    name: "vnx/mirror_sync.textfsm",
    source: include_str!("../../templates/vnx/mirror_sync.textfsm"),
};

pub const TEMPLATES: &[BuiltinTemplate] =
    &[ARRAY_NAME, GET_ARRAY_UID, GET_AGENT, GET_RG, MIRROR_SYNC];

const CFG_INFO: &[&str] = &["SPA_cfg_info.txt", "SPB_cfg_info.txt"];
const MIRROR_INFO: &[&str] = &["*SPA_mirror_info.txt", "*SPB_mirror_info.txt"];

/// Column of the summary row holding the array serial number.
const SERIAL_NO: usize = 16;
/// Blocks per TB in the RAID group capacity figures.
const BLOCKS_PER_TB: u64 = 2_147_483_648;

/// Array serial number to array name, taken from the summary sheet.
pub type ArrayNames = HashMap<String, String>;

pub fn build(ctx: &ReportContext<'_>, workbook: &mut Workbook) -> Result<()> {
    let cfg_info = ctx.content(CFG_INFO, "\n")?;
    let array_names = storage_array_summary(ctx, &cfg_info, workbook)?;
    raid_groups(ctx, &cfg_info, workbook)?;

    let mirror_info = ctx.content(MIRROR_INFO, "\n")?;
    mirror_view_s(ctx, &mirror_info, &array_names, workbook)?;
    Ok(())
}

/// Storage-Array-Summary: array name, UID and agent details side by side.
///
/// The three commands report the arrays in the same order, so their records
/// are zipped row by row. Returns the serial-number map used by the sheets
/// that only know an array by its serial.
pub fn storage_array_summary(
    ctx: &ReportContext<'_>,
    content: &str,
    workbook: &mut Workbook,
) -> Result<ArrayNames> {
    let header: Vec<String> = [ARRAY_NAME.header()?, GET_ARRAY_UID.header()?, GET_AGENT.header()?]
        .concat();

    let names = ctx.run(&ARRAY_NAME, content)?;
    let uids = ctx.run(&GET_ARRAY_UID, content)?;
    let agents = ctx.run(&GET_AGENT, content)?;

    let rows = names
        .into_iter()
        .zip(uids)
        .zip(agents)
        .map(|((name, uid), agent)| [name, uid, agent].concat())
        .collect();
    let rows = check_empty_arrays(unique_by(rows, &[0, 1]));

    let table = Table::new("StorageArraySummaryTable", "Storage-Array-Summary", header, rows);
    let mut array_names = ArrayNames::new();
    for row in &table.rows {
        if let (Some(serial), Some(name)) = (
            row.get(SERIAL_NO).and_then(|f| f.as_str()),
            row.first().and_then(|f| f.as_str()),
        ) {
            array_names.insert(serial.to_string(), name.to_string());
        }
    }
    workbook.add(table);
    Ok(array_names)
}

/// RAID-Groups, with the logical block count converted to TB.
pub fn raid_groups(ctx: &ReportContext<'_>, content: &str, workbook: &mut Workbook) -> Result<()> {
    let header = GET_RG.header()?;
    let mut rows = check_empty_arrays(unique_by(ctx.run(&GET_RG, content)?, &[0, 1]));
    for row in rows.iter_mut() {
        if row.len() > 9 {
            let blocks = row[8].as_str().unwrap_or_default().trim().to_string();
            row[9] = capacity_conversion(&blocks, BLOCKS_PER_TB).into();
        }
    }
    workbook.add(Table::new("RaidGroupsTable", "RAID-Groups", header, rows));
    Ok(())
}

pub fn mirror_view_s(
    ctx: &ReportContext<'_>,
    content: &str,
    array_names: &ArrayNames,
    workbook: &mut Workbook,
) -> Result<()> {
    let header = MIRROR_SYNC.header()?;
    let mut rows = ctx.run(&MIRROR_SYNC, content)?;
    take_array_names(&mut rows, array_names);
    let rows = unique_by(check_empty_arrays(rows), &[0]);
    workbook.add(Table::new("MirrorViewSTable", "MirrorView-S", header, rows));
    Ok(())
}
