//! XIV reports, read from the `xcli` command directories of a system dump.

use anyhow::Result;

use crate::core::router::star_separator;
use crate::reports::helpers::join_on;
use crate::reports::{BuiltinTemplate, ReportContext, Table, Workbook};

pub const COD_LIST: BuiltinTemplate = BuiltinTemplate {
    name: "xiv/cod_list.textfsm",
    source: include_str!("../../templates/xiv/cod_list.textfsm"),
};

pub const VERSION_GET: BuiltinTemplate = BuiltinTemplate {
    name: "xiv/version_get.textfsm",
    source: include_str!("../../templates/xiv/version_get.textfsm"),
};

pub const CONF_GET_SYSTEM: BuiltinTemplate = BuiltinTemplate {
    name: "xiv/conf_get_system.textfsm",
    source: include_str!("../../templates/xiv/conf_get_system.textfsm"),
};

pub const TEMPLATES: &[BuiltinTemplate] = &[COD_LIST, VERSION_GET, CONF_GET_SYSTEM];

/// All three commands lead with the system name.
const SYSTEM_NAME: &[usize] = &[0];

pub fn build(ctx: &ReportContext<'_>, workbook: &mut Workbook) -> Result<()> {
    let content = ctx.content(
        &[
            "*cod_list_-f_all/cli.txt",
            "*version_get/cli.txt",
            "*conf_get_path=system/cli.txt",
        ],
        &star_separator(),
    )?;
    storage_controllers(ctx, &content, workbook)
}

/// Storage Controllers: `cod_list`, `version_get` and `conf_get` joined on
/// the system name.
pub fn storage_controllers(
    ctx: &ReportContext<'_>,
    content: &str,
    workbook: &mut Workbook,
) -> Result<()> {
    let mut header = COD_LIST.header()?;
    header.extend(VERSION_GET.header()?.into_iter().skip(SYSTEM_NAME.len()));
    header.extend(CONF_GET_SYSTEM.header()?.into_iter().skip(SYSTEM_NAME.len()));

    let rows = join_on(
        SYSTEM_NAME,
        vec![
            ctx.run(&COD_LIST, content)?,
            ctx.run(&VERSION_GET, content)?,
            ctx.run(&CONF_GET_SYSTEM, content)?,
        ],
    )?;
    workbook.add(Table::new(
        "StorageControllersTable",
        "Storage Controllers",
        header,
        rows,
    ));
    Ok(())
}
