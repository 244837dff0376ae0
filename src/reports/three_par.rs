//! 3PAR reports. Every command output is preceded by `showsys`, which
//! supplies the array name and serial to the rows that follow it.

use anyhow::Result;

use crate::core::extractor::Record;
use crate::core::router::star_separator;
use crate::reports::helpers::group_by;
use crate::reports::{BuiltinTemplate, ReportContext, Table, Workbook};

pub const SHOWNODE: BuiltinTemplate = BuiltinTemplate {
    name: "three_par/shownode.textfsm",
    source: include_str!("../../templates/three_par/shownode.textfsm"),
};

pub const SHOWHOST: BuiltinTemplate = BuiltinTemplate {
    name: "three_par/showhost.textfsm",
    source: include_str!("../../templates/three_par/showhost.textfsm"),
};

pub const SHOWHOST_VERBOSE: BuiltinTemplate = BuiltinTemplate {
    name: "three_par/showhost_verbose.textfsm",
    source: include_str!("../../templates/three_par/showhost_verbose.textfsm"),
};

pub const TEMPLATES: &[BuiltinTemplate] = &[SHOWNODE, SHOWHOST, SHOWHOST_VERBOSE];

const SHOWSYS: &str = "*showsys.out";

/// Columns identifying a host line: array name, serial, id, host name, WWN.
const HOST_KEY: &[usize] = &[0, 1, 2, 3, 4];
/// Columns identifying a verbose host block; the first four of [`HOST_KEY`].
const DETAIL_KEY: &[usize] = &[0, 1, 2, 3];

pub fn build(ctx: &ReportContext<'_>, workbook: &mut Workbook) -> Result<()> {
    let separator = star_separator();

    let nodes = ctx.content(&[SHOWSYS, "*shownode_-d.out"], &separator)?;
    let rows = ctx.run(&SHOWNODE, &nodes)?;
    workbook.add(Table::new("NodesTable", "Nodes", SHOWNODE.header()?, rows));

    let hosts = ctx.content(&[SHOWSYS, "*showhost_-verbose.out"], &separator)?;
    self::hosts(ctx, &hosts, workbook)
}

/// Hosts: each `showhost` line extended with the details of its verbose
/// block. Hosts without a verbose block are left out.
pub fn hosts(ctx: &ReportContext<'_>, content: &str, workbook: &mut Workbook) -> Result<()> {
    let detail_header = SHOWHOST_VERBOSE.header()?;
    let header: Vec<String> = SHOWHOST
        .header()?
        .into_iter()
        .chain(detail_header.into_iter().skip(DETAIL_KEY.len()))
        .collect();

    let hosts = group_by(ctx.run(&SHOWHOST, content)?, HOST_KEY);
    let details = group_by(ctx.run(&SHOWHOST_VERBOSE, content)?, DETAIL_KEY);

    let mut rows: Vec<Record> = Vec::new();
    for (key, host_rows) in &hosts {
        let Some(detail_rows) = details.get(&key[..DETAIL_KEY.len()]) else {
            continue;
        };
        for (host, detail) in host_rows.iter().zip(detail_rows) {
            let mut row = host.clone();
            row.extend(detail.iter().skip(DETAIL_KEY.len()).cloned());
            rows.push(row);
        }
    }

    workbook.add(Table::new("HostsTable", "Hosts", header, rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::FieldValue;
    use crate::core::router::ContentItem;
    use crate::reports::ArrayType;

    const SHOWSYS_TEXT: &str = "                                                ---------------(MB)----------------
    ID --Name--- ---Model---- -Serial- Nodes Master TotalCap AllocCap FreeCap FailedCap
 12345 3par01    HP_3PAR 7200   1612345     2      0  1000000   500000  500000         0
";

    const SHOWNODE_TEXT: &str = "                                                                 Control    Data        Cache
Node --Name--- -State- Master InCluster -Service_LED- ---LED--- Mem(MB) Mem(MB) Available(%)
   0 1612345-0 OK      Yes    Yes       Off           GreenBlnk    8192    8192          100
   1 1612345-1 OK      No     Yes       Off           GreenBlnk    8192    8192          100
";

    const SHOWHOST_TEXT: &str = "Id Name     Domain Persona -WWN/iSCSI_Name- Port  IP_addr
 1 esx01    -      VMware  100000109B123456 0:1:1 n/a
 2 esx02    -      VMware  100000109B654321 1:1:1 n/a

--------- Host esx01 ---------
Name     : esx01
Domain   : -
Id       : 1
Location : DC1
IP Addr  : n/a
OS       : ESXi 6.5
Model    : ProLiant
";

    fn items() -> Vec<ContentItem> {
        vec![
            ContentItem::new("3par01/showsys.out", SHOWSYS_TEXT),
            ContentItem::new("3par01/shownode_-d.out", SHOWNODE_TEXT),
            ContentItem::new("3par01/showhost_-verbose.out", SHOWHOST_TEXT),
        ]
    }

    #[test]
    fn test_nodes_carry_system_columns() {
        let items = items();
        let ctx = ReportContext::new(ArrayType::ThreePar, &items);
        let mut workbook = Workbook::new();
        build(&ctx, &mut workbook).unwrap();

        let nodes = workbook.table("NodesTable").unwrap();
        assert_eq!(nodes.rows.len(), 2);
        for (i, row) in nodes.rows.iter().enumerate() {
            assert_eq!(row[0], FieldValue::from("3par01"));
            assert_eq!(row[1], FieldValue::from("1612345"));
            assert_eq!(row[2], FieldValue::from(i.to_string()));
        }
        assert_eq!(nodes.rows[1][5], FieldValue::from("No"));
    }

    #[test]
    fn test_hosts_join_verbose_details() {
        let items = items();
        let ctx = ReportContext::new(ArrayType::ThreePar, &items);
        let mut workbook = Workbook::new();
        build(&ctx, &mut workbook).unwrap();

        let hosts = workbook.table("HostsTable").unwrap();
        assert_eq!(hosts.header.len(), 12);
        assert_eq!(&hosts.header[9..], &["Location", "OS", "Model"]);
        // esx02 has no verbose block.
        assert_eq!(hosts.rows.len(), 1);
        let row = &hosts.rows[0];
        assert_eq!(row[3], FieldValue::from("esx01"));
        assert_eq!(row[9], FieldValue::from("DC1"));
        assert_eq!(row[10], FieldValue::from("ESXi 6.5"));
        assert_eq!(row[11], FieldValue::from("ProLiant"));
    }
}
