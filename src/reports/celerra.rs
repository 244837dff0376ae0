//! Celerra reports, read from the `cmd_outputs` directory of a NAS collect.

use std::collections::HashMap;

use anyhow::Result;

use crate::builders::dispatch::Dispatch;
use crate::builders::record::FromRecord;
use crate::core::extractor::{FieldValue, Record};
use crate::core::router::star_separator;
use crate::reports::helpers::split_words;
use crate::reports::{BuiltinTemplate, ReportContext, Table, Workbook};

pub const NAS_SUMMARY: BuiltinTemplate = BuiltinTemplate {
    name: "celerra/nas_summary.textfsm",
    source: include_str!("../../templates/celerra/nas_summary.textfsm"),
};

pub const SERVER_DF: BuiltinTemplate = BuiltinTemplate {
    name: "celerra/server_df.textfsm",
    source: include_str!("../../templates/celerra/server_df.textfsm"),
};

pub const SERVER_EXPORT: BuiltinTemplate = BuiltinTemplate {
    name: "celerra/server_export.textfsm",
    source: include_str!("../../templates/celerra/server_export.textfsm"),
};

pub const TEMPLATES: &[BuiltinTemplate] = &[NAS_SUMMARY, SERVER_DF, SERVER_EXPORT];

const HOSTNAME: &str = "*cmd_outputs/hostname";

const SMB_COLUMNS: &[&str] = &[
    "ArrayName", "DataMover", "ShareName", "SharePath", "RootPath", "Type", "umask", "maxusr",
    "netbios", "comment",
];
const NFS_COLUMNS: &[&str] = &[
    "Hostname", "Server", "MountedPath", "FileSystem", "Type", "rw", "root", "access",
];
const MULTIPROTOCOL_COLUMNS: &[&str] = &["Hostname", "Server", "MountedPath", "Type"];

const EXPORT: &str = "export";
const SHARE: &str = "share";
const MULTIPROTOCOL: &str = "multiprotocol";

crate::record_struct! {
    /// One line of `server_export` output.
    pub struct ExportRow {
        hostname => "Hostname",
        server => "Server",
        mounted_path => "MountedPath",
        row_type => "Type",
        properties => "Properties",
    }
}

impl ExportRow {
    /// Host plus the last path segment, without the hidden-share `$`.
    fn share_key(&self) -> (String, String) {
        share_key(&self.hostname.to_string(), &self.mounted_path.to_string())
    }

    fn export_key(&self) -> (String, String) {
        let path = self.mounted_path.to_string();
        let last = path.rsplit('/').next().unwrap_or_default().to_string();
        (self.hostname.to_string(), last)
    }
}

fn share_key(host: &str, path: &str) -> (String, String) {
    let last = path.rsplit('/').next().unwrap_or_default();
    (host.to_string(), last.trim_matches('$').to_string())
}

pub fn build(ctx: &ReportContext<'_>, workbook: &mut Workbook) -> Result<()> {
    let nas_summary = ctx.content(&[HOSTNAME, "*cmd_outputs/nas_summary"], "\n")?;
    single_table(ctx, &NAS_SUMMARY, &nas_summary, "NASSummaryTable", "NAS Summary", workbook)?;

    let server_df = ctx.content(&[HOSTNAME, "*cmd_outputs/server_df"], &star_separator())?;
    single_table(ctx, &SERVER_DF, &server_df, "serverDfTable", "server_df", workbook)?;

    let server_export = ctx.content(&[HOSTNAME, "*cmd_outputs/server_export"], &star_separator())?;
    shares_and_exports(ctx, &server_export, workbook)
}

fn single_table(
    ctx: &ReportContext<'_>,
    template: &BuiltinTemplate,
    content: &str,
    name: &str,
    sheet: &str,
    workbook: &mut Workbook,
) -> Result<()> {
    let rows = ctx.run(template, content)?;
    workbook.add(Table::new(name, sheet, template.header()?, rows));
    Ok(())
}

/// SMB, NFS and Multiprotocol sheets from `server_export`.
pub fn shares_and_exports(
    ctx: &ReportContext<'_>,
    content: &str,
    workbook: &mut Workbook,
) -> Result<()> {
    ExportRow::check_header(&SERVER_EXPORT.header()?)?;
    let rows = ctx
        .run(&SERVER_EXPORT, content)?
        .into_iter()
        .map(ExportRow::from_record)
        .collect::<Result<Vec<_>, _>>()?;

    let classified = classify_rows(&rows)?;
    workbook.add(Table::new("SMBTable", "SMB", columns(SMB_COLUMNS), classified.smb));
    workbook.add(Table::new("NFSTable", "NFS", columns(NFS_COLUMNS), classified.nfs));
    workbook.add(Table::new(
        "MultiprotocolTable",
        "Multiprotocol",
        columns(MULTIPROTOCOL_COLUMNS),
        classified.multiprotocol,
    ));
    Ok(())
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

/// Rows sorted into their sheets.
#[derive(Debug, Default, PartialEq)]
pub struct Classified {
    pub smb: Vec<Record>,
    pub nfs: Vec<Record>,
    pub multiprotocol: Vec<Record>,
}

type Reshape = fn(&ExportRow) -> Result<Record>;

/// Row type to the function that reshapes a row for its sheet. Anything
/// that is neither an export nor a share is reshaped as multiprotocol.
fn reshapers() -> Dispatch<&'static str, Reshape> {
    Dispatch::new(reshape_multiprotocol as Reshape)
        .with(EXPORT, reshape_export as Reshape)
        .with(SHARE, reshape_share as Reshape)
}

/// An export and a share of the same host pointing at the same last path
/// segment are one multiprotocol entry. Remaining exports go to NFS and
/// remaining shares to SMB.
pub fn classify_rows(rows: &[ExportRow]) -> Result<Classified> {
    let reshape = reshapers();
    let of_type = |t: &str| -> Vec<&ExportRow> {
        rows.iter().filter(|r| r.row_type.to_string() == t).collect()
    };
    let exports = of_type(EXPORT);
    let shares = of_type(SHARE);

    let mut classified = Classified::default();
    for export in &exports {
        let mut shared = false;
        for share in &shares {
            if export.export_key() == share.share_key() {
                let entry = ExportRow {
                    row_type: FieldValue::from(MULTIPROTOCOL),
                    properties: FieldValue::default(),
                    ..(*share).clone()
                };
                classified
                    .multiprotocol
                    .push((reshape.get(MULTIPROTOCOL))(&entry)?);
                shared = true;
            }
        }
        if !shared {
            classified.nfs.push((reshape.get(EXPORT))(export)?);
        }
    }

    for share in &shares {
        let key = share.share_key();
        let already = classified
            .multiprotocol
            .iter()
            .any(|m| share_key(&m[0].to_string(), &m[2].to_string()) == key);
        if !already {
            classified.smb.push((reshape.get(SHARE))(share)?);
        }
    }
    Ok(classified)
}

fn reshape_multiprotocol(row: &ExportRow) -> Result<Record> {
    Ok(vec![
        row.hostname.clone(),
        row.server.clone(),
        row.mounted_path.clone(),
        FieldValue::from(MULTIPROTOCOL),
    ])
}

fn reshape_export(row: &ExportRow) -> Result<Record> {
    let properties = properties(&split_words(&row.properties.to_string())?);
    let (path, filesystem) = export_split(&row.mounted_path.to_string());
    Ok(vec![
        row.hostname.clone(),
        row.server.clone(),
        path.into(),
        filesystem.into(),
        row.row_type.clone(),
        property(&properties, "rw"),
        property(&properties, "root"),
        property(&properties, "access"),
    ])
}

fn reshape_share(row: &ExportRow) -> Result<Record> {
    let words = split_words(&row.properties.to_string())?;
    let properties = properties(&words);
    let filesystem = match words.first() {
        Some(first) if !first.contains('=') => first.as_str(),
        _ => "",
    };
    let (share_path, root_path) = share_split(filesystem);
    Ok(vec![
        row.hostname.clone(),
        row.server.clone(),
        row.mounted_path.clone(),
        share_path.into(),
        root_path.into(),
        row.row_type.clone(),
        property(&properties, "umask"),
        property(&properties, "maxusr"),
        property(&properties, "netbios"),
        property(&properties, "comment"),
    ])
}

/// `key=value` words by key. Words without exactly one `=` are ignored.
fn properties(words: &[String]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for word in words {
        let mut parts = word.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            map.entry(key.to_string()).or_default().push(value.to_string());
        }
    }
    map
}

fn property(properties: &HashMap<String, Vec<String>>, key: &str) -> FieldValue {
    FieldValue::List(properties.get(key).cloned().unwrap_or_default())
}

/// Path pieces with every `/` kept as its own piece and whitespace after a
/// slash dropped: `/a/b` gives `["", "/", "a", "/", "b"]`.
fn path_pieces(path: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = path;
    while let Some(pos) = rest.find('/') {
        pieces.push(&rest[..pos]);
        pieces.push("/");
        rest = rest[pos + 1..].trim_start();
    }
    pieces.push(rest);
    pieces
}

/// Mounted path and the file system it names (its last segment).
fn export_split(path: &str) -> (String, String) {
    let pieces = path_pieces(path);
    let last = pieces.last().copied().unwrap_or_default().to_string();
    (pieces.concat(), last)
}

/// Share path and its root: the path without the leading slash and, when it
/// has more than one segment, without the last one.
fn share_split(path: &str) -> (String, String) {
    let pieces = path_pieces(path);
    let root = if pieces.len() > 3 {
        pieces[2..pieces.len() - 2].concat()
    } else {
        pieces.get(2..).map(|p| p.concat()).unwrap_or_default()
    };
    (pieces.concat(), root)
}
