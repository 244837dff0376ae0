use flate2::Compression;
use flate2::write::GzEncoder;
use ntsparser::builders::writer::TableWriter;
use ntsparser::core::archive::{ArchiveLoader, load_inputs};
use ntsparser::core::config::ConfigManager;
use ntsparser::core::engine::ReportEngine;
use ntsparser::core::extractor::FieldValue;
use ntsparser::reports::ArrayType;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const SHOWSYS: &str = "                                                ---------------(MB)----------------
    ID --Name--- ---Model---- -Serial- Nodes Master TotalCap AllocCap FreeCap FailedCap
 12345 3par01    HP_3PAR 7200   1612345     2      0  1000000   500000  500000         0
";

const SHOWNODE: &str = "                                                                 Control    Data        Cache
Node --Name--- -State- Master InCluster -Service_LED- ---LED--- Mem(MB) Mem(MB) Available(%)
   0 1612345-0 OK      Yes    Yes       Off           GreenBlnk    8192    8192          100
   1 1612345-1 OK      No     Yes       Off           GreenBlnk    8192    8192          100
";

const SHOWPORT: &str = "N:S:P      Mode State ----Node_WWN---- -Port_WWN/HW_Addr- Type
0:0:1 initiator ready 50002ACFF70185A6   50002AC0010185A6 disk
0:1:1    target ready 2FF70002AC0185A6   20110002AC0185A6 host
";

const PORT_TEMPLATE: &str = "Value Port (\\d+:\\d+:\\d+)
Value Mode (\\S+)
Value State (\\S+)

Start
  ^${Port}\\s+${Mode}\\s+${State} -> Record
";

fn tar_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// An outer tar.gz holding the system output and an inner tar with the rest.
fn write_dump(dir: &Path) -> std::path::PathBuf {
    let inner = tar_bytes(&[
        ("3par01/shownode_-d.out", SHOWNODE.as_bytes()),
        ("3par01/showport.out", SHOWPORT.as_bytes()),
    ]);
    let outer = tar_bytes(&[
        ("3par01/showsys.out", SHOWSYS.as_bytes()),
        ("3par01/cli_outputs.tar", inner.as_slice()),
        ("3par01/core.bin", [0xffu8, 0xfe, 0x00].as_slice()),
    ]);
    let path = dir.join("3par01_dump.tar.gz");
    fs::write(&path, gzip(&outer)).unwrap();
    path
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    fs::create_dir_all(dir.join("templates")).unwrap();
    fs::write(dir.join("templates/showport.textfsm"), PORT_TEMPLATE).unwrap();

    let path = dir.join("ntsparser.toml");
    fs::write(
        &path,
        r#"
version = "1.0"

[[reports]]
array = "3par"
sheet = "Ports"
table = "PortsTable"
patterns = ["*showport.out"]
template_file = "templates/showport.textfsm"
"#,
    )
    .unwrap();
    path
}

#[test]
fn test_nested_archive_is_flattened() {
    let td = TempDir::new().unwrap();
    let dump = write_dump(td.path());

    let items = load_inputs(&[&dump]).unwrap();
    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "3par01/showsys.out",
            "3par01/shownode_-d.out",
            "3par01/showport.out",
        ]
    );

    // One level is not enough to reach the inner tar.
    let shallow = ArchiveLoader::new(1).load(&[&dump]).unwrap();
    assert_eq!(shallow.len(), 1);
}

#[test]
fn test_gz_file_and_missing_input() {
    let td = TempDir::new().unwrap();
    let path = td.path().join("showsys.out.gz");
    fs::write(&path, gzip(SHOWSYS.as_bytes())).unwrap();

    let items = load_inputs(&[&path]).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "showsys.out");
    assert_eq!(items[0].text, SHOWSYS);

    assert!(load_inputs(&[td.path().join("nope.tar")]).is_err());
}

#[test]
fn test_core_workflow() {
    let td = TempDir::new().unwrap();
    let dump = write_dump(td.path());
    let config_path = write_config(td.path());

    // 1. Load config and run the built-in and custom reports.
    let engine = ReportEngine::from_manager(&ConfigManager::new(&config_path)).unwrap();
    let workbook = engine.run(ArrayType::ThreePar, &[&dump]).unwrap();

    let names: Vec<&str> = workbook.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["NodesTable", "HostsTable", "PortsTable"]);

    let nodes = workbook.table("NodesTable").unwrap();
    assert_eq!(nodes.rows.len(), 2);
    assert_eq!(nodes.rows[0][0], FieldValue::from("3par01"));

    // No showhost output in the dump: the table is kept with its header only.
    let hosts = workbook.table("HostsTable").unwrap();
    assert!(hosts.rows.is_empty());
    assert!(!hosts.header.is_empty());

    let ports = workbook.table("PortsTable").unwrap();
    assert_eq!(ports.header, vec!["Port", "Mode", "State"]);
    assert_eq!(ports.rows.len(), 2);
    assert_eq!(ports.rows[1][1], FieldValue::from("target"));

    // 2. Write JSON and read it back.
    let output = td.path().join("report.json");
    TableWriter::for_path(&output)
        .unwrap()
        .write(&workbook, &output)
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["tables"][2]["sheet"], "Ports");
    assert_eq!(value["tables"][2]["rows"][0][0], "0:0:1");
}

#[test]
fn test_directory_input_for_array_without_builtins() {
    let td = TempDir::new().unwrap();
    let dump = td.path().join("dump");
    fs::create_dir_all(dump.join("eva01")).unwrap();
    fs::write(dump.join("eva01/showport.out"), SHOWPORT).unwrap();

    let config_path = write_config(td.path());
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("array = \"3par\"", "array = \"eva\"");
    fs::write(&config_path, config).unwrap();

    let engine = ReportEngine::from_manager(&ConfigManager::new(&config_path)).unwrap();
    let workbook = engine.run(ArrayType::Eva, &[&dump]).unwrap();
    assert_eq!(workbook.tables.len(), 1);
    assert_eq!(workbook.row_count(), 2);
}

#[test]
fn test_zip_dump_is_loaded() {
    use zip::write::SimpleFileOptions;

    let td = TempDir::new().unwrap();
    let path = td.path().join("APM001_dump.zip");
    let mut writer = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    writer
        .start_file("APM001/SPA_cfg_info.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"Array Name: VNX01\n").unwrap();
    writer.finish().unwrap();

    let items = load_inputs(&[&path]).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "APM001/SPA_cfg_info.txt");
    assert_eq!(items[0].text, "Array Name: VNX01\n");
}
