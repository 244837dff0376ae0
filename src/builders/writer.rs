use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::reports::Workbook;

/// Serialization format of the output file, chosen by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Toml,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "toml" => Ok(OutputFormat::Toml),
            "xlsx" | "xlsm" | "xls" => bail!(
                "Spreadsheet output is not supported ({}); write .json, .yaml or .toml instead",
                path.display()
            ),
            _ => bail!(
                "Cannot tell the output format of {}; use a .json, .yaml or .toml extension",
                path.display()
            ),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Toml => write!(f, "toml"),
        }
    }
}

/// Renders a [`Workbook`] to one of the serde formats.
pub struct TableWriter {
    format: OutputFormat,
}

impl TableWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn for_path(path: &Path) -> Result<Self> {
        Ok(Self::new(OutputFormat::from_path(path)?))
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render(&self, workbook: &Workbook) -> Result<String> {
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(workbook)
                .context("Failed to serialize tables to JSON")?,
            OutputFormat::Yaml => {
                serde_yaml::to_string(workbook).context("Failed to serialize tables to YAML")?
            }
            OutputFormat::Toml => {
                toml::to_string_pretty(workbook).context("Failed to serialize tables to TOML")?
            }
        };
        Ok(rendered)
    }

    pub fn write(&self, workbook: &Workbook, path: &Path) -> Result<()> {
        let rendered = self.render(workbook)?;
        fs::write(path, rendered)
            .with_context(|| format!("Failed to write output file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::FieldValue;
    use crate::reports::Table;
    use tempfile::tempdir;

    fn workbook() -> Workbook {
        let mut workbook = Workbook::new();
        workbook.add(Table::new(
            "NodesTable",
            "Nodes",
            vec!["Name".to_string(), "Ports".to_string()],
            vec![vec![
                FieldValue::from("node0"),
                FieldValue::from(vec!["0:1:1".to_string(), "0:1:2".to_string()]),
            ]],
        ));
        workbook
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("out.JSON")).unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_path(Path::new("out.yml")).unwrap(), OutputFormat::Yaml);
        assert_eq!(OutputFormat::from_path(Path::new("out.toml")).unwrap(), OutputFormat::Toml);

        let err = OutputFormat::from_path(Path::new("report.xlsx")).unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!(OutputFormat::from_path(Path::new("report")).is_err());
    }

    #[test]
    fn test_json_shape() {
        let rendered = TableWriter::new(OutputFormat::Json).render(&workbook()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let table = &value["tables"][0];
        assert_eq!(table["name"], "NodesTable");
        assert_eq!(table["start_col"], 1);
        assert_eq!(table["rows"][0][0], "node0");
        assert_eq!(table["rows"][0][1][1], "0:1:2");
    }

    #[test]
    fn test_yaml_and_toml_render() {
        let yaml = TableWriter::new(OutputFormat::Yaml).render(&workbook()).unwrap();
        assert!(yaml.contains("NodesTable"));

        let toml_text = TableWriter::new(OutputFormat::Toml).render(&workbook()).unwrap();
        let value: toml::Table = toml::from_str(&toml_text).unwrap();
        assert_eq!(value["tables"][0]["sheet"].as_str(), Some("Nodes"));
    }

    #[test]
    fn test_write_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        TableWriter::for_path(&path).unwrap().write(&workbook(), &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"Nodes\""));
    }
}
