//! Archive ingestion: turns input paths into [`ContentItem`]s.
//!
//! Inputs can be directories, plain files or zip/gzip/bzip2/tar containers in
//! any of their usual combinations. Containers found inside a zip or tar are
//! expanded as well, down to [`ArchiveLoader::max_depth`] levels. Members are
//! named by their path inside the innermost container.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Component, Path};

use anyhow::{Context, Result, bail};
use bzip2_rs::DecoderReader as Bz2DecoderReader;
use flate2::read::GzDecoder;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::router::ContentItem;

/// Nesting levels expanded by default.
pub const DEFAULT_MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Tar,
    TarGz,
    TarBz2,
    Gz,
    Bz2,
    Zip,
    Plain,
}

impl Container {
    fn of(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar") {
            Container::Tar
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Container::TarGz
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") || lower.ends_with(".tbz")
        {
            Container::TarBz2
        } else if lower.ends_with(".gz") {
            Container::Gz
        } else if lower.ends_with(".bz2") {
            Container::Bz2
        } else if lower.ends_with(".zip") {
            Container::Zip
        } else {
            Container::Plain
        }
    }
}

/// Reads input paths into content items.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLoader {
    pub max_depth: usize,
}

impl Default for ArchiveLoader {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ArchiveLoader {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Loads every input in order. A missing input is an error; a damaged
    /// container or member only produces a warning.
    pub fn load<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<Vec<ContentItem>> {
        let mut items = Vec::new();
        for input in inputs {
            self.load_path(input.as_ref(), &mut items)?;
        }
        debug!(items = items.len(), "inputs loaded");
        Ok(items)
    }

    fn load_path(&self, path: &Path, out: &mut Vec<ContentItem>) -> Result<()> {
        if !path.exists() {
            bail!("Input not found: {}", path.display());
        }

        if path.is_dir() {
            return self.load_dir(path, out);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        if let Err(e) = self.expand(&name, &mut file, 0, out) {
            warn!(input = %path.display(), error = %e, "skipping unreadable input");
        }
        Ok(())
    }

    fn load_dir(&self, dir: &Path, out: &mut Vec<ContentItem>) -> Result<()> {
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = member_name(entry.path().strip_prefix(dir).unwrap_or(entry.path()));
            let mut file = match File::open(entry.path()) {
                Ok(file) => file,
                Err(e) => {
                    warn!(member = %name, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if let Err(e) = self.expand(&name, &mut file, 0, out) {
                warn!(member = %name, error = %e, "skipping unreadable file");
            }
        }
        Ok(())
    }

    fn expand(
        &self,
        name: &str,
        reader: &mut dyn Read,
        depth: usize,
        out: &mut Vec<ContentItem>,
    ) -> Result<()> {
        let container = Container::of(name);
        if container != Container::Plain && depth >= self.max_depth {
            warn!(member = %name, depth, "archive nested too deep, skipping");
            return Ok(());
        }

        match container {
            Container::Tar => self.expand_tar(name, reader, depth, out),
            Container::TarGz => {
                let mut decoder = GzDecoder::new(reader);
                self.expand_tar(name, &mut decoder, depth, out)
            }
            Container::TarBz2 => {
                let mut decoder = Bz2DecoderReader::new(reader);
                self.expand_tar(name, &mut decoder, depth, out)
            }
            Container::Gz => {
                let mut decoder = GzDecoder::new(reader);
                self.expand(strip_suffix(name, ".gz"), &mut decoder, depth + 1, out)
            }
            Container::Bz2 => {
                let mut decoder = Bz2DecoderReader::new(reader);
                self.expand(strip_suffix(name, ".bz2"), &mut decoder, depth + 1, out)
            }
            Container::Zip => self.expand_zip(name, reader, depth, out),
            Container::Plain => {
                push_text(name, reader, out);
                Ok(())
            }
        }
    }

    fn expand_tar(
        &self,
        name: &str,
        reader: &mut dyn Read,
        depth: usize,
        out: &mut Vec<ContentItem>,
    ) -> Result<()> {
        let mut archive = tar::Archive::new(reader);
        let entries = archive
            .entries()
            .with_context(|| format!("Failed to read tar archive {}", name))?;

        for entry in entries {
            let mut entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(archive = %name, error = %e, "skipping damaged tar entry");
                    continue;
                }
            };
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let member = match entry.path() {
                Ok(path) => member_name(&path),
                Err(e) => {
                    warn!(archive = %name, error = %e, "skipping tar entry with unreadable path");
                    continue;
                }
            };
            if let Err(e) = self.expand(&member, &mut entry, depth + 1, out) {
                warn!(archive = %name, member = %member, error = %e, "skipping unreadable member");
            }
        }
        Ok(())
    }

    /// The zip central directory sits at the end, so the archive is buffered
    /// before its members are read.
    fn expand_zip(
        &self,
        name: &str,
        reader: &mut dyn Read,
        depth: usize,
        out: &mut Vec<ContentItem>,
    ) -> Result<()> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read zip archive {}", name))?;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to open zip archive {}", name))?;

        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(archive = %name, error = %e, "skipping damaged zip entry");
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let member = member_name(Path::new(entry.name()));
            if let Err(e) = self.expand(&member, &mut entry, depth + 1, out) {
                warn!(archive = %name, member = %member, error = %e, "skipping unreadable member");
            }
        }
        Ok(())
    }
}

/// Loads inputs with the default nesting limit.
pub fn load_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<ContentItem>> {
    ArchiveLoader::default().load(inputs)
}

fn push_text(name: &str, reader: &mut dyn Read, out: &mut Vec<ContentItem>) {
    let mut bytes = Vec::new();
    if let Err(e) = reader.read_to_end(&mut bytes) {
        warn!(member = %name, error = %e, "skipping unreadable member");
        return;
    }
    match String::from_utf8(bytes) {
        Ok(text) => out.push(ContentItem::new(name, text)),
        Err(_) => warn!(member = %name, "skipping member that is not valid UTF-8"),
    }
}

/// Slash-separated name without a leading `./`.
fn member_name(path: &Path) -> String {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_suffix<'a>(name: &'a str, suffix: &str) -> &'a str {
    let cut = name.len().saturating_sub(suffix.len());
    if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix) {
        &name[..cut]
    } else {
        name
    }
}
