//! Content router: picks the archive members a template runs over.
//!
//! Members are grouped by the first segment of their name, which is the
//! archive (or directory) they came from. Within each group the patterns are
//! applied in order, so the text of one array's dump stays contiguous and in
//! pattern order.

use indexmap::IndexMap;

use crate::builders::patterns::{NamePattern, PatternMatcher};

/// A named text blob read from an input archive or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub name: String,
    pub text: String,
}

impl ContentItem {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// First `/`-separated segment of the name.
    pub fn group(&self) -> &str {
        self.name.split('/').next().unwrap_or_default()
    }
}

/// Selects items by pattern. Groups keep the order in which they first
/// appear; an item matching several patterns is returned once per pattern.
pub fn filter<'a, P: PatternMatcher>(
    items: &'a [ContentItem],
    patterns: &[P],
) -> Vec<&'a ContentItem> {
    let mut groups: IndexMap<&str, Vec<&ContentItem>> = IndexMap::new();
    for item in items {
        groups.entry(item.group()).or_default().push(item);
    }

    let mut selected = Vec::new();
    for members in groups.values() {
        for pattern in patterns {
            selected.extend(members.iter().filter(|m| pattern.matches_name(&m.name)));
        }
    }
    selected
}

/// Texts of the selected items joined with `separator`.
pub fn concatenate<P: PatternMatcher>(
    items: &[ContentItem],
    patterns: &[P],
    separator: &str,
) -> String {
    filter(items, patterns)
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Texts of the selected items, one entry per match.
pub fn separated<P: PatternMatcher>(items: &[ContentItem], patterns: &[P]) -> Vec<String> {
    filter(items, patterns)
        .into_iter()
        .map(|item| item.text.clone())
        .collect()
}

/// The separator the catalog puts between concatenated dumps.
pub fn star_separator() -> String {
    format!("{}\n", "*".repeat(20))
}

/// Convenience for callers holding glob strings.
pub fn patterns(globs: &[&str]) -> anyhow::Result<Vec<NamePattern>> {
    NamePattern::parse_all(globs)
}
