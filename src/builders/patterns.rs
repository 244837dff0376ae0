use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A shell-style glob matched against the full name of an archive member.
///
/// The syntax is the one of `fnmatch`: `*` matches any run of characters
/// (including `/`), `?` matches a single character, `[seq]` matches one
/// character of `seq` and `[!seq]` one character outside it. Every other
/// character is literal and the whole name has to match.
///
/// The glob text is kept next to its compiled pattern so patterns round-trip
/// through the config file unchanged.
#[derive(Debug, Clone)]
pub struct NamePattern {
    /// The glob as written in the catalog or config file.
    glob: String,
    pattern: Pattern,
}

/// Member names are matched as plain strings: separators and leading dots
/// get no special treatment.
const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// The `PatternMatcher` trait is the single seam the content router uses to
/// select members.
///
/// Keeping it a trait lets tests and custom reports plug in other selection
/// rules without touching the router.
pub trait PatternMatcher {
    /// Checks whether a member name is selected.
    ///
    /// # Arguments
    /// * `name`: The slash-separated member name, relative to its archive root.
    ///
    /// # Returns
    /// `true` if the name matches the pattern as a whole.
    fn matches_name(&self, name: &str) -> bool;
}

impl NamePattern {
    /// Compiles a glob into a `NamePattern`.
    ///
    /// # Arguments
    /// * `glob`: The glob text, e.g. `*cmd_outputs/server_df`.
    ///
    /// # Returns
    /// `Result<Self>` which fails on an unterminated character class
    /// (`[abc`) or a misplaced `**`.
    pub fn new(glob: &str) -> Result<Self> {
        let pattern =
            Pattern::new(glob).with_context(|| format!("Invalid name pattern: {}", glob))?;
        Ok(Self {
            glob: glob.to_string(),
            pattern,
        })
    }

    /// Compiles a list of globs, failing on the first invalid one.
    pub fn parse_all<S: AsRef<str>>(globs: &[S]) -> Result<Vec<Self>> {
        globs.iter().map(|g| Self::new(g.as_ref())).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl PatternMatcher for NamePattern {
    fn matches_name(&self, name: &str) -> bool {
        self.pattern.matches_with(name, NAME_MATCH)
    }
}

impl FromStr for NamePattern {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glob)
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl Serialize for NamePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.glob)
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let glob = String::deserialize(deserializer)?;
        NamePattern::new(&glob).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(glob: &str, name: &str) -> bool {
        NamePattern::new(glob).unwrap().matches_name(name)
    }

    #[test]
    fn test_star_crosses_slashes() {
        assert!(matches("*SPA_mirror_info.txt", "dump/sub/APM0001_SPA_mirror_info.txt"));
        assert!(matches("*cmd_outputs/server_df", "nas/cmd_outputs/server_df"));
        assert!(!matches("*cmd_outputs/server_df", "nas/cmd_outputs/server_df.old"));
    }

    #[test]
    fn test_literal_name_must_match_whole() {
        assert!(matches("SPA_cfg_info.txt", "SPA_cfg_info.txt"));
        assert!(!matches("SPA_cfg_info.txt", "dump/SPA_cfg_info.txt"));
    }

    #[test]
    fn test_question_mark_and_sets() {
        assert!(matches("SP?_cfg_info.txt", "SPB_cfg_info.txt"));
        assert!(matches("SP[AB]_cfg_info.txt", "SPA_cfg_info.txt"));
        assert!(!matches("SP[!AB]_cfg_info.txt", "SPA_cfg_info.txt"));
        assert!(matches("SP[!AB]_cfg_info.txt", "SPC_cfg_info.txt"));
    }

    #[test]
    fn test_special_characters_are_literal() {
        assert!(matches("a.b(c)+", "a.b(c)+"));
        assert!(!matches("a.b", "axb"));
        assert!(matches("[[]open]", "[open]"));
    }

    #[test]
    fn test_invalid_patterns_are_errors() {
        let err = NamePattern::new("SP[AB_cfg_info.txt").unwrap_err();
        assert!(format!("{:#}", err).contains("SP[AB_cfg_info.txt"));
        assert!(NamePattern::new("***.out").is_err());
    }

    #[test]
    fn test_serde_keeps_glob_text() {
        let pattern = NamePattern::new("*showsys.out").unwrap();
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, "\"*showsys.out\"");
        let back: NamePattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
