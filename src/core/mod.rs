// The core of the parser: compile templates, run them over text, route
// archive members into that text, and tie it together per array type.

// `template` module:
// Parses the TextFSM template language into a `TemplateDefinition`.
pub mod template;

// `extractor` module:
// Runs a compiled template over text line by line and collects records.
pub mod extractor;

// `error` module:
// Typed errors for template compilation and extraction.
pub mod error;

// `router` module:
// Selects loaded members by name pattern and concatenates their text.
pub mod router;

// `archive` module:
// Loads directories and tar/gzip/bzip2 archives (nested ones too) into
// named content items.
pub mod archive;

// `config` module:
// The `ntsparser.toml` file: custom reports, separator and end-of-text policy.
pub mod config;

// `engine` module:
// Runs the built-in and configured reports of one array type.
pub mod engine;
