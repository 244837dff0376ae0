// Building blocks shared by the engine, the report catalog and the CLI.

// `dispatch` module:
// A lookup table with a default entry. The report catalog keys builders by
// array type and the Celerra reshaping keys functions by row type.
pub mod dispatch;

// `importer` module:
// Reads and compiles the templates of custom reports, inline or from a file
// next to the config.
pub mod importer;

// `patterns` module:
// Shell-style globs over archive member names and the `PatternMatcher` trait
// the content router selects members with.
pub mod patterns;

// `record` module:
// Typed views over extracted records, checked against a template header.
pub mod record;

// `reporter` module:
// Console summary printed after a run.
pub mod reporter;

// `validator` module:
// Checks the config file and the bundled templates for `--check`.
pub mod validator;

// `writer` module:
// Serializes the produced tables to JSON, YAML or TOML.
pub mod writer;
