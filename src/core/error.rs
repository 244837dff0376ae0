//! Error types for the extraction engine.
//!
//! Template authoring mistakes surface as [`TemplateError`] when a template is
//! compiled. Scanning is lenient; the only runtime failure is an explicit
//! `Error` action in a template, reported as [`ExtractError`].

use thiserror::Error;

/// Result type for template compilation.
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// A template could not be compiled. Every variant carries the 1-based line
/// of the template source it was raised for.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateError {
    /// No `Value` lines before the first state.
    #[error("no Value definitions found (line {line})")]
    NoValues { line: usize },

    /// A `Value` line that could not be split into options, name and pattern.
    #[error("malformed Value declaration on line {line}: '{text}'")]
    MalformedValue { line: usize, text: String },

    /// The same variable was declared twice.
    #[error("duplicate declaration of Value '{name}' on line {line}")]
    DuplicateValue { line: usize, name: String },

    /// An option keyword that is not one of Required, Filldown, List, Fillup, Key.
    #[error("unknown option '{option}' on line {line}")]
    UnknownOption { line: usize, option: String },

    /// The same option listed twice for one variable.
    #[error("duplicate option '{option}' on line {line}")]
    DuplicateOption { line: usize, option: String },

    /// A variable pattern that is not wrapped in a single `(...)` pair.
    #[error("Value '{name}' on line {line} must be contained within a '()' pair")]
    UnwrappedPattern { line: usize, name: String },

    /// A variable or rule pattern that the regex engine rejected.
    #[error("invalid regular expression on line {line}: {message}")]
    InvalidRegex { line: usize, message: String },

    /// A `${Name}` reference to a variable that was never declared.
    #[error("reference to undeclared Value '{name}' on line {line}")]
    UndeclaredValue { line: usize, name: String },

    /// A `$` that is neither `$$` nor a valid variable reference.
    #[error("invalid variable substitution on line {line}: '{text}'")]
    InvalidSubstitution { line: usize, text: String },

    /// Text after the Value section that is not a blank line.
    #[error("expected blank line after last Value entry (line {line})")]
    MissingBlankLine { line: usize },

    /// A state name line with forbidden characters or a reserved word.
    #[error("invalid state name '{name}' on line {line}")]
    InvalidStateName { line: usize, name: String },

    /// The same state declared twice.
    #[error("duplicate state name '{name}' on line {line}")]
    DuplicateState { line: usize, name: String },

    /// A rule line that does not start with whitespace followed by `^`.
    #[error("missing white space or caret ('^') before rule on line {line}")]
    MalformedRule { line: usize },

    /// The `-> ...` clause of a rule could not be parsed.
    #[error("badly formatted action '{action}' on line {line}")]
    MalformedAction { line: usize, action: String },

    /// `Continue` combined with a state transition.
    #[error("action 'Continue' cannot change state (to '{state}') on line {line}")]
    ContinueWithTransition { line: usize, state: String },

    /// A transition to a state that is not declared.
    #[error("state '{target}' referenced on line {line} is not declared")]
    UnknownState { line: usize, target: String },

    /// Every template needs a `Start` state.
    #[error("missing state 'Start'")]
    MissingStart,

    /// The reserved `End` state cannot contain rules.
    #[error("non-empty 'End' state declared on line {line}")]
    NonEmptyEnd { line: usize },
}

impl TemplateError {
    /// The template line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            TemplateError::MissingStart => None,
            TemplateError::NoValues { line }
            | TemplateError::MalformedValue { line, .. }
            | TemplateError::DuplicateValue { line, .. }
            | TemplateError::UnknownOption { line, .. }
            | TemplateError::DuplicateOption { line, .. }
            | TemplateError::UnwrappedPattern { line, .. }
            | TemplateError::InvalidRegex { line, .. }
            | TemplateError::UndeclaredValue { line, .. }
            | TemplateError::InvalidSubstitution { line, .. }
            | TemplateError::MissingBlankLine { line }
            | TemplateError::InvalidStateName { line, .. }
            | TemplateError::DuplicateState { line, .. }
            | TemplateError::MalformedRule { line }
            | TemplateError::MalformedAction { line, .. }
            | TemplateError::ContinueWithTransition { line, .. }
            | TemplateError::UnknownState { line, .. }
            | TemplateError::NonEmptyEnd { line } => Some(*line),
        }
    }
}

/// A scan was aborted by an `Error` action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{}: rule on template line {rule_line} matched input line {input_line}: '{text}'", message.as_deref().unwrap_or("state error raised"))]
    RuleError {
        /// Optional message given after the `Error` keyword.
        message: Option<String>,
        /// Template line of the rule that fired.
        rule_line: usize,
        /// 1-based input line that matched it; 0 for end-of-text processing.
        input_line: usize,
        /// The input line itself.
        text: String,
    },
}

/// A record could not be turned into a typed row.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("row type {row} expects {expected} columns, template produced {found}")]
    Arity {
        row: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("row type {row} expects column '{expected}' at position {position}, template has '{found}'")]
    Column {
        row: &'static str,
        position: usize,
        expected: &'static str,
        found: String,
    },
}
