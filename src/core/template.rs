//! Template compiler.
//!
//! A template has two sections separated by a blank line. The first declares
//! the variables (columns) of the records it produces:
//!
//! ```text
//! Value Required,Filldown Hostname (\S+)
//! Value Filesystem (\S+)
//! ```
//!
//! The second is a list of named states, each a block of indented rules. A
//! rule is a regular expression in which `${Var}` stands for the variable's
//! pattern, optionally followed by an action clause:
//!
//! ```text
//! Start
//!   ^\s*Output from:\s+/bin/hostname -> HostLine
//!
//! HostLine
//!   ^\s*${Hostname}\s*$$ -> Record Start
//! ```
//!
//! [`compile`] turns that text into a [`TemplateDefinition`] which
//! [`crate::core::extractor::Extractor`] executes.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use regex::Regex;

use crate::core::error::{TemplateError, TemplateResult};

/// Name of the state every scan begins in.
pub const START_STATE: &str = "Start";
/// Reserved state: transitioning here stops the scan and drops pending bindings.
pub const END_STATE: &str = "End";
/// Reserved state: transitioning here stops reading lines and runs end-of-text processing.
pub const EOF_STATE: &str = "EOF";

const LINE_OPS: [&str; 3] = ["Continue", "Next", "Error"];
const RECORD_OPS: [&str; 4] = ["Clear", "Clearall", "Record", "NoRecord"];

/// Per-variable behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOption {
    /// The record is dropped when this variable is empty at emission time.
    Required,
    /// The value survives record resets and is carried into later records.
    Filldown,
    /// Every match is appended; the column holds a list of strings.
    List,
    /// Once bound, the value is copied back into earlier records that lack it.
    Fillup,
    /// Marks the variable as part of the record identity. No effect on scanning.
    Key,
}

impl FromStr for ValueOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Required" => Ok(ValueOption::Required),
            "Filldown" => Ok(ValueOption::Filldown),
            "List" => Ok(ValueOption::List),
            "Fillup" => Ok(ValueOption::Fillup),
            "Key" => Ok(ValueOption::Key),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ValueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOption::Required => write!(f, "Required"),
            ValueOption::Filldown => write!(f, "Filldown"),
            ValueOption::List => write!(f, "List"),
            ValueOption::Fillup => write!(f, "Fillup"),
            ValueOption::Key => write!(f, "Key"),
        }
    }
}

/// One `Value` declaration.
#[derive(Debug, Clone)]
pub struct ValueDef {
    pub name: String,
    /// The pattern as written, including its outer parentheses.
    pub pattern: String,
    pub options: Vec<ValueOption>,
    /// Template line of the declaration.
    pub line: usize,
    /// The pattern rewritten as a named group, spliced into rules.
    capture: String,
}

impl ValueDef {
    pub fn has(&self, option: ValueOption) -> bool {
        self.options.contains(&option)
    }

    pub fn is_required(&self) -> bool {
        self.has(ValueOption::Required)
    }

    pub fn is_filldown(&self) -> bool {
        self.has(ValueOption::Filldown)
    }

    pub fn is_list(&self) -> bool {
        self.has(ValueOption::List)
    }

    pub fn is_fillup(&self) -> bool {
        self.has(ValueOption::Fillup)
    }
}

/// What happens to the current line after a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineOp {
    /// Take the transition (if any) and read the next line.
    #[default]
    Next,
    /// Keep trying the following rules of the state on the same line.
    Continue,
    /// Abort the scan.
    Error,
}

/// What happens to the bindings after a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOp {
    #[default]
    NoRecord,
    /// Emit the bindings as a record, then reset them.
    Record,
    /// Reset every binding except Filldown ones.
    Clear,
    /// Reset every binding, Filldown included.
    Clearall,
}

/// The `-> ...` clause of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Action {
    pub line_op: LineOp,
    pub record_op: RecordOp,
    /// Target state, absent when the machine stays where it is.
    pub new_state: Option<String>,
    /// Message attached to an `Error` action.
    pub message: Option<String>,
}

/// A compiled rule line.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The match part as written in the template, before substitution.
    pub source: String,
    pub regex: Regex,
    pub action: Action,
    pub line: usize,
    /// (capture group index, value index) pairs for the declared variables the
    /// rule binds.
    pub(crate) bindings: Vec<(usize, usize)>,
}

/// A named block of rules.
#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    pub rules: Vec<Rule>,
    pub line: usize,
}

/// A compiled template, ready to be run by the extractor.
#[derive(Debug, Clone)]
pub struct TemplateDefinition {
    values: Vec<ValueDef>,
    states: IndexMap<String, State>,
}

impl TemplateDefinition {
    pub fn values(&self) -> &[ValueDef] {
        &self.values
    }

    pub fn value_index(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|v| v.name == name)
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    /// States in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    /// Whether the template declares its own end-of-text rules.
    pub fn has_eof_state(&self) -> bool {
        self.states.contains_key(EOF_STATE)
    }

    /// Column names, in declaration order.
    pub fn header(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }

    /// Names of the variables flagged `Key`.
    pub fn key_columns(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|v| v.has(ValueOption::Key))
            .map(|v| v.name.clone())
            .collect()
    }
}

impl FromStr for TemplateDefinition {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

/// Column header of a compiled template.
pub fn header(definition: &TemplateDefinition) -> Vec<String> {
    definition.header()
}

/// Compiles template source text.
pub fn compile(source: &str) -> TemplateResult<TemplateDefinition> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()));

    let values = parse_values(&mut lines)?;
    let states = parse_states(&mut lines, &values)?;
    validate(&states)?;

    Ok(TemplateDefinition { values, states })
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits off the first whitespace-delimited token.
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn parse_values<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
) -> TemplateResult<Vec<ValueDef>> {
    let mut values: Vec<ValueDef> = Vec::new();

    for (line_no, line) in lines.by_ref() {
        // A blank line closes the Value section.
        if line.is_empty() {
            break;
        }
        if is_comment(line) {
            continue;
        }
        if let Some(body) = line.strip_prefix("Value ") {
            let value = parse_value(body, line_no, line)?;
            if values.iter().any(|v| v.name == value.name) {
                return Err(TemplateError::DuplicateValue {
                    line: line_no,
                    name: value.name,
                });
            }
            values.push(value);
        } else if values.is_empty() {
            return Err(TemplateError::NoValues { line: line_no });
        } else {
            return Err(TemplateError::MissingBlankLine { line: line_no });
        }
    }

    Ok(values)
}

fn parse_value(body: &str, line_no: usize, line: &str) -> TemplateResult<ValueDef> {
    let malformed = || TemplateError::MalformedValue {
        line: line_no,
        text: line.to_string(),
    };

    let (first, rest) = split_token(body);
    if first.is_empty() || rest.is_empty() {
        return Err(malformed());
    }

    // Options are present only when the token after the first one is not the
    // pattern itself.
    let (option_list, name, pattern) = if rest.starts_with('(') {
        ("", first, rest)
    } else {
        let (name, pattern) = split_token(rest);
        if pattern.is_empty() {
            // `Value Name \d+`: the second token is an unwrapped pattern.
            if is_identifier(first) && !is_identifier(name) {
                return Err(TemplateError::UnwrappedPattern {
                    line: line_no,
                    name: first.to_string(),
                });
            }
            return Err(malformed());
        }
        (first, name, pattern)
    };

    if !is_identifier(name) {
        return Err(malformed());
    }

    let mut options = Vec::new();
    if !option_list.is_empty() {
        for raw in option_list.split(',') {
            let option = raw
                .parse::<ValueOption>()
                .map_err(|_| TemplateError::UnknownOption {
                    line: line_no,
                    option: raw.to_string(),
                })?;
            if options.contains(&option) {
                return Err(TemplateError::DuplicateOption {
                    line: line_no,
                    option: raw.to_string(),
                });
            }
            options.push(option);
        }
    }

    if !(pattern.starts_with('(') && pattern.ends_with(')')) {
        return Err(TemplateError::UnwrappedPattern {
            line: line_no,
            name: name.to_string(),
        });
    }
    Regex::new(pattern).map_err(|e| TemplateError::InvalidRegex {
        line: line_no,
        message: e.to_string(),
    })?;

    Ok(ValueDef {
        name: name.to_string(),
        pattern: pattern.to_string(),
        options,
        line: line_no,
        capture: format!("(?P<{}>{}", name, &pattern[1..]),
    })
}

fn parse_states<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    values: &[ValueDef],
) -> TemplateResult<IndexMap<String, State>> {
    let mut states: IndexMap<String, State> = IndexMap::new();
    let mut current: Option<State> = None;

    for (line_no, line) in lines {
        match current.as_mut() {
            None => {
                if line.is_empty() || is_comment(line) {
                    continue;
                }
                let name = line;
                if name.starts_with(char::is_whitespace) && name.trim_start().starts_with('^') {
                    return Err(TemplateError::MalformedRule { line: line_no });
                }
                if !is_state_name(name) {
                    return Err(TemplateError::InvalidStateName {
                        line: line_no,
                        name: name.trim().to_string(),
                    });
                }
                if states.contains_key(name) {
                    return Err(TemplateError::DuplicateState {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
                current = Some(State {
                    name: name.to_string(),
                    rules: Vec::new(),
                    line: line_no,
                });
            }
            Some(state) => {
                if line.is_empty() {
                    if let Some(done) = current.take() {
                        states.insert(done.name.clone(), done);
                    }
                    continue;
                }
                if is_comment(line) {
                    continue;
                }
                if !(line.starts_with(char::is_whitespace) && line.trim_start().starts_with('^')) {
                    return Err(TemplateError::MalformedRule { line: line_no });
                }
                state.rules.push(parse_rule(line, line_no, values)?);
            }
        }
    }
    if let Some(done) = current.take() {
        states.insert(done.name.clone(), done);
    }

    Ok(states)
}

fn is_state_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !LINE_OPS.contains(&name)
        && !RECORD_OPS.contains(&name)
}

fn parse_rule(line: &str, line_no: usize, values: &[ValueDef]) -> TemplateResult<Rule> {
    let text = line.trim();

    // The action clause starts at the last "->" preceded by whitespace.
    let split = text
        .match_indices("->")
        .map(|(i, _)| i)
        .filter(|&i| i > 0 && text[..i].ends_with(char::is_whitespace))
        .last();

    let (source, action) = match split {
        Some(i) => {
            let ws = text[..i].chars().next_back().map_or(1, char::len_utf8);
            let source = &text[..i - ws];
            let action = parse_action(&text[i + 2..], line_no)?;
            (source, action)
        }
        None => (text, Action::default()),
    };

    let pattern = substitute(source, values, line_no)?;
    let regex = Regex::new(&pattern).map_err(|e| TemplateError::InvalidRegex {
        line: line_no,
        message: e.to_string(),
    })?;

    let bindings = regex
        .capture_names()
        .enumerate()
        .filter_map(|(group, name)| {
            let name = name?;
            let index = values.iter().position(|v| v.name == name)?;
            Some((group, index))
        })
        .collect();

    Ok(Rule {
        source: source.to_string(),
        regex,
        action,
        line: line_no,
        bindings,
    })
}

fn parse_action(clause: &str, line_no: usize) -> TemplateResult<Action> {
    let malformed = || TemplateError::MalformedAction {
        line: line_no,
        action: clause.trim().to_string(),
    };

    // An empty clause ("->" with nothing after it) keeps the defaults.
    if !clause.is_empty() && !clause.starts_with(char::is_whitespace) {
        return Err(malformed());
    }
    let (operator, rest) = split_token(clause);
    let mut action = Action::default();

    let mut explicit_operator = true;
    let (line_op, record_op) = match operator.split_once('.') {
        Some((ln, rec)) => (Some(ln), Some(rec)),
        None if LINE_OPS.contains(&operator) => (Some(operator), None),
        None if RECORD_OPS.contains(&operator) => (None, Some(operator)),
        None => {
            explicit_operator = false;
            (None, None)
        }
    };

    if let Some(ln) = line_op {
        action.line_op = match ln {
            "Next" => LineOp::Next,
            "Continue" => LineOp::Continue,
            "Error" => LineOp::Error,
            _ => return Err(malformed()),
        };
    }
    if let Some(rec) = record_op {
        action.record_op = match rec {
            "NoRecord" => RecordOp::NoRecord,
            "Record" => RecordOp::Record,
            "Clear" => RecordOp::Clear,
            "Clearall" => RecordOp::Clearall,
            _ => return Err(malformed()),
        };
    }

    // Without an operator the whole clause is the target state.
    let target = if explicit_operator { rest } else { clause.trim() };

    if target.is_empty() {
        return Ok(action);
    }

    let quoted = target.len() >= 2 && target.starts_with('"') && target.ends_with('"');
    if action.line_op == LineOp::Error {
        let message = if quoted { &target[1..target.len() - 1] } else { target };
        if !quoted && !is_state_name_token(target) {
            return Err(malformed());
        }
        action.message = Some(message.to_string());
        return Ok(action);
    }
    if !is_state_name_token(target) {
        return Err(malformed());
    }
    if action.line_op == LineOp::Continue {
        return Err(TemplateError::ContinueWithTransition {
            line: line_no,
            state: target.to_string(),
        });
    }
    action.new_state = Some(target.to_string());

    Ok(action)
}

fn is_state_name_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Replaces `${Name}` and `$Name` with the variable's named group and `$$`
/// with a literal `$`.
fn substitute(source: &str, values: &[ValueDef], line_no: usize) -> TemplateResult<String> {
    let invalid = || TemplateError::InvalidSubstitution {
        line: line_no,
        text: source.to_string(),
    };
    let lookup = |name: &str| -> TemplateResult<&str> {
        values
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.capture.as_str())
            .ok_or_else(|| TemplateError::UndeclaredValue {
                line: line_no,
                name: name.to_string(),
            })
    };

    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
        } else if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').ok_or_else(invalid)?;
            let name = &braced[..end];
            if !is_identifier(name) {
                return Err(invalid());
            }
            out.push_str(lookup(name)?);
            rest = &braced[end + 1..];
        } else {
            let len = after
                .char_indices()
                .take_while(|&(i, c)| {
                    c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())
                })
                .count();
            if len == 0 {
                return Err(invalid());
            }
            out.push_str(lookup(&after[..len])?);
            rest = &after[len..];
        }
    }
    out.push_str(rest);

    Ok(out)
}

fn validate(states: &IndexMap<String, State>) -> TemplateResult<()> {
    if !states.contains_key(START_STATE) {
        return Err(TemplateError::MissingStart);
    }
    if let Some(end) = states.get(END_STATE)
        && !end.rules.is_empty()
    {
        return Err(TemplateError::NonEmptyEnd { line: end.line });
    }

    for state in states.values() {
        for rule in &state.rules {
            if rule.action.line_op == LineOp::Error {
                continue;
            }
            let Some(target) = rule.action.new_state.as_deref() else {
                continue;
            };
            if target == END_STATE || target == EOF_STATE {
                continue;
            }
            if !states.contains_key(target) {
                return Err(TemplateError::UnknownState {
                    line: rule.line,
                    target: target.to_string(),
                });
            }
        }
    }

    Ok(())
}
