//! Line-oriented state machine that runs a compiled template over text.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::ExtractError;
use crate::core::template::{
    END_STATE, EOF_STATE, LineOp, RecordOp, Rule, START_STATE, State, TemplateDefinition,
};

/// One column of a record: a plain string, or a list for `List` variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }

    /// The string of a single-valued field; `None` for lists.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Single(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::Single(_) => None,
            FieldValue::List(items) => Some(items),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Single(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Single(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Single(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Single(s) => write!(f, "{}", s),
            FieldValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// An emitted row, one field per declared variable in declaration order.
pub type Record = Vec<FieldValue>;

/// What to do with bindings still pending when the text runs out and the
/// template has no `EOF` state of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EofPolicy {
    /// Drop them. Only explicit `Record` actions produce rows.
    #[default]
    Discard,
    /// Emit them as a final record, as TextFSM does.
    Record,
}

/// Runs a compiled template with the default end-of-text policy.
pub fn run(definition: &TemplateDefinition, text: &str) -> Result<Vec<Record>, ExtractError> {
    Extractor::new(definition).run(text)
}

/// Executes a [`TemplateDefinition`]. Holds no per-scan state, so one
/// extractor can be run over any number of texts.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    definition: &'a TemplateDefinition,
    eof_policy: EofPolicy,
}

impl<'a> Extractor<'a> {
    pub fn new(definition: &'a TemplateDefinition) -> Self {
        Self {
            definition,
            eof_policy: EofPolicy::default(),
        }
    }

    pub fn with_eof_policy(mut self, policy: EofPolicy) -> Self {
        self.eof_policy = policy;
        self
    }

    pub fn definition(&self) -> &'a TemplateDefinition {
        self.definition
    }

    pub fn run(&self, text: &str) -> Result<Vec<Record>, ExtractError> {
        let mut scanner = Scanner::new(self.definition);
        let outcome = scanner.scan(text)?;

        match outcome {
            Outcome::End => {}
            Outcome::Exhausted | Outcome::Eof => scanner.finish(self.eof_policy)?,
        }

        debug!(
            records = scanner.records.len(),
            columns = self.definition.values().len(),
            "scan finished"
        );
        Ok(scanner.records)
    }
}

#[derive(Debug, Clone, Default)]
enum Slot {
    #[default]
    Unset,
    Single(String),
    List(Vec<String>),
}

impl Slot {
    fn is_empty(&self) -> bool {
        match self {
            Slot::Unset => true,
            Slot::Single(s) => s.is_empty(),
            Slot::List(items) => items.is_empty(),
        }
    }

    fn to_field(&self) -> FieldValue {
        match self {
            Slot::Unset => FieldValue::default(),
            Slot::Single(s) => FieldValue::Single(s.clone()),
            Slot::List(items) => FieldValue::List(items.clone()),
        }
    }
}

enum Outcome {
    /// All lines were read.
    Exhausted,
    /// A rule moved to `EOF`.
    Eof,
    /// A rule moved to `End`.
    End,
}

/// Where the machine goes after a line.
enum Step<'a> {
    Stay,
    Goto(&'a str),
}

struct Scanner<'a> {
    definition: &'a TemplateDefinition,
    slots: Vec<Slot>,
    records: Vec<Record>,
}

impl<'a> Scanner<'a> {
    fn new(definition: &'a TemplateDefinition) -> Self {
        let slots = definition
            .values()
            .iter()
            .map(|v| if v.is_list() { Slot::List(Vec::new()) } else { Slot::Unset })
            .collect();
        Self {
            definition,
            slots,
            records: Vec::new(),
        }
    }

    fn scan(&mut self, text: &str) -> Result<Outcome, ExtractError> {
        let definition = self.definition;
        let Some(mut state) = definition.state(START_STATE) else {
            return Ok(Outcome::Exhausted);
        };

        for (index, line) in text.lines().enumerate() {
            match self.check_line(state, line, index + 1)? {
                Step::Stay => {}
                Step::Goto(END_STATE) => return Ok(Outcome::End),
                Step::Goto(EOF_STATE) => return Ok(Outcome::Eof),
                Step::Goto(name) => {
                    // Targets were checked at compile time.
                    if let Some(next) = definition.state(name) {
                        state = next;
                    }
                }
            }
        }

        Ok(Outcome::Exhausted)
    }

    fn check_line(
        &mut self,
        state: &'a State,
        line: &str,
        input_line: usize,
    ) -> Result<Step<'a>, ExtractError> {
        for rule in &state.rules {
            let Some(captures) = rule.regex.captures(line) else {
                continue;
            };

            for &(group, index) in &rule.bindings {
                if let Some(m) = captures.get(group) {
                    self.assign(index, m.as_str());
                }
            }

            match rule.action.record_op {
                RecordOp::NoRecord => {}
                RecordOp::Record => self.append_record(),
                RecordOp::Clear => self.clear(),
                RecordOp::Clearall => self.clear_all(),
            }

            match rule.action.line_op {
                LineOp::Error => return Err(rule_error(rule, line, input_line)),
                LineOp::Continue => continue,
                LineOp::Next => {}
            }

            return Ok(match rule.action.new_state.as_deref() {
                Some(target) => Step::Goto(target),
                None => Step::Stay,
            });
        }

        Ok(Step::Stay)
    }

    fn assign(&mut self, index: usize, text: &str) {
        let def = &self.definition.values()[index];

        match &mut self.slots[index] {
            Slot::List(items) => items.push(text.to_string()),
            slot => *slot = Slot::Single(text.to_string()),
        }

        if def.is_fillup() {
            let field = self.slots[index].to_field();
            for record in self.records.iter_mut().rev() {
                if !record[index].is_empty() {
                    break;
                }
                record[index] = field.clone();
            }
        }
    }

    fn append_record(&mut self) {
        let values = self.definition.values();

        let missing_required = values
            .iter()
            .zip(&self.slots)
            .any(|(def, slot)| def.is_required() && slot.is_empty());
        if missing_required {
            self.clear();
            return;
        }
        if self.slots.iter().all(Slot::is_empty) {
            return;
        }

        let record = self.slots.iter().map(Slot::to_field).collect();
        self.records.push(record);
        self.clear();
    }

    fn clear(&mut self) {
        for (def, slot) in self.definition.values().iter().zip(self.slots.iter_mut()) {
            if def.is_filldown() {
                continue;
            }
            *slot = if def.is_list() { Slot::List(Vec::new()) } else { Slot::Unset };
        }
    }

    fn clear_all(&mut self) {
        for (def, slot) in self.definition.values().iter().zip(self.slots.iter_mut()) {
            *slot = if def.is_list() { Slot::List(Vec::new()) } else { Slot::Unset };
        }
    }

    /// End-of-text processing. A declared `EOF` state runs once against an
    /// empty line; its transitions are ignored.
    fn finish(&mut self, policy: EofPolicy) -> Result<(), ExtractError> {
        match self.definition.state(EOF_STATE) {
            Some(eof) => {
                self.check_line(eof, "", 0)?;
            }
            None if policy == EofPolicy::Record => self.append_record(),
            None => {}
        }
        Ok(())
    }
}

fn rule_error(rule: &Rule, line: &str, input_line: usize) -> ExtractError {
    ExtractError::RuleError {
        message: rule.action.message.clone(),
        rule_line: rule.line,
        input_line,
        text: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::compile;

    fn rows(template: &str, text: &str) -> Vec<Vec<String>> {
        let def = compile(template).unwrap();
        run(&def, text)
            .unwrap()
            .into_iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect()
    }

    const ID_NAME: &str = "Value Id (\\d+)\nValue Name (\\w+)\n\nStart\n  ^${Id}\\s+${Name} -> Record\n";

    #[test]
    fn test_two_records_in_order() {
        assert_eq!(
            rows(ID_NAME, "1 alpha\n2 beta\n"),
            vec![vec!["1", "alpha"], vec!["2", "beta"]]
        );
    }

    const REQUIRED_ID: &str = "Value Required Id (\\d+)\nValue Name (.+)\n\nStart\n  ^\\s*${Id}\\s+${Name}$$ -> Record\n";

    #[test]
    fn test_required_id_with_trailing_anchor() {
        assert_eq!(
            rows(REQUIRED_ID, "1 alpha\n2 beta\n"),
            vec![vec!["1", "alpha"], vec!["2", "beta"]]
        );
        assert!(rows(REQUIRED_ID, "  gamma\n").is_empty());
    }

    #[test]
    fn test_unmatched_lines_are_skipped() {
        assert_eq!(
            rows(ID_NAME, "header\n1 alpha\n---\n\n2 beta"),
            vec![vec!["1", "alpha"], vec!["2", "beta"]]
        );
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(rows(ID_NAME, "1 alpha\r\n2 beta\r\n").len(), 2);
    }

    #[test]
    fn test_filldown_carries_host() {
        let template = "Value Filldown Host (\\S+)\nValue Required Fs (\\S+)\n\nStart\n  ^host ${Host}\n  ^fs ${Fs} -> Record\n";
        let text = "host cs0\nfs root\nfs data\nhost cs1\nfs tmp\n";
        assert_eq!(
            rows(template, text),
            vec![
                vec!["cs0", "root"],
                vec!["cs0", "data"],
                vec!["cs1", "tmp"]
            ]
        );
    }

    #[test]
    fn test_required_suppresses_record_and_resets() {
        let template = "Value Required Id (\\d+)\nValue Note (\\w+)\n\nStart\n  ^note ${Note} -> Record\n  ^id ${Id}\n  ^end -> Record\n";
        // First Record fires without Id: dropped, and Note is reset.
        let text = "note orphan\nid 7\nend\n";
        assert_eq!(rows(template, text), vec![vec!["7", ""]]);
    }

    #[test]
    fn test_all_empty_record_is_dropped() {
        let template = "Value A (\\w+)\n\nStart\n  ^sep -> Record\n  ^a ${A}\n";
        assert_eq!(rows(template, "sep\na x\nsep\nsep\n"), vec![vec!["x"]]);
    }

    #[test]
    fn test_list_accumulates() {
        let template = "Value Group (\\d+)\nValue List Disk (\\S+)\n\nStart\n  ^group ${Group}\n  ^\\s+disk ${Disk}\n  ^end -> Record\n";
        let def = compile(template).unwrap();
        let records = run(&def, "group 1\n  disk a\n  disk b\nend\ngroup 2\n  disk c\nend\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0][1].as_list(),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(records[1][1].as_list(), Some(&["c".to_string()][..]));
    }

    #[test]
    fn test_list_filldown_keeps_items() {
        let template = "Value Filldown,List Tag (\\w+)\nValue Id (\\d+)\n\nStart\n  ^tag ${Tag}\n  ^id ${Id} -> Record\n";
        let def = compile(template).unwrap();
        let records = run(&def, "tag a\nid 1\ntag b\nid 2\n").unwrap();
        assert_eq!(records[1][0], FieldValue::List(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_fillup_backfills_until_non_empty() {
        let template = "Value Fillup Pool (\\w+)\nValue Id (\\d+)\n\nStart\n  ^id ${Id} -> Record\n  ^pool ${Pool}\n";
        let text = "pool p0\nid 1\nid 2\nid 3\npool p1\n";
        let def = compile(template).unwrap();
        let records = Extractor::new(&def)
            .with_eof_policy(EofPolicy::Record)
            .run(text)
            .unwrap();
        let pools: Vec<String> = records.iter().map(|r| r[0].to_string()).collect();
        // id 1 holds p0; ids 2 and 3 are filled with p1; the final record holds p1.
        assert_eq!(pools, vec!["p0", "p1", "p1", "p1"]);
    }

    #[test]
    fn test_continue_matches_same_line() {
        let template = "Value A (\\w+)\nValue B (\\w+)\n\nStart\n  ^${A} -> Continue\n  ^\\w+\\s+${B} -> Record\n";
        assert_eq!(rows(template, "x y\n"), vec![vec!["x", "y"]]);
    }

    #[test]
    fn test_first_match_wins() {
        let template = "Value A (\\w+)\n\nStart\n  ^${A} -> Record\n  ^(\\w+) -> Error\n";
        assert_eq!(rows(template, "x\n"), vec![vec!["x"]]);
    }

    #[test]
    fn test_state_transitions() {
        let template = "Value Name (\\S+)\n\nStart\n  ^BEGIN -> Body\n\nBody\n  ^END -> Start\n  ^${Name} -> Record\n";
        let text = "skip\nBEGIN\none\ntwo\nEND\nthree\n";
        assert_eq!(rows(template, text), vec![vec!["one"], vec!["two"]]);
    }

    #[test]
    fn test_error_action_aborts() {
        let template = "Value A (\\w+)\n\nStart\n  ^ok ${A} -> Record\n  ^bad -> Error \"unexpected line\"\n";
        let def = compile(template).unwrap();
        let err = run(&def, "ok a\nbad\n").unwrap_err();
        assert_eq!(
            err,
            ExtractError::RuleError {
                message: Some("unexpected line".to_string()),
                rule_line: 5,
                input_line: 2,
                text: "bad".to_string(),
            }
        );
    }

    #[test]
    fn test_end_discards_pending() {
        let template = "Value A (\\w+)\n\nStart\n  ^a ${A}\n  ^stop -> End\n";
        let def = compile(template).unwrap();
        let records = Extractor::new(&def)
            .with_eof_policy(EofPolicy::Record)
            .run("a x\nstop\na y\n")
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_eof_policy() {
        let template = "Value A (\\w+)\n\nStart\n  ^a ${A}\n";
        let def = compile(template).unwrap();
        assert!(run(&def, "a x\n").unwrap().is_empty());
        let records = Extractor::new(&def)
            .with_eof_policy(EofPolicy::Record)
            .run("a x\n")
            .unwrap();
        assert_eq!(records, vec![vec![FieldValue::from("x")]]);
    }

    #[test]
    fn test_eof_state_rules_run_once() {
        let template = "Value A (\\w+)\n\nStart\n  ^a ${A}\n  ^done -> EOF\n\nEOF\n  ^.* -> Record\n";
        let def = compile(template).unwrap();
        assert_eq!(
            run(&def, "a x\ndone\na y\n").unwrap(),
            vec![vec![FieldValue::from("x")]]
        );
    }

    #[test]
    fn test_clearall_resets_filldown() {
        let template = "Value Filldown H (\\w+)\nValue F (\\w+)\n\nStart\n  ^h ${H}\n  ^f ${F} -> Record\n  ^reset -> Clearall\n";
        assert_eq!(
            rows(template, "h a\nf 1\nreset\nf 2\n"),
            vec![vec!["a", "1"], vec!["", "2"]]
        );
    }

    #[test]
    fn test_optional_group_does_not_overwrite() {
        let template = "Value A (\\w+)\nValue B (\\w+)\n\nStart\n  ^x ${A}(\\s+${B})?$$\n  ^go -> Record\n";
        assert_eq!(rows(template, "x 1 2\nx 3\ngo\n"), vec![vec!["3", "2"]]);
    }

    #[test]
    fn test_records_match_header_arity_and_are_deterministic() {
        let def = compile(ID_NAME).unwrap();
        let text = "1 alpha\nnoise\n2 beta\n3 gamma\n";
        let first = run(&def, text).unwrap();
        let second = run(&def, text).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|r| r.len() == def.header().len()));
    }

    #[test]
    fn test_field_value_serializes_untagged() {
        let record = vec![FieldValue::from("a"), FieldValue::List(vec!["b".into()])];
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"["a",["b"]]"#);
    }
}
