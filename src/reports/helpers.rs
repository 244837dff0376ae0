//! Row post-processing shared by the vendor builders.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use indexmap::IndexMap;

use crate::core::extractor::{FieldValue, Record};

/// Placeholder written into the last column of an array that produced no data.
pub const NO_DATA: &str = "No data for this array";

/// Columns `key` of `row`; columns past the end read as empty.
pub fn key_of(row: &Record, key: &[usize]) -> Vec<FieldValue> {
    key.iter()
        .map(|&i| row.get(i).cloned().unwrap_or_default())
        .collect()
}

/// Keeps the first row of every distinct key, in order.
pub fn unique_by(rows: Vec<Record>, key: &[usize]) -> Vec<Record> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(key_of(row, key)))
        .collect()
}

/// Groups rows by key, groups in order of first appearance.
pub fn group_by(rows: Vec<Record>, key: &[usize]) -> IndexMap<Vec<FieldValue>, Vec<Record>> {
    let mut groups: IndexMap<Vec<FieldValue>, Vec<Record>> = IndexMap::new();
    for row in rows {
        groups.entry(key_of(&row, key)).or_default().push(row);
    }
    groups
}

/// Text of a cell as one string; list items are concatenated.
pub fn cell_text(field: &FieldValue) -> String {
    match field {
        FieldValue::Single(s) => s.clone(),
        FieldValue::List(items) => items.concat(),
    }
}

/// Handles rows that carry nothing but the array name.
///
/// Such rows come from `Filldown` array names being recorded on an empty
/// section. If it is the only row of its array it is kept with [`NO_DATA`]
/// in the last column, otherwise it is dropped.
pub fn check_empty_arrays(rows: Vec<Record>) -> Vec<Record> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in &rows {
        if let Some(first) = row.first() {
            *counts.entry(cell_text(first)).or_default() += 1;
        }
    }

    let mut kept = Vec::with_capacity(rows.len());
    for mut row in rows {
        let Some(first) = row.first() else {
            continue;
        };
        let name = cell_text(first);
        let blank = row[1..].iter().all(|f| cell_text(f).is_empty());
        if !blank {
            kept.push(row);
            continue;
        }

        let count = counts.entry(name).or_default();
        if *count == 1 {
            if let Some(last) = row.last_mut() {
                *last = FieldValue::from(NO_DATA);
            }
            kept.push(row);
        } else {
            *count = count.saturating_sub(1);
        }
    }
    kept
}

/// Replaces a serial number in the first column with its array name.
pub fn take_array_names(rows: &mut [Record], names: &HashMap<String, String>) {
    for row in rows {
        if let Some(FieldValue::Single(serial)) = row.first_mut()
            && let Some(name) = names.get(serial.as_str())
        {
            *serial = name.clone();
        }
    }
}

/// Divides an all-digit capacity by `factor`; anything else reads as `"0"`.
pub fn capacity_conversion(capacity: &str, factor: u64) -> String {
    if capacity.is_empty() || !capacity.chars().all(|c| c.is_ascii_digit()) {
        return "0".to_string();
    }
    match capacity.parse::<f64>() {
        Ok(value) => format!("{:?}", value / factor as f64),
        Err(_) => "0".to_string(),
    }
}

/// Inner-joins tables on the `key` columns, left to right.
///
/// For each step the right table drives the order: every right row is
/// paired with each matching left row, and the joined row is the left row
/// followed by the right row without its key columns.
pub fn join_on(key: &[usize], tables: Vec<Vec<Record>>) -> Result<Vec<Record>> {
    if tables.len() < 2 {
        bail!("A join needs at least two tables, got {}", tables.len());
    }

    let mut tables = tables.into_iter();
    let mut rows = tables.next().unwrap_or_default();
    for right in tables {
        let left = group_by(rows, key);
        let mut joined = Vec::new();
        for right_row in right {
            if let Some(matches) = left.get(&key_of(&right_row, key)) {
                for left_row in matches {
                    let mut row = left_row.clone();
                    row.extend(right_row.iter().skip(key.len()).cloned());
                    joined.push(row);
                }
            }
        }
        rows = joined;
    }
    Ok(rows)
}

/// Splits a property string into words the way a POSIX shell would:
/// whitespace separates words, quotes group them and backslash escapes.
pub fn split_words(text: &str) -> Result<Vec<String>> {
    match shlex::split(text) {
        Some(words) => Ok(words),
        None => bail!("Unbalanced quotes in '{}'", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Record {
        cells.iter().map(|c| FieldValue::from(*c)).collect()
    }

    #[test]
    fn test_unique_by_keeps_first() {
        let rows = vec![
            row(&["a", "1", "x"]),
            row(&["a", "1", "y"]),
            row(&["a", "2", "z"]),
        ];
        let unique = unique_by(rows, &[0, 1]);
        assert_eq!(unique, vec![row(&["a", "1", "x"]), row(&["a", "2", "z"])]);
    }

    #[test]
    fn test_check_empty_arrays() {
        let rows = vec![
            row(&["arr1", "", ""]),
            row(&["arr1", "rg0", "5"]),
            row(&["arr2", "", ""]),
        ];
        let checked = check_empty_arrays(rows);
        assert_eq!(
            checked,
            vec![row(&["arr1", "rg0", "5"]), row(&["arr2", "", NO_DATA])]
        );
    }

    #[test]
    fn test_check_empty_arrays_with_lists() {
        let mut blank = row(&["arr1", ""]);
        blank.push(FieldValue::List(vec![]));
        let checked = check_empty_arrays(vec![blank]);
        assert_eq!(checked[0][2], FieldValue::from(NO_DATA));
    }

    #[test]
    fn test_take_array_names() {
        let mut rows = vec![row(&["CKM001", "x"]), row(&["unknown", "y"])];
        let names = HashMap::from([("CKM001".to_string(), "vnx01".to_string())]);
        take_array_names(&mut rows, &names);
        assert_eq!(rows, vec![row(&["vnx01", "x"]), row(&["unknown", "y"])]);
    }

    #[test]
    fn test_capacity_conversion() {
        assert_eq!(capacity_conversion("2147483648", 2147483648), "1.0");
        assert_eq!(capacity_conversion("1073741824", 2147483648), "0.5");
        assert_eq!(capacity_conversion("N/A", 1024), "0");
        assert_eq!(capacity_conversion("", 1024), "0");
        assert_eq!(capacity_conversion("-5", 1024), "0");
    }

    #[test]
    fn test_join_on_order_and_key_removal() {
        let left = vec![row(&["a", "l1"]), row(&["b", "l2"]), row(&["a", "l3"])];
        let right = vec![row(&["b", "r1"]), row(&["a", "r2"]), row(&["c", "r3"])];
        let joined = join_on(&[0], vec![left, right]).unwrap();
        assert_eq!(
            joined,
            vec![
                row(&["b", "l2", "r1"]),
                row(&["a", "l1", "r2"]),
                row(&["a", "l3", "r2"]),
            ]
        );
        assert!(join_on(&[0], vec![vec![row(&["a"])]]).is_err());
    }

    #[test]
    fn test_join_three_tables() {
        let a = vec![row(&["sys1", "cap"])];
        let b = vec![row(&["sys1", "fw"])];
        let c = vec![row(&["sys1", "ok", "full"])];
        let joined = join_on(&[0], vec![a, b, c]).unwrap();
        assert_eq!(joined, vec![row(&["sys1", "cap", "fw", "ok", "full"])]);
    }

    #[test]
    fn test_group_by_order() {
        let rows = vec![row(&["b", "1"]), row(&["a", "2"]), row(&["b", "3"])];
        let groups = group_by(rows, &[0]);
        let keys: Vec<String> = groups.keys().map(|k| k[0].to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words(r#""/root_vdm_1/fs1" umask=022 maxusr=4294967294 comment="My share""#)
                .unwrap(),
            vec!["/root_vdm_1/fs1", "umask=022", "maxusr=4294967294", "comment=My share"]
        );
        assert_eq!(split_words("rw=a:b  root=c").unwrap(), vec!["rw=a:b", "root=c"]);
        assert_eq!(split_words(r"a\ b 'c d'").unwrap(), vec!["a b", "c d"]);
        assert!(split_words("   ").unwrap().is_empty());
        assert!(split_words(r#"comment="open"#).is_err());
    }
}
