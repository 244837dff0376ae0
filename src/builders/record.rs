//! Typed views over extracted records.
//!
//! A row struct names the columns a template is expected to produce. The
//! conversion checks the template header (or at least the record width)
//! before any field is read, so a template edit that shifts columns fails
//! loudly instead of silently mislabeling data.

use crate::core::error::RecordError;
use crate::core::extractor::{FieldValue, Record};

/// Conversion between an untyped [`Record`] and a row struct.
///
/// Implemented by [`record_struct!`](crate::record_struct).
pub trait FromRecord: Sized {
    const NAME: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Builds the row from exactly `COLUMNS.len()` fields.
    fn from_fields(fields: Vec<FieldValue>) -> Self;

    fn into_record(self) -> Record;

    /// Checks a template header against the declared columns, by position.
    fn check_header(header: &[String]) -> Result<(), RecordError> {
        if header.len() != Self::COLUMNS.len() {
            return Err(RecordError::Arity {
                row: Self::NAME,
                expected: Self::COLUMNS.len(),
                found: header.len(),
            });
        }
        for (position, (expected, found)) in Self::COLUMNS.iter().zip(header).enumerate() {
            if *expected != found.as_str() {
                return Err(RecordError::Column {
                    row: Self::NAME,
                    position,
                    expected: *expected,
                    found: found.clone(),
                });
            }
        }
        Ok(())
    }

    fn from_record(record: Record) -> Result<Self, RecordError> {
        if record.len() != Self::COLUMNS.len() {
            return Err(RecordError::Arity {
                row: Self::NAME,
                expected: Self::COLUMNS.len(),
                found: record.len(),
            });
        }
        Ok(Self::from_fields(record))
    }

    /// Header row for a table built from this struct.
    fn header() -> Vec<String> {
        Self::COLUMNS.iter().map(|c| c.to_string()).collect()
    }
}

/// Declares a row struct whose fields map to named columns, in order.
///
/// ```
/// ntsparser::record_struct! {
///     pub struct NodeRow {
///         name => "Name",
///         node => "Node",
///     }
/// }
/// ```
#[macro_export]
macro_rules! record_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident => $column:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        $vis struct $name {
            $(pub $field: $crate::core::extractor::FieldValue,)+
        }

        impl $crate::builders::record::FromRecord for $name {
            const NAME: &'static str = stringify!($name);
            const COLUMNS: &'static [&'static str] = &[$($column),+];

            fn from_fields(fields: ::std::vec::Vec<$crate::core::extractor::FieldValue>) -> Self {
                let mut fields = fields.into_iter();
                Self {
                    $($field: fields.next().unwrap_or_default(),)+
                }
            }

            fn into_record(self) -> $crate::core::extractor::Record {
                vec![$(self.$field),+]
            }
        }
    };
}
