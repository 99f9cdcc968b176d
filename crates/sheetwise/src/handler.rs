//! Per-record-type hooks invoked by the import engine

use std::collections::HashMap;

use crate::rules::{FieldRuleValidator, ValidationFailure};
use crate::schema::Schema;
use crate::snapshot::DatasetSnapshot;
use crate::value::FieldValue;

/// Business logic for one record type.
///
/// For every sheet the engine decodes all rows, then for each row in order
/// calls [`validate`](Self::validate). Rows without failures go through
/// [`enrich`](Self::enrich) and end up in the valid list; the others are
/// kept untouched in the invalid list. Finally [`on_valid`](Self::on_valid)
/// and [`on_invalid`](Self::on_invalid) receive the two lists once.
///
/// ```rust
/// use sheetwise::{RowContext, RowHandler, ValidationFailure};
///
/// #[derive(Debug, Default, Clone)]
/// struct Position {
///     staff_code: String,
///     headcount: i64,
/// }
///
/// struct Positions;
///
/// impl RowHandler<Position> for Positions {
///     fn validate(&self, row: &Position, ctx: &RowContext<'_, Position>) -> ValidationFailure {
///         let mut failure = ctx.check_fields(row);
///         if row.headcount < 0 {
///             failure.add("headcount", "must not be negative");
///         }
///         failure
///     }
///
///     fn on_valid(&self, rows: &[Position]) {
///         println!("saving {} positions", rows.len());
///     }
/// }
/// ```
pub trait RowHandler<R: 'static>: Send + Sync {
    /// Failures of one row; the declared field rules by default
    fn validate(&self, record: &R, ctx: &RowContext<'_, R>) -> ValidationFailure {
        ctx.check_fields(record)
    }

    /// Adjust a row that passed validation
    fn enrich(&self, record: R) -> R {
        record
    }

    fn on_valid(&self, records: &[R]);

    fn on_invalid(&self, records: &[R]) {
        let _ = records;
    }
}

/// What a handler may look at while validating a row
pub struct RowContext<'a, R> {
    snapshot: &'a DatasetSnapshot,
    schema: &'a Schema<R>,
    rows: &'a [R],
    /// Occurrences per value of every unique column
    counts: HashMap<&'a str, HashMap<String, usize>>,
}

impl<'a, R: 'static> RowContext<'a, R> {
    pub fn new(snapshot: &'a DatasetSnapshot, schema: &'a Schema<R>, rows: &'a [R]) -> Self {
        let mut counts: HashMap<&'a str, HashMap<String, usize>> = HashMap::new();
        for column in schema.bound().iter().filter(|c| c.schema.is_unique()) {
            let seen = counts.entry(column.schema.field.as_str()).or_default();
            for row in rows {
                let value = column.read(row);
                if !value.is_blank() {
                    *seen.entry(value.to_string()).or_insert(0) += 1;
                }
            }
        }
        Self {
            snapshot,
            schema,
            rows,
            counts,
        }
    }

    /// Everything decoded so far in this run
    pub fn snapshot(&self) -> &'a DatasetSnapshot {
        self.snapshot
    }

    /// All decoded rows of the sheet being validated, valid or not
    pub fn same_sheet(&self) -> &'a [R] {
        self.rows
    }

    pub fn schema(&self) -> &'a Schema<R> {
        self.schema
    }

    /// How many rows of this sheet hold `value` in `field`
    pub fn occurrences(&self, field: &str, value: &FieldValue) -> usize {
        if let Some(seen) = self.counts.get(field) {
            return seen.get(&value.to_string()).copied().unwrap_or(0);
        }
        match self.schema.bound_column(field) {
            Some(column) => self
                .rows
                .iter()
                .filter(|row| column.read(row) == *value)
                .count(),
            None => 0,
        }
    }

    /// Failures from the rules declared on the columns, uniqueness included
    pub fn check_fields(&self, record: &R) -> ValidationFailure {
        self.check_fields_with(record, self.schema)
    }

    /// Failures of every bound field as reported by `validator`, followed by
    /// the uniqueness rules of the schema
    pub fn check_fields_with(
        &self,
        record: &R,
        validator: &dyn FieldRuleValidator<R>,
    ) -> ValidationFailure {
        let mut failure = ValidationFailure::new();
        for column in self.schema.bound() {
            let field = column.schema.field.as_str();
            for message in validator.violations(record, field) {
                failure.add(field, message);
            }

            let value = column.read(record);
            if value.is_blank() || self.occurrences(field, &value) < 2 {
                continue;
            }
            for rule in column.schema.rules.iter().filter(|r| r.is_unique()) {
                failure.add(field, rule.message_for(&value));
            }
        }
        failure
    }
}
