//! Declarative field rules and the failures they produce

use regex::Regex;

use crate::schema::Schema;
use crate::value::FieldValue;

/// Placeholder replaced by the offending value in custom messages
pub const VALUE_PLACEHOLDER: &str = "{value}";

#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Value must be present and not blank
    Required,
    /// Numeric value must be at least this
    Min(f64),
    /// Numeric value must be at most this
    Max(f64),
    /// Text must have at most this many characters
    MaxLength(usize),
    /// Text must match the expression
    Pattern(Regex),
    /// Value must not repeat within the sheet
    Unique,
}

/// A rule attached to a column, with an optional custom message
#[derive(Debug, Clone)]
pub struct Rule {
    kind: RuleKind,
    message: Option<String>,
}

impl Rule {
    pub fn new(kind: RuleKind) -> Self {
        Self { kind, message: None }
    }

    pub fn required() -> Self {
        Self::new(RuleKind::Required)
    }

    pub fn min(min: f64) -> Self {
        Self::new(RuleKind::Min(min))
    }

    pub fn max(max: f64) -> Self {
        Self::new(RuleKind::Max(max))
    }

    pub fn max_length(len: usize) -> Self {
        Self::new(RuleKind::MaxLength(len))
    }

    pub fn pattern(regex: Regex) -> Self {
        Self::new(RuleKind::Pattern(regex))
    }

    pub fn unique() -> Self {
        Self::new(RuleKind::Unique)
    }

    /// Replace the default message; `{value}` expands to the field value
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.kind, RuleKind::Unique)
    }

    /// Check a single value. Uniqueness needs the other rows and always
    /// passes here.
    pub fn check(&self, value: &FieldValue) -> Option<String> {
        let broken = match &self.kind {
            RuleKind::Required => value.is_blank(),
            RuleKind::Min(min) => value.as_f64().map_or(false, |v| v < *min),
            RuleKind::Max(max) => value.as_f64().map_or(false, |v| v > *max),
            RuleKind::MaxLength(len) => value
                .as_str()
                .map_or(false, |s| s.chars().count() > *len),
            RuleKind::Pattern(regex) => value
                .as_str()
                .map_or(false, |s| !s.is_empty() && !regex.is_match(s)),
            RuleKind::Unique => false,
        };
        broken.then(|| self.message_for(value))
    }

    pub(crate) fn message_for(&self, value: &FieldValue) -> String {
        match &self.message {
            Some(message) => message.replace(VALUE_PLACEHOLDER, &value.to_string()),
            None => match &self.kind {
                RuleKind::Required => "must not be blank".to_string(),
                RuleKind::Min(min) => format!("must be at least {}", min),
                RuleKind::Max(max) => format!("must be at most {}", max),
                RuleKind::MaxLength(len) => format!("must be at most {} characters", len),
                RuleKind::Pattern(regex) => format!("must match {}", regex.as_str()),
                RuleKind::Unique => format!("duplicate value '{}'", value),
            },
        }
    }
}

/// Failure messages of one record, keyed by field in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    entries: Vec<(String, Vec<String>)>,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    /// Builder-style [`add`](Self::add)
    pub fn with(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.add(field, message);
        self
    }

    pub fn extend(&mut self, other: ValidationFailure) {
        for (field, messages) in other.entries {
            for message in messages {
                self.add(field.clone(), message);
            }
        }
    }

    /// Add the fields of `other` that have no messages here yet
    pub(crate) fn extend_new_fields(&mut self, other: ValidationFailure) {
        for (field, messages) in other.entries {
            if !self.contains(&field) {
                self.entries.push((field, messages));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of failing fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| f == field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map_or(&[], |(_, m)| m.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(f, m)| (f.as_str(), m.as_slice()))
    }
}

/// Source of per-field violation messages.
///
/// Uniqueness spans the whole sheet and is checked by
/// [`RowContext`](crate::RowContext) instead.
pub trait FieldRuleValidator<R> {
    fn violations(&self, record: &R, field: &str) -> Vec<String>;
}

impl<R: 'static> FieldRuleValidator<R> for Schema<R> {
    fn violations(&self, record: &R, field: &str) -> Vec<String> {
        let Some(column) = self.bound_column(field) else {
            return Vec::new();
        };
        let value = column.read(record);
        column
            .schema
            .rules
            .iter()
            .filter_map(|rule| rule.check(&value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, SchemaBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_required() {
        let rule = Rule::required();
        assert_eq!(rule.check(&FieldValue::Empty), Some("must not be blank".into()));
        assert_eq!(rule.check(&FieldValue::text(" ")), Some("must not be blank".into()));
        assert_eq!(rule.check(&FieldValue::text("Zhang")), None);
        assert_eq!(rule.check(&FieldValue::Integer(0)), None);
    }

    #[test]
    fn test_range() {
        assert_eq!(Rule::max(100.0).check(&FieldValue::Integer(188)), Some("must be at most 100".into()));
        assert_eq!(Rule::max(100.0).check(&FieldValue::Integer(100)), None);
        assert_eq!(Rule::min(0.5).check(&FieldValue::Number(0.25)), Some("must be at least 0.5".into()));
        // absent values are left to Required
        assert_eq!(Rule::max(100.0).check(&FieldValue::Empty), None);
    }

    #[test]
    fn test_length_and_pattern() {
        assert_eq!(Rule::max_length(2).check(&FieldValue::text("张三丰")), Some("must be at most 2 characters".into()));
        assert_eq!(Rule::max_length(3).check(&FieldValue::text("张三丰")), None);

        let rule = Rule::pattern(Regex::new(r"^\d{3}$").unwrap());
        assert_eq!(rule.check(&FieldValue::text("002")), None);
        assert_eq!(rule.check(&FieldValue::text("02")), Some(r"must match ^\d{3}$".into()));
        assert_eq!(rule.check(&FieldValue::Empty), None);
    }

    #[test]
    fn test_custom_message() {
        let rule = Rule::max(100.0).with_message("年龄不能超过100");
        assert_eq!(rule.check(&FieldValue::Integer(188)), Some("年龄不能超过100".into()));

        let rule = Rule::unique().with_message("员工编号{value}重复");
        assert_eq!(rule.message_for(&FieldValue::text("002")), "员工编号002重复");
        assert_eq!(rule.check(&FieldValue::text("002")), None);
    }

    #[test]
    fn test_failure_keeps_insertion_order() {
        let mut failure = ValidationFailure::new();
        failure.add("b", "first");
        failure.add("a", "second");
        failure.add("b", "third");

        assert_eq!(failure.fields().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(failure.messages("b"), &["first".to_string(), "third".to_string()]);
        assert_eq!(failure.messages("zzz"), &[] as &[String]);
        assert_eq!(failure.len(), 2);
    }

    #[test]
    fn test_extend_new_fields_skips_known() {
        let mut failure = ValidationFailure::new().with("age", "'x' is not a valid whole number");
        failure.extend_new_fields(
            ValidationFailure::new()
                .with("age", "must be at most 100")
                .with("name", "must not be blank"),
        );
        assert_eq!(failure.messages("age").len(), 1);
        assert!(failure.contains("name"));
    }

    #[derive(Debug, Default, Clone)]
    struct Person {
        name: String,
        age: Option<i32>,
    }

    #[test]
    fn test_schema_violations() {
        let schema = SchemaBuilder::new()
            .column(
                Column::new("name", "Name", 0)
                    .rule(Rule::required())
                    .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name),
            )
            .column(
                Column::new("age", "Age", 1)
                    .rule(Rule::min(0.0))
                    .rule(Rule::max(100.0))
                    .value(|p: &Person| &p.age, |p: &mut Person| &mut p.age),
            )
            .build()
            .unwrap();

        let person = Person { name: String::new(), age: Some(188) };
        assert_eq!(schema.violations(&person, "name"), vec!["must not be blank".to_string()]);
        assert_eq!(schema.violations(&person, "age"), vec!["must be at most 100".to_string()]);
        assert!(schema.violations(&person, "unknown").is_empty());
    }
}
