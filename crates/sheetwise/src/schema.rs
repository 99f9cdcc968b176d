//! Record layouts: which field of a record goes to which column of which sheet
//!
//! A layout is declared once per record type with a [`SchemaBuilder`] and
//! checked by [`SchemaBuilder::build`]. Every column carries a pair of typed
//! accessors, so the engine never needs to know the concrete field types.
//!
//! ```rust
//! use sheetwise::{Column, Rule, Schema, SchemaBuilder, SheetRecord};
//!
//! #[derive(Debug, Default, Clone)]
//! struct Person {
//!     name: String,
//!     age: Option<i32>,
//! }
//!
//! impl SheetRecord for Person {
//!     fn layout() -> SchemaBuilder<Self> {
//!         SchemaBuilder::new()
//!             .sheet("people", 0)
//!             .column(
//!                 Column::new("name", "Name", 0)
//!                     .rule(Rule::required())
//!                     .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name),
//!             )
//!             .column(
//!                 Column::new("age", "Age", 1)
//!                     .rule(Rule::max(100.0))
//!                     .value(|p: &Person| &p.age, |p: &mut Person| &mut p.age),
//!             )
//!     }
//! }
//!
//! let schema = Schema::<Person>::of().unwrap();
//! assert_eq!(schema.sheet().name, "people");
//! assert_eq!(schema.headers(), vec!["Name", "Age"]);
//! ```

use std::any::type_name;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use sheetwise_core::{
    CellAddress, DataValidation, INVALID_SHEET_NAME_CHARS, MAX_COLS, MAX_SHEET_NAME_LEN,
};

use crate::codec::DecodeError;
use crate::enumeration::{CodedEnum, EnumerationReference, NamedEnum};
use crate::error::{Error, Result};
use crate::rules::Rule;
use crate::value::{FieldKind, FieldValue};

/// Name of the sheet used when a layout declares none
pub const DEFAULT_SHEET_NAME: &str = "sheet0";

/// A record type that knows its own sheet layout
pub trait SheetRecord: Default + Clone + 'static {
    fn layout() -> SchemaBuilder<Self>;
}

/// Identity of a record type within a registry and a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        RecordKey(key.into())
    }

    /// The default key of a type: its type name
    pub fn of<R: ?Sized>() -> Self {
        RecordKey(type_name::<R>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey::new(s)
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey(s)
    }
}

/// Where a record type lives in the workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSchema {
    pub name: String,
    /// Zero-based sheet position
    pub index: usize,
}

impl Default for SheetSchema {
    fn default() -> Self {
        Self {
            name: DEFAULT_SHEET_NAME.to_string(),
            index: 0,
        }
    }
}

/// One field projected onto one column
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub field: String,
    pub header: String,
    /// Zero-based column position
    pub index: u16,
    /// Comment attached to the header cell
    pub note: Option<String>,
    pub kind: FieldKind,
    /// strftime pattern overriding the engine default for date columns
    pub date_format: Option<String>,
    pub enumeration: Option<EnumerationReference>,
    pub rules: Vec<Rule>,
}

impl ColumnSchema {
    /// Column letter, e.g. `"B"`
    pub fn letter(&self) -> String {
        CellAddress::column_to_letters(self.index)
    }

    pub fn is_unique(&self) -> bool {
        self.rules.iter().any(Rule::is_unique)
    }
}

/// A field type that can be bound with [`Column::value`]
pub trait FieldType: Sized + 'static {
    const KIND: FieldKind;

    fn to_field(&self) -> FieldValue;

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError>;
}

/// A value that can sit inside an `Option` field
pub trait Scalar: Sized + 'static {
    const KIND: FieldKind;

    fn to_field(&self) -> FieldValue;

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError>;
}

fn mismatch(value: &FieldValue, kind: FieldKind) -> DecodeError {
    DecodeError::invalid(value.to_string(), kind)
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_field(&self) -> FieldValue {
        if self.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(self.clone())
        }
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Empty => Ok(String::new()),
            other => <String as Scalar>::from_field(other),
        }
    }
}

impl<T: Scalar> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_field(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field(),
            None => FieldValue::Empty,
        }
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Empty => Ok(None),
            other => T::from_field(other).map(Some),
        }
    }
}

impl Scalar for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_field(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Text(s) => Ok(s),
            other => Err(mismatch(&other, FieldKind::Text)),
        }
    }
}

impl Scalar for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn to_field(&self) -> FieldValue {
        FieldValue::Integer(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Integer(i) => Ok(i),
            other => Err(mismatch(&other, FieldKind::Integer)),
        }
    }
}

macro_rules! narrow_integer {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const KIND: FieldKind = FieldKind::Integer;

                fn to_field(&self) -> FieldValue {
                    FieldValue::Integer(i64::from(*self))
                }

                fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
                    let wide = <i64 as Scalar>::from_field(value)?;
                    <$ty>::try_from(wide).map_err(|_| DecodeError::OutOfRange {
                        value: wide.to_string(),
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

narrow_integer!(i32, u32);

impl Scalar for f64 {
    const KIND: FieldKind = FieldKind::Number;

    fn to_field(&self) -> FieldValue {
        FieldValue::Number(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Number(n) => Ok(n),
            FieldValue::Integer(i) => Ok(i as f64),
            other => Err(mismatch(&other, FieldKind::Number)),
        }
    }
}

impl Scalar for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn to_field(&self) -> FieldValue {
        FieldValue::Boolean(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Boolean(b) => Ok(b),
            other => Err(mismatch(&other, FieldKind::Boolean)),
        }
    }
}

impl Scalar for NaiveDate {
    const KIND: FieldKind = FieldKind::Date;

    fn to_field(&self) -> FieldValue {
        FieldValue::Date(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::Date(d) => Ok(d),
            FieldValue::DateTime(dt) => Ok(dt.date()),
            other => Err(mismatch(&other, FieldKind::Date)),
        }
    }
}

impl Scalar for NaiveDateTime {
    const KIND: FieldKind = FieldKind::DateTime;

    fn to_field(&self) -> FieldValue {
        FieldValue::DateTime(*self)
    }

    fn from_field(value: FieldValue) -> std::result::Result<Self, DecodeError> {
        match value {
            FieldValue::DateTime(dt) => Ok(dt),
            FieldValue::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| mismatch(&FieldValue::Date(d), FieldKind::DateTime)),
            other => Err(mismatch(&other, FieldKind::DateTime)),
        }
    }
}

type Getter<R> = Box<dyn Fn(&R) -> FieldValue + Send + Sync>;
type Setter<R> =
    Box<dyn Fn(&mut R, FieldValue) -> std::result::Result<(), DecodeError> + Send + Sync>;

struct Accessor<R> {
    kind: FieldKind,
    get: Getter<R>,
    set: Setter<R>,
}

/// Declaration of one column, finished by exactly one binding call
/// ([`value`](Column::value), [`coded`](Column::coded),
/// [`named`](Column::named) or `dynamic` for
/// [`DynamicRecord`](crate::DynamicRecord))
pub struct Column<R> {
    field: String,
    header: String,
    index: i64,
    note: Option<String>,
    date_format: Option<String>,
    rules: Vec<Rule>,
    enumeration: Option<EnumerationReference>,
    accessor: Option<Accessor<R>>,
}

impl<R: 'static> Column<R> {
    pub fn new(field: impl Into<String>, header: impl Into<String>, index: i64) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
            index,
            note: None,
            date_format: None,
            rules: Vec::new(),
            enumeration: None,
            accessor: None,
        }
    }

    /// Comment shown on the header cell
    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.note = Some(text.into());
        self
    }

    pub fn date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = Some(pattern.into());
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Attach an option list explicitly (bindings of coded enums do this
    /// on their own)
    pub fn enumeration(mut self, reference: EnumerationReference) -> Self {
        self.enumeration = Some(reference);
        self
    }

    pub(crate) fn field_name(&self) -> &str {
        &self.field
    }

    /// Bind a scalar field: `String` or `Option` of a [`Scalar`]
    pub fn value<T, G, M>(self, get: G, get_mut: M) -> Self
    where
        T: FieldType,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        self.bind(
            T::KIND,
            move |record| get(record).to_field(),
            move |record, value| {
                *get_mut(record) = T::from_field(value)?;
                Ok(())
            },
        )
    }

    /// Bind an `Option<E>` field of a [`CodedEnum`], shown by label
    pub fn coded<E, G, M>(mut self, get: G, get_mut: M) -> Self
    where
        E: CodedEnum,
        G: Fn(&R) -> &Option<E> + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut Option<E> + Send + Sync + 'static,
    {
        self.enumeration = Some(EnumerationReference::of::<E>());
        self.bind(
            FieldKind::Coded,
            move |record| match get(record) {
                Some(e) => FieldValue::Code(e.code().to_string()),
                None => FieldValue::Empty,
            },
            move |record, value| {
                *get_mut(record) = match value {
                    FieldValue::Empty => None,
                    FieldValue::Code(code) => {
                        Some(E::from_code(&code).ok_or(DecodeError::UnknownCode(code))?)
                    }
                    other => return Err(mismatch(&other, FieldKind::Coded)),
                };
                Ok(())
            },
        )
    }

    /// Bind an `Option<E>` field of a [`NamedEnum`], shown by name
    pub fn named<E, G, M>(self, get: G, get_mut: M) -> Self
    where
        E: NamedEnum,
        G: Fn(&R) -> &Option<E> + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut Option<E> + Send + Sync + 'static,
    {
        self.bind(
            FieldKind::Named,
            move |record| match get(record) {
                Some(e) => FieldValue::Symbol(e.name().to_string()),
                None => FieldValue::Empty,
            },
            move |record, value| {
                *get_mut(record) = match value {
                    FieldValue::Empty => None,
                    FieldValue::Symbol(name) => {
                        Some(E::from_name(&name).ok_or(DecodeError::UnknownName(name))?)
                    }
                    other => return Err(mismatch(&other, FieldKind::Named)),
                };
                Ok(())
            },
        )
    }

    pub(crate) fn bind<G, S>(mut self, kind: FieldKind, get: G, set: S) -> Self
    where
        G: Fn(&R) -> FieldValue + Send + Sync + 'static,
        S: Fn(&mut R, FieldValue) -> std::result::Result<(), DecodeError> + Send + Sync + 'static,
    {
        self.accessor = Some(Accessor {
            kind,
            get: Box::new(get),
            set: Box::new(set),
        });
        self
    }
}

/// A checked column together with its accessors
pub(crate) struct BoundColumn<R> {
    pub(crate) schema: ColumnSchema,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R> BoundColumn<R> {
    pub(crate) fn read(&self, record: &R) -> FieldValue {
        (self.get)(record)
    }

    pub(crate) fn write(
        &self,
        record: &mut R,
        value: FieldValue,
    ) -> std::result::Result<(), DecodeError> {
        (self.set)(record, value)
    }
}

/// Collects the sheet and column declarations of one record type
pub struct SchemaBuilder<R> {
    key: Option<String>,
    sheet: Option<(String, i64)>,
    columns: Vec<Column<R>>,
}

impl<R: 'static> Default for SchemaBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: 'static> SchemaBuilder<R> {
    pub fn new() -> Self {
        Self {
            key: None,
            sheet: None,
            columns: Vec::new(),
        }
    }

    pub fn sheet(mut self, name: impl Into<String>, index: i64) -> Self {
        self.sheet = Some((name.into(), index));
        self
    }

    /// Override the record key, needed when several layouts share a type
    pub fn record_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn column(mut self, column: Column<R>) -> Self {
        self.columns.push(column);
        self
    }

    /// The key the built schema will carry
    pub fn key(&self) -> RecordKey {
        match &self.key {
            Some(key) => RecordKey::new(key.as_str()),
            None => RecordKey::of::<R>(),
        }
    }

    /// Check the declarations and freeze them into a [`Schema`]
    pub fn build(self) -> Result<Schema<R>> {
        let key = self.key();
        let fail = |message: String| Error::configuration(key.as_str(), message);

        let sheet = match self.sheet {
            None => SheetSchema::default(),
            Some((name, index)) => {
                if name.trim().is_empty() {
                    return Err(fail("sheet name must not be blank".into()));
                }
                if name.chars().count() > MAX_SHEET_NAME_LEN {
                    return Err(fail(format!(
                        "sheet name '{}' is longer than {} characters",
                        name, MAX_SHEET_NAME_LEN
                    )));
                }
                if let Some(c) = name.chars().find(|c| INVALID_SHEET_NAME_CHARS.contains(c)) {
                    return Err(fail(format!("sheet name '{}' contains '{}'", name, c)));
                }
                let index = usize::try_from(index)
                    .map_err(|_| fail(format!("sheet '{}' has negative index {}", name, index)))?;
                SheetSchema { name, index }
            }
        };

        if self.columns.is_empty() {
            return Err(fail("no columns declared".into()));
        }

        let mut columns: Vec<BoundColumn<R>> = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            let Column {
                field,
                header,
                index,
                note,
                date_format,
                rules,
                enumeration,
                accessor,
            } = column;

            if field.trim().is_empty() {
                return Err(fail(format!("column {} has no field name", index)));
            }
            if header.trim().is_empty() {
                return Err(fail(format!("field '{}' has a blank header", field)));
            }
            if index < 0 {
                return Err(fail(format!(
                    "field '{}' has negative column index {}",
                    field, index
                )));
            }
            let index = u16::try_from(index)
                .ok()
                .filter(|i| *i < MAX_COLS)
                .ok_or_else(|| {
                    fail(format!(
                        "field '{}' column index {} is past the last column",
                        field, index
                    ))
                })?;
            if let Some(other) = columns.iter().find(|c| c.schema.index == index) {
                return Err(fail(format!(
                    "fields '{}' and '{}' share column {}",
                    other.schema.field, field, index
                )));
            }
            if columns.iter().any(|c| c.schema.field == field) {
                return Err(fail(format!("field '{}' is declared twice", field)));
            }
            let Some(Accessor { kind, get, set }) = accessor else {
                return Err(fail(format!("field '{}' is not bound to a value", field)));
            };
            if kind == FieldKind::Coded && enumeration.is_none() {
                return Err(fail(format!("coded field '{}' has no options", field)));
            }
            if let Some(reference) = &enumeration {
                if reference.is_empty() {
                    return Err(fail(format!("field '{}' has an empty option list", field)));
                }
                if let Some(label) = reference.duplicate_label() {
                    return Err(fail(format!(
                        "field '{}' lists option '{}' twice",
                        field, label
                    )));
                }
                // labels become an inline dropdown list
                if let Some(problem) = DataValidation::inline_list_problem(&reference.labels()) {
                    return Err(fail(format!("field '{}': {}", field, problem)));
                }
            }

            columns.push(BoundColumn {
                schema: ColumnSchema {
                    field,
                    header,
                    index,
                    note,
                    kind,
                    date_format,
                    enumeration,
                    rules,
                },
                get,
                set,
            });
        }
        columns.sort_by_key(|c| c.schema.index);

        Ok(Schema {
            key,
            sheet,
            columns,
        })
    }
}

/// The checked layout of one record type
pub struct Schema<R> {
    key: RecordKey,
    sheet: SheetSchema,
    columns: Vec<BoundColumn<R>>,
}

impl<R: SheetRecord> Schema<R> {
    /// Build the layout a [`SheetRecord`] declares
    pub fn of() -> Result<Self> {
        R::layout().build()
    }
}

impl<R: 'static> Schema<R> {
    pub fn builder() -> SchemaBuilder<R> {
        SchemaBuilder::new()
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn sheet(&self) -> &SheetSchema {
        &self.sheet
    }

    /// Columns in left-to-right order
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().map(|c| &c.schema)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, field: &str) -> Option<&ColumnSchema> {
        self.columns().find(|c| c.field == field)
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns().map(|c| c.header.as_str()).collect()
    }

    /// Read one field of a record
    pub fn value_of(&self, record: &R, field: &str) -> Option<FieldValue> {
        self.bound_column(field).map(|c| c.read(record))
    }

    pub(crate) fn bound(&self) -> &[BoundColumn<R>] {
        &self.columns
    }

    pub(crate) fn bound_column(&self, field: &str) -> Option<&BoundColumn<R>> {
        self.columns.iter().find(|c| c.schema.field == field)
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("key", &self.key)
            .field("sheet", &self.sheet)
            .field(
                "columns",
                &self.columns.iter().map(|c| &c.schema).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        name: String,
        age: Option<i32>,
        joined: Option<NaiveDate>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level {
        Low,
        High,
    }

    impl CodedEnum for Level {
        fn entries() -> &'static [(Self, &'static str, &'static str)] {
            &[(Level::Low, "L", "low"), (Level::High, "H", "high")]
        }
    }

    fn name_column(index: i64) -> Column<Person> {
        Column::new("name", "Name", index).value(|p: &Person| &p.name, |p: &mut Person| &mut p.name)
    }

    fn age_column(index: i64) -> Column<Person> {
        Column::new("age", "Age", index).value(|p: &Person| &p.age, |p: &mut Person| &mut p.age)
    }

    fn config_message(result: Result<Schema<Person>>) -> String {
        match result {
            Err(Error::Configuration { message, .. }) => message,
            other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_columns_sorted_by_index() {
        let schema = SchemaBuilder::new()
            .sheet("people", 2)
            .column(age_column(3))
            .column(name_column(1))
            .build()
            .unwrap();

        assert_eq!(schema.headers(), vec!["Name", "Age"]);
        assert_eq!(schema.sheet(), &SheetSchema { name: "people".into(), index: 2 });
        assert_eq!(schema.column("age").map(|c| c.kind), Some(FieldKind::Integer));
        assert_eq!(schema.column("age").map(|c| c.letter()), Some("D".to_string()));
    }

    #[test]
    fn test_default_sheet_and_key() {
        let schema = SchemaBuilder::<Person>::new().column(name_column(0)).build().unwrap();
        assert_eq!(schema.sheet(), &SheetSchema::default());
        assert_eq!(schema.sheet().name, "sheet0");
        assert_eq!(schema.key(), &RecordKey::of::<Person>());
        assert!(schema.key().as_str().ends_with("Person"));
    }

    #[test]
    fn test_record_key_override() {
        let builder = SchemaBuilder::<Person>::new().record_key("staff").column(name_column(0));
        assert_eq!(builder.key(), RecordKey::new("staff"));
        assert_eq!(builder.build().unwrap().key().as_str(), "staff");
    }

    #[test]
    fn test_rejects_blank_header() {
        let column = Column::new("name", "  ", 0).value(|p: &Person| &p.name, |p: &mut Person| &mut p.name);
        let message = config_message(SchemaBuilder::new().column(column).build());
        assert!(message.contains("blank header"));
    }

    #[test]
    fn test_rejects_negative_column_index() {
        let message = config_message(SchemaBuilder::new().column(name_column(-1)).build());
        assert!(message.contains("negative column index -1"));
    }

    #[test]
    fn test_rejects_duplicate_column_index() {
        let message = config_message(
            SchemaBuilder::new()
                .column(name_column(0))
                .column(age_column(0))
                .build(),
        );
        assert!(message.contains("share column 0"));
    }

    #[test]
    fn test_rejects_duplicate_field() {
        let message = config_message(
            SchemaBuilder::new()
                .column(name_column(0))
                .column(name_column(1))
                .build(),
        );
        assert!(message.contains("declared twice"));
    }

    #[test]
    fn test_rejects_bad_sheet() {
        let blank = config_message(SchemaBuilder::new().sheet(" ", 0).column(name_column(0)).build());
        assert!(blank.contains("sheet name"));

        let negative = config_message(SchemaBuilder::new().sheet("people", -2).column(name_column(0)).build());
        assert!(negative.contains("negative index -2"));

        let long = "x".repeat(32);
        let too_long = config_message(SchemaBuilder::new().sheet(long, 0).column(name_column(0)).build());
        assert!(too_long.contains("longer than 31"));
        assert!(SchemaBuilder::new().sheet("人".repeat(31), 0).column(name_column(0)).build().is_ok());

        let slash = config_message(SchemaBuilder::new().sheet("2024/03", 0).column(name_column(0)).build());
        assert!(slash.contains("contains '/'"));
    }

    #[test]
    fn test_rejects_unbound_column() {
        let message = config_message(
            SchemaBuilder::new()
                .column(Column::new("name", "Name", 0))
                .build(),
        );
        assert!(message.contains("not bound"));
    }

    #[test]
    fn test_rejects_empty_column_list() {
        let message = config_message(SchemaBuilder::<Person>::new().build());
        assert!(message.contains("no columns"));
    }

    #[test]
    fn test_rejects_bad_option_lists() {
        let empty = Column::new("name", "Name", 0)
            .enumeration(EnumerationReference::default())
            .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name);
        assert!(config_message(SchemaBuilder::new().column(empty).build()).contains("empty option list"));

        let duplicated = Column::new("name", "Name", 0)
            .enumeration(EnumerationReference::new([("a", "x"), ("b", "x")]))
            .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name);
        assert!(config_message(SchemaBuilder::new().column(duplicated).build()).contains("option 'x' twice"));
    }

    /// Labels that cannot be offered in a dropdown are refused up front
    #[test]
    fn test_rejects_labels_unfit_for_dropdown() {
        let comma = Column::new("name", "Name", 0)
            .enumeration(EnumerationReference::new([("1", "Paused, waiting"), ("2", "Running")]))
            .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name);
        let message = config_message(SchemaBuilder::new().column(comma).build());
        assert!(message.contains("'Paused, waiting' contains a comma"));

        let codes: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        let labels: Vec<String> = (0..40).map(|i| format!("option-{:02}", i)).collect();
        let crowded = Column::new("name", "Name", 0)
            .enumeration(EnumerationReference::new(
                codes.iter().map(String::as_str).zip(labels.iter().map(String::as_str)),
            ))
            .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name);
        let message = config_message(SchemaBuilder::new().column(crowded).build());
        assert!(message.contains("max 255"));
    }

    #[test]
    fn test_accessors_round_trip_values() {
        let schema = SchemaBuilder::new()
            .column(name_column(0))
            .column(age_column(1))
            .column(
                Column::new("joined", "Joined", 2)
                    .value(|p: &Person| &p.joined, |p: &mut Person| &mut p.joined),
            )
            .build()
            .unwrap();

        let mut person = Person::default();
        let date = NaiveDate::from_ymd_opt(2023, 5, 17).unwrap();
        schema.bound()[0].write(&mut person, FieldValue::text("Zhang")).unwrap();
        schema.bound()[1].write(&mut person, FieldValue::Integer(42)).unwrap();
        schema.bound()[2].write(&mut person, FieldValue::Date(date)).unwrap();

        assert_eq!(
            person,
            Person { name: "Zhang".into(), age: Some(42), joined: Some(date) }
        );
        assert_eq!(schema.value_of(&person, "age"), Some(FieldValue::Integer(42)));
        assert_eq!(schema.value_of(&Person::default(), "name"), Some(FieldValue::Empty));
        assert_eq!(schema.value_of(&person, "missing"), None);
    }

    #[test]
    fn test_integer_out_of_range() {
        let schema = SchemaBuilder::new().column(age_column(0)).build().unwrap();
        let mut person = Person::default();
        let err = schema.bound()[0]
            .write(&mut person, FieldValue::Integer(i64::MAX))
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { target: "i32", .. }));
    }

    #[derive(Debug, Default, Clone)]
    struct Task {
        level: Option<Level>,
    }

    #[test]
    fn test_coded_binding() {
        let schema = SchemaBuilder::new()
            .column(Column::new("level", "Level", 0).coded(|t: &Task| &t.level, |t: &mut Task| &mut t.level))
            .build()
            .unwrap();

        let column = schema.column("level").unwrap();
        assert_eq!(column.kind, FieldKind::Coded);
        assert_eq!(column.enumeration.as_ref().map(|e| e.labels()), Some(vec!["low", "high"]));

        let mut task = Task::default();
        schema.bound()[0].write(&mut task, FieldValue::Code("H".into())).unwrap();
        assert_eq!(task.level, Some(Level::High));
        assert_eq!(schema.value_of(&task, "level"), Some(FieldValue::Code("H".into())));

        let err = schema.bound()[0].write(&mut task, FieldValue::Code("Z".into())).unwrap_err();
        assert_eq!(err, DecodeError::UnknownCode("Z".into()));
    }
}
