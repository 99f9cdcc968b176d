//! Records whose layout is only known at runtime
//!
//! A [`SchemaDefinition`] is a JSON description of one or more sheets. Each
//! sheet becomes a `Schema<DynamicRecord>` keyed by the sheet name, so any
//! number of definitions can share the [`DynamicRecord`] type.
//!
//! ```rust
//! use sheetwise::{FieldValue, SchemaDefinition};
//!
//! let definition = SchemaDefinition::from_json(r#"{
//!     "sheets": [{
//!         "name": "people",
//!         "columns": [
//!             { "field": "name", "header": "Name", "index": 0, "rules": { "required": true } },
//!             { "field": "age", "header": "Age", "index": 1, "kind": "integer", "rules": { "max": 100 } }
//!         ]
//!     }]
//! }"#).unwrap();
//!
//! let schemas = definition.schemas().unwrap();
//! assert_eq!(schemas[0].key().as_str(), "people");
//! assert_eq!(schemas[0].headers(), vec!["Name", "Age"]);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetwise_core::CellValue;

use crate::codec::{self, DecodeError};
use crate::enumeration::EnumerationReference;
use crate::error::{Error, Result};
use crate::handler::RowHandler;
use crate::options::EngineOptions;
use crate::registry::{HandlerRegistry, SheetType};
use crate::rules::Rule;
use crate::schema::{Column, ColumnSchema, Schema, SchemaBuilder};
use crate::value::{FieldKind, FieldValue};

/// A record as a map from field name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    values: BTreeMap<String, FieldValue>,
}

impl DynamicRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// The value of a field, [`FieldValue::Empty`] when unset
    pub fn value(&self, field: &str) -> FieldValue {
        self.values.get(field).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Column<DynamicRecord> {
    /// Bind the column to the record entry named after its field
    pub fn dynamic(self, kind: FieldKind) -> Self {
        let read_field = self.field_name().to_string();
        let write_field = read_field.clone();
        self.bind(
            kind,
            move |record: &DynamicRecord| record.value(&read_field),
            move |record: &mut DynamicRecord, value| {
                record.set(write_field.as_str(), value);
                Ok(())
            },
        )
    }
}

/// Handler that relies on the declared rules alone and logs the outcome
#[derive(Debug, Clone, Default)]
pub struct RuleHandler {
    label: String,
}

impl RuleHandler {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl<R: 'static> RowHandler<R> for RuleHandler {
    fn on_valid(&self, records: &[R]) {
        info!("{}: {} valid row(s)", self.label, records.len());
    }

    fn on_invalid(&self, records: &[R]) {
        if !records.is_empty() {
            info!("{}: {} invalid row(s)", self.label, records.len());
        }
    }
}

/// JSON description of a workbook layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub sheets: Vec<SheetDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetDefinition {
    pub name: String,
    /// Sheet position; the position in the definition when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub field: String,
    pub header: String,
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDefinition>,
    #[serde(default)]
    pub rules: RuleDefinition,
}

/// One `(code, label)` option of an enumeration column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    #[serde(default)]
    pub unique: bool,
    /// Replaces the default message of every rule of the column
    pub message: Option<String>,
}

impl SchemaDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// One schema per sheet, in definition order
    pub fn schemas(&self) -> Result<Vec<Schema<DynamicRecord>>> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(position, sheet)| sheet.schema(position))
            .collect()
    }

    /// Register every sheet with a [`RuleHandler`] and return the sheets to
    /// import, in definition order
    pub fn register_all(&self, registry: &mut HandlerRegistry) -> Result<Vec<SheetType>> {
        let mut sheets = Vec::with_capacity(self.sheets.len());
        for schema in self.schemas()? {
            sheets.push(SheetType::keyed::<DynamicRecord>(schema.key().clone()));
            let label = schema.sheet().name.clone();
            registry.register(schema, RuleHandler::new(label));
        }
        Ok(sheets)
    }
}

impl SheetDefinition {
    fn schema(&self, position: usize) -> Result<Schema<DynamicRecord>> {
        let index = self
            .index
            .unwrap_or_else(|| i64::try_from(position).unwrap_or(i64::MAX));
        let mut builder = SchemaBuilder::<DynamicRecord>::new()
            .record_key(self.name.as_str())
            .sheet(self.name.as_str(), index);
        for column in &self.columns {
            builder = builder.column(column.column(&self.name)?);
        }
        builder.build()
    }
}

impl ColumnDefinition {
    fn column(&self, sheet: &str) -> Result<Column<DynamicRecord>> {
        let mut column = Column::new(self.field.as_str(), self.header.as_str(), self.index);
        if let Some(note) = &self.note {
            column = column.note(note.as_str());
        }
        if let Some(pattern) = &self.date_format {
            column = column.date_format(pattern.as_str());
        }
        if !self.options.is_empty() {
            column = column.enumeration(EnumerationReference::new(
                self.options.iter().map(|o| (o.code.as_str(), o.label.as_str())),
            ));
        }
        for rule in self.rules.rules(sheet, &self.field)? {
            column = column.rule(rule);
        }
        Ok(column.dynamic(self.kind))
    }
}

impl RuleDefinition {
    fn rules(&self, sheet: &str, field: &str) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        if self.required {
            rules.push(Rule::required());
        }
        if let Some(min) = self.min {
            rules.push(Rule::min(min));
        }
        if let Some(max) = self.max {
            rules.push(Rule::max(max));
        }
        if let Some(len) = self.max_length {
            rules.push(Rule::max_length(len));
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|e| {
                Error::configuration(sheet, format!("field '{}' has an invalid pattern: {}", field, e))
            })?;
            rules.push(Rule::pattern(regex));
        }
        if self.unique {
            rules.push(Rule::unique());
        }
        if let Some(message) = &self.message {
            rules = rules
                .into_iter()
                .map(|rule| rule.with_message(message.as_str()))
                .collect();
        }
        Ok(rules)
    }
}

/// Convert JSON row objects into records of `schema`
pub fn records_from_json(
    schema: &Schema<DynamicRecord>,
    rows: &[Value],
    options: &EngineOptions,
) -> Result<Vec<DynamicRecord>> {
    let sheet = &schema.sheet().name;
    let data_error = |row: usize, field: &str, message: String| Error::Data {
        sheet: sheet.clone(),
        row,
        field: field.to_string(),
        message,
    };

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let number = i + 1;
        let Value::Object(object) = row else {
            return Err(data_error(number, "", "expected an object".into()));
        };
        for key in object.keys() {
            if schema.column(key).is_none() {
                warn!("sheet '{}' row {}: ignoring unknown field '{}'", sheet, number, key);
            }
        }

        let mut record = DynamicRecord::new();
        for column in schema.columns() {
            let value = object.get(&column.field).unwrap_or(&Value::Null);
            let field_value = json_field(value, column, options)
                .map_err(|e| data_error(number, &column.field, e.to_string()))?;
            record.set(column.field.as_str(), field_value);
        }
        records.push(record);
    }
    Ok(records)
}

/// Rows for every schema from a `{ "<sheet name>": [rows] }` document.
/// Sheets missing from the document get no rows.
pub fn dataset_from_json(
    schemas: &[Schema<DynamicRecord>],
    data: &Value,
    options: &EngineOptions,
) -> Result<Vec<Vec<DynamicRecord>>> {
    let Value::Object(sheets) = data else {
        return Err(Error::Data {
            sheet: String::new(),
            row: 0,
            field: String::new(),
            message: "expected an object keyed by sheet name".into(),
        });
    };
    for name in sheets.keys() {
        if !schemas.iter().any(|s| s.sheet().name == *name) {
            warn!("ignoring data for unknown sheet '{}'", name);
        }
    }

    schemas
        .iter()
        .map(|schema| match sheets.get(&schema.sheet().name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(rows)) => records_from_json(schema, rows, options),
            Some(_) => Err(Error::Data {
                sheet: schema.sheet().name.clone(),
                row: 0,
                field: String::new(),
                message: "expected an array of rows".into(),
            }),
        })
        .collect()
}

fn json_field(
    value: &Value,
    column: &ColumnSchema,
    options: &EngineOptions,
) -> std::result::Result<FieldValue, DecodeError> {
    match value {
        Value::Null => Ok(FieldValue::Empty),
        Value::Bool(b) => codec::decode(&CellValue::Boolean(*b), column, options),
        Value::Number(n) => match n.as_i64() {
            Some(i) if column.kind == FieldKind::Integer => Ok(FieldValue::Integer(i)),
            _ => match n.as_f64() {
                Some(f) => codec::decode(&CellValue::Number(f), column, options),
                None => Err(DecodeError::invalid(n.to_string(), column.kind)),
            },
        },
        Value::String(s) => {
            // data files may carry the stored code rather than the label
            if column.kind == FieldKind::Coded {
                if let Some(reference) = &column.enumeration {
                    if reference.contains_code(s.trim()) {
                        return Ok(FieldValue::Code(s.trim().to_string()));
                    }
                }
            }
            codec::decode_text(s, column, options)
        }
        Value::Array(_) | Value::Object(_) => {
            Err(DecodeError::invalid(value.to_string(), column.kind))
        }
    }
}
