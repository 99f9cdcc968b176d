//! # sheetwise
//!
//! Map typed records to spreadsheet sheets and back.
//!
//! A record type declares its layout once (sheet name and position, one
//! column per field with header, position, note, date pattern, option list
//! and rules). With that layout the crate can
//!
//! - export records as a workbook with headers, dropdowns for enumeration
//!   columns and sized columns
//! - import a workbook, check headers, decode rows, validate them through a
//!   [`RowHandler`] and split them into valid and invalid rows
//! - produce an error report: the invalid rows with every failing cell
//!   commented and highlighted, ready to be fixed and imported again
//!
//! ## Example
//!
//! ```rust
//! use sheetwise::prelude::*;
//! use sheetwise::{build_workbook, EngineOptions};
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
//! let people = vec![
//!     Person { name: "Zhang".into(), age: Some(188) },
//!     Person { name: "Li".into(), age: Some(30) },
//! ];
//! let workbook = build_workbook(&[SheetData::new(&people)], EngineOptions::default()).unwrap();
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Schema::<Person>::of().unwrap(), RuleHandler::new("people"));
//! let outcome = Importer::new(&registry)
//!     .import(&workbook, &[SheetType::of::<Person>()])
//!     .unwrap();
//!
//! assert!(outcome.result.has_errors());
//! assert_eq!(outcome.result.sheets()[0].valid_count(), 1);
//! assert!(outcome.error_report.is_some());
//! ```

pub mod api;
pub mod codec;
pub mod dynamic;
pub mod enumeration;
pub mod error;
pub mod export;
pub mod handler;
pub mod import;
pub mod options;
pub mod prelude;
pub mod registry;
pub mod report;
pub mod result;
pub mod rules;
pub mod schema;
pub mod snapshot;
pub mod value;

pub use api::{build_workbook, read, read_path, read_with, write, write_path, write_with};
pub use codec::DecodeError;
pub use dynamic::{
    dataset_from_json, records_from_json, ColumnDefinition, DynamicRecord, OptionDefinition,
    RuleDefinition, RuleHandler, SchemaDefinition, SheetDefinition,
};
pub use enumeration::{CodedEnum, EnumerationReference, NamedEnum};
pub use error::{Error, Result};
pub use export::{Exporter, SheetData};
pub use handler::{RowContext, RowHandler};
pub use import::{ImportOutcome, Importer};
pub use options::{failed_cell_style, EngineOptions};
pub use registry::{HandlerRegistry, SheetType};
pub use report::{error_file_name, ErrorReport};
pub use result::{ImportResult, Partition, SheetResult};
pub use rules::{FieldRuleValidator, Rule, RuleKind, ValidationFailure};
pub use schema::{
    Column, ColumnSchema, FieldType, RecordKey, Scalar, Schema, SchemaBuilder, SheetRecord,
    SheetSchema,
};
pub use snapshot::DatasetSnapshot;
pub use value::{FieldKind, FieldValue};

// Re-export the workbook model and file codec so callers need a single dependency
pub use sheetwise_core::{CellComment, CellValue, DataValidation, Style, Workbook, Worksheet};
pub use sheetwise_xlsx::{XlsxError, XlsxReader, XlsxWriter};
