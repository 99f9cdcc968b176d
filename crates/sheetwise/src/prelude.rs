//! Commonly used types
//!
//! ```rust
//! use sheetwise::prelude::*;
//! ```

pub use crate::{
    CodedEnum, Column, DynamicRecord, EngineOptions, Error, FieldKind, FieldRuleValidator,
    FieldValue, HandlerRegistry, ImportOutcome, ImportResult, Importer, NamedEnum, Result,
    RowContext, RowHandler, Rule, RuleHandler, Schema, SchemaBuilder, SheetData, SheetRecord,
    SheetType, ValidationFailure,
};
