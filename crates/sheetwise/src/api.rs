//! One-call entry points for whole workbooks
//!
//! ```rust,no_run
//! use sheetwise::{read_path, write_path, HandlerRegistry, RuleHandler, Schema, SheetData, SheetType};
//! # use sheetwise::{Column, SchemaBuilder, SheetRecord};
//! # #[derive(Debug, Default, Clone)]
//! # struct Person { name: String }
//! # impl SheetRecord for Person {
//! #     fn layout() -> SchemaBuilder<Self> {
//! #         SchemaBuilder::new().column(
//! #             Column::new("name", "Name", 0).value(|p: &Person| &p.name, |p: &mut Person| &mut p.name),
//! #         )
//! #     }
//! # }
//!
//! let people = vec![Person { name: "Zhang".into() }];
//! write_path("people.xlsx", &[SheetData::new(&people)]).unwrap();
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(Schema::<Person>::of().unwrap(), RuleHandler::new("people"));
//! let result = read_path(
//!     "people.xlsx",
//!     "error-people.xlsx",
//!     &registry,
//!     &[SheetType::of::<Person>()],
//! )
//! .unwrap();
//! assert!(!result.has_errors());
//! ```

use std::io::{Read, Seek, Write};
use std::path::Path;

use log::info;
use sheetwise_core::Workbook;
use sheetwise_xlsx::{XlsxReader, XlsxWriter};

use crate::error::Result;
use crate::export::{Exporter, SheetData};
use crate::import::{ImportOutcome, Importer};
use crate::options::EngineOptions;
use crate::registry::{HandlerRegistry, SheetType};
use crate::result::ImportResult;

/// Lay out `sheets` in a fresh workbook
pub fn build_workbook(sheets: &[SheetData<'_>], options: EngineOptions) -> Result<Workbook> {
    let mut exporter = Exporter::new(options);
    for sheet in sheets {
        exporter.export(sheet)?;
    }
    Ok(exporter.finish())
}

/// Export `sheets` as XLSX into `writer`
pub fn write<W: Write + Seek>(writer: W, sheets: &[SheetData<'_>]) -> Result<()> {
    write_with(writer, sheets, EngineOptions::default())
}

pub fn write_with<W: Write + Seek>(
    writer: W,
    sheets: &[SheetData<'_>],
    options: EngineOptions,
) -> Result<()> {
    let workbook = build_workbook(sheets, options)?;
    XlsxWriter::write(&workbook, writer)?;
    Ok(())
}

/// Export `sheets` as an XLSX file
pub fn write_path<P: AsRef<Path>>(path: P, sheets: &[SheetData<'_>]) -> Result<()> {
    let workbook = build_workbook(sheets, EngineOptions::default())?;
    XlsxWriter::write_file(&workbook, path)?;
    Ok(())
}

/// Import `sheets` from an XLSX stream
pub fn read<R: Read + Seek>(
    reader: R,
    registry: &HandlerRegistry,
    sheets: &[SheetType],
) -> Result<ImportOutcome> {
    read_with(reader, registry, sheets, EngineOptions::default(), |_, _| true)
}

/// [`read`] with options and an acceptance check
pub fn read_with<R, F>(
    reader: R,
    registry: &HandlerRegistry,
    sheets: &[SheetType],
    options: EngineOptions,
    acceptance: F,
) -> Result<ImportOutcome>
where
    R: Read + Seek,
    F: FnOnce(&ImportResult, &mut Workbook) -> bool,
{
    let workbook = XlsxReader::read(reader)?;
    Importer::new(registry)
        .with_options(options)
        .import_with(&workbook, sheets, acceptance)
}

/// Import an XLSX file, saving the error report to `error_path` when there
/// is one
pub fn read_path<P, Q>(
    source: P,
    error_path: Q,
    registry: &HandlerRegistry,
    sheets: &[SheetType],
) -> Result<ImportResult>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let workbook = XlsxReader::read_file(source.as_ref())?;
    let outcome = Importer::new(registry).import(&workbook, sheets)?;

    if let Some(report) = outcome.error_report {
        let original = source
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let report = report.with_file_name(original);
        report.save(error_path.as_ref())?;
        info!(
            "error report {} written to {}",
            report.file_name().unwrap_or_default(),
            error_path.as_ref().display()
        );
    }
    Ok(outcome.result)
}
