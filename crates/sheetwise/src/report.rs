//! The annotated workbook handed back when rows fail
//!
//! The report has the same sheets and headers as the imported workbook, so
//! it can be corrected and imported again. Each failing row is written
//! right below the previous one; failing cells carry a comment with the
//! messages and the failed-cell style.

use std::io::{Seek, Write};
use std::path::Path;

use log::warn;
use sheetwise_core::{CellComment, CellValue, Workbook};
use sheetwise_xlsx::XlsxWriter;

use crate::error::Result;
use crate::export::Exporter;
use crate::options::EngineOptions;
use crate::rules::ValidationFailure;
use crate::schema::Schema;

/// Prefix of generated error-report file names
pub const ERROR_FILE_PREFIX: &str = "error-";

/// Name of the error report for an uploaded file, e.g. `error-staff.xlsx`
pub fn error_file_name(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(original);
    format!("{}{}", ERROR_FILE_PREFIX, name)
}

/// Error workbook of a finished import
#[derive(Debug, Clone)]
pub struct ErrorReport {
    workbook: Workbook,
    file_name: Option<String>,
}

impl ErrorReport {
    pub(crate) fn new(workbook: Workbook) -> Self {
        Self {
            workbook,
            file_name: None,
        }
    }

    /// Name the report after the file it was produced for
    pub fn with_file_name(mut self, original: &str) -> Self {
        self.file_name = Some(error_file_name(original));
        self
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }

    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<()> {
        XlsxWriter::write(&self.workbook, writer)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        XlsxWriter::write_file(&self.workbook, path)?;
        Ok(())
    }
}

/// Accumulates the report while an import runs
#[derive(Debug)]
pub(crate) struct ErrorReportBuilder {
    exporter: Exporter,
    failed_rows: usize,
}

impl ErrorReportBuilder {
    pub(crate) fn new(options: EngineOptions) -> Self {
        Self {
            exporter: Exporter::new(options),
            failed_rows: 0,
        }
    }

    /// Create the sheet of a schema with its header row
    pub(crate) fn add_sheet<R: 'static>(&mut self, schema: &Schema<R>) -> Result<usize> {
        let index = self.exporter.select_sheet(schema.key(), schema.sheet())?;
        self.exporter.fill_header(index, schema)?;
        Ok(index)
    }

    /// Write a failing row `offset` rows below the header.
    ///
    /// `raw` lines up with the schema columns and holds the original cell of
    /// every field that could not be decoded; those cells are written as
    /// found instead of the record value.
    pub(crate) fn add_failed_row<R: 'static>(
        &mut self,
        sheet_index: usize,
        schema: &Schema<R>,
        offset: u32,
        record: &R,
        raw: &[Option<CellValue>],
        failure: &ValidationFailure,
    ) -> Result<()> {
        let row = self.exporter.options().header_row + offset;
        self.exporter.fill_dropdown_row(sheet_index, schema, row)?;
        self.exporter.fill_row(sheet_index, schema, row, record)?;

        let author = self.exporter.options().comment_author.clone();
        let style = self.exporter.options().failed_style.clone();
        let Some(sheet) = self.exporter.workbook_mut().worksheet_mut(sheet_index) else {
            return Ok(());
        };

        for (column, cell) in schema.columns().zip(raw) {
            if let Some(cell) = cell {
                sheet.set_cell_value_at(row, column.index, cell.clone())?;
            }
        }

        for (field, messages) in failure.iter() {
            let Some(column) = schema.column(field) else {
                warn!(
                    "sheet '{}': failure on unknown field '{}' not reported",
                    schema.sheet().name,
                    field
                );
                continue;
            };
            sheet.set_comment_at(
                row,
                column.index,
                CellComment::new(author.as_str(), messages.join("\n")),
            );
            sheet.set_cell_style_at(row, column.index, &style)?;
        }

        self.failed_rows += 1;
        Ok(())
    }

    /// The document as the acceptance check sees it
    pub(crate) fn workbook_mut(&mut self) -> &mut Workbook {
        self.exporter.workbook_mut()
    }

    pub(crate) fn finish(mut self) -> Workbook {
        if self.failed_rows > 0 {
            self.exporter.autosize_all();
        }
        self.exporter.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::failed_cell_style;
    use crate::schema::{Column, SchemaBuilder};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, Clone)]
    struct Person {
        name: String,
        age: Option<i32>,
    }

    fn schema() -> Schema<Person> {
        SchemaBuilder::new()
            .sheet("people", 0)
            .column(Column::new("name", "姓名", 0).value(|p: &Person| &p.name, |p: &mut Person| &mut p.name))
            .column(Column::new("age", "年龄", 1).value(|p: &Person| &p.age, |p: &mut Person| &mut p.age))
            .build()
            .unwrap()
    }

    #[test]
    fn test_error_file_name() {
        assert_eq!(error_file_name("staff.xlsx"), "error-staff.xlsx");
        assert_eq!(error_file_name("uploads/2024/staff.xlsx"), "error-staff.xlsx");
    }

    #[test]
    fn test_failed_row_annotations() {
        let schema = schema();
        let mut builder = ErrorReportBuilder::new(EngineOptions::default());
        let index = builder.add_sheet(&schema).unwrap();

        let person = Person { name: "Zhang".into(), age: Some(188) };
        let failure = ValidationFailure::new()
            .with("age", "must be at most 100")
            .with("age", "looks like a typo")
            .with("nickname", "ignored");
        builder
            .add_failed_row(index, &schema, 1, &person, &[None, None], &failure)
            .unwrap();
        let workbook = builder.finish();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.get_value_at(0, 1), CellValue::string("年龄"));
        assert_eq!(sheet.get_value_at(1, 0), CellValue::string("Zhang"));
        assert_eq!(sheet.get_value_at(1, 1), CellValue::Number(188.0));

        let comment = sheet.comment_at(1, 1).unwrap();
        assert_eq!(comment.author, "System");
        assert_eq!(comment.text, "must be at most 100\nlooks like a typo");
        assert_eq!(sheet.cell_style_at(1, 1), Some(&failed_cell_style()));
        assert!(sheet.comment_at(1, 0).is_none());
    }

    #[test]
    fn test_raw_cells_replace_record_values() {
        let schema = schema();
        let mut builder = ErrorReportBuilder::new(EngineOptions::default());
        let index = builder.add_sheet(&schema).unwrap();

        let failure = ValidationFailure::new().with("age", "'abc' is not a valid whole number");
        builder
            .add_failed_row(
                index,
                &schema,
                1,
                &Person { name: "Li".into(), age: None },
                &[None, Some(CellValue::string("abc"))],
                &failure,
            )
            .unwrap();
        let workbook = builder.finish();
        assert_eq!(workbook.worksheet(0).unwrap().get_value_at(1, 1), CellValue::string("abc"));
    }

    #[test]
    fn test_header_only_report() {
        let schema = schema();
        let mut builder = ErrorReportBuilder::new(EngineOptions::default().with_comment_author("Importer"));
        builder.add_sheet(&schema).unwrap();
        let workbook = builder.finish();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.name(), "people");
        assert_eq!(sheet.last_row(), Some(0));
        assert!(sheet.custom_column_widths().is_empty());
    }
}
