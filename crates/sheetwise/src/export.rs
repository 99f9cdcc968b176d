//! Writing records into a workbook
//!
//! [`Exporter::export_sheet`] runs the whole per-sheet sequence: select and
//! name the sheet, write the header row, constrain enumeration columns to
//! their labels, write one row per record and widen the columns. The
//! individual steps are public so the error report can reuse them.

use std::collections::BTreeMap;

use log::debug;
use sheetwise_core::{CellComment, CellRange, CellValue, DataValidation, Workbook, Worksheet};

use crate::codec;
use crate::error::{Error, Result};
use crate::options::EngineOptions;
use crate::schema::{RecordKey, Schema, SheetRecord, SheetSchema};

/// Builds one workbook from any number of record sheets
#[derive(Debug)]
pub struct Exporter {
    workbook: Workbook,
    options: EngineOptions,
    selected: Vec<SheetSchema>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Exporter {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            workbook: Workbook::empty(),
            options,
            selected: Vec::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    /// Write a complete sheet. With no records only the header is written,
    /// so the sheet doubles as an import template.
    pub fn export_sheet<R: 'static>(&mut self, schema: &Schema<R>, records: &[R]) -> Result<()> {
        let index = self.select_sheet(schema.key(), schema.sheet())?;
        self.fill_header(index, schema)?;
        if records.is_empty() {
            debug!("sheet '{}': header only", schema.sheet().name);
            return Ok(());
        }

        let first = self.options.first_content_row();
        let count = u32::try_from(records.len()).unwrap_or(u32::MAX);
        let last = first.saturating_add(count - 1);
        self.fill_dropdown(index, schema, first, last)?;
        self.fill_content(index, schema, records)?;
        self.autosize_sheet(index);
        debug!(
            "sheet '{}': exported {} rows",
            schema.sheet().name,
            records.len()
        );
        Ok(())
    }

    /// Export one prepared [`SheetData`]
    pub fn export(&mut self, data: &SheetData<'_>) -> Result<()> {
        data.job.export(self)
    }

    /// Create or rename the sheet at the schema's position.
    ///
    /// Two sheets of one run may not share a position or a name.
    pub fn select_sheet(&mut self, record: &RecordKey, sheet: &SheetSchema) -> Result<usize> {
        if let Some(other) = self
            .selected
            .iter()
            .find(|s| s.index == sheet.index || s.name == sheet.name)
        {
            return Err(Error::configuration(
                record.as_str(),
                format!(
                    "sheet '{}' at index {} clashes with sheet '{}' at index {}",
                    sheet.name, sheet.index, other.name, other.index
                ),
            ));
        }
        let index = self.workbook.ensure_sheet(sheet.index)?;
        self.release_placeholder_name(index, &sheet.name);
        self.workbook
            .rename_worksheet(index, &sheet.name)
            .map_err(|e| Error::configuration(record.as_str(), e.to_string()))?;
        self.selected.push(sheet.clone());
        Ok(index)
    }

    /// Give an unselected sheet holding `name` a fresh placeholder name so
    /// the sheet at `index` can take it
    fn release_placeholder_name(&mut self, index: usize, name: &str) {
        let wanted = name.to_lowercase();
        let holder = self
            .workbook
            .worksheets()
            .position(|ws| ws.name().to_lowercase() == wanted);
        let Some(holder) = holder.filter(|h| *h != index) else {
            return;
        };
        if self.selected.iter().any(|s| s.index == holder) {
            return;
        }
        let mut n = self.workbook.sheet_count() + 1;
        while self
            .workbook
            .rename_worksheet(holder, &format!("Sheet{}", n))
            .is_err()
        {
            n += 1;
        }
        debug!("placeholder sheet {} renamed to free '{}'", holder, name);
    }

    /// Header text of every column, with the column note as a comment
    pub fn fill_header<R: 'static>(&mut self, sheet_index: usize, schema: &Schema<R>) -> Result<()> {
        let row = self.options.header_row;
        let author = self.options.comment_author.clone();
        let sheet = worksheet_mut(&mut self.workbook, sheet_index)?;
        for column in schema.columns() {
            sheet.set_cell_value_at(row, column.index, column.header.as_str())?;
            if let Some(note) = &column.note {
                sheet.set_comment_at(row, column.index, CellComment::new(author.as_str(), note.as_str()));
            }
        }
        Ok(())
    }

    /// Restrict the enumeration columns of rows `first_row..=last_row` to
    /// their labels
    pub fn fill_dropdown<R: 'static>(
        &mut self,
        sheet_index: usize,
        schema: &Schema<R>,
        first_row: u32,
        last_row: u32,
    ) -> Result<()> {
        let sheet = worksheet_mut(&mut self.workbook, sheet_index)?;
        for column in schema.columns() {
            if let Some(reference) = &column.enumeration {
                let range = CellRange::from_indices(first_row, column.index, last_row, column.index);
                sheet.add_data_validation(DataValidation::list(reference.labels()).with_range(range));
            }
        }
        Ok(())
    }

    /// [`fill_dropdown`](Self::fill_dropdown) for a single row
    pub fn fill_dropdown_row<R: 'static>(
        &mut self,
        sheet_index: usize,
        schema: &Schema<R>,
        row: u32,
    ) -> Result<()> {
        self.fill_dropdown(sheet_index, schema, row, row)
    }

    /// One record, one cell per column
    pub fn fill_row<R: 'static>(
        &mut self,
        sheet_index: usize,
        schema: &Schema<R>,
        row: u32,
        record: &R,
    ) -> Result<()> {
        let options = &self.options;
        let sheet = worksheet_mut(&mut self.workbook, sheet_index)?;
        for column in schema.bound() {
            let value = codec::encode(&column.read(record), &column.schema, options);
            if !value.is_empty() {
                sheet.set_cell_value_at(row, column.schema.index, value)?;
            }
        }
        Ok(())
    }

    /// All records, starting on the row after the header
    pub fn fill_content<R: 'static>(
        &mut self,
        sheet_index: usize,
        schema: &Schema<R>,
        records: &[R],
    ) -> Result<()> {
        let mut row = self.options.first_content_row();
        for record in records {
            self.fill_row(sheet_index, schema, row, record)?;
            row += 1;
        }
        Ok(())
    }

    /// Widen each column to the byte length of its longest text
    pub fn autosize_sheet(&mut self, sheet_index: usize) {
        if let Some(sheet) = self.workbook.worksheet_mut(sheet_index) {
            autosize(sheet);
        }
    }

    pub fn autosize_all(&mut self) {
        for sheet in self.workbook.worksheets_mut() {
            autosize(sheet);
        }
    }

    pub fn finish(self) -> Workbook {
        self.workbook
    }
}

fn worksheet_mut(workbook: &mut Workbook, index: usize) -> Result<&mut Worksheet> {
    let count = workbook.sheet_count();
    workbook
        .worksheet_mut(index)
        .ok_or_else(|| sheetwise_core::Error::SheetOutOfBounds(index, count).into())
}

fn autosize(sheet: &mut Worksheet) {
    let mut widest: BTreeMap<u16, usize> = BTreeMap::new();
    for (_, col, cell) in sheet.iter_cells() {
        if let CellValue::String(s) = &cell.value {
            let len = widest.entry(col).or_insert(0);
            *len = (*len).max(s.len());
        }
    }
    for (col, len) in widest {
        let width = len as f64;
        if width > sheet.column_width(col) {
            sheet.set_column_width(col, width);
        }
    }
}

trait ExportJob {
    fn export(&self, exporter: &mut Exporter) -> Result<()>;
}

enum SchemaSource<'a, R: 'static> {
    Borrowed(&'a Schema<R>),
    Declared(fn() -> Result<Schema<R>>),
}

struct TypedExport<'a, R: 'static> {
    schema: SchemaSource<'a, R>,
    records: &'a [R],
}

impl<'a, R: 'static> ExportJob for TypedExport<'a, R> {
    fn export(&self, exporter: &mut Exporter) -> Result<()> {
        match &self.schema {
            SchemaSource::Borrowed(schema) => exporter.export_sheet(schema, self.records),
            SchemaSource::Declared(build) => exporter.export_sheet(&build()?, self.records),
        }
    }
}

/// One sheet of export input, whatever its record type
pub struct SheetData<'a> {
    job: Box<dyn ExportJob + 'a>,
}

impl<'a> SheetData<'a> {
    /// Records of a [`SheetRecord`], laid out by its declared layout
    pub fn new<R: SheetRecord>(records: &'a [R]) -> Self {
        Self {
            job: Box::new(TypedExport {
                schema: SchemaSource::Declared(Schema::<R>::of),
                records,
            }),
        }
    }

    /// Records laid out by an explicit schema
    pub fn with_schema<R: 'static>(schema: &'a Schema<R>, records: &'a [R]) -> Self {
        Self {
            job: Box::new(TypedExport {
                schema: SchemaSource::Borrowed(schema),
                records,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumeration::CodedEnum;
    use crate::schema::{Column, SchemaBuilder};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum State {
        Running,
        Success,
    }

    impl CodedEnum for State {
        fn entries() -> &'static [(Self, &'static str, &'static str)] {
            &[(State::Running, "1", "运行中"), (State::Success, "2", "成功")]
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Job {
        name: String,
        retries: Option<i64>,
        state: Option<State>,
    }

    impl SheetRecord for Job {
        fn layout() -> SchemaBuilder<Self> {
            SchemaBuilder::new()
                .sheet("jobs", 0)
                .column(
                    Column::new("name", "Name", 0)
                        .note("unique job name")
                        .value(|j: &Job| &j.name, |j: &mut Job| &mut j.name),
                )
                .column(
                    Column::new("state", "State", 1)
                        .coded(|j: &Job| &j.state, |j: &mut Job| &mut j.state),
                )
                // column C stays empty
                .column(
                    Column::new("retries", "Retries", 3)
                        .value(|j: &Job| &j.retries, |j: &mut Job| &mut j.retries),
                )
        }
    }

    fn jobs() -> Vec<Job> {
        vec![
            Job { name: "nightly-backup".into(), retries: Some(3), state: Some(State::Running) },
            Job { name: "sync".into(), retries: None, state: Some(State::Success) },
        ]
    }

    #[test]
    fn test_export_sheet_layout() {
        let schema = Schema::<Job>::of().unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&schema, &jobs()).unwrap();
        let workbook = exporter.finish();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.name(), "jobs");
        assert_eq!(sheet.get_value_at(0, 0), CellValue::string("Name"));
        assert_eq!(sheet.get_value_at(0, 3), CellValue::string("Retries"));
        assert_eq!(sheet.get_value_at(0, 2), CellValue::Empty);
        assert_eq!(sheet.comment_at(0, 0).map(|c| c.text.as_str()), Some("unique job name"));
        assert_eq!(sheet.comment_at(0, 0).map(|c| c.author.as_str()), Some("System"));

        assert_eq!(sheet.get_value_at(1, 1), CellValue::string("运行中"));
        assert_eq!(sheet.get_value_at(1, 3), CellValue::Number(3.0));
        assert_eq!(sheet.get_value_at(2, 1), CellValue::string("成功"));
        assert_eq!(sheet.get_value_at(2, 3), CellValue::Empty);
    }

    #[test]
    fn test_single_dropdown_spans_content() {
        let schema = Schema::<Job>::of().unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&schema, &jobs()).unwrap();
        let workbook = exporter.finish();

        let validations = workbook.worksheet(0).unwrap().data_validations();
        assert_eq!(validations.len(), 1);
        assert_eq!(validations[0].items, vec!["运行中".to_string(), "成功".to_string()]);
        assert_eq!(validations[0].ranges, vec![CellRange::from_indices(1, 1, 2, 1)]);
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let schema = Schema::<Job>::of().unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&schema, &[]).unwrap();
        let workbook = exporter.finish();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.last_row(), Some(0));
        assert!(sheet.data_validations().is_empty());
        assert!(sheet.custom_column_widths().is_empty());
    }

    #[test]
    fn test_autosize_uses_byte_length() {
        let schema = Schema::<Job>::of().unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&schema, &jobs()).unwrap();
        let workbook = exporter.finish();

        let sheet = workbook.worksheet(0).unwrap();
        assert_eq!(sheet.column_width(0), "nightly-backup".len() as f64);
        // "运行中" is nine bytes of UTF-8
        assert_eq!(sheet.column_width(1), 9.0);
    }

    #[test]
    fn test_sheet_position_and_clash() {
        let schema = SchemaBuilder::<Job>::new()
            .sheet("late", 2)
            .column(Column::new("name", "Name", 0).value(|j: &Job| &j.name, |j: &mut Job| &mut j.name))
            .build()
            .unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&schema, &[]).unwrap();
        assert_eq!(exporter.workbook().sheet_count(), 3);
        assert_eq!(exporter.workbook().worksheet(2).map(|s| s.name()), Some("late"));

        let err = exporter.export_sheet(&schema, &[]).unwrap_err();
        assert!(matches!(err, Error::Configuration { ref message, .. } if message.contains("clashes")));
    }

    #[test]
    fn test_autosize_leaves_other_sheets() {
        let schema = SchemaBuilder::<Job>::new()
            .sheet("jobs", 1)
            .column(Column::new("name", "Name", 0).value(|j: &Job| &j.name, |j: &mut Job| &mut j.name))
            .build()
            .unwrap();
        let mut exporter = Exporter::default();
        let notes = exporter.workbook_mut().add_worksheet_with_name("notes").unwrap();
        exporter
            .workbook_mut()
            .worksheet_mut(notes)
            .unwrap()
            .set_cell_value_at(0, 0, "free-form notes kept by hand")
            .unwrap();
        exporter.export_sheet(&schema, &jobs()).unwrap();

        let workbook = exporter.finish();
        assert!(workbook.worksheet(0).unwrap().custom_column_widths().is_empty());
        assert_eq!(workbook.worksheet(1).unwrap().column_width(0), "nightly-backup".len() as f64);
    }

    #[test]
    fn test_placeholder_yields_its_name() {
        let schema = SchemaBuilder::<Job>::new()
            .sheet("Sheet1", 1)
            .column(Column::new("name", "Name", 0).value(|j: &Job| &j.name, |j: &mut Job| &mut j.name))
            .build()
            .unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&schema, &[]).unwrap();

        let workbook = exporter.finish();
        assert_eq!(workbook.worksheet(1).map(|s| s.name()), Some("Sheet1"));
        assert_ne!(workbook.worksheet(0).map(|s| s.name()), Some("Sheet1"));
    }

    #[test]
    fn test_name_taken_by_selected_sheet() {
        let first = SchemaBuilder::<Job>::new()
            .sheet("Jobs", 0)
            .column(Column::new("name", "Name", 0).value(|j: &Job| &j.name, |j: &mut Job| &mut j.name))
            .build()
            .unwrap();
        let second = SchemaBuilder::<Job>::new()
            .sheet("JOBS", 1)
            .column(Column::new("name", "Name", 0).value(|j: &Job| &j.name, |j: &mut Job| &mut j.name))
            .build()
            .unwrap();
        let mut exporter = Exporter::default();
        exporter.export_sheet(&first, &[]).unwrap();

        let err = exporter.export_sheet(&second, &[]).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_sheet_data_builds_declared_layout() {
        let records = jobs();
        let mut exporter = Exporter::default();
        exporter.export(&SheetData::new(&records)).unwrap();
        assert_eq!(exporter.workbook().worksheet(0).map(|s| s.name()), Some("jobs"));
    }
}
