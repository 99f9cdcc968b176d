//! Reading record sheets out of a workbook
//!
//! Each requested sheet goes through the same steps:
//!
//! 1. the header row must match the schema, column by column
//! 2. every non-empty row is decoded into a record and the whole sheet is
//!    added to the run's [`DatasetSnapshot`]
//! 3. rows are validated in order; passing rows are enriched, failing rows
//!    are written to the error report
//! 4. the handler's `on_valid` / `on_invalid` hooks receive the partition
//!
//! Schema or header problems abort the run. Row problems never do.

use std::sync::Arc;

use log::{debug, info};
use sheetwise_core::{CellValue, Workbook, Worksheet};

use crate::codec;
use crate::error::{Error, Result};
use crate::handler::{RowContext, RowHandler};
use crate::options::EngineOptions;
use crate::registry::{HandlerRegistry, SheetType};
use crate::report::{ErrorReport, ErrorReportBuilder};
use crate::result::{ImportResult, Partition, SheetResult};
use crate::rules::ValidationFailure;
use crate::schema::{RecordKey, Schema, SheetSchema};
use crate::snapshot::DatasetSnapshot;

/// Result of an import plus the error report, when there is one to show
#[derive(Debug)]
pub struct ImportOutcome {
    pub result: ImportResult,
    /// Present when a row failed or the acceptance check said no
    pub error_report: Option<ErrorReport>,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Runs imports against a registry
///
/// ```rust,no_run
/// use sheetwise::{HandlerRegistry, Importer, SheetType};
/// # use sheetwise::{Column, RuleHandler, Schema, SchemaBuilder, SheetRecord};
/// # #[derive(Debug, Default, Clone)]
/// # struct Person { name: String }
/// # impl SheetRecord for Person {
/// #     fn layout() -> SchemaBuilder<Self> {
/// #         SchemaBuilder::new().column(
/// #             Column::new("name", "Name", 0).value(|p: &Person| &p.name, |p: &mut Person| &mut p.name),
/// #         )
/// #     }
/// # }
/// # let mut registry = HandlerRegistry::new();
/// # registry.register(Schema::<Person>::of().unwrap(), RuleHandler::new("people"));
/// # let workbook = sheetwise::Workbook::new();
///
/// let outcome = Importer::new(&registry)
///     .import(&workbook, &[SheetType::of::<Person>()])
///     .unwrap();
/// if let Some(report) = outcome.error_report {
///     report.save("error-people.xlsx").unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct Importer<'r> {
    registry: &'r HandlerRegistry,
    options: EngineOptions,
}

impl<'r> Importer<'r> {
    pub fn new(registry: &'r HandlerRegistry) -> Self {
        Self {
            registry,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Import `sheets` in the given order
    pub fn import(&self, workbook: &Workbook, sheets: &[SheetType]) -> Result<ImportOutcome> {
        self.import_with(workbook, sheets, |_, _| true)
    }

    /// Import, then let `acceptance` judge the whole result.
    ///
    /// The check runs after every handler hook and may write to the error
    /// report. Returning `false` marks the result as not accepted and
    /// surfaces the report even when every row is valid.
    pub fn import_with<F>(
        &self,
        workbook: &Workbook,
        sheets: &[SheetType],
        acceptance: F,
    ) -> Result<ImportOutcome>
    where
        F: FnOnce(&ImportResult, &mut Workbook) -> bool,
    {
        let jobs = sheets
            .iter()
            .map(|sheet| sheet.resolve(self.registry))
            .collect::<Result<Vec<_>>>()?;
        check_distinct_sheets(&jobs)?;

        let sources = jobs
            .iter()
            .map(|job| {
                let sheet = job.sheet();
                workbook
                    .worksheet(sheet.index)
                    .ok_or_else(|| Error::MissingSheet {
                        name: sheet.name.clone(),
                        index: sheet.index,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut run = ImportRun::new(self.options.clone());
        for job in &jobs {
            job.add_report_sheet(&mut run.report)?;
        }

        let mut results = Vec::with_capacity(jobs.len());
        for (job, source) in jobs.iter().zip(sources) {
            results.push(job.run(source, &mut run)?);
        }

        let mut result = ImportResult::new(results);
        let mut report = run.report;
        let accepted = acceptance(&result, report.workbook_mut());
        result.set_accepted(accepted);

        info!(
            "imported {} sheet(s): {} valid row(s), {} invalid row(s){}",
            result.sheets().len(),
            result.valid_count(),
            result.invalid_count(),
            if accepted { "" } else { ", rejected by acceptance check" }
        );

        let error_report =
            (result.has_errors() || !accepted).then(|| ErrorReport::new(report.finish()));
        Ok(ImportOutcome {
            result,
            error_report,
        })
    }
}

/// Private state of one import run
pub(crate) struct ImportRun {
    options: EngineOptions,
    snapshot: DatasetSnapshot,
    report: ErrorReportBuilder,
}

impl ImportRun {
    fn new(options: EngineOptions) -> Self {
        Self {
            report: ErrorReportBuilder::new(options.clone()),
            options,
            snapshot: DatasetSnapshot::new(),
        }
    }
}

/// A resolved sheet with its record type erased
pub(crate) trait SheetJob {
    fn key(&self) -> &RecordKey;

    fn sheet(&self) -> &SheetSchema;

    fn add_report_sheet(&self, report: &mut ErrorReportBuilder) -> Result<()>;

    fn run(&self, source: &Worksheet, run: &mut ImportRun) -> Result<SheetResult>;
}

pub(crate) struct TypedSheet<R: 'static> {
    schema: Arc<Schema<R>>,
    handler: Arc<dyn RowHandler<R>>,
}

impl<R: 'static> TypedSheet<R> {
    pub(crate) fn new(schema: Arc<Schema<R>>, handler: Arc<dyn RowHandler<R>>) -> Self {
        Self { schema, handler }
    }
}

impl<R: Default + Clone + 'static> SheetJob for TypedSheet<R> {
    fn key(&self) -> &RecordKey {
        self.schema.key()
    }

    fn sheet(&self) -> &SheetSchema {
        self.schema.sheet()
    }

    fn add_report_sheet(&self, report: &mut ErrorReportBuilder) -> Result<()> {
        report.add_sheet(&self.schema).map(|_| ())
    }

    fn run(&self, source: &Worksheet, run: &mut ImportRun) -> Result<SheetResult> {
        import_sheet(&self.schema, self.handler.as_ref(), source, run)
    }
}

fn check_distinct_sheets(jobs: &[Box<dyn SheetJob>]) -> Result<()> {
    for (i, job) in jobs.iter().enumerate() {
        let sheet = job.sheet();
        if let Some(other) = jobs[..i]
            .iter()
            .map(|j| j.sheet())
            .find(|s| s.index == sheet.index || s.name == sheet.name)
        {
            return Err(Error::configuration(
                job.key().as_str(),
                format!(
                    "sheet '{}' at index {} clashes with sheet '{}' at index {}",
                    sheet.name, sheet.index, other.name, other.index
                ),
            ));
        }
    }
    Ok(())
}

fn check_header<R: 'static>(schema: &Schema<R>, source: &Worksheet, header_row: u32) -> Result<()> {
    for column in schema.columns() {
        let actual = source.get_value_at(header_row, column.index).to_string();
        if actual != column.header {
            return Err(Error::HeaderMismatch {
                sheet: schema.sheet().name.clone(),
                column: column.letter(),
                expected: column.header.clone(),
                actual,
            });
        }
    }
    Ok(())
}

/// Decode problems of one row and the cells that caused them
struct RowDecode {
    failure: ValidationFailure,
    raw: Vec<Option<CellValue>>,
}

fn decode_rows<R: Default + 'static>(
    schema: &Schema<R>,
    source: &Worksheet,
    options: &EngineOptions,
) -> (Vec<R>, Vec<RowDecode>) {
    let mut records = Vec::new();
    let mut decodes = Vec::new();
    let Some(last) = source.last_row() else {
        return (records, decodes);
    };

    for row in options.first_content_row()..=last {
        let cells: Vec<CellValue> = schema
            .columns()
            .map(|c| source.get_value_at(row, c.index))
            .collect();
        if cells.iter().all(CellValue::is_blank) {
            continue;
        }

        let mut record = R::default();
        let mut failure = ValidationFailure::new();
        let mut raw = vec![None; cells.len()];
        for (i, (column, cell)) in schema.bound().iter().zip(cells).enumerate() {
            let decoded = codec::decode(&cell, &column.schema, options)
                .and_then(|value| column.write(&mut record, value));
            if let Err(e) = decoded {
                failure.add(column.schema.field.as_str(), e.to_string());
                raw[i] = Some(cell);
            }
        }
        records.push(record);
        decodes.push(RowDecode { failure, raw });
    }
    (records, decodes)
}

fn import_sheet<R: Default + Clone + 'static>(
    schema: &Schema<R>,
    handler: &dyn RowHandler<R>,
    source: &Worksheet,
    run: &mut ImportRun,
) -> Result<SheetResult> {
    let ImportRun {
        options,
        snapshot,
        report,
    } = run;
    let sheet = schema.sheet();

    check_header(schema, source, options.header_row)?;

    let (records, decodes) = decode_rows(schema, source, options);
    debug!("sheet '{}': decoded {} row(s)", sheet.name, records.len());
    snapshot.insert(schema.key().clone(), records);

    let snapshot: &DatasetSnapshot = snapshot;
    let rows = snapshot.rows::<R>(schema.key()).unwrap_or(&[]);
    let ctx = RowContext::new(snapshot, schema, rows);

    let mut partition = Partition {
        valid: Vec::new(),
        invalid: Vec::new(),
    };
    let mut offset = 0u32;
    for (record, decode) in rows.iter().zip(decodes) {
        let mut failure = decode.failure;
        failure.extend_new_fields(handler.validate(record, &ctx));

        if failure.is_empty() {
            partition.valid.push(handler.enrich(record.clone()));
        } else {
            offset += 1;
            report.add_failed_row(sheet.index, schema, offset, record, &decode.raw, &failure)?;
            partition.invalid.push(record.clone());
        }
    }

    debug!(
        "sheet '{}': {} valid, {} invalid",
        sheet.name,
        partition.valid.len(),
        partition.invalid.len()
    );
    handler.on_valid(&partition.valid);
    handler.on_invalid(&partition.invalid);

    Ok(SheetResult::new(schema.key().clone(), sheet.clone(), partition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;
    use crate::schema::{Column, SchemaBuilder, SheetRecord};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Person {
        name: String,
        age: Option<i32>,
        checked: bool,
    }

    impl SheetRecord for Person {
        fn layout() -> SchemaBuilder<Self> {
            SchemaBuilder::new()
                .sheet("people", 0)
                .column(
                    Column::new("name", "姓名", 0)
                        .rule(Rule::required())
                        .value(|p: &Person| &p.name, |p: &mut Person| &mut p.name),
                )
                .column(
                    Column::new("age", "年龄", 1)
                        .rule(Rule::max(100.0).with_message("年龄不能超过100"))
                        .value(|p: &Person| &p.age, |p: &mut Person| &mut p.age),
                )
        }
    }

    #[derive(Default)]
    struct Recorder {
        valid: Mutex<Vec<Person>>,
        invalid: Mutex<Vec<Person>>,
    }

    impl RowHandler<Person> for Arc<Recorder> {
        fn enrich(&self, mut record: Person) -> Person {
            record.checked = true;
            record
        }

        fn on_valid(&self, records: &[Person]) {
            self.valid.lock().unwrap().extend_from_slice(records);
        }

        fn on_invalid(&self, records: &[Person]) {
            self.invalid.lock().unwrap().extend_from_slice(records);
        }
    }

    fn workbook(rows: &[[CellValue; 2]]) -> Workbook {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(0, 0, "姓名").unwrap();
        sheet.set_cell_value_at(0, 1, "年龄").unwrap();
        for (i, row) in rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                sheet.set_cell_value_at(i as u32 + 1, col as u16, value.clone()).unwrap();
            }
        }
        workbook
    }

    fn registry() -> (HandlerRegistry, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut registry = HandlerRegistry::new();
        registry.register(Schema::<Person>::of().unwrap(), Arc::clone(&recorder));
        (registry, recorder)
    }

    #[test]
    fn test_partitions_and_hooks() {
        let (registry, recorder) = registry();
        let source = workbook(&[
            [CellValue::string("Zhang"), CellValue::Number(188.0)],
            [CellValue::string("Li"), CellValue::Number(30.0)],
        ]);

        let outcome = Importer::new(&registry)
            .import(&source, &[SheetType::of::<Person>()])
            .unwrap();

        assert!(outcome.result.has_errors());
        assert!(outcome.error_report.is_some());
        let sheet = &outcome.result.sheets()[0];
        assert_eq!(sheet.valid_count(), 1);
        assert_eq!(sheet.invalid_count(), 1);

        let valid = recorder.valid.lock().unwrap();
        assert_eq!(*valid, vec![Person { name: "Li".into(), age: Some(30), checked: true }]);
        let invalid = recorder.invalid.lock().unwrap();
        assert_eq!(*invalid, vec![Person { name: "Zhang".into(), age: Some(188), checked: false }]);
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let (registry, _) = registry();
        let source = workbook(&[
            [CellValue::string("Zhang"), CellValue::Number(20.0)],
            [CellValue::Empty, CellValue::string("  ")],
            [CellValue::string("Li"), CellValue::Number(30.0)],
        ]);

        let outcome = Importer::new(&registry)
            .import(&source, &[SheetType::of::<Person>()])
            .unwrap();
        assert_eq!(outcome.result.sheets()[0].row_count(), 2);
        assert!(outcome.error_report.is_none());
        assert!(outcome.is_success());
    }

    #[test]
    fn test_header_mismatch() {
        let (registry, recorder) = registry();
        let mut source = workbook(&[[CellValue::string("Zhang"), CellValue::Number(20.0)]]);
        source
            .worksheet_mut(0)
            .unwrap()
            .set_cell_value_at(0, 1, "工号")
            .unwrap();

        let err = Importer::new(&registry)
            .import(&source, &[SheetType::of::<Person>()])
            .unwrap_err();
        match err {
            Error::HeaderMismatch { sheet, column, expected, actual } => {
                assert_eq!(sheet, "people");
                assert_eq!(column, "B");
                assert_eq!(expected, "年龄");
                assert_eq!(actual, "工号");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(recorder.valid.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_sheet() {
        let (registry, _) = registry();
        let err = Importer::new(&registry)
            .import(&Workbook::empty(), &[SheetType::of::<Person>()])
            .unwrap_err();
        assert!(matches!(err, Error::MissingSheet { index: 0, .. }));
    }

    #[test]
    fn test_same_sheet_twice_is_rejected() {
        let (registry, _) = registry();
        let source = workbook(&[]);
        let err = Importer::new(&registry)
            .import(&source, &[SheetType::of::<Person>(), SheetType::of::<Person>()])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_decode_failure_keeps_raw_cell() {
        let (registry, _) = registry();
        let source = workbook(&[[CellValue::string("Wang"), CellValue::string("abc")]]);

        let outcome = Importer::new(&registry)
            .import(&source, &[SheetType::of::<Person>()])
            .unwrap();
        let report = outcome.error_report.unwrap();
        let sheet = report.workbook().worksheet(0).unwrap();
        assert_eq!(sheet.get_value_at(1, 1), CellValue::string("abc"));
        assert_eq!(
            sheet.comment_at(1, 1).map(|c| c.text.as_str()),
            Some("'abc' is not a valid whole number")
        );
    }

    #[test]
    fn test_acceptance_can_reject_clean_import() {
        let (registry, _) = registry();
        let source = workbook(&[[CellValue::string("Li"), CellValue::Number(30.0)]]);

        let outcome = Importer::new(&registry)
            .import_with(&source, &[SheetType::of::<Person>()], |result, report| {
                assert!(!result.has_errors());
                report
                    .worksheet_mut(0)
                    .unwrap()
                    .set_cell_value_at(5, 0, "headcount mismatch")
                    .unwrap();
                false
            })
            .unwrap();

        assert!(!outcome.result.accepted());
        assert!(!outcome.result.has_errors());
        let report = outcome.error_report.unwrap();
        assert_eq!(
            report.workbook().worksheet(0).unwrap().get_value_at(5, 0),
            CellValue::string("headcount mismatch")
        );
    }
}
