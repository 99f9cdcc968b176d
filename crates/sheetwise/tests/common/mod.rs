//! Record types and helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use sheetwise::prelude::*;
use sheetwise::{CellValue, Workbook};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLogState {
    Running,
    Success,
    Failed,
    CompleteWithError,
}

impl CodedEnum for JobLogState {
    fn entries() -> &'static [(Self, &'static str, &'static str)] {
        &[
            (JobLogState::Running, "1", "运行中"),
            (JobLogState::Success, "2", "成功"),
            (JobLogState::Failed, "3", "失败"),
            (JobLogState::CompleteWithError, "4", "数据异常"),
        ]
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: Option<i32>,
    pub enriched: bool,
}

impl SheetRecord for Person {
    fn layout() -> SchemaBuilder<Self> {
        SchemaBuilder::new()
            .sheet("人员", 0)
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

impl Person {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            name: name.to_string(),
            age: Some(age),
            enriched: false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Position {
    pub staff_code: Option<String>,
    pub title: String,
}

impl SheetRecord for Position {
    fn layout() -> SchemaBuilder<Self> {
        SchemaBuilder::new()
            .sheet("岗位", 1)
            .column(
                Column::new("staff_code", "员工编号", 0)
                    .note("每个员工只能出现一次")
                    .rule(Rule::unique().with_message("员工编号{value}重复"))
                    .value(|p: &Position| &p.staff_code, |p: &mut Position| &mut p.staff_code),
            )
            .column(
                Column::new("title", "职位", 1)
                    .value(|p: &Position| &p.title, |p: &mut Position| &mut p.title),
            )
    }
}

impl Position {
    pub fn new(code: &str, title: &str) -> Self {
        Self {
            staff_code: Some(code.to_string()),
            title: title.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct JobLog {
    pub job: String,
    pub state: Option<JobLogState>,
    pub started: Option<NaiveDate>,
}

impl SheetRecord for JobLog {
    fn layout() -> SchemaBuilder<Self> {
        SchemaBuilder::new()
            .sheet("任务日志", 0)
            .column(
                Column::new("job", "任务", 0)
                    .rule(Rule::required())
                    .value(|j: &JobLog| &j.job, |j: &mut JobLog| &mut j.job),
            )
            .column(
                Column::new("state", "状态", 1)
                    .coded(|j: &JobLog| &j.state, |j: &mut JobLog| &mut j.state),
            )
            .column(
                Column::new("started", "开始日期", 2)
                    .value(|j: &JobLog| &j.started, |j: &mut JobLog| &mut j.started),
            )
    }
}

impl JobLog {
    pub fn new(job: &str, state: JobLogState, started: NaiveDate) -> Self {
        Self {
            job: job.to_string(),
            state: Some(state),
            started: Some(started),
        }
    }
}

/// Collects what the engine hands to the hooks
pub struct Recorder<R> {
    valid: Mutex<Vec<R>>,
    invalid: Mutex<Vec<R>>,
    enrich: fn(R) -> R,
}

impl<R: Clone> Recorder<R> {
    pub fn new() -> Arc<Self> {
        Self::with_enrich(|record| record)
    }

    pub fn with_enrich(enrich: fn(R) -> R) -> Arc<Self> {
        Arc::new(Self {
            valid: Mutex::new(Vec::new()),
            invalid: Mutex::new(Vec::new()),
            enrich,
        })
    }

    pub fn valid(&self) -> Vec<R> {
        self.valid.lock().unwrap().clone()
    }

    pub fn invalid(&self) -> Vec<R> {
        self.invalid.lock().unwrap().clone()
    }
}

/// Handler backed by a shared [`Recorder`]
pub struct Recording<R>(pub Arc<Recorder<R>>);

impl<R: Clone + Send + 'static> RowHandler<R> for Recording<R> {
    fn enrich(&self, record: R) -> R {
        (self.0.enrich)(record)
    }

    fn on_valid(&self, records: &[R]) {
        self.0.valid.lock().unwrap().extend_from_slice(records);
    }

    fn on_invalid(&self, records: &[R]) {
        self.0.invalid.lock().unwrap().extend_from_slice(records);
    }
}

pub fn mark_enriched(mut person: Person) -> Person {
    person.enriched = true;
    person
}

/// Registry with recording handlers for [`Person`] and [`Position`]
pub fn staff_registry() -> (HandlerRegistry, Arc<Recorder<Person>>, Arc<Recorder<Position>>) {
    let people = Recorder::with_enrich(mark_enriched);
    let positions = Recorder::new();
    let mut registry = HandlerRegistry::new();
    registry
        .register(Schema::<Person>::of().unwrap(), Recording(Arc::clone(&people)))
        .register(Schema::<Position>::of().unwrap(), Recording(Arc::clone(&positions)));
    (registry, people, positions)
}

pub fn text(value: &str) -> CellValue {
    CellValue::string(value)
}

pub fn num(value: f64) -> CellValue {
    CellValue::Number(value)
}

/// Write a header row and data rows into sheet `index`, creating it as needed
pub fn put_sheet(
    workbook: &mut Workbook,
    index: usize,
    name: &str,
    headers: &[&str],
    rows: &[Vec<CellValue>],
) {
    workbook.ensure_sheet(index).unwrap();
    workbook.rename_worksheet(index, name).unwrap();
    let sheet = workbook.worksheet_mut(index).unwrap();
    for (col, header) in headers.iter().enumerate() {
        sheet.set_cell_value_at(0, col as u16, *header).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.set_cell_value_at(i as u32 + 1, col as u16, value.clone()).unwrap();
            }
        }
    }
}

pub fn people_workbook(rows: &[Vec<CellValue>]) -> Workbook {
    let mut workbook = Workbook::empty();
    put_sheet(&mut workbook, 0, "人员", &["姓名", "年龄"], rows);
    workbook
}
