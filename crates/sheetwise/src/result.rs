//! Outcome of an import run

use std::any::Any;
use std::fmt;

use crate::schema::{RecordKey, SheetSchema};

/// Rows of one sheet split by validity
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<R> {
    pub valid: Vec<R>,
    pub invalid: Vec<R>,
}

/// What happened to one sheet
pub struct SheetResult {
    key: RecordKey,
    sheet: SheetSchema,
    valid_count: usize,
    invalid_count: usize,
    rows: Box<dyn Any>,
}

impl SheetResult {
    pub(crate) fn new<R: 'static>(key: RecordKey, sheet: SheetSchema, partition: Partition<R>) -> Self {
        Self {
            key,
            sheet,
            valid_count: partition.valid.len(),
            invalid_count: partition.invalid.len(),
            rows: Box::new(partition),
        }
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn sheet(&self) -> &SheetSchema {
        &self.sheet
    }

    pub fn has_errors(&self) -> bool {
        self.invalid_count > 0
    }

    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid_count
    }

    /// Number of decoded rows
    pub fn row_count(&self) -> usize {
        self.valid_count + self.invalid_count
    }

    /// The typed partition, `None` when `R` is not the sheet's record type
    pub fn partition<R: 'static>(&self) -> Option<&Partition<R>> {
        self.rows.downcast_ref::<Partition<R>>()
    }

    /// Enriched rows that passed validation
    pub fn valid<R: 'static>(&self) -> Option<&[R]> {
        self.partition::<R>().map(|p| p.valid.as_slice())
    }

    /// Rows that failed validation, as decoded
    pub fn invalid<R: 'static>(&self) -> Option<&[R]> {
        self.partition::<R>().map(|p| p.invalid.as_slice())
    }

    /// Take the typed partition out, handing `self` back on a type mismatch
    pub fn into_partition<R: 'static>(self) -> Result<Partition<R>, Self> {
        if !self.rows.is::<Partition<R>>() {
            return Err(self);
        }
        let SheetResult {
            key,
            sheet,
            valid_count,
            invalid_count,
            rows,
        } = self;
        rows.downcast::<Partition<R>>().map(|p| *p).map_err(|rows| SheetResult {
            key,
            sheet,
            valid_count,
            invalid_count,
            rows,
        })
    }
}

impl fmt::Debug for SheetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetResult")
            .field("key", &self.key)
            .field("sheet", &self.sheet)
            .field("valid_count", &self.valid_count)
            .field("invalid_count", &self.invalid_count)
            .finish()
    }
}

/// Aggregate outcome of an import run
#[derive(Debug)]
pub struct ImportResult {
    has_errors: bool,
    accepted: bool,
    sheets: Vec<SheetResult>,
}

impl ImportResult {
    pub(crate) fn new(sheets: Vec<SheetResult>) -> Self {
        Self {
            has_errors: sheets.iter().any(SheetResult::has_errors),
            accepted: true,
            sheets,
        }
    }

    pub(crate) fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }

    /// True when any sheet has an invalid row
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// False when the acceptance check rejected the import
    pub fn accepted(&self) -> bool {
        self.accepted
    }

    /// No invalid rows and accepted
    pub fn is_success(&self) -> bool {
        !self.has_errors && self.accepted
    }

    /// Sheet results in processing order
    pub fn sheets(&self) -> &[SheetResult] {
        &self.sheets
    }

    pub fn into_sheets(self) -> Vec<SheetResult> {
        self.sheets
    }

    pub fn sheet(&self, key: &RecordKey) -> Option<&SheetResult> {
        self.sheets.iter().find(|s| s.key() == key)
    }

    pub fn sheet_named(&self, name: &str) -> Option<&SheetResult> {
        self.sheets.iter().find(|s| s.sheet().name == name)
    }

    /// The first sheet holding record type `R`
    pub fn sheet_of<R: 'static>(&self) -> Option<&Partition<R>> {
        self.sheets.iter().find_map(|s| s.partition::<R>())
    }

    pub fn valid_count(&self) -> usize {
        self.sheets.iter().map(SheetResult::valid_count).sum()
    }

    pub fn invalid_count(&self) -> usize {
        self.sheets.iter().map(SheetResult::invalid_count).sum()
    }
}
