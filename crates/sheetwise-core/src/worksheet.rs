//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellData, CellRange, CellValue};
use crate::comment::CellComment;
use crate::error::{Error, Result};
use crate::style::{Style, StylePool};
use crate::validation::DataValidation;
use crate::{DEFAULT_COLUMN_WIDTH, MAX_COLS, MAX_ROWS};

/// A single sheet: sparse cells plus the notes, dropdowns and column
/// widths attached to them
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    /// Row index → column map; only occupied cells are stored
    cells: BTreeMap<u32, BTreeMap<u16, CellData>>,
    styles: StylePool,
    column_widths: BTreeMap<u16, f64>,
    comments: BTreeMap<(u32, u16), CellComment>,
    /// Unique comment authors in first-seen order
    comment_authors: Vec<String>,
    data_validations: Vec<DataValidation>,
}

impl Worksheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            styles: StylePool::new(),
            column_widths: BTreeMap::new(),
            comments: BTreeMap::new(),
            comment_authors: Vec::new(),
            data_validations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename without checking for clashes; use [`crate::Workbook::rename_worksheet`]
    /// for sheets that already belong to a workbook
    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cells ===

    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(&row).and_then(|r| r.get(&col))
    }

    /// The value at a position, [`CellValue::Empty`] when unoccupied
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cell_at(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        check_bounds(row, col)?;
        let value = value.into();
        let row_map = self.cells.entry(row).or_default();
        match row_map.get_mut(&col) {
            Some(cell) => cell.value = value,
            None => {
                row_map.insert(col, CellData::new(value));
            }
        }
        Ok(())
    }

    /// Apply a style to a cell, creating the cell if needed
    pub fn set_cell_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        check_bounds(row, col)?;
        let index = self.styles.get_or_insert(style.clone());
        self.cells
            .entry(row)
            .or_default()
            .entry(col)
            .or_default()
            .style_index = index;
        Ok(())
    }

    /// The style applied to a cell, `None` when the cell is unoccupied
    pub fn cell_style_at(&self, row: u32, col: u16) -> Option<&Style> {
        self.cell_at(row, col)
            .and_then(|c| self.styles.get(c.style_index))
    }

    pub fn style_pool(&self) -> &StylePool {
        &self.styles
    }

    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        if let Some(row_map) = self.cells.get_mut(&row) {
            row_map.remove(&col);
            if row_map.is_empty() {
                self.cells.remove(&row);
            }
        }
    }

    /// Bounding box of all occupied cells
    pub fn used_range(&self) -> Option<CellRange> {
        let first_row = *self.cells.keys().next()?;
        let last_row = *self.cells.keys().next_back()?;
        let mut min_col = u16::MAX;
        let mut max_col = 0;
        for row in self.cells.values() {
            if let (Some(first), Some(last)) = (row.keys().next(), row.keys().next_back()) {
                min_col = min_col.min(*first);
                max_col = max_col.max(*last);
            }
        }
        Some(CellRange::from_indices(first_row, min_col, last_row, max_col))
    }

    /// Highest occupied row index
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().next_back().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All occupied cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, data)| (row, col, data)))
    }

    /// Occupied cells of one row in column order
    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &CellData)> {
        self.cells
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(&col, data)| (col, data)))
    }

    // === Columns ===

    /// Width in characters, [`DEFAULT_COLUMN_WIDTH`] unless set
    pub fn column_width(&self, col: u16) -> f64 {
        self.column_widths
            .get(&col)
            .copied()
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn custom_column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    // === Comments ===

    pub fn set_comment_at(&mut self, row: u32, col: u16, comment: CellComment) {
        if comment.has_author() && !self.comment_authors.contains(&comment.author) {
            self.comment_authors.push(comment.author.clone());
        }
        self.comments.insert((row, col), comment);
    }

    pub fn comment_at(&self, row: u32, col: u16) -> Option<&CellComment> {
        self.comments.get(&(row, col))
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    /// Comments in row-major order
    pub fn comments(&self) -> impl Iterator<Item = ((u32, u16), &CellComment)> {
        self.comments.iter().map(|(k, v)| (*k, v))
    }

    pub fn comment_authors(&self) -> &[String] {
        &self.comment_authors
    }

    // === Data validation ===

    pub fn add_data_validation(&mut self, validation: DataValidation) {
        self.data_validations.push(validation);
    }

    pub fn data_validations(&self) -> &[DataValidation] {
        &self.data_validations
    }

    /// The first dropdown covering a cell
    pub fn data_validation_at(&self, row: u32, col: u16) -> Option<&DataValidation> {
        self.data_validations
            .iter()
            .find(|dv| dv.applies_to(row, col))
    }
}

fn check_bounds(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
    }
    Ok(())
}
