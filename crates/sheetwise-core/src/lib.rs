//! # sheetwise-core
//!
//! The in-memory workbook model shared by the sheetwise crates.
//!
//! - [`CellValue`] - the value held by a single cell
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`Style`] and [`StylePool`] - deduplicated cell formatting
//! - [`CellComment`] and [`DataValidation`] - notes and dropdown lists
//! - [`Workbook`], [`Worksheet`] - the document itself
//!
//! ## Example
//!
//! ```rust
//! use sheetwise_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::empty();
//! let index = workbook.ensure_sheet(0).unwrap();
//! let sheet = workbook.worksheet_mut(index).unwrap();
//!
//! sheet.set_cell_value_at(0, 0, "name").unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::Number(42.0)).unwrap();
//! assert_eq!(sheet.get_value_at(1, 0).as_number(), Some(42.0));
//! ```

pub mod cell;
pub mod comment;
pub mod error;
pub mod style;
pub mod validation;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellData, CellRange, CellValue};
pub use comment::CellComment;
pub use error::{Error, Result};
pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, Style, StylePool, VerticalAlignment,
};
pub use validation::{DataValidation, MAX_INLINE_LIST_LEN};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters Excel does not allow in a sheet name
pub const INVALID_SHEET_NAME_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

/// Width applied to columns that were never sized explicitly
pub const DEFAULT_COLUMN_WIDTH: f64 = 8.43;
