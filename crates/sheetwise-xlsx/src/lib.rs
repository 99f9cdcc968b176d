//! # sheetwise-xlsx
//!
//! Reads and writes the subset of SpreadsheetML the record mapper relies on:
//! cell values, cell styles, column widths, notes and list dropdowns.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
