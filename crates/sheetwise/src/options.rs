//! Engine-wide settings shared by import, export and the error report

use sheetwise_core::{
    BorderLineStyle, BorderStyle, Color, HorizontalAlignment, Style, VerticalAlignment,
};

/// Default pattern for date-only fields (chrono strftime syntax)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Default pattern for date-time fields
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Author written on error-report comments unless configured otherwise
pub const DEFAULT_COMMENT_AUTHOR: &str = "System";

/// Options for an import or export run
///
/// ```rust
/// use sheetwise::EngineOptions;
///
/// let options = EngineOptions::default()
///     .with_comment_author("Importer")
///     .with_date_format("%d/%m/%Y");
/// assert_eq!(options.header_row, 0);
/// assert_eq!(options.comment_author, "Importer");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Zero-based row holding the headers; content starts on the next row
    pub header_row: u32,
    /// Author of the comments attached to failing cells
    pub comment_author: String,
    /// Pattern for date fields without their own pattern
    pub date_format: String,
    /// Pattern for date-time fields without their own pattern
    pub datetime_format: String,
    /// Style applied to failing cells in the error report
    pub failed_style: Style,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            header_row: 0,
            comment_author: DEFAULT_COMMENT_AUTHOR.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            failed_style: failed_cell_style(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header_row(mut self, row: u32) -> Self {
        self.header_row = row;
        self
    }

    pub fn with_comment_author(mut self, author: impl Into<String>) -> Self {
        self.comment_author = author.into();
        self
    }

    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }

    pub fn with_datetime_format(mut self, pattern: impl Into<String>) -> Self {
        self.datetime_format = pattern.into();
        self
    }

    pub fn with_failed_style(mut self, style: Style) -> Self {
        self.failed_style = style;
        self
    }

    /// First row after the header
    pub fn first_content_row(&self) -> u32 {
        self.header_row + 1
    }
}

/// Thin borders all round, centered both ways, solid red fill, 11pt Consolas
pub fn failed_cell_style() -> Style {
    Style::new()
        .font_name("Consolas")
        .font_size(11.0)
        .fill_color(Color::RED)
        .border(BorderStyle::all(BorderLineStyle::Thin, Color::BLACK))
        .horizontal_alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Center)
}
