//! Cell comments (notes)
//!
//! ```rust
//! use sheetwise_core::{CellComment, Worksheet};
//!
//! let mut sheet = Worksheet::new("people");
//! sheet.set_comment_at(0, 1, CellComment::new("System", "years, 0-100"));
//! assert_eq!(sheet.comment_at(0, 1).map(|c| c.text.as_str()), Some("years, 0-100"));
//! ```

/// A note attached to a single cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellComment {
    pub author: String,
    pub text: String,
    /// Whether the note box is shown without hovering
    pub visible: bool,
}

impl CellComment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            visible: false,
        }
    }

    /// A note without an author
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    pub fn has_author(&self) -> bool {
        !self.author.is_empty()
    }
}
