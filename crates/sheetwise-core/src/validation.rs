//! List-style data validation (in-cell dropdowns)

use crate::cell::CellRange;

/// Longest inline list Excel accepts, separators included and quotes excluded
pub const MAX_INLINE_LIST_LEN: usize = 255;

/// A dropdown restricting a set of ranges to a fixed list of items
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidation {
    /// The allowed entries, in display order
    pub items: Vec<String>,
    /// Cell ranges the dropdown applies to
    pub ranges: Vec<CellRange>,
    pub allow_blank: bool,
    /// Reject values that are not in the list
    pub show_error_alert: bool,
}

impl DataValidation {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            ranges: Vec::new(),
            allow_blank: true,
            show_error_alert: true,
        }
    }

    pub fn with_range(mut self, range: CellRange) -> Self {
        self.ranges.push(range);
        self
    }

    /// True when any of the ranges covers the cell
    pub fn applies_to(&self, row: u32, col: u16) -> bool {
        self.ranges.iter().any(|r| r.contains(row, col))
    }

    /// Why `items` cannot be written as an inline list, if they cannot.
    ///
    /// Items are separated by commas and the list is quoted, so neither
    /// character may appear inside an item.
    pub fn inline_list_problem<S: AsRef<str>>(items: &[S]) -> Option<String> {
        if let Some(item) = items
            .iter()
            .map(AsRef::as_ref)
            .find(|item| item.contains([',', '"']))
        {
            return Some(format!("list item '{}' contains a comma or a quote", item));
        }
        let len: usize = items.iter().map(|i| i.as_ref().chars().count()).sum::<usize>()
            + items.len().saturating_sub(1);
        (len > MAX_INLINE_LIST_LEN).then(|| {
            format!(
                "list of {} items is {} characters long (max {})",
                items.len(),
                len,
                MAX_INLINE_LIST_LEN
            )
        })
    }

    /// The inline list formula, e.g. `"Running,Success"`.
    /// Commas and quotes inside items cannot be represented and are dropped;
    /// see [`inline_list_problem`](Self::inline_list_problem).
    pub fn list_formula(&self) -> String {
        let joined = self
            .items
            .iter()
            .map(|item| item.replace([',', '"'], ""))
            .collect::<Vec<_>>()
            .join(",");
        format!("\"{}\"", joined)
    }

    /// Parse an inline list formula back into items; `None` for range references
    pub fn parse_list_formula(formula: &str) -> Option<Vec<String>> {
        let inner = formula.trim().strip_prefix('"')?.strip_suffix('"')?;
        if inner.is_empty() {
            return Some(Vec::new());
        }
        Some(inner.split(',').map(str::to_string).collect())
    }
}
