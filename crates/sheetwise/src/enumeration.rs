//! Enumerations rendered as dropdowns
//!
//! A [`CodedEnum`] is stored by a short code and shown by a display label,
//! e.g. a job state stored as `"1"` and shown as `"运行中"`. A
//! [`NamedEnum`] is stored and shown by its symbolic name. Both are plain
//! lookup tables.
//!
//! ```rust
//! use sheetwise::CodedEnum;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Level { Low, High }
//!
//! impl CodedEnum for Level {
//!     fn entries() -> &'static [(Self, &'static str, &'static str)] {
//!         &[(Level::Low, "L", "low"), (Level::High, "H", "high")]
//!     }
//! }
//!
//! assert_eq!(Level::High.code(), "H");
//! assert_eq!(Level::from_label("low"), Some(Level::Low));
//! ```

/// Enumeration with a `(variant, code, label)` table.
///
/// Every variant must appear in the table exactly once.
pub trait CodedEnum: Copy + PartialEq + 'static {
    fn entries() -> &'static [(Self, &'static str, &'static str)];

    fn code(&self) -> &'static str {
        Self::entries()
            .iter()
            .find(|(v, _, _)| v == self)
            .map_or("", |(_, code, _)| code)
    }

    fn label(&self) -> &'static str {
        Self::entries()
            .iter()
            .find(|(v, _, _)| v == self)
            .map_or("", |(_, _, label)| label)
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::entries()
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(v, _, _)| *v)
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::entries()
            .iter()
            .find(|(_, _, l)| *l == label)
            .map(|(v, _, _)| *v)
    }
}

/// Enumeration with a `(variant, name)` table
pub trait NamedEnum: Copy + PartialEq + 'static {
    fn variants() -> &'static [(Self, &'static str)];

    fn name(&self) -> &'static str {
        Self::variants()
            .iter()
            .find(|(v, _)| v == self)
            .map_or("", |(_, name)| name)
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(v, _)| *v)
    }
}

/// Ordered `(code, label)` pairs attached to a column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumerationReference {
    entries: Vec<(String, String)>,
}

impl EnumerationReference {
    pub fn new<I, C, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(c, l)| (c.into(), l.into()))
                .collect(),
        }
    }

    /// The table of a [`CodedEnum`]
    pub fn of<E: CodedEnum>() -> Self {
        Self::new(E::entries().iter().map(|(_, code, label)| (*code, *label)))
    }

    /// Display labels in declaration order, as shown in dropdowns
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, l)| l.as_str()).collect()
    }

    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, l)| l.as_str())
    }

    pub fn code_for(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, l)| l == label)
            .map(|(c, _)| c.as_str())
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.entries.iter().any(|(c, _)| c == code)
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First label that appears more than once
    pub(crate) fn duplicate_label(&self) -> Option<&str> {
        self.entries
            .iter()
            .enumerate()
            .find(|(i, (_, l))| self.entries[..*i].iter().any(|(_, prev)| prev == l))
            .map(|(_, (_, l))| l.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum JobState {
        Running,
        Success,
        Failed,
    }

    impl CodedEnum for JobState {
        fn entries() -> &'static [(Self, &'static str, &'static str)] {
            &[
                (JobState::Running, "1", "运行中"),
                (JobState::Success, "2", "成功"),
                (JobState::Failed, "3", "失败"),
            ]
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Shift {
        Day,
        Night,
    }

    impl NamedEnum for Shift {
        fn variants() -> &'static [(Self, &'static str)] {
            &[(Shift::Day, "Day"), (Shift::Night, "Night")]
        }
    }

    #[test]
    fn test_coded_lookups() {
        assert_eq!(JobState::Running.code(), "1");
        assert_eq!(JobState::Failed.label(), "失败");
        assert_eq!(JobState::from_code("2"), Some(JobState::Success));
        assert_eq!(JobState::from_label("运行中"), Some(JobState::Running));
        assert_eq!(JobState::from_label("running"), None);
    }

    #[test]
    fn test_named_lookups() {
        assert_eq!(Shift::Night.name(), "Night");
        assert_eq!(Shift::from_name("Day"), Some(Shift::Day));
        assert_eq!(Shift::from_name("day"), None);
    }

    #[test]
    fn test_reference() {
        let reference = EnumerationReference::of::<JobState>();
        assert_eq!(reference.labels(), vec!["运行中", "成功", "失败"]);
        assert_eq!(reference.label_for("3"), Some("失败"));
        assert_eq!(reference.code_for("成功"), Some("2"));
        assert_eq!(reference.code_for("unknown"), None);
        assert!(reference.duplicate_label().is_none());
    }

    #[test]
    fn test_duplicate_label() {
        let reference = EnumerationReference::new([("a", "x"), ("b", "y"), ("c", "x")]);
        assert_eq!(reference.duplicate_label(), Some("x"));
    }
}
