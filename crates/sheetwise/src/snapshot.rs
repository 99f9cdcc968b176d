//! Rows decoded so far in one import run

use std::any::Any;
use std::collections::HashMap;

use crate::schema::RecordKey;

/// All decoded rows of the sheets processed so far, keyed by record key.
///
/// Rows are stored before the sheet is validated, so handlers see valid
/// and invalid rows alike. Handlers only ever get shared access.
#[derive(Default)]
pub struct DatasetSnapshot {
    sheets: HashMap<RecordKey, Box<dyn Any>>,
}

impl DatasetSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of a record key, `None` when the key was not imported yet or
    /// holds another record type
    pub fn rows<R: 'static>(&self, key: &RecordKey) -> Option<&[R]> {
        self.sheets
            .get(key)
            .and_then(|rows| rows.downcast_ref::<Vec<R>>())
            .map(Vec::as_slice)
    }

    /// Rows of a type stored under its default key
    pub fn rows_of<R: 'static>(&self) -> Option<&[R]> {
        self.rows(&RecordKey::of::<R>())
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.sheets.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.sheets.keys()
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Store the rows of a sheet, replacing earlier rows under the same key
    pub(crate) fn insert<R: 'static>(&mut self, key: RecordKey, rows: Vec<R>) {
        self.sheets.insert(key, Box::new(rows));
    }
}

impl std::fmt::Debug for DatasetSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.sheets.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut snapshot = DatasetSnapshot::new();
        let key = RecordKey::new("numbers");
        snapshot.insert(key.clone(), vec![1u32, 2, 3]);

        assert_eq!(snapshot.rows::<u32>(&key), Some(&[1u32, 2, 3][..]));
        assert_eq!(snapshot.rows::<String>(&key), None);
        assert_eq!(snapshot.rows::<u32>(&RecordKey::new("other")), None);
        assert!(snapshot.contains(&key));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_default_key() {
        let mut snapshot = DatasetSnapshot::new();
        snapshot.insert(RecordKey::of::<i64>(), vec![7i64]);
        assert_eq!(snapshot.rows_of::<i64>(), Some(&[7i64][..]));
    }

    #[test]
    fn test_insert_replaces() {
        let mut snapshot = DatasetSnapshot::new();
        let key = RecordKey::new("k");
        snapshot.insert(key.clone(), vec!["a"]);
        snapshot.insert(key.clone(), vec![1u8, 2]);
        assert_eq!(snapshot.rows::<u8>(&key), Some(&[1u8, 2][..]));
    }
}
