//! Style pool for deduplication

use super::Style;
use ahash::AHashMap;

/// Per-sheet table of unique styles; index 0 is always the default style
#[derive(Debug, Clone)]
pub struct StylePool {
    styles: Vec<Style>,
    index_map: AHashMap<u64, u32>,
}

fn style_hash(style: &Style) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    style.hash(&mut hasher);
    hasher.finish()
}

impl StylePool {
    pub fn new() -> Self {
        let default = Style::default();
        let mut index_map = AHashMap::new();
        index_map.insert(style_hash(&default), 0);
        Self {
            styles: vec![default],
            index_map,
        }
    }

    /// Return the index of an identical style, inserting it if unseen
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        let key = style_hash(&style);

        if let Some(&idx) = self.index_map.get(&key) {
            if self.styles[idx as usize] == style {
                return idx;
            }
        }

        let idx = self.styles.len() as u32;
        self.index_map.insert(key, idx);
        self.styles.push(style);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when only the default style is present
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Style)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn test_default_style_at_zero() {
        let pool = StylePool::new();
        assert_eq!(pool.len(), 1);
        assert!(pool.is_empty());
        assert_eq!(pool.get(0), Some(&Style::default()));
    }

    #[test]
    fn test_deduplication() {
        let mut pool = StylePool::new();

        let red = pool.get_or_insert(Style::new().fill_color(Color::RED));
        let again = pool.get_or_insert(Style::new().fill_color(Color::RED));
        let bold = pool.get_or_insert(Style::new().bold(true));

        assert_eq!(red, again);
        assert_ne!(red, bold);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get_or_insert(Style::default()), 0);
    }
}
