use std::collections::HashMap;
use std::sync::Arc;

/// Session-lifetime memo of category → member ids.
///
/// Membership is reference data that does not change while the program runs,
/// so entries are never evicted or replaced: the first `put` for a category
/// wins.
#[derive(Debug, Default, Clone)]
pub struct CategoryCache {
    entries: HashMap<String, Arc<[i64]>>,
}

impl CategoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: &str) -> Option<Arc<[i64]>> {
        self.entries.get(category).cloned()
    }

    /// Store `ids` for `category` unless it is already cached.
    ///
    /// Returns the cached ids either way.
    pub fn put(&mut self, category: &str, ids: Vec<i64>) -> Arc<[i64]> {
        Arc::clone(
            self.entries
                .entry(category.to_string())
                .or_insert_with(|| Arc::from(ids)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let mut cache = CategoryCache::new();
        assert!(cache.get("fire").is_none());
        cache.put("fire", vec![4, 5, 6]);
        assert_eq!(cache.get("fire").as_deref(), Some(&[4, 5, 6][..]));
    }

    #[test]
    fn first_insert_wins() {
        let mut cache = CategoryCache::new();
        cache.put("water", vec![7]);
        let kept = cache.put("water", vec![8, 9]);
        assert_eq!(&*kept, &[7]);
        assert_eq!(cache.get("water").as_deref(), Some(&[7][..]));
    }
}
