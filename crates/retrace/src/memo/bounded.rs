use crate::graph::ParserId;
use crate::memo::{MemoContext, MemoEntry, Memoizer};

/// Ring buffer of the most recent memo entries.
///
/// New entries overwrite the oldest one. Lookups scan from newest to oldest
/// and stop at the first never-written slot, since nothing older can exist
/// past it. Hot recent positions are found after a probe or two.
#[derive(Debug, Clone)]
pub struct BoundedCache<V> {
    entries: Vec<Option<MemoEntry<V>>>,
    /// Slot the next entry is written to.
    next: usize,
    distinguish_nodes: bool,
}

impl<V> BoundedCache<V> {
    #[must_use]
    pub fn new(slots: usize, distinguish_nodes: bool) -> Self {
        Self {
            entries: (0..slots).map(|_| None).collect(),
            next: 0,
            distinguish_nodes,
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

impl<V: Clone + Send + Sync> Memoizer<V> for BoundedCache<V> {
    fn memoize(&mut self, entry: MemoEntry<V>) {
        let slots = self.entries.len();
        if slots == 0 {
            return;
        }
        self.entries[self.next] = Some(entry);
        self.next = (self.next + 1) % slots;
    }

    fn get(
        &self,
        node: ParserId,
        start: usize,
        context: Option<&MemoContext>,
    ) -> Option<MemoEntry<V>> {
        let slots = self.entries.len();
        for age in 1..=slots {
            let index = (self.next + slots - age) % slots;
            let entry = self.entries[index].as_ref()?;
            if entry.same_key(node, start, context, self.distinguish_nodes) {
                return Some(entry.clone());
            }
        }
        None
    }

    fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(start: usize) -> MemoEntry<()> {
        MemoEntry::failure(ParserId::new(0), start, None)
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        let mut cache = BoundedCache::new(2, true);
        for start in [0, 5, 10] {
            cache.memoize(fail(start));
        }
        let node = ParserId::new(0);
        assert!(cache.get(node, 0, None).is_none());
        assert!(cache.get(node, 5, None).is_some());
        assert!(cache.get(node, 10, None).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_newest_entry_shadows_older_duplicate() {
        let mut cache = BoundedCache::new(4, true);
        let node = ParserId::new(0);
        cache.memoize(fail(3));
        cache.memoize(MemoEntry::success(node, 3, 7, Vec::new().into(), None));
        assert_eq!(cache.get(node, 3, None).and_then(|e| e.end), Some(7));
    }

    #[test]
    fn test_zero_slots_holds_nothing() {
        let mut cache = BoundedCache::new(0, true);
        cache.memoize(fail(1));
        assert!(cache.is_empty());
        assert!(cache.get(ParserId::new(0), 1, None).is_none());
    }

    #[test]
    fn test_clear() {
        let mut cache = BoundedCache::new(3, false);
        cache.memoize(fail(1));
        cache.clear();
        assert!(cache.get(ParserId::new(9), 1, None).is_none());
    }
}
