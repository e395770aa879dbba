use crate::graph::ParserId;
use crate::memo::{MemoContext, MemoEntry, Memoizer, key_hash};
use tracing::debug;

/// Numerator and denominator of the load factor that triggers a rehash.
const MAX_LOAD: (usize, usize) = (4, 5);

/// Growable open-addressed memo table with Robin Hood displacement.
///
/// Every slot stores the key hash (`0` marks an empty slot) and the distance
/// from the slot the hash prefers. Insertion takes the slot of any entry that
/// is closer to home than the entry being placed, and moves that entry on
/// instead. Probe lengths stay short and bounded by the largest displacement
/// the table has seen. Once more than 80% of the slots are occupied the
/// table doubles and reinserts everything.
#[derive(Debug, Clone)]
pub struct RobinHoodTable<V> {
    hashes: Vec<u64>,
    displacements: Vec<usize>,
    entries: Vec<Option<MemoEntry<V>>>,
    len: usize,
    max_displacement: usize,
    distinguish_nodes: bool,
}

impl<V> RobinHoodTable<V> {
    /// Create a table with room for `capacity` slots, rounded up to a power
    /// of two.
    #[must_use]
    pub fn new(capacity: usize, distinguish_nodes: bool) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            hashes: vec![0; capacity],
            displacements: vec![0; capacity],
            entries: (0..capacity).map(|_| None).collect(),
            len: 0,
            max_displacement: 0,
            distinguish_nodes,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.hashes.len()
    }

    /// Longest distance any entry has been placed from its home slot.
    #[must_use]
    pub const fn max_displacement(&self) -> usize {
        self.max_displacement
    }

    const fn mask(&self) -> usize {
        self.hashes.len() - 1
    }

    fn hash_of(&self, node: ParserId, start: usize, context: Option<&MemoContext>) -> u64 {
        key_hash(self.distinguish_nodes.then_some(node), start, context)
    }

    fn find(
        &self,
        hash: u64,
        node: ParserId,
        start: usize,
        context: Option<&MemoContext>,
    ) -> Option<usize> {
        let mask = self.mask();
        #[allow(clippy::cast_possible_truncation)]
        let mut index = (hash as usize) & mask;
        for distance in 0..=self.max_displacement {
            if self.hashes[index] == 0 || self.displacements[index] < distance {
                return None;
            }
            if self.hashes[index] == hash {
                let hit = self.entries[index]
                    .as_ref()
                    .is_some_and(|e| e.same_key(node, start, context, self.distinguish_nodes));
                if hit {
                    return Some(index);
                }
            }
            index = (index + 1) & mask;
        }
        None
    }

    fn place(&mut self, mut hash: u64, mut entry: MemoEntry<V>) {
        let mask = self.mask();
        #[allow(clippy::cast_possible_truncation)]
        let mut index = (hash as usize) & mask;
        let mut distance = 0_usize;
        loop {
            if self.hashes[index] == 0 {
                self.hashes[index] = hash;
                self.displacements[index] = distance;
                self.entries[index] = Some(entry);
                self.max_displacement = self.max_displacement.max(distance);
                self.len += 1;
                return;
            }
            if self.displacements[index] < distance {
                std::mem::swap(&mut self.hashes[index], &mut hash);
                std::mem::swap(&mut self.displacements[index], &mut distance);
                let resident = self.entries[index].replace(entry);
                self.max_displacement = self.max_displacement.max(self.displacements[index]);
                match resident {
                    Some(resident) => entry = resident,
                    None => {
                        self.len += 1;
                        return;
                    }
                }
            }
            index = (index + 1) & mask;
            distance = distance.saturating_add(1);
        }
    }

    fn grow(&mut self) {
        let capacity = self.capacity() * 2;
        debug!(
            from = self.capacity(),
            to = capacity,
            entries = self.len,
            "growing memo table"
        );
        let hashes = std::mem::replace(&mut self.hashes, vec![0; capacity]);
        let entries = std::mem::replace(
            &mut self.entries,
            (0..capacity).map(|_| None).collect(),
        );
        self.displacements = vec![0; capacity];
        self.len = 0;
        self.max_displacement = 0;
        for (hash, entry) in hashes.into_iter().zip(entries) {
            if let Some(entry) = entry {
                self.place(hash, entry);
            }
        }
    }
}

impl<V: Clone + Send + Sync> Memoizer<V> for RobinHoodTable<V> {
    fn memoize(&mut self, entry: MemoEntry<V>) {
        let hash = self.hash_of(entry.node, entry.start, entry.context.as_ref());
        if let Some(index) = self.find(hash, entry.node, entry.start, entry.context.as_ref()) {
            self.entries[index] = Some(entry);
            return;
        }
        if (self.len + 1) * MAX_LOAD.1 > self.capacity() * MAX_LOAD.0 {
            self.grow();
        }
        self.place(hash, entry);
    }

    fn get(
        &self,
        node: ParserId,
        start: usize,
        context: Option<&MemoContext>,
    ) -> Option<MemoEntry<V>> {
        let hash = self.hash_of(node, start, context);
        let index = self.find(hash, node, start, context)?;
        self.entries[index].clone()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.hashes.iter_mut().for_each(|h| *h = 0);
        self.displacements.iter_mut().for_each(|d| *d = 0);
        self.entries.iter_mut().for_each(|e| *e = None);
        self.len = 0;
        self.max_displacement = 0;
    }
}
