use std::collections::{BTreeMap, HashMap};

use lv_schemas::Entity;

/// Ordered, deduplicated id → snapshot mapping.
///
/// Order is insertion recency: every insert or promotion takes a fresh,
/// strictly increasing sequence number and enumeration walks sequences from
/// newest to oldest. Patching in place keeps the sequence, so untouched and
/// patched entries never move.
#[derive(Clone, Debug)]
pub struct EntityStore<E: Entity> {
    by_id: HashMap<String, u64>,
    ordered: BTreeMap<u64, E>,
    next_seq: u64,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            ordered: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.by_id.get(id).and_then(|seq| self.ordered.get(seq))
    }

    /// Insert `entity` at the front, removing any previous entry with the same
    /// id first. The replaced snapshot is offered to
    /// [`Entity::absorb_previous`] before the new one is stored.
    pub fn upsert_front(&mut self, mut entity: E) {
        if let Some(seq) = self.by_id.remove(entity.id()) {
            if let Some(previous) = self.ordered.remove(&seq) {
                entity.absorb_previous(&previous);
            }
        }
        let seq = self.take_seq();
        self.by_id.insert(entity.id().to_string(), seq);
        self.ordered.insert(seq, entity);
    }

    /// Apply `mutator` in place if `id` is present. Position is unchanged.
    ///
    /// Returns whether the id existed. The mutator must not change the id.
    pub fn patch_if_present<F>(&mut self, id: &str, mutator: F) -> bool
    where
        F: FnOnce(&mut E),
    {
        let Some(seq) = self.by_id.get(id) else {
            return false;
        };
        match self.ordered.get_mut(seq) {
            Some(entity) => {
                mutator(entity);
                debug_assert_eq!(entity.id(), id, "patch must not rewrite the id");
                true
            }
            None => false,
        }
    }

    /// Discard everything and adopt `entities` in the given order (first
    /// element first). If the list repeats an id, its first occurrence keeps
    /// the position.
    pub fn replace_all<I>(&mut self, entities: I)
    where
        I: IntoIterator<Item = E>,
    {
        self.by_id.clear();
        self.ordered.clear();
        let fetched: Vec<E> = entities.into_iter().collect();
        for entity in fetched.into_iter().rev() {
            self.upsert_front(entity);
        }
    }

    /// Newest-first iteration.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.ordered.values().rev()
    }

    /// Owned newest-first copy for display.
    pub fn enumerate(&self) -> Vec<E> {
        self.iter().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.iter().map(|e| e.id().to_string()).collect()
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
