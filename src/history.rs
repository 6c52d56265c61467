//! Recently-viewed history.
//!
//! The store records every successful lookup here. Entries are kept in
//! visit order, oldest first, with one entry per id: viewing an entity
//! again moves it to the most-recent position. The list is unbounded;
//! entries only leave when their entity is deleted from the store.

use crate::task::Entity;

/// Ordered, de-duplicated record of viewed entities.
#[derive(Debug, Default, Clone)]
pub struct History {
    entries: Vec<Entity>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Record a visit. Any earlier entry with the same id is dropped so
    /// the entity lands in the most-recent slot exactly once.
    pub fn record(&mut self, entity: Entity) {
        let id = entity.id();
        self.entries.retain(|e| e.id() != id);
        self.entries.push(entity);
    }

    /// Forget an id entirely, used when the entity is deleted.
    pub fn remove(&mut self, id: u64) {
        self.entries.retain(|e| e.id() != id);
    }

    /// Snapshot of the visit sequence, oldest first.
    pub fn list(&self) -> Vec<Entity> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn entity(id: u64, title: &str) -> Entity {
        let mut t = Task::new(title, "");
        t.id = id;
        Entity::Task(t)
    }

    #[test]
    fn visits_are_kept_oldest_first() {
        let mut h = History::new();
        h.record(entity(1, "a"));
        h.record(entity(2, "b"));
        h.record(entity(3, "c"));
        let ids: Vec<u64> = h.list().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn revisiting_moves_to_most_recent_without_duplicating() {
        let mut h = History::new();
        h.record(entity(1, "a"));
        h.record(entity(2, "b"));
        h.record(entity(1, "a again"));
        let ids: Vec<u64> = h.list().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![2, 1]);
        // The retained entry is the latest snapshot.
        assert_eq!(h.list()[1].base().title, "a again");
    }

    #[test]
    fn remove_purges_the_id() {
        let mut h = History::new();
        h.record(entity(1, "a"));
        h.record(entity(2, "b"));
        h.remove(1);
        let ids: Vec<u64> = h.list().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![2]);
        h.remove(42); // absent id is a no-op
        assert_eq!(h.list().len(), 1);
    }

    #[test]
    fn list_is_a_defensive_copy() {
        let mut h = History::new();
        h.record(entity(1, "a"));
        let mut copy = h.list();
        copy.clear();
        assert!(!h.is_empty());
    }
}
