//! The in-memory task store.
//!
//! Owns every entity, hands out ids, enforces the validation rules and
//! keeps epics consistent with their subtasks. All accessors return
//! defensive copies; the internal maps are never exposed, so invariants
//! cannot be bypassed from outside.
//!
//! Callers needing concurrent access must serialise calls themselves;
//! every operation here runs to completion on one `&mut self`.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::fields::Status;
use crate::history::History;
use crate::task::{overlaps, Entity, Epic, Subtask, Task};

/// In-memory store for tasks, epics and subtasks plus the viewing history.
#[derive(Debug)]
pub struct TaskStore {
    tasks: HashMap<u64, Task>,
    epics: HashMap<u64, Epic>,
    subtasks: HashMap<u64, Subtask>,
    history: History,
    /// Next id to hand out. Strictly increasing for the lifetime of the
    /// store; ids of deleted entities are never reissued.
    next_id: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        TaskStore::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore {
            tasks: HashMap::new(),
            epics: HashMap::new(),
            subtasks: HashMap::new(),
            history: History::new(),
            next_id: 1,
        }
    }

    fn generate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Keep the id counter ahead of a restored id.
    fn note_restored_id(&mut self, id: u64) {
        self.next_id = self.next_id.max(id + 1);
    }

    // ---- listing -------------------------------------------------------

    /// All plain tasks, unordered copy.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    /// All epics, unordered copy.
    pub fn epics(&self) -> Vec<Epic> {
        self.epics.values().cloned().collect()
    }

    /// All subtasks, unordered copy.
    pub fn subtasks(&self) -> Vec<Subtask> {
        self.subtasks.values().cloned().collect()
    }

    /// Tasks and subtasks that have a start time, ordered by start
    /// ascending with ties broken by id. Epics are aggregates and are
    /// not schedulable themselves.
    pub fn prioritized(&self) -> Vec<Entity> {
        let mut out: Vec<Entity> = self
            .tasks
            .values()
            .filter(|t| t.start.is_some())
            .cloned()
            .map(Entity::Task)
            .chain(
                self.subtasks
                    .values()
                    .filter(|s| s.base.start.is_some())
                    .cloned()
                    .map(Entity::Subtask),
            )
            .collect();
        out.sort_by_key(|e| (e.base().start, e.id()));
        out
    }

    /// Subtasks of one epic, in the epic's link order. Empty when the
    /// epic id is unknown.
    pub fn subtasks_of(&self, epic_id: u64) -> Vec<Subtask> {
        let Some(epic) = self.epics.get(&epic_id) else {
            return Vec::new();
        };
        epic.subtask_ids
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .cloned()
            .collect()
    }

    // ---- lookup (records history) --------------------------------------

    /// Fetch a task by id, recording the visit. `None` for a stale id is
    /// a normal outcome, not an error.
    pub fn task(&mut self, id: u64) -> Option<Task> {
        let task = self.tasks.get(&id)?.clone();
        self.history.record(Entity::Task(task.clone()));
        Some(task)
    }

    /// Fetch an epic by id, recording the visit.
    pub fn epic(&mut self, id: u64) -> Option<Epic> {
        let epic = self.epics.get(&id)?.clone();
        self.history.record(Entity::Epic(epic.clone()));
        Some(epic)
    }

    /// Fetch a subtask by id, recording the visit.
    pub fn subtask(&mut self, id: u64) -> Option<Subtask> {
        let sub = self.subtasks.get(&id)?.clone();
        self.history.record(Entity::Subtask(sub.clone()));
        Some(sub)
    }

    // ---- create --------------------------------------------------------

    /// Insert a new task under a fresh id. Rejects schedules that overlap
    /// any stored scheduled entity; on rejection no id is consumed and
    /// nothing changes.
    pub fn create_task(&mut self, mut task: Task) -> Result<Task> {
        self.check_overlap(&task, 0)?;
        task.id = self.generate_id();
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    /// Insert a new epic under a fresh id. Any subtask links or derived
    /// fields in the payload are discarded; they mirror stored subtasks
    /// only.
    pub fn create_epic(&mut self, mut epic: Epic) -> Epic {
        epic.base.id = self.generate_id();
        epic.subtask_ids.clear();
        self.epics.insert(epic.id(), epic.clone());
        self.recompute_epic(epic.id());
        // Return the recomputed form (status New, zero duration).
        self.epics.get(&epic.id()).cloned().unwrap_or(epic)
    }

    /// Insert a new subtask under a fresh id, link it to its epic and
    /// recompute that epic. Fails if the epic does not exist or the
    /// schedule overlaps; on failure nothing changes.
    pub fn create_subtask(&mut self, mut sub: Subtask) -> Result<Subtask> {
        if sub.base.id != 0 && sub.epic_id == sub.base.id {
            return Err(Error::SelfReference(sub.base.id));
        }
        if !self.epics.contains_key(&sub.epic_id) {
            return Err(Error::UnknownEpic(sub.epic_id));
        }
        self.check_overlap(&sub.base, 0)?;
        sub.base.id = self.generate_id();
        let (id, epic_id) = (sub.id(), sub.epic_id);
        self.subtasks.insert(id, sub.clone());
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.add_subtask(id);
        }
        self.recompute_epic(epic_id);
        Ok(sub)
    }

    // ---- update --------------------------------------------------------

    /// Replace a stored task. Unknown ids are silently ignored; the only
    /// way to observe absence is `task(id)` returning `None`.
    pub fn update_task(&mut self, task: Task) -> Result<()> {
        if !self.tasks.contains_key(&task.id) {
            return Ok(());
        }
        self.check_overlap(&task, task.id)?;
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Adopt an epic payload's title and description. Status, schedule
    /// and subtask links are derived state and never taken from callers.
    pub fn update_epic(&mut self, epic: Epic) {
        if let Some(stored) = self.epics.get_mut(&epic.base.id) {
            stored.base.title = epic.base.title;
            stored.base.description = epic.base.description;
        }
    }

    /// Replace a stored subtask, relinking and recomputing epics as
    /// needed. A payload naming the subtask itself as epic keeps the
    /// previous owner; an unknown owner is a validation failure.
    pub fn update_subtask(&mut self, mut sub: Subtask) -> Result<()> {
        let Some(stored) = self.subtasks.get(&sub.base.id) else {
            return Ok(());
        };
        let old_epic = stored.epic_id;
        if sub.epic_id == sub.base.id {
            sub.epic_id = old_epic;
        }
        if !self.epics.contains_key(&sub.epic_id) {
            return Err(Error::UnknownEpic(sub.epic_id));
        }
        self.check_overlap(&sub.base, sub.base.id)?;
        let (id, new_epic) = (sub.id(), sub.epic_id);
        self.subtasks.insert(id, sub);
        if new_epic != old_epic {
            if let Some(epic) = self.epics.get_mut(&old_epic) {
                epic.remove_subtask(id);
            }
            if let Some(epic) = self.epics.get_mut(&new_epic) {
                epic.add_subtask(id);
            }
            self.recompute_epic(old_epic);
        }
        self.recompute_epic(new_epic);
        Ok(())
    }

    // ---- delete --------------------------------------------------------

    /// Remove a task and purge it from history. Unknown ids are ignored.
    pub fn delete_task(&mut self, id: u64) {
        if self.tasks.remove(&id).is_some() {
            self.history.remove(id);
        }
    }

    /// Remove an epic, cascading to every owned subtask. All removed ids
    /// leave the history as well.
    pub fn delete_epic(&mut self, id: u64) {
        let Some(epic) = self.epics.remove(&id) else {
            return;
        };
        for sub_id in epic.subtask_ids {
            self.subtasks.remove(&sub_id);
            self.history.remove(sub_id);
        }
        self.history.remove(id);
    }

    /// Remove a subtask, unlink it from its epic and recompute the epic.
    pub fn delete_subtask(&mut self, id: u64) {
        let Some(sub) = self.subtasks.remove(&id) else {
            return;
        };
        if let Some(epic) = self.epics.get_mut(&sub.epic_id) {
            epic.remove_subtask(id);
        }
        self.recompute_epic(sub.epic_id);
        self.history.remove(id);
    }

    // ---- restore (persistence only) ------------------------------------

    /// Re-insert a task under its saved id. Overlap validation is skipped:
    /// the saved state was valid when written and partial batches must not
    /// reject each other.
    pub fn restore_task(&mut self, task: Task) {
        self.note_restored_id(task.id);
        self.tasks.insert(task.id, task);
    }

    /// Re-insert an epic under its saved id. Links are rebuilt as owned
    /// subtasks are restored, so the payload starts with none.
    pub fn restore_epic(&mut self, mut epic: Epic) {
        self.note_restored_id(epic.base.id);
        epic.subtask_ids.clear();
        let id = epic.id();
        self.epics.insert(id, epic);
        self.recompute_epic(id);
    }

    /// Re-insert a subtask under its saved id, relinking its epic. The
    /// epic must already have been restored.
    pub fn restore_subtask(&mut self, sub: Subtask) -> Result<()> {
        if sub.epic_id == sub.base.id {
            return Err(Error::SelfReference(sub.base.id));
        }
        if !self.epics.contains_key(&sub.epic_id) {
            return Err(Error::UnknownEpic(sub.epic_id));
        }
        self.note_restored_id(sub.base.id);
        let (id, epic_id) = (sub.id(), sub.epic_id);
        self.subtasks.insert(id, sub);
        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.add_subtask(id);
        }
        self.recompute_epic(epic_id);
        Ok(())
    }

    // ---- history -------------------------------------------------------

    /// Visit sequence, oldest first.
    pub fn history(&self) -> Vec<Entity> {
        self.history.list()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Replay a visit during load without re-cloning caller state.
    pub(crate) fn record_visit(&mut self, entity: Entity) {
        self.history.record(entity);
    }

    // ---- internals -----------------------------------------------------

    /// Reject a candidate whose planned interval intersects any stored
    /// scheduled entity other than `exclude` (the candidate's own id on
    /// update; 0 on create, which matches nothing).
    fn check_overlap(&self, candidate: &Task, exclude: u64) -> Result<()> {
        for other in self.prioritized() {
            if other.id() == exclude {
                continue;
            }
            if overlaps(candidate, other.base()) {
                return Err(Error::Overlap(other.id()));
            }
        }
        Ok(())
    }

    /// Rewrite an epic's derived fields from its currently linked
    /// subtasks. Idempotent; called after every mutation touching one of
    /// its subtasks.
    fn recompute_epic(&mut self, epic_id: u64) {
        let ids = match self.epics.get(&epic_id) {
            Some(epic) => epic.subtask_ids.clone(),
            None => return,
        };
        let subs: Vec<&Subtask> = ids.iter().filter_map(|id| self.subtasks.get(id)).collect();

        let status = if subs.is_empty() {
            Status::New
        } else if subs.iter().all(|s| s.base.status == Status::New) {
            Status::New
        } else if subs.iter().all(|s| s.base.status == Status::Done) {
            Status::Done
        } else {
            Status::InProgress
        };
        let duration: u32 = subs.iter().filter_map(|s| s.base.duration_min).sum();
        let start = subs.iter().filter_map(|s| s.base.start).min();
        let end = subs.iter().filter_map(|s| s.base.end_time()).max();

        if let Some(epic) = self.epics.get_mut(&epic_id) {
            epic.base.status = status;
            epic.base.duration_min = Some(duration);
            epic.base.start = start;
            epic.end = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 28)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn store_with_epic() -> (TaskStore, u64) {
        let mut store = TaskStore::new();
        let epic = store.create_epic(Epic::new("release", ""));
        (store, epic.id())
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let mut store = TaskStore::new();
        let a = store.create_task(Task::new("a", "")).unwrap();
        let b = store.create_task(Task::new("b", "")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let mut store = TaskStore::new();
        let a = store.create_task(Task::new("a", "")).unwrap();
        store.delete_task(a.id);
        let b = store.create_task(Task::new("b", "")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn empty_epic_is_new_with_zero_duration() {
        let (store, epic_id) = store_with_epic();
        let epic = &store.epics()[0];
        assert_eq!(epic.id(), epic_id);
        assert_eq!(epic.base.status, Status::New);
        assert_eq!(epic.base.duration_min, Some(0));
        assert_eq!(epic.base.start, None);
        assert_eq!(epic.end, None);
    }

    #[test]
    fn subtask_requires_existing_epic() {
        let mut store = TaskStore::new();
        let err = store.create_subtask(Subtask::new("s", "", 99)).unwrap_err();
        assert!(matches!(err, Error::UnknownEpic(99)));
        assert!(store.subtasks().is_empty());
    }

    #[test]
    fn epic_status_follows_subtasks() {
        let (mut store, epic_id) = store_with_epic();
        let s1 = store
            .create_subtask(Subtask::new("s1", "", epic_id))
            .unwrap();
        let s2 = store
            .create_subtask(Subtask::new("s2", "", epic_id))
            .unwrap();
        assert_eq!(store.epics()[0].base.status, Status::New);

        let mut s1 = s1;
        s1.base.status = Status::Done;
        store.update_subtask(s1.clone()).unwrap();
        assert_eq!(store.epics()[0].base.status, Status::InProgress);

        let mut s2 = s2;
        s2.base.status = Status::Done;
        store.update_subtask(s2).unwrap();
        assert_eq!(store.epics()[0].base.status, Status::Done);

        s1.base.status = Status::InProgress;
        store.update_subtask(s1).unwrap();
        assert_eq!(store.epics()[0].base.status, Status::InProgress);
    }

    #[test]
    fn epic_time_span_aggregates_subtasks() {
        let (mut store, epic_id) = store_with_epic();
        let mut s1 = Subtask::new("s1", "", epic_id).into_scheduled(30, at(9, 0));
        let mut s2 = Subtask::new("s2", "", epic_id).into_scheduled(30, at(9, 30));
        s1.base.status = Status::Done;
        s2.base.status = Status::Done;
        let s1 = store.create_subtask(s1).unwrap();
        store.create_subtask(s2).unwrap();

        let epic = &store.epics()[0];
        assert_eq!(epic.base.status, Status::Done);
        assert_eq!(epic.base.duration_min, Some(60));
        assert_eq!(epic.base.start, Some(at(9, 0)));
        assert_eq!(epic.end, Some(at(10, 0)));

        store.delete_subtask(s1.id());
        let epic = &store.epics()[0];
        assert_eq!(epic.base.status, Status::Done);
        assert_eq!(epic.base.duration_min, Some(30));
        assert_eq!(epic.base.start, Some(at(9, 30)));
        assert_eq!(epic.end, Some(at(10, 0)));
    }

    #[test]
    fn overlapping_create_is_rejected_without_consuming_an_id() {
        let mut store = TaskStore::new();
        let t1 = store
            .create_task(Task::new("t1", "").scheduled(60, at(10, 0)))
            .unwrap();
        let err = store
            .create_task(Task::new("t2", "").scheduled(30, at(10, 30)))
            .unwrap_err();
        assert!(matches!(err, Error::Overlap(id) if id == t1.id));
        assert_eq!(store.tasks().len(), 1);

        // The failed create must not have burnt an id.
        let t3 = store
            .create_task(Task::new("t3", "").scheduled(30, at(12, 0)))
            .unwrap();
        assert_eq!(t3.id, t1.id + 1);
    }

    #[test]
    fn touching_intervals_are_rejected() {
        let mut store = TaskStore::new();
        store
            .create_task(Task::new("t1", "").scheduled(60, at(10, 0)))
            .unwrap();
        // Starts exactly when t1 ends; closed intervals share 11:00.
        let err = store
            .create_task(Task::new("t2", "").scheduled(15, at(11, 0)))
            .unwrap_err();
        assert!(matches!(err, Error::Overlap(_)));
    }

    #[test]
    fn update_skips_self_comparison() {
        let mut store = TaskStore::new();
        let mut t = store
            .create_task(Task::new("t", "").scheduled(60, at(10, 0)))
            .unwrap();
        t.title = "renamed".into();
        store.update_task(t.clone()).unwrap();
        assert_eq!(store.tasks()[0].title, "renamed");

        // But moving onto another entity's slot still fails.
        store
            .create_task(Task::new("other", "").scheduled(30, at(13, 0)))
            .unwrap();
        t.start = Some(at(13, 15));
        let err = store.update_task(t).unwrap_err();
        assert!(matches!(err, Error::Overlap(_)));
        assert_eq!(store.tasks().iter().find(|x| x.id == 1).unwrap().start, Some(at(10, 0)));
    }

    #[test]
    fn update_unknown_id_is_a_silent_noop() {
        let mut store = TaskStore::new();
        let mut ghost = Task::new("ghost", "");
        ghost.id = 41;
        store.update_task(ghost).unwrap();
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn epic_update_only_adopts_title_and_description() {
        let (mut store, epic_id) = store_with_epic();
        let mut s = Subtask::new("s", "", epic_id);
        s.base.status = Status::Done;
        store.create_subtask(s).unwrap();

        let mut payload = Epic::new("renamed", "new text");
        payload.base.id = epic_id;
        payload.base.status = Status::New; // must be ignored
        payload.subtask_ids = vec![77, 78]; // must be ignored
        store.update_epic(payload);

        let epic = &store.epics()[0];
        assert_eq!(epic.base.title, "renamed");
        assert_eq!(epic.base.status, Status::Done);
        assert_eq!(epic.subtask_ids.len(), 1);
    }

    #[test]
    fn moving_a_subtask_relinks_both_epics() {
        let mut store = TaskStore::new();
        let e1 = store.create_epic(Epic::new("e1", ""));
        let e2 = store.create_epic(Epic::new("e2", ""));
        let mut s = store
            .create_subtask(Subtask::new("s", "", e1.id()))
            .unwrap();
        s.base.status = Status::Done;
        s.epic_id = e2.id();
        store.update_subtask(s.clone()).unwrap();

        let epics = {
            let mut v = store.epics();
            v.sort_by_key(Epic::id);
            v
        };
        assert!(epics[0].subtask_ids.is_empty());
        assert_eq!(epics[0].base.status, Status::New);
        assert_eq!(epics[1].subtask_ids, vec![s.id()]);
        assert_eq!(epics[1].base.status, Status::Done);
    }

    #[test]
    fn deleting_an_epic_cascades_and_purges_history() {
        let (mut store, epic_id) = store_with_epic();
        let s1 = store
            .create_subtask(Subtask::new("s1", "", epic_id))
            .unwrap();
        let s2 = store
            .create_subtask(Subtask::new("s2", "", epic_id))
            .unwrap();
        store.epic(epic_id).unwrap();
        store.subtask(s1.id()).unwrap();
        store.subtask(s2.id()).unwrap();
        assert_eq!(store.history().len(), 3);

        store.delete_epic(epic_id);
        assert!(store.epics().is_empty());
        assert!(store.subtasks().is_empty());
        assert!(store.history().is_empty());
    }

    #[test]
    fn lookups_record_history_in_visit_order() {
        let mut store = TaskStore::new();
        let a = store.create_task(Task::new("a", "")).unwrap();
        let b = store.create_task(Task::new("b", "")).unwrap();
        store.task(a.id).unwrap();
        store.task(b.id).unwrap();
        store.task(a.id).unwrap(); // moves a to the most-recent slot
        let ids: Vec<u64> = store.history().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        assert!(store.task(999).is_none());
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn prioritized_orders_by_start_then_id() {
        let mut store = TaskStore::new();
        let epic = store.create_epic(Epic::new("e", ""));
        let late = store
            .create_task(Task::new("late", "").scheduled(30, at(15, 0)))
            .unwrap();
        let early = store
            .create_subtask(Subtask::new("early", "", epic.id()).into_scheduled(30, at(9, 0)))
            .unwrap();
        store.create_task(Task::new("unscheduled", "")).unwrap();

        let ids: Vec<u64> = store.prioritized().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![early.id(), late.id]);
    }

    #[test]
    fn restore_preserves_ids_and_advances_the_counter() {
        let mut store = TaskStore::new();
        let mut epic = Epic::new("e", "");
        epic.base.id = 5;
        store.restore_epic(epic);
        let mut sub = Subtask::new("s", "", 5).into_scheduled(30, at(9, 0));
        sub.base.id = 8;
        sub.base.status = Status::Done;
        store.restore_subtask(sub).unwrap();

        let epic = &store.epics()[0];
        assert_eq!(epic.subtask_ids, vec![8]);
        assert_eq!(epic.base.status, Status::Done);

        let next = store.create_task(Task::new("fresh", "")).unwrap();
        assert_eq!(next.id, 9);
    }

    #[test]
    fn restore_rejects_dangling_and_self_references() {
        let mut store = TaskStore::new();
        let mut sub = Subtask::new("s", "", 3);
        sub.base.id = 4;
        assert!(matches!(
            store.restore_subtask(sub).unwrap_err(),
            Error::UnknownEpic(3)
        ));
        let mut own = Subtask::new("s", "", 4);
        own.base.id = 4;
        assert!(matches!(
            store.restore_subtask(own).unwrap_err(),
            Error::SelfReference(4)
        ));
    }

    impl Subtask {
        fn into_scheduled(mut self, duration_min: u32, start: NaiveDateTime) -> Self {
            self.base = self.base.scheduled(duration_min, start);
            self
        }
    }
}
