//! Reversible schedule edits and the undo/redo log.
//!
//! Entries record intents, not snapshots: undoing an entry emits its inverse
//! intent, redoing replays the forward one. Bulk entries always travel as one
//! unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::RelationType;

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Old and new dates of one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateChange {
    pub node_id: u64,
    pub old_start: Option<NaiveDate>,
    pub old_due: Option<NaiveDate>,
    pub new_start: Option<NaiveDate>,
    pub new_due: Option<NaiveDate>,
}

impl DateChange {
    pub fn inverse(&self) -> Self {
        Self {
            node_id: self.node_id,
            old_start: self.new_start,
            old_due: self.new_due,
            new_start: self.old_start,
            new_due: self.old_due,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.old_start == self.new_start && self.old_due == self.new_due
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOp {
    Create,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationChange {
    pub op: RelationOp,
    /// Known once the tracker acknowledged a create, or for existing relations.
    pub relation_id: Option<u64>,
    pub from_id: u64,
    pub to_id: u64,
    pub relation_type: RelationType,
    pub delay: Option<i64>,
}

impl RelationChange {
    pub fn inverse(&self) -> Self {
        Self {
            op: match self.op {
                RelationOp::Create => RelationOp::Delete,
                RelationOp::Delete => RelationOp::Create,
            },
            ..self.clone()
        }
    }
}

/// A committed schedule edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoEntry {
    DateChange(DateChange),
    BulkDateChange(Vec<DateChange>),
    RelationChange(RelationChange),
}

impl UndoEntry {
    pub fn inverse(&self) -> Self {
        match self {
            UndoEntry::DateChange(change) => UndoEntry::DateChange(change.inverse()),
            UndoEntry::BulkDateChange(changes) => {
                UndoEntry::BulkDateChange(changes.iter().rev().map(DateChange::inverse).collect())
            }
            UndoEntry::RelationChange(change) => UndoEntry::RelationChange(change.inverse()),
        }
    }

    /// Date changes carried by the entry (empty for relation edits).
    pub fn date_changes(&self) -> &[DateChange] {
        match self {
            UndoEntry::DateChange(change) => std::slice::from_ref(change),
            UndoEntry::BulkDateChange(changes) => changes,
            UndoEntry::RelationChange(_) => &[],
        }
    }

    /// Short menu label, e.g. "move #42".
    pub fn describe(&self) -> String {
        match self {
            UndoEntry::DateChange(change) => format!("date change #{}", change.node_id),
            UndoEntry::BulkDateChange(changes) => format!("move {} issues", changes.len()),
            UndoEntry::RelationChange(change) => {
                let verb = match change.op {
                    RelationOp::Create => "link",
                    RelationOp::Delete => "unlink",
                };
                format!("{} #{} → #{}", verb, change.from_id, change.to_id)
            }
        }
    }
}

/// An entry plus the identity used to correlate it with intents and drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub id: Uuid,
    pub entry: UndoEntry,
}

/// Two-stack undo/redo log.
#[derive(Debug, Clone)]
pub struct CommandLog {
    undo: Vec<HistoryItem>,
    redo: Vec<HistoryItem>,
    limit: usize,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl CommandLog {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Push a committed entry and clear the redo stack.
    pub fn commit(&mut self, entry: UndoEntry) -> HistoryItem {
        let item = HistoryItem {
            id: Uuid::new_v4(),
            entry,
        };
        self.undo.push(item.clone());
        if self.undo.len() > self.limit {
            self.undo.remove(0);
        }
        self.redo.clear();
        item
    }

    /// Move the newest entry to the redo stack. The caller emits its inverse.
    pub fn undo(&mut self) -> Option<HistoryItem> {
        let item = self.undo.pop()?;
        self.redo.push(item.clone());
        Some(item)
    }

    /// Move the newest undone entry back. The caller replays it.
    pub fn redo(&mut self) -> Option<HistoryItem> {
        let item = self.redo.pop()?;
        self.undo.push(item.clone());
        Some(item)
    }

    /// Drop an entry wherever it is, e.g. after the tracker rejected it.
    pub fn remove(&mut self, id: Uuid) -> Option<HistoryItem> {
        if let Some(pos) = self.undo.iter().position(|item| item.id == id) {
            return Some(self.undo.remove(pos));
        }
        let pos = self.redo.iter().position(|item| item.id == id)?;
        Some(self.redo.remove(pos))
    }

    /// Record the tracker-assigned id of a created relation.
    pub fn set_relation_id(&mut self, id: Uuid, relation_id: u64) {
        let item = self
            .undo
            .iter_mut()
            .chain(self.redo.iter_mut())
            .find(|item| item.id == id);
        if let Some(HistoryItem {
            entry: UndoEntry::RelationChange(change),
            ..
        }) = item
        {
            change.relation_id = Some(relation_id);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        self.undo.last().map(|item| item.entry.describe())
    }

    pub fn redo_label(&self) -> Option<String> {
        self.redo.last().map(|item| item.entry.describe())
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

/// Edits committed in draft mode that have not been sent yet.
#[derive(Debug, Clone, Default)]
pub struct DraftQueue {
    pending: Vec<HistoryItem>,
}

impl DraftQueue {
    pub fn push(&mut self, item: HistoryItem) {
        self.pending.push(item);
    }

    /// Remove a queued entry. Returns `false` if it was already sent.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.pending.len();
        self.pending.retain(|item| item.id != id);
        self.pending.len() != before
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.pending.iter().any(|item| item.id == id)
    }

    pub fn take_all(&mut self) -> Vec<HistoryItem> {
        std::mem::take(&mut self.pending)
    }

    pub fn items(&self) -> &[HistoryItem] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 6, day)
    }

    fn change(node_id: u64) -> DateChange {
        DateChange {
            node_id,
            old_start: d(1),
            old_due: d(5),
            new_start: d(3),
            new_due: d(7),
        }
    }

    #[test]
    fn commit_clears_redo() {
        let mut log = CommandLog::default();
        log.commit(UndoEntry::DateChange(change(1)));
        log.undo();
        assert!(log.can_redo());
        log.commit(UndoEntry::DateChange(change(2)));
        assert!(!log.can_redo());
        assert_eq!(log.undo_len(), 1);
    }

    #[test]
    fn undo_then_redo_returns_the_same_item() {
        let mut log = CommandLog::default();
        let committed = log.commit(UndoEntry::DateChange(change(1)));
        let undone = log.undo().unwrap();
        let redone = log.redo().unwrap();
        assert_eq!(committed, undone);
        assert_eq!(undone, redone);
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn bulk_inverse_swaps_every_change_in_reverse_order() {
        let entry = UndoEntry::BulkDateChange(vec![change(1), change(2)]);
        let inverse = entry.inverse();
        assert_eq!(inverse.date_changes()[0].node_id, 2);
        for (fwd, back) in entry.date_changes().iter().rev().zip(inverse.date_changes()) {
            assert_eq!(fwd.new_start, back.old_start);
            assert_eq!(fwd.old_due, back.new_due);
        }
        assert_eq!(inverse.inverse(), entry);
    }

    #[test]
    fn relation_inverse_flips_operation_only() {
        let create = RelationChange {
            op: RelationOp::Create,
            relation_id: Some(9),
            from_id: 1,
            to_id: 2,
            relation_type: RelationType::Precedes,
            delay: Some(2),
        };
        let delete = create.inverse();
        assert_eq!(delete.op, RelationOp::Delete);
        assert_eq!(delete.relation_id, Some(9));
        assert_eq!(delete.delay, Some(2));
        assert_eq!(delete.inverse(), create);
    }

    #[test]
    fn history_limit_drops_oldest() {
        let mut log = CommandLog::new(2);
        let first = log.commit(UndoEntry::DateChange(change(1)));
        log.commit(UndoEntry::DateChange(change(2)));
        log.commit(UndoEntry::DateChange(change(3)));
        assert_eq!(log.undo_len(), 2);
        assert!(log.remove(first.id).is_none());
    }

    #[test]
    fn relation_id_is_recorded_after_acknowledgement() {
        let mut log = CommandLog::default();
        let item = log.commit(UndoEntry::RelationChange(RelationChange {
            op: RelationOp::Create,
            relation_id: None,
            from_id: 4,
            to_id: 5,
            relation_type: RelationType::Blocks,
            delay: None,
        }));
        log.set_relation_id(item.id, 77);
        let undone = log.undo().unwrap();
        match undone.entry {
            UndoEntry::RelationChange(change) => assert_eq!(change.relation_id, Some(77)),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn draft_queue_removes_by_id() {
        let mut log = CommandLog::default();
        let mut drafts = DraftQueue::default();
        let item = log.commit(UndoEntry::DateChange(change(1)));
        drafts.push(item.clone());
        assert!(drafts.contains(item.id));
        assert!(drafts.remove(item.id));
        assert!(!drafts.remove(item.id));
        assert!(drafts.is_empty());
    }
}
