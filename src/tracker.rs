//! In-process issue tracker the viewer edits when it runs standalone.

use std::path::PathBuf;

use gantt_timeline::host::Intent;
use gantt_timeline::model::{
    CollapseState, DateChange, Node, NodeKind, Relation, RelationChange, RelationOp,
};
use gantt_timeline::{Ack, CollapseKey, IntentTicket, ScheduleHost, TimelineError};

/// Answer to one processed intent.
pub type Outcome = (IntentTicket, Result<Ack, String>);

/// Queues intents from the session and applies them to its own copy of the
/// schedule when the app calls [`LocalTracker::process`].
pub struct LocalTracker {
    schedule: Vec<Node>,
    outbox: Vec<Intent>,
    collapse: CollapseState,
    collapse_path: Option<PathBuf>,
    selected: Option<CollapseKey>,
    refresh_requested: bool,
    next_relation_id: u64,
}

impl LocalTracker {
    pub fn new(schedule: Vec<Node>) -> Self {
        let next_relation_id = max_relation_id(&schedule) + 1;
        Self {
            schedule,
            outbox: Vec::new(),
            collapse: CollapseState::new(),
            collapse_path: None,
            selected: None,
            refresh_requested: false,
            next_relation_id,
        }
    }

    /// Persist collapse flags to `path` whenever they change.
    pub fn with_collapse_file(mut self, path: PathBuf, collapse: CollapseState) -> Self {
        self.collapse_path = Some(path);
        self.collapse = collapse;
        self
    }

    pub fn schedule(&self) -> &[Node] {
        &self.schedule
    }

    /// Replace the whole schedule, e.g. after opening a file.
    pub fn replace_schedule(&mut self, schedule: Vec<Node>) {
        self.next_relation_id = max_relation_id(&schedule) + 1;
        self.schedule = schedule;
        self.outbox.clear();
        self.refresh_requested = true;
    }

    pub fn selected(&self) -> Option<&CollapseKey> {
        self.selected.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Whether a refresh was asked for since the last call.
    pub fn take_refresh(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    /// Apply every queued intent to the schedule.
    pub fn process(&mut self) -> Vec<Outcome> {
        let intents = std::mem::take(&mut self.outbox);
        let mut outcomes = Vec::with_capacity(intents.len());
        for intent in intents {
            let result = match &intent {
                Intent::DateChange(_, change) => {
                    self.apply_dates(std::slice::from_ref(change)).map(|_| Ack::default())
                }
                Intent::BulkDateChange(_, changes) => {
                    self.apply_dates(changes).map(|_| Ack::default())
                }
                Intent::RelationChange(_, change) => self.apply_relation(change),
                _ => continue,
            };
            if let Some(ticket) = intent.ticket() {
                if let Err(reason) = &result {
                    tracing::warn!("tracker rejected {}: {}", ticket, reason);
                }
                outcomes.push((ticket, result));
            }
        }
        if !outcomes.is_empty() {
            self.refresh_requested = true;
        }
        outcomes
    }

    /// All or nothing: every issue must exist before any date moves.
    fn apply_dates(&mut self, changes: &[DateChange]) -> Result<(), String> {
        for change in changes {
            if let (Some(start), Some(due)) = (change.new_start, change.new_due) {
                if due < start {
                    return Err(format!("issue #{} would end before it starts", change.node_id));
                }
            }
            if find_issue(&self.schedule, change.node_id).is_none() {
                return Err(TimelineError::UnknownNode(change.node_id).to_string());
            }
        }
        for change in changes {
            if let Some(node) = find_issue_mut(&mut self.schedule, change.node_id) {
                node.start = change.new_start;
                node.due = change.new_due;
            }
        }
        Ok(())
    }

    fn apply_relation(&mut self, change: &RelationChange) -> Result<Ack, String> {
        match change.op {
            RelationOp::Create => {
                if change.from_id == change.to_id {
                    return Err("an issue cannot relate to itself".into());
                }
                let from = find_issue(&self.schedule, change.from_id)
                    .ok_or_else(|| TimelineError::UnknownNode(change.from_id).to_string())?;
                find_issue(&self.schedule, change.to_id)
                    .ok_or_else(|| TimelineError::UnknownNode(change.to_id).to_string())?;
                let duplicate = from.issue.iter().flat_map(|i| i.relations.iter()).any(|r| {
                    r.from == change.from_id && r.to == change.to_id && r.kind == change.relation_type
                });
                if duplicate {
                    return Err("relation already exists".into());
                }
                let relation = Relation {
                    id: self.next_relation_id,
                    from: change.from_id,
                    to: change.to_id,
                    kind: change.relation_type,
                    delay: change.delay,
                };
                self.next_relation_id += 1;
                for id in [change.from_id, change.to_id] {
                    if let Some(node) = find_issue_mut(&mut self.schedule, id) {
                        node.issue
                            .get_or_insert_with(Default::default)
                            .relations
                            .push(relation.clone());
                    }
                }
                Ok(Ack {
                    relation_id: Some(relation.id),
                })
            }
            RelationOp::Delete => {
                let mut removed = false;
                for id in [change.from_id, change.to_id] {
                    if let Some(issue) =
                        find_issue_mut(&mut self.schedule, id).and_then(|n| n.issue.as_mut())
                    {
                        let before = issue.relations.len();
                        issue.relations.retain(|r| match change.relation_id {
                            Some(rid) => r.id != rid,
                            None => !(r.from == change.from_id
                                && r.to == change.to_id
                                && r.kind == change.relation_type),
                        });
                        removed |= issue.relations.len() != before;
                    }
                }
                if removed {
                    Ok(Ack::default())
                } else {
                    Err(format!(
                        "relation #{} → #{} not found",
                        change.from_id, change.to_id
                    ))
                }
            }
        }
    }
}

impl ScheduleHost for LocalTracker {
    fn request_date_change(&mut self, ticket: IntentTicket, change: &DateChange) {
        self.outbox.push(Intent::DateChange(ticket, change.clone()));
    }

    fn request_bulk_date_change(&mut self, ticket: IntentTicket, changes: &[DateChange]) {
        self.outbox
            .push(Intent::BulkDateChange(ticket, changes.to_vec()));
    }

    fn request_relation_change(&mut self, ticket: IntentTicket, change: &RelationChange) {
        self.outbox
            .push(Intent::RelationChange(ticket, change.clone()));
    }

    fn persist_collapse_state(&mut self, key: &CollapseKey, expanded: bool) {
        if !has_key(&self.schedule, key) {
            tracing::warn!("{}", TimelineError::UnknownKey(key.clone()));
            return;
        }
        self.collapse.set(key.clone(), expanded);
        if let Some(path) = &self.collapse_path {
            if let Err(e) = gantt_timeline::io::save_collapse_state(&self.collapse, path) {
                tracing::warn!("could not save collapse state to {:?}: {}", path, e);
            }
        }
    }

    fn persist_selection(&mut self, key: Option<&CollapseKey>) {
        self.selected = key.cloned();
    }

    fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }
}

fn has_key(nodes: &[Node], key: &CollapseKey) -> bool {
    nodes
        .iter()
        .any(|node| node.collapse_key() == *key || has_key(&node.children, key))
}

fn find_issue(nodes: &[Node], id: u64) -> Option<&Node> {
    nodes.iter().find_map(|node| {
        if node.kind == NodeKind::Issue && node.id == id {
            Some(node)
        } else {
            find_issue(&node.children, id)
        }
    })
}

fn find_issue_mut(nodes: &mut [Node], id: u64) -> Option<&mut Node> {
    for node in nodes.iter_mut() {
        if node.kind == NodeKind::Issue && node.id == id {
            return Some(node);
        }
        if let Some(found) = find_issue_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn max_relation_id(nodes: &[Node]) -> u64 {
    nodes
        .iter()
        .map(|node| {
            let own = node
                .issue
                .iter()
                .flat_map(|issue| issue.relations.iter())
                .map(|r| r.id)
                .max()
                .unwrap_or(0);
            own.max(max_relation_id(&node.children))
        })
        .max()
        .unwrap_or(0)
}
