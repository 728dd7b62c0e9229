//! One-way intents to the issue tracker.
//!
//! The engine never waits on the host. Every intent carries a ticket; the
//! host answers later through [`TimelineSession::intent_acknowledged`] or
//! [`TimelineSession::intent_failed`], and delivers fresh data through
//! [`TimelineSession::refresh`].
//!
//! [`TimelineSession::intent_acknowledged`]: crate::session::TimelineSession::intent_acknowledged
//! [`TimelineSession::intent_failed`]: crate::session::TimelineSession::intent_failed
//! [`TimelineSession::refresh`]: crate::session::TimelineSession::refresh

use std::fmt;

use uuid::Uuid;

use crate::model::{CollapseKey, DateChange, RelationChange};

/// Correlates an intent with its acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentTicket(pub Uuid);

impl IntentTicket {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IntentTicket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntentTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Successful answer to an intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ack {
    /// Id the tracker gave a newly created relation.
    pub relation_id: Option<u64>,
}

pub trait ScheduleHost {
    fn request_date_change(&mut self, ticket: IntentTicket, change: &DateChange);

    /// All changes succeed or fail together.
    fn request_bulk_date_change(&mut self, ticket: IntentTicket, changes: &[DateChange]);

    fn request_relation_change(&mut self, ticket: IntentTicket, change: &RelationChange);

    fn persist_collapse_state(&mut self, key: &CollapseKey, expanded: bool);

    fn persist_selection(&mut self, key: Option<&CollapseKey>);

    /// Ask for a fresh node tree. The host answers with `refresh`.
    fn request_refresh(&mut self);
}

/// An intent as it was sent, for hosts that record or replay them.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    DateChange(IntentTicket, DateChange),
    BulkDateChange(IntentTicket, Vec<DateChange>),
    RelationChange(IntentTicket, RelationChange),
    CollapseState(CollapseKey, bool),
    Selection(Option<CollapseKey>),
    Refresh,
}

impl Intent {
    pub fn ticket(&self) -> Option<IntentTicket> {
        match self {
            Intent::DateChange(ticket, _)
            | Intent::BulkDateChange(ticket, _)
            | Intent::RelationChange(ticket, _) => Some(*ticket),
            _ => None,
        }
    }
}

/// Host that only records what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub intents: Vec<Intent>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule intents only, without collapse or selection bookkeeping.
    pub fn schedule_intents(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter().filter(|intent| intent.ticket().is_some())
    }

    pub fn last_ticket(&self) -> Option<IntentTicket> {
        self.intents.iter().rev().find_map(Intent::ticket)
    }

    pub fn refresh_requests(&self) -> usize {
        self.intents
            .iter()
            .filter(|intent| matches!(intent, Intent::Refresh))
            .count()
    }

    pub fn clear(&mut self) {
        self.intents.clear();
    }
}

impl ScheduleHost for RecordingHost {
    fn request_date_change(&mut self, ticket: IntentTicket, change: &DateChange) {
        self.intents.push(Intent::DateChange(ticket, change.clone()));
    }

    fn request_bulk_date_change(&mut self, ticket: IntentTicket, changes: &[DateChange]) {
        self.intents
            .push(Intent::BulkDateChange(ticket, changes.to_vec()));
    }

    fn request_relation_change(&mut self, ticket: IntentTicket, change: &RelationChange) {
        self.intents
            .push(Intent::RelationChange(ticket, change.clone()));
    }

    fn persist_collapse_state(&mut self, key: &CollapseKey, expanded: bool) {
        self.intents.push(Intent::CollapseState(key.clone(), expanded));
    }

    fn persist_selection(&mut self, key: Option<&CollapseKey>) {
        self.intents.push(Intent::Selection(key.cloned()));
    }

    fn request_refresh(&mut self) {
        self.intents.push(Intent::Refresh);
    }
}
