use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::collapse::CollapseKey;

/// What a schedule node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    TimeGroup,
    Project,
    Issue,
}

impl NodeKind {
    fn key_prefix(self) -> &'static str {
        match self {
            NodeKind::TimeGroup => "group",
            NodeKind::Project => "project",
            NodeKind::Issue => "issue",
        }
    }
}

/// Which bar edge a dependency attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Start,
    End,
}

/// Relation kinds understood by the issue tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Relates,
    Duplicates,
    CopiedTo,
    Blocks,
    Precedes,
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl RelationType {
    /// Scheduling relations constrain ordering and attach to bar edges.
    pub fn is_scheduling(self) -> bool {
        !matches!(
            self,
            RelationType::Relates | RelationType::Duplicates | RelationType::CopiedTo
        )
    }

    /// `(from, to)` anchors for scheduling relations, `None` for informational ones.
    pub fn anchors(self) -> Option<(Anchor, Anchor)> {
        match self {
            RelationType::Relates | RelationType::Duplicates | RelationType::CopiedTo => None,
            RelationType::Blocks | RelationType::Precedes | RelationType::FinishToStart => {
                Some((Anchor::End, Anchor::Start))
            }
            RelationType::StartToStart => Some((Anchor::Start, Anchor::Start)),
            RelationType::FinishToFinish => Some((Anchor::End, Anchor::End)),
            RelationType::StartToFinish => Some((Anchor::Start, Anchor::End)),
        }
    }

    /// Suggested relation for a link gesture that engaged the given anchors.
    pub fn infer(from: Anchor, to: Anchor) -> Self {
        match (from, to) {
            (Anchor::End, Anchor::Start) => RelationType::Precedes,
            (Anchor::Start, Anchor::Start) => RelationType::StartToStart,
            (Anchor::End, Anchor::End) => RelationType::FinishToFinish,
            (Anchor::Start, Anchor::End) => RelationType::StartToFinish,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RelationType::Relates => "relates to",
            RelationType::Duplicates => "duplicates",
            RelationType::CopiedTo => "copied to",
            RelationType::Blocks => "blocks",
            RelationType::Precedes => "precedes",
            RelationType::FinishToStart => "finish to start",
            RelationType::StartToStart => "start to start",
            RelationType::FinishToFinish => "finish to finish",
            RelationType::StartToFinish => "start to finish",
        }
    }

    pub const ALL: [RelationType; 9] = [
        RelationType::Precedes,
        RelationType::Blocks,
        RelationType::FinishToStart,
        RelationType::StartToStart,
        RelationType::FinishToFinish,
        RelationType::StartToFinish,
        RelationType::Relates,
        RelationType::Duplicates,
        RelationType::CopiedTo,
    ];
}

/// A relation between two issues. Both endpoints list it; only the `from`
/// side draws an arrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: u64,
    pub from: u64,
    pub to: u64,
    pub kind: RelationType,
    /// Lag in days for `precedes`-style relations.
    #[serde(default)]
    pub delay: Option<i64>,
}

/// Issue-only attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueDetails {
    /// Progress from 0.0 (not started) to 1.0 (done).
    pub done_ratio: f32,
    pub estimated_hours: Option<f32>,
    pub spent_hours: Option<f32>,
    pub assignee: Option<String>,
    pub closed: bool,
    /// Issue belongs to another project than the row it is listed under.
    pub external: bool,
    /// Placeholder issue used for ad-hoc time booking.
    pub ad_hoc: bool,
    pub relations: Vec<Relation>,
}

impl IssueDetails {
    pub fn is_over_budget(&self) -> bool {
        match (self.spent_hours, self.estimated_hours) {
            (Some(spent), Some(estimated)) => estimated > 0.0 && spent > estimated,
            _ => false,
        }
    }
}

/// One schedule entity as delivered by the collaborator on a full refresh.
/// Children are listed in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub issue: Option<IssueDetails>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, id: u64, label: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            label: label.into(),
            start: None,
            due: None,
            issue: if kind == NodeKind::Issue {
                Some(IssueDetails::default())
            } else {
                None
            },
            children: Vec::new(),
        }
    }

    pub fn issue(id: u64, label: impl Into<String>, start: NaiveDate, due: NaiveDate) -> Self {
        Self::new(NodeKind::Issue, id, label).with_dates(Some(start), Some(due))
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, due: Option<NaiveDate>) -> Self {
        self.start = start;
        self.due = due;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.issue
            .get_or_insert_with(IssueDetails::default)
            .relations
            .push(relation);
        self
    }

    /// Stable identity across refreshes.
    pub fn collapse_key(&self) -> CollapseKey {
        CollapseKey::new(format!("{}-{}", self.kind.key_prefix(), self.id))
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Relations drawn from this node (the `from` side).
    pub fn outgoing_relations(&self) -> impl Iterator<Item = &Relation> {
        let id = self.id;
        self.issue
            .iter()
            .flat_map(|issue| issue.relations.iter())
            .filter(move |r| r.from == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_round_trip_through_inference() {
        for kind in [
            RelationType::Precedes,
            RelationType::StartToStart,
            RelationType::FinishToFinish,
            RelationType::StartToFinish,
        ] {
            let (from, to) = kind.anchors().unwrap();
            assert_eq!(RelationType::infer(from, to), kind);
        }
        assert!(RelationType::Relates.anchors().is_none());
        assert!(!RelationType::Duplicates.is_scheduling());
        assert!(RelationType::Blocks.is_scheduling());
    }

    #[test]
    fn collapse_key_is_kind_scoped() {
        let project = Node::new(NodeKind::Project, 7, "Web");
        let issue = Node::new(NodeKind::Issue, 7, "Login");
        assert_ne!(project.collapse_key(), issue.collapse_key());
        assert_eq!(issue.collapse_key().as_str(), "issue-7");
    }

    #[test]
    fn only_outgoing_relations_are_listed() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let issue = Node::issue(1, "A", d, d)
            .with_relation(Relation { id: 10, from: 1, to: 2, kind: RelationType::Precedes, delay: None })
            .with_relation(Relation { id: 11, from: 3, to: 1, kind: RelationType::Blocks, delay: None });
        let ids: Vec<u64> = issue.outgoing_relations().map(|r| r.id).collect();
        assert_eq!(ids, vec![10]);
    }

    #[test]
    fn over_budget_requires_both_hours() {
        let mut details = IssueDetails { spent_hours: Some(9.0), ..Default::default() };
        assert!(!details.is_over_budget());
        details.estimated_hours = Some(8.0);
        assert!(details.is_over_budget());
    }
}
