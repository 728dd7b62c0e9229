//! Pre-order flattening of the node forest into rows.
//!
//! Hidden rows are emitted too. A collapsed subtree keeps its rows in the
//! list with `is_visible = false`, which is what lets the incremental updater
//! flip visibility and offsets in place later.

use chrono::NaiveDate;

use crate::model::{CollapseKey, CollapseState, IssueDetails, Node, NodeKind};

/// One node's projection for a single layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub collapse_key: CollapseKey,
    pub parent_key: Option<CollapseKey>,
    /// Shade-band identity: the nearest project (or the group itself).
    pub group_key: CollapseKey,
    pub node_id: u64,
    pub kind: NodeKind,
    pub label: String,
    pub depth: usize,
    pub has_children: bool,
    pub is_expanded: bool,
    pub is_visible: bool,
    /// Number of descendants; they occupy the indices right after this row.
    pub subtree_len: usize,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub issue: Option<IssueDetails>,
    /// Filled in by positioning.
    pub height: f32,
    /// Position from the last full layout.
    pub original_y: f32,
    /// Position after incremental toggles.
    pub current_y: f32,
}

impl Row {
    pub fn bottom(&self) -> f32 {
        self.current_y + self.height
    }

    /// Index range of this row's descendants, given the row's own index.
    pub fn descendants(&self, index: usize) -> std::ops::Range<usize> {
        index + 1..index + 1 + self.subtree_len
    }
}

/// Flatten every root pre-order, deriving visibility from `collapse`.
pub fn flatten(roots: &[Node], collapse: &CollapseState) -> Vec<Row> {
    let mut rows = Vec::new();
    for root in roots {
        walk(root, None, None, 0, true, collapse, &mut rows);
    }
    rows
}

fn walk(
    node: &Node,
    parent_key: Option<&CollapseKey>,
    parent_group: Option<&CollapseKey>,
    depth: usize,
    visible: bool,
    collapse: &CollapseState,
    rows: &mut Vec<Row>,
) {
    let key = node.collapse_key();
    let has_children = node.has_children();
    let is_expanded = has_children && collapse.is_expanded(&key);
    let group_key = match (node.kind, parent_group) {
        (NodeKind::Issue, Some(group)) => group.clone(),
        _ => key.clone(),
    };

    let index = rows.len();
    rows.push(Row {
        collapse_key: key.clone(),
        parent_key: parent_key.cloned(),
        group_key: group_key.clone(),
        node_id: node.id,
        kind: node.kind,
        label: node.label.clone(),
        depth,
        has_children,
        is_expanded,
        is_visible: visible,
        subtree_len: 0,
        start: node.start,
        due: node.due,
        issue: node.issue.clone(),
        height: 0.0,
        original_y: 0.0,
        current_y: 0.0,
    });

    let child_visible = visible && is_expanded;
    for child in &node.children {
        walk(
            child,
            Some(&key),
            Some(&group_key),
            depth + 1,
            child_visible,
            collapse,
            rows,
        );
    }
    rows[index].subtree_len = rows.len() - index - 1;
}
