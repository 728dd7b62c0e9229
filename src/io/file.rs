use std::path::Path;

use crate::error::Result;
use crate::model::{CollapseState, Node};

/// Save a node tree to a JSON file.
pub fn save_nodes(nodes: &[Node], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(nodes)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a node tree from a JSON file.
pub fn load_nodes(path: &Path) -> Result<Vec<Node>> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

pub fn save_collapse_state(state: &CollapseState, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load the collapse state, or an empty one (everything expanded) when the
/// file does not exist yet.
pub fn load_collapse_state(path: &Path) -> Result<CollapseState> {
    if !path.exists() {
        return Ok(CollapseState::new());
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TimelineError;
    use crate::model::{NodeKind, Relation, RelationType};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[test]
    fn node_tree_survives_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        let nodes = vec![Node::new(NodeKind::Project, 1, "Web").with_children(vec![
            Node::issue(10, "Design", date(3), date(5)).with_relation(Relation {
                id: 4,
                from: 10,
                to: 11,
                kind: RelationType::FinishToStart,
                delay: Some(1),
            }),
            Node::new(NodeKind::Issue, 11, "Build").with_dates(None, Some(date(9))),
        ])];
        save_nodes(&nodes, &path).unwrap();
        assert_eq!(load_nodes(&path).unwrap(), nodes);
    }

    #[test]
    fn minimal_feed_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(
            &path,
            r#"[{ "kind": "issue", "id": 3, "label": "Loose", "start": "2025-02-01" }]"#,
        )
        .unwrap();
        let nodes = load_nodes(&path).unwrap();
        assert_eq!(nodes[0].start, Some(date(1)));
        assert!(nodes[0].due.is_none());
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn malformed_feed_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_nodes(&path), Err(TimelineError::Json(_))));
    }

    #[test]
    fn missing_collapse_file_means_all_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collapse_state.json");
        assert!(load_collapse_state(&path).unwrap().is_empty());

        let mut state = CollapseState::new();
        state.set("project-1".into(), false);
        save_collapse_state(&state, &path).unwrap();
        let loaded = load_collapse_state(&path).unwrap();
        assert!(!loaded.is_expanded(&"project-1".into()));
        assert!(loaded.is_expanded(&"project-2".into()));
    }
}
