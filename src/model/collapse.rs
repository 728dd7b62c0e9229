use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a node, independent of render order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollapseKey(String);

impl CollapseKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollapseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollapseKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Requested change for a collapse toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDirection {
    Expand,
    Collapse,
    Toggle,
}

impl ToggleDirection {
    /// Resolve to the target expanded flag given the current one, or `None`
    /// when the request matches the current state.
    pub fn resolve(self, expanded: bool) -> Option<bool> {
        match self {
            ToggleDirection::Expand if expanded => None,
            ToggleDirection::Collapse if !expanded => None,
            ToggleDirection::Expand => Some(true),
            ToggleDirection::Collapse => Some(false),
            ToggleDirection::Toggle => Some(!expanded),
        }
    }
}

/// Expanded flags per collapse key. Keys never seen default to expanded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollapseState {
    expanded: HashMap<CollapseKey, bool>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, key: &CollapseKey) -> bool {
        self.expanded.get(key).copied().unwrap_or(true)
    }

    pub fn set(&mut self, key: CollapseKey, expanded: bool) {
        self.expanded.insert(key, expanded);
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}
