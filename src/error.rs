use thiserror::Error;

use crate::model::CollapseKey;

/// Errors surfaced by the timeline engine and its file helpers.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown collapse key '{0}'")]
    UnknownKey(CollapseKey),

    #[error("unknown node id {0}")]
    UnknownNode(u64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
