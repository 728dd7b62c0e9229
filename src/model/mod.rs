pub mod collapse;
pub mod history;
pub mod node;
pub mod timeline;

pub use collapse::{CollapseKey, CollapseState, ToggleDirection};
pub use history::{CommandLog, DateChange, DraftQueue, HistoryItem, RelationChange, RelationOp, UndoEntry};
pub use node::{Anchor, IssueDetails, Node, NodeKind, Relation, RelationType};
pub use timeline::{TimelineScale, TimelineViewport};
