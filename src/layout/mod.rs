pub mod flatten;
pub mod incremental;
pub mod positioning;
pub mod route;
pub mod scene;

pub use flatten::{flatten, Row};
pub use incremental::{toggle, ToggleOutcome};
pub use positioning::{IndentGuide, Layout, ShadeBand, ZebraContribution};
pub use route::{route, ArrowPath, Point, RouteKind, RouteStyle, RouteTemplate};
pub use scene::{bar_extent, Arrow, ArrowSpec, Bar, BarGeometry, BarSpan, Label, LabelSide, Scene};
