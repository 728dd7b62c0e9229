//! Scene generation: bars, labels and dependency arrows for one full refresh.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::config::{BarConfig, TimelineConfig};
use crate::model::{Anchor, CollapseKey, NodeKind, RelationType, TimelineViewport};

use super::positioning::Layout;
use super::route::{route, ArrowPath, Point, RouteKind, RouteStyle};

/// Horizontal extent and vertical centre of a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub start_x: f32,
    pub end_x: f32,
    pub center_y: f32,
}

impl BarGeometry {
    pub fn width(&self) -> f32 {
        self.end_x - self.start_x
    }

    pub fn anchor_x(&self, anchor: Anchor) -> f32 {
        match anchor {
            Anchor::Start => self.start_x,
            Anchor::End => self.end_x,
        }
    }

    pub fn center(&self) -> Point {
        Point::new((self.start_x + self.end_x) / 2.0, self.center_y)
    }
}

/// Which dates a bar was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarSpan {
    Full,
    /// Only a start date; the bar shows one day from the start.
    StartOnly,
    /// Only a due date; the bar shows the due day.
    DueOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSide {
    Right,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Left edge for `Right`, right edge for `Left`.
    pub x: f32,
    pub y: f32,
    pub side: LabelSide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub key: CollapseKey,
    pub node_id: u64,
    pub kind: NodeKind,
    pub geometry: BarGeometry,
    pub span: BarSpan,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub done_ratio: f32,
    pub closed: bool,
    pub over_budget: bool,
    pub external: bool,
    pub ad_hoc: bool,
    pub visible: bool,
    pub label: Label,
}

impl Bar {
    /// Issue bars can be dragged; summary bars follow their children.
    pub fn is_draggable(&self) -> bool {
        self.kind == NodeKind::Issue
    }

    pub fn progress_width(&self) -> f32 {
        self.geometry.width() * self.done_ratio.clamp(0.0, 1.0)
    }

    /// Whether an edge has a date behind it and can be resized.
    pub fn has_edge(&self, anchor: Anchor) -> bool {
        match (anchor, self.span) {
            (_, BarSpan::Full) => true,
            (Anchor::Start, BarSpan::StartOnly) => true,
            (Anchor::End, BarSpan::DueOnly) => true,
            _ => false,
        }
    }
}

/// One dependency between two bars.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowSpec {
    pub relation_id: u64,
    pub from_id: u64,
    pub to_id: u64,
    pub from_key: CollapseKey,
    pub to_key: CollapseKey,
    pub relation_type: RelationType,
    pub is_scheduling: bool,
    pub from_anchor: Anchor,
    pub to_anchor: Anchor,
    pub delay: Option<i64>,
}

impl ArrowSpec {
    pub fn route_kind(&self) -> RouteKind {
        if self.is_scheduling {
            RouteKind::Scheduling {
                from: self.from_anchor,
                to: self.to_anchor,
            }
        } else {
            RouteKind::Informational
        }
    }

    pub fn touches(&self, key: &CollapseKey) -> bool {
        &self.from_key == key || &self.to_key == key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub spec: ArrowSpec,
    pub path: ArrowPath,
    pub visible: bool,
}

/// Renderable state for one full refresh. Mutated in place between refreshes
/// by the incremental updater and the drag engine.
#[derive(Debug, Clone)]
pub struct Scene {
    pub bars: HashMap<CollapseKey, Bar>,
    pub arrows: Vec<Arrow>,
    pub arrows_by_key: HashMap<CollapseKey, Vec<usize>>,
    pub key_of_node: HashMap<u64, CollapseKey>,
    pub width: f32,
    pub height: f32,
    pub today_x: Option<f32>,
    pub link_preview: Option<ArrowPath>,
    pub route_style: RouteStyle,
    bar_config: BarConfig,
}

/// Bar extent for the given dates. Due dates are inclusive, so the bar ends
/// at the right edge of the due day.
pub fn bar_extent(
    start: Option<NaiveDate>,
    due: Option<NaiveDate>,
    viewport: &TimelineViewport,
) -> Option<(f32, f32, BarSpan)> {
    let day = Duration::days(1);
    match (start, due) {
        (Some(start), Some(due)) => {
            let due = due.max(start);
            Some((viewport.date_to_x(start), viewport.date_to_x(due + day), BarSpan::Full))
        }
        (Some(start), None) => Some((
            viewport.date_to_x(start),
            viewport.date_to_x(start + day),
            BarSpan::StartOnly,
        )),
        (None, Some(due)) => Some((
            viewport.date_to_x(due),
            viewport.date_to_x(due + day),
            BarSpan::DueOnly,
        )),
        (None, None) => None,
    }
}

impl Scene {
    pub fn empty(config: &TimelineConfig) -> Self {
        Self {
            bars: HashMap::new(),
            arrows: Vec::new(),
            arrows_by_key: HashMap::new(),
            key_of_node: HashMap::new(),
            width: 0.0,
            height: 0.0,
            today_x: None,
            link_preview: None,
            route_style: RouteStyle::from_config(&config.arrows, &config.bars, &config.layout),
            bar_config: config.bars.clone(),
        }
    }

    /// Build the full scene from a positioned layout.
    pub fn generate(
        layout: &Layout,
        viewport: &TimelineViewport,
        config: &TimelineConfig,
        today: NaiveDate,
    ) -> Self {
        let mut scene = Self::empty(config);
        scene.width = viewport.total_width();
        scene.height = layout.reserved_height;
        scene.today_x = viewport.contains(today).then(|| viewport.date_to_x(today));

        for (i, row) in layout.rows.iter().enumerate() {
            let (start, due) = match row.kind {
                NodeKind::Issue => (row.start, row.due),
                NodeKind::Project | NodeKind::TimeGroup => summary_dates(layout, i),
            };
            let Some((start_x, end_x, span)) = bar_extent(start, due, viewport) else {
                continue;
            };
            let end_x = end_x.max(start_x + config.bars.min_bar_width);
            let geometry = BarGeometry {
                start_x,
                end_x,
                center_y: row.current_y + row.height / 2.0,
            };
            let issue = row.issue.as_ref();
            let text = match row.kind {
                NodeKind::Issue => format!("#{} {}", row.node_id, row.label),
                _ => row.label.clone(),
            };
            let mut bar = Bar {
                key: row.collapse_key.clone(),
                node_id: row.node_id,
                kind: row.kind,
                geometry,
                span,
                start,
                due,
                done_ratio: issue.map(|i| i.done_ratio).unwrap_or(0.0),
                closed: issue.map(|i| i.closed).unwrap_or(false),
                over_budget: issue.map(|i| i.is_over_budget()).unwrap_or(false),
                external: issue.map(|i| i.external).unwrap_or(false),
                ad_hoc: issue.map(|i| i.ad_hoc).unwrap_or(false),
                visible: row.is_visible,
                label: Label {
                    text,
                    x: 0.0,
                    y: 0.0,
                    side: LabelSide::Right,
                },
            };
            bar.label = scene.place_label(&bar.label.text, &bar.geometry);
            if row.kind == NodeKind::Issue {
                scene.key_of_node.insert(row.node_id, row.collapse_key.clone());
            }
            scene.bars.insert(row.collapse_key.clone(), bar);
        }

        for row in &layout.rows {
            let Some(issue) = row.issue.as_ref() else {
                continue;
            };
            for relation in issue.relations.iter().filter(|r| r.from == row.node_id) {
                let Some(to_key) = scene.key_of_node.get(&relation.to).cloned() else {
                    tracing::trace!("relation {} points outside the view", relation.id);
                    continue;
                };
                if !scene.bars.contains_key(&row.collapse_key) {
                    continue;
                }
                let (from_anchor, to_anchor) =
                    relation.kind.anchors().unwrap_or((Anchor::End, Anchor::Start));
                let spec = ArrowSpec {
                    relation_id: relation.id,
                    from_id: relation.from,
                    to_id: relation.to,
                    from_key: row.collapse_key.clone(),
                    to_key,
                    relation_type: relation.kind,
                    is_scheduling: relation.kind.is_scheduling(),
                    from_anchor,
                    to_anchor,
                    delay: relation.delay,
                };
                scene.push_arrow(spec);
            }
        }
        scene
    }

    /// Add an arrow and route it against the current bar geometry.
    pub fn push_arrow(&mut self, spec: ArrowSpec) -> Option<usize> {
        let path = self.route_spec(&spec)?;
        let visible = self.bar_visible(&spec.from_key) && self.bar_visible(&spec.to_key);
        let index = self.arrows.len();
        for key in [&spec.from_key, &spec.to_key] {
            self.arrows_by_key.entry(key.clone()).or_default().push(index);
        }
        self.arrows.push(Arrow {
            spec,
            path,
            visible,
        });
        Some(index)
    }

    fn bar_visible(&self, key: &CollapseKey) -> bool {
        self.bars.get(key).map(|bar| bar.visible).unwrap_or(false)
    }

    /// Route a spec with whatever geometry the bars have right now.
    pub fn route_spec(&self, spec: &ArrowSpec) -> Option<ArrowPath> {
        let from = self.bars.get(&spec.from_key)?.geometry;
        let to = self.bars.get(&spec.to_key)?.geometry;
        let (a, b) = if spec.is_scheduling {
            (
                Point::new(from.anchor_x(spec.from_anchor), from.center_y),
                Point::new(to.anchor_x(spec.to_anchor), to.center_y),
            )
        } else {
            (from.center(), to.center())
        };
        Some(route(a, b, spec.route_kind(), &self.route_style))
    }

    /// Arrow indices touching a bar.
    pub fn arrows_touching(&self, key: &CollapseKey) -> &[usize] {
        self.arrows_by_key
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Re-route one arrow and refresh its visibility. Returns true if either changed.
    pub fn reroute(&mut self, index: usize) -> bool {
        let Some(arrow) = self.arrows.get(index) else {
            return false;
        };
        let Some(path) = self.route_spec(&arrow.spec) else {
            return false;
        };
        let visible =
            self.bar_visible(&arrow.spec.from_key) && self.bar_visible(&arrow.spec.to_key);
        let arrow = &mut self.arrows[index];
        let changed = arrow.path != path || arrow.visible != visible;
        arrow.path = path;
        arrow.visible = visible;
        changed
    }

    /// Label to the right of the bar, or flipped left when it would overflow.
    pub fn place_label(&self, text: &str, geometry: &BarGeometry) -> Label {
        let gap = self.bar_config.label_gap;
        let estimated = text.chars().count() as f32 * self.bar_config.label_char_width;
        let right_x = geometry.end_x + gap;
        let side = if self.width > 0.0 && right_x + estimated > self.width {
            LabelSide::Left
        } else {
            LabelSide::Right
        };
        let x = match side {
            LabelSide::Right => right_x,
            LabelSide::Left => geometry.start_x - gap,
        };
        Label {
            text: text.to_string(),
            x,
            y: geometry.center_y,
            side,
        }
    }

    /// Replace a bar's geometry and move its label along.
    pub fn set_bar_geometry(&mut self, key: &CollapseKey, geometry: BarGeometry) -> bool {
        let Some(text) = self.bars.get(key).map(|bar| bar.label.text.clone()) else {
            return false;
        };
        let label = self.place_label(&text, &geometry);
        if let Some(bar) = self.bars.get_mut(key) {
            bar.geometry = geometry;
            bar.label = label;
        }
        true
    }

    /// Recompute a bar from new dates.
    pub fn apply_dates(
        &mut self,
        key: &CollapseKey,
        start: Option<NaiveDate>,
        due: Option<NaiveDate>,
        viewport: &TimelineViewport,
    ) -> Option<BarGeometry> {
        let (start_x, end_x, span) = bar_extent(start, due, viewport)?;
        let min_width = self.bar_config.min_bar_width;
        let bar = self.bars.get_mut(key)?;
        bar.start = start;
        bar.due = due;
        bar.span = span;
        let geometry = BarGeometry {
            start_x,
            end_x: end_x.max(start_x + min_width),
            center_y: bar.geometry.center_y,
        };
        self.set_bar_geometry(key, geometry);
        Some(geometry)
    }

    pub fn bar_for_node(&self, node_id: u64) -> Option<&Bar> {
        self.key_of_node.get(&node_id).and_then(|key| self.bars.get(key))
    }

    /// Topmost visible bar under a point.
    pub fn bar_at(&self, point: Point, slack: f32) -> Option<&Bar> {
        let half = self.route_style.bar_half_height;
        self.bars.values().find(|bar| {
            let g = &bar.geometry;
            bar.visible
                && point.x >= g.start_x - slack
                && point.x <= g.end_x + slack
                && (point.y - g.center_y).abs() <= half
        })
    }
}

/// Own dates of a summary row, or the span of its descendants.
fn summary_dates(layout: &Layout, index: usize) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let row = &layout.rows[index];
    if row.start.is_some() && row.due.is_some() {
        return (row.start, row.due);
    }
    let descendants = row.descendants(index).map(|i| &layout.rows[i]);
    let mut start: Option<NaiveDate> = None;
    let mut due: Option<NaiveDate> = None;
    for child in descendants {
        for date in [child.start, child.due].into_iter().flatten() {
            start = Some(start.map_or(date, |s| s.min(date)));
            due = Some(due.map_or(date, |d| d.max(date)));
        }
    }
    (row.start.or(start), row.due.or(due))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::flatten::flatten;
    use crate::model::{CollapseState, Node, Relation};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn viewport() -> TimelineViewport {
        TimelineViewport::new(date(1), date(31), 10.0)
    }

    fn build(nodes: &[Node], state: &CollapseState) -> (Layout, Scene) {
        let config = TimelineConfig::default();
        let layout = Layout::build(flatten(nodes, state), &config.layout);
        let scene = Scene::generate(&layout, &viewport(), &config, date(10));
        (layout, scene)
    }

    fn project() -> Vec<Node> {
        vec![Node::new(NodeKind::Project, 1, "Web").with_children(vec![
            Node::issue(10, "Design", date(3), date(5)).with_relation(Relation {
                id: 500,
                from: 10,
                to: 11,
                kind: RelationType::Precedes,
                delay: None,
            }),
            Node::issue(11, "Build", date(8), date(12)),
            Node::new(NodeKind::Issue, 12, "Later").with_dates(Some(date(20)), None),
        ])]
    }

    #[test]
    fn bars_come_from_dates_with_inclusive_due() {
        let (_, scene) = build(&project(), &CollapseState::new());
        let bar = &scene.bars[&"issue-10".into()];
        assert_eq!(bar.geometry.start_x, 20.0);
        assert_eq!(bar.geometry.end_x, 50.0);
        assert_eq!(bar.geometry.center_y, 45.0);
        assert_eq!(bar.label.text, "#10 Design");
        assert_eq!(bar.label.side, LabelSide::Right);
        assert_eq!(scene.today_x, Some(90.0));
    }

    #[test]
    fn open_ended_bars_span_one_day() {
        let (_, scene) = build(&project(), &CollapseState::new());
        let bar = &scene.bars[&"issue-12".into()];
        assert_eq!(bar.span, BarSpan::StartOnly);
        assert_eq!(bar.geometry.width(), 10.0);
        assert!(bar.has_edge(Anchor::Start));
        assert!(!bar.has_edge(Anchor::End));
    }

    #[test]
    fn summary_bar_spans_children() {
        let (_, scene) = build(&project(), &CollapseState::new());
        let bar = &scene.bars[&"project-1".into()];
        assert_eq!((bar.start, bar.due), (Some(date(3)), Some(date(20))));
        assert!(!bar.is_draggable());
    }

    #[test]
    fn arrows_connect_anchor_edges() {
        let (_, scene) = build(&project(), &CollapseState::new());
        assert_eq!(scene.arrows.len(), 1);
        let arrow = &scene.arrows[0];
        assert!(arrow.visible);
        assert_eq!(arrow.path.start(), Point::new(50.0, 45.0));
        assert_eq!(arrow.path.end(), Point::new(70.0, 75.0));
        assert_eq!(scene.arrows_touching(&"issue-11".into()), &[0]);
    }

    #[test]
    fn arrows_into_hidden_rows_are_hidden() {
        let mut state = CollapseState::new();
        state.set("project-1".into(), false);
        let (_, scene) = build(&project(), &state);
        assert!(!scene.arrows[0].visible);
        assert!(!scene.bars[&"issue-10".into()].visible);
    }

    #[test]
    fn labels_flip_left_near_the_right_edge() {
        let nodes = vec![Node::issue(1, "A rather long subject line", date(28), date(30))];
        let (_, scene) = build(&nodes, &CollapseState::new());
        let bar = &scene.bars[&"issue-1".into()];
        assert_eq!(bar.label.side, LabelSide::Left);
        assert_eq!(bar.label.x, bar.geometry.start_x - 6.0);
    }

    #[test]
    fn applying_dates_moves_bar_and_keeps_row() {
        let (_, mut scene) = build(&project(), &CollapseState::new());
        let key: CollapseKey = "issue-11".into();
        let geometry = scene
            .apply_dates(&key, Some(date(9)), Some(date(14)), &viewport())
            .unwrap();
        assert_eq!((geometry.start_x, geometry.end_x, geometry.center_y), (80.0, 140.0, 75.0));
        assert!(scene.reroute(0));
        assert_eq!(scene.arrows[0].path.end(), Point::new(80.0, 75.0));
    }
}
