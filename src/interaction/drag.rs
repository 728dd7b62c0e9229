//! Drag-to-reschedule gestures.
//!
//! A gesture snapshots every bar and arrow it may touch when it starts.
//! Updates always compute from that snapshot plus the total pointer delta, so
//! the live geometry never accumulates rounding, and a cancel restores the
//! snapshot exactly.

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::layout::{route, Arrow, ArrowPath, Bar, BarSpan, Point, RouteKind, Scene};
use crate::model::{Anchor, CollapseKey, DateChange, RelationType, TimelineViewport};
use crate::render::SceneUpdate;

/// What the pointer went down on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    ResizeHandle { key: CollapseKey, edge: Anchor },
    BarBody { key: CollapseKey },
    LinkHandle { key: CollapseKey, anchor: Anchor },
}

impl PointerTarget {
    pub fn key(&self) -> &CollapseKey {
        match self {
            PointerTarget::ResizeHandle { key, .. }
            | PointerTarget::BarBody { key }
            | PointerTarget::LinkHandle { key, .. } => key,
        }
    }
}

/// Classify a point against the visible draggable bars.
///
/// Resize handles cover `handle` pixels either side of a defined edge; link
/// handles sit just outside the bar, between one and three handle widths off
/// each edge.
pub fn hit_test(scene: &Scene, point: Point, handle: f32) -> Option<PointerTarget> {
    let half = scene.route_style.bar_half_height;
    let mut hits: Vec<&Bar> = scene
        .bars
        .values()
        .filter(|bar| bar.visible && bar.is_draggable())
        .filter(|bar| (point.y - bar.geometry.center_y).abs() <= half)
        .collect();
    hits.sort_by(|a, b| a.key.cmp(&b.key));

    for bar in hits {
        let g = &bar.geometry;
        let key = bar.key.clone();
        for edge in [Anchor::End, Anchor::Start] {
            if bar.has_edge(edge) && (point.x - g.anchor_x(edge)).abs() <= handle {
                return Some(PointerTarget::ResizeHandle { key, edge });
            }
        }
        if point.x > g.start_x && point.x < g.end_x {
            return Some(PointerTarget::BarBody { key });
        }
        let outside_end = point.x - g.end_x;
        if outside_end > handle && outside_end <= 3.0 * handle {
            return Some(PointerTarget::LinkHandle {
                key,
                anchor: Anchor::End,
            });
        }
        let outside_start = g.start_x - point.x;
        if outside_start > handle && outside_start <= 3.0 * handle {
            return Some(PointerTarget::LinkHandle {
                key,
                anchor: Anchor::Start,
            });
        }
    }
    None
}

/// Geometry to put back if the gesture is cancelled or rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct DragRestore {
    pub bars: Vec<Bar>,
    pub arrows: Vec<(usize, Arrow)>,
    pub scroll: Point,
}

impl DragRestore {
    fn capture(scene: &Scene, keys: &[CollapseKey], scroll: Point) -> Self {
        let bars = keys
            .iter()
            .filter_map(|key| scene.bars.get(key).cloned())
            .collect();
        let mut indices: Vec<usize> = keys
            .iter()
            .flat_map(|key| scene.arrows_touching(key).iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        let arrows = indices
            .into_iter()
            .filter_map(|i| scene.arrows.get(i).map(|arrow| (i, arrow.clone())))
            .collect();
        Self {
            bars,
            arrows,
            scroll,
        }
    }

    /// Put every captured bar and arrow back. Returns the scroll offset to
    /// restore.
    pub fn restore(&self, scene: &mut Scene, updates: &mut Vec<SceneUpdate>) -> Point {
        for bar in &self.bars {
            updates.push(SceneUpdate::Bar {
                key: bar.key.clone(),
                geometry: bar.geometry,
                label: bar.label.clone(),
                visible: bar.visible,
            });
            scene.bars.insert(bar.key.clone(), bar.clone());
        }
        for (i, arrow) in &self.arrows {
            if let Some(slot) = scene.arrows.get_mut(*i) {
                *slot = arrow.clone();
                updates.push(SceneUpdate::Arrow {
                    index: *i,
                    path: arrow.path.clone(),
                    visible: arrow.visible,
                });
            }
        }
        scene.link_preview = None;
        updates.push(SceneUpdate::LinkPreview(None));
        updates.push(SceneUpdate::Scroll {
            x: self.scroll.x,
            y: self.scroll.y,
        });
        self.scroll
    }
}

/// An in-progress drag. Each variant carries what it needs from the moment
/// the gesture started.
#[derive(Debug, Clone, PartialEq)]
pub enum DragState {
    Resizing {
        edge: Anchor,
        origin: Point,
        restore: DragRestore,
    },
    Moving {
        origin: Point,
        restore: DragRestore,
    },
    BulkMoving {
        origin: Point,
        restore: DragRestore,
    },
    Linking {
        source: CollapseKey,
        source_id: u64,
        anchor: Anchor,
        /// Anchor point on the source bar.
        origin: Point,
        hover: Option<CollapseKey>,
    },
}

/// Why a gesture did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The key has no bar in the scene.
    UnknownBar,
    /// Summary bars follow their children.
    NotDraggable,
    /// The edge has no date behind it.
    UndefinedEdge,
}

/// Outcome of releasing the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum DragFinish {
    /// Nothing changed; geometry already restored.
    Unchanged,
    Dates {
        changes: Vec<DateChange>,
        restore: DragRestore,
    },
    Link {
        from_key: CollapseKey,
        to_key: CollapseKey,
        from_id: u64,
        to_id: u64,
        suggested: RelationType,
    },
    /// Dropped on the source bar or on nothing.
    LinkRejected,
}

impl DragState {
    /// Start a gesture on `target`. `selection` turns a body drag into a bulk
    /// move when the grabbed bar is one of several selected bars.
    pub fn begin(
        scene: &Scene,
        target: &PointerTarget,
        selection: &[CollapseKey],
        pointer: Point,
        scroll: Point,
    ) -> Result<Self, Refusal> {
        let bar = scene.bars.get(target.key()).ok_or(Refusal::UnknownBar)?;
        if !bar.is_draggable() {
            return Err(Refusal::NotDraggable);
        }
        let origin = content_point(pointer, scroll);
        match target {
            PointerTarget::ResizeHandle { key, edge } => {
                if !bar.has_edge(*edge) {
                    return Err(Refusal::UndefinedEdge);
                }
                Ok(DragState::Resizing {
                    edge: *edge,
                    origin,
                    restore: DragRestore::capture(scene, std::slice::from_ref(key), scroll),
                })
            }
            PointerTarget::BarBody { key } => {
                let bulk: Vec<CollapseKey> = selection
                    .iter()
                    .filter(|k| scene.bars.get(*k).is_some_and(Bar::is_draggable))
                    .cloned()
                    .collect();
                if bulk.len() > 1 && bulk.contains(key) {
                    Ok(DragState::BulkMoving {
                        origin,
                        restore: DragRestore::capture(scene, &bulk, scroll),
                    })
                } else {
                    Ok(DragState::Moving {
                        origin,
                        restore: DragRestore::capture(scene, std::slice::from_ref(key), scroll),
                    })
                }
            }
            PointerTarget::LinkHandle { key, anchor } => Ok(DragState::Linking {
                source: key.clone(),
                source_id: bar.node_id,
                anchor: *anchor,
                origin: Point::new(bar.geometry.anchor_x(*anchor), bar.geometry.center_y),
                hover: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DragState::Resizing { .. } => "resizing",
            DragState::Moving { .. } => "moving",
            DragState::BulkMoving { .. } => "bulk-moving",
            DragState::Linking { .. } => "linking",
        }
    }

    pub fn restore(&self) -> Option<&DragRestore> {
        match self {
            DragState::Resizing { restore, .. }
            | DragState::Moving { restore, .. }
            | DragState::BulkMoving { restore, .. } => Some(restore),
            DragState::Linking { .. } => None,
        }
    }

    /// Apply one coalesced pointer position to the live scene.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        viewport: &TimelineViewport,
        pointer: Point,
        scroll: Point,
        updates: &mut Vec<SceneUpdate>,
    ) {
        let current = content_point(pointer, scroll);
        match self {
            DragState::Resizing {
                edge,
                origin,
                restore,
            } => {
                let dx = current.x - origin.x;
                for bar in &restore.bars {
                    let (start, due) = resize_dates(bar, *edge, dx, viewport);
                    place_bar(scene, bar, start, due, viewport, updates);
                }
                reroute_captured(scene, restore, updates);
            }
            DragState::Moving { origin, restore } | DragState::BulkMoving { origin, restore } => {
                let days = viewport.days_for_delta(current.x - origin.x);
                for bar in &restore.bars {
                    let (start, due) = shift_dates(bar, clamp_move_days(bar, days, viewport));
                    place_bar(scene, bar, start, due, viewport, updates);
                }
                reroute_captured(scene, restore, updates);
            }
            DragState::Linking {
                source,
                anchor,
                origin,
                hover,
                ..
            } => {
                let target = scene
                    .bar_at(current, 0.0)
                    .filter(|bar| bar.is_draggable() && bar.key != *source);
                *hover = target.map(|bar| bar.key.clone());
                let (end, to_anchor) = match target {
                    Some(bar) => {
                        let to_anchor = nearest_anchor(bar, current);
                        (
                            Point::new(bar.geometry.anchor_x(to_anchor), bar.geometry.center_y),
                            to_anchor,
                        )
                    }
                    None => (current, Anchor::Start),
                };
                let path = preview_path(scene, *origin, end, *anchor, to_anchor);
                scene.link_preview = Some(path.clone());
                updates.push(SceneUpdate::LinkPreview(Some(path)));
            }
        }
    }

    /// Release the pointer. Date gestures report their changes against the
    /// pre-drag dates; unchanged drags are restored here.
    pub fn finish(
        self,
        scene: &mut Scene,
        pointer: Point,
        scroll: Point,
        updates: &mut Vec<SceneUpdate>,
    ) -> DragFinish {
        match self {
            DragState::Resizing { restore, .. }
            | DragState::Moving { restore, .. }
            | DragState::BulkMoving { restore, .. } => {
                let changes: Vec<DateChange> = restore
                    .bars
                    .iter()
                    .filter_map(|before| {
                        let after = scene.bars.get(&before.key)?;
                        let change = DateChange {
                            node_id: before.node_id,
                            old_start: before.start,
                            old_due: before.due,
                            new_start: after.start,
                            new_due: after.due,
                        };
                        (!change.is_noop()).then_some(change)
                    })
                    .collect();
                if changes.is_empty() {
                    restore.restore(scene, updates);
                    DragFinish::Unchanged
                } else {
                    DragFinish::Dates { changes, restore }
                }
            }
            DragState::Linking {
                source,
                source_id,
                anchor,
                ..
            } => {
                scene.link_preview = None;
                updates.push(SceneUpdate::LinkPreview(None));
                let current = content_point(pointer, scroll);
                let Some(target) = scene.bar_at(current, 0.0) else {
                    return DragFinish::LinkRejected;
                };
                if target.key == source || !target.is_draggable() {
                    return DragFinish::LinkRejected;
                }
                let to_anchor = nearest_anchor(target, current);
                DragFinish::Link {
                    from_key: source,
                    to_key: target.key.clone(),
                    from_id: source_id,
                    to_id: target.node_id,
                    suggested: RelationType::infer(anchor, to_anchor),
                }
            }
        }
    }
}

/// A pending commit waiting for the user.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingCommit {
    Dates {
        changes: Vec<DateChange>,
        restore: DragRestore,
    },
    Relation {
        from_key: CollapseKey,
        to_key: CollapseKey,
        from_id: u64,
        to_id: u64,
        suggested: RelationType,
    },
}

/// Gesture state of a session. Only one gesture runs at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging(DragState),
    Confirming(PendingCommit),
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Dragging(drag) => drag.name(),
            Gesture::Confirming(_) => "confirming",
        }
    }
}

/// What a pointer, confirmation or cancel call did.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// A drag or link gesture started.
    Started,
    /// Refused: another gesture is active, or the target cannot be dragged.
    Refused,
    /// Nothing to act on.
    Ignored,
    /// Live geometry was updated.
    Updated,
    /// Released without a date change; geometry restored.
    Reverted,
    /// The user has to confirm the dates or pick a relation type.
    AwaitingConfirmation,
    /// Sent to the host.
    Committed(Uuid),
    /// Committed in draft mode; not sent yet.
    Queued(Uuid),
    /// Cancelled; geometry restored.
    Cancelled,
    /// Link dropped on its own bar or on nothing.
    Rejected,
}

fn content_point(pointer: Point, scroll: Point) -> Point {
    Point::new(pointer.x + scroll.x, pointer.y + scroll.y)
}

fn day() -> Duration {
    Duration::days(1)
}

/// Dates after dragging `edge` by `delta_x` pixels. The edge is clamped to
/// the timeline, kept at least a day from the opposite edge and snapped.
pub fn resize_dates(
    bar: &Bar,
    edge: Anchor,
    delta_x: f32,
    viewport: &TimelineViewport,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let ppd = viewport.pixels_per_day;
    let width = viewport.total_width();
    match (bar.span, bar.start, bar.due) {
        (BarSpan::Full, Some(start), Some(due)) => match edge {
            Anchor::Start => {
                let limit = viewport.date_to_x(due + day()) - ppd;
                let x = (viewport.date_to_x(start) + delta_x)
                    .clamp(0.0, width)
                    .min(limit);
                (Some(viewport.x_to_date(viewport.snap_x(x))), Some(due))
            }
            Anchor::End => {
                let limit = viewport.date_to_x(start) + ppd;
                let x = (viewport.date_to_x(due + day()) + delta_x)
                    .clamp(0.0, width)
                    .max(limit);
                (Some(start), Some(viewport.x_to_date(viewport.snap_x(x)) - day()))
            }
        },
        // Open-ended: the defined edge slides on its own.
        _ => shift_dates(
            bar,
            clamp_move_days(bar, viewport.days_for_delta(delta_x), viewport),
        ),
    }
}

/// Clamp a day delta so the bar stays inside the viewport range. A bar that
/// already sticks out is not pulled back in.
pub fn clamp_move_days(bar: &Bar, days: i64, viewport: &TimelineViewport) -> i64 {
    let first = bar.start.or(bar.due);
    let last = bar.due.or(bar.start);
    let (Some(first), Some(last)) = (first, last) else {
        return 0;
    };
    let lowest = (viewport.start - first).num_days().min(0);
    let highest = (viewport.end - last).num_days().max(0);
    days.max(lowest).min(highest)
}

/// Shift the defined dates of a bar by `days`.
pub fn shift_dates(bar: &Bar, days: i64) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let delta = Duration::days(days);
    (bar.start.map(|d| d + delta), bar.due.map(|d| d + delta))
}

/// Which edge of `bar` is closer to the pointer.
fn nearest_anchor(bar: &Bar, point: Point) -> Anchor {
    if point.x < bar.geometry.center().x {
        Anchor::Start
    } else {
        Anchor::End
    }
}

fn place_bar(
    scene: &mut Scene,
    before: &Bar,
    start: Option<NaiveDate>,
    due: Option<NaiveDate>,
    viewport: &TimelineViewport,
    updates: &mut Vec<SceneUpdate>,
) {
    let current = scene.bars.get(&before.key).map(|bar| (bar.start, bar.due));
    if current == Some((start, due)) {
        return;
    }
    if scene.apply_dates(&before.key, start, due, viewport).is_none() {
        return;
    }
    if let Some(bar) = scene.bars.get(&before.key) {
        tracing::trace!("drag {} -> {:?}..{:?}", bar.key, start, due);
        updates.push(SceneUpdate::Bar {
            key: bar.key.clone(),
            geometry: bar.geometry,
            label: bar.label.clone(),
            visible: bar.visible,
        });
    }
}

fn reroute_captured(scene: &mut Scene, restore: &DragRestore, updates: &mut Vec<SceneUpdate>) {
    for (i, _) in &restore.arrows {
        if scene.reroute(*i) {
            let arrow = &scene.arrows[*i];
            updates.push(SceneUpdate::Arrow {
                index: *i,
                path: arrow.path.clone(),
                visible: arrow.visible,
            });
        }
    }
}

fn preview_path(scene: &Scene, from: Point, to: Point, from_anchor: Anchor, to_anchor: Anchor) -> ArrowPath {
    route(
        from,
        to,
        RouteKind::Scheduling {
            from: from_anchor,
            to: to_anchor,
        },
        &scene.route_style,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use crate::layout::{flatten, Layout};
    use crate::model::{CollapseState, Node, NodeKind, Relation};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn viewport() -> TimelineViewport {
        TimelineViewport::new(date(1), date(30), 10.0)
    }

    fn scene() -> Scene {
        let nodes = vec![Node::new(NodeKind::Project, 1, "Web").with_children(vec![
            Node::issue(10, "Design", date(2), date(5)).with_relation(Relation {
                id: 7,
                from: 10,
                to: 11,
                kind: RelationType::Precedes,
                delay: None,
            }),
            Node::issue(11, "Build", date(8), date(12)),
            Node::new(NodeKind::Issue, 12, "Someday").with_dates(Some(date(20)), None),
        ])];
        let config = TimelineConfig::default();
        let layout = Layout::build(flatten(&nodes, &CollapseState::new()), &config.layout);
        Scene::generate(&layout, &viewport(), &config, date(1))
    }

    fn bar<'a>(scene: &'a Scene, key: &str) -> &'a Bar {
        &scene.bars[&CollapseKey::from(key)]
    }

    fn origin() -> Point {
        Point::default()
    }

    #[test]
    fn hit_test_finds_handles_body_and_link_handles() {
        let scene = scene();
        let g = bar(&scene, "issue-10").geometry;
        let y = g.center_y;
        assert_eq!(
            hit_test(&scene, Point::new(g.end_x + 1.0, y), 5.0),
            Some(PointerTarget::ResizeHandle {
                key: "issue-10".into(),
                edge: Anchor::End
            })
        );
        assert_eq!(
            hit_test(&scene, Point::new(g.start_x + 15.0, y), 5.0),
            Some(PointerTarget::BarBody {
                key: "issue-10".into()
            })
        );
        assert_eq!(
            hit_test(&scene, Point::new(g.end_x + 10.0, y), 5.0),
            Some(PointerTarget::LinkHandle {
                key: "issue-10".into(),
                anchor: Anchor::End
            })
        );
        // The project summary bar is never a drag target.
        let summary = bar(&scene, "project-1").geometry;
        assert_eq!(
            hit_test(&scene, Point::new(summary.start_x + 20.0, summary.center_y), 5.0),
            None
        );
    }

    #[test]
    fn right_edge_drag_moves_only_due_date() {
        let mut scene = scene();
        let target = PointerTarget::ResizeHandle {
            key: "issue-10".into(),
            edge: Anchor::End,
        };
        let start_x = bar(&scene, "issue-10").geometry.end_x;
        let mut drag = DragState::begin(&scene, &target, &[], Point::new(start_x, 0.0), origin()).unwrap();
        let mut updates = Vec::new();
        drag.update(&mut scene, &viewport(), Point::new(start_x + 31.0, 0.0), origin(), &mut updates);
        let moved = bar(&scene, "issue-10");
        assert_eq!(moved.start, Some(date(2)));
        assert_eq!(moved.due, Some(date(8)));
        assert!(updates.iter().any(|u| matches!(u, SceneUpdate::Arrow { index: 0, .. })));
        assert_eq!(scene.arrows[0].path.start().x, moved.geometry.end_x);

        match drag.finish(&mut scene, Point::new(start_x + 31.0, 0.0), origin(), &mut updates) {
            DragFinish::Dates { changes, .. } => {
                assert_eq!(changes.len(), 1);
                assert_eq!(changes[0].old_due, Some(date(5)));
                assert_eq!(changes[0].new_due, Some(date(8)));
                assert_eq!(changes[0].new_start, Some(date(2)));
            }
            other => panic!("unexpected finish {:?}", other),
        }
    }

    #[test]
    fn resize_never_crosses_the_opposite_edge() {
        let scene = scene();
        let b = bar(&scene, "issue-10");
        assert_eq!(
            resize_dates(b, Anchor::End, -500.0, &viewport()),
            (Some(date(2)), Some(date(2)))
        );
        assert_eq!(
            resize_dates(b, Anchor::Start, 500.0, &viewport()),
            (Some(date(5)), Some(date(5)))
        );
        // Clamped to the timeline on the left.
        assert_eq!(
            resize_dates(b, Anchor::Start, -500.0, &viewport()),
            (Some(date(1)), Some(date(5)))
        );
    }

    #[test]
    fn move_is_clamped_to_the_visible_range() {
        let scene = scene();
        let b = bar(&scene, "issue-11");
        assert_eq!(clamp_move_days(b, 100, &viewport()), 18);
        assert_eq!(clamp_move_days(b, -100, &viewport()), -7);
        assert_eq!(clamp_move_days(b, 3, &viewport()), 3);
    }

    #[test]
    fn open_ended_bar_moves_only_its_defined_date() {
        let scene = scene();
        let b = bar(&scene, "issue-12");
        assert_eq!(shift_dates(b, 2), (Some(date(22)), None));
        let target = PointerTarget::ResizeHandle {
            key: "issue-12".into(),
            edge: Anchor::End,
        };
        assert_eq!(
            DragState::begin(&scene, &target, &[], origin(), origin()),
            Err(Refusal::UndefinedEdge)
        );
    }

    #[test]
    fn bulk_move_clamps_each_bar_independently() {
        let mut scene = scene();
        let selection: Vec<CollapseKey> = vec!["issue-10".into(), "issue-11".into()];
        let target = PointerTarget::BarBody {
            key: "issue-10".into(),
        };
        let mut drag = DragState::begin(&scene, &target, &selection, origin(), origin()).unwrap();
        assert_eq!(drag.name(), "bulk-moving");
        drag.update(&mut scene, &viewport(), Point::new(-100.0, 0.0), origin(), &mut Vec::new());
        assert_eq!(bar(&scene, "issue-10").start, Some(date(1)));
        assert_eq!(bar(&scene, "issue-11").start, Some(date(1)));
        assert_eq!(bar(&scene, "issue-11").due, Some(date(5)));
    }

    #[test]
    fn release_without_change_restores_geometry() {
        let mut scene = scene();
        let before = bar(&scene, "issue-10").clone();
        let target = PointerTarget::BarBody {
            key: "issue-10".into(),
        };
        let mut drag = DragState::begin(&scene, &target, &[], origin(), origin()).unwrap();
        drag.update(&mut scene, &viewport(), Point::new(20.0, 0.0), origin(), &mut Vec::new());
        drag.update(&mut scene, &viewport(), Point::new(2.0, 0.0), origin(), &mut Vec::new());
        let finish = drag.finish(&mut scene, Point::new(2.0, 0.0), origin(), &mut Vec::new());
        assert_eq!(finish, DragFinish::Unchanged);
        assert_eq!(bar(&scene, "issue-10"), &before);
    }

    #[test]
    fn scroll_during_drag_counts_towards_the_delta() {
        let mut scene = scene();
        let target = PointerTarget::BarBody {
            key: "issue-11".into(),
        };
        let mut drag = DragState::begin(&scene, &target, &[], origin(), origin()).unwrap();
        drag.update(&mut scene, &viewport(), origin(), Point::new(20.0, 0.0), &mut Vec::new());
        assert_eq!(bar(&scene, "issue-11").start, Some(date(10)));
    }

    #[test]
    fn linking_suggests_relation_from_engaged_anchors() {
        let mut scene = scene();
        let target = PointerTarget::LinkHandle {
            key: "issue-10".into(),
            anchor: Anchor::End,
        };
        let mut drag = DragState::begin(&scene, &target, &[], origin(), origin()).unwrap();
        let build = bar(&scene, "issue-11").geometry;
        let drop = Point::new(build.start_x + 2.0, build.center_y);
        drag.update(&mut scene, &viewport(), drop, origin(), &mut Vec::new());
        assert!(scene.link_preview.is_some());
        match drag.finish(&mut scene, drop, origin(), &mut Vec::new()) {
            DragFinish::Link {
                from_id,
                to_id,
                suggested,
                ..
            } => {
                assert_eq!((from_id, to_id), (10, 11));
                assert_eq!(suggested, RelationType::Precedes);
            }
            other => panic!("unexpected finish {:?}", other),
        }
        assert!(scene.link_preview.is_none());
    }

    #[test]
    fn dropping_a_link_on_its_source_is_rejected() {
        let mut scene = scene();
        let target = PointerTarget::LinkHandle {
            key: "issue-10".into(),
            anchor: Anchor::Start,
        };
        let drag = DragState::begin(&scene, &target, &[], origin(), origin()).unwrap();
        let own = bar(&scene, "issue-10").geometry.center();
        assert_eq!(
            drag.finish(&mut scene, own, origin(), &mut Vec::new()),
            DragFinish::LinkRejected
        );
    }
}
