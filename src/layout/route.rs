//! Dependency arrow routing.
//!
//! [`route`] is a pure function of its inputs. The scene generator and the
//! drag engine both call it, so an arrow re-routed mid-drag is drawn with the
//! exact same template it gets on the next full render.

use std::fmt::Write as _;

use crate::config::{ArrowConfig, BarConfig, LayoutConfig};
use crate::model::Anchor;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Unit vector from `self` towards `other`.
    fn towards(self, other: Point) -> (f32, f32) {
        let len = self.distance(other);
        if len == 0.0 {
            (0.0, 0.0)
        } else {
            ((other.x - self.x) / len, (other.y - self.y) / len)
        }
    }
}

/// How the two ends attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Leaves and enters through the top or bottom of the bars.
    Informational,
    /// Leaves and enters through bar edges.
    Scheduling { from: Anchor, to: Anchor },
}

/// Which routing template produced a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTemplate {
    Straight,
    /// One vertical run between two horizontal ones.
    Switchback,
    /// Two switchbacks through the gap between rows.
    SCurve,
    /// Out past both edges and back, for opposite-facing anchors.
    Wrap,
    /// Around the bar when both ends are on one row.
    SameRowDetour,
    /// Vertical-first route between rows.
    Vertical,
    /// Up and over for informational links on one row.
    SameRowArc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteStyle {
    pub corner_radius: f32,
    pub jog: f32,
    pub narrow_threshold: f32,
    pub head_size: f32,
    pub bar_half_height: f32,
    /// Offset from a bar centre to the gap between rows.
    pub row_half_height: f32,
}

impl RouteStyle {
    pub fn from_config(arrows: &ArrowConfig, bars: &BarConfig, layout: &LayoutConfig) -> Self {
        Self {
            corner_radius: arrows.corner_radius,
            jog: arrows.jog,
            narrow_threshold: arrows.narrow_threshold,
            head_size: arrows.head_size,
            bar_half_height: bars.bar_height / 2.0,
            row_half_height: layout.row_height / 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowPath {
    pub template: RouteTemplate,
    /// Polyline before corner rounding.
    pub points: Vec<Point>,
    /// SVG path data with rounded corners.
    pub d: String,
    /// Chevron: wing, tip, wing.
    pub head: [Point; 3],
}

impl ArrowPath {
    pub fn start(&self) -> Point {
        self.points.first().copied().unwrap_or_default()
    }

    pub fn end(&self) -> Point {
        self.points.last().copied().unwrap_or_default()
    }
}

/// Route an arrow from `from` to `to`.
///
/// For scheduling relations the points are the anchor edges at bar centre
/// height and the path starts and ends exactly there. For informational
/// relations they are bar centres; the path leaves through the bar's top or
/// bottom edge.
pub fn route(from: Point, to: Point, kind: RouteKind, style: &RouteStyle) -> ArrowPath {
    let (template, points) = match kind {
        RouteKind::Scheduling {
            from: from_anchor,
            to: to_anchor,
        } => scheduling_points(from, to, from_anchor, to_anchor, style),
        RouteKind::Informational => informational_points(from, to, style),
    };
    let points = simplify(points);
    let d = path_data(&points, style.corner_radius);
    let head = chevron(&points, style.head_size);
    ArrowPath {
        template,
        points,
        d,
        head,
    }
}

/// +1 when leaving to the right.
fn exit_direction(anchor: Anchor) -> f32 {
    match anchor {
        Anchor::End => 1.0,
        Anchor::Start => -1.0,
    }
}

/// +1 when the final segment travels right.
fn approach_direction(anchor: Anchor) -> f32 {
    match anchor {
        Anchor::Start => 1.0,
        Anchor::End => -1.0,
    }
}

fn scheduling_points(
    from: Point,
    to: Point,
    from_anchor: Anchor,
    to_anchor: Anchor,
    style: &RouteStyle,
) -> (RouteTemplate, Vec<Point>) {
    let d1 = exit_direction(from_anchor);
    let d2 = approach_direction(to_anchor);
    let dy = to.y - from.y;
    let exit_x = from.x + d1 * style.jog;
    let approach_x = to.x - d2 * style.jog;

    if dy.abs() < 0.5 {
        if d1 == d2 && (to.x - from.x) * d1 >= 0.0 {
            return (RouteTemplate::Straight, vec![from, to]);
        }
        let below = from.y + style.row_half_height;
        return (
            RouteTemplate::SameRowDetour,
            vec![
                from,
                Point::new(exit_x, from.y),
                Point::new(exit_x, below),
                Point::new(approach_x, below),
                Point::new(approach_x, to.y),
                to,
            ],
        );
    }

    if d1 != d2 {
        let turn_x = if d1 > 0.0 {
            exit_x.max(approach_x)
        } else {
            exit_x.min(approach_x)
        };
        return (
            RouteTemplate::Wrap,
            vec![
                from,
                Point::new(turn_x, from.y),
                Point::new(turn_x, to.y),
                to,
            ],
        );
    }

    let room = (to.x - from.x) * d1;
    if room >= style.narrow_threshold {
        return (
            RouteTemplate::Switchback,
            vec![
                from,
                Point::new(exit_x, from.y),
                Point::new(exit_x, to.y),
                to,
            ],
        );
    }

    let gap_y = from.y + dy.signum() * style.row_half_height;
    (
        RouteTemplate::SCurve,
        vec![
            from,
            Point::new(exit_x, from.y),
            Point::new(exit_x, gap_y),
            Point::new(approach_x, gap_y),
            Point::new(approach_x, to.y),
            to,
        ],
    )
}

fn informational_points(from: Point, to: Point, style: &RouteStyle) -> (RouteTemplate, Vec<Point>) {
    let dy = to.y - from.y;
    let half = style.bar_half_height;
    if dy.abs() < 0.5 {
        let top = from.y - half - style.jog;
        return (
            RouteTemplate::SameRowArc,
            vec![
                Point::new(from.x, from.y - half),
                Point::new(from.x, top),
                Point::new(to.x, top),
                Point::new(to.x, to.y - half),
            ],
        );
    }
    let s = dy.signum();
    let start_y = from.y + s * half;
    let end_y = to.y - s * half;
    let mid_y = (start_y + end_y) / 2.0;
    (
        RouteTemplate::Vertical,
        vec![
            Point::new(from.x, start_y),
            Point::new(from.x, mid_y),
            Point::new(to.x, mid_y),
            Point::new(to.x, end_y),
        ],
    )
}

/// Drop repeated points and interior points on a straight run.
fn simplify(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let cross = (b.x - a.x) * (p.y - b.y) - (b.y - a.y) * (p.x - b.x);
            let forward = (b.x - a.x) * (p.x - b.x) + (b.y - a.y) * (p.y - b.y);
            if cross == 0.0 && forward >= 0.0 {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

fn path_data(points: &[Point], radius: f32) -> String {
    let mut d = String::new();
    let Some(first) = points.first() else {
        return d;
    };
    let _ = write!(d, "M {:.1} {:.1}", first.x, first.y);
    for i in 1..points.len().saturating_sub(1) {
        let (prev, corner, next) = (points[i - 1], points[i], points[i + 1]);
        let r = radius
            .min(prev.distance(corner) / 2.0)
            .min(corner.distance(next) / 2.0);
        let (ix, iy) = prev.towards(corner);
        let (ox, oy) = corner.towards(next);
        let _ = write!(
            d,
            " L {:.1} {:.1} Q {:.1} {:.1} {:.1} {:.1}",
            corner.x - ix * r,
            corner.y - iy * r,
            corner.x,
            corner.y,
            corner.x + ox * r,
            corner.y + oy * r
        );
    }
    if let Some(last) = points.get(1..).and_then(|rest| rest.last()) {
        let _ = write!(d, " L {:.1} {:.1}", last.x, last.y);
    }
    d
}

fn chevron(points: &[Point], size: f32) -> [Point; 3] {
    let tip = points.last().copied().unwrap_or_default();
    let prev = points
        .iter()
        .rev()
        .find(|p| **p != tip)
        .copied()
        .unwrap_or(Point::new(tip.x - 1.0, tip.y));
    let (dx, dy) = prev.towards(tip);
    let back = Point::new(tip.x - dx * size, tip.y - dy * size);
    let spread = size * 0.8;
    [
        Point::new(back.x - dy * spread, back.y + dx * spread),
        tip,
        Point::new(back.x + dy * spread, back.y - dx * spread),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> RouteStyle {
        RouteStyle {
            corner_radius: 4.0,
            jog: 10.0,
            narrow_threshold: 20.0,
            head_size: 5.0,
            bar_half_height: 10.0,
            row_half_height: 15.0,
        }
    }

    const FS: RouteKind = RouteKind::Scheduling {
        from: Anchor::End,
        to: Anchor::Start,
    };

    #[test]
    fn finish_to_start_on_one_row_is_straight() {
        let path = route(Point::new(100.0, 15.0), Point::new(160.0, 15.0), FS, &style());
        assert_eq!(path.template, RouteTemplate::Straight);
        assert_eq!(path.d, "M 100.0 15.0 L 160.0 15.0");
        assert_eq!(path.head[1], Point::new(160.0, 15.0));
        assert!(path.head[0].x < 160.0 && path.head[2].x < 160.0);
    }

    #[test]
    fn finish_to_start_with_room_uses_one_switchback() {
        let path = route(Point::new(100.0, 15.0), Point::new(200.0, 75.0), FS, &style());
        assert_eq!(path.template, RouteTemplate::Switchback);
        assert_eq!(
            path.points,
            vec![
                Point::new(100.0, 15.0),
                Point::new(110.0, 15.0),
                Point::new(110.0, 75.0),
                Point::new(200.0, 75.0),
            ]
        );
    }

    #[test]
    fn narrow_gap_on_a_row_above_takes_the_s_curve() {
        let path = route(Point::new(100.0, 75.0), Point::new(90.0, 15.0), FS, &style());
        assert_eq!(path.template, RouteTemplate::SCurve);
        assert_eq!(path.points[2], Point::new(110.0, 60.0));
        assert_eq!(path.points[3], Point::new(80.0, 60.0));
        assert_eq!(path.end(), Point::new(90.0, 15.0));
    }

    #[test]
    fn finish_to_finish_wraps_past_the_later_edge() {
        let kind = RouteKind::Scheduling {
            from: Anchor::End,
            to: Anchor::End,
        };
        let path = route(Point::new(100.0, 15.0), Point::new(140.0, 45.0), kind, &style());
        assert_eq!(path.template, RouteTemplate::Wrap);
        assert_eq!(path.points[1], Point::new(150.0, 15.0));
        // Arrowhead points left, into the end edge.
        assert!(path.head[0].x > 140.0);
    }

    #[test]
    fn same_row_backwards_link_detours_below() {
        let path = route(Point::new(200.0, 15.0), Point::new(100.0, 15.0), FS, &style());
        assert_eq!(path.template, RouteTemplate::SameRowDetour);
        assert!(path.points.iter().any(|p| p.y == 30.0));
    }

    #[test]
    fn swapping_anchors_keeps_endpoints() {
        let from = Point::new(120.0, 15.0);
        let to = Point::new(180.0, 105.0);
        let anchors = [Anchor::Start, Anchor::End];
        for a in anchors {
            for b in anchors {
                let path = route(from, to, RouteKind::Scheduling { from: a, to: b }, &style());
                let swapped = route(from, to, RouteKind::Scheduling { from: b, to: a }, &style());
                assert_eq!(path.start(), from);
                assert_eq!(path.end(), to);
                assert_eq!(swapped.start(), from);
                assert_eq!(swapped.end(), to);
            }
        }
    }

    #[test]
    fn routing_is_deterministic() {
        let from = Point::new(37.5, 15.0);
        let to = Point::new(41.25, 135.0);
        let a = route(from, to, FS, &style());
        let b = route(from, to, FS, &style());
        assert_eq!(a, b);
    }

    #[test]
    fn informational_links_leave_through_bottom_when_target_is_below() {
        let path = route(
            Point::new(100.0, 15.0),
            Point::new(150.0, 75.0),
            RouteKind::Informational,
            &style(),
        );
        assert_eq!(path.template, RouteTemplate::Vertical);
        assert_eq!(path.start(), Point::new(100.0, 25.0));
        assert_eq!(path.end(), Point::new(150.0, 65.0));
        // Final approach is downward.
        assert!(path.head[0].y < 65.0);
    }

    #[test]
    fn informational_links_on_one_row_arc_over() {
        let path = route(
            Point::new(100.0, 15.0),
            Point::new(150.0, 15.0),
            RouteKind::Informational,
            &style(),
        );
        assert_eq!(path.template, RouteTemplate::SameRowArc);
        assert_eq!(path.points[1].y, -5.0);
    }

    #[test]
    fn corner_radius_shrinks_on_short_segments() {
        let path = route(Point::new(0.0, 15.0), Point::new(300.0, 19.0), FS, &style());
        // 4px vertical run leaves room for a 2px radius only.
        assert!(path.d.contains("L 10.0 17.0"));
    }

    #[test]
    fn vertical_link_between_aligned_bars_collapses_to_a_line() {
        let path = route(
            Point::new(100.0, 15.0),
            Point::new(100.0, 75.0),
            RouteKind::Informational,
            &style(),
        );
        assert_eq!(path.points.len(), 2);
    }
}
