//! In-place collapse/expand.
//!
//! A toggle never regenerates the scene. Rows, bars, shade bands, indent
//! guides and arrows already exist for hidden nodes; the updater flips their
//! visibility, moves the subtree into place and shifts everything below by
//! the delta.

use std::collections::BTreeSet;

use crate::model::{CollapseKey, ToggleDirection};
use crate::render::SceneUpdate;

use super::positioning::Layout;
use super::scene::{BarGeometry, Scene};

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToggleOutcome {
    Applied { expanded: bool, delta: f32 },
    /// Leaf row, or the row is already in the requested state.
    NoOp,
    /// The indices disagree with the request; rebuild from scratch.
    RefreshRequired,
}

/// Rows that become visible when `index` expands: descendants whose whole
/// ancestor chain up to `index` is expanded.
fn opening_rows(layout: &Layout, index: usize) -> Vec<usize> {
    let range = layout.rows[index].descendants(index);
    let mut rows = Vec::new();
    let mut i = range.start;
    while i < range.end {
        rows.push(i);
        let row = &layout.rows[i];
        i += if row.has_children && !row.is_expanded {
            row.subtree_len + 1
        } else {
            1
        };
    }
    rows
}

/// Currently visible descendants of `index`; all of them hide on collapse.
fn closing_rows(layout: &Layout, index: usize) -> Vec<usize> {
    layout.rows[index]
        .descendants(index)
        .filter(|&i| layout.rows[i].is_visible)
        .collect()
}

/// Sum the band contributions of `rows`, as recorded before the toggle.
fn contributed_height(layout: &Layout, rows: &[usize], expanding: bool) -> f32 {
    rows.iter()
        .map(|&i| {
            let row = &layout.rows[i];
            let band = &layout.bands[layout.band_of_row[i]];
            let current = band.contributions.get(&row.collapse_key).unwrap_or(0.0);
            if expanding {
                row.height - current
            } else {
                current
            }
        })
        .sum()
}

/// Expand, collapse or flip the row at `key`, updating layout and scene in
/// place and recording every change in `updates`.
pub fn toggle(
    layout: &mut Layout,
    scene: &mut Scene,
    key: &CollapseKey,
    direction: ToggleDirection,
    updates: &mut Vec<SceneUpdate>,
) -> ToggleOutcome {
    let Some(index) = layout.index_of(key) else {
        tracing::warn!("toggle for unknown row {}", key);
        return ToggleOutcome::RefreshRequired;
    };
    let target = &layout.rows[index];
    if !target.has_children {
        return ToggleOutcome::NoOp;
    }
    let Some(expanded) = direction.resolve(target.is_expanded) else {
        return ToggleOutcome::NoOp;
    };

    if !target.is_visible {
        // Under a collapsed ancestor: only the flag changes.
        layout.rows[index].is_expanded = expanded;
        tracing::debug!("toggled hidden row {} to expanded={}", key, expanded);
        return ToggleOutcome::Applied {
            expanded,
            delta: 0.0,
        };
    }

    let changed = if expanded {
        opening_rows(layout, index)
    } else {
        closing_rows(layout, index)
    };
    let delta = contributed_height(layout, &changed, expanded);
    if delta == 0.0 {
        tracing::warn!(
            "toggle of {} produced no height change for {} descendants, falling back to full refresh",
            key,
            target.subtree_len
        );
        return ToggleOutcome::RefreshRequired;
    }
    let signed = if expanded { delta } else { -delta };

    layout.rows[index].is_expanded = expanded;
    let subtree = layout.rows[index].descendants(index);
    let mut moved: BTreeSet<usize> = BTreeSet::new();

    // Descendants: lay out sequentially below the target's current position.
    let mut cursor = layout.rows[index].bottom();
    let opened: BTreeSet<usize> = if expanded {
        changed.iter().copied().collect()
    } else {
        BTreeSet::new()
    };
    for i in subtree.clone() {
        let row = &mut layout.rows[i];
        let visible = opened.contains(&i);
        if row.current_y != cursor || row.is_visible != visible {
            moved.insert(i);
        }
        row.current_y = cursor;
        row.is_visible = visible;
        if visible {
            cursor += row.height;
        }
    }

    // Everything after the subtree shifts by the delta.
    for i in subtree.end..layout.rows.len() {
        layout.rows[i].current_y += signed;
        moved.insert(i);
    }
    layout.content_height += signed;

    for &i in &moved {
        sync_row(layout, scene, i, updates);
    }

    update_bands(layout, index, &changed, signed, updates);
    update_guides(layout, index, signed, updates);

    let mut arrows: BTreeSet<usize> = BTreeSet::new();
    for &i in &moved {
        arrows.extend(scene.arrows_touching(&layout.rows[i].collapse_key).iter().copied());
    }
    for a in arrows {
        if scene.reroute(a) {
            let arrow = &scene.arrows[a];
            updates.push(SceneUpdate::Arrow {
                index: a,
                path: arrow.path.clone(),
                visible: arrow.visible,
            });
        }
    }

    tracing::debug!(
        "toggled {} to expanded={} ({} rows, delta {})",
        key,
        expanded,
        changed.len(),
        delta
    );
    ToggleOutcome::Applied { expanded, delta }
}

/// Push a row's position and visibility into its bar and emit both.
fn sync_row(layout: &Layout, scene: &mut Scene, i: usize, updates: &mut Vec<SceneUpdate>) {
    let row = &layout.rows[i];
    updates.push(SceneUpdate::Row {
        key: row.collapse_key.clone(),
        y: row.current_y,
        visible: row.is_visible,
    });
    let Some(bar) = scene.bars.get(&row.collapse_key) else {
        return;
    };
    let geometry = BarGeometry {
        center_y: row.current_y + row.height / 2.0,
        ..bar.geometry
    };
    scene.set_bar_geometry(&row.collapse_key, geometry);
    if let Some(bar) = scene.bars.get_mut(&row.collapse_key) {
        bar.visible = row.is_visible;
        updates.push(SceneUpdate::Bar {
            key: row.collapse_key.clone(),
            geometry: bar.geometry,
            label: bar.label.clone(),
            visible: bar.visible,
        });
    }
}

fn update_bands(
    layout: &mut Layout,
    index: usize,
    changed: &[usize],
    signed: f32,
    updates: &mut Vec<SceneUpdate>,
) {
    let subtree_end = index + layout.rows[index].subtree_len;
    let expanding = signed > 0.0;
    let first_band = layout.band_of_row[index];
    let mut touched: BTreeSet<usize> = BTreeSet::new();

    for &i in changed {
        let b = layout.band_of_row[i];
        let height = if expanding { layout.rows[i].height } else { 0.0 };
        let key = layout.rows[i].collapse_key.clone();
        let band = &mut layout.bands[b];
        if let Some(diff) = band.contributions.set(&key, height) {
            band.height += diff;
        }
        touched.insert(b);
    }

    for b in first_band..layout.bands.len() {
        let first_row = layout.bands[b].first_row;
        if first_row > subtree_end {
            layout.bands[b].y += signed;
            touched.insert(b);
        } else if first_row > index && layout.bands[b].last_row <= subtree_end {
            // Wholly inside the toggled subtree.
            let band = &mut layout.bands[b];
            band.visible = band.height > 0.0;
            band.y = layout.rows[first_row].current_y;
            touched.insert(b);
        } else if touched.contains(&b) {
            let band = &mut layout.bands[b];
            band.visible = band.height > 0.0;
        }
    }

    let before: Vec<bool> = layout.bands.iter().map(|band| band.odd).collect();
    layout.realternate_bands();
    for (b, band) in layout.bands.iter().enumerate() {
        if band.odd != before[b] {
            touched.insert(b);
        }
    }

    for b in touched {
        let band = &layout.bands[b];
        updates.push(SceneUpdate::Band {
            index: b,
            y: band.y,
            height: band.height,
            visible: band.visible,
            odd: band.odd,
        });
    }
}

fn update_guides(layout: &mut Layout, index: usize, signed: f32, updates: &mut Vec<SceneUpdate>) {
    let subtree_end = index + layout.rows[index].subtree_len;
    let mut touched: Vec<usize> = Vec::new();

    // Ancestors stretch or shrink by the delta.
    let mut parent = layout.rows[index].parent_key.clone();
    while let Some(key) = parent {
        let Some(p) = layout.index_of(&key) else {
            break;
        };
        if let Some(&g) = layout.guide_of_row.get(&p) {
            layout.guides[g].y_bottom += signed;
            touched.push(g);
        }
        parent = layout.rows[p].parent_key.clone();
    }

    let start = layout.guides.partition_point(|guide| guide.row < index);
    for g in start..layout.guides.len() {
        let row_index = layout.guides[g].row;
        if row_index > subtree_end {
            let guide = &mut layout.guides[g];
            guide.y_top += signed;
            guide.y_bottom += signed;
        } else {
            let row = &layout.rows[row_index];
            let y_top = row.bottom();
            let visible = row.is_visible && row.is_expanded;
            let extent = layout.visible_extent(row_index);
            let guide = &mut layout.guides[g];
            guide.y_top = y_top;
            guide.y_bottom = y_top + extent;
            guide.visible = visible;
        }
        touched.push(g);
    }

    for g in touched {
        let guide = &layout.guides[g];
        updates.push(SceneUpdate::Guide {
            index: g,
            y_top: guide.y_top,
            y_bottom: guide.y_bottom,
            visible: guide.visible,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use crate::layout::flatten::flatten;
    use crate::model::{CollapseState, Node, NodeKind, Relation, RelationType};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn forest() -> Vec<Node> {
        vec![
            Node::new(NodeKind::TimeGroup, 1, "This week").with_children(vec![
                Node::new(NodeKind::Project, 10, "Web").with_children(vec![
                    Node::issue(100, "Login", date(1), date(3)).with_children(vec![
                        Node::issue(101, "Form", date(2), date(3)),
                        Node::issue(102, "Captcha", date(3), date(4)),
                    ]),
                    Node::issue(103, "Logout", date(4), date(6)).with_relation(Relation {
                        id: 1,
                        from: 103,
                        to: 110,
                        kind: RelationType::Precedes,
                        delay: None,
                    }),
                ]),
            ]),
            Node::new(NodeKind::Project, 11, "Api")
                .with_children(vec![Node::issue(110, "Auth", date(8), date(9))]),
        ]
    }

    fn build(state: &CollapseState) -> (Layout, Scene) {
        let config = TimelineConfig::default();
        let viewport = crate::model::TimelineViewport::new(date(1), date(30), 10.0);
        let layout = Layout::build(flatten(&forest(), state), &config.layout);
        let scene = Scene::generate(&layout, &viewport, &config, date(1));
        (layout, scene)
    }

    fn snapshot(layout: &Layout) -> Vec<(f32, bool)> {
        layout.rows.iter().map(|r| (r.current_y, r.is_visible)).collect()
    }

    #[test]
    fn collapse_hides_subtree_and_shifts_rows_below() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        let mut updates = Vec::new();
        let outcome = toggle(
            &mut layout,
            &mut scene,
            &"project-10".into(),
            ToggleDirection::Collapse,
            &mut updates,
        );
        assert_eq!(outcome, ToggleOutcome::Applied { expanded: false, delta: 120.0 });
        let api = layout.row(&"project-11".into()).unwrap();
        assert_eq!(api.current_y, 56.0);
        assert_eq!(api.original_y, 176.0);
        assert!(layout.rows[2..6].iter().all(|r| !r.is_visible && r.current_y == 56.0));
        assert!(!scene.arrows[0].visible);
        assert_eq!(layout.content_height, 116.0);
    }

    #[test]
    fn expand_then_collapse_is_exact_inverse() {
        let mut state = CollapseState::new();
        state.set("project-10".into(), false);
        let (mut layout, mut scene) = build(&state);
        let before = snapshot(&layout);
        let bands_before = layout.bands.clone();
        let guides_before = layout.guides.clone();
        let arrows_before = scene.arrows.clone();
        let mut updates = Vec::new();
        let key: CollapseKey = "project-10".into();
        toggle(&mut layout, &mut scene, &key, ToggleDirection::Expand, &mut updates);
        assert_ne!(snapshot(&layout), before);
        toggle(&mut layout, &mut scene, &key, ToggleDirection::Collapse, &mut updates);
        assert_eq!(snapshot(&layout), before);
        assert_eq!(layout.bands, bands_before);
        assert_eq!(layout.guides, guides_before);
        assert_eq!(scene.arrows, arrows_before);
    }

    #[test]
    fn expand_respects_nested_collapsed_rows() {
        let mut state = CollapseState::new();
        state.set("issue-100".into(), false);
        state.set("group-1".into(), false);
        let (mut layout, mut scene) = build(&state);
        let mut updates = Vec::new();
        let outcome = toggle(
            &mut layout,
            &mut scene,
            &"group-1".into(),
            ToggleDirection::Expand,
            &mut updates,
        );
        // project-10, issue-100 and issue-103 open; 101/102 stay hidden.
        assert_eq!(outcome, ToggleOutcome::Applied { expanded: true, delta: 90.0 });
        let visible: Vec<bool> = layout.rows.iter().map(|r| r.is_visible).collect();
        assert_eq!(visible, vec![true, true, true, false, false, true, true, true]);
        assert_eq!(layout.rows[5].current_y, 86.0);
        assert_eq!(layout.rows[3].current_y, 86.0);
    }

    #[test]
    fn band_contributions_match_band_height() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        let mut updates = Vec::new();
        for (key, dir) in [
            ("issue-100", ToggleDirection::Collapse),
            ("group-1", ToggleDirection::Collapse),
            ("group-1", ToggleDirection::Expand),
            ("project-11", ToggleDirection::Toggle),
        ] {
            toggle(&mut layout, &mut scene, &key.into(), dir, &mut updates);
            for band in &layout.bands {
                assert_eq!(band.contributions.total(), band.height);
                assert_eq!(band.visible, band.height > 0.0);
            }
        }
    }

    #[test]
    fn bands_inside_collapsed_subtree_hide_and_shading_realternates() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        let shades: Vec<bool> = layout.bands.iter().map(|b| b.odd).collect();
        assert_eq!(shades, vec![false, true, false]);
        let mut updates = Vec::new();
        toggle(
            &mut layout,
            &mut scene,
            &"group-1".into(),
            ToggleDirection::Collapse,
            &mut updates,
        );
        assert!(!layout.bands[1].visible);
        assert_eq!(layout.bands[2].y, 26.0);
        assert!(layout.bands[2].odd);
        assert!(updates
            .iter()
            .any(|u| matches!(u, SceneUpdate::Band { index: 2, odd: true, .. })));
    }

    #[test]
    fn guides_follow_the_toggle() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        let mut updates = Vec::new();
        toggle(
            &mut layout,
            &mut scene,
            &"issue-100".into(),
            ToggleDirection::Collapse,
            &mut updates,
        );
        let own = &layout.guides[layout.guide_of_row[&2]];
        assert!(!own.visible);
        let project = &layout.guides[layout.guide_of_row[&1]];
        assert_eq!(project.y_bottom, project.y_top + 60.0);
        let api = &layout.guides[layout.guide_of_row[&6]];
        assert_eq!(api.y_top, 146.0);
    }

    #[test]
    fn leaf_and_repeated_requests_are_no_ops() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        let mut updates = Vec::new();
        let leaf = toggle(
            &mut layout,
            &mut scene,
            &"issue-101".into(),
            ToggleDirection::Toggle,
            &mut updates,
        );
        let already = toggle(
            &mut layout,
            &mut scene,
            &"project-10".into(),
            ToggleDirection::Expand,
            &mut updates,
        );
        assert_eq!(leaf, ToggleOutcome::NoOp);
        assert_eq!(already, ToggleOutcome::NoOp);
        assert!(updates.is_empty());
    }

    #[test]
    fn unknown_key_requests_refresh() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        let outcome = toggle(
            &mut layout,
            &mut scene,
            &"project-999".into(),
            ToggleDirection::Toggle,
            &mut Vec::new(),
        );
        assert_eq!(outcome, ToggleOutcome::RefreshRequired);
    }

    #[test]
    fn zero_delta_with_descendants_requests_refresh() {
        let (mut layout, mut scene) = build(&CollapseState::new());
        // Corrupt the contribution cache for the only child row.
        let i = layout.index_of(&"issue-110".into()).unwrap();
        let b = layout.band_of_row[i];
        layout.bands[b].contributions.set(&"issue-110".into(), 0.0);
        let outcome = toggle(
            &mut layout,
            &mut scene,
            &"project-11".into(),
            ToggleDirection::Collapse,
            &mut Vec::new(),
        );
        assert_eq!(outcome, ToggleOutcome::RefreshRequired);
        assert!(layout.rows[i].is_visible);
    }

    #[test]
    fn hidden_target_only_flips_its_flag() {
        let mut state = CollapseState::new();
        state.set("project-10".into(), false);
        let (mut layout, mut scene) = build(&state);
        let before = snapshot(&layout);
        let mut updates = Vec::new();
        let outcome = toggle(
            &mut layout,
            &mut scene,
            &"issue-100".into(),
            ToggleDirection::Collapse,
            &mut updates,
        );
        assert_eq!(outcome, ToggleOutcome::Applied { expanded: false, delta: 0.0 });
        assert_eq!(snapshot(&layout), before);
        assert!(!layout.rows[2].is_expanded);
    }
}
