use crate::app::GanttApp;
use crate::ui::theme;
use chrono::{Datelike, Duration, NaiveDate};
use egui::{Color32, CursorIcon, Id, Pos2, Rect, Rounding, Sense, Shape, Stroke, Ui, Vec2};
use gantt_timeline::interaction::hit_test;
use gantt_timeline::layout::{ArrowPath, Bar, BarSpan, LabelSide, Point, Scene};
use gantt_timeline::model::{Anchor, NodeKind, TimelineScale, TimelineViewport};
use gantt_timeline::{GestureOutcome, PointerTarget, ToggleDirection};

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const ARROW_HIT_SLACK: f32 = 4.0;

/// Maps between screen positions and scene coordinates for one frame.
#[derive(Debug, Clone, Copy)]
struct ChartSpace {
    /// Screen position of scene (0, 0).
    scene_origin: Pos2,
    scroll: Point,
}

impl ChartSpace {
    fn to_screen(&self, p: Point) -> Pos2 {
        Pos2::new(self.scene_origin.x + p.x, self.scene_origin.y + p.y)
    }

    fn to_scene(&self, pos: Pos2) -> Point {
        Point::new(pos.x - self.scene_origin.x, pos.y - self.scene_origin.y)
    }

    /// Position relative to the visible part of the scene, as the session
    /// expects pointer input.
    fn to_viewport(&self, pos: Pos2) -> Point {
        let p = self.to_scene(pos);
        Point::new(p.x - self.scroll.x, p.y - self.scroll.y)
    }
}

/// Render the Gantt chart area (right panel).
pub fn show_gantt_chart(app: &mut GanttApp, ui: &mut Ui) {
    let available = ui.available_size();

    // Handle zoom with scroll wheel
    let scroll_delta = ui.input(|i| i.smooth_scroll_delta);
    if ui.rect_contains_pointer(ui.max_rect()) && ui.input(|i| i.modifiers.ctrl) {
        if scroll_delta.y > 0.0 {
            app.session.zoom_in();
        } else if scroll_delta.y < 0.0 {
            app.session.zoom_out();
        }
    }

    app.session.frame();

    let scroll_memory = Id::new("chart_scroll");
    let last_offset = ui.ctx().data(|d| d.get_temp::<Vec2>(scroll_memory));
    let wanted = app.session.scroll();
    let mut area = egui::ScrollArea::both()
        .id_salt("gantt_chart")
        .auto_shrink([false, false])
        .drag_to_scroll(false);
    if let Some(last) = last_offset {
        if (last.x - wanted.x).abs() > 0.5 || (last.y - wanted.y).abs() > 0.5 {
            area = area.scroll_offset(Vec2::new(wanted.x, wanted.y));
        }
    }

    area.show_viewport(ui, |ui, visible| {
        ui.ctx().data_mut(|d| d.insert_temp(scroll_memory, visible.min.to_vec2()));
        if (visible.min.x - wanted.x).abs() > 0.5 || (visible.min.y - wanted.y).abs() > 0.5 {
            app.session.set_scroll(visible.min.x, visible.min.y);
        }

        let scene_height = app.session.layout().content_height;
        let width = app.session.scene().width.max(available.x);
        let height = (HEADER_HEIGHT + scene_height + 40.0).max(available.y);
        let (response, painter) =
            ui.allocate_painter(Vec2::new(width, height), Sense::click_and_drag());
        let origin = response.rect.min;
        let frame = ChartSpace {
            scene_origin: origin + Vec2::new(0.0, HEADER_HEIGHT),
            scroll: Point::new(visible.min.x, visible.min.y),
        };
        let view_rect = visible.translate(origin.to_vec2());

        handle_pointer(app, ui, &response, &frame);

        painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
        draw_bands(app, &painter, &frame, view_rect);
        draw_grid(&painter, &frame, app.session.viewport(), view_rect);
        if let Some(x) = app.session.scene().today_x {
            draw_today_line(&painter, &frame, x, view_rect);
        }
        draw_arrows(&painter, &frame, app.session.scene());
        draw_bars(app, &painter, &frame, response.hover_pos());
        if let Some(preview) = &app.session.scene().link_preview {
            draw_path(&painter, &frame, preview, Stroke::new(1.5, theme::ARROW_PREVIEW), false);
        }
        draw_timeline_header(&painter, &frame, app.session.viewport(), view_rect);

        show_bar_tooltip(app, ui, &response, &frame);
        show_arrow_menu(app, ui, &response, &frame);
    });
}

fn handle_pointer(app: &mut GanttApp, ui: &Ui, response: &egui::Response, frame: &ChartSpace) {
    let handle = app.session.config().interaction.handle_width;

    if response.drag_started() {
        if let Some(pos) = ui.input(|i| i.pointer.press_origin()) {
            app.session.pointer_down(frame.to_viewport(pos));
        }
    }
    if response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            app.session.pointer_move(frame.to_viewport(pos));
            ui.ctx().request_repaint();
        }
    }
    if response.drag_stopped() {
        let released = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|i| i.pointer.latest_pos()));
        let outcome = match released {
            Some(pos) => app.session.pointer_up(frame.to_viewport(pos)),
            None => app.session.cancel(),
        };
        match outcome {
            GestureOutcome::Committed(_) => app.status_message = "Change sent".to_string(),
            GestureOutcome::Queued(_) => {
                app.status_message =
                    format!("Queued as draft ({} pending)", app.session.drafts().len());
            }
            GestureOutcome::Rejected => {
                app.status_message = "Drop the link on another issue".to_string();
            }
            _ => {}
        }
    }

    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            let point = frame.to_scene(pos);
            let additive = ui.input(|i| i.modifiers.ctrl || i.modifiers.shift);
            let scene = app.session.scene();
            let key = match hit_test(scene, point, handle) {
                Some(target) => Some(target.key().clone()),
                None => scene.bar_at(point, 0.0).map(|bar| bar.key.clone()),
            };
            match key {
                Some(key) => {
                    app.session.select(&key, additive);
                }
                None => app.session.clear_selection(),
            }
        }
    }

    if response.double_clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            let point = frame.to_scene(pos);
            let summary = app
                .session
                .scene()
                .bar_at(point, 0.0)
                .filter(|bar| bar.kind != NodeKind::Issue)
                .map(|bar| bar.key.clone());
            if let Some(key) = summary {
                app.session.toggle(&key, ToggleDirection::Toggle);
            }
        }
    }

    if let Some(pos) = response.hover_pos() {
        let cursor = match hit_test(app.session.scene(), frame.to_scene(pos), handle) {
            Some(PointerTarget::ResizeHandle { .. }) => CursorIcon::ResizeHorizontal,
            Some(PointerTarget::BarBody { .. }) if response.dragged() => CursorIcon::Grabbing,
            Some(PointerTarget::BarBody { .. }) => CursorIcon::Grab,
            Some(PointerTarget::LinkHandle { .. }) => CursorIcon::Crosshair,
            None => CursorIcon::Default,
        };
        ui.ctx().set_cursor_icon(cursor);
    }
}

fn draw_bands(app: &GanttApp, painter: &egui::Painter, frame: &ChartSpace, view: Rect) {
    for band in &app.session.layout().bands {
        if !band.visible || !band.odd {
            continue;
        }
        let top = frame.to_screen(Point::new(0.0, band.y)).y;
        painter.rect_filled(
            Rect::from_x_y_ranges(view.x_range(), top..=top + band.height),
            0.0,
            theme::BG_BAND,
        );
    }
}

/// Visible dates with a little slack on both sides.
fn visible_dates(viewport: &TimelineViewport, frame: &ChartSpace, view: Rect) -> (NaiveDate, NaiveDate) {
    let left = view.left() - frame.scene_origin.x;
    let right = view.right() - frame.scene_origin.x;
    let first = (viewport.x_to_date(left) - Duration::days(1)).max(viewport.start);
    let last = (viewport.x_to_date(right) + Duration::days(1)).min(viewport.end);
    (first, last)
}

/// Day boundaries, or week boundaries when days get too narrow.
fn draw_grid(painter: &egui::Painter, frame: &ChartSpace, viewport: &TimelineViewport, view: Rect) {
    let (mut date, last) = visible_dates(viewport, frame, view);
    let step = if viewport.pixels_per_day >= 8.0 {
        1
    } else {
        date -= Duration::days(date.weekday().num_days_from_monday() as i64);
        7
    };
    while date <= last {
        let x = frame.to_screen(Point::new(viewport.date_to_x(date), 0.0)).x;
        let weekend = step == 1 && date.weekday().num_days_from_monday() >= 5;
        painter.line_segment(
            [Pos2::new(x, view.top()), Pos2::new(x, view.bottom())],
            Stroke::new(if weekend { 0.3 } else { 0.5 }, theme::GRID_LINE),
        );
        date += Duration::days(step);
    }
}

fn draw_today_line(painter: &egui::Painter, frame: &ChartSpace, x: f32, view: Rect) {
    let x = frame.to_screen(Point::new(x, 0.0)).x;
    painter.line_segment(
        [Pos2::new(x, view.top() + HEADER_HEIGHT), Pos2::new(x, view.bottom())],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    // Top badge
    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(x - badge_w / 2.0, view.top() + HEADER_HEIGHT - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

fn draw_arrows(painter: &egui::Painter, frame: &ChartSpace, scene: &Scene) {
    for arrow in scene.arrows.iter().filter(|a| a.visible) {
        let (color, dashed) = if arrow.spec.is_scheduling {
            (theme::ARROW_SCHEDULING, false)
        } else {
            (theme::ARROW_INFO, true)
        };
        draw_path(painter, frame, &arrow.path, Stroke::new(1.2, color), dashed);
    }
}

fn draw_path(painter: &egui::Painter, frame: &ChartSpace, path: &ArrowPath, stroke: Stroke, dashed: bool) {
    let radius = 4.0;
    let points: Vec<Pos2> = rounded(&path.points, radius)
        .into_iter()
        .map(|p| frame.to_screen(p))
        .collect();
    if dashed {
        painter.extend(Shape::dashed_line(&points, stroke, 4.0, 3.0));
    } else {
        painter.add(Shape::line(points, stroke));
    }
    let [wing_a, tip, wing_b] = path.head.map(|p| frame.to_screen(p));
    painter.add(Shape::line(vec![wing_a, tip, wing_b], stroke));
}

/// Polyline with each corner replaced by a short quadratic curve.
fn rounded(points: &[Point], radius: f32) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut out = vec![points[0]];
    for w in points.windows(3) {
        let (a, p, b) = (w[0], w[1], w[2]);
        let len_a = ((a.x - p.x).powi(2) + (a.y - p.y).powi(2)).sqrt();
        let len_b = ((b.x - p.x).powi(2) + (b.y - p.y).powi(2)).sqrt();
        let r = radius.min(len_a / 2.0).min(len_b / 2.0);
        if r <= 0.0 {
            out.push(p);
            continue;
        }
        let p1 = Point::new(p.x + (a.x - p.x) / len_a * r, p.y + (a.y - p.y) / len_a * r);
        let p2 = Point::new(p.x + (b.x - p.x) / len_b * r, p.y + (b.y - p.y) / len_b * r);
        for step in 0..=4 {
            let t = step as f32 / 4.0;
            let u = 1.0 - t;
            out.push(Point::new(
                u * u * p1.x + 2.0 * u * t * p.x + t * t * p2.x,
                u * u * p1.y + 2.0 * u * t * p.y + t * t * p2.y,
            ));
        }
    }
    out.extend(points.last().copied());
    out
}

fn draw_bars(app: &GanttApp, painter: &egui::Painter, frame: &ChartSpace, hover: Option<Pos2>) {
    let scene = app.session.scene();
    let half = scene.route_style.bar_half_height;
    let handle = app.session.config().interaction.handle_width;
    let hovered = hover.and_then(|pos| scene.bar_at(frame.to_scene(pos), 3.0 * handle));

    let mut bars: Vec<&Bar> = scene.bars.values().filter(|bar| bar.visible).collect();
    bars.sort_by(|a, b| a.key.cmp(&b.key));

    for bar in bars {
        let g = &bar.geometry;
        let summary = bar.kind != NodeKind::Issue;
        let bar_half = if summary { half * 0.5 } else { half };
        let rect = Rect::from_min_max(
            frame.to_screen(Point::new(g.start_x, g.center_y - bar_half)),
            frame.to_screen(Point::new(g.end_x, g.center_y + bar_half)),
        );
        let rounding = Rounding::same(if summary {
            theme::SUMMARY_ROUNDING
        } else {
            theme::BAR_ROUNDING
        });
        let mut fill = theme::bar_fill(bar);
        if bar.span != BarSpan::Full {
            fill = fill.gamma_multiply(0.55);
        }

        if !summary {
            // Soft shadow
            painter.rect_filled(rect.translate(Vec2::new(1.0, 2.0)), rounding, Color32::from_black_alpha(35));
        }
        painter.rect_filled(rect, rounding, fill);

        // Progress fill (darkened overlay)
        let progress = bar.progress_width();
        if progress > 0.0 {
            let progress_rect = Rect::from_min_size(rect.min, Vec2::new(progress, rect.height()));
            painter.rect_filled(progress_rect, rounding, theme::PROGRESS_OVERLAY);
        }

        if bar.external {
            painter.rect_stroke(rect, rounding, Stroke::new(1.0, Color32::from_white_alpha(90)));
        }
        if bar.closed {
            painter.line_segment(
                [Pos2::new(rect.left() + 2.0, rect.center().y), Pos2::new(rect.right() - 2.0, rect.center().y)],
                Stroke::new(1.0, Color32::from_white_alpha(70)),
            );
        }

        // Selection glow
        if app.session.is_selected(&bar.key) {
            painter.rect_stroke(
                rect.expand(1.5),
                Rounding::same(theme::BAR_ROUNDING + 1.5),
                Stroke::new(2.0, theme::BORDER_ACCENT),
            );
        }

        let label_pos = frame.to_screen(Point::new(bar.label.x, bar.label.y));
        let align = match bar.label.side {
            LabelSide::Right => egui::Align2::LEFT_CENTER,
            LabelSide::Left => egui::Align2::RIGHT_CENTER,
        };
        painter.text(label_pos, align, &bar.label.text, theme::font_bar(), theme::TEXT_SECONDARY);

        let is_hovered = hovered.is_some_and(|h| h.key == bar.key);
        if bar.is_draggable() && (is_hovered || app.session.is_selected(&bar.key)) {
            draw_handles(painter, bar, rect, handle);
        }
    }
}

/// Resize pills on the bar edges and link dots just outside them.
fn draw_handles(painter: &egui::Painter, bar: &Bar, rect: Rect, handle: f32) {
    let handle_h = rect.height() * 0.55;
    let handle_y = rect.center().y - handle_h / 2.0;
    for anchor in [Anchor::Start, Anchor::End] {
        if !bar.has_edge(anchor) {
            continue;
        }
        let (edge_x, outward) = match anchor {
            Anchor::Start => (rect.left(), -1.0),
            Anchor::End => (rect.right(), 1.0),
        };
        let pill = Rect::from_min_size(Pos2::new(edge_x - 2.0, handle_y), Vec2::new(4.0, handle_h));
        painter.rect_filled(pill, Rounding::same(2.0), theme::HANDLE_COLOR);
        painter.circle_stroke(
            Pos2::new(edge_x + outward * 2.0 * handle, rect.center().y),
            theme::LINK_HANDLE_RADIUS,
            Stroke::new(1.2, theme::ARROW_PREVIEW),
        );
    }
}

fn show_bar_tooltip(app: &GanttApp, ui: &Ui, response: &egui::Response, frame: &ChartSpace) {
    if !app.session.gesture().is_idle() {
        return;
    }
    let Some(pos) = response.hover_pos() else {
        return;
    };
    let scene = app.session.scene();
    let Some(bar) = scene.bar_at(frame.to_scene(pos), 0.0) else {
        return;
    };
    let Some(row) = app.session.layout().row(&bar.key) else {
        return;
    };
    egui::show_tooltip_at_pointer(
        ui.ctx(),
        ui.layer_id(),
        Id::new(("bar-tip", bar.key.as_str())),
        |ui| {
            ui.strong(&bar.label.text);
            let fmt = |d: Option<NaiveDate>| {
                d.map(|d| d.format("%d/%m/%Y").to_string())
                    .unwrap_or_else(|| "open".to_string())
            };
            ui.label(format!("{} → {}", fmt(bar.start), fmt(bar.due)));
            if let Some(issue) = &row.issue {
                ui.label(format!("Done: {}%", (issue.done_ratio * 100.0) as i32));
                if let Some(assignee) = &issue.assignee {
                    ui.label(format!("Assignee: {}", assignee));
                }
                if let (Some(spent), Some(estimated)) = (issue.spent_hours, issue.estimated_hours) {
                    ui.label(format!("Hours: {:.1} / {:.1}", spent, estimated));
                }
            }
        },
    );
}

/// Right-click on an arrow offers to delete its relation.
fn show_arrow_menu(app: &mut GanttApp, ui: &Ui, response: &egui::Response, frame: &ChartSpace) {
    let menu_id = Id::new("arrow_menu_target");
    if response.secondary_clicked() {
        let target = response
            .interact_pointer_pos()
            .and_then(|pos| arrow_at(app.session.scene(), frame.to_scene(pos), ARROW_HIT_SLACK));
        ui.ctx().data_mut(|d| match target {
            Some(id) => d.insert_temp(menu_id, id),
            None => d.remove::<u64>(menu_id),
        });
    }
    let Some(relation_id) = ui.ctx().data(|d| d.get_temp::<u64>(menu_id)) else {
        return;
    };
    let Some(arrow) = app
        .session
        .scene()
        .arrows
        .iter()
        .find(|a| a.spec.relation_id == relation_id)
    else {
        return;
    };
    let title = format!(
        "#{} {} #{}",
        arrow.spec.from_id,
        arrow.spec.relation_type.label(),
        arrow.spec.to_id
    );
    response.context_menu(|ui| {
        ui.label(egui::RichText::new(title).small().weak());
        if ui
            .button(format!("{}  Delete relation", egui_phosphor::regular::TRASH))
            .clicked()
        {
            app.delete_relation(relation_id);
            ui.close_menu();
        }
    });
}

/// Relation id of the first visible arrow within `slack` of a point.
fn arrow_at(scene: &Scene, point: Point, slack: f32) -> Option<u64> {
    scene
        .arrows
        .iter()
        .filter(|arrow| arrow.visible)
        .find(|arrow| {
            arrow
                .path
                .points
                .windows(2)
                .any(|w| distance_to_segment(point, w[0], w[1]) <= slack)
        })
        .map(|arrow| arrow.spec.relation_id)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

/// Date header pinned to the top of the visible area.
fn draw_timeline_header(
    painter: &egui::Painter,
    frame: &ChartSpace,
    viewport: &TimelineViewport,
    view: Rect,
) {
    let top = view.top();
    let header = Rect::from_min_size(view.min, Vec2::new(view.width(), HEADER_HEIGHT));
    painter.rect_filled(header, 0.0, theme::BG_HEADER);
    painter.line_segment(
        [Pos2::new(view.left(), top + HEADER_HEIGHT), Pos2::new(view.right(), top + HEADER_HEIGHT)],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let painter = painter.with_clip_rect(header);
    let x_of = |date: NaiveDate| frame.to_screen(Point::new(viewport.date_to_x(date), 0.0)).x;
    let (mut date, end) = visible_dates(viewport, frame, view);

    match viewport.scale {
        TimelineScale::Days => {
            while date <= end {
                let x = x_of(date);
                if viewport.pixels_per_day >= 20.0 {
                    let is_weekend = date.weekday().num_days_from_monday() >= 5;
                    let day_color = if is_weekend {
                        theme::TEXT_DIM
                    } else {
                        theme::TEXT_SECONDARY
                    };
                    painter.text(
                        Pos2::new(x + 3.0, top + 28.0),
                        egui::Align2::LEFT_CENTER,
                        date.format("%d").to_string(),
                        theme::font_sub(),
                        day_color,
                    );
                }
                if date.day() == 1 {
                    painter.text(
                        Pos2::new(x + 3.0, top + 12.0),
                        egui::Align2::LEFT_CENTER,
                        date.format("%b %Y").to_string(),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
                date += Duration::days(1);
            }
        }
        TimelineScale::Weeks => {
            date -= Duration::days(date.weekday().num_days_from_monday() as i64);
            while date <= end {
                let x = x_of(date);
                painter.text(
                    Pos2::new(x + 3.0, top + 28.0),
                    egui::Align2::LEFT_CENTER,
                    date.format("W%V").to_string(),
                    theme::font_sub(),
                    theme::TEXT_SECONDARY,
                );
                if date.day() <= 7 {
                    painter.text(
                        Pos2::new(x + 3.0, top + 12.0),
                        egui::Align2::LEFT_CENTER,
                        date.format("%b %Y").to_string(),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
                date += Duration::days(7);
            }
        }
        TimelineScale::Months => {
            date = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
            while date <= end {
                painter.text(
                    Pos2::new(x_of(date) + 5.0, top + 18.0),
                    egui::Align2::LEFT_CENTER,
                    date.format("%b %Y").to_string(),
                    theme::font_header(),
                    theme::TEXT_PRIMARY,
                );
                let (y, m) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                date = NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(date + Duration::days(30));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
    }

    #[test]
    fn rounding_keeps_endpoints() {
        let points = [Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(20.0, 20.0)];
        let out = rounded(&points, 4.0);
        assert_eq!(out.first(), Some(&points[0]));
        assert_eq!(out.last(), Some(&points[2]));
        assert!(out.len() > points.len());
    }
}
