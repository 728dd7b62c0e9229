use crate::app::GanttApp;
use crate::ui::theme;
use egui::{Pos2, Rect, Sense, Stroke, Ui, Vec2};
use gantt_timeline::model::NodeKind;
use gantt_timeline::{CollapseKey, ToggleDirection};

/// Actions that the row tree can request.
enum RowAction {
    None,
    Toggle(CollapseKey),
    Select(CollapseKey, bool),
}

/// Render the left-side row tree. It follows the chart's vertical scroll so
/// rows line up with their bars.
pub fn show_row_tree(app: &mut GanttApp, ui: &mut Ui) {
    let mut action = RowAction::None;
    let indent = app.session.config().layout.indent_width;
    let scroll_y = app.session.scroll().y;

    egui::ScrollArea::vertical()
        .id_salt("row_tree")
        .auto_shrink([false, false])
        .vertical_scroll_offset(scroll_y)
        .enable_scrolling(false)
        .show_viewport(ui, |ui, visible| {
            let layout = app.session.layout();
            let width = ui.available_width();
            let height = theme::HEADER_HEIGHT + layout.content_height + 40.0;
            let (response, painter) =
                ui.allocate_painter(Vec2::new(width, height), Sense::hover());
            let origin = response.rect.min + Vec2::new(0.0, theme::HEADER_HEIGHT);

            for band in layout.bands.iter().filter(|b| b.visible && b.odd) {
                painter.rect_filled(
                    Rect::from_min_size(
                        Pos2::new(response.rect.left(), origin.y + band.y),
                        Vec2::new(width, band.height),
                    ),
                    0.0,
                    theme::BG_BAND,
                );
            }

            for guide in layout.guides.iter().filter(|g| g.visible) {
                let x = response.rect.left() + guide.x;
                painter.line_segment(
                    [Pos2::new(x, origin.y + guide.y_top), Pos2::new(x, origin.y + guide.y_bottom)],
                    Stroke::new(1.0, theme::GUIDE_LINE),
                );
            }

            for row in layout.rows.iter().filter(|r| r.is_visible) {
                let rect = Rect::from_min_size(
                    Pos2::new(response.rect.left(), origin.y + row.current_y),
                    Vec2::new(width, row.height),
                );
                let row_response = ui.interact(
                    rect,
                    ui.make_persistent_id(("tree_row", row.collapse_key.as_str())),
                    Sense::click(),
                );
                if app.session.is_selected(&row.collapse_key) {
                    painter.rect_filled(rect, 0.0, theme::BG_SELECTED);
                } else if row_response.hovered() {
                    painter.rect_filled(rect, 0.0, theme::BG_ROW_HOVER);
                }

                let caret_x = response.rect.left() + row.depth as f32 * indent + indent / 2.0;
                if row.has_children {
                    let caret = if row.is_expanded {
                        egui_phosphor::regular::CARET_DOWN
                    } else {
                        egui_phosphor::regular::CARET_RIGHT
                    };
                    painter.text(
                        Pos2::new(caret_x, rect.center().y),
                        egui::Align2::CENTER_CENTER,
                        caret,
                        theme::font_sub(),
                        theme::TEXT_SECONDARY,
                    );
                }

                let (icon, color, font) = match row.kind {
                    NodeKind::TimeGroup => (
                        egui_phosphor::regular::CALENDAR,
                        theme::TEXT_PRIMARY,
                        theme::font_header(),
                    ),
                    NodeKind::Project => (
                        egui_phosphor::regular::FOLDER,
                        theme::TEXT_PRIMARY,
                        theme::font_bar(),
                    ),
                    NodeKind::Issue => (
                        egui_phosphor::regular::CIRCLE,
                        theme::TEXT_SECONDARY,
                        theme::font_bar(),
                    ),
                };
                let text = match row.kind {
                    NodeKind::Issue => format!("{} #{} {}", icon, row.node_id, row.label),
                    _ => format!("{} {}", icon, row.label),
                };
                let clipped = painter.with_clip_rect(rect);
                clipped.text(
                    Pos2::new(caret_x + indent / 2.0 + 4.0, rect.center().y),
                    egui::Align2::LEFT_CENTER,
                    text,
                    font,
                    color,
                );

                if row_response.clicked() {
                    let on_caret = row_response
                        .interact_pointer_pos()
                        .is_some_and(|p| row.has_children && (p.x - caret_x).abs() <= indent / 2.0 + 2.0);
                    action = if on_caret {
                        RowAction::Toggle(row.collapse_key.clone())
                    } else {
                        let additive = ui.input(|i| i.modifiers.ctrl || i.modifiers.shift);
                        RowAction::Select(row.collapse_key.clone(), additive)
                    };
                } else if row_response.double_clicked() && row.has_children {
                    action = RowAction::Toggle(row.collapse_key.clone());
                }
            }

            // Header strip pinned over the rows
            let header = Rect::from_min_size(
                Pos2::new(response.rect.left(), response.rect.top() + visible.top()),
                Vec2::new(width, theme::HEADER_HEIGHT),
            );
            painter.rect_filled(header, 0.0, theme::BG_HEADER);
            painter.line_segment(
                [header.left_bottom(), header.right_bottom()],
                Stroke::new(1.0, theme::BORDER_SUBTLE),
            );
            let visible_rows = layout.rows.iter().filter(|r| r.is_visible).count();
            painter.text(
                Pos2::new(header.left() + 10.0, header.center().y),
                egui::Align2::LEFT_CENTER,
                format!("Rows  {} / {}", visible_rows, layout.rows.len()),
                theme::font_header(),
                theme::TEXT_PRIMARY,
            );
            let selected = app.session.selection().len();
            if selected > 1 {
                painter.text(
                    Pos2::new(header.right() - 10.0, header.center().y),
                    egui::Align2::RIGHT_CENTER,
                    format!("{} selected", selected),
                    theme::font_sub(),
                    theme::TEXT_DIM,
                );
            }
        });

    match action {
        RowAction::Toggle(key) => {
            app.session.toggle(&key, ToggleDirection::Toggle);
        }
        RowAction::Select(key, additive) => {
            app.session.select(&key, additive);
        }
        RowAction::None => {}
    }
}
