use crate::app::GanttApp;
use crate::ui::theme;
use chrono::NaiveDate;
use egui::{Color32, Context, RichText, Window};
use gantt_timeline::interaction::PendingCommit;
use gantt_timeline::model::{DateChange, RelationType};
use gantt_timeline::GestureOutcome;

const DIALOG_WIDTH: f32 = 340.0;

/// Confirmation for a finished drag: date changes or a new relation.
pub fn show_pending_commit_dialog(app: &mut GanttApp, ctx: &Context) {
    let Some(pending) = app.session.pending_commit().cloned() else {
        return;
    };
    match pending {
        PendingCommit::Dates { changes, .. } => show_date_confirmation(app, ctx, &changes),
        PendingCommit::Relation {
            from_id,
            to_id,
            suggested,
            ..
        } => {
            if app.pending_link != Some((from_id, to_id)) {
                app.pending_link = Some((from_id, to_id));
                app.relation_kind = suggested;
                app.relation_delay = 0;
            }
            show_relation_picker(app, ctx, from_id, to_id);
        }
    }
}

fn issue_label(app: &GanttApp, node_id: u64) -> String {
    app.session
        .scene()
        .bar_for_node(node_id)
        .map(|bar| bar.label.text.clone())
        .unwrap_or_else(|| format!("#{}", node_id))
}

fn show_date_confirmation(app: &mut GanttApp, ctx: &Context, changes: &[DateChange]) {
    let mut confirm = ctx.input(|i| i.key_pressed(egui::Key::Enter));
    let mut cancel = false;
    let mut adjusted: Option<(u64, Option<NaiveDate>, Option<NaiveDate>)> = None;

    let title = if changes.len() == 1 {
        "Change dates".to_string()
    } else {
        format!("Move {} issues", changes.len())
    };
    Window::new(RichText::new(title).strong().size(14.0))
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([DIALOG_WIDTH, 0.0])
        .show(ctx, |ui| {
            ui.add_space(4.0);
            egui::ScrollArea::vertical().max_height(320.0).show(ui, |ui| {
                for change in changes {
                    ui.label(RichText::new(issue_label(app, change.node_id)).strong());
                    egui::Grid::new(("pending_dates", change.node_id))
                        .num_columns(3)
                        .spacing([12.0, 6.0])
                        .show(ui, |ui| {
                            let mut start = change.new_start;
                            let mut due = change.new_due;
                            date_row(ui, "Start", change.old_start, &mut start, change.node_id);
                            ui.end_row();
                            date_row(ui, "Due", change.old_due, &mut due, change.node_id);
                            ui.end_row();
                            if start != change.new_start || due != change.new_due {
                                adjusted = Some((change.node_id, start, due));
                            }
                        });
                    ui.add_space(6.0);
                }
            });

            ui.separator();
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let confirm_btn = egui::Button::new(RichText::new("Apply").color(Color32::WHITE))
                    .fill(theme::ACCENT)
                    .rounding(egui::Rounding::same(4.0));
                if ui.add_sized([80.0, 28.0], confirm_btn).clicked() {
                    confirm = true;
                }
                if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                    cancel = true;
                }
            });
            ui.add_space(2.0);
        });

    if let Some((node_id, start, due)) = adjusted {
        if !app.session.adjust_pending_dates(node_id, start, due) {
            app.status_message = "Due date must not be before the start".to_string();
        }
    }
    if confirm {
        app.status_message = match app.session.confirm_dates() {
            GestureOutcome::Queued(_) => {
                format!("Queued as draft ({} pending)", app.session.drafts().len())
            }
            GestureOutcome::Reverted => "No change".to_string(),
            _ => "Change sent".to_string(),
        };
    } else if cancel {
        app.session.cancel();
    }
}

/// One editable date with its previous value alongside.
fn date_row(ui: &mut egui::Ui, label: &str, old: Option<NaiveDate>, new: &mut Option<NaiveDate>, id: u64) {
    ui.label(RichText::new(label).color(theme::TEXT_SECONDARY));
    let old_text = old
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "none".to_string());
    ui.label(RichText::new(old_text).color(theme::TEXT_DIM).strikethrough());
    match new {
        Some(date) => {
            ui.add(egui_extras::DatePickerButton::new(date).id_salt(&format!("dp_{}_{}", label, id)));
        }
        None => {
            ui.label(RichText::new("none").color(theme::TEXT_DIM));
        }
    }
}

fn show_relation_picker(app: &mut GanttApp, ctx: &Context, from_id: u64, to_id: u64) {
    let mut confirm = ctx.input(|i| i.key_pressed(egui::Key::Enter));
    let mut cancel = false;
    let from = issue_label(app, from_id);
    let to = issue_label(app, to_id);

    Window::new(RichText::new("New relation").strong().size(14.0))
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([DIALOG_WIDTH, 0.0])
        .show(ctx, |ui| {
            ui.add_space(4.0);
            ui.label(RichText::new(&from).strong());
            egui::ComboBox::from_id_salt("relation_kind")
                .selected_text(app.relation_kind.label())
                .width(200.0)
                .show_ui(ui, |ui| {
                    for kind in RelationType::ALL {
                        ui.selectable_value(&mut app.relation_kind, kind, kind.label());
                    }
                });
            ui.label(RichText::new(&to).strong());
            ui.add_space(6.0);
            ui.add_enabled_ui(app.relation_kind.is_scheduling(), |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Delay (days)").color(theme::TEXT_SECONDARY));
                    ui.add(egui::DragValue::new(&mut app.relation_delay).range(0..=365));
                });
            });

            ui.separator();
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let create_btn = egui::Button::new(RichText::new("Create").color(Color32::WHITE))
                    .fill(theme::ACCENT)
                    .rounding(egui::Rounding::same(4.0));
                if ui.add_sized([80.0, 28.0], create_btn).clicked() {
                    confirm = true;
                }
                if ui.add_sized([80.0, 28.0], egui::Button::new("Cancel")).clicked() {
                    cancel = true;
                }
            });
            ui.add_space(2.0);
        });

    if confirm {
        let delay = (app.relation_delay > 0).then_some(app.relation_delay);
        app.session.confirm_relation(app.relation_kind, delay);
        app.pending_link = None;
        app.status_message = format!("Linked {} {} {}", from, app.relation_kind.label(), to);
    } else if cancel {
        app.session.cancel();
        app.pending_link = None;
    }
}

/// Render the "About" dialog.
pub fn show_about_dialog(app: &mut GanttApp, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([300.0, 180.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("Gantt Timeline").strong());
                ui.add_space(2.0);
                ui.label(RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION"))).color(theme::TEXT_SECONDARY));
                ui.add_space(10.0);
                ui.label("Drag bars to reschedule, drag from the");
                ui.label("dots beside a bar to link issues.");
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_about = false;
    }
}
