use crate::app::GanttApp;
use crate::ui::theme;
use egui::{menu, RichText, Ui};
use egui_phosphor::regular as icon;
use gantt_timeline::model::TimelineScale;

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut GanttApp, ui: &mut Ui) {
    let idle = app.session.gesture().is_idle();

    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  Open...", icon::FOLDER_OPEN)).clicked() {
                app.open_schedule();
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Save          Ctrl+S", icon::FLOPPY_DISK)).clicked() {
                app.save_schedule();
                ui.close_menu();
            }
            if ui.button("     Save As...").clicked() {
                app.save_schedule_as();
                ui.close_menu();
            }
            ui.separator();
            if ui.button(format!("{}  Open config folder", icon::GEAR)).clicked() {
                app.open_config_folder();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Edit  ").font(theme::font_menu()), |ui| {
            let undo_label = match app.session.history().undo_label() {
                Some(label) => format!("{}  Undo {}   Ctrl+Z", icon::ARROW_COUNTER_CLOCKWISE, label),
                None => format!("{}  Undo   Ctrl+Z", icon::ARROW_COUNTER_CLOCKWISE),
            };
            if ui
                .add_enabled(idle && app.session.history().can_undo(), egui::Button::new(undo_label))
                .clicked()
            {
                app.undo();
                ui.close_menu();
            }
            let redo_label = match app.session.history().redo_label() {
                Some(label) => format!("{}  Redo {}   Ctrl+Y", icon::ARROW_CLOCKWISE, label),
                None => format!("{}  Redo   Ctrl+Y", icon::ARROW_CLOCKWISE),
            };
            if ui
                .add_enabled(idle && app.session.history().can_redo(), egui::Button::new(redo_label))
                .clicked()
            {
                app.redo();
                ui.close_menu();
            }
            ui.separator();
            let mut draft_mode = app.session.is_draft_mode();
            if ui.checkbox(&mut draft_mode, "Draft mode").changed() {
                app.set_draft_mode(draft_mode);
            }
            let drafts = app.session.drafts().len();
            if ui
                .add_enabled(
                    drafts > 0,
                    egui::Button::new(format!("{}  Submit drafts ({})", icon::PAPER_PLANE_TILT, drafts)),
                )
                .clicked()
            {
                app.submit_drafts();
                ui.close_menu();
            }
            if ui
                .add_enabled(drafts > 0, egui::Button::new(format!("{}  Discard drafts", icon::TRASH)))
                .clicked()
            {
                app.discard_drafts();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  Zoom In        Ctrl+Scroll ↑", icon::MAGNIFYING_GLASS_PLUS)).clicked() {
                app.session.zoom_in();
                ui.close_menu();
            }
            if ui.button(format!("{}  Zoom Out      Ctrl+Scroll ↓", icon::MAGNIFYING_GLASS_MINUS)).clicked() {
                app.session.zoom_out();
                ui.close_menu();
            }
            if ui.button("     Fit to schedule").clicked() {
                app.session.fit_viewport();
                ui.close_menu();
            }
            ui.separator();
            if ui.add_enabled(idle, egui::Button::new("     Expand all")).clicked() {
                app.session.expand_all();
                ui.close_menu();
            }
            if ui.add_enabled(idle, egui::Button::new("     Collapse all")).clicked() {
                app.session.collapse_all();
                ui.close_menu();
            }
            ui.separator();
            ui.label(RichText::new("Timeline Scale").small().weak());
            let mut scale = app.session.viewport().scale;
            for (value, label) in [
                (TimelineScale::Days, "Days"),
                (TimelineScale::Weeks, "Weeks"),
                (TimelineScale::Months, "Months"),
            ] {
                if ui.radio_value(&mut scale, value, label).clicked() {
                    app.session.set_scale(scale);
                    ui.close_menu();
                }
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_menu()), |ui| {
            if ui.button(format!("{}  About", icon::INFO)).clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if app.session.is_draft_mode() {
                ui.label(
                    RichText::new(format!("{} Draft mode", icon::PENCIL_SIMPLE))
                        .color(theme::DRAFT)
                        .size(11.0),
                );
            }
            if let Some(path) = &app.file_path {
                ui.label(
                    RichText::new(path.display().to_string())
                        .size(11.0)
                        .color(theme::TEXT_DIM),
                );
            }
        });
    });
}
