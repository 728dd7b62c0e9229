use chrono::{Duration, NaiveDate};
use std::path::PathBuf;

use gantt_timeline::config::{self, COLLAPSE_STATE_FILE};
use gantt_timeline::model::{
    CollapseState, Node, NodeKind, Relation, RelationType, TimelineViewport,
};
use gantt_timeline::{GestureOutcome, NullSink, TimelineConfig, TimelineSession};

use crate::tracker::LocalTracker;
use crate::ui;

pub type Session = TimelineSession<LocalTracker, NullSink>;

/// Main application state.
pub struct GanttApp {
    pub session: Session,
    pub file_path: Option<PathBuf>,
    pub config_dir: PathBuf,

    // Dialog state
    pub show_about: bool,
    pub relation_kind: RelationType,
    pub relation_delay: i64,
    /// Endpoints of the link the relation picker was opened for.
    pub pending_link: Option<(u64, u64)>,

    // Status message
    pub status_message: String,
}

impl GanttApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        let config_dir = config::config_dir();
        let config = TimelineConfig::load_or_init(&config_dir);
        let collapse_path = config_dir.join(COLLAPSE_STATE_FILE);
        let collapse = gantt_timeline::io::load_collapse_state(&collapse_path).unwrap_or_else(|e| {
            tracing::warn!("ignoring collapse state {:?}: {}", collapse_path, e);
            CollapseState::new()
        });

        let today = chrono::Local::now().date_naive();
        let schedule = Self::sample_schedule(today);
        let tracker =
            LocalTracker::new(schedule.clone()).with_collapse_file(collapse_path, collapse.clone());
        let viewport = TimelineViewport::new(today, today, config.zoom.default_pixels_per_day);

        let mut session = TimelineSession::new(tracker, NullSink, config, viewport, today)
            .with_collapse_state(collapse);
        session.refresh(schedule);
        session.fit_viewport();
        tracing::info!("viewer started with config from {:?}", config_dir);

        Self {
            session,
            file_path: None,
            config_dir,
            show_about: false,
            relation_kind: RelationType::Precedes,
            relation_delay: 0,
            pending_link: None,
            status_message: "Ready".to_string(),
        }
    }

    /// Generate a sample schedule for demonstration.
    fn sample_schedule(today: NaiveDate) -> Vec<Node> {
        let day = |offset: i64| today + Duration::days(offset);

        let relation = |id: u64, from: u64, to: u64, kind: RelationType| Relation {
            id,
            from,
            to,
            kind,
            delay: None,
        };
        let kickoff_to_specs = relation(1, 1001, 1002, RelationType::Precedes);
        let specs_to_design = relation(2, 1002, 1003, RelationType::Blocks);
        let design_with_build = relation(3, 1003, 1004, RelationType::StartToStart);
        let build_to_qa = relation(4, 1004, 1011, RelationType::FinishToStart);
        let api_relates = relation(5, 1012, 1004, RelationType::Relates);

        let mut kickoff = Node::issue(1001, "Project kickoff", day(-5), day(-3))
            .with_relation(kickoff_to_specs.clone());
        if let Some(issue) = kickoff.issue.as_mut() {
            issue.done_ratio = 1.0;
            issue.closed = true;
        }

        let mut specs = Node::issue(1002, "Requirements", day(-2), day(4))
            .with_relation(kickoff_to_specs)
            .with_relation(specs_to_design.clone());
        if let Some(issue) = specs.issue.as_mut() {
            issue.done_ratio = 0.6;
            issue.estimated_hours = Some(16.0);
            issue.spent_hours = Some(20.0);
            issue.assignee = Some("Ana".into());
        }

        let design = Node::issue(1003, "UI design", day(6), day(15))
            .with_relation(specs_to_design)
            .with_relation(design_with_build.clone());

        let build = Node::issue(1004, "Backend", day(6), day(24))
            .with_relation(design_with_build)
            .with_relation(build_to_qa.clone())
            .with_relation(api_relates.clone());

        let mut qa = Node::issue(1011, "Testing & QA", day(26), day(32)).with_relation(build_to_qa);
        if let Some(issue) = qa.issue.as_mut() {
            issue.external = true;
        }

        let api = Node::new(NodeKind::Issue, 1012, "Public API review")
            .with_dates(Some(day(10)), None)
            .with_relation(api_relates);

        let mut support = Node::new(NodeKind::Issue, 1013, "Support hours")
            .with_dates(None, Some(day(2)));
        if let Some(issue) = support.issue.as_mut() {
            issue.ad_hoc = true;
        }

        let website = Node::new(NodeKind::Project, 100, "Website relaunch")
            .with_dates(Some(day(-5)), Some(day(24)))
            .with_children(vec![kickoff, specs, design, build]);
        let mobile = Node::new(NodeKind::Project, 101, "Mobile app")
            .with_dates(Some(day(2)), Some(day(32)))
            .with_children(vec![qa, api, support]);

        vec![Node::new(NodeKind::TimeGroup, 1, "This quarter")
            .with_dates(Some(day(-5)), Some(day(32)))
            .with_children(vec![website, mobile])]
    }

    // --- File operations ---

    pub fn open_schedule(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Schedule", &["json"])
            .pick_file()
        {
            match gantt_timeline::io::load_nodes(&path) {
                Ok(nodes) => {
                    self.session.host_mut().replace_schedule(nodes.clone());
                    self.session.refresh(nodes);
                    self.session.fit_viewport();
                    self.file_path = Some(path);
                    self.status_message = "Schedule loaded".to_string();
                }
                Err(e) => {
                    self.status_message = format!("Error loading: {}", e);
                }
            }
        }
    }

    pub fn save_schedule(&mut self) {
        if let Some(path) = self.file_path.clone() {
            self.write_schedule(path);
        } else {
            self.save_schedule_as();
        }
    }

    pub fn save_schedule_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Schedule", &["json"])
            .set_file_name("schedule.json")
            .save_file()
        {
            self.write_schedule(path);
        }
    }

    fn write_schedule(&mut self, path: PathBuf) {
        match gantt_timeline::io::save_nodes(self.session.host().schedule(), &path) {
            Ok(()) => {
                self.status_message = "Schedule saved".to_string();
                self.file_path = Some(path);
            }
            Err(e) => self.status_message = format!("Error saving: {}", e),
        }
    }

    pub fn open_config_folder(&mut self) {
        if let Err(e) = open::that(&self.config_dir) {
            self.status_message = format!("Could not open {:?}: {}", self.config_dir, e);
        }
    }

    // --- Edits ---

    pub fn undo(&mut self) {
        match self.session.undo() {
            Some(item) => self.status_message = format!("Undo {}", item.entry.describe()),
            None if !self.session.gesture().is_idle() => {
                self.status_message = "Finish the current edit first".to_string();
            }
            None => {}
        }
    }

    pub fn redo(&mut self) {
        match self.session.redo() {
            Some(item) => self.status_message = format!("Redo {}", item.entry.describe()),
            None if !self.session.gesture().is_idle() => {
                self.status_message = "Finish the current edit first".to_string();
            }
            None => {}
        }
    }

    pub fn set_draft_mode(&mut self, enabled: bool) {
        self.session.set_draft_mode(enabled);
        self.status_message = if enabled {
            "Draft mode: edits are queued until submitted".to_string()
        } else {
            "Draft mode off".to_string()
        };
    }

    pub fn submit_drafts(&mut self) {
        let count = self.session.submit_drafts();
        self.status_message = format!("Submitted {} drafts", count);
    }

    pub fn discard_drafts(&mut self) {
        let count = self.session.discard_drafts();
        self.status_message = format!("Discarded {} drafts", count);
    }

    pub fn delete_relation(&mut self, relation_id: u64) {
        self.status_message = match self.session.delete_relation(relation_id) {
            GestureOutcome::Refused => "Finish the current edit first".to_string(),
            GestureOutcome::Ignored => format!("Relation #{} is not on the timeline", relation_id),
            _ => "Relation removed".to_string(),
        };
    }

    /// Apply what the tracker has queued and pick up its answers.
    fn pump_tracker(&mut self) {
        for (ticket, result) in self.session.host_mut().process() {
            match result {
                Ok(ack) => {
                    self.session.intent_acknowledged(ticket, ack);
                }
                Err(reason) => {
                    self.session.intent_failed(ticket, &reason);
                }
            }
        }
        if self.session.gesture().is_idle() && self.session.host_mut().take_refresh() {
            let nodes = self.session.host().schedule().to_vec();
            self.session.refresh(nodes);
        }
        if let Some(notice) = self.session.take_notices().pop() {
            self.status_message = notice;
        }
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::theme::apply_theme(ctx);

        // Handle keyboard shortcuts outside closures to avoid borrow issues
        let should_save = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));
        let should_undo = ctx.input(|i| i.modifiers.ctrl && !i.modifiers.shift && i.key_pressed(egui::Key::Z));
        let should_redo = ctx.input(|i| i.modifiers.ctrl && (i.key_pressed(egui::Key::Y) || (i.modifiers.shift && i.key_pressed(egui::Key::Z))));
        let should_escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if should_save {
            self.save_schedule();
        }
        if should_undo {
            self.undo();
        }
        if should_redo {
            self.redo();
        }
        if should_escape {
            self.session.escape();
        }

        self.pump_tracker();

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_sub())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let default_ppd = self.session.config().zoom.default_pixels_per_day;
                        ui.label(
                            egui::RichText::new(format!(
                                "Zoom: {:.0}%",
                                self.session.viewport().pixels_per_day / default_ppd * 100.0
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                        ui.label(egui::RichText::new(" · ").size(10.5).color(ui::theme::TEXT_DIM));
                        ui.label(
                            egui::RichText::new(format!("Rows: {}", self.session.layout().rows.len()))
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM),
                        );
                        if let Some(key) = self.session.host().selected() {
                            ui.label(egui::RichText::new(" · ").size(10.5).color(ui::theme::TEXT_DIM));
                            ui.label(
                                egui::RichText::new(format!("Selected: {}", key))
                                    .size(10.5)
                                    .color(ui::theme::TEXT_DIM),
                            );
                        }
                        if self.session.in_flight() > 0 {
                            ui.label(egui::RichText::new(" · ").size(10.5).color(ui::theme::TEXT_DIM));
                            ui.label(
                                egui::RichText::new(format!("Sending: {}", self.session.in_flight()))
                                    .size(10.5)
                                    .color(ui::theme::TEXT_DIM),
                            );
                        }
                        if self.session.is_draft_mode() {
                            ui.label(egui::RichText::new(" · ").size(10.5).color(ui::theme::TEXT_DIM));
                            ui.label(
                                egui::RichText::new(format!("Drafts: {}", self.session.drafts().len()))
                                    .size(10.5)
                                    .color(ui::theme::DRAFT),
                            );
                        }
                    });
                });
            });

        // Left panel: row tree
        egui::SidePanel::left("row_tree")
            .default_width(ui::theme::SIDE_PANEL_WIDTH)
            .min_width(160.0)
            .max_width(ui::theme::SIDE_PANEL_WIDTH * 2.0)
            .resizable(true)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .stroke(egui::Stroke::new(1.0, ui::theme::BORDER_SUBTLE)),
            )
            .show(ctx, |ui| {
                ui::row_tree::show_row_tree(self, ui);
            });

        // Central panel: Gantt chart
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
            ui::gantt_chart::show_gantt_chart(self, ui);
        });

        // Dialogs
        if self.session.pending_commit().is_some() {
            ui::dialogs::show_pending_commit_dialog(self, ctx);
        } else {
            self.pending_link = None;
        }
        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }

        if !self.session.gesture().is_idle() || self.session.host().pending() > 0 {
            ctx.request_repaint();
        }
    }
}
