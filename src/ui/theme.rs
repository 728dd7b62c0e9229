use egui::{Color32, FontId, Rounding, Stroke, Visuals};
use gantt_timeline::layout::Bar;
use gantt_timeline::model::NodeKind;

// ── Surfaces ─────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(21, 23, 30);
pub const BG_PANEL: Color32 = Color32::from_rgb(28, 31, 40);
pub const BG_HEADER: Color32 = Color32::from_rgb(33, 37, 48);
pub const BG_BAND: Color32 = Color32::from_rgba_premultiplied(9, 10, 12, 10);
pub const BG_ROW_HOVER: Color32 = Color32::from_rgba_premultiplied(16, 18, 22, 22);
pub const BG_SELECTED: Color32 = Color32::from_rgba_premultiplied(30, 62, 84, 60);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(47, 52, 66);
pub const BORDER_ACCENT: Color32 = Color32::from_rgb(96, 178, 230);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(226, 230, 238);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(150, 158, 176);
pub const TEXT_DIM: Color32 = Color32::from_rgb(98, 106, 124);

// ── Timeline ink ─────────────────────────────────────────────────────────────

pub const ACCENT: Color32 = Color32::from_rgb(58, 150, 214);
pub const DRAFT: Color32 = Color32::from_rgb(242, 153, 44);
pub const TODAY_LINE: Color32 = Color32::from_rgb(232, 86, 86);
pub const GRID_LINE: Color32 = Color32::from_rgb(38, 42, 54);
pub const GUIDE_LINE: Color32 = Color32::from_rgb(58, 64, 80);
pub const HANDLE_COLOR: Color32 = Color32::from_rgb(240, 244, 250);
pub const PROGRESS_OVERLAY: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 64);

pub const ARROW_SCHEDULING: Color32 = Color32::from_rgb(170, 182, 206);
pub const ARROW_INFO: Color32 = Color32::from_rgb(112, 120, 140);
pub const ARROW_PREVIEW: Color32 = Color32::from_rgb(250, 204, 21);

// ── Sizes ────────────────────────────────────────────────────────────────────

pub const HEADER_HEIGHT: f32 = 44.0;
pub const STATUS_BAR_HEIGHT: f32 = 24.0;
pub const SIDE_PANEL_WIDTH: f32 = 260.0;
pub const BAR_ROUNDING: f32 = 4.0;
pub const SUMMARY_ROUNDING: f32 = 1.5;
pub const LINK_HANDLE_RADIUS: f32 = 3.5;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_menu() -> FontId {
    FontId::proportional(13.0)
}

pub fn font_header() -> FontId {
    FontId::proportional(12.0)
}

pub fn font_bar() -> FontId {
    FontId::proportional(11.5)
}

pub fn font_sub() -> FontId {
    FontId::proportional(10.5)
}

pub fn font_small() -> FontId {
    FontId::proportional(9.5)
}

// ── Bar fills ────────────────────────────────────────────────────────────────

/// Fill for a bar. Issue status wins in the order closed, over budget,
/// ad hoc, external.
pub fn bar_fill(bar: &Bar) -> Color32 {
    match bar.kind {
        NodeKind::TimeGroup => Color32::from_rgb(118, 126, 146),
        NodeKind::Project => Color32::from_rgb(46, 160, 120),
        NodeKind::Issue if bar.closed => Color32::from_rgb(92, 110, 128),
        NodeKind::Issue if bar.over_budget => Color32::from_rgb(214, 69, 65),
        NodeKind::Issue if bar.ad_hoc => Color32::from_rgb(20, 170, 190),
        NodeKind::Issue if bar.external => Color32::from_rgb(156, 92, 196),
        NodeKind::Issue => ACCENT,
    }
}

// ── Visuals ──────────────────────────────────────────────────────────────────

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.extreme_bg_color = BG_DARK;
    visuals.faint_bg_color = BG_BAND;
    visuals.striped = false;

    let rounding = Rounding::same(4.0);
    let widgets = &mut visuals.widgets;
    for (state, fill, border) in [
        (&mut widgets.noninteractive, BG_PANEL, BORDER_SUBTLE),
        (&mut widgets.inactive, Color32::from_rgb(39, 43, 55), BORDER_SUBTLE),
        (&mut widgets.hovered, Color32::from_rgb(48, 53, 67), ACCENT),
        (&mut widgets.active, Color32::from_rgb(56, 62, 78), ACCENT),
        (&mut widgets.open, Color32::from_rgb(46, 51, 64), ACCENT),
    ] {
        state.bg_fill = fill;
        state.weak_bg_fill = fill;
        state.bg_stroke = Stroke::new(1.0, border);
        state.rounding = rounding;
    }
    widgets.noninteractive.fg_stroke = Stroke::new(1.0, TEXT_SECONDARY);
    widgets.active.fg_stroke = Stroke::new(2.0, Color32::WHITE);

    visuals.selection.bg_fill = BG_SELECTED;
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);
    visuals.window_rounding = Rounding::same(6.0);
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| {
        style.spacing.item_spacing = egui::vec2(8.0, 4.0);
        style.spacing.button_padding = egui::vec2(8.0, 4.0);
    });
}
