//! Engine configuration.
//!
//! Every knob of the layout, bar, arrow and interaction behaviour is captured
//! in [`TimelineConfig`]. The file is JSON and every section carries
//! `#[serde(default)]`, so a partial file is valid: missing keys fall back to
//! the built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};
use crate::model::NodeKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub layout: LayoutConfig,
    pub bars: BarConfig,
    pub arrows: ArrowConfig,
    pub interaction: InteractionConfig,
    pub zoom: ZoomConfig,
}

// ─── Layout ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Height of an issue or project row.
    pub row_height: f32,
    /// Height of a time-group header row.
    pub group_row_height: f32,
    /// Horizontal indent per tree depth, used for indent guides.
    pub indent_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_height: 30.0,
            group_row_height: 26.0,
            indent_width: 14.0,
        }
    }
}

impl LayoutConfig {
    pub fn row_height_for(&self, kind: NodeKind) -> f32 {
        match kind {
            NodeKind::TimeGroup => self.group_row_height,
            NodeKind::Project | NodeKind::Issue => self.row_height,
        }
    }
}

// ─── Bars ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Bar height; bars are vertically centred in their row.
    pub bar_height: f32,
    pub min_bar_width: f32,
    /// Gap between a bar and its label.
    pub label_gap: f32,
    /// Approximate width of one label character, for overflow checks.
    pub label_char_width: f32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            bar_height: 20.0,
            min_bar_width: 6.0,
            label_gap: 6.0,
            label_char_width: 6.5,
        }
    }
}

// ─── Arrows ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowConfig {
    pub corner_radius: f32,
    /// Horizontal run an arrow takes before its first turn.
    pub jog: f32,
    /// Below this horizontal room a single switchback does not fit.
    pub narrow_threshold: f32,
    pub head_size: f32,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            corner_radius: 4.0,
            jog: 10.0,
            narrow_threshold: 20.0,
            head_size: 5.0,
        }
    }
}

// ─── Interaction ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Queue edits instead of sending them immediately.
    pub draft_mode: bool,
    /// Ask before sending date changes.
    pub confirm_date_changes: bool,
    pub history_limit: usize,
    /// Grab width of the resize handles on either bar edge.
    pub handle_width: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            draft_mode: false,
            confirm_date_changes: true,
            history_limit: 100,
            handle_width: 5.0,
        }
    }
}

// ─── Zoom ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub default_pixels_per_day: f32,
    pub min_pixels_per_day: f32,
    pub max_pixels_per_day: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            default_pixels_per_day: 18.0,
            min_pixels_per_day: 2.0,
            max_pixels_per_day: 80.0,
        }
    }
}

impl TimelineConfig {
    /// Reject values the layout math cannot work with.
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        if layout.row_height <= 0.0 || layout.group_row_height <= 0.0 {
            return Err(TimelineError::InvalidConfig(
                "row heights must be positive".into(),
            ));
        }
        if self.bars.bar_height <= 0.0 || self.bars.bar_height > layout.row_height {
            return Err(TimelineError::InvalidConfig(format!(
                "bar height {} must be positive and fit in a {} px row",
                self.bars.bar_height, layout.row_height
            )));
        }
        let zoom = &self.zoom;
        if zoom.min_pixels_per_day <= 0.0
            || zoom.min_pixels_per_day > zoom.max_pixels_per_day
            || !(zoom.min_pixels_per_day..=zoom.max_pixels_per_day)
                .contains(&zoom.default_pixels_per_day)
        {
            return Err(TimelineError::InvalidConfig(format!(
                "default zoom {} outside [{}, {}]",
                zoom.default_pixels_per_day, zoom.min_pixels_per_day, zoom.max_pixels_per_day
            )));
        }
        let arrows = &self.arrows;
        if arrows.corner_radius < 0.0 || arrows.jog < 0.0 || arrows.head_size < 0.0 {
            return Err(TimelineError::InvalidConfig(
                "arrow radius, jog and head size must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from the user config directory, writing a reference file on
    /// first run. Falls back to defaults when the file is unreadable.
    pub fn load_or_init(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!("could not create config dir {:?}: {}", dir, e);
            }
            if let Err(e) = Self::default().save(&path) {
                tracing::warn!("could not write reference config {:?}: {}", path, e);
            }
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

pub const CONFIG_FILE: &str = "config.json";
pub const COLLAPSE_STATE_FILE: &str = "collapse_state.json";

/// OS config directory for the viewer, or `.` when none is available.
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "GanttTimeline")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: TimelineConfig =
            serde_json::from_str(r#"{ "layout": { "row_height": 24.0 } }"#).unwrap();
        assert_eq!(config.layout.row_height, 24.0);
        assert_eq!(config.layout.group_row_height, LayoutConfig::default().group_row_height);
        assert_eq!(config.arrows, ArrowConfig::default());
    }

    #[test]
    fn defaults_are_valid() {
        TimelineConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_row_height() {
        let mut config = TimelineConfig::default();
        config.layout.row_height = 0.0;
        assert!(matches!(config.validate(), Err(TimelineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_default_zoom_outside_bounds() {
        let mut config = TimelineConfig::default();
        config.zoom.default_pixels_per_day = 500.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_or_init_writes_reference_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TimelineConfig::load_or_init(dir.path());
        assert_eq!(config, TimelineConfig::default());
        assert!(dir.path().join(CONFIG_FILE).exists());

        let mut custom = TimelineConfig::default();
        custom.interaction.draft_mode = true;
        custom.save(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(TimelineConfig::load_or_init(dir.path()).interaction.draft_mode);
    }

    #[test]
    fn load_or_init_survives_an_uncreatable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "x").unwrap();
        let nested = blocker.join("gantt");
        assert_eq!(TimelineConfig::load_or_init(&nested), TimelineConfig::default());
        assert!(!nested.exists());
    }
}
