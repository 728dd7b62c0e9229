//! Renderer-facing side of the engine.
//!
//! The engine owns the authoritative [`Scene`]; a renderer only receives
//! notifications. A full refresh hands it the whole scene once, everything
//! after that arrives as `(id, geometry)` updates.

use crate::layout::positioning::Layout;
use crate::layout::route::ArrowPath;
use crate::layout::scene::{BarGeometry, Label, Scene};
use crate::model::CollapseKey;

#[derive(Debug, Clone, PartialEq)]
pub enum SceneUpdate {
    Row {
        key: CollapseKey,
        y: f32,
        visible: bool,
    },
    Bar {
        key: CollapseKey,
        geometry: BarGeometry,
        label: Label,
        visible: bool,
    },
    Band {
        index: usize,
        y: f32,
        height: f32,
        visible: bool,
        odd: bool,
    },
    Guide {
        index: usize,
        y_top: f32,
        y_bottom: f32,
        visible: bool,
    },
    Arrow {
        index: usize,
        path: ArrowPath,
        visible: bool,
    },
    LinkPreview(Option<ArrowPath>),
    Scroll {
        x: f32,
        y: f32,
    },
}

impl SceneUpdate {
    /// Row key for row and bar updates.
    pub fn key(&self) -> Option<&CollapseKey> {
        match self {
            SceneUpdate::Row { key, .. } | SceneUpdate::Bar { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Where scene changes are sent.
pub trait RenderSink {
    /// A full refresh produced a new scene.
    fn replace_scene(&mut self, layout: &Layout, scene: &Scene);

    /// One element changed in place.
    fn apply(&mut self, update: SceneUpdate);
}

/// Sink for hosts that paint straight from the session every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn replace_scene(&mut self, _layout: &Layout, _scene: &Scene) {}

    fn apply(&mut self, _update: SceneUpdate) {}
}
