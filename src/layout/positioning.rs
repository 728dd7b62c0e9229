//! Vertical positioning, shade bands and indent guides.

use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::model::CollapseKey;

use super::flatten::Row;

/// Heights each row contributes to one shade band. Hidden rows contribute 0,
/// so the values always add up to the band's rendered height.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZebraContribution {
    entries: BTreeMap<CollapseKey, f32>,
}

impl ZebraContribution {
    pub fn get(&self, key: &CollapseKey) -> Option<f32> {
        self.entries.get(key).copied()
    }

    /// Set a row's contribution, returning the change in band height.
    /// Returns `None` for a key the band does not own.
    pub fn set(&mut self, key: &CollapseKey, height: f32) -> Option<f32> {
        let slot = self.entries.get_mut(key)?;
        let diff = height - *slot;
        *slot = height;
        Some(diff)
    }

    pub fn total(&self) -> f32 {
        self.entries.values().sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: CollapseKey, height: f32) {
        self.entries.insert(key, height);
    }
}

/// A maximal run of rows sharing a group identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadeBand {
    pub group_key: CollapseKey,
    pub first_row: usize,
    /// Inclusive.
    pub last_row: usize,
    pub y: f32,
    pub height: f32,
    pub visible: bool,
    /// Alternating shade among visible bands.
    pub odd: bool,
    pub contributions: ZebraContribution,
}

/// Vertical tree line from a parent row down through its visible descendants.
#[derive(Debug, Clone, PartialEq)]
pub struct IndentGuide {
    pub owner: CollapseKey,
    pub row: usize,
    pub x: f32,
    pub y_top: f32,
    pub y_bottom: f32,
    pub visible: bool,
}

/// Positioned rows with every index the incremental updater relies on.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub rows: Vec<Row>,
    pub bands: Vec<ShadeBand>,
    pub guides: Vec<IndentGuide>,
    pub row_index: HashMap<CollapseKey, usize>,
    /// Band index for every row.
    pub band_of_row: Vec<usize>,
    pub guide_of_row: HashMap<usize, usize>,
    /// Sum of every row height, visible or hidden.
    pub reserved_height: f32,
    /// Height of the visible rows.
    pub content_height: f32,
}

impl Layout {
    /// Assign heights and positions to freshly flattened rows.
    pub fn build(mut rows: Vec<Row>, config: &LayoutConfig) -> Self {
        let mut cursor = 0.0_f32;
        let mut reserved = 0.0_f32;
        for row in rows.iter_mut() {
            row.height = config.row_height_for(row.kind);
            row.original_y = cursor;
            row.current_y = cursor;
            reserved += row.height;
            if row.is_visible {
                cursor += row.height;
            }
        }

        let row_index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.collapse_key.clone(), i))
            .collect();

        let mut layout = Self {
            rows,
            bands: Vec::new(),
            guides: Vec::new(),
            row_index,
            band_of_row: Vec::new(),
            guide_of_row: HashMap::new(),
            reserved_height: reserved,
            content_height: cursor,
        };
        layout.build_bands();
        layout.build_guides(config.indent_width);
        layout
    }

    fn build_bands(&mut self) {
        let mut bands: Vec<ShadeBand> = Vec::new();
        let mut band_of_row = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let contributed = if row.is_visible { row.height } else { 0.0 };
            match bands.last_mut() {
                Some(band) if band.group_key == row.group_key => {
                    band.last_row = i;
                    band.height += contributed;
                    band.contributions.insert(row.collapse_key.clone(), contributed);
                }
                _ => {
                    let mut contributions = ZebraContribution::default();
                    contributions.insert(row.collapse_key.clone(), contributed);
                    bands.push(ShadeBand {
                        group_key: row.group_key.clone(),
                        first_row: i,
                        last_row: i,
                        y: row.current_y,
                        height: contributed,
                        visible: false,
                        odd: false,
                        contributions,
                    });
                }
            }
            band_of_row.push(bands.len() - 1);
        }
        for band in bands.iter_mut() {
            band.visible = band.height > 0.0;
        }
        self.bands = bands;
        self.band_of_row = band_of_row;
        self.realternate_bands();
    }

    fn build_guides(&mut self, indent_width: f32) {
        for i in 0..self.rows.len() {
            let row = &self.rows[i];
            if !row.has_children {
                continue;
            }
            let x = row.depth as f32 * indent_width + indent_width / 2.0;
            let guide = IndentGuide {
                owner: row.collapse_key.clone(),
                row: i,
                x,
                y_top: row.bottom(),
                y_bottom: row.bottom() + self.visible_extent(i),
                visible: row.is_visible && row.is_expanded,
            };
            self.guide_of_row.insert(i, self.guides.len());
            self.guides.push(guide);
        }
    }

    /// Height of the visible descendants of row `index`.
    pub fn visible_extent(&self, index: usize) -> f32 {
        self.rows[index]
            .descendants(index)
            .filter(|&i| self.rows[i].is_visible)
            .map(|i| self.rows[i].height)
            .sum()
    }

    /// Give visible bands alternating shades in Y order.
    pub fn realternate_bands(&mut self) {
        let mut order: Vec<usize> = (0..self.bands.len())
            .filter(|&b| self.bands[b].visible)
            .collect();
        order.sort_by(|&a, &b| {
            self.bands[a]
                .y
                .total_cmp(&self.bands[b].y)
                .then(a.cmp(&b))
        });
        for (n, b) in order.into_iter().enumerate() {
            self.bands[b].odd = n % 2 == 1;
        }
    }

    pub fn index_of(&self, key: &CollapseKey) -> Option<usize> {
        self.row_index.get(key).copied()
    }

    pub fn row(&self, key: &CollapseKey) -> Option<&Row> {
        self.index_of(key).map(|i| &self.rows[i])
    }
}
