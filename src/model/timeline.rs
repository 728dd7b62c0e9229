use chrono::{Duration, NaiveDate};

/// Controls which ticks the date header draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineScale {
    Days,
    Weeks,
    Months,
}

/// Date axis of the timeline: maps calendar days to horizontal pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineViewport {
    /// The leftmost date (x = 0).
    pub start: NaiveDate,
    /// The last date shown; the axis ends at the right edge of this day.
    pub end: NaiveDate,
    /// Current header scale.
    pub scale: TimelineScale,
    /// Pixels per day (controls zoom level).
    pub pixels_per_day: f32,
}

impl TimelineViewport {
    pub fn new(start: NaiveDate, end: NaiveDate, pixels_per_day: f32) -> Self {
        Self {
            start,
            end: end.max(start),
            scale: TimelineScale::Weeks,
            pixels_per_day,
        }
    }

    /// Viewport covering `[min, max]` with some margin on each side.
    pub fn fit(min: NaiveDate, max: NaiveDate, pixels_per_day: f32) -> Self {
        Self::new(min - Duration::days(7), max + Duration::days(30), pixels_per_day)
    }

    /// Convert a date to an x-pixel offset from the viewport start (left edge of the day).
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        let days = (date - self.start).num_days() as f32;
        days * self.pixels_per_day
    }

    /// Convert an x-pixel offset back to the date whose left edge is nearest.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        let days = (x / self.pixels_per_day).round() as i64;
        self.start + Duration::days(days)
    }

    /// Snap an x offset to the nearest day boundary.
    pub fn snap_x(&self, x: f32) -> f32 {
        (x / self.pixels_per_day).round() * self.pixels_per_day
    }

    /// Whole-day delta for a horizontal pixel delta.
    pub fn days_for_delta(&self, delta_x: f32) -> i64 {
        (delta_x / self.pixels_per_day).round() as i64
    }

    /// Number of days on the axis.
    pub fn total_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Total width in pixels for the visible range.
    pub fn total_width(&self) -> f32 {
        self.total_days() as f32 * self.pixels_per_day
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Zoom in (increase pixels per day), clamped to `max`.
    pub fn zoom_in(&mut self, max: f32) {
        self.pixels_per_day = (self.pixels_per_day * 1.2).min(max);
    }

    /// Zoom out (decrease pixels per day), clamped to `min`.
    pub fn zoom_out(&mut self, min: f32) {
        self.pixels_per_day = (self.pixels_per_day / 1.2).max(min);
    }
}
