use std::f32::consts::PI;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use eframe::egui::{Vec2, vec2};

/// Geometry constants for the canvas. Focus positions are pure functions of
/// these plus the grouping inputs (date, selected week, membership); nothing
/// downstream is allowed to hand-adjust a focus.
#[derive(Clone, Copy, Debug)]
pub struct CanvasConfig {
    pub width: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Vertical center of the selected-week fan.
    pub top_margin: f32,
    /// Where the weekly rows begin, below the fan region.
    pub rows_top: f32,
    pub row_height: f32,
    pub expense_radius: f32,
    pub day_anchor_radius: f32,
    /// Half-size of a calendar strip day cell.
    pub day_cell_width: f32,
    pub day_cell_height: f32,
    /// First day of the week used for flooring and band indexing.
    pub week_start: Weekday,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 900.0,
            margin_left: 40.0,
            margin_right: 40.0,
            top_margin: 25.0,
            rows_top: 600.0,
            row_height: 150.0,
            expense_radius: 10.0,
            day_anchor_radius: 80.0,
            day_cell_width: 55.0,
            day_cell_height: 75.0,
            week_start: Weekday::Sun,
        }
    }
}

impl CanvasConfig {
    /// 0..=6, distance from the configured week start.
    pub fn day_index(&self, date: NaiveDate) -> u32 {
        date.weekday().days_since(self.week_start)
    }

    /// The week a date belongs to, represented by its first day.
    pub fn week_floor(&self, date: NaiveDate) -> NaiveDate {
        date - Days::new(u64::from(self.day_index(date)))
    }

    fn inner_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Center of the weekday's band, 7 equal bands across the inner width.
    pub fn band_x(&self, day_index: u32) -> f32 {
        let band = self.inner_width() / 7.0;
        self.margin_left + (day_index.min(6) as f32 + 0.5) * band
    }

    pub fn row_y(&self, row_index: usize) -> f32 {
        self.rows_top + row_index as f32 * self.row_height
    }

    pub fn fan_radius(&self) -> f32 {
        self.inner_width() / 2.0
    }

    /// Angle of a day on the selected-week semicircle: 30 degree steps from
    /// pi down to 0 across the seven days.
    pub fn fan_angle(&self, day_index: u32) -> f32 {
        PI - (PI / 6.0) * day_index.min(6) as f32
    }

    pub fn fan_position(&self, day_index: u32) -> Vec2 {
        let angle = self.fan_angle(day_index);
        let radius = self.fan_radius();
        vec2(
            radius * angle.cos() + self.width / 2.0,
            radius * angle.sin() + self.top_margin,
        )
    }

    /// Fixed anchor region for category nodes: canvas center, upper third of
    /// the fan region.
    pub fn category_anchor(&self) -> Vec2 {
        vec2(self.width / 2.0, self.rows_top / 4.0)
    }

    /// Calendar strip cell position. Days inside the selected week are lifted
    /// into a curve symmetric around midweek; the rest sit in flat rows.
    pub fn day_cell_position(
        &self,
        date: NaiveDate,
        selected_week: NaiveDate,
        row_index: usize,
        strip_top: f32,
    ) -> Vec2 {
        let day = self.day_index(date);
        let x = self.band_x(day);

        if self.week_floor(date) == selected_week {
            let offset = (3.0 - day as f32).abs();
            let y = strip_top + self.day_cell_height - 0.5 * offset * self.day_cell_height;
            vec2(x, y)
        } else {
            let y = strip_top
                + 4.0 * self.day_cell_height
                + row_index as f32 * 2.0 * self.day_cell_height;
            vec2(x, y)
        }
    }

    pub fn strip_top(&self, week_count: usize) -> f32 {
        self.row_y(week_count.max(1)) + self.row_height / 2.0
    }

    pub fn canvas_height(&self, week_count: usize) -> f32 {
        let weeks = week_count.max(1);
        self.strip_top(weeks) + (4.0 + 2.0 * weeks as f32) * self.day_cell_height
    }
}

/// Linear scale with a degenerate-domain fallback: an empty or single-value
/// span maps to the middle of the range instead of dividing by zero.
pub fn scale_linear(domain: (f64, f64), range: (f32, f32), value: f64) -> f32 {
    let span = domain.1 - domain.0;
    if !span.is_finite() || span.abs() < f64::EPSILON {
        return (range.0 + range.1) / 2.0;
    }
    let t = ((value - domain.0) / span).clamp(0.0, 1.0) as f32;
    range.0 + (range.1 - range.0) * t
}
