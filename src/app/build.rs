use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, Weekday};
use eframe::egui::{Vec2, vec2};

use crate::domain::Ledger;

use super::geometry::{CanvasConfig, scale_linear};
use super::render_utils::log_fraction;
use super::scene::{SpriteAttrs, SpriteKind};
use super::sim::{NodeKey, NodeSeed};

const CATEGORY_RADIUS_RANGE: (f32, f32) = (15.0, 50.0);

pub struct DayAnchor {
    pub date: NaiveDate,
    pub label: &'static str,
    pub center: Vec2,
    pub radius: f32,
}

pub struct WeekRail {
    pub week: NaiveDate,
    pub y: f32,
}

pub struct DayCell {
    pub date: NaiveDate,
    pub center: Vec2,
    pub total: f64,
    pub color_t: f32,
}

/// Everything one snapshot of the ledger produces for the canvas: simulation
/// seeds plus static backdrop geometry. Links are derived fresh each pass
/// from category membership filtered by the selected week.
pub struct LayoutPass {
    pub seeds: Vec<NodeSeed>,
    pub attrs: Vec<(NodeKey, SpriteAttrs)>,
    pub links: Vec<(NodeKey, NodeKey)>,
    pub day_anchors: Vec<DayAnchor>,
    pub week_rails: Vec<WeekRail>,
    pub day_cells: Vec<DayCell>,
    pub week_count: usize,
}

pub fn build_layout_pass(
    ledger: &Ledger,
    selected_week: NaiveDate,
    cfg: &CanvasConfig,
) -> LayoutPass {
    // distinct weeks in chronological order become row indices
    let weeks = ledger
        .expenses
        .iter()
        .map(|expense| cfg.week_floor(expense.date))
        .collect::<std::collections::BTreeSet<_>>();
    let week_rows: BTreeMap<NaiveDate, usize> = weeks
        .into_iter()
        .enumerate()
        .map(|(row, week)| (week, row))
        .collect();

    let amount_extent = extent(ledger.expenses.iter().map(|expense| expense.amount));

    let mut seeds = Vec::with_capacity(ledger.expenses.len() + ledger.categories.len());
    let mut attrs = Vec::with_capacity(seeds.capacity());

    for expense in &ledger.expenses {
        let week = cfg.week_floor(expense.date);
        let day = cfg.day_index(expense.date);
        let focus = if week == selected_week {
            cfg.fan_position(day)
        } else {
            let row = week_rows.get(&week).copied().unwrap_or(0);
            vec2(cfg.band_x(day), cfg.row_y(row))
        };

        let key = NodeKey::Expense(expense.id);
        seeds.push(NodeSeed {
            key: key.clone(),
            focus,
            radius: cfg.expense_radius,
        });
        attrs.push((
            key,
            SpriteAttrs {
                kind: SpriteKind::Expense,
                label: expense.name.clone(),
                radius: cfg.expense_radius,
                color_t: scale_linear(amount_extent, (0.0, 1.0), expense.amount),
                value: expense.amount,
            },
        ));
    }

    let week_span = Some((selected_week, selected_week + Days::new(7)));
    let totals = ledger
        .categories
        .iter()
        .map(|category| ledger.category_total(&category.name, week_span))
        .collect::<Vec<_>>();
    let totals_extent = extent(totals.iter().copied());

    let mut links = Vec::new();
    for (category, &total) in ledger.categories.iter().zip(&totals) {
        let key = NodeKey::Category(category.name.clone());
        let radius = scale_linear(totals_extent, CATEGORY_RADIUS_RANGE, total);
        seeds.push(NodeSeed {
            key: key.clone(),
            focus: cfg.category_anchor(),
            radius,
        });
        attrs.push((
            key.clone(),
            SpriteAttrs {
                kind: SpriteKind::Category,
                label: category.name.clone(),
                radius,
                color_t: 0.0,
                value: total,
            },
        ));

        for &member_id in &category.member_ids {
            let in_week = ledger
                .expense(member_id)
                .is_some_and(|expense| cfg.week_floor(expense.date) == selected_week);
            if in_week {
                links.push((key.clone(), NodeKey::Expense(member_id)));
            }
        }
    }

    let day_anchors = (0u64..7)
        .map(|offset| {
            let date = selected_week + Days::new(offset);
            DayAnchor {
                date,
                label: weekday_label(cfg, offset as u32),
                center: cfg.fan_position(offset as u32),
                radius: cfg.day_anchor_radius,
            }
        })
        .collect();

    let week_rails = week_rows
        .iter()
        .map(|(&week, &row)| WeekRail {
            week,
            y: cfg.row_y(row),
        })
        .collect();

    let week_count = week_rows.len();
    let day_cells = build_day_cells(ledger, selected_week, cfg, &week_rows);

    LayoutPass {
        seeds,
        attrs,
        links,
        day_anchors,
        week_rails,
        day_cells,
        week_count,
    }
}

fn build_day_cells(
    ledger: &Ledger,
    selected_week: NaiveDate,
    cfg: &CanvasConfig,
    week_rows: &BTreeMap<NaiveDate, usize>,
) -> Vec<DayCell> {
    let mut totals_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for expense in &ledger.expenses {
        *totals_by_day.entry(expense.date).or_insert(0.0) += expense.amount;
    }

    let (min_total, max_total) = extent(totals_by_day.values().copied());
    let strip_top = cfg.strip_top(week_rows.len());

    totals_by_day
        .into_iter()
        .map(|(date, total)| {
            let row = week_rows
                .get(&cfg.week_floor(date))
                .copied()
                .unwrap_or(0);
            DayCell {
                date,
                center: cfg.day_cell_position(date, selected_week, row, strip_top),
                total,
                color_t: log_fraction(total, min_total, max_total),
            }
        })
        .collect()
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for value in values {
        min = min.min(value);
        max = max.max(value);
    }
    if min > max {
        // empty input; callers' scales fall back to their mid-range
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

fn weekday_label(cfg: &CanvasConfig, day_index: u32) -> &'static str {
    let mut day = cfg.week_start;
    for _ in 0..day_index {
        day = day.succ();
    }
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}
