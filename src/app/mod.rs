use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use chrono::{Days, NaiveDate};
use eframe::egui::{self, Context};

use crate::domain::{Ledger, load_ledger};

mod build;
mod drag;
mod geometry;
mod render_utils;
mod scene;
mod sim;
mod ui;
mod view;

use build::{DayAnchor, DayCell, LayoutPass, WeekRail, build_layout_pass};
use drag::{DragController, DropZone, MutationRequest};
use geometry::CanvasConfig;
use scene::{RenderInstruction, SceneSet, SpriteAttrs, reconcile};
use sim::{NodeKey, SimConfig, Simulation};

const RESTART_WARMTH: f32 = 0.9;

pub struct ExpenseCanvasApp {
    data_path: String,
    state: AppState,
    reload_rx: Option<Receiver<Result<Ledger, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Ledger, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

/// One view's worth of state. The simulation, reconciler, and drag controller
/// are owned here and passed around explicitly; nothing lives in module-level
/// statics.
struct ViewModel {
    ledger: Ledger,
    cfg: CanvasConfig,
    selected_week: NaiveDate,
    sim: Simulation,
    drag: DragController,
    scene: SceneSet,
    links: Vec<(NodeKey, NodeKey)>,
    day_anchors: Vec<DayAnchor>,
    week_rails: Vec<WeekRail>,
    day_cells: Vec<DayCell>,
    week_count: usize,
    snapshot_dirty: bool,
    new_category_name: String,
    status: Option<String>,
}

impl ViewModel {
    fn new(ledger: Ledger) -> Self {
        let cfg = CanvasConfig::default();
        let selected_week = ledger
            .date_extent()
            .map(|(_, latest)| cfg.week_floor(latest))
            .unwrap_or_else(|| cfg.week_floor(chrono::Local::now().date_naive()));

        let sim = Simulation::new(SimConfig {
            seed_bounds: eframe::egui::vec2(cfg.width, cfg.rows_top),
            ..SimConfig::default()
        });

        Self {
            ledger,
            cfg,
            selected_week,
            sim,
            drag: DragController::new(),
            scene: SceneSet::default(),
            links: Vec::new(),
            day_anchors: Vec::new(),
            week_rails: Vec::new(),
            day_cells: Vec::new(),
            week_count: 0,
            snapshot_dirty: true,
            new_category_name: String::new(),
            status: None,
        }
    }

    /// Snapshot -> geometry -> reconcile -> configure -> restart. Called
    /// deterministically whenever the ledger or grouping inputs change, never
    /// as a rendering side effect.
    fn rebuild_pass(&mut self) {
        let pass = build_layout_pass(&self.ledger, self.selected_week, &self.cfg);
        if let Err(error) = self.apply_pass(pass) {
            log::error!("layout pass rejected: {error:#}");
            self.status = Some(format!("layout pass rejected: {error}"));
        }
        self.snapshot_dirty = false;
    }

    fn apply_pass(&mut self, pass: LayoutPass) -> anyhow::Result<()> {
        let next_keys = pass
            .seeds
            .iter()
            .map(|seed| seed.key.clone())
            .collect::<Vec<_>>();
        let diff = reconcile(self.scene.keys(), &next_keys)?;

        self.sim.configure(pass.seeds)?;
        self.drag.after_configure(&mut self.sim);

        let attrs_by_key: HashMap<NodeKey, SpriteAttrs> = pass.attrs.into_iter().collect();
        let entering: HashSet<&NodeKey> = diff.enter.iter().collect();

        let mut instructions = Vec::with_capacity(next_keys.len() + diff.exit.len());
        for key in &next_keys {
            let (Some(node), Some(attrs)) = (self.sim.node(key), attrs_by_key.get(key)) else {
                continue;
            };
            let instruction = if entering.contains(key) {
                RenderInstruction::Enter {
                    key: key.clone(),
                    pos: node.pos,
                    attrs: attrs.clone(),
                }
            } else {
                RenderInstruction::Update {
                    key: key.clone(),
                    pos: node.pos,
                    attrs: attrs.clone(),
                }
            };
            instructions.push(instruction);
        }
        for key in diff.exit {
            instructions.push(RenderInstruction::Exit { key });
        }
        self.scene.apply(&instructions);

        if let Some(subject) = self.drag.subject() {
            let subject = subject.clone();
            self.scene.set_highlight(&subject, true);
        }

        self.links = pass.links;
        self.day_anchors = pass.day_anchors;
        self.week_rails = pass.week_rails;
        self.day_cells = pass.day_cells;
        self.week_count = pass.week_count;

        self.sim.restart(RESTART_WARMTH);
        Ok(())
    }

    /// Applies a mutation requested by a completed drag gesture. A failed
    /// commit is dropped with a report; the node has already unpinned and
    /// resettles under normal forces.
    fn commit(&mut self, request: MutationRequest) {
        let result = match &request {
            MutationRequest::LinkToCategory {
                expense_id,
                category,
            } => self
                .ledger
                .link_to_category(*expense_id, category)
                .map(|linked| {
                    let count = self
                        .ledger
                        .expense(*expense_id)
                        .map_or(0, |expense| expense.category_count);
                    if linked {
                        format!("linked expense {expense_id} to {category:?} (in {count} categories)")
                    } else {
                        format!("unlinked expense {expense_id} from {category:?} (in {count} categories)")
                    }
                }),
            MutationRequest::RescheduleExpense {
                expense_id,
                new_date,
            } => self
                .ledger
                .reschedule_expense(*expense_id, *new_date)
                .map(|()| format!("rescheduled expense {expense_id} to {new_date}")),
        };

        match result {
            Ok(message) => {
                self.status = Some(message);
                self.snapshot_dirty = true;
            }
            Err(error) => {
                log::warn!("drag commit dropped: {error:#}");
                self.status = Some(format!("change dropped: {error}"));
            }
        }
    }

    fn week_extent(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.ledger
            .date_extent()
            .map(|(earliest, latest)| (self.cfg.week_floor(earliest), self.cfg.week_floor(latest)))
    }

    /// Period navigation, clamped to the data's first and last week. Stepping
    /// away mid-gesture abandons the drag.
    fn step_week(&mut self, weeks: i64) {
        let Some((first, last)) = self.week_extent() else {
            return;
        };

        let stepped = if weeks >= 0 {
            self.selected_week + Days::new(weeks.unsigned_abs() * 7)
        } else {
            self.selected_week - Days::new(weeks.unsigned_abs() * 7)
        };
        let clamped = stepped.clamp(first, last);

        if clamped != self.selected_week {
            self.drag.cancel(&mut self.sim);
            self.selected_week = clamped;
            self.snapshot_dirty = true;
        }
    }

    fn add_category(&mut self) {
        let name = self.new_category_name.trim().to_owned();
        match self.ledger.add_category(&name) {
            Ok(()) => {
                self.new_category_name.clear();
                self.status = Some(format!("added category {name:?}"));
                self.snapshot_dirty = true;
            }
            Err(error) => self.status = Some(error.to_string()),
        }
    }

    /// Candidate drop-zone geometry for the current frame: category circles
    /// at their live simulated positions plus the selected week's day
    /// anchors.
    fn drop_zones(&self) -> Vec<DropZone> {
        let mut zones = self
            .sim
            .nodes()
            .iter()
            .filter_map(|node| match &node.key {
                NodeKey::Category(name) => Some(DropZone::Category {
                    name: name.clone(),
                    center: node.pos,
                    radius: node.radius,
                }),
                NodeKey::Expense(_) => None,
            })
            .collect::<Vec<_>>();

        zones.extend(self.day_anchors.iter().map(|anchor| DropZone::Day {
            date: anchor.date,
            center: anchor.center,
            radius: anchor.radius,
        }));
        zones
    }

    fn show(&mut self, ctx: &Context, reload_requested: &mut bool, is_reloading: bool) {
        if self.snapshot_dirty {
            self.rebuild_pass();
        }

        egui::SidePanel::left("controls")
            .default_width(270.0)
            .show(ctx, |ui| {
                self.show_controls(ui, reload_requested, is_reloading);
            });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_canvas(ui);
        });
    }
}

impl ExpenseCanvasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, data_path: String) -> Self {
        let state = Self::start_load(data_path.clone());
        Self {
            data_path,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(data_path: String) -> Receiver<Result<Ledger, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_ledger(&data_path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_path: String) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(data_path),
        }
    }
}

impl eframe::App for ExpenseCanvasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(ledger) => AppState::Ready(Box::new(ViewModel::new(ledger))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading expenses...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load expense data");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.data_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.data_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(match result {
                                Ok(ledger) => AppState::Ready(Box::new(ViewModel::new(ledger))),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Expense;
    use chrono::Weekday;
    use std::f32::consts::PI;

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    fn expense(id: u64, amount: f64, day: &str) -> Expense {
        Expense {
            id,
            name: format!("expense-{id}"),
            amount,
            date: date(day),
            category_count: 0,
        }
    }

    fn scenario_model() -> ViewModel {
        // Monday, Tuesday, Wednesday of the week of 2018-01-01
        let mut ledger = Ledger::new(vec![
            expense(0, 10.0, "2018-01-01"),
            expense(1, 20.0, "2018-01-02"),
            expense(2, 30.0, "2018-01-03"),
        ]);
        ledger.add_category("Food").unwrap();

        let mut model = ViewModel::new(ledger);
        model.cfg.week_start = Weekday::Mon;
        model.selected_week = date("2018-01-01");
        model.rebuild_pass();
        model
    }

    #[test]
    fn drag_onto_category_links_and_recomputes_total() {
        let mut model = scenario_model();

        // one pass: three expense nodes plus one category node
        assert_eq!(model.scene.len(), 4);
        let food_key = NodeKey::Category("Food".to_owned());
        assert_eq!(model.scene.sprite(&food_key).unwrap().attrs.value, 0.0);

        // fan-out: Monday/Tuesday/Wednesday at pi, pi - 30deg, pi - 60deg
        for (id, steps) in [(0u64, 0u32), (1, 1), (2, 2)] {
            let focus = model.sim.node(&NodeKey::Expense(id)).unwrap().focus;
            let expected = model.cfg.fan_position(steps);
            assert!((focus - expected).length() < 1e-3);
            assert!((model.cfg.fan_angle(steps) - (PI - steps as f32 * PI / 6.0)).abs() < 1e-6);
        }

        // drag the Wednesday node onto the category circle and release
        let start = model.sim.node(&NodeKey::Expense(2)).unwrap().pos;
        assert!(model.drag.pointer_down(NodeKey::Expense(2), start, &mut model.sim));
        let target = model.sim.node(&food_key).unwrap().pos;
        let zones = model.drop_zones();
        model.drag.pointer_move(target, &zones, &mut model.sim);
        let request = model.drag.pointer_up(&mut model.sim).unwrap();

        assert_eq!(
            request,
            MutationRequest::LinkToCategory {
                expense_id: 2,
                category: "Food".to_owned(),
            }
        );

        model.commit(request);
        assert!(model.snapshot_dirty);
        model.rebuild_pass();

        assert_eq!(model.scene.sprite(&food_key).unwrap().attrs.value, 30.0);
        assert_eq!(model.links.len(), 1);
    }

    #[test]
    fn failed_commit_is_reported_not_fatal() {
        let mut model = scenario_model();

        model.commit(MutationRequest::LinkToCategory {
            expense_id: 2,
            category: "Rent".to_owned(),
        });

        assert!(!model.snapshot_dirty);
        let status = model.status.as_deref().unwrap();
        assert!(status.contains("dropped"), "unexpected status: {status}");
    }

    #[test]
    fn week_navigation_clamps_to_data_extent() {
        let mut ledger = Ledger::new(vec![
            expense(0, 1.0, "2018-01-01"),
            expense(1, 1.0, "2018-01-15"),
        ]);
        ledger.add_category("Food").unwrap();
        let mut model = ViewModel::new(ledger);
        model.cfg.week_start = Weekday::Mon;
        model.selected_week = date("2018-01-15");
        model.rebuild_pass();

        model.step_week(5);
        assert_eq!(model.selected_week, date("2018-01-15"));

        model.step_week(-1);
        assert_eq!(model.selected_week, date("2018-01-08"));

        model.step_week(-10);
        assert_eq!(model.selected_week, date("2018-01-01"));
    }

    #[test]
    fn navigation_mid_drag_cancels_the_gesture() {
        let mut ledger = Ledger::new(vec![
            expense(0, 1.0, "2018-01-01"),
            expense(1, 1.0, "2018-01-15"),
        ]);
        ledger.add_category("Food").unwrap();
        let mut model = ViewModel::new(ledger);
        model.cfg.week_start = Weekday::Mon;
        model.selected_week = date("2018-01-15");
        model.rebuild_pass();

        let start = model.sim.node(&NodeKey::Expense(0)).unwrap().pos;
        assert!(model.drag.pointer_down(NodeKey::Expense(0), start, &mut model.sim));
        model.step_week(-1);

        assert!(!model.drag.is_dragging());
        assert!(
            model
                .sim
                .node(&NodeKey::Expense(0))
                .unwrap()
                .pinned
                .is_none()
        );
    }

    #[test]
    fn reconfigure_preserves_scene_positions_for_surviving_keys() {
        let mut model = scenario_model();
        model.sim.restart(0.9);
        for _ in 0..30 {
            model.sim.tick();
        }
        let settled_pos = model.sim.node(&NodeKey::Expense(1)).unwrap().pos;

        model.snapshot_dirty = true;
        model.rebuild_pass();

        assert_eq!(model.sim.node(&NodeKey::Expense(1)).unwrap().pos, settled_pos);
        assert_eq!(model.scene.sprite(&NodeKey::Expense(1)).unwrap().pos, settled_pos);
    }
}
