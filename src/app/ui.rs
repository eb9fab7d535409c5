use eframe::egui::{self, Slider, Ui};

use super::sim::SimPhase;
use super::{RESTART_WARMTH, ViewModel};

impl ViewModel {
    pub(in crate::app) fn show_controls(
        &mut self,
        ui: &mut Ui,
        reload_requested: &mut bool,
        is_reloading: bool,
    ) {
        ui.heading("Expense canvas");
        ui.add_space(4.0);
        ui.label(format!(
            "{} expenses, {} categories, {} nodes",
            self.ledger.expenses.len(),
            self.ledger.categories.len(),
            self.scene.len()
        ));

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("\u{2190} week").clicked() {
                self.step_week(-1);
            }
            ui.label(self.selected_week.format("week of %m/%d").to_string());
            if ui.button("week \u{2192}").clicked() {
                self.step_week(1);
            }
        });

        ui.separator();
        ui.label("New category");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.new_category_name);
            if ui.button("Add").clicked() {
                self.add_category();
            }
        });

        ui.separator();
        ui.label("Layout");
        let mut row_height = self.cfg.row_height;
        if ui
            .add(Slider::new(&mut row_height, 100.0..=250.0).text("row height"))
            .changed()
        {
            self.cfg.row_height = row_height;
            self.snapshot_dirty = true;
        }

        {
            let config = self.sim.config_mut();
            ui.add(Slider::new(&mut config.spring_strength, 0.01..=0.3).text("spring strength"));
            ui.add(Slider::new(&mut config.velocity_damping, 0.05..=0.9).text("velocity damping"));
            ui.add(
                Slider::new(&mut config.temperature_decay, 0.005..=0.2)
                    .text("temperature decay"),
            );
            ui.add(
                Slider::new(&mut config.collision_padding, 0.0..=20.0)
                    .text("collision padding"),
            );
        }

        if ui.button("Re-run layout").clicked() {
            self.sim.restart(RESTART_WARMTH);
        }

        ui.separator();
        let phase = match self.sim.phase() {
            SimPhase::Cold => "cold".to_owned(),
            SimPhase::Running => format!("running (t = {:.3})", self.sim.temperature()),
            SimPhase::Settled => "settled".to_owned(),
        };
        ui.label(format!("simulation: {phase}"));

        if ui
            .add_enabled(!is_reloading, egui::Button::new("Reload data"))
            .clicked()
        {
            *reload_requested = true;
        }
        if is_reloading {
            ui.spinner();
        }

        if let Some(status) = &self.status {
            ui.separator();
            ui.label(status);
        }
    }
}
