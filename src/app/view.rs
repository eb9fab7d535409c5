use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, vec2};

use crate::util::format_amount;

use super::ViewModel;
use super::render_utils::{day_color, expense_color, with_alpha};
use super::scene::SpriteKind;
use super::sim::{NodeKey, SimPhase};

impl ViewModel {
    pub(in crate::app) fn show_canvas(&mut self, ui: &mut Ui) {
        egui::ScrollArea::both().show(ui, |ui| {
            let size = vec2(self.cfg.width, self.cfg.canvas_height(self.week_count));
            let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
            let origin = response.rect.min;

            // Advance the simulation once per frame and stream the resulting
            // positions into the scene before any hit-testing reads them.
            if self.sim.phase() == SimPhase::Running {
                self.sim.tick();
                let positions = self
                    .sim
                    .nodes()
                    .iter()
                    .map(|node| (node.key.clone(), node.pos))
                    .collect::<Vec<_>>();
                for (key, pos) in positions {
                    self.scene.update_position(&key, pos);
                }
                ui.ctx().request_repaint();
            }

            self.handle_pointer(&response, origin);
            self.paint(&painter, origin, size);
        });
    }

    fn handle_pointer(&mut self, response: &egui::Response, origin: Pos2) {
        let pointer = response.interact_pointer_pos();

        if response.drag_started() {
            if let Some(pos) = pointer
                && let Some(key) = self.expense_under(pos - origin)
                && self.drag.pointer_down(key.clone(), pos - origin, &mut self.sim)
            {
                self.scene.set_highlight(&key, true);
            }
        } else if response.dragged() {
            if self.drag.is_dragging()
                && let Some(pos) = pointer
            {
                let canvas = pos - origin;
                let zones = self.drop_zones();
                self.drag.pointer_move(canvas, &zones, &mut self.sim);
                if let Some(subject) = self.drag.subject() {
                    let subject = subject.clone();
                    self.scene.update_position(&subject, canvas);
                }
            }
        } else if response.drag_stopped() && self.drag.is_dragging() {
            let subject = self.drag.subject().cloned();
            let request = self.drag.pointer_up(&mut self.sim);
            if let Some(subject) = subject {
                self.scene.set_highlight(&subject, false);
            }

            // with no match the node just resettles under normal forces
            self.sim.restart(super::drag::DRAG_WARMTH);
            if let Some(request) = request {
                self.commit(request);
            }
        }
    }

    fn expense_under(&self, canvas: Vec2) -> Option<NodeKey> {
        self.sim
            .nodes()
            .iter()
            .filter(|node| matches!(node.key, NodeKey::Expense(_)))
            .filter_map(|node| {
                let distance = (node.pos - canvas).length();
                // a small grab slop makes tiny circles draggable
                (distance <= node.radius + 4.0).then_some((node.key.clone(), distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| key)
    }

    fn paint(&self, painter: &egui::Painter, origin: Pos2, size: Vec2) {
        let at = |v: Vec2| origin + v;

        painter.rect_filled(
            Rect::from_min_size(origin, size),
            0.0,
            Color32::from_rgb(252, 252, 250),
        );

        for rail in &self.week_rails {
            let inner = self.cfg.width - self.cfg.margin_left - self.cfg.margin_right;
            painter.rect_filled(
                Rect::from_min_size(
                    at(vec2(self.cfg.margin_left, rail.y - 5.0)),
                    vec2(inner, 10.0),
                ),
                0.0,
                with_alpha(Color32::from_gray(204), 64),
            );
            painter.text(
                at(vec2(self.cfg.margin_left - 6.0, rail.y)),
                Align2::RIGHT_CENTER,
                rail.week.format("%m/%d"),
                FontId::proportional(12.0),
                Color32::from_gray(130),
            );
        }

        for anchor in &self.day_anchors {
            painter.circle_filled(
                at(anchor.center),
                anchor.radius,
                with_alpha(Color32::from_gray(204), 64),
            );
            painter.text(
                at(anchor.center + vec2(0.0, anchor.radius + 14.0)),
                Align2::CENTER_CENTER,
                anchor.label,
                FontId::proportional(12.0),
                Color32::from_gray(150),
            );
        }

        for cell in &self.day_cells {
            let rect = Rect::from_center_size(
                at(cell.center),
                vec2(
                    2.0 * self.cfg.day_cell_width,
                    2.0 * self.cfg.day_cell_height,
                ),
            );
            painter.rect_filled(rect, 4.0, day_color(cell.color_t));
            painter.text(
                rect.center_bottom() - vec2(0.0, 14.0),
                Align2::CENTER_CENTER,
                cell.date.format("%m/%d"),
                FontId::proportional(13.0),
                Color32::WHITE,
            );
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                format_amount(cell.total),
                FontId::proportional(12.0),
                with_alpha(Color32::WHITE, 200),
            );
        }

        for (source, target) in &self.links {
            if let (Some(from), Some(to)) = (self.scene.sprite(source), self.scene.sprite(target)) {
                painter.line_segment(
                    [at(from.pos), at(to.pos)],
                    Stroke::new(1.5, with_alpha(Color32::from_gray(120), 140)),
                );
            }
        }

        for (_key, sprite) in self.scene.iter() {
            match sprite.attrs.kind {
                SpriteKind::Category => {
                    painter.circle(
                        at(sprite.pos),
                        sprite.attrs.radius,
                        Color32::WHITE,
                        Stroke::new(2.0, Color32::from_gray(102)),
                    );
                    painter.text(
                        at(sprite.pos),
                        Align2::CENTER_CENTER,
                        &sprite.attrs.label,
                        FontId::proportional(13.0),
                        Color32::from_gray(60),
                    );
                    painter.text(
                        at(sprite.pos + vec2(0.0, 16.0)),
                        Align2::CENTER_CENTER,
                        format_amount(sprite.attrs.value),
                        FontId::proportional(11.0),
                        Color32::from_gray(130),
                    );
                }
                SpriteKind::Expense => {
                    let color = expense_color(sprite.attrs.color_t);
                    painter.circle(
                        at(sprite.pos),
                        sprite.attrs.radius,
                        with_alpha(color, 64),
                        Stroke::new(3.0, color),
                    );
                    if sprite.highlight {
                        painter.circle_stroke(
                            at(sprite.pos),
                            sprite.attrs.radius + 4.0,
                            Stroke::new(2.0, Color32::from_gray(40)),
                        );
                    }
                }
            }
        }
    }
}
