use chrono::NaiveDate;
use eframe::egui::Vec2;

use super::sim::{NodeKey, Simulation};

/// Warmth injected when a drag starts so the rest of the layout redistributes
/// live around the pinned node.
pub const DRAG_WARMTH: f32 = 0.3;

/// A region a dragged expense can be released into.
#[derive(Clone, Debug)]
pub enum DropZone {
    Category {
        name: String,
        center: Vec2,
        radius: f32,
    },
    Day {
        date: NaiveDate,
        center: Vec2,
        radius: f32,
    },
}

impl DropZone {
    fn center(&self) -> Vec2 {
        match self {
            Self::Category { center, .. } | Self::Day { center, .. } => *center,
        }
    }

    fn radius(&self) -> f32 {
        match self {
            Self::Category { radius, .. } | Self::Day { radius, .. } => *radius,
        }
    }

    fn target(&self) -> DropTarget {
        match self {
            Self::Category { name, .. } => DropTarget::Category(name.clone()),
            Self::Day { date, .. } => DropTarget::Day(*date),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum DropTarget {
    Category(String),
    Day(NaiveDate),
}

/// The single mutation a completed gesture may request from the domain state.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationRequest {
    LinkToCategory { expense_id: u64, category: String },
    RescheduleExpense { expense_id: u64, new_date: NaiveDate },
}

enum Phase {
    Idle,
    Dragging {
        subject: NodeKey,
        target: Option<DropTarget>,
    },
}

/// Gesture state machine: `idle -> dragging -> idle`. While dragging it owns
/// the subject's pin; on release it emits at most one mutation request.
pub struct DragController {
    phase: Phase,
}

impl DragController {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    pub fn subject(&self) -> Option<&NodeKey> {
        match &self.phase {
            Phase::Dragging { subject, .. } => Some(subject),
            Phase::Idle => None,
        }
    }

    /// Begins a gesture. Only expense nodes are draggable, and a second
    /// pointer-down while a gesture is live is ignored.
    pub fn pointer_down(&mut self, key: NodeKey, pos: Vec2, sim: &mut Simulation) -> bool {
        if self.is_dragging() {
            return false;
        }
        if !matches!(key, NodeKey::Expense(_)) || !sim.contains(&key) {
            return false;
        }

        sim.pin(&key, pos);
        sim.restart(DRAG_WARMTH);
        self.phase = Phase::Dragging {
            subject: key,
            target: None,
        };
        true
    }

    /// Moves the pin to the pointer and re-evaluates the drop target against
    /// this frame's zone geometry. Pointers outside the canvas are legal;
    /// they simply match nothing.
    pub fn pointer_move(&mut self, pos: Vec2, zones: &[DropZone], sim: &mut Simulation) {
        let Phase::Dragging { subject, target } = &mut self.phase else {
            return;
        };
        sim.pin(subject, pos);
        *target = hit_test(pos, zones);
    }

    /// Ends the gesture: unpins the subject and, if a drop zone was matched
    /// at release time, returns exactly one mutation request.
    pub fn pointer_up(&mut self, sim: &mut Simulation) -> Option<MutationRequest> {
        let phase = std::mem::replace(&mut self.phase, Phase::Idle);
        let Phase::Dragging { subject, target } = phase else {
            return None;
        };

        sim.unpin(&subject);
        let NodeKey::Expense(expense_id) = subject else {
            return None;
        };

        target.map(|target| match target {
            DropTarget::Category(category) => MutationRequest::LinkToCategory {
                expense_id,
                category,
            },
            DropTarget::Day(new_date) => MutationRequest::RescheduleExpense {
                expense_id,
                new_date,
            },
        })
    }

    /// External reset (period navigation, reload): force idle, unpin, no
    /// mutation.
    pub fn cancel(&mut self, sim: &mut Simulation) {
        if let Phase::Dragging { subject, .. } =
            std::mem::replace(&mut self.phase, Phase::Idle)
        {
            sim.unpin(&subject);
        }
    }

    /// Called after every `configure`. The pin survives as long as the
    /// subject key does; if the new set dropped it, the gesture is implicitly
    /// cancelled.
    pub fn after_configure(&mut self, sim: &mut Simulation) {
        if let Phase::Dragging { subject, .. } = &self.phase
            && !sim.contains(subject)
        {
            log::warn!("drag subject {subject:?} vanished during reconfigure; cancelling gesture");
            self.phase = Phase::Idle;
        }
    }
}

// Zone precedence when the pointer overlaps several zones: nearest center
// wins; on an exact tie a category beats a day anchor.
fn hit_test(pos: Vec2, zones: &[DropZone]) -> Option<DropTarget> {
    zones
        .iter()
        .filter_map(|zone| {
            let distance = (pos - zone.center()).length();
            (distance <= zone.radius()).then_some((zone, distance))
        })
        .min_by(|(zone_a, dist_a), (zone_b, dist_b)| {
            dist_a
                .total_cmp(dist_b)
                .then_with(|| zone_rank(zone_a).cmp(&zone_rank(zone_b)))
        })
        .map(|(zone, _)| zone.target())
}

fn zone_rank(zone: &DropZone) -> u8 {
    match zone {
        DropZone::Category { .. } => 0,
        DropZone::Day { .. } => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::sim::{NodeSeed, SimConfig, SimPhase};
    use eframe::egui::vec2;

    fn sim_with_expenses(ids: &[u64]) -> Simulation {
        let mut sim = Simulation::new(SimConfig::default());
        let seeds = ids
            .iter()
            .map(|&id| NodeSeed {
                key: NodeKey::Expense(id),
                focus: vec2(100.0 + id as f32 * 50.0, 100.0),
                radius: 10.0,
            })
            .collect();
        sim.configure(seeds).unwrap();
        sim
    }

    fn category_zone(name: &str, center: Vec2, radius: f32) -> DropZone {
        DropZone::Category {
            name: name.to_owned(),
            center,
            radius,
        }
    }

    fn day_zone(date: &str, center: Vec2, radius: f32) -> DropZone {
        DropZone::Day {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            center,
            radius,
        }
    }

    #[test]
    fn pointer_down_pins_and_reheats() {
        let mut sim = sim_with_expenses(&[1, 2]);
        let mut drag = DragController::new();

        assert!(drag.pointer_down(NodeKey::Expense(1), vec2(10.0, 20.0), &mut sim));
        assert!(drag.is_dragging());
        assert_eq!(sim.phase(), SimPhase::Running);
        assert!((sim.temperature() - DRAG_WARMTH).abs() < 1e-6);
        assert_eq!(
            sim.node(&NodeKey::Expense(1)).unwrap().pinned,
            Some(vec2(10.0, 20.0))
        );
    }

    #[test]
    fn concurrent_drag_rejected() {
        let mut sim = sim_with_expenses(&[1, 2]);
        let mut drag = DragController::new();

        assert!(drag.pointer_down(NodeKey::Expense(1), vec2(0.0, 0.0), &mut sim));
        assert!(!drag.pointer_down(NodeKey::Expense(2), vec2(0.0, 0.0), &mut sim));
        assert_eq!(drag.subject(), Some(&NodeKey::Expense(1)));
    }

    #[test]
    fn category_nodes_are_not_draggable() {
        let mut sim = Simulation::new(SimConfig::default());
        sim.configure(vec![NodeSeed {
            key: NodeKey::Category("Food".to_owned()),
            focus: vec2(0.0, 0.0),
            radius: 30.0,
        }])
        .unwrap();

        let mut drag = DragController::new();
        assert!(!drag.pointer_down(
            NodeKey::Category("Food".to_owned()),
            vec2(0.0, 0.0),
            &mut sim
        ));
    }

    #[test]
    fn release_inside_category_emits_one_link_request() {
        let mut sim = sim_with_expenses(&[7]);
        let mut drag = DragController::new();
        let zones = vec![category_zone("Food", vec2(200.0, 200.0), 40.0)];

        drag.pointer_down(NodeKey::Expense(7), vec2(0.0, 0.0), &mut sim);
        drag.pointer_move(vec2(210.0, 195.0), &zones, &mut sim);
        let request = drag.pointer_up(&mut sim);

        assert_eq!(
            request,
            Some(MutationRequest::LinkToCategory {
                expense_id: 7,
                category: "Food".to_owned(),
            })
        );
        assert!(!drag.is_dragging());
        assert!(sim.node(&NodeKey::Expense(7)).unwrap().pinned.is_none());
    }

    #[test]
    fn release_outside_any_zone_is_a_no_op() {
        let mut sim = sim_with_expenses(&[7]);
        let mut drag = DragController::new();
        let zones = vec![category_zone("Food", vec2(200.0, 200.0), 40.0)];

        drag.pointer_down(NodeKey::Expense(7), vec2(0.0, 0.0), &mut sim);
        drag.pointer_move(vec2(500.0, 500.0), &zones, &mut sim);
        assert_eq!(drag.pointer_up(&mut sim), None);
    }

    #[test]
    fn moving_out_of_a_zone_clears_the_match() {
        let mut sim = sim_with_expenses(&[7]);
        let mut drag = DragController::new();
        let zones = vec![day_zone("2018-01-03", vec2(100.0, 100.0), 80.0)];

        drag.pointer_down(NodeKey::Expense(7), vec2(0.0, 0.0), &mut sim);
        drag.pointer_move(vec2(100.0, 100.0), &zones, &mut sim);
        drag.pointer_move(vec2(400.0, 400.0), &zones, &mut sim);
        assert_eq!(drag.pointer_up(&mut sim), None);
    }

    #[test]
    fn nearest_zone_wins_with_category_tiebreak() {
        let pos = vec2(100.0, 100.0);
        let near_day = vec![
            category_zone("Food", vec2(160.0, 100.0), 80.0),
            day_zone("2018-01-03", vec2(110.0, 100.0), 80.0),
        ];
        assert_eq!(
            hit_test(pos, &near_day),
            Some(DropTarget::Day(
                NaiveDate::parse_from_str("2018-01-03", "%Y-%m-%d").unwrap()
            ))
        );

        let exact_tie = vec![
            day_zone("2018-01-03", vec2(120.0, 100.0), 80.0),
            category_zone("Food", vec2(80.0, 100.0), 80.0),
        ];
        assert_eq!(
            hit_test(pos, &exact_tie),
            Some(DropTarget::Category("Food".to_owned()))
        );
    }

    #[test]
    fn reschedule_request_carries_the_day_date() {
        let mut sim = sim_with_expenses(&[3]);
        let mut drag = DragController::new();
        let zones = vec![day_zone("2018-01-05", vec2(50.0, 50.0), 80.0)];

        drag.pointer_down(NodeKey::Expense(3), vec2(0.0, 0.0), &mut sim);
        drag.pointer_move(vec2(55.0, 45.0), &zones, &mut sim);
        assert_eq!(
            drag.pointer_up(&mut sim),
            Some(MutationRequest::RescheduleExpense {
                expense_id: 3,
                new_date: NaiveDate::parse_from_str("2018-01-05", "%Y-%m-%d").unwrap(),
            })
        );
    }

    #[test]
    fn configure_dropping_subject_cancels_gesture() {
        let mut sim = sim_with_expenses(&[1, 2]);
        let mut drag = DragController::new();
        drag.pointer_down(NodeKey::Expense(1), vec2(0.0, 0.0), &mut sim);

        // next pass no longer contains expense 1
        sim.configure(vec![NodeSeed {
            key: NodeKey::Expense(2),
            focus: vec2(0.0, 0.0),
            radius: 10.0,
        }])
        .unwrap();
        drag.after_configure(&mut sim);

        assert!(!drag.is_dragging());
        assert_eq!(drag.pointer_up(&mut sim), None);
    }

    #[test]
    fn configure_keeping_subject_keeps_the_pin() {
        let mut sim = sim_with_expenses(&[1, 2]);
        let mut drag = DragController::new();
        drag.pointer_down(NodeKey::Expense(1), vec2(40.0, 40.0), &mut sim);

        sim.configure(
            [1u64, 2]
                .iter()
                .map(|&id| NodeSeed {
                    key: NodeKey::Expense(id),
                    focus: vec2(0.0, 0.0),
                    radius: 10.0,
                })
                .collect(),
        )
        .unwrap();
        drag.after_configure(&mut sim);

        assert!(drag.is_dragging());
        assert_eq!(
            sim.node(&NodeKey::Expense(1)).unwrap().pinned,
            Some(vec2(40.0, 40.0))
        );
    }

    #[test]
    fn cancel_unpins_without_mutation() {
        let mut sim = sim_with_expenses(&[1]);
        let mut drag = DragController::new();
        let zones = vec![category_zone("Food", vec2(0.0, 0.0), 80.0)];

        drag.pointer_down(NodeKey::Expense(1), vec2(0.0, 0.0), &mut sim);
        drag.pointer_move(vec2(0.0, 0.0), &zones, &mut sim);
        drag.cancel(&mut sim);

        assert!(!drag.is_dragging());
        assert!(sim.node(&NodeKey::Expense(1)).unwrap().pinned.is_none());
        assert_eq!(drag.pointer_up(&mut sim), None);
    }
}
