use std::collections::HashMap;

use anyhow::{Result, bail};
use eframe::egui::{Vec2, vec2};

use crate::util::stable_pair;

/// Stable identity of a visual node, matched across successive layout passes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Expense(u64),
    Category(String),
}

impl NodeKey {
    pub fn seed_key(&self) -> String {
        match self {
            Self::Expense(id) => format!("expense-{id}"),
            Self::Category(name) => format!("category-{name}"),
        }
    }
}

/// What a layout pass feeds into [`Simulation::configure`]: identity, spring
/// target, and collision radius. Position and velocity are the engine's own.
#[derive(Clone, Debug)]
pub struct NodeSeed {
    pub key: NodeKey,
    pub focus: Vec2,
    pub radius: f32,
}

#[derive(Clone, Debug)]
pub struct LayoutNode {
    pub key: NodeKey,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub focus: Vec2,
    pub radius: f32,
    pub pinned: Option<Vec2>,
}

#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    /// Spring pull toward the focus point, scaled further by temperature.
    pub spring_strength: f32,
    /// Fraction of velocity shed each tick; 0.3 means v *= 0.7.
    pub velocity_damping: f32,
    /// Multiplicative temperature decay per tick.
    pub temperature_decay: f32,
    /// Temperature below which the simulation counts as settled.
    pub settle_threshold: f32,
    /// Extra clearance added between node circles.
    pub collision_padding: f32,
    /// Canvas extent used to seed nodes with no prior position.
    pub seed_bounds: Vec2,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            spring_strength: 0.1,
            velocity_damping: 0.3,
            temperature_decay: 0.04,
            settle_threshold: 1e-3,
            collision_padding: 0.0,
            seed_bounds: vec2(900.0, 900.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPhase {
    Cold,
    Running,
    Settled,
}

/// Iterative force layout over a keyed node set. One instance is owned by the
/// view that needs it; nothing here is shared or global.
pub struct Simulation {
    nodes: Vec<LayoutNode>,
    index_by_key: HashMap<NodeKey, usize>,
    temperature: f32,
    phase: SimPhase,
    config: SimConfig,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            nodes: Vec::new(),
            index_by_key: HashMap::new(),
            temperature: 0.0,
            phase: SimPhase::Cold,
            config,
        }
    }

    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index_by_key.contains_key(key)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&LayoutNode> {
        self.index_by_key.get(key).map(|&index| &self.nodes[index])
    }

    /// Total kinetic energy, the settling observable.
    pub fn kinetic_energy(&self) -> f32 {
        self.nodes
            .iter()
            .map(|node| node.velocity.length_sq())
            .sum()
    }

    /// Replaces the node set. Keys surviving from the previous set keep their
    /// position, velocity, and pin so nothing visually jumps; new keys are
    /// seeded deterministically inside the canvas. Duplicate keys within one
    /// set are rejected outright.
    pub fn configure(&mut self, seeds: Vec<NodeSeed>) -> Result<()> {
        let mut index_by_key = HashMap::with_capacity(seeds.len());
        for (index, seed) in seeds.iter().enumerate() {
            if index_by_key.insert(seed.key.clone(), index).is_some() {
                bail!("duplicate node key {:?} in layout pass", seed.key);
            }
        }

        let mut prior = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(|node| (node.key.clone(), node))
            .collect::<HashMap<_, _>>();

        let mut nodes = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if let Some(mut node) = prior.remove(&seed.key) {
                node.focus = seed.focus;
                node.radius = seed.radius;
                nodes.push(node);
            } else {
                nodes.push(LayoutNode {
                    pos: self.seed_position(&seed.key),
                    velocity: Vec2::ZERO,
                    focus: seed.focus,
                    radius: seed.radius,
                    pinned: None,
                    key: seed.key,
                });
            }
        }

        self.nodes = nodes;
        self.index_by_key = index_by_key;
        Ok(())
    }

    fn seed_position(&self, key: &NodeKey) -> Vec2 {
        let (jx, jy) = stable_pair(&key.seed_key());
        vec2(
            (jx * 0.5 + 0.5) * self.config.seed_bounds.x,
            (jy * 0.5 + 0.5) * self.config.seed_bounds.y,
        )
    }

    /// Re-heats the simulation and transitions to running. `warmth` is
    /// clamped into (0, 1].
    pub fn restart(&mut self, warmth: f32) {
        self.temperature = warmth.clamp(1e-4, 1.0);
        self.phase = SimPhase::Running;
    }

    pub fn pin(&mut self, key: &NodeKey, pos: Vec2) {
        if let Some(&index) = self.index_by_key.get(key) {
            let node = &mut self.nodes[index];
            node.pinned = Some(pos);
            node.pos = pos;
            node.velocity = Vec2::ZERO;
        }
    }

    pub fn unpin(&mut self, key: &NodeKey) {
        if let Some(&index) = self.index_by_key.get(key) {
            self.nodes[index].pinned = None;
        }
    }

    /// Advances the simulation one step. Returns `false` once settled.
    pub fn tick(&mut self) -> bool {
        if self.phase != SimPhase::Running || self.nodes.is_empty() {
            return false;
        }

        let spring = self.config.spring_strength * self.temperature;
        for node in &mut self.nodes {
            node.velocity += (node.focus - node.pos) * spring;
        }

        self.resolve_collisions();

        let keep = 1.0 - self.config.velocity_damping.clamp(0.0, 1.0);
        for node in &mut self.nodes {
            node.velocity *= keep;
            node.pos += node.velocity;
            if let Some(pin) = node.pinned {
                node.pos = pin;
                node.velocity = Vec2::ZERO;
            }
        }

        self.temperature *= 1.0 - self.config.temperature_decay.clamp(0.0, 0.5);
        if self.temperature < self.config.settle_threshold {
            self.temperature = 0.0;
            self.phase = SimPhase::Settled;
        }

        true
    }

    // Pairwise positional correction along the line between centers,
    // proportional to overlap depth. Node counts here are tens, so the
    // quadratic pass is fine.
    fn resolve_collisions(&mut self) {
        let padding = self.config.collision_padding.max(0.0);
        let count = self.nodes.len();

        for i in 0..count {
            for j in (i + 1)..count {
                let (left, right) = self.nodes.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];

                let min_distance = (a.radius + b.radius + padding).max(f32::EPSILON);
                let mut delta = a.pos - b.pos;
                let mut distance_sq = delta.length_sq();

                // coincident centers would divide by zero; nudge apart first
                if distance_sq < 1e-8 {
                    let angle =
                        ((i as f32) * 0.618_034 + (j as f32) * 0.414_214) * std::f32::consts::TAU;
                    delta = vec2(angle.cos(), angle.sin()) * 1e-3;
                    distance_sq = delta.length_sq();
                }

                if distance_sq >= min_distance * min_distance {
                    continue;
                }

                let distance = distance_sq.sqrt();
                let direction = delta / distance;
                let overlap = min_distance - distance;

                match (a.pinned.is_some(), b.pinned.is_some()) {
                    (true, true) => {}
                    (true, false) => b.pos -= direction * overlap,
                    (false, true) => a.pos += direction * overlap,
                    (false, false) => {
                        a.pos += direction * (overlap * 0.5);
                        b.pos -= direction * (overlap * 0.5);
                    }
                }
            }
        }
    }
}
