use std::collections::{HashMap, HashSet};

use anyhow::Result;
use eframe::egui::Vec2;

use super::sim::NodeKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpriteKind {
    Expense,
    Category,
}

/// Visual attributes recomputed every layout pass. `value` is the expense
/// amount or the category's running total; `color_t` is the normalized
/// position on the amount color ramp.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteAttrs {
    pub kind: SpriteKind,
    pub label: String,
    pub radius: f32,
    pub color_t: f32,
    pub value: f64,
}

/// One reconciliation pass: keys only in the next set, keys in both, keys
/// only in the previous set. Enter/update follow next-set insertion order,
/// exit follows previous-set order.
#[derive(Clone, Debug, Default)]
pub struct SceneDiff {
    pub enter: Vec<NodeKey>,
    pub update: Vec<NodeKey>,
    pub exit: Vec<NodeKey>,
}

pub fn reconcile(prev: &[NodeKey], next: &[NodeKey]) -> Result<SceneDiff> {
    let prev_set = unique_set(prev).ok_or_else(|| duplicate_error(prev))?;
    let next_set = unique_set(next).ok_or_else(|| duplicate_error(next))?;

    let mut diff = SceneDiff::default();
    for key in next {
        if prev_set.contains(key) {
            diff.update.push(key.clone());
        } else {
            diff.enter.push(key.clone());
        }
    }
    for key in prev {
        if !next_set.contains(key) {
            diff.exit.push(key.clone());
        }
    }
    Ok(diff)
}

fn unique_set(keys: &[NodeKey]) -> Option<HashSet<&NodeKey>> {
    let mut set = HashSet::with_capacity(keys.len());
    for key in keys {
        if !set.insert(key) {
            return None;
        }
    }
    Some(set)
}

fn duplicate_error(keys: &[NodeKey]) -> anyhow::Error {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return anyhow::anyhow!("duplicate identity key {key:?} in node set");
        }
    }
    anyhow::anyhow!("duplicate identity key in node set")
}

/// The instruction stream handed to the rendering collaborator once per
/// reconciliation pass. Positions for live keys additionally flow once per
/// tick through [`SceneSet::update_position`].
#[derive(Clone, Debug)]
pub enum RenderInstruction {
    Enter {
        key: NodeKey,
        pos: Vec2,
        attrs: SpriteAttrs,
    },
    Update {
        key: NodeKey,
        pos: Vec2,
        attrs: SpriteAttrs,
    },
    Exit {
        key: NodeKey,
    },
}

#[derive(Clone, Debug)]
pub struct Sprite {
    pub pos: Vec2,
    pub attrs: SpriteAttrs,
    /// Visual-only decoration (active drag). Survives updates, cleared only
    /// when the key exits and re-enters.
    pub highlight: bool,
}

/// Retained per-key sprites on the rendering side, mutated exclusively by
/// instruction application and per-tick position updates.
#[derive(Default)]
pub struct SceneSet {
    sprites: HashMap<NodeKey, Sprite>,
    order: Vec<NodeKey>,
}

impl SceneSet {
    pub fn keys(&self) -> &[NodeKey] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn sprite(&self, key: &NodeKey) -> Option<&Sprite> {
        self.sprites.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &Sprite)> {
        self.order
            .iter()
            .filter_map(|key| self.sprites.get(key).map(|sprite| (key, sprite)))
    }

    pub fn apply(&mut self, instructions: &[RenderInstruction]) {
        let mut order = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            match instruction {
                RenderInstruction::Enter { key, pos, attrs } => {
                    self.sprites.insert(
                        key.clone(),
                        Sprite {
                            pos: *pos,
                            attrs: attrs.clone(),
                            highlight: false,
                        },
                    );
                    order.push(key.clone());
                }
                RenderInstruction::Update { key, pos, attrs } => {
                    if let Some(sprite) = self.sprites.get_mut(key) {
                        sprite.pos = *pos;
                        sprite.attrs = attrs.clone();
                    }
                    order.push(key.clone());
                }
                RenderInstruction::Exit { key } => {
                    self.sprites.remove(key);
                }
            }
        }
        self.order = order;
    }

    pub fn update_position(&mut self, key: &NodeKey, pos: Vec2) {
        if let Some(sprite) = self.sprites.get_mut(key) {
            sprite.pos = pos;
        }
    }

    pub fn set_highlight(&mut self, key: &NodeKey, on: bool) {
        if let Some(sprite) = self.sprites.get_mut(key) {
            sprite.highlight = on;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    fn key(name: &str) -> NodeKey {
        NodeKey::Category(name.to_owned())
    }

    fn attrs(radius: f32) -> SpriteAttrs {
        SpriteAttrs {
            kind: SpriteKind::Category,
            label: "x".to_owned(),
            radius,
            color_t: 0.5,
            value: 0.0,
        }
    }

    #[test]
    fn classifies_enter_update_exit() {
        let prev = [key("A"), key("B"), key("C")];
        let next = [key("B"), key("C"), key("D")];

        let diff = reconcile(&prev, &next).unwrap();
        assert_eq!(diff.enter, vec![key("D")]);
        assert_eq!(diff.update, vec![key("B"), key("C")]);
        assert_eq!(diff.exit, vec![key("A")]);

        // classification is order-independent
        let shuffled_prev = [key("C"), key("A"), key("B")];
        let diff = reconcile(&shuffled_prev, &next).unwrap();
        assert_eq!(diff.enter, vec![key("D")]);
        assert_eq!(diff.update, vec![key("B"), key("C")]);
        assert_eq!(diff.exit, vec![key("A")]);
    }

    #[test]
    fn duplicate_keys_fail_fast() {
        let prev = [key("A")];
        let next = [key("B"), key("B")];
        let error = reconcile(&prev, &next).unwrap_err();
        assert!(error.to_string().contains("duplicate identity key"));

        assert!(reconcile(&next, &prev).is_err());
    }

    #[test]
    fn empty_sets_are_fine() {
        let diff = reconcile(&[], &[key("A")]).unwrap();
        assert_eq!(diff.enter, vec![key("A")]);
        assert!(diff.update.is_empty() && diff.exit.is_empty());

        let diff = reconcile(&[key("A")], &[]).unwrap();
        assert_eq!(diff.exit, vec![key("A")]);
    }

    #[test]
    fn highlight_survives_update_but_not_reentry() {
        let mut scene = SceneSet::default();
        scene.apply(&[RenderInstruction::Enter {
            key: key("A"),
            pos: vec2(1.0, 1.0),
            attrs: attrs(10.0),
        }]);
        scene.set_highlight(&key("A"), true);

        scene.apply(&[RenderInstruction::Update {
            key: key("A"),
            pos: vec2(2.0, 2.0),
            attrs: attrs(12.0),
        }]);
        let sprite = scene.sprite(&key("A")).unwrap();
        assert!(sprite.highlight);
        assert_eq!(sprite.attrs.radius, 12.0);
        assert_eq!(sprite.pos, vec2(2.0, 2.0));

        scene.apply(&[RenderInstruction::Exit { key: key("A") }]);
        assert!(scene.sprite(&key("A")).is_none());

        scene.apply(&[RenderInstruction::Enter {
            key: key("A"),
            pos: vec2(0.0, 0.0),
            attrs: attrs(10.0),
        }]);
        assert!(!scene.sprite(&key("A")).unwrap().highlight);
    }

    #[test]
    fn order_follows_instruction_stream() {
        let mut scene = SceneSet::default();
        scene.apply(&[
            RenderInstruction::Enter {
                key: key("B"),
                pos: vec2(0.0, 0.0),
                attrs: attrs(1.0),
            },
            RenderInstruction::Enter {
                key: key("A"),
                pos: vec2(0.0, 0.0),
                attrs: attrs(1.0),
            },
        ]);
        assert_eq!(scene.keys(), &[key("B"), key("A")]);

        scene.update_position(&key("A"), vec2(9.0, 9.0));
        assert_eq!(scene.sprite(&key("A")).unwrap().pos, vec2(9.0, 9.0));
    }
}
