use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tokens::{TokenLedger, TokenTier};

pub const TREE_STATE_SCHEMA_VERSION: u8 = 1;

/// Layout coordinate of a node. Only the rendering side interprets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Immutable description of one vertex in a skill tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    pub name: String,
    pub max_level: u32,
    /// `costs[n]` is the price of going from level `n` to level `n + 1`.
    pub costs: Vec<u64>,
    pub required_tier: TokenTier,
    /// Special nodes keep their level across a reset instead of being refunded.
    pub special: bool,
    pub anchor: Anchor,
    /// Optional per-level description, indexed like `costs`.
    pub descriptions: Vec<String>,
}

impl NodeDefinition {
    /// A single-level node costing `cost` tokens of `tier`.
    pub fn new(id: &str, name: &str, tier: TokenTier, cost: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            max_level: 1,
            costs: vec![cost],
            required_tier: tier,
            special: false,
            anchor: Anchor::default(),
            descriptions: Vec::new(),
        }
    }

    /// Replace the cost table; `max_level` follows its length.
    pub fn with_costs(mut self, costs: &[u64]) -> Self {
        self.costs = costs.to_vec();
        self.max_level = costs.len() as u32;
        self
    }

    pub fn with_anchor(mut self, x: i32, y: i32) -> Self {
        self.anchor = Anchor::new(x, y);
        self
    }

    pub fn with_descriptions(mut self, descriptions: &[&str]) -> Self {
        self.descriptions = descriptions.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn as_special(mut self) -> Self {
        self.special = true;
        self
    }

    /// Cost to reach `level` from `level - 1`. Levels outside `1..=max_level` are free.
    pub fn cost_at(&self, level: u32) -> u64 {
        if level == 0 || level > self.max_level {
            return 0;
        }
        self.costs.get(level as usize - 1).copied().unwrap_or(0)
    }

    /// Sum of `cost_at(1..=level)`: everything paid to stand at `level`.
    pub fn cumulative_cost(&self, level: u32) -> u64 {
        (1..=level.min(self.max_level))
            .map(|l| self.cost_at(l))
            .fold(0u64, |acc, cost| acc.saturating_add(cost))
    }

    pub fn description_at(&self, level: u32) -> Option<&str> {
        if level == 0 {
            return None;
        }
        self.descriptions
            .get(level as usize - 1)
            .map(|d| d.as_str())
    }
}

/// Lifecycle of one node from a player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// No satisfied prerequisite edge.
    Locked,
    /// Prerequisites met, nothing purchased yet.
    Available,
    Unlocked { level: u32 },
    /// Special node parked by a reset; re-unlocking restores `saved_level`.
    Dormant { saved_level: u32 },
}

/// One character's progress in one skill tree: the persisted triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTreeState {
    /// Only levels >= 1 are stored; absence means locked.
    #[serde(default)]
    pub(crate) unlocked_levels: BTreeMap<String, u32>,
    /// Special nodes parked by a reset.
    #[serde(default)]
    pub(crate) dormant_levels: BTreeMap<String, u32>,
    #[serde(default)]
    pub ledger: TokenLedger,
}

impl PlayerTreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: TokenLedger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    /// Active level of `node_id`; dormant levels count as 0.
    pub fn current_level(&self, node_id: &str) -> u32 {
        self.unlocked_levels.get(node_id).copied().unwrap_or(0)
    }

    pub fn dormant_level(&self, node_id: &str) -> Option<u32> {
        self.dormant_levels.get(node_id).copied()
    }

    pub fn is_unlocked(&self, node_id: &str) -> bool {
        self.current_level(node_id) >= 1
    }

    pub fn unlocked_levels(&self) -> &BTreeMap<String, u32> {
        &self.unlocked_levels
    }

    pub fn dormant_levels(&self) -> &BTreeMap<String, u32> {
        &self.dormant_levels
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked_levels.len()
    }

    pub(crate) fn set_level(&mut self, node_id: &str, level: u32) {
        if level == 0 {
            self.unlocked_levels.remove(node_id);
        } else {
            self.unlocked_levels.insert(node_id.to_string(), level);
        }
    }
}

/// Persisted envelope around a [`PlayerTreeState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStateRecord {
    pub character: String,
    pub skill: String,
    pub state: PlayerTreeState,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl TreeStateRecord {
    pub fn new(character: &str, skill: &str, state: PlayerTreeState) -> Self {
        Self {
            character: character.to_string(),
            skill: skill.to_string(),
            state,
            updated_at: Utc::now(),
            schema_version: TREE_STATE_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_lookup_is_one_based() {
        let node = NodeDefinition::new("a", "A", TokenTier::Basic, 0).with_costs(&[2, 3]);
        assert_eq!(node.max_level, 2);
        assert_eq!(node.cost_at(0), 0);
        assert_eq!(node.cost_at(1), 2);
        assert_eq!(node.cost_at(2), 3);
        assert_eq!(node.cost_at(3), 0);
        assert_eq!(node.cumulative_cost(2), 5);
        assert_eq!(node.cumulative_cost(9), 5);
    }

    #[test]
    fn descriptions_follow_levels() {
        let node = NodeDefinition::new("a", "A", TokenTier::Basic, 1)
            .with_descriptions(&["+5% ore"]);
        assert_eq!(node.description_at(1), Some("+5% ore"));
        assert_eq!(node.description_at(0), None);
        assert_eq!(node.description_at(2), None);
    }

    #[test]
    fn zero_level_is_not_stored() {
        let mut state = PlayerTreeState::new();
        state.set_level("a", 2);
        assert!(state.is_unlocked("a"));
        state.set_level("a", 0);
        assert_eq!(state, PlayerTreeState::new());
    }
}
