/// Progression engine: availability, affordability, unlock/upgrade and reset.
///
/// Every operation here is a pure computation over one static graph and one
/// player's tree state. Loading, saving and locking belong to the service layer.
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::errors::ProgressionError;
use super::graph::SkillTreeGraph;
use super::tokens::{TierAmounts, TokenTier};
use super::types::{NodeDefinition, NodeState, PlayerTreeState};

/// What re-activating a dormant special node costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DormantReunlockPolicy {
    /// Restore the saved level without spending tokens.
    #[default]
    Free,
    /// Charge the cumulative cost of every saved level again, all-or-nothing.
    Repay,
}

/// Read-only view of what the next unlock of a node would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockPreview {
    pub node_id: String,
    pub current_level: u32,
    pub next_level: u32,
    pub cost: u64,
    pub tier: TokenTier,
    pub affordable: bool,
    /// True when the unlock re-activates a dormant special node.
    pub restores_dormant: bool,
}

/// Result of a successful unlock/upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockOutcome {
    pub node_id: String,
    pub previous_level: u32,
    pub new_level: u32,
    /// Tokens taken from each tier.
    pub spent: TierAmounts,
    pub restored_from_dormant: bool,
    /// Ledger balances after the transaction.
    pub balances: TierAmounts,
}

/// Result of a reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetOutcome {
    /// Tokens credited back, with an explicit entry for every tier.
    pub refund: TierAmounts,
    /// Ordinary nodes returned to level 0.
    pub cleared: Vec<String>,
    /// Special nodes parked as dormant, with their saved level.
    pub parked: Vec<(String, u32)>,
    /// Stored nodes the tree no longer defines; dropped without refund.
    pub orphaned: Vec<String>,
}

impl ResetOutcome {
    pub fn total_refund(&self) -> u64 {
        self.refund
            .values()
            .fold(0u64, |acc, amount| acc.saturating_add(*amount))
    }
}

/// Runs progression transactions for one skill tree.
#[derive(Debug, Clone, Copy)]
pub struct ProgressionEngine<'g> {
    graph: &'g SkillTreeGraph,
    policy: DormantReunlockPolicy,
}

impl<'g> ProgressionEngine<'g> {
    pub fn new(graph: &'g SkillTreeGraph) -> Self {
        Self {
            graph,
            policy: DormantReunlockPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DormantReunlockPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn graph(&self) -> &'g SkillTreeGraph {
        self.graph
    }

    pub fn policy(&self) -> DormantReunlockPolicy {
        self.policy
    }

    pub fn is_available(&self, node_id: &str, state: &PlayerTreeState) -> bool {
        self.graph.contains(node_id) && self.graph.is_available(node_id, state)
    }

    pub fn current_level(&self, node_id: &str, state: &PlayerTreeState) -> u32 {
        state.current_level(node_id)
    }

    /// Where a node sits in its lifecycle, or `None` for unknown ids.
    pub fn node_state(&self, node_id: &str, state: &PlayerTreeState) -> Option<NodeState> {
        if !self.graph.contains(node_id) {
            return None;
        }
        let level = state.current_level(node_id);
        if level >= 1 {
            return Some(NodeState::Unlocked { level });
        }
        if let Some(saved_level) = state.dormant_level(node_id) {
            return Some(NodeState::Dormant { saved_level });
        }
        if self.graph.is_available(node_id, state) {
            Some(NodeState::Available)
        } else {
            Some(NodeState::Locked)
        }
    }

    /// Check the unlock preconditions in order (unknown node, prerequisites,
    /// max level) and price the next step without touching `state`.
    /// [`ProgressionEngine::unlock`] goes through this same path.
    pub fn preview_unlock(
        &self,
        node_id: &str,
        state: &PlayerTreeState,
    ) -> Result<UnlockPreview, ProgressionError> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| ProgressionError::UnknownNode(node_id.to_string()))?;

        if !self.graph.is_available(node_id, state) {
            return Err(ProgressionError::PrerequisiteNotMet(node_id.to_string()));
        }

        let current_level = state.current_level(node_id);
        if current_level >= node.max_level {
            return Err(ProgressionError::AlreadyMaxLevel {
                node: node_id.to_string(),
                max_level: node.max_level,
            });
        }

        let (next_level, cost) = self.price_step(node, current_level, state);
        Ok(UnlockPreview {
            node_id: node_id.to_string(),
            current_level,
            next_level,
            cost,
            tier: node.required_tier,
            affordable: state.ledger.can_afford(node.required_tier, cost),
            restores_dormant: Self::restores_dormant(node_id, current_level, state),
        })
    }

    /// Level and price of the next unlock, ignoring prerequisites and
    /// balances. `None` for unknown or maxed nodes.
    pub fn next_step(&self, node_id: &str, state: &PlayerTreeState) -> Option<(u32, u64)> {
        let node = self.graph.node(node_id)?;
        let current_level = state.current_level(node_id);
        if current_level >= node.max_level {
            return None;
        }
        Some(self.price_step(node, current_level, state))
    }

    fn restores_dormant(node_id: &str, current_level: u32, state: &PlayerTreeState) -> bool {
        current_level == 0 && state.dormant_level(node_id).is_some()
    }

    fn price_step(
        &self,
        node: &NodeDefinition,
        current_level: u32,
        state: &PlayerTreeState,
    ) -> (u32, u64) {
        let saved_level = match state.dormant_level(&node.id) {
            Some(saved_level) if current_level == 0 => saved_level,
            _ => return (current_level + 1, node.cost_at(current_level + 1)),
        };
        let restored = saved_level.clamp(1, node.max_level);
        let cost = match self.policy {
            DormantReunlockPolicy::Free => 0,
            DormantReunlockPolicy::Repay => node.cumulative_cost(restored),
        };
        (restored, cost)
    }

    /// Unlock or upgrade `node_id` by one level (or restore a dormant node).
    /// All-or-nothing: on any error `state` is left exactly as it was.
    pub fn unlock(
        &self,
        node_id: &str,
        state: &mut PlayerTreeState,
    ) -> Result<UnlockOutcome, ProgressionError> {
        let preview = self.preview_unlock(node_id, state)?;
        if !preview.affordable {
            return Err(ProgressionError::InsufficientTokens {
                tier: preview.tier,
                required: preview.cost,
                available: state.ledger.eligible_total(preview.tier),
            });
        }

        let spent = state.ledger.debit(preview.tier, preview.cost)?;
        if preview.restores_dormant {
            state.dormant_levels.remove(node_id);
        }
        state.set_level(node_id, preview.next_level);

        debug!(
            "{}: {} {} -> {} (cost {} {})",
            self.graph.id(),
            node_id,
            preview.current_level,
            preview.next_level,
            preview.cost,
            preview.tier
        );

        Ok(UnlockOutcome {
            node_id: preview.node_id,
            previous_level: preview.current_level,
            new_level: preview.next_level,
            spent,
            restored_from_dormant: preview.restores_dormant,
            balances: state.ledger.balances(),
        })
    }

    /// Relinquish all progress in the tree. Ordinary nodes are cleared and
    /// refunded at their required tier for every level reached; special nodes
    /// keep their level as dormant and refund nothing.
    pub fn reset(&self, state: &mut PlayerTreeState) -> ResetOutcome {
        let mut outcome = ResetOutcome {
            refund: TokenTier::zeroed(),
            ..ResetOutcome::default()
        };

        let unlocked = std::mem::take(&mut state.unlocked_levels);
        for (node_id, level) in unlocked {
            match self.graph.node(&node_id) {
                Some(node) if node.special => {
                    state.dormant_levels.insert(node_id.clone(), level);
                    outcome.parked.push((node_id, level));
                }
                Some(node) => {
                    let entry = outcome.refund.entry(node.required_tier).or_insert(0);
                    *entry = entry.saturating_add(node.cumulative_cost(level));
                    outcome.cleared.push(node_id);
                }
                None => {
                    warn!(
                        "{}: dropping unknown node {} at level {} during reset",
                        self.graph.id(),
                        node_id,
                        level
                    );
                    outcome.orphaned.push(node_id);
                }
            }
        }

        state.ledger.credit_all(&outcome.refund);
        debug!(
            "{}: reset cleared {} node(s), parked {}, refunded {}",
            self.graph.id(),
            outcome.cleared.len(),
            outcome.parked.len(),
            outcome.total_refund()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::graph::SkillTreeBuilder;
    use crate::skills::tokens::TokenLedger;
    use crate::skills::types::NodeDefinition;

    fn graph() -> SkillTreeGraph {
        SkillTreeBuilder::new("mining", "Mining", "root")
            .node(NodeDefinition::new("root", "Prospecting", TokenTier::Basic, 0))
            .node(NodeDefinition::new("a", "Ore Sense", TokenTier::Basic, 0).with_costs(&[2, 3]))
            .node(NodeDefinition::new("b", "Deep Vein", TokenTier::Advanced, 4))
            .node(NodeDefinition::new("relic", "Relic Pick", TokenTier::Basic, 0).with_costs(&[1, 1]).as_special())
            .edge("root", "a", 1)
            .edge("a", "b", 2)
            .edge("root", "relic", 1)
            .build()
            .unwrap()
    }

    #[test]
    fn preconditions_fail_in_order() {
        let graph = graph();
        let engine = ProgressionEngine::new(&graph);
        let mut state = PlayerTreeState::new();

        assert_eq!(
            engine.unlock("nope", &mut state).unwrap_err(),
            ProgressionError::UnknownNode("nope".into())
        );
        // b is both unavailable and unaffordable; availability is reported first.
        assert_eq!(
            engine.unlock("b", &mut state).unwrap_err(),
            ProgressionError::PrerequisiteNotMet("b".into())
        );
        engine.unlock("root", &mut state).unwrap();
        assert!(matches!(
            engine.unlock("root", &mut state).unwrap_err(),
            ProgressionError::AlreadyMaxLevel { max_level: 1, .. }
        ));
        assert!(matches!(
            engine.unlock("a", &mut state).unwrap_err(),
            ProgressionError::InsufficientTokens { required: 2, available: 0, .. }
        ));
    }

    #[test]
    fn edge_min_level_gates_dependents() {
        let graph = graph();
        let engine = ProgressionEngine::new(&graph);
        let mut state = PlayerTreeState::with_ledger(TokenLedger::with_balances([
            (TokenTier::Basic, 5),
        ]));
        engine.unlock("root", &mut state).unwrap();
        engine.unlock("a", &mut state).unwrap();
        assert!(!engine.is_available("b", &state));
        engine.unlock("a", &mut state).unwrap();
        assert!(engine.is_available("b", &state));
        assert_eq!(engine.node_state("b", &state), Some(NodeState::Available));
    }

    #[test]
    fn preview_matches_unlock() {
        let graph = graph();
        let engine = ProgressionEngine::new(&graph);
        let mut state = PlayerTreeState::with_ledger(TokenLedger::with_balances([
            (TokenTier::Basic, 2),
        ]));
        engine.unlock("root", &mut state).unwrap();
        let preview = engine.preview_unlock("a", &state).unwrap();
        assert_eq!(preview.next_level, 1);
        assert_eq!(preview.cost, 2);
        assert!(preview.affordable);
        let outcome = engine.unlock("a", &mut state).unwrap();
        assert_eq!(outcome.new_level, preview.next_level);
        let preview = engine.preview_unlock("a", &state).unwrap();
        assert_eq!(preview.cost, 3);
        assert!(!preview.affordable);
    }

    #[test]
    fn dormant_node_restores_under_each_policy() {
        let graph = graph();
        for (policy, cost) in [
            (DormantReunlockPolicy::Free, 0),
            (DormantReunlockPolicy::Repay, 2),
        ] {
            let engine = ProgressionEngine::new(&graph).with_policy(policy);
            let mut state = PlayerTreeState::with_ledger(TokenLedger::with_balances([
                (TokenTier::Basic, 2),
            ]));
            engine.unlock("root", &mut state).unwrap();
            engine.unlock("relic", &mut state).unwrap();
            engine.unlock("relic", &mut state).unwrap();

            let outcome = engine.reset(&mut state);
            assert_eq!(outcome.parked, vec![("relic".to_string(), 2)]);
            assert_eq!(outcome.total_refund(), 0);
            assert_eq!(engine.node_state("relic", &state), Some(NodeState::Dormant { saved_level: 2 }));

            // Root has to come back before the dormant node is reachable again.
            assert_eq!(
                engine.unlock("relic", &mut state).unwrap_err(),
                ProgressionError::PrerequisiteNotMet("relic".into())
            );
            engine.unlock("root", &mut state).unwrap();
            state.ledger.credit(TokenTier::Basic, 2);
            let preview = engine.preview_unlock("relic", &state).unwrap();
            assert!(preview.restores_dormant);
            assert_eq!(preview.cost, cost);

            let restored = engine.unlock("relic", &mut state).unwrap();
            assert!(restored.restored_from_dormant);
            assert_eq!(restored.new_level, 2);
            assert_eq!(state.dormant_level("relic"), None);
            assert_eq!(state.ledger.balance(TokenTier::Basic), 2 - cost);
        }
    }
}
