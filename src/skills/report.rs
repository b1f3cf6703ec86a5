/// Read-only reporting over a tree and a player's state: per-node status
/// snapshots for UIs and compact text for chat/CLI output.
use serde::Serialize;

use super::engine::{ProgressionEngine, ResetOutcome, UnlockOutcome};
use super::tokens::{format_tier_amounts, TokenTier};
use super::types::{Anchor, NodeState, PlayerTreeState};

/// Everything a renderer needs to draw one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub id: String,
    pub name: String,
    pub state: NodeState,
    pub level: u32,
    pub max_level: u32,
    /// Price of the next step; `None` once the node is maxed.
    pub next_cost: Option<u64>,
    pub tier: TokenTier,
    pub affordable: bool,
    pub special: bool,
    pub anchor: Anchor,
    /// Description of the current level, if any.
    pub description: Option<String>,
}

pub fn node_status(
    engine: &ProgressionEngine<'_>,
    node_id: &str,
    state: &PlayerTreeState,
) -> Option<NodeStatus> {
    let node = engine.graph().node(node_id)?;
    let node_state = engine.node_state(node_id, state)?;
    let level = state.current_level(node_id);

    let next_cost = engine.next_step(node_id, state).map(|(_, cost)| cost);
    let affordable = engine
        .preview_unlock(node_id, state)
        .is_ok_and(|preview| preview.affordable);

    Some(NodeStatus {
        id: node.id.clone(),
        name: node.name.clone(),
        state: node_state,
        level,
        max_level: node.max_level,
        next_cost,
        tier: node.required_tier,
        affordable,
        special: node.special,
        anchor: node.anchor,
        description: node.description_at(level).map(str::to_string),
    })
}

/// Status of every node in the tree, ordered by id.
pub fn tree_status(engine: &ProgressionEngine<'_>, state: &PlayerTreeState) -> Vec<NodeStatus> {
    engine
        .graph()
        .nodes()
        .filter_map(|node| node_status(engine, &node.id, state))
        .collect()
}

fn state_marker(state: &NodeState) -> &'static str {
    match state {
        NodeState::Locked => "[ ]",
        NodeState::Available => "[+]",
        NodeState::Unlocked { .. } => "[*]",
        NodeState::Dormant { .. } => "[z]",
    }
}

/// One line per node, e.g. `[*] ore_sense 1/2 next 3B ok`.
pub fn format_tree_status(statuses: &[NodeStatus]) -> String {
    statuses
        .iter()
        .map(|status| {
            let mut line = format!(
                "{} {} {}/{}",
                state_marker(&status.state),
                status.id,
                status.level,
                status.max_level
            );
            if let NodeState::Dormant { saved_level } = status.state {
                line.push_str(&format!(" (saved {})", saved_level));
            }
            match status.next_cost {
                Some(cost) => {
                    line.push_str(&format!(" next {}{}", cost, status.tier.symbol()));
                    if status.affordable {
                        line.push_str(" ok");
                    }
                }
                None => line.push_str(" max"),
            }
            if status.special {
                line.push_str(" special");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// e.g. `ore_sense 1 -> 2, paid 3B 0A 0M`.
pub fn format_unlock(outcome: &UnlockOutcome) -> String {
    let verb = if outcome.restored_from_dormant {
        "restored"
    } else {
        "paid"
    };
    format!(
        "{} {} -> {}, {} {}",
        outcome.node_id,
        outcome.previous_level,
        outcome.new_level,
        verb,
        format_tier_amounts(&outcome.spent)
    )
}

/// e.g. `refunded 5B 0A 0M, cleared 2, dormant 1`.
pub fn format_refund(outcome: &ResetOutcome) -> String {
    let mut text = format!(
        "refunded {}, cleared {}, dormant {}",
        format_tier_amounts(&outcome.refund),
        outcome.cleared.len(),
        outcome.parked.len()
    );
    if !outcome.orphaned.is_empty() {
        text.push_str(&format!(", dropped {}", outcome.orphaned.len()));
    }
    text
}
