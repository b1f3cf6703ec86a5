//! Session-facing façade: ties the registry, the store and the engine together
//! and serializes transactions per (character, skill).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, info};

use crate::logutil::escape_log;
use crate::skills::engine::{
    DormantReunlockPolicy, ProgressionEngine, ResetOutcome, UnlockOutcome, UnlockPreview,
};
use crate::skills::errors::{ProgressionError, SkillTreeError};
use crate::skills::registry::SkillRegistry;
use crate::skills::report::{format_refund, tree_status, NodeStatus};
use crate::skills::storage::SkillStore;
use crate::skills::tokens::{format_tier_amounts, TierAmounts, TokenTier};
use crate::skills::types::PlayerTreeState;

pub struct SkillService {
    registry: SkillRegistry,
    store: SkillStore,
    policy: DormantReunlockPolicy,
    /// One mutex per "character/skill" pair, created on first use.
    locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SkillService {
    pub fn new(registry: SkillRegistry, store: SkillStore) -> Self {
        Self {
            registry,
            store,
            policy: DormantReunlockPolicy::default(),
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_policy(mut self, policy: DormantReunlockPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SkillStore {
        &self.store
    }

    pub fn policy(&self) -> DormantReunlockPolicy {
        self.policy
    }

    /// Matches the store key: names are case-sensitive in both.
    fn lock_key(character: &str, skill: &str) -> String {
        format!("{}/{}", character, skill)
    }

    fn lock_for(&self, character: &str, skill: &str) -> Result<Arc<Mutex<()>>, SkillTreeError> {
        let key = Self::lock_key(character, skill);
        {
            let locks = self
                .locks
                .read()
                .map_err(|_| SkillTreeError::Internal("lock table poisoned".to_string()))?;
            if let Some(lock) = locks.get(&key) {
                return Ok(Arc::clone(lock));
            }
        }
        let mut locks = self
            .locks
            .write()
            .map_err(|_| SkillTreeError::Internal("lock table poisoned".to_string()))?;
        Ok(Arc::clone(locks.entry(key).or_default()))
    }

    /// Load, mutate and save one tree state under its pair lock. Nothing is
    /// saved when `apply` fails.
    fn transact<T, F>(&self, character: &str, skill: &str, apply: F) -> Result<T, SkillTreeError>
    where
        F: FnOnce(&ProgressionEngine<'_>, &mut PlayerTreeState) -> Result<T, ProgressionError>,
    {
        let graph = self.registry.require(skill)?;
        let lock = self.lock_for(character, skill)?;
        let _guard = lock.lock().map_err(|_| {
            SkillTreeError::Internal(format!("tree lock poisoned: {}/{}", character, skill))
        })?;

        let mut state = self.store.load_or_default(character, skill)?;
        let engine = ProgressionEngine::new(&graph).with_policy(self.policy);
        let result = apply(&engine, &mut state)?;
        self.store.put_state(character, skill, &state)?;
        Ok(result)
    }

    /// Credit tokens to a character's ledger for `skill`. Returns the new balances.
    pub fn grant(
        &self,
        character: &str,
        skill: &str,
        tier: TokenTier,
        amount: u64,
    ) -> Result<TierAmounts, SkillTreeError> {
        let balances = self.transact(character, skill, |_, state| {
            state.ledger.credit(tier, amount);
            Ok(state.ledger.balances())
        })?;
        info!(
            "Granted {} {} token(s) to {} in {} (now {})",
            amount,
            tier,
            escape_log(character),
            skill,
            format_tier_amounts(&balances)
        );
        Ok(balances)
    }

    pub fn unlock(
        &self,
        character: &str,
        skill: &str,
        node_id: &str,
    ) -> Result<UnlockOutcome, SkillTreeError> {
        let result = self.transact(character, skill, |engine, state| engine.unlock(node_id, state));
        match &result {
            Ok(outcome) => info!(
                "{} unlocked {}/{} level {} -> {}",
                escape_log(character),
                skill,
                escape_log(node_id),
                outcome.previous_level,
                outcome.new_level
            ),
            Err(e) if e.is_player_error() => debug!(
                "{} could not unlock {}/{}: {}",
                escape_log(character),
                skill,
                escape_log(node_id),
                e
            ),
            Err(_) => {}
        }
        result
    }

    pub fn reset(&self, character: &str, skill: &str) -> Result<ResetOutcome, SkillTreeError> {
        let outcome = self.transact(character, skill, |engine, state| Ok(engine.reset(state)))?;
        info!(
            "{} reset {}: {}",
            escape_log(character),
            skill,
            format_refund(&outcome)
        );
        Ok(outcome)
    }

    /// Registered skills the character has stored progress in. Stored state
    /// for skills no longer in the registry is skipped.
    pub fn stored_skills(&self, character: &str) -> Result<Vec<String>, SkillTreeError> {
        let mut skills = self.store.list_skills(character)?;
        skills.retain(|skill| {
            let known = self.registry.get(skill).is_some();
            if !known {
                debug!(
                    "Skipping unregistered skill {} stored for {}",
                    escape_log(skill),
                    escape_log(character)
                );
            }
            known
        });
        Ok(skills)
    }

    /// Reset every registered skill the character has stored progress in.
    pub fn reset_all(&self, character: &str) -> Result<Vec<(String, ResetOutcome)>, SkillTreeError> {
        let mut outcomes = Vec::new();
        for skill in self.stored_skills(character)? {
            let outcome = self.reset(character, &skill)?;
            outcomes.push((skill, outcome));
        }
        Ok(outcomes)
    }

    pub fn preview(
        &self,
        character: &str,
        skill: &str,
        node_id: &str,
    ) -> Result<UnlockPreview, SkillTreeError> {
        let graph = self.registry.require(skill)?;
        let state = self.store.load_or_default(character, skill)?;
        let engine = ProgressionEngine::new(&graph).with_policy(self.policy);
        Ok(engine.preview_unlock(node_id, &state)?)
    }

    /// Current stored state (empty on first access).
    pub fn state(&self, character: &str, skill: &str) -> Result<PlayerTreeState, SkillTreeError> {
        self.registry.require(skill)?;
        self.store.load_or_default(character, skill)
    }

    pub fn tree_status(&self, character: &str, skill: &str) -> Result<Vec<NodeStatus>, SkillTreeError> {
        let graph = self.registry.require(skill)?;
        let state = self.store.load_or_default(character, skill)?;
        let engine = ProgressionEngine::new(&graph).with_policy(self.policy);
        Ok(tree_status(&engine, &state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_keys_follow_store_case() {
        assert_ne!(
            SkillService::lock_key("Alice", "mining"),
            SkillService::lock_key("alice", "mining")
        );
        assert_eq!(SkillService::lock_key("alice", "mining"), "alice/mining");
    }
}
