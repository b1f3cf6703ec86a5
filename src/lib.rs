//! # Skilltree - Skill Tree Progression for Island Game Servers
//!
//! Skilltree runs the character-skill progression of a cooperative island game:
//! per-skill graphs of unlockable, upgradable nodes paid for with tiered tokens.
//!
//! ## Features
//!
//! - **Data-driven trees**: Skill trees are JSON seeds validated at startup (cycles, unreachable nodes, bad cost tables).
//! - **Tiered tokens**: Basic < Advanced < Master, where higher tiers may pay for lower requirements and never the reverse.
//! - **Transactions**: Unlock/upgrade and reset are all-or-nothing; resets refund exactly what the reached levels cost.
//! - **Special nodes**: Survive a reset as dormant and can be re-activated under a configurable policy.
//! - **Persistence**: Per-character, per-skill state in an embedded Sled store, serialized per (character, skill).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skilltree::skills::{SkillRegistry, SkillService, SkillStore, TokenTier};
//!
//! fn main() -> Result<(), skilltree::skills::SkillTreeError> {
//!     let registry = SkillRegistry::load_dir("data/seeds/skills")?;
//!     let store = SkillStore::open("data/skill_state")?;
//!     let service = SkillService::new(registry, store);
//!
//!     service.grant("alice", "mining", TokenTier::Basic, 5)?;
//!     let outcome = service.unlock("alice", "mining", "prospecting")?;
//!     println!("now level {}", outcome.new_level);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`skills`] - Tree model, token ledger, progression engine, registry and store
//! - [`config`] - Configuration management
//! - [`logutil`] - Log-safe escaping of player-supplied identifiers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  SkillService   │ ← per (character, skill) locking, load/save
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Progression     │ ← availability, unlock, reset (pure)
//! │ Engine          │
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Registry/Store  │ ← static graphs, persisted player state
//! └─────────────────┘
//! ```

pub mod config;
pub mod logutil;
pub mod skills;
