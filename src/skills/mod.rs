//! Skill tree data model, progression engine and persistence.
//! Static trees come from JSON seeds through the registry; per-character state
//! lives in a Sled store and is only changed through engine transactions.

pub mod engine;
pub mod errors;
pub mod graph;
pub mod registry;
pub mod report;
pub mod seed_loader;
pub mod service;
pub mod storage;
pub mod tokens;
pub mod types;

pub use engine::{
    DormantReunlockPolicy, ProgressionEngine, ResetOutcome, UnlockOutcome, UnlockPreview,
};
pub use errors::{GraphIntegrityError, ProgressionError, SkillTreeError};
pub use graph::{Edge, SkillTreeBuilder, SkillTreeGraph};
pub use registry::SkillRegistry;
pub use report::{
    format_refund, format_tree_status, format_unlock, node_status, tree_status, NodeStatus,
};
pub use seed_loader::{load_tree_from_json, parse_tree};
pub use service::SkillService;
pub use storage::{SkillStore, SkillStoreBuilder};
pub use tokens::{format_ledger, format_tier_amounts, TierAmounts, TokenLedger, TokenTier};
pub use types::*;
