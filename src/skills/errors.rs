use thiserror::Error;

use crate::skills::tokens::TokenTier;

/// Player-triggered failures of an unlock/upgrade attempt. Every variant leaves
/// the player's tree state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    /// The node id does not exist in the skill's tree.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// No incoming prerequisite edge is satisfied yet.
    #[error("prerequisite not met for {0}")]
    PrerequisiteNotMet(String),

    /// The node has no further levels to purchase.
    #[error("{node} is already at max level {max_level}")]
    AlreadyMaxLevel { node: String, max_level: u32 },

    /// The ledger cannot cover the cost at the required tier or above.
    #[error("insufficient tokens: need {required} {tier} or better, have {available}")]
    InsufficientTokens {
        tier: TokenTier,
        required: u64,
        available: u64,
    },
}

/// Configuration bugs found while validating a skill tree at load time.
/// Fatal to the offending tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphIntegrityError {
    #[error("tree {0} has no nodes")]
    EmptyTree(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("root node {0} is not defined")]
    MissingRoot(String),

    #[error("edge {from} -> {to} references a node outside the tree")]
    UnknownEdgeEndpoint { from: String, to: String },

    #[error("edge {from} -> {root} targets the root node")]
    EdgeIntoRoot { from: String, root: String },

    #[error("node {0} must have max_level >= 1")]
    InvalidMaxLevel(String),

    #[error("node {node} lists {found} costs for {expected} levels")]
    CostTableMismatch {
        node: String,
        expected: u32,
        found: usize,
    },

    #[error("edge {from} -> {to} requires level {min_level} but {from} tops out at {max_level}")]
    UnsatisfiableEdge {
        from: String,
        to: String,
        min_level: u32,
        max_level: u32,
    },

    #[error("prerequisite cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("nodes unreachable from root: {}", .0.join(", "))]
    Unreachable(Vec<String>),
}

/// Errors that can arise while loading trees or persisting player state.
#[derive(Debug, Error)]
pub enum SkillTreeError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (seed reads, directory creation).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file could not be parsed.
    #[error("seed parse error in {path}: {source}")]
    SeedParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A tree failed validation while being registered.
    #[error("skill tree {skill} failed validation: {source}")]
    Integrity {
        skill: String,
        #[source]
        source: GraphIntegrityError,
    },

    /// Two seed files declared the same skill id.
    #[error("skill already registered: {0}")]
    DuplicateSkill(String),

    /// Requested skill is not in the registry.
    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    /// Player-triggered failure bubbled through the service layer.
    #[error(transparent)]
    Progression(#[from] ProgressionError),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Internal error (poisoned locks, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl SkillTreeError {
    /// True when the failure was caused by the player's request rather than
    /// by configuration or storage.
    pub fn is_player_error(&self) -> bool {
        matches!(self, SkillTreeError::Progression(_))
    }
}
