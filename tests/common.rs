//! Test utilities & fixtures shared by the integration tests.

use std::path::{Path, PathBuf};

use skilltree::skills::{
    NodeDefinition, SkillRegistry, SkillService, SkillStoreBuilder, SkillTreeBuilder,
    SkillTreeGraph, TokenTier,
};

/// Directory holding the shipped skill tree seeds.
#[allow(dead_code)]
pub fn seed_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("seeds")
        .join("skills")
}

/// Small tree used across tests:
///
/// ```text
/// root (free) ──1──> a (2B, 3B) ──2──> b (4A)
///      └──────1────> relic (1B, 1B, special)
///      └──────1────> c (2M)
/// ```
#[allow(dead_code)]
pub fn scenario_tree() -> SkillTreeGraph {
    SkillTreeBuilder::new("mining", "Mining", "root")
        .node(NodeDefinition::new("root", "Prospecting", TokenTier::Basic, 0))
        .node(NodeDefinition::new("a", "Ore Sense", TokenTier::Basic, 0).with_costs(&[2, 3]))
        .node(NodeDefinition::new("b", "Deep Vein", TokenTier::Advanced, 4))
        .node(NodeDefinition::new("c", "Gem Eye", TokenTier::Master, 2))
        .node(
            NodeDefinition::new("relic", "Relic Pick", TokenTier::Basic, 0)
                .with_costs(&[1, 1])
                .as_special(),
        )
        .edge("root", "a", 1)
        .edge("a", "b", 2)
        .edge("root", "relic", 1)
        .edge("root", "c", 1)
        .build()
        .expect("scenario tree is valid")
}

/// Service over the scenario tree backed by a throwaway store.
#[allow(dead_code)]
pub fn temp_service() -> (tempfile::TempDir, SkillService) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SkillStoreBuilder::new(dir.path()).open().expect("store");
    let mut registry = SkillRegistry::new();
    registry.register(scenario_tree()).expect("register");
    (dir, SkillService::new(registry, store))
}
