//! Startup registry of validated skill trees, read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use log::{error, info};

use crate::skills::errors::SkillTreeError;
use crate::skills::graph::SkillTreeGraph;
use crate::skills::seed_loader::{load_tree_from_json, seed_files};

#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    trees: BTreeMap<String, Arc<SkillTreeGraph>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every tree file in `dir`. Stops at the first file that fails to
    /// parse or validate so broken trees surface at startup.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, SkillTreeError> {
        let dir = dir.as_ref();
        let mut registry = Self::new();
        for path in seed_files(dir)? {
            let graph = load_tree_from_json(&path).inspect_err(|e| {
                error!("Failed to load skill tree {}: {}", path.display(), e);
            })?;
            info!(
                "Loaded skill tree '{}' ({} nodes) from {}",
                graph.id(),
                graph.node_count(),
                path.display()
            );
            registry.register(graph)?;
        }
        Ok(registry)
    }

    /// Add a validated tree. Skill ids must be unique.
    pub fn register(&mut self, graph: SkillTreeGraph) -> Result<Arc<SkillTreeGraph>, SkillTreeError> {
        if self.trees.contains_key(graph.id()) {
            return Err(SkillTreeError::DuplicateSkill(graph.id().to_string()));
        }
        let graph = Arc::new(graph);
        self.trees.insert(graph.id().to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    pub fn get(&self, skill: &str) -> Option<Arc<SkillTreeGraph>> {
        self.trees.get(skill).cloned()
    }

    pub fn require(&self, skill: &str) -> Result<Arc<SkillTreeGraph>, SkillTreeError> {
        self.get(skill)
            .ok_or_else(|| SkillTreeError::UnknownSkill(skill.to_string()))
    }

    /// Registered skill ids, sorted.
    pub fn skill_ids(&self) -> Vec<String> {
        self.trees.keys().cloned().collect()
    }

    pub fn trees(&self) -> impl Iterator<Item = &Arc<SkillTreeGraph>> {
        self.trees.values()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
