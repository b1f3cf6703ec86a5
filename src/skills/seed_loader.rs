//! Seed data loaders for data-driven skill trees
//!
//! Skill trees are described by JSON files in `data/seeds/skills/`, one tree
//! per file, so admins can tune costs and layouts without recompiling.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::skills::errors::SkillTreeError;
use crate::skills::graph::{Edge, SkillTreeBuilder, SkillTreeGraph};
use crate::skills::tokens::TokenTier;
use crate::skills::types::{Anchor, NodeDefinition};

/// Parse one tree file and validate it.
pub fn load_tree_from_json<P: AsRef<Path>>(path: P) -> Result<SkillTreeGraph, SkillTreeError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let seed: SkillTreeSeed =
        serde_json::from_str(&contents).map_err(|source| SkillTreeError::SeedParse {
            path: path.display().to_string(),
            source,
        })?;
    seed.into_graph()
}

/// Parse a tree from an in-memory JSON document.
pub fn parse_tree(json: &str) -> Result<SkillTreeGraph, SkillTreeError> {
    let seed: SkillTreeSeed =
        serde_json::from_str(json).map_err(|source| SkillTreeError::SeedParse {
            path: "<inline>".to_string(),
            source,
        })?;
    seed.into_graph()
}

/// Every `*.json` file directly inside `dir`, sorted by file name.
pub fn seed_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, SkillTreeError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ============================================================================
// Seed data structures that match JSON format
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SkillTreeSeed {
    id: String,
    name: String,
    root: String,
    nodes: Vec<NodeSeed>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeSeed {
    id: String,
    name: String,
    /// Defaults to the number of listed costs.
    max_level: Option<u32>,
    costs: Vec<u64>,
    #[serde(default = "default_tier")]
    tier: TokenTier,
    #[serde(default)]
    special: bool,
    #[serde(default)]
    anchor: Anchor,
    #[serde(default)]
    descriptions: Vec<String>,
}

fn default_tier() -> TokenTier {
    TokenTier::Basic
}

impl SkillTreeSeed {
    fn into_graph(self) -> Result<SkillTreeGraph, SkillTreeError> {
        let skill = self.id.clone();
        let nodes = self.nodes.into_iter().map(|seed| NodeDefinition {
            max_level: seed.max_level.unwrap_or(seed.costs.len() as u32),
            id: seed.id,
            name: seed.name,
            costs: seed.costs,
            required_tier: seed.tier,
            special: seed.special,
            anchor: seed.anchor,
            descriptions: seed.descriptions,
        });
        SkillTreeBuilder::new(&self.id, &self.name, &self.root)
            .nodes(nodes)
            .edges(self.edges)
            .build()
            .map_err(|source| SkillTreeError::Integrity { skill, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::errors::GraphIntegrityError;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_tree_from_json("nonexistent.json");
        assert!(matches!(result, Err(SkillTreeError::Io(_))));
    }

    #[test]
    fn test_parse_defaults() {
        let graph = parse_tree(
            r#"{
                "id": "fishing", "name": "Fishing", "root": "cast",
                "nodes": [
                    { "id": "cast", "name": "Cast", "costs": [0] },
                    { "id": "lure", "name": "Lure", "costs": [1, 2], "tier": "advanced",
                      "anchor": { "x": 1, "y": 0 } }
                ],
                "edges": [ { "from": "cast", "to": "lure" } ]
            }"#,
        )
        .expect("valid seed");
        let lure = graph.node("lure").unwrap();
        assert_eq!(lure.max_level, 2);
        assert_eq!(lure.required_tier, TokenTier::Advanced);
        assert_eq!(graph.prerequisites_of("lure"), &[("cast".to_string(), 1)]);
        assert_eq!(graph.node("cast").unwrap().required_tier, TokenTier::Basic);
    }

    #[test]
    fn test_integrity_error_names_skill() {
        let err = parse_tree(
            r#"{ "id": "farming", "name": "Farming", "root": "hoe",
                 "nodes": [ { "id": "hoe", "name": "Hoe", "max_level": 2, "costs": [1] } ] }"#,
        )
        .unwrap_err();
        match err {
            SkillTreeError::Integrity { skill, source } => {
                assert_eq!(skill, "farming");
                assert!(matches!(source, GraphIntegrityError::CostTableMismatch { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            parse_tree("{ not json"),
            Err(SkillTreeError::SeedParse { .. })
        ));
    }
}
