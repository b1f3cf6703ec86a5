//! Static skill tree graphs: node definitions, prerequisite edges and the
//! load-time integrity checks that guard them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::errors::GraphIntegrityError;
use super::types::{Anchor, NodeDefinition, PlayerTreeState};

/// A directed prerequisite: `to` becomes reachable once `from` is unlocked at
/// level `min_level` or higher.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default = "default_min_level")]
    pub min_level: u32,
}

fn default_min_level() -> u32 {
    1
}

impl Edge {
    pub fn new(from: &str, to: &str, min_level: u32) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            min_level,
        }
    }
}

/// Immutable node/edge set for one skill. Only constructed through
/// [`SkillTreeBuilder::build`], so every instance has passed validation.
#[derive(Debug, Clone)]
pub struct SkillTreeGraph {
    id: String,
    name: String,
    root: String,
    nodes: BTreeMap<String, NodeDefinition>,
    /// source -> {(target, min_source_level)}
    edges: BTreeMap<String, BTreeSet<(String, u32)>>,
    /// target -> [(source, min_source_level)]
    incoming: HashMap<String, Vec<(String, u32)>>,
}

/// Collects nodes and edges for a tree, then validates them in one go.
#[derive(Debug, Clone)]
pub struct SkillTreeBuilder {
    id: String,
    name: String,
    root: String,
    nodes: Vec<NodeDefinition>,
    edges: Vec<Edge>,
}

impl SkillTreeBuilder {
    pub fn new(id: &str, name: &str, root: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            root: root.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(mut self, node: NodeDefinition) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn edge(mut self, from: &str, to: &str, min_level: u32) -> Self {
        self.edges.push(Edge::new(from, to, min_level));
        self
    }

    pub fn nodes(mut self, nodes: impl IntoIterator<Item = NodeDefinition>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn edges(mut self, edges: impl IntoIterator<Item = Edge>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn build(self) -> Result<SkillTreeGraph, GraphIntegrityError> {
        if self.nodes.is_empty() {
            return Err(GraphIntegrityError::EmptyTree(self.id));
        }

        let mut nodes = BTreeMap::new();
        for node in self.nodes {
            if node.max_level == 0 {
                return Err(GraphIntegrityError::InvalidMaxLevel(node.id));
            }
            if node.costs.len() != node.max_level as usize {
                return Err(GraphIntegrityError::CostTableMismatch {
                    expected: node.max_level,
                    found: node.costs.len(),
                    node: node.id,
                });
            }
            if nodes.contains_key(&node.id) {
                return Err(GraphIntegrityError::DuplicateNode(node.id));
            }
            nodes.insert(node.id.clone(), node);
        }

        if !nodes.contains_key(&self.root) {
            return Err(GraphIntegrityError::MissingRoot(self.root));
        }

        let mut edges: BTreeMap<String, BTreeSet<(String, u32)>> = BTreeMap::new();
        let mut incoming: HashMap<String, Vec<(String, u32)>> = HashMap::new();
        for edge in self.edges {
            let Some(source) = nodes.get(&edge.from) else {
                return Err(GraphIntegrityError::UnknownEdgeEndpoint {
                    from: edge.from,
                    to: edge.to,
                });
            };
            if !nodes.contains_key(&edge.to) {
                return Err(GraphIntegrityError::UnknownEdgeEndpoint {
                    from: edge.from,
                    to: edge.to,
                });
            }
            if edge.to == self.root {
                return Err(GraphIntegrityError::EdgeIntoRoot {
                    from: edge.from,
                    root: edge.to,
                });
            }
            if edge.min_level == 0 || edge.min_level > source.max_level {
                return Err(GraphIntegrityError::UnsatisfiableEdge {
                    max_level: source.max_level,
                    from: edge.from,
                    to: edge.to,
                    min_level: edge.min_level,
                });
            }
            let inserted = edges
                .entry(edge.from.clone())
                .or_default()
                .insert((edge.to.clone(), edge.min_level));
            if inserted {
                incoming
                    .entry(edge.to)
                    .or_default()
                    .push((edge.from, edge.min_level));
            }
        }

        let graph = SkillTreeGraph {
            id: self.id,
            name: self.name,
            root: self.root,
            nodes,
            edges,
            incoming,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphIntegrityError::Cycle(cycle));
        }
        let unreachable = graph.unreachable_nodes();
        if !unreachable.is_empty() {
            return Err(GraphIntegrityError::Unreachable(unreachable));
        }

        Ok(graph)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitMark {
    InProgress,
    Done,
}

impl SkillTreeGraph {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeDefinition> {
        self.nodes.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Flattened edge list, ordered by source then target.
    pub fn edges(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .flat_map(|(from, targets)| {
                targets
                    .iter()
                    .map(move |(to, min_level)| Edge::new(from, to, *min_level))
            })
            .collect()
    }

    /// Incoming edges of `node_id` as `(source, min_source_level)`.
    pub fn prerequisites_of(&self, node_id: &str) -> &[(String, u32)] {
        self.incoming
            .get(node_id)
            .map(|edges| edges.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes that `node_id` leads to, with the level it must reach.
    pub fn dependents_of(&self, node_id: &str) -> Vec<(&str, u32)> {
        self.edges
            .get(node_id)
            .map(|targets| {
                targets
                    .iter()
                    .map(|(to, min_level)| (to.as_str(), *min_level))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The root is always available; any other node needs at least one
    /// incoming edge whose source is unlocked at the edge's minimum level.
    /// Dormant levels do not count. Unknown ids are never available.
    pub fn is_available(&self, node_id: &str, state: &PlayerTreeState) -> bool {
        if node_id == self.root {
            return true;
        }
        self.prerequisites_of(node_id)
            .iter()
            .any(|(source, min_level)| state.current_level(source) >= *min_level)
    }

    /// Nodes whose anchor lies inside the inclusive rectangle `[min, max]`,
    /// for renderers that scroll a fixed viewport over the tree.
    pub fn nodes_in_region(&self, min: Anchor, max: Anchor) -> Vec<&NodeDefinition> {
        self.nodes
            .values()
            .filter(|node| {
                (min.x..=max.x).contains(&node.anchor.x) && (min.y..=max.y).contains(&node.anchor.y)
            })
            .collect()
    }

    /// Bounding box of every anchor in the tree.
    pub fn bounds(&self) -> (Anchor, Anchor) {
        let mut anchors = self.nodes.values().map(|node| node.anchor);
        let Some(first) = anchors.next() else {
            return (Anchor::default(), Anchor::default());
        };
        anchors.fold((first, first), |(lo, hi), a| {
            (
                Anchor::new(lo.x.min(a.x), lo.y.min(a.y)),
                Anchor::new(hi.x.max(a.x), hi.y.max(a.y)),
            )
        })
    }

    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks: HashMap<&str, VisitMark> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();
        for start in self.nodes.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            if let Some(cycle) = self.visit(start, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut HashMap<&'a str, VisitMark>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        marks.insert(node, VisitMark::InProgress);
        path.push(node);
        if let Some(targets) = self.edges.get(node) {
            for (target, _) in targets {
                match marks.get(target.as_str()) {
                    Some(VisitMark::InProgress) => {
                        let start = path
                            .iter()
                            .position(|n| *n == target.as_str())
                            .unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|n| n.to_string()).collect();
                        cycle.push(target.clone());
                        return Some(cycle);
                    }
                    Some(VisitMark::Done) => {}
                    None => {
                        if let Some(cycle) = self.visit(target, marks, path) {
                            return Some(cycle);
                        }
                    }
                }
            }
        }
        path.pop();
        marks.insert(node, VisitMark::Done);
        None
    }

    fn unreachable_nodes(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        seen.insert(self.root.as_str());
        queue.push_back(self.root.as_str());
        while let Some(node) = queue.pop_front() {
            for (target, _) in self.dependents_of(node) {
                if seen.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        self.nodes
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .cloned()
            .collect()
    }
}
