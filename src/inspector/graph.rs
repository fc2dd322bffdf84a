//! Relationship-graph construction.
//!
//! Builds a bounded view of the key-relationship topology rooted at one
//! key: breadth-first traversal with a visited set so cyclic graphs
//! terminate, a node budget so huge graphs stay renderable, and a Mermaid
//! text rendering for visualization tooling.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::constants;
use crate::models::{CacheEntry, CacheType};

use super::{shorten_key, CacheInspector};

/// Traversal bounds and rendering options.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Maximum hops from the root.
    pub max_depth: usize,
    /// Maximum number of nodes in the output graph.
    pub max_nodes: usize,
    /// Include nodes whose entry is expired (or missing entirely).
    pub include_expired: bool,
    /// Resolve per-node size estimates.
    pub include_metadata: bool,
    /// Tenant scope; lets node probing reach the persisted tier.
    pub owner: Option<String>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_GRAPH_DEPTH,
            max_nodes: constants::DEFAULT_MAX_GRAPH_NODES,
            include_expired: false,
            include_metadata: true,
            owner: None,
        }
    }
}

/// One visited key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable diagram identifier (`n0`, `n1`, ...).
    pub id: String,
    pub key: String,
    /// Display label, shortened for rendering.
    pub label: String,
    /// Tier the entry was found in; `None` when the key has no live entry
    /// in any probeable tier.
    pub cache_type: Option<CacheType>,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<usize>,
}

/// A directed `source -> target` relationship between two keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Bounded relationship graph plus its rendered diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    pub root: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Set when the node budget cut the traversal short.
    pub truncated: bool,
    /// Mermaid flowchart text for visualization tooling.
    pub diagram: String,
}

impl RelationshipGraph {
    fn empty(root: &str) -> Self {
        Self {
            root: root.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
            truncated: false,
            diagram: "graph TD\n".to_string(),
        }
    }
}

impl CacheInspector {
    /// Build the relationship graph rooted at `root_key`.
    ///
    /// Traversal is breadth-first with a visited set, so a key that
    /// transitively relates back to itself terminates; the cycle still
    /// shows up as an edge to the already-visited node. Expired (or
    /// missing) keys are omitted before their node is added unless
    /// `include_expired` is set - an excluded root therefore yields an
    /// empty graph rather than an error.
    pub async fn build_relationship_graph(
        &self,
        root_key: &str,
        options: &GraphOptions,
    ) -> RelationshipGraph {
        let Some(root_node) = self.resolve_node(root_key, 0, options).await else {
            return RelationshipGraph::empty(root_key);
        };

        let mut nodes: Vec<GraphNode> = vec![root_node];
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([root_key.to_string()]);
        let mut truncated = false;
        let mut queue: VecDeque<(String, usize)> = VecDeque::from([(root_key.to_string(), 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= options.max_depth {
                continue;
            }

            for related in self.manager().relationships().related_of(&current) {
                if visited.contains(&related) {
                    // Cycle: record the edge without re-descending.
                    edges.push(GraphEdge {
                        source: current.clone(),
                        target: related,
                    });
                    continue;
                }

                if visited.len() >= options.max_nodes {
                    truncated = true;
                    break;
                }

                let Some(node) = self.resolve_node(&related, nodes.len(), options).await else {
                    continue;
                };

                visited.insert(related.clone());
                nodes.push(node);
                edges.push(GraphEdge {
                    source: current.clone(),
                    target: related.clone(),
                });
                queue.push_back((related, depth + 1));
            }
        }

        let diagram = render_mermaid(&nodes, &edges);
        RelationshipGraph {
            root: root_key.to_string(),
            nodes,
            edges,
            truncated,
            diagram,
        }
    }

    /// Resolve one key into a graph node, honoring the expiry filter.
    async fn resolve_node(
        &self,
        key: &str,
        index: usize,
        options: &GraphOptions,
    ) -> Option<GraphNode> {
        let max_label = self.manager().config().key_display_max_len;
        let entry = self
            .manager()
            .probe_entry(key, options.owner.as_deref())
            .await;

        match entry {
            Some(entry) => {
                let expired = entry.is_expired();
                if expired && !options.include_expired {
                    return None;
                }
                let size_bytes = if options.include_metadata {
                    Some(self.node_size(&entry, options).await)
                } else {
                    None
                };
                Some(GraphNode {
                    id: format!("n{index}"),
                    key: key.to_string(),
                    label: shorten_key(key, max_label),
                    cache_type: Some(entry.cache_type),
                    expired,
                    size_bytes,
                })
            }
            // A related key with no live entry anywhere behaves like an
            // expired one: only shown on request, with unknown tier.
            None if options.include_expired => Some(GraphNode {
                id: format!("n{index}"),
                key: key.to_string(),
                label: shorten_key(key, max_label),
                cache_type: None,
                expired: true,
                size_bytes: None,
            }),
            None => None,
        }
    }

    async fn node_size(&self, entry: &CacheEntry, options: &GraphOptions) -> usize {
        if entry.cache_type.stores_serialized_text() {
            self.manager()
                .store_for(entry.cache_type)
                .entry_size(&entry.key, options.owner.as_deref())
                .await
                .unwrap_or_else(|| entry.size_estimate())
        } else {
            entry.size_estimate()
        }
    }
}

/// Render nodes and edges as a Mermaid flowchart.
fn render_mermaid(nodes: &[GraphNode], edges: &[GraphEdge]) -> String {
    let mut out = String::from("graph TD\n");

    for node in nodes {
        out.push_str(&format!("    {}[\"{}\"]", node.id, node.label));
        if node.expired {
            out.push_str(":::expired");
        }
        out.push('\n');
    }

    for edge in edges {
        let source = nodes.iter().find(|n| n.key == edge.source);
        let target = nodes.iter().find(|n| n.key == edge.target);
        if let (Some(source), Some(target)) = (source, target) {
            out.push_str(&format!("    {} --> {}\n", source.id, target.id));
        }
    }

    if nodes.iter().any(|n| n.expired) {
        out.push_str("    classDef expired stroke-dasharray: 5 5\n");
    }

    out
}
