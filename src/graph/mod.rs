#![forbid(unsafe_code)]

//! Adjacency-list knowledge graph derived from the catalog tables.
//!
//! Nodes live in an arena (`Vec`) indexed through a hash map keyed by
//! [`NodeKey`]; each arena slot owns its node and its outgoing edges.
//! Neighbor queries therefore cost O(out-degree) regardless of graph size.
//!
//! Edge layout mirrors the table structure:
//!
//! - `Brand -> Series` ([`EdgeKind::HasSeries`]) for every series row
//! - `Model -> Series` ([`EdgeKind::BelongsTo`]) for every model row
//! - `Model -> Tech` ([`EdgeKind::UsesTech`]) for every association row
//!
//! The graph never validates its input; the tables are the source of truth
//! and the store keeps both in lockstep.

mod build;
mod traversal;
mod view;

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

pub use view::{GraphLink, GraphView, GraphViewNode};

/// Label of the synthetic root node when none is configured.
pub const DEFAULT_BRAND_LABEL: &str = "BYD 比亚迪";

/// Kind of entity a node stands for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The synthetic root.
    Brand,
    /// A series row.
    Series,
    /// A model row.
    Model,
    /// A tech row.
    Tech,
}

impl NodeKind {
    /// Short prefix used in rendered keys (`s_1`, `m_9001`, ...).
    pub fn prefix(self) -> &'static str {
        match self {
            NodeKind::Brand => "b",
            NodeKind::Series => "s",
            NodeKind::Model => "m",
            NodeKind::Tech => "t",
        }
    }
}

/// Relation carried by an edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Brand to series.
    HasSeries,
    /// Model to its series.
    BelongsTo,
    /// Model to a technology it uses.
    UsesTech,
}

/// Node identity. Ids are only unique per table, so the kind is part of the key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeKey {
    /// Entity kind.
    pub kind: NodeKind,
    /// Primary key within that kind.
    pub id: i64,
}

impl NodeKey {
    /// The brand root.
    pub const BRAND: NodeKey = NodeKey {
        kind: NodeKind::Brand,
        id: 0,
    };

    /// Key for a series row.
    pub const fn series(id: i64) -> Self {
        Self {
            kind: NodeKind::Series,
            id,
        }
    }

    /// Key for a model row.
    pub const fn model(id: i64) -> Self {
        Self {
            kind: NodeKind::Model,
            id,
        }
    }

    /// Key for a tech row.
    pub const fn tech(id: i64) -> Self {
        Self {
            kind: NodeKind::Tech,
            id,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

/// A vertex and its display label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphNode {
    /// Identity.
    pub key: NodeKey,
    /// Display label (the row's name).
    pub label: String,
}

/// A directed, typed edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Edge {
    /// Source node; the edge lives in its adjacency list.
    pub from: NodeKey,
    /// Destination node.
    pub to: NodeKey,
    /// Relation.
    pub kind: EdgeKind,
}

#[derive(Clone, Debug)]
struct AdjacencyList {
    node: GraphNode,
    outgoing: Vec<Edge>,
}

/// The derived relationship view over the catalog.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeGraph {
    slots: Vec<AdjacencyList>,
    index: FxHashMap<NodeKey, usize>,
    incoming: FxHashMap<NodeKey, Vec<(NodeKey, EdgeKind)>>,
    edge_count: usize,
}

impl KnowledgeGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node. A key that is already present only has its label replaced.
    pub fn add_node(&mut self, key: NodeKey, label: impl Into<String>) {
        let label = label.into();
        if let Some(&slot) = self.index.get(&key) {
            debug!(%key, "node already present; replacing label");
            self.slots[slot].node.label = label;
            return;
        }
        trace!(%key, "add node");
        self.index.insert(key, self.slots.len());
        self.slots.push(AdjacencyList {
            node: GraphNode { key, label },
            outgoing: Vec::new(),
        });
    }

    /// Appends an edge to `from`'s adjacency list.
    ///
    /// Returns `false` without recording anything when `from` has no node.
    pub fn add_edge(&mut self, from: NodeKey, to: NodeKey, kind: EdgeKind) -> bool {
        let Some(&slot) = self.index.get(&from) else {
            warn!(%from, %to, ?kind, "edge source missing; edge dropped");
            return false;
        };
        trace!(%from, %to, ?kind, "add edge");
        self.slots[slot].outgoing.push(Edge { from, to, kind });
        self.incoming.entry(to).or_default().push((from, kind));
        self.edge_count += 1;
        true
    }

    /// Node by key.
    pub fn node(&self, key: NodeKey) -> Option<&GraphNode> {
        self.index.get(&key).map(|slot| &self.slots[*slot].node)
    }

    /// Whether a node exists for `key`.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Outgoing edges of `key`, most recently added first.
    pub fn edges_from(&self, key: NodeKey) -> impl Iterator<Item = &Edge> + '_ {
        self.index
            .get(&key)
            .map(|slot| self.slots[*slot].outgoing.as_slice())
            .unwrap_or(&[])
            .iter()
            .rev()
    }

    /// Every outgoing destination of `key`, most recently added first.
    pub fn neighbors(&self, key: NodeKey) -> Vec<NodeKey> {
        self.edges_from(key).map(|edge| edge.to).collect()
    }

    /// Outgoing destinations of `key` restricted to one relation.
    pub fn neighbors_by_type(&self, key: NodeKey, kind: EdgeKind) -> Vec<NodeKey> {
        self.edges_from(key)
            .filter(|edge| edge.kind == kind)
            .map(|edge| edge.to)
            .collect()
    }

    /// Sources of edges of `kind` pointing at `key`, in insertion order.
    ///
    /// Answers "which models belong to this series" without a table scan.
    pub fn incoming_by_type(&self, key: NodeKey, kind: EdgeKind) -> Vec<NodeKey> {
        self.incoming
            .get(&key)
            .map(|sources| {
                sources
                    .iter()
                    .filter(|(_, edge_kind)| *edge_kind == kind)
                    .map(|(source, _)| *source)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.slots.iter().map(|slot| &slot.node)
    }

    /// All edges, grouped by source node.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.slots.iter().flat_map(|slot| slot.outgoing.iter())
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Drops every node and edge.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.incoming.clear();
        self.edge_count = 0;
    }
}
