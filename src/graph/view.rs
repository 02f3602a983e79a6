use serde::Serialize;

use super::{EdgeKind, KnowledgeGraph, NodeKind};

/// Layered node for front-end rendering.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphViewNode {
    /// Rendered key (`s_1`, `m_9001`, `t_100`).
    pub id: String,
    /// Display label.
    pub name: String,
    /// Entity kind.
    pub kind: NodeKind,
    /// 0 = series, 1 = model, 2 = tech.
    pub layer: u8,
    /// Owning series, for model nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<i64>,
}

/// Link between adjacent layers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphLink {
    /// Upper-layer end.
    pub source: String,
    /// Lower-layer end.
    pub target: String,
    /// `belongs_to` or `equipped_with`.
    pub relation: &'static str,
}

/// Three-layer projection (series → model → tech) of the graph.
///
/// The brand root and its `HasSeries` edges are left out; `BelongsTo` edges
/// are flipped so every link points down a layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphView {
    /// Series, model and tech nodes ordered by layer then id.
    pub nodes: Vec<GraphViewNode>,
    /// Links ordered by layer then source.
    pub links: Vec<GraphLink>,
}

impl KnowledgeGraph {
    /// Projects the graph into a [`GraphView`].
    pub fn view(&self) -> GraphView {
        let mut keyed: Vec<_> = self
            .nodes()
            .filter(|node| node.key.kind != NodeKind::Brand)
            .collect();
        // NodeKind orders as series < model < tech, which is the layer order.
        keyed.sort_by_key(|node| node.key);
        let nodes = keyed
            .into_iter()
            .map(|node| {
                let (layer, series_id) = match node.key.kind {
                    NodeKind::Model => (
                        1,
                        self.neighbors_by_type(node.key, EdgeKind::BelongsTo)
                            .first()
                            .map(|series| series.id),
                    ),
                    NodeKind::Tech => (2, None),
                    NodeKind::Brand | NodeKind::Series => (0, None),
                };
                GraphViewNode {
                    id: node.key.to_string(),
                    name: node.label.clone(),
                    kind: node.key.kind,
                    layer,
                    series_id,
                }
            })
            .collect();

        let mut belongs = Vec::new();
        let mut equipped = Vec::new();
        for edge in self.edges() {
            match edge.kind {
                EdgeKind::HasSeries => {}
                EdgeKind::BelongsTo => belongs.push(GraphLink {
                    source: edge.to.to_string(),
                    target: edge.from.to_string(),
                    relation: "belongs_to",
                }),
                EdgeKind::UsesTech => equipped.push(GraphLink {
                    source: edge.from.to_string(),
                    target: edge.to.to_string(),
                    relation: "equipped_with",
                }),
            }
        }
        belongs.append(&mut equipped);
        GraphView {
            nodes,
            links: belongs,
        }
    }
}
