use tracing::debug;

use super::{EdgeKind, KnowledgeGraph, NodeKey};
use crate::catalog::Tables;

impl KnowledgeGraph {
    /// Rebuilds the whole graph from the tables.
    ///
    /// Order: brand root, series (+ `HasSeries`), techs, models
    /// (+ `BelongsTo`), then one `UsesTech` edge per association row.
    pub fn build(tables: &Tables, brand_label: &str) -> Self {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(NodeKey::BRAND, brand_label);

        let mut series: Vec<_> = tables.all_series().collect();
        series.sort_by_key(|row| row.id);
        for row in series {
            graph.add_node(NodeKey::series(row.id), row.name.as_str());
            graph.add_edge(NodeKey::BRAND, NodeKey::series(row.id), EdgeKind::HasSeries);
        }

        let mut techs: Vec<_> = tables.all_techs().collect();
        techs.sort_by_key(|row| row.id);
        for row in techs {
            graph.add_node(NodeKey::tech(row.id), row.name.as_str());
        }

        let mut models: Vec<_> = tables.all_models().collect();
        models.sort_by_key(|row| row.id);
        for row in models {
            graph.add_node(NodeKey::model(row.id), row.name.as_str());
            graph.add_edge(
                NodeKey::model(row.id),
                NodeKey::series(row.series_id),
                EdgeKind::BelongsTo,
            );
        }

        for row in tables.associations() {
            graph.add_edge(
                NodeKey::model(row.model_id),
                NodeKey::tech(row.tech_id),
                EdgeKind::UsesTech,
            );
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "knowledge graph rebuilt"
        );
        graph
    }
}
