use std::collections::BTreeMap;

use serde::Serialize;

use super::QueryEngine;
use crate::types::TableKind;

/// Energy type counted into the EV bucket; every other value lands in PHEV.
pub const EV_ENERGY_TYPE: &str = "EV";

/// One row of the per-energy-type tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnergyCount {
    /// Energy type as stored.
    pub energy_type: String,
    /// Number of models.
    pub count: usize,
}

/// Aggregate counts over the catalog and the graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogStats {
    /// Series rows.
    pub series_count: usize,
    /// Model rows.
    pub model_count: usize,
    /// Tech rows.
    pub tech_count: usize,
    /// Association rows.
    pub association_count: usize,
    /// Models whose energy type is exactly `EV`.
    pub ev_count: usize,
    /// Every other model.
    pub phev_count: usize,
    /// Cheapest model price, if any model exists.
    pub min_price: Option<f64>,
    /// Most expensive model price, if any model exists.
    pub max_price: Option<f64>,
    /// Graph nodes, including the brand root.
    pub node_count: usize,
    /// Graph edges.
    pub edge_count: usize,
    /// Exact tally per distinct energy type, alphabetical.
    pub energy_breakdown: Vec<EnergyCount>,
}

impl<'a> QueryEngine<'a> {
    /// Computes [`CatalogStats`].
    pub fn stats(&self) -> CatalogStats {
        let mut ev_count = 0;
        let mut phev_count = 0;
        let mut min_price: Option<f64> = None;
        let mut max_price: Option<f64> = None;
        let mut breakdown: BTreeMap<&str, usize> = BTreeMap::new();
        for model in self.tables.all_models() {
            if model.energy_type == EV_ENERGY_TYPE {
                ev_count += 1;
            } else {
                phev_count += 1;
            }
            *breakdown.entry(model.energy_type.as_str()).or_default() += 1;
            min_price = Some(min_price.map_or(model.price, |p| p.min(model.price)));
            max_price = Some(max_price.map_or(model.price, |p| p.max(model.price)));
        }
        CatalogStats {
            series_count: self.tables.len(TableKind::Series),
            model_count: self.tables.len(TableKind::Model),
            tech_count: self.tables.len(TableKind::Tech),
            association_count: self.tables.len(TableKind::ModelTech),
            ev_count,
            phev_count,
            min_price,
            max_price,
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            energy_breakdown: breakdown
                .into_iter()
                .map(|(energy_type, count)| EnergyCount {
                    energy_type: energy_type.to_string(),
                    count,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{Model, Series, Tables, Tech};
    use crate::graph::KnowledgeGraph;
    use crate::query::QueryEngine;

    #[test]
    fn non_ev_types_fall_into_phev_bucket() {
        let mut tables = Tables::default();
        tables.insert_series(Series::new(1, "王朝", "")).unwrap();
        tables.insert_tech(Tech::new(100, "刀片电池", "")).unwrap();
        for (id, name, price, energy) in [
            (9001, "汉", 20.98, "EV"),
            (9002, "唐", 17.98, "PHEV"),
            (9003, "秦", 9.98, "HEV"),
        ] {
            tables
                .insert_model(Model::new(id, name, 1, price, energy), &[100])
                .unwrap();
        }
        let graph = KnowledgeGraph::build(&tables, "BYD");
        let stats = QueryEngine::new(&tables, &graph).stats();
        assert_eq!(stats.ev_count, 1);
        assert_eq!(stats.phev_count, 2);
        assert_eq!(stats.min_price, Some(9.98));
        assert_eq!(stats.max_price, Some(20.98));
        assert_eq!(stats.node_count, 1 + 1 + 3 + 1);
        assert_eq!(stats.edge_count, 1 + 3 + 3);
        let types: Vec<&str> = stats
            .energy_breakdown
            .iter()
            .map(|row| row.energy_type.as_str())
            .collect();
        assert_eq!(types, vec!["EV", "HEV", "PHEV"]);
    }

    #[test]
    fn empty_catalog_has_no_price_range() {
        let tables = Tables::default();
        let graph = KnowledgeGraph::build(&tables, "BYD");
        let stats = QueryEngine::new(&tables, &graph).stats();
        assert_eq!(stats.model_count, 0);
        assert_eq!(stats.min_price, None);
        assert_eq!(stats.node_count, 1);
    }
}
