#![forbid(unsafe_code)]

//! Read-side projections joining table rows with graph relationships.
//!
//! A [`QueryEngine`] borrows a consistent view of the tables and the graph
//! (the store hands one out while holding its lock). Series names are joined
//! through the model's foreign key, technology names through the graph's
//! `UsesTech` adjacency.

mod stats;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::catalog::{Model, Series, Tables, Tech};
use crate::graph::{EdgeKind, KnowledgeGraph, NodeKey};
use crate::types::{ModelId, SeriesId, TechId};

pub use stats::{CatalogStats, EnergyCount, EV_ENERGY_TYPE};

/// A model joined with its series name and technologies.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelDetail {
    /// The model row.
    #[serde(flatten)]
    pub model: Model,
    /// Name of the owning series; empty if the series cannot be resolved.
    pub series_name: String,
    /// Technology ids in association order.
    pub tech_ids: Vec<TechId>,
    /// Technology names in association order.
    pub techs: Vec<String>,
}

/// Optional exact-match filters for [`QueryEngine::list_models`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ModelFilter {
    /// Keep only models of this series.
    pub series_id: Option<SeriesId>,
    /// Keep only models with this energy type.
    pub energy_type: Option<String>,
}

impl ModelFilter {
    fn matches(&self, model: &Model) -> bool {
        if let Some(series_id) = self.series_id {
            if model.series_id != series_id {
                return false;
            }
        }
        if let Some(energy) = self.energy_type.as_deref() {
            if !energy.is_empty() && model.energy_type != energy {
                return false;
            }
        }
        true
    }
}

/// A series with the number of models that belong to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesOverview {
    /// The series row.
    #[serde(flatten)]
    pub series: Series,
    /// Number of models pointing at this series.
    pub model_count: usize,
}

/// A technology with the models that use it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TechUsage {
    /// The tech row.
    #[serde(flatten)]
    pub tech: Tech,
    /// Ids of models using it, ascending.
    pub model_ids: Vec<ModelId>,
}

/// Borrowed read view over a consistent tables + graph pair.
#[derive(Clone, Copy)]
pub struct QueryEngine<'a> {
    tables: &'a Tables,
    graph: &'a KnowledgeGraph,
}

impl<'a> QueryEngine<'a> {
    /// Wraps a tables/graph pair. Both must describe the same rows.
    pub fn new(tables: &'a Tables, graph: &'a KnowledgeGraph) -> Self {
        Self { tables, graph }
    }

    /// Models matching `filter`, cheapest first; equal prices fall back to id.
    pub fn list_models(&self, filter: &ModelFilter) -> Vec<ModelDetail> {
        let mut details: Vec<ModelDetail> = self
            .models_by_id()
            .into_iter()
            .filter(|model| filter.matches(model))
            .map(|model| self.detail_of(model))
            .collect();
        details.sort_by(|a, b| {
            a.model
                .price
                .partial_cmp(&b.model.price)
                .unwrap_or(Ordering::Equal)
                .then(a.model.id.cmp(&b.model.id))
        });
        details
    }

    /// Joined detail for one model; `None` when the id is unknown.
    pub fn model_detail(&self, id: ModelId) -> Option<ModelDetail> {
        self.tables.model(id).map(|model| self.detail_of(model))
    }

    /// Models whose name, series name or any technology name contains `keyword`.
    ///
    /// Case-sensitive substring match, no ranking, results in id order. An
    /// empty keyword matches everything.
    pub fn search_models(&self, keyword: &str) -> Vec<ModelDetail> {
        self.models_by_id()
            .into_iter()
            .map(|model| self.detail_of(model))
            .filter(|detail| {
                detail.model.name.contains(keyword)
                    || detail.series_name.contains(keyword)
                    || detail.techs.iter().any(|tech| tech.contains(keyword))
            })
            .collect()
    }

    /// Ids of the technologies a model uses, in association order.
    pub fn techs_of(&self, id: ModelId) -> Vec<TechId> {
        let mut ids: Vec<TechId> = self
            .graph
            .neighbors_by_type(NodeKey::model(id), EdgeKind::UsesTech)
            .into_iter()
            .map(|key| key.id)
            .collect();
        // Adjacency lists are newest first.
        ids.reverse();
        ids
    }

    /// Ids of the models of a series, ascending.
    pub fn series_models(&self, series_id: SeriesId) -> Vec<ModelId> {
        let mut ids: Vec<ModelId> = self
            .graph
            .incoming_by_type(NodeKey::series(series_id), EdgeKind::BelongsTo)
            .into_iter()
            .map(|key| key.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Every series with its model count, by id.
    pub fn series_overview(&self) -> Vec<SeriesOverview> {
        let mut series: Vec<&Series> = self.tables.all_series().collect();
        series.sort_by_key(|row| row.id);
        series
            .into_iter()
            .map(|row| SeriesOverview {
                series: row.clone(),
                model_count: self
                    .graph
                    .incoming_by_type(NodeKey::series(row.id), EdgeKind::BelongsTo)
                    .len(),
            })
            .collect()
    }

    /// Every technology with the models using it, by id.
    pub fn tech_usage(&self) -> Vec<TechUsage> {
        let mut techs: Vec<&Tech> = self.tables.all_techs().collect();
        techs.sort_by_key(|row| row.id);
        techs
            .into_iter()
            .map(|row| {
                let mut model_ids: Vec<ModelId> = self
                    .graph
                    .incoming_by_type(NodeKey::tech(row.id), EdgeKind::UsesTech)
                    .into_iter()
                    .map(|key| key.id)
                    .collect();
                model_ids.sort_unstable();
                TechUsage {
                    tech: row.clone(),
                    model_ids,
                }
            })
            .collect()
    }

    /// All series rows by id.
    pub fn all_series(&self) -> Vec<Series> {
        let mut rows: Vec<Series> = self.tables.all_series().cloned().collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    /// All tech rows by id.
    pub fn all_techs(&self) -> Vec<Tech> {
        let mut rows: Vec<Tech> = self.tables.all_techs().cloned().collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    fn models_by_id(&self) -> Vec<&'a Model> {
        let mut models: Vec<&Model> = self.tables.all_models().collect();
        models.sort_by_key(|model| model.id);
        models
    }

    fn detail_of(&self, model: &Model) -> ModelDetail {
        let series_name = self
            .tables
            .series(model.series_id)
            .map(|series| series.name.clone())
            .unwrap_or_default();
        let tech_ids = self.techs_of(model.id);
        let techs = tech_ids
            .iter()
            .filter_map(|id| self.tables.tech(*id))
            .map(|tech| tech.name.clone())
            .collect();
        ModelDetail {
            model: model.clone(),
            series_name,
            tech_ids,
            techs,
        }
    }
}
