#![forbid(unsafe_code)]

//! The coordinating store: entity tables and knowledge graph behind one lock.
//!
//! Every mutation validates against the tables and then applies the same
//! change to the tables and to the graph inside a single critical section, so
//! readers never observe one without the other. Reads hand out a
//! [`QueryEngine`] over the locked state.
//!
//! [`Catalog`] adds persistence on top: it loads once at startup and saves a
//! snapshot after each successful mutation, outside the data lock.

mod catalog;
mod error;
mod options;
mod verify;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{Dataset, Model, ModelTech, Series, Tables, Tech};
use crate::graph::{EdgeKind, GraphView, KnowledgeGraph, NodeKey};
use crate::query::{CatalogStats, ModelDetail, ModelFilter, QueryEngine, SeriesOverview, TechUsage};
use crate::types::{ConstraintError, ModelId, Result, TableKind, TechId};

pub use catalog::Catalog;
pub use error::{Result as CatalogResult, StoreError};
pub use options::CatalogOptions;
pub use verify::{VerifyCounts, VerifyFinding, VerifyReport, VerifySeverity};

struct State {
    tables: Tables,
    graph: KnowledgeGraph,
}

impl State {
    fn empty(brand_label: &str) -> Self {
        let tables = Tables::default();
        let graph = KnowledgeGraph::build(&tables, brand_label);
        Self { tables, graph }
    }

    fn link(&mut self, row: &ModelTech) {
        self.graph.add_edge(
            NodeKey::model(row.model_id),
            NodeKey::tech(row.tech_id),
            EdgeKind::UsesTech,
        );
    }
}

/// Row and graph totals after a [`Store::reload`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Series rows loaded.
    pub series: usize,
    /// Tech rows loaded.
    pub techs: usize,
    /// Model rows loaded.
    pub models: usize,
    /// Association rows loaded.
    pub associations: usize,
    /// Graph nodes after the rebuild.
    pub nodes: usize,
    /// Graph edges after the rebuild.
    pub edges: usize,
}

/// Tables plus graph, kept in lockstep.
pub struct Store {
    state: Mutex<State>,
    options: CatalogOptions,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(CatalogOptions::default())
    }
}

impl Store {
    /// Creates an empty store. The graph starts with only the brand root.
    pub fn new(options: CatalogOptions) -> Self {
        Self {
            state: Mutex::new(State::empty(&options.brand_label)),
            options,
        }
    }

    /// Options the store was created with.
    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// Adds a series and its `HasSeries` edge from the brand root.
    pub fn insert_series(&self, series: Series) -> Result<()> {
        let mut state = self.state.lock();
        let (id, name) = (series.id, series.name.clone());
        rejected("series", state.tables.insert_series(series))?;
        state.graph.add_node(NodeKey::series(id), name);
        state
            .graph
            .add_edge(NodeKey::BRAND, NodeKey::series(id), EdgeKind::HasSeries);
        debug!(series_id = id, "series committed");
        Ok(())
    }

    /// Adds a tech node with no edges.
    pub fn insert_tech(&self, tech: Tech) -> Result<()> {
        let mut state = self.state.lock();
        let (id, name) = (tech.id, tech.name.clone());
        rejected("tech", state.tables.insert_tech(tech))?;
        state.graph.add_node(NodeKey::tech(id), name);
        debug!(tech_id = id, "tech committed");
        Ok(())
    }

    /// Strict model insert: the model, its series edge and every listed
    /// technology commit together or not at all.
    pub fn insert_model(&self, model: Model, tech_ids: &[TechId]) -> Result<Vec<ModelTech>> {
        let mut state = self.state.lock();
        let (id, name, series_id) = (model.id, model.name.clone(), model.series_id);
        let created = rejected("model", state.tables.insert_model(model, tech_ids))?;
        add_model_node(&mut state.graph, id, name, series_id);
        for row in &created {
            state.link(row);
        }
        debug!(model_id = id, techs = created.len(), "model committed");
        Ok(created)
    }

    /// Loose model insert; bind technologies later with
    /// [`Store::insert_model_association`].
    pub fn insert_model_deferred(&self, model: Model) -> Result<()> {
        let mut state = self.state.lock();
        let (id, name, series_id) = (model.id, model.name.clone(), model.series_id);
        rejected("model", state.tables.insert_model_deferred(model))?;
        add_model_node(&mut state.graph, id, name, series_id);
        debug!(model_id = id, "model committed without technologies");
        Ok(())
    }

    /// Binds a technology to a model. Returns `false` when the pair already
    /// existed; no second row or edge is created then.
    pub fn insert_model_association(&self, model_id: ModelId, tech_id: TechId) -> Result<bool> {
        let mut state = self.state.lock();
        let created = rejected(
            "association",
            state.tables.insert_model_association(model_id, tech_id),
        )?;
        match created {
            Some(row) => {
                state.link(&row);
                debug!(model_id, tech_id, association_id = row.id, "association committed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replaces the whole state with `data`.
    ///
    /// The new tables and graph are built without holding the lock and then
    /// swapped in. Any rejected row aborts the reload and the current state
    /// stays in place.
    pub fn reload(&self, data: &Dataset) -> Result<ReloadSummary> {
        let tables = rejected("reload", data.to_tables(self.options.strict_reload))?;
        let graph = KnowledgeGraph::build(&tables, &self.options.brand_label);
        let summary = ReloadSummary {
            series: tables.len(TableKind::Series),
            techs: tables.len(TableKind::Tech),
            models: tables.len(TableKind::Model),
            associations: tables.len(TableKind::ModelTech),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        };
        *self.state.lock() = State { tables, graph };
        info!(
            series = summary.series,
            techs = summary.techs,
            models = summary.models,
            associations = summary.associations,
            "catalog reloaded"
        );
        Ok(summary)
    }

    /// Drops every row. The graph keeps its brand root.
    pub fn clear(&self) {
        *self.state.lock() = State::empty(&self.options.brand_label);
        debug!("catalog cleared");
    }

    /// Copies every row out for saving.
    pub fn snapshot(&self) -> Dataset {
        Dataset::from_tables(&self.state.lock().tables)
    }

    /// Runs `f` against a consistent view while holding the lock.
    ///
    /// Keep `f` short; every other reader and writer waits for it.
    pub fn read<R>(&self, f: impl FnOnce(QueryEngine<'_>) -> R) -> R {
        let state = self.state.lock();
        f(QueryEngine::new(&state.tables, &state.graph))
    }

    /// See [`QueryEngine::list_models`].
    pub fn list_models(&self, filter: &ModelFilter) -> Vec<ModelDetail> {
        self.read(|engine| engine.list_models(filter))
    }

    /// Joined model detail, or [`ConstraintError::NotFound`].
    pub fn model_detail(&self, id: ModelId) -> Result<ModelDetail> {
        self.read(|engine| engine.model_detail(id))
            .ok_or_else(|| ConstraintError::not_found(TableKind::Model, id))
    }

    /// See [`QueryEngine::search_models`].
    pub fn search_models(&self, keyword: &str) -> Vec<ModelDetail> {
        self.read(|engine| engine.search_models(keyword))
    }

    /// See [`QueryEngine::stats`].
    pub fn stats(&self) -> CatalogStats {
        self.read(|engine| engine.stats())
    }

    /// See [`QueryEngine::series_overview`].
    pub fn series_overview(&self) -> Vec<SeriesOverview> {
        self.read(|engine| engine.series_overview())
    }

    /// See [`QueryEngine::tech_usage`].
    pub fn tech_usage(&self) -> Vec<TechUsage> {
        self.read(|engine| engine.tech_usage())
    }

    /// All series by id.
    pub fn all_series(&self) -> Vec<Series> {
        self.read(|engine| engine.all_series())
    }

    /// All techs by id.
    pub fn all_techs(&self) -> Vec<Tech> {
        self.read(|engine| engine.all_techs())
    }

    /// Outgoing neighbors, newest first.
    pub fn neighbors(&self, key: NodeKey) -> Vec<NodeKey> {
        self.state.lock().graph.neighbors(key)
    }

    /// Outgoing neighbors over one relation, newest first.
    pub fn neighbors_by_type(&self, key: NodeKey, kind: EdgeKind) -> Vec<NodeKey> {
        self.state.lock().graph.neighbors_by_type(key, kind)
    }

    /// Breadth-first visit order from `start`.
    pub fn traverse_breadth_first(&self, start: NodeKey) -> Vec<NodeKey> {
        self.state.lock().graph.traverse_breadth_first(start)
    }

    /// Depth-first visit order from `start`.
    pub fn traverse_depth_first(&self, start: NodeKey) -> Vec<NodeKey> {
        self.state.lock().graph.traverse_depth_first(start)
    }

    /// Label of a graph node.
    pub fn node_label(&self, key: NodeKey) -> Option<String> {
        self.state.lock().graph.node(key).map(|node| node.label.clone())
    }

    /// Layered projection for rendering.
    pub fn graph_view(&self) -> GraphView {
        self.state.lock().graph.view()
    }

    /// Next free id in `table`: one past the current maximum, never below `floor`.
    pub fn next_id(&self, table: TableKind, floor: i64) -> i64 {
        let state = self.state.lock();
        state
            .tables
            .max_id(table)
            .map_or(floor, |max| max.saturating_add(1).max(floor))
    }

    /// Checks referential integrity and graph/table agreement.
    pub fn verify(&self) -> VerifyReport {
        let state = self.state.lock();
        verify::verify(&state.tables, &state.graph)
    }
}

fn add_model_node(graph: &mut KnowledgeGraph, id: ModelId, name: String, series_id: i64) {
    graph.add_node(NodeKey::model(id), name);
    graph.add_edge(
        NodeKey::model(id),
        NodeKey::series(series_id),
        EdgeKind::BelongsTo,
    );
}

fn rejected<T>(what: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        warn!(entity = what, kind = ?err.kind(), error = %err, "mutation rejected");
    }
    result
}
