use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::catalog::rows::{Model, ModelTech, Series, Tech};
use crate::catalog::validate::{self, ModelPath};
use crate::types::{AssociationId, ModelId, Result, SeriesId, TableKind, TechId};

/// Keyed row storage for every entity type plus the association table.
///
/// Each table is a hash map by primary key; name columns carry a companion
/// set so uniqueness checks stay O(1). Iteration order is unspecified.
#[derive(Clone, Debug)]
pub struct Tables {
    series: FxHashMap<SeriesId, Series>,
    techs: FxHashMap<TechId, Tech>,
    models: FxHashMap<ModelId, Model>,
    model_techs: Vec<ModelTech>,
    series_names: FxHashSet<String>,
    tech_names: FxHashSet<String>,
    model_names: FxHashSet<String>,
    pairs: FxHashSet<(ModelId, TechId)>,
    next_association_id: AssociationId,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            series: FxHashMap::default(),
            techs: FxHashMap::default(),
            models: FxHashMap::default(),
            model_techs: Vec::new(),
            series_names: FxHashSet::default(),
            tech_names: FxHashSet::default(),
            model_names: FxHashSet::default(),
            pairs: FxHashSet::default(),
            next_association_id: 1,
        }
    }
}

impl Tables {
    /// Inserts a series after the leaf rule chain passes.
    pub fn insert_series(&mut self, series: Series) -> Result<()> {
        validate::check_series(self, &series)?;
        self.series_names.insert(series.name.clone());
        self.series.insert(series.id, series);
        Ok(())
    }

    /// Inserts a tech after the leaf rule chain passes.
    pub fn insert_tech(&mut self, tech: Tech) -> Result<()> {
        validate::check_tech(self, &tech)?;
        self.tech_names.insert(tech.name.clone());
        self.techs.insert(tech.id, tech);
        Ok(())
    }

    /// Strict model insert: the model and its technologies commit together.
    ///
    /// Duplicate ids in `tech_ids` collapse into one association. Returns the
    /// association rows that were created, in input order.
    pub fn insert_model(&mut self, model: Model, tech_ids: &[TechId]) -> Result<Vec<ModelTech>> {
        validate::check_model(self, &model, ModelPath::Strict(tech_ids))?;
        let model_id = model.id;
        self.commit_model(model);
        let created = tech_ids
            .iter()
            .filter_map(|tech_id| self.commit_association(model_id, *tech_id))
            .collect();
        Ok(created)
    }

    /// Loose model insert with no technologies; see [`Tables::insert_model_association`].
    pub fn insert_model_deferred(&mut self, model: Model) -> Result<()> {
        validate::check_model(self, &model, ModelPath::Deferred)?;
        self.commit_model(model);
        Ok(())
    }

    /// Binds a technology to an existing model.
    ///
    /// Idempotent: an existing pair yields `Ok(None)` without a second row.
    pub fn insert_model_association(
        &mut self,
        model_id: ModelId,
        tech_id: TechId,
    ) -> Result<Option<ModelTech>> {
        validate::check_association(self, model_id, tech_id)?;
        Ok(self.commit_association(model_id, tech_id))
    }

    fn commit_model(&mut self, model: Model) {
        self.model_names.insert(model.name.clone());
        self.models.insert(model.id, model);
    }

    fn commit_association(&mut self, model_id: ModelId, tech_id: TechId) -> Option<ModelTech> {
        if !self.pairs.insert((model_id, tech_id)) {
            trace!(model_id, tech_id, "association already present");
            return None;
        }
        let row = ModelTech {
            id: self.next_association_id,
            model_id,
            tech_id,
        };
        self.next_association_id += 1;
        self.model_techs.push(row);
        Some(row)
    }

    /// Empties every table and resets the association counter.
    pub fn clear_all(&mut self) {
        *self = Tables::default();
    }

    /// Series by id.
    pub fn series(&self, id: SeriesId) -> Option<&Series> {
        self.series.get(&id)
    }

    /// Tech by id.
    pub fn tech(&self, id: TechId) -> Option<&Tech> {
        self.techs.get(&id)
    }

    /// Model by id.
    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(&id)
    }

    /// All series, unordered.
    pub fn all_series(&self) -> impl Iterator<Item = &Series> + '_ {
        self.series.values()
    }

    /// All techs, unordered.
    pub fn all_techs(&self) -> impl Iterator<Item = &Tech> + '_ {
        self.techs.values()
    }

    /// All models, unordered.
    pub fn all_models(&self) -> impl Iterator<Item = &Model> + '_ {
        self.models.values()
    }

    /// Association rows in insertion order.
    pub fn associations(&self) -> &[ModelTech] {
        &self.model_techs
    }

    /// Whether `name` is taken in `table`. Exact, case-sensitive match.
    pub fn exists_name(&self, table: TableKind, name: &str) -> bool {
        match table {
            TableKind::Series => self.series_names.contains(name),
            TableKind::Tech => self.tech_names.contains(name),
            TableKind::Model => self.model_names.contains(name),
            TableKind::ModelTech => false,
        }
    }

    /// Whether `id` is a primary key of `table`.
    pub fn contains_id(&self, table: TableKind, id: i64) -> bool {
        match table {
            TableKind::Series => self.series.contains_key(&id),
            TableKind::Tech => self.techs.contains_key(&id),
            TableKind::Model => self.models.contains_key(&id),
            TableKind::ModelTech => self
                .model_techs
                .iter()
                .any(|row| i64::try_from(row.id).ok() == Some(id)),
        }
    }

    /// Whether the association pair exists.
    pub fn has_association(&self, model_id: ModelId, tech_id: TechId) -> bool {
        self.pairs.contains(&(model_id, tech_id))
    }

    /// Tech ids bound to `model_id`, in association order.
    pub fn tech_ids_of(&self, model_id: ModelId) -> Vec<TechId> {
        self.model_techs
            .iter()
            .filter(|row| row.model_id == model_id)
            .map(|row| row.tech_id)
            .collect()
    }

    /// Largest primary key in `table`, if any row exists.
    pub fn max_id(&self, table: TableKind) -> Option<i64> {
        match table {
            TableKind::Series => self.series.keys().max().copied(),
            TableKind::Tech => self.techs.keys().max().copied(),
            TableKind::Model => self.models.keys().max().copied(),
            TableKind::ModelTech => self
                .model_techs
                .iter()
                .filter_map(|row| i64::try_from(row.id).ok())
                .max(),
        }
    }

    /// Row count of `table`.
    pub fn len(&self, table: TableKind) -> usize {
        match table {
            TableKind::Series => self.series.len(),
            TableKind::Tech => self.techs.len(),
            TableKind::Model => self.models.len(),
            TableKind::ModelTech => self.model_techs.len(),
        }
    }

    /// True when no table holds a row.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
            && self.techs.is_empty()
            && self.models.is_empty()
            && self.model_techs.is_empty()
    }
}
