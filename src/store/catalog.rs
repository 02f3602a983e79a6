use parking_lot::Mutex;
use tracing::{debug, info};

use super::error::Result;
use super::{CatalogOptions, ReloadSummary, Store};
use crate::catalog::{Model, ModelTech, Series, Tech};
use crate::persist::Persistence;
use crate::types::{ModelId, TechId};

/// A [`Store`] wired to a [`Persistence`] backend.
///
/// Mutations commit in memory first and are then saved. When the save fails
/// the caller gets [`StoreError::Persist`](super::StoreError::Persist) while
/// the in-memory change stays committed; the next successful save catches up.
pub struct Catalog {
    store: Store,
    persistence: Box<dyn Persistence>,
    // Serializes snapshot+write so an older snapshot never lands last.
    save_lock: Mutex<()>,
}

impl Catalog {
    /// Loads everything from `persistence` into a fresh store.
    pub fn open(persistence: impl Persistence + 'static, options: CatalogOptions) -> Result<Self> {
        let data = persistence.load_all()?;
        let store = Store::new(options);
        let summary = store.reload(&data)?;
        info!(
            models = summary.models,
            nodes = summary.nodes,
            edges = summary.edges,
            "catalog opened"
        );
        Ok(Self {
            store,
            persistence: Box::new(persistence),
            save_lock: Mutex::new(()),
        })
    }

    /// The underlying store, for reads.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Inserts a series and saves.
    pub fn add_series(&self, series: Series) -> Result<()> {
        self.store.insert_series(series)?;
        self.save()
    }

    /// Inserts a tech and saves.
    pub fn add_tech(&self, tech: Tech) -> Result<()> {
        self.store.insert_tech(tech)?;
        self.save()
    }

    /// Strict model insert, then save.
    pub fn add_model(&self, model: Model, tech_ids: &[TechId]) -> Result<Vec<ModelTech>> {
        let created = self.store.insert_model(model, tech_ids)?;
        self.save()?;
        Ok(created)
    }

    /// Deferred model insert, then save.
    pub fn add_model_deferred(&self, model: Model) -> Result<()> {
        self.store.insert_model_deferred(model)?;
        self.save()
    }

    /// Binds a technology to a model. Saves only when a new row was created.
    pub fn link(&self, model_id: ModelId, tech_id: TechId) -> Result<bool> {
        let created = self.store.insert_model_association(model_id, tech_id)?;
        if created {
            self.save()?;
        }
        Ok(created)
    }

    /// Writes the current state through the backend.
    pub fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        let snapshot = self.store.snapshot();
        self.persistence.save_all(&snapshot)?;
        debug!(rows = snapshot.row_count(), "catalog saved");
        Ok(())
    }

    /// Replaces the in-memory state with what the backend holds now.
    pub fn reload_from_disk(&self) -> Result<ReloadSummary> {
        let data = self.persistence.load_all()?;
        Ok(self.store.reload(&data)?)
    }
}
