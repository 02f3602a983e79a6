use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::rows::{Model, Series, Tech};
use crate::catalog::tables::Tables;
use crate::types::{ConstraintError, ModelId, Result, TechId};

/// Every row of every table, detached from the store.
///
/// This is what persistence loads and saves. Rows are kept sorted by id so a
/// saved file is stable across runs; associations keep insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Series rows.
    pub series: Vec<Series>,
    /// Tech rows.
    pub techs: Vec<Tech>,
    /// Model rows.
    pub models: Vec<Model>,
    /// `(model_id, tech_id)` pairs.
    pub associations: Vec<(ModelId, TechId)>,
}

impl Dataset {
    /// Copies the current table contents.
    pub fn from_tables(tables: &Tables) -> Self {
        let mut series: Vec<Series> = tables.all_series().cloned().collect();
        series.sort_by_key(|row| row.id);
        let mut techs: Vec<Tech> = tables.all_techs().cloned().collect();
        techs.sort_by_key(|row| row.id);
        let mut models: Vec<Model> = tables.all_models().cloned().collect();
        models.sort_by_key(|row| row.id);
        let associations = tables
            .associations()
            .iter()
            .map(|row| (row.model_id, row.tech_id))
            .collect();
        Self {
            series,
            techs,
            models,
            associations,
        }
    }

    /// Builds fresh tables from the rows, running every constraint.
    ///
    /// Models go through the deferred path and are then bound to their
    /// associations. With `strict` set, a model left without any technology
    /// fails the load with [`ConstraintError::BusinessRuleViolation`];
    /// otherwise it is only logged.
    pub fn to_tables(&self, strict: bool) -> Result<Tables> {
        let mut tables = Tables::default();
        for series in &self.series {
            tables.insert_series(series.clone())?;
        }
        for tech in &self.techs {
            tables.insert_tech(tech.clone())?;
        }
        for model in &self.models {
            tables.insert_model_deferred(model.clone())?;
        }
        for (model_id, tech_id) in &self.associations {
            tables.insert_model_association(*model_id, *tech_id)?;
        }
        for model in &self.models {
            let bound = self
                .associations
                .iter()
                .any(|(model_id, _)| *model_id == model.id);
            if bound {
                continue;
            }
            if strict {
                return Err(ConstraintError::BusinessRuleViolation(format!(
                    "model '{}' must reference at least one technology",
                    model.name
                )));
            }
            warn!(model_id = model.id, name = %model.name, "model has no technologies");
        }
        Ok(tables)
    }

    /// Total number of rows across the entity tables and associations.
    pub fn row_count(&self) -> usize {
        self.series.len() + self.techs.len() + self.models.len() + self.associations.len()
    }
}
