use serde::{Deserialize, Serialize};

use crate::types::{AssociationId, ModelId, SeriesId, TechId};

/// A product line such as 王朝 or 海洋.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Primary key.
    #[serde(rename = "series_id")]
    pub id: SeriesId,
    /// Unique, non-empty name.
    #[serde(rename = "series_name")]
    pub name: String,
    /// Free-form introduction.
    #[serde(default)]
    pub intro: String,
}

impl Series {
    /// Builds a series row.
    pub fn new(id: SeriesId, name: impl Into<String>, intro: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            intro: intro.into(),
        }
    }
}

/// A core technology a model may use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tech {
    /// Primary key.
    #[serde(rename = "tech_id")]
    pub id: TechId,
    /// Unique, non-empty name.
    #[serde(rename = "tech_name")]
    pub name: String,
    /// Free-form introduction.
    #[serde(default)]
    pub intro: String,
}

impl Tech {
    /// Builds a tech row.
    pub fn new(id: TechId, name: impl Into<String>, intro: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            intro: intro.into(),
        }
    }
}

/// A vehicle model. Belongs to exactly one series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Primary key.
    #[serde(rename = "model_id")]
    pub id: ModelId,
    /// Unique, non-empty name.
    #[serde(rename = "model_name")]
    pub name: String,
    /// Owning series.
    pub series_id: SeriesId,
    /// Guide price in 万元, strictly positive.
    pub price: f64,
    /// Rated range.
    #[serde(default)]
    pub range_km: f64,
    /// `EV`, `PHEV`, `DM-i`, ... Must not be empty.
    pub energy_type: String,
    /// SUV, sedan, MPV, ...
    #[serde(default)]
    pub body_type: String,
    /// Seat count.
    #[serde(default)]
    pub seats: u32,
    /// Launch year as written in the source data.
    #[serde(default)]
    pub launch_year: String,
}

impl Model {
    /// Builds a model with the required columns; the rest stay empty.
    pub fn new(
        id: ModelId,
        name: impl Into<String>,
        series_id: SeriesId,
        price: f64,
        energy_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            series_id,
            price,
            range_km: 0.0,
            energy_type: energy_type.into(),
            body_type: String::new(),
            seats: 0,
            launch_year: String::new(),
        }
    }
}

/// Association row between a model and a tech.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTech {
    /// Surrogate key, assigned on insert starting at 1.
    pub id: AssociationId,
    /// Referenced model.
    pub model_id: ModelId,
    /// Referenced tech.
    pub tech_id: TechId,
}
