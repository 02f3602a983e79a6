#![forbid(unsafe_code)]

//! Constraint-checked entity tables.
//!
//! The catalog holds one keyed table per entity type (series, techs, models)
//! plus the model/tech association table. Every insert runs the ordered rule
//! chain in [`validate`] first; a failing rule leaves the tables unchanged.

mod dataset;
mod rows;
mod tables;
pub mod validate;

/// Detached copy of every table, used for load/save.
pub use dataset::Dataset;

/// Row types.
pub use rows::{Model, ModelTech, Series, Tech};

/// Keyed row storage.
pub use tables::Tables;

pub use validate::ModelPath;
