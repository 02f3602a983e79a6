#![forbid(unsafe_code)]

//! Identifier aliases and the integrity error taxonomy shared by every layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary key of a row in the series table.
pub type SeriesId = i64;
/// Primary key of a row in the techs table.
pub type TechId = i64;
/// Primary key of a row in the models table.
pub type ModelId = i64;
/// Surrogate key of a model/tech association row.
pub type AssociationId = u64;

/// Names the table a row or constraint belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Product series (王朝, 海洋, ...).
    Series,
    /// Core technologies.
    Tech,
    /// Vehicle models.
    Model,
    /// Model/tech association rows.
    ModelTech,
}

impl TableKind {
    /// Table name as it appears in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Series => "series",
            TableKind::Tech => "techs",
            TableKind::Model => "models",
            TableKind::ModelTech => "model_tech",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integrity failure reported by the tables or a lookup.
///
/// The validator stops at the first failing rule, so callers always receive
/// exactly one of these for a rejected mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// A required text column was empty.
    #[error("NOT NULL constraint failed: {table}.{column} must not be empty")]
    NotNull {
        /// Target table.
        table: TableKind,
        /// Offending column.
        column: &'static str,
    },
    /// The supplied id is already present in the target table.
    #[error("PRIMARY KEY constraint failed: {table} id {id} already exists")]
    PrimaryKeyExists {
        /// Target table.
        table: TableKind,
        /// Duplicate id.
        id: i64,
    },
    /// The supplied name is already present in the target table.
    #[error("UNIQUE constraint failed: {table}.{column} '{value}' already exists")]
    UniqueViolation {
        /// Target table.
        table: TableKind,
        /// Offending column.
        column: &'static str,
        /// Duplicate value.
        value: String,
    },
    /// A referenced id does not resolve.
    #[error("FOREIGN KEY constraint failed: {table}.{column} {id} does not exist in {target}")]
    ForeignKeyMissing {
        /// Referencing table.
        table: TableKind,
        /// Referencing column.
        column: &'static str,
        /// Referenced table.
        target: TableKind,
        /// Missing id.
        id: i64,
    },
    /// A numeric check failed.
    #[error("CHECK constraint failed: {table}: {constraint}")]
    CheckFailed {
        /// Target table.
        table: TableKind,
        /// Human readable check expression.
        constraint: &'static str,
    },
    /// A domain rule outside plain SQL constraints failed.
    #[error("business rule failed: {0}")]
    BusinessRuleViolation(String),
    /// A lookup by id found nothing.
    #[error("{table} id {id} not found")]
    NotFound {
        /// Searched table.
        table: TableKind,
        /// Missing id.
        id: i64,
    },
}

/// Fieldless discriminant of [`ConstraintError`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// See [`ConstraintError::NotNull`].
    NotNull,
    /// See [`ConstraintError::PrimaryKeyExists`].
    PrimaryKeyExists,
    /// See [`ConstraintError::UniqueViolation`].
    UniqueViolation,
    /// See [`ConstraintError::ForeignKeyMissing`].
    ForeignKeyMissing,
    /// See [`ConstraintError::CheckFailed`].
    CheckFailed,
    /// See [`ConstraintError::BusinessRuleViolation`].
    BusinessRuleViolation,
    /// See [`ConstraintError::NotFound`].
    NotFound,
}

impl ConstraintError {
    /// Returns the discriminant without payload.
    pub fn kind(&self) -> ConstraintKind {
        match self {
            ConstraintError::NotNull { .. } => ConstraintKind::NotNull,
            ConstraintError::PrimaryKeyExists { .. } => ConstraintKind::PrimaryKeyExists,
            ConstraintError::UniqueViolation { .. } => ConstraintKind::UniqueViolation,
            ConstraintError::ForeignKeyMissing { .. } => ConstraintKind::ForeignKeyMissing,
            ConstraintError::CheckFailed { .. } => ConstraintKind::CheckFailed,
            ConstraintError::BusinessRuleViolation(_) => ConstraintKind::BusinessRuleViolation,
            ConstraintError::NotFound { .. } => ConstraintKind::NotFound,
        }
    }

    pub(crate) fn not_found(table: TableKind, id: i64) -> Self {
        ConstraintError::NotFound { table, id }
    }
}

/// Result alias for table and validator operations.
pub type Result<T> = std::result::Result<T, ConstraintError>;
