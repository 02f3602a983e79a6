use thiserror::Error;

use crate::persist::PersistError;
use crate::types::{ConstraintError, ConstraintKind};

/// Convenience alias for catalog operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by [`Catalog`](super::Catalog) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row was rejected by the integrity rules; nothing changed.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    /// Loading or saving failed. For mutations the in-memory change has
    /// already been applied when this is returned.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl StoreError {
    /// Constraint kind, when the error came from validation.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            StoreError::Constraint(err) => Some(err.kind()),
            StoreError::Persist(_) => None,
        }
    }
}
