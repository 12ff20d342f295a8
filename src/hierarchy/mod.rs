//! Category hierarchy engine.
//!
//! Categories are kept as flat records keyed by id; parent/child structure is
//! derived on demand. [`cycle_guard`] keeps the parent relation a forest at
//! write time and [`tree`] rebuilds nested views from a snapshot at read time.

use thiserror::Error;

use crate::domain::types::CategoryId;
use crate::repository::RepositoryError;

pub mod cycle_guard;
pub mod tree;

pub use cycle_guard::{check_parent_assignment, check_parent_in_store};
pub use tree::{CategoryTree, flatten};

/// Reasons a parent assignment is rejected.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("cyclic reference: category cannot be its own parent")]
    SelfParent,
    #[error("parent not found")]
    ParentNotFound(CategoryId),
    #[error("cyclic reference")]
    CyclicReference,
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}
