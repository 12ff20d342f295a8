use std::cell::RefCell;

use diesel::sqlite::SqliteConnection;

use crate::db::{DbConnection, DbPool};
use crate::domain::category::{Category, CategoryPatch, NewCategory};
use crate::domain::types::{CategoryId, CategorySysname};

pub mod category;
pub mod errors;

pub use errors::{RepositoryError, RepositoryResult};

/// Repository implementation backed by Diesel and SQLite.
///
/// The underlying `r2d2::Pool` is cheap to clone, allowing the repository to
/// be passed around freely between handlers.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
}

impl DieselRepository {
    /// Create a new repository from an established database pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a pooled database connection.
    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

/// Reader/writer bound to a single open transaction.
///
/// Handed out by [`CategoryUnitOfWork::in_transaction`]; every call goes
/// through the same connection so reads observe the transaction's snapshot.
pub struct DieselTransaction<'c> {
    conn: RefCell<&'c mut SqliteConnection>,
}

impl<'c> DieselTransaction<'c> {
    fn new(conn: &'c mut SqliteConnection) -> Self {
        Self {
            conn: RefCell::new(conn),
        }
    }
}

/// Read-only operations for category entities.
pub trait CategoryReader {
    /// Retrieve a category by its identifier.
    fn get_category_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>>;
    /// Retrieve a category by its unique slug.
    fn get_category_by_sysname(
        &self,
        sysname: &CategorySysname,
    ) -> RepositoryResult<Option<Category>>;
    /// List the direct children of a category, ordered by id.
    fn list_children(&self, id: CategoryId) -> RepositoryResult<Vec<Category>>;
    /// Full snapshot of every category, ordered by id.
    fn list_all_categories(&self) -> RepositoryResult<Vec<Category>>;
}

/// Write operations for category entities. No business rules are applied here.
pub trait CategoryWriter {
    /// Persist a new category, assigning its id and timestamps.
    fn create_category(&self, category: &NewCategory) -> RepositoryResult<Category>;
    /// Apply a partial update. Returns `None` when the id is unknown.
    fn update_category(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> RepositoryResult<Option<Category>>;
    /// Delete a single row. Returns `false` when the id is unknown.
    fn delete_category(&self, id: CategoryId) -> RepositoryResult<bool>;
}

/// Combined view handed to units of work.
pub trait CategoryStore: CategoryReader + CategoryWriter {}

impl<T: CategoryReader + CategoryWriter> CategoryStore for T {}

/// Runs a read-validate-write sequence atomically.
pub trait CategoryUnitOfWork {
    /// Execute `f` inside one transaction. The transaction commits when `f`
    /// returns `Ok` and rolls back otherwise.
    fn in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn CategoryStore) -> Result<T, E>,
        E: From<RepositoryError>;
}
