//! Helpers for integration tests.
#![allow(dead_code)]

use catalog_categories::db::{DbPool, establish_connection_pool};
use catalog_categories::domain::auth::AuthenticatedUser;
use catalog_categories::domain::category::NewCategory;
use catalog_categories::domain::types::{CategoryId, CategoryName, CategorySysname};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tempfile::NamedTempFile;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!(); // assumes migrations/ exists

/// Temporary database used in integration tests.
pub struct TestDb {
    _tempfile: NamedTempFile,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let tempfile = NamedTempFile::new().expect("Failed to create temp file");
        let pool = establish_connection_pool(tempfile.path().to_str().unwrap())
            .expect("Failed to establish SQLite connection.");
        let mut conn = pool
            .get()
            .expect("Failed to get SQLite connection from pool.");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Migrations failed");
        TestDb {
            _tempfile: tempfile,
            pool,
        }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

pub fn new_category(sysname: &str, parent: Option<CategoryId>) -> NewCategory {
    NewCategory {
        name: CategoryName::new(sysname.to_uppercase()).expect("valid category name"),
        sysname: CategorySysname::new(sysname).expect("valid sysname"),
        parent_id: parent,
    }
}

pub fn admin() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "1".to_string(),
        roles: vec!["admin".to_string()],
        exp: chrono::Utc::now().timestamp() + 3600,
    }
}

pub fn visitor() -> AuthenticatedUser {
    AuthenticatedUser {
        sub: "2".to_string(),
        roles: vec!["user".to_string()],
        exp: chrono::Utc::now().timestamp() + 3600,
    }
}
