use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{CategoryId, CategoryName, CategorySysname};

/// Node of the global category forest.
///
/// `parent_id == None` marks a root. Leaf-ness is never stored; it is derived
/// from the children set whenever a tree view is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
    pub sysname: CategorySysname,
    pub parent_id: Option<CategoryId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Data required to insert a new [`Category`]. Identifier and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCategory {
    pub name: CategoryName,
    pub sysname: CategorySysname,
    pub parent_id: Option<CategoryId>,
}

/// Partial update of a [`Category`]. Only supplied fields are written.
///
/// `parent_id` is tri-state: `None` leaves the parent untouched,
/// `Some(None)` moves the category to the root level and `Some(Some(id))`
/// re-parents it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<CategoryName>,
    pub sysname: Option<CategorySysname>,
    pub parent_id: Option<Option<CategoryId>>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.sysname.is_none() && self.parent_id.is_none()
    }

    /// Returns the new parent when the patch assigns a concrete one.
    pub fn new_parent(&self) -> Option<CategoryId> {
        self.parent_id.flatten()
    }
}
