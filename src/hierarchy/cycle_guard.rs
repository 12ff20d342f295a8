//! Acyclicity check for parent assignments.
//!
//! Assigning parent `P` to node `N` is accepted when `P` exists and the walk
//! from `P` up through successive parents reaches a root without meeting `N`.
//! The walk is O(depth) and must run against the state the write will commit
//! to, i.e. inside the same unit of work.

use std::collections::HashSet;

use crate::domain::types::CategoryId;
use crate::hierarchy::HierarchyError;
use crate::repository::{CategoryReader, RepositoryResult};

/// Validate that making `parent` the parent of `node` keeps the forest acyclic.
///
/// `node` is `None` for a category that is about to be created; such a node has
/// no descendants, so only the existence of `parent` is checked.
///
/// `parent_of` resolves a category to `Some(its parent_id)`, or `None` when the
/// category does not exist.
pub fn check_parent_assignment<F>(
    node: Option<CategoryId>,
    parent: CategoryId,
    mut parent_of: F,
) -> Result<(), HierarchyError>
where
    F: FnMut(CategoryId) -> RepositoryResult<Option<Option<CategoryId>>>,
{
    if node == Some(parent) {
        return Err(HierarchyError::SelfParent);
    }

    let Some(mut next) = parent_of(parent)? else {
        return Err(HierarchyError::ParentNotFound(parent));
    };

    let Some(node) = node else {
        return Ok(());
    };

    let mut visited = HashSet::from([parent]);

    while let Some(ancestor) = next {
        if ancestor == node {
            return Err(HierarchyError::CyclicReference);
        }
        if !visited.insert(ancestor) {
            // The existing chain already loops without passing through `node`.
            log::warn!("Ancestor chain of category {parent} loops at {ancestor}");
            return Err(HierarchyError::CyclicReference);
        }
        next = match parent_of(ancestor)? {
            Some(next) => next,
            None => {
                log::warn!("Ancestor chain of category {parent} references missing {ancestor}");
                None
            }
        };
    }

    Ok(())
}

/// [`check_parent_assignment`] against persisted state.
pub fn check_parent_in_store<R>(
    store: &R,
    node: Option<CategoryId>,
    parent: CategoryId,
) -> Result<(), HierarchyError>
where
    R: CategoryReader + ?Sized,
{
    check_parent_assignment(node, parent, |id| {
        Ok(store.get_category_by_id(id)?.map(|category| category.parent_id))
    })
}
