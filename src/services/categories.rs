//! Category hierarchy operations.
//!
//! Reads work on a single snapshot of the whole forest and derive the tree
//! shape from it. Mutations run their existence, uniqueness and cycle checks
//! inside the same unit of work as the write.

use serde::Deserialize;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser, check_role};
use crate::domain::category::{Category, CategoryPatch};
use crate::domain::types::{CategoryId, CategorySysname};
use crate::dto::categories::CategoryNode;
use crate::error_conversions::SYSNAME_TAKEN;
use crate::forms::categories::CreateCategoryPayload;
use crate::hierarchy::{CategoryTree, check_parent_in_store};
use crate::repository::{CategoryReader, CategoryStore, CategoryUnitOfWork};

use super::{ServiceError, ServiceResult};

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Query parameters accepted by `GET /categories`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCategoriesParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

fn ensure_admin(user: &AuthenticatedUser) -> ServiceResult<()> {
    if check_role(ADMIN_ROLE, &user.roles) {
        Ok(())
    } else {
        log::warn!("User {} lacks the {ADMIN_ROLE} role", user.sub);
        Err(ServiceError::Unauthorized)
    }
}

fn load_tree<R>(repo: &R) -> ServiceResult<CategoryTree>
where
    R: CategoryReader + ?Sized,
{
    Ok(CategoryTree::new(repo.list_all_categories()?))
}

/// Shallow node for a category fetched from `store`.
fn shallow_node(store: &dyn CategoryStore, category: &Category) -> ServiceResult<CategoryNode> {
    let is_leaf = store.list_children(category.id)?.is_empty();
    Ok(CategoryNode::shallow(category, is_leaf))
}

/// Flat list of every category with `is_leaf`, paginated with `skip`/`limit`.
pub fn list_categories<R>(params: ListCategoriesParams, repo: &R) -> ServiceResult<Vec<CategoryNode>>
where
    R: CategoryReader,
{
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ServiceError::Validation(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }

    let tree = load_tree(repo)?;
    Ok(tree.flat().into_iter().skip(skip).take(limit).collect())
}

/// Enriched roots of the forest; nested down to the leaves when
/// `include_children` is set.
pub fn category_tree<R>(include_children: bool, repo: &R) -> ServiceResult<Vec<CategoryNode>>
where
    R: CategoryReader,
{
    let tree = load_tree(repo)?;
    Ok(tree.forest(include_children))
}

/// Single category with its whole subtree.
pub fn get_category<R>(id: i32, repo: &R) -> ServiceResult<CategoryNode>
where
    R: CategoryReader,
{
    let id = CategoryId::new(id).map_err(|_| ServiceError::NotFound)?;
    let tree = load_tree(repo)?;
    tree.enrich(id, true).ok_or(ServiceError::NotFound)
}

/// Single category looked up by slug, with its whole subtree.
pub fn get_category_by_sysname<R>(sysname: &str, repo: &R) -> ServiceResult<CategoryNode>
where
    R: CategoryReader,
{
    // A malformed slug cannot name a stored category.
    let sysname = CategorySysname::new(sysname).map_err(|_| ServiceError::NotFound)?;
    let tree = load_tree(repo)?;
    let id = tree
        .get_by_sysname(&sysname)
        .map(|category| category.id)
        .ok_or(ServiceError::NotFound)?;
    tree.enrich(id, true).ok_or(ServiceError::NotFound)
}

/// Direct children of a category, enriched with `is_leaf` and, when
/// `include_children` is set, their own subtrees.
pub fn category_children<R>(
    id: i32,
    include_children: bool,
    repo: &R,
) -> ServiceResult<Vec<CategoryNode>>
where
    R: CategoryReader,
{
    let id = CategoryId::new(id).map_err(|_| ServiceError::NotFound)?;
    let tree = load_tree(repo)?;
    if tree.get(id).is_none() {
        return Err(ServiceError::NotFound);
    }
    Ok(tree.enrich_children(id, include_children))
}

pub fn create_category<R>(
    payload: CreateCategoryPayload,
    user: &AuthenticatedUser,
    repo: &R,
) -> ServiceResult<CategoryNode>
where
    R: CategoryUnitOfWork,
{
    ensure_admin(user)?;

    let new_category = payload.into_new_category();

    let created = repo.in_transaction(|store| -> ServiceResult<_> {
        if store
            .get_category_by_sysname(&new_category.sysname)?
            .is_some()
        {
            return Err(ServiceError::Conflict(SYSNAME_TAKEN.to_string()));
        }

        if let Some(parent_id) = new_category.parent_id {
            check_parent_in_store(store, None, parent_id)?;
        }

        Ok(store.create_category(&new_category)?)
    })?;

    log::info!(
        "Created category {} ({}) under {:?}",
        created.id,
        created.sysname,
        created.parent_id.map(CategoryId::get)
    );

    // A freshly inserted category cannot have children yet.
    Ok(CategoryNode::shallow(&created, true))
}

pub fn update_category<R>(
    id: i32,
    patch: CategoryPatch,
    user: &AuthenticatedUser,
    repo: &R,
) -> ServiceResult<CategoryNode>
where
    R: CategoryUnitOfWork,
{
    ensure_admin(user)?;

    let id = CategoryId::new(id).map_err(|_| ServiceError::NotFound)?;

    let updated = repo.in_transaction(|store| -> ServiceResult<_> {
        let current = store
            .get_category_by_id(id)?
            .ok_or(ServiceError::NotFound)?;

        if patch.is_empty() {
            return shallow_node(store, &current);
        }

        if let Some(parent_id) = patch.new_parent()
            && current.parent_id != Some(parent_id)
        {
            check_parent_in_store(store, Some(id), parent_id).inspect_err(|err| {
                log::warn!("Rejected parent {parent_id} for category {id}: {err}");
            })?;
        }

        if let Some(sysname) = &patch.sysname
            && let Some(existing) = store.get_category_by_sysname(sysname)?
            && existing.id != id
        {
            return Err(ServiceError::Conflict(SYSNAME_TAKEN.to_string()));
        }

        let updated = store
            .update_category(id, &patch)?
            .ok_or(ServiceError::NotFound)?;
        shallow_node(store, &updated)
    })?;

    log::info!("Updated category {id}");
    Ok(updated)
}

/// Delete a category together with its whole subtree. Returns `false` when the
/// id is unknown.
pub fn delete_category<R>(id: i32, user: &AuthenticatedUser, repo: &R) -> ServiceResult<bool>
where
    R: CategoryUnitOfWork,
{
    ensure_admin(user)?;

    let Ok(id) = CategoryId::new(id) else {
        return Ok(false);
    };

    let removed = repo.in_transaction(|store| -> ServiceResult<_> {
        if store.get_category_by_id(id)?.is_none() {
            return Ok(None);
        }

        let tree = CategoryTree::new(store.list_all_categories()?);
        let subtree = tree.descendants(id);

        // Reversed pre-order puts every node after all of its descendants, so
        // no remaining row ever points at a deleted parent.
        for descendant in subtree.iter().rev() {
            store.delete_category(*descendant)?;
        }
        store.delete_category(id)?;

        Ok(Some(subtree.len()))
    })?;

    match removed {
        Some(descendants) => {
            log::info!("Deleted category {id} and {descendants} descendants");
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CategoryName, CategorySysname};
    use crate::hierarchy::flatten;
    use crate::repository::test::TestRepository;
    use chrono::DateTime;

    fn admin() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "1".into(),
            roles: vec![ADMIN_ROLE.into()],
            exp: 0,
        }
    }

    fn visitor() -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "2".into(),
            roles: vec!["user".into()],
            exp: 0,
        }
    }

    fn sample_category(id: i32, sysname: &str, parent: Option<i32>) -> Category {
        Category {
            id: CategoryId::new(id).unwrap(),
            name: CategoryName::new(sysname.to_uppercase()).unwrap(),
            sysname: CategorySysname::new(sysname).unwrap(),
            parent_id: parent.map(|p| CategoryId::new(p).unwrap()),
            created_at: DateTime::from_timestamp(0, 0).unwrap().naive_utc(),
            updated_at: DateTime::from_timestamp(0, 0).unwrap().naive_utc(),
        }
    }

    fn payload(sysname: &str, parent: Option<i32>) -> CreateCategoryPayload {
        CreateCategoryPayload {
            name: CategoryName::new(sysname.to_uppercase()).unwrap(),
            sysname: CategorySysname::new(sysname).unwrap(),
            parent_id: parent.map(|p| CategoryId::new(p).unwrap()),
        }
    }

    fn reparent(parent: Option<i32>) -> CategoryPatch {
        CategoryPatch {
            parent_id: Some(parent.map(|p| CategoryId::new(p).unwrap())),
            ..CategoryPatch::default()
        }
    }

    fn parent_of(repo: &TestRepository, id: i32) -> Option<i32> {
        repo.get_category_by_id(CategoryId::new(id).unwrap())
            .unwrap()
            .unwrap()
            .parent_id
            .map(CategoryId::get)
    }

    /// a(1) ── b(2) ── c(3)
    /// d(4) ── e(5)
    fn sample_repo() -> TestRepository {
        TestRepository::new(vec![
            sample_category(1, "a", None),
            sample_category(2, "b", Some(1)),
            sample_category(3, "c", Some(2)),
            sample_category(4, "d", None),
            sample_category(5, "e", Some(4)),
        ])
    }

    fn assert_forest(repo: &TestRepository) {
        let all = repo.snapshot();
        for category in &all {
            let mut current = category.parent_id;
            let mut steps = 0;
            while let Some(parent) = current {
                assert_ne!(parent, category.id, "{} is its own ancestor", category.id);
                steps += 1;
                assert!(steps <= all.len(), "walk from {} did not terminate", category.id);
                current = all.iter().find(|c| c.id == parent).unwrap().parent_id;
            }
        }
    }

    #[test]
    fn creates_root_and_child() {
        let repo = TestRepository::default();
        let root = create_category(payload("rugs", None), &admin(), &repo).unwrap();
        assert!(root.is_leaf);
        assert_eq!(root.parent_id, None);

        let child = create_category(payload("wool", Some(root.id)), &admin(), &repo).unwrap();
        assert_eq!(child.parent_id, Some(root.id));

        let tree = category_tree(true, &repo).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(!tree[0].is_leaf);
        assert_eq!(tree[0].children.as_ref().unwrap()[0].id, child.id);
    }

    #[test]
    fn create_requires_admin() {
        let repo = TestRepository::default();
        let err = create_category(payload("rugs", None), &visitor(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Unauthorized);
        assert!(repo.snapshot().is_empty());
    }

    #[test]
    fn duplicate_sysname_conflicts_and_keeps_original() {
        let repo = TestRepository::default();
        let first = create_category(payload("rugs", None), &admin(), &repo).unwrap();

        let err = create_category(payload("rugs", None), &admin(), &repo).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let all = repo.snapshot();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].name.as_str(), "RUGS");
    }

    #[test]
    fn create_with_unknown_parent_fails() {
        let repo = sample_repo();
        let err = create_category(payload("x", Some(999)), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Validation("parent not found".into()));
        assert_eq!(repo.snapshot().len(), 5);
    }

    #[test]
    fn cyclic_update_is_rejected_and_parents_kept() {
        let repo = TestRepository::default();
        let a = create_category(payload("a", None), &admin(), &repo).unwrap();
        let b = create_category(payload("b", Some(a.id)), &admin(), &repo).unwrap();

        let err = update_category(a.id, reparent(Some(b.id)), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Validation("cyclic reference".into()));

        assert_eq!(parent_of(&repo, a.id), None);
        assert_eq!(parent_of(&repo, b.id), Some(a.id));
    }

    #[test]
    fn self_parenting_is_rejected() {
        let repo = sample_repo();
        let err = update_category(2, reparent(Some(2)), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Validation("cyclic reference".into()));
        assert_eq!(parent_of(&repo, 2), Some(1));
    }

    #[test]
    fn moving_subtree_under_grandchild_is_rejected() {
        let repo = sample_repo();
        let writes = repo.writes();
        let err = update_category(1, reparent(Some(3)), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Validation("cyclic reference".into()));
        assert_eq!(repo.writes(), writes);
    }

    #[test]
    fn update_with_unknown_parent_keeps_parent() {
        let repo = sample_repo();
        let err = update_category(3, reparent(Some(99999)), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Validation("parent not found".into()));
        assert_eq!(parent_of(&repo, 3), Some(2));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let repo = sample_repo();
        let err = update_category(42, reparent(None), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::NotFound);
    }

    #[test]
    fn update_moves_subtree_and_to_root() {
        let repo = sample_repo();
        let moved = update_category(2, reparent(Some(4)), &admin(), &repo).unwrap();
        assert_eq!(moved.parent_id, Some(4));
        assert!(!moved.is_leaf);

        let roots = category_tree(false, &repo).unwrap();
        assert!(roots.iter().find(|n| n.id == 1).unwrap().is_leaf);

        let rooted = update_category(2, reparent(None), &admin(), &repo).unwrap();
        assert_eq!(rooted.parent_id, None);
        assert_forest(&repo);
    }

    #[test]
    fn reassigning_current_parent_is_a_no_op() {
        let repo = sample_repo();
        let node = update_category(3, reparent(Some(2)), &admin(), &repo).unwrap();
        assert_eq!(node.parent_id, Some(2));
        assert!(node.is_leaf);
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let repo = sample_repo();
        let patch = CategoryPatch {
            name: Some(CategoryName::new("Renamed").unwrap()),
            ..CategoryPatch::default()
        };
        let node = update_category(2, patch, &admin(), &repo).unwrap();
        assert_eq!(node.name, "Renamed");
        assert_eq!(node.sysname, "b");
        assert_eq!(node.parent_id, Some(1));
    }

    #[test]
    fn sysname_collision_on_update_conflicts() {
        let repo = sample_repo();
        let patch = CategoryPatch {
            sysname: Some(CategorySysname::new("a").unwrap()),
            ..CategoryPatch::default()
        };
        let err = update_category(2, patch, &admin(), &repo).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Keeping its own sysname is not a collision.
        let patch = CategoryPatch {
            sysname: Some(CategorySysname::new("b").unwrap()),
            ..CategoryPatch::default()
        };
        assert!(update_category(2, patch, &admin(), &repo).is_ok());
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let repo = sample_repo();
        assert!(delete_category(1, &admin(), &repo).unwrap());

        for gone in [1, 2, 3] {
            assert!(
                repo.get_category_by_id(CategoryId::new(gone).unwrap())
                    .unwrap()
                    .is_none()
            );
        }
        let remaining = repo.snapshot();
        assert_eq!(remaining.len(), 2);
        assert!(
            remaining
                .iter()
                .all(|c| c.parent_id.is_none_or(|p| remaining.iter().any(|r| r.id == p)))
        );
    }

    #[test]
    fn delete_unknown_returns_false() {
        let repo = sample_repo();
        assert!(!delete_category(42, &admin(), &repo).unwrap());
        assert!(!delete_category(0, &admin(), &repo).unwrap());
        assert_eq!(repo.snapshot().len(), 5);
    }

    #[test]
    fn delete_requires_admin() {
        let repo = sample_repo();
        assert_eq!(
            delete_category(1, &visitor(), &repo).unwrap_err(),
            ServiceError::Unauthorized
        );
        assert_eq!(repo.snapshot().len(), 5);
    }

    #[test]
    fn is_leaf_matches_children_after_every_mutation() {
        let repo = sample_repo();
        let check = |repo: &TestRepository| {
            for node in list_categories(ListCategoriesParams::default(), repo).unwrap() {
                let children = category_children(node.id, false, repo).unwrap();
                assert_eq!(node.is_leaf, children.is_empty(), "node {}", node.id);
            }
        };

        check(&repo);
        update_category(5, reparent(Some(3)), &admin(), &repo).unwrap();
        check(&repo);
        create_category(payload("f", Some(4)), &admin(), &repo).unwrap();
        check(&repo);
        delete_category(2, &admin(), &repo).unwrap();
        check(&repo);
    }

    #[test]
    fn every_reassignment_keeps_a_forest() {
        // Try every (node, parent) pair from every reachable starting shape.
        for node in 1..=5 {
            for parent in 1..=5 {
                let repo = sample_repo();
                let _ = update_category(node, reparent(Some(parent)), &admin(), &repo);
                assert_forest(&repo);
                for second_node in 1..=5 {
                    for second_parent in 1..=5 {
                        let _ = update_category(
                            second_node,
                            reparent(Some(second_parent)),
                            &admin(),
                            &repo,
                        );
                        assert_forest(&repo);
                    }
                }
            }
        }
    }

    #[test]
    fn listing_is_paginated() {
        let repo = sample_repo();
        let page = list_categories(
            ListCategoriesParams {
                skip: Some(1),
                limit: Some(2),
            },
            &repo,
        )
        .unwrap();
        assert_eq!(page.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 3]);
        assert!(page.iter().all(|n| n.children.is_none()));

        let err = list_categories(
            ListCategoriesParams {
                skip: None,
                limit: Some(0),
            },
            &repo,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn lookups_by_id_and_sysname_include_subtree() {
        let repo = sample_repo();
        let by_id = get_category(1, &repo).unwrap();
        let by_slug = get_category_by_sysname("a", &repo).unwrap();
        assert_eq!(by_id, by_slug);
        let b = &by_id.children.as_ref().unwrap()[0];
        assert_eq!(b.children.as_ref().unwrap()[0].id, 3);

        assert_eq!(get_category(99, &repo).unwrap_err(), ServiceError::NotFound);
        assert_eq!(
            get_category_by_sysname("NOT A SLUG", &repo).unwrap_err(),
            ServiceError::NotFound
        );
    }

    #[test]
    fn children_of_unknown_category_is_not_found() {
        let repo = sample_repo();
        assert_eq!(
            category_children(99, false, &repo).unwrap_err(),
            ServiceError::NotFound
        );
        let nested = category_children(1, true, &repo).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].children.as_ref().unwrap()[0].id, 3);
    }

    #[test]
    fn deep_chains_stay_whole_and_movable() {
        let repo = TestRepository::default();
        let mut parent = None;
        for n in 1..=300 {
            let node =
                create_category(payload(&format!("level-{n}"), parent), &admin(), &repo).unwrap();
            parent = Some(node.id);
        }
        let deepest = parent.unwrap();

        let tree = category_tree(true, &repo).unwrap();
        assert_eq!(flatten(&tree).len(), 300);
        let by_slug = get_category_by_sysname("level-1", &repo).unwrap();
        assert_eq!(flatten(std::slice::from_ref(&by_slug)).len(), 300);

        let stray = create_category(payload("stray", None), &admin(), &repo).unwrap();
        let moved = update_category(stray.id, reparent(Some(deepest)), &admin(), &repo).unwrap();
        assert_eq!(moved.parent_id, Some(deepest));

        // The chain's own root still cannot move under its deepest node.
        let err = update_category(1, reparent(Some(deepest)), &admin(), &repo).unwrap_err();
        assert_eq!(err, ServiceError::Validation("cyclic reference".into()));
        assert_forest(&repo);
    }

    #[test]
    fn storage_failures_surface_as_storage_errors() {
        let repo = TestRepository::failing();
        assert!(matches!(
            category_tree(true, &repo).unwrap_err(),
            ServiceError::Storage(_)
        ));
        assert!(matches!(
            create_category(payload("rugs", None), &admin(), &repo).unwrap_err(),
            ServiceError::Storage(_)
        ));
    }
}
