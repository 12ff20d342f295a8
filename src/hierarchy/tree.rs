//! Tree views over a flat category snapshot.
//!
//! The parent → children index is built once per snapshot; every view below is
//! derived from it. A node is a leaf when it has no children in the whole
//! snapshot, even for shallow views. Nested views are assembled without
//! recursion, so their depth is bounded only by the data.

use std::collections::{HashMap, HashSet};

use crate::domain::category::Category;
use crate::domain::types::{CategoryId, CategorySysname};
use crate::dto::categories::CategoryNode;

/// Arena of categories plus the derived adjacency.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: Vec<Category>,
    index: HashMap<CategoryId, usize>,
    children: HashMap<CategoryId, Vec<usize>>,
    roots: Vec<usize>,
}

impl CategoryTree {
    /// Index a snapshot. Root and child order follow the snapshot order.
    pub fn new(categories: Vec<Category>) -> Self {
        let index = categories
            .iter()
            .enumerate()
            .map(|(position, category)| (category.id, position))
            .collect();

        let mut children: HashMap<CategoryId, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();
        for (position, category) in categories.iter().enumerate() {
            match category.parent_id {
                Some(parent_id) => children.entry(parent_id).or_default().push(position),
                None => roots.push(position),
            }
        }

        Self {
            nodes: categories,
            index,
            children,
            roots,
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.index.get(&id).map(|&position| &self.nodes[position])
    }

    pub fn get_by_sysname(&self, sysname: &CategorySysname) -> Option<&Category> {
        self.nodes.iter().find(|category| &category.sysname == sysname)
    }

    pub fn is_leaf(&self, id: CategoryId) -> bool {
        self.child_positions(id).is_empty()
    }

    /// Enriched view of a single node, `None` if `id` is not in the snapshot.
    pub fn enrich(&self, id: CategoryId, include_children: bool) -> Option<CategoryNode> {
        self.index
            .get(&id)
            .map(|&position| self.build(position, include_children))
    }

    /// Enriched roots, nested down to the leaves when `include_children` is set.
    pub fn forest(&self, include_children: bool) -> Vec<CategoryNode> {
        self.roots
            .iter()
            .map(|&position| self.build(position, include_children))
            .collect()
    }

    /// Every category as a shallow enriched node, in snapshot order.
    pub fn flat(&self) -> Vec<CategoryNode> {
        self.nodes
            .iter()
            .map(|category| CategoryNode::shallow(category, self.is_leaf(category.id)))
            .collect()
    }

    /// Enriched direct children of `id`.
    pub fn enrich_children(&self, id: CategoryId, include_children: bool) -> Vec<CategoryNode> {
        self.child_positions(id)
            .iter()
            .map(|&position| self.build(position, include_children))
            .collect()
    }

    /// All descendants of `id` in pre-order, excluding `id` itself. Each node
    /// is listed once even if the stored parent links loop.
    pub fn descendants(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([id]);
        let mut stack: Vec<usize> = self.child_positions(id).iter().rev().copied().collect();

        while let Some(position) = stack.pop() {
            let child_id = self.nodes[position].id;
            if !visited.insert(child_id) {
                continue;
            }
            found.push(child_id);
            stack.extend(self.child_positions(child_id).iter().rev());
        }

        found
    }

    fn child_positions(&self, id: CategoryId) -> &[usize] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    fn shallow(&self, position: usize) -> CategoryNode {
        let category = &self.nodes[position];
        CategoryNode::shallow(category, self.is_leaf(category.id))
    }

    fn build(&self, position: usize, include_children: bool) -> CategoryNode {
        if !include_children {
            return self.shallow(position);
        }

        // Pre-order walk recording each node's parent slot. A node already
        // placed is skipped, which only happens when stored links loop.
        let mut slots: Vec<(usize, Option<usize>)> = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(position, None)];
        while let Some((position, parent_slot)) = stack.pop() {
            let id = self.nodes[position].id;
            if !visited.insert(id) {
                log::warn!("Category {id} is its own ancestor, skipping");
                continue;
            }
            let slot = slots.len();
            slots.push((position, parent_slot));
            stack.extend(
                self.child_positions(id)
                    .iter()
                    .rev()
                    .map(|&child| (child, Some(slot))),
            );
        }

        let mut built: Vec<Option<CategoryNode>> = slots
            .iter()
            .map(|&(position, _)| {
                let mut node = self.shallow(position);
                node.children = Some(Vec::new());
                Some(node)
            })
            .collect();

        // Every descendant has a higher slot than its ancestors, so walking
        // slots backwards attaches each node once its subtree is complete.
        // Children arrive last-first and are reversed before attaching.
        for slot in (1..slots.len()).rev() {
            let Some(mut node) = built[slot].take() else {
                continue;
            };
            if let Some(children) = node.children.as_mut() {
                children.reverse();
            }
            if let Some(parent) = slots[slot].1.and_then(|p| built[p].as_mut())
                && let Some(children) = parent.children.as_mut()
            {
                children.push(node);
            }
        }

        let mut root = built
            .swap_remove(0)
            .unwrap_or_else(|| self.shallow(position));
        if let Some(children) = root.children.as_mut() {
            children.reverse();
        }
        root
    }
}

/// Pre-order ids of a nested forest.
pub fn flatten(nodes: &[CategoryNode]) -> Vec<i32> {
    let mut ids = Vec::new();
    let mut stack: Vec<&CategoryNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        ids.push(node.id);
        if let Some(children) = &node.children {
            stack.extend(children.iter().rev());
        }
    }
    ids
}
