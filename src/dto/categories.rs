use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::category::Category;

/// Category enriched with derived structure, as returned to API clients.
///
/// `children` is omitted in shallow views and holds the recursively enriched
/// subtree otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: i32,
    pub name: String,
    pub sysname: String,
    pub parent_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_leaf: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<CategoryNode>>,
}

impl CategoryNode {
    /// Shallow node without nested children.
    pub fn shallow(category: &Category, is_leaf: bool) -> Self {
        Self {
            id: category.id.get(),
            name: category.name.as_str().to_string(),
            sysname: category.sysname.as_str().to_string(),
            parent_id: category.parent_id.map(|id| id.get()),
            created_at: category.created_at,
            updated_at: category.updated_at,
            is_leaf,
            children: None,
        }
    }
}
