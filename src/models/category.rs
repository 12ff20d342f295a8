use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::category::{
    Category as DomainCategory, CategoryPatch as DomainCategoryPatch,
    NewCategory as DomainNewCategory,
};
use crate::domain::types::{CategoryName, CategorySysname, TypeConstraintError};

/// Diesel model representing the `categories` table.
#[derive(Debug, Clone, Identifiable, Queryable)]
#[diesel(table_name = crate::schema::categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub sysname: String,
    pub parent_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insertable form of [`Category`].
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::categories)]
pub struct NewCategory {
    pub name: String,
    pub sysname: String,
    pub parent_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial update; `None` fields are left out of the `UPDATE` statement.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = crate::schema::categories)]
pub struct CategoryChangeset {
    pub name: Option<String>,
    pub sysname: Option<String>,
    pub parent_id: Option<Option<i32>>,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<Category> for DomainCategory {
    type Error = TypeConstraintError;

    fn try_from(category: Category) -> Result<Self, Self::Error> {
        Ok(Self {
            id: category.id.try_into()?,
            name: CategoryName::new(category.name)?,
            sysname: CategorySysname::new(category.sysname)?,
            parent_id: category.parent_id.map(TryInto::try_into).transpose()?,
            created_at: category.created_at,
            updated_at: category.updated_at,
        })
    }
}

impl NewCategory {
    pub fn from_domain(category: DomainNewCategory, now: NaiveDateTime) -> Self {
        Self {
            name: category.name.into_inner(),
            sysname: category.sysname.into_inner(),
            parent_id: category.parent_id.map(|id| id.get()),
            created_at: now,
            updated_at: now,
        }
    }
}

impl CategoryChangeset {
    pub fn from_domain(patch: DomainCategoryPatch, now: NaiveDateTime) -> Self {
        Self {
            name: patch.name.map(CategoryName::into_inner),
            sysname: patch.sysname.map(CategorySysname::into_inner),
            parent_id: patch.parent_id.map(|parent| parent.map(|id| id.get())),
            updated_at: now,
        }
    }
}
