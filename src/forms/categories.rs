use serde::{Deserialize, Deserializer};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::domain::category::{CategoryPatch, NewCategory};
use crate::domain::types::{CategoryId, CategoryName, CategorySysname, TypeConstraintError};

/// Distinguishes an absent field from an explicit `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// JSON body of `POST /categories`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryForm {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sysname: String,
    #[validate(range(min = 1))]
    pub parent_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateCategoryPayload {
    pub name: CategoryName,
    pub sysname: CategorySysname,
    pub parent_id: Option<CategoryId>,
}

impl CreateCategoryPayload {
    pub fn into_new_category(self) -> NewCategory {
        NewCategory {
            name: self.name,
            sysname: self.sysname,
            parent_id: self.parent_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum CreateCategoryFormError {
    #[error("Create category form validation failed: {0}")]
    Validation(String),
    #[error("Create category form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<ValidationErrors> for CreateCategoryFormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TypeConstraintError> for CreateCategoryFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<CreateCategoryForm> for CreateCategoryPayload {
    type Error = CreateCategoryFormError;

    fn try_from(value: CreateCategoryForm) -> Result<Self, Self::Error> {
        value.validate()?;
        Ok(Self {
            name: CategoryName::new(value.name)?,
            sysname: CategorySysname::new(value.sysname)?,
            parent_id: value.parent_id.map(CategoryId::new).transpose()?,
        })
    }
}

/// JSON body of `PUT /categories/{id}`. Every field is optional; an explicit
/// `"parent_id": null` moves the category to the root level.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryForm {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sysname: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<i32>>,
}

#[derive(Debug, Error)]
pub enum UpdateCategoryFormError {
    #[error("Update category form validation failed: {0}")]
    Validation(String),
    #[error("Update category form contains invalid data: {0}")]
    TypeConstraint(String),
}

impl From<ValidationErrors> for UpdateCategoryFormError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TypeConstraintError> for UpdateCategoryFormError {
    fn from(value: TypeConstraintError) -> Self {
        Self::TypeConstraint(value.to_string())
    }
}

impl TryFrom<UpdateCategoryForm> for CategoryPatch {
    type Error = UpdateCategoryFormError;

    fn try_from(value: UpdateCategoryForm) -> Result<Self, Self::Error> {
        value.validate()?;
        Ok(Self {
            name: value.name.map(CategoryName::new).transpose()?,
            sysname: value.sysname.map(CategorySysname::new).transpose()?,
            parent_id: value
                .parent_id
                .map(|parent| parent.map(CategoryId::new).transpose())
                .transpose()?,
        })
    }
}
