//! Error conversion glue between layers.
//!
//! The domain and repository layers must not depend on service error types, so
//! the mapping into [`ServiceError`] lives here.

use crate::domain::types::TypeConstraintError;
use crate::forms::categories::{CreateCategoryFormError, UpdateCategoryFormError};
use crate::hierarchy::HierarchyError;
use crate::repository::RepositoryError;
use crate::services::ServiceError;

pub const PARENT_NOT_FOUND: &str = "parent not found";
pub const CYCLIC_REFERENCE: &str = "cyclic reference";
pub const SYSNAME_TAKEN: &str = "category with this sysname already exists";

impl From<TypeConstraintError> for ServiceError {
    fn from(val: TypeConstraintError) -> Self {
        ServiceError::Validation(val.to_string())
    }
}

impl From<CreateCategoryFormError> for ServiceError {
    fn from(val: CreateCategoryFormError) -> Self {
        ServiceError::Validation(val.to_string())
    }
}

impl From<UpdateCategoryFormError> for ServiceError {
    fn from(val: UpdateCategoryFormError) -> Self {
        ServiceError::Validation(val.to_string())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(val: RepositoryError) -> Self {
        match val {
            RepositoryError::Conflict(_) => ServiceError::Conflict(SYSNAME_TAKEN.to_string()),
            RepositoryError::ForeignKey(_) => ServiceError::Validation(PARENT_NOT_FOUND.to_string()),
            other => {
                log::error!("Category storage failure: {other}");
                ServiceError::Storage(other.to_string())
            }
        }
    }
}

impl From<HierarchyError> for ServiceError {
    fn from(val: HierarchyError) -> Self {
        match val {
            HierarchyError::ParentNotFound(_) => {
                ServiceError::Validation(PARENT_NOT_FOUND.to_string())
            }
            HierarchyError::SelfParent | HierarchyError::CyclicReference => {
                ServiceError::Validation(CYCLIC_REFERENCE.to_string())
            }
            HierarchyError::Storage(err) => err.into(),
        }
    }
}
