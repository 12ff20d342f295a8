use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use serde::Deserialize;
use serde_json::json;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::category::CategoryPatch;
use crate::forms::categories::{CreateCategoryForm, CreateCategoryPayload, UpdateCategoryForm};
use crate::repository::DieselRepository;
use crate::routes::{error_response, service_error_response};
use crate::services::ServiceError;
use crate::services::categories::{
    ListCategoriesParams, category_children as category_children_service,
    category_tree as category_tree_service, create_category as create_category_service,
    delete_category as delete_category_service, get_category as get_category_service,
    get_category_by_sysname as get_category_by_sysname_service,
    list_categories as list_categories_service, update_category as update_category_service,
};

#[derive(Debug, Default, Deserialize)]
pub struct ChildrenQuery {
    #[serde(default)]
    pub nested: bool,
}

#[get("/categories")]
pub async fn list_categories(
    params: web::Query<ListCategoriesParams>,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match list_categories_service(params.into_inner(), repo.get_ref()) {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(err) => service_error_response(err),
    }
}

#[get("/categories/tree")]
pub async fn category_tree(repo: web::Data<DieselRepository>) -> impl Responder {
    match category_tree_service(true, repo.get_ref()) {
        Ok(tree) => HttpResponse::Ok().json(tree),
        Err(err) => service_error_response(err),
    }
}

#[get("/categories/root")]
pub async fn root_categories(repo: web::Data<DieselRepository>) -> impl Responder {
    match category_tree_service(false, repo.get_ref()) {
        Ok(roots) => HttpResponse::Ok().json(roots),
        Err(err) => service_error_response(err),
    }
}

#[get("/categories/by-sysname/{sysname}")]
pub async fn get_category_by_sysname(
    sysname: web::Path<String>,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match get_category_by_sysname_service(&sysname, repo.get_ref()) {
        Ok(category) => HttpResponse::Ok().json(category),
        Err(err) => service_error_response(err),
    }
}

#[get("/categories/{category_id}")]
pub async fn get_category(
    category_id: web::Path<i32>,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match get_category_service(category_id.into_inner(), repo.get_ref()) {
        Ok(category) => HttpResponse::Ok().json(category),
        Err(err) => service_error_response(err),
    }
}

#[get("/categories/{category_id}/children")]
pub async fn category_children(
    category_id: web::Path<i32>,
    query: web::Query<ChildrenQuery>,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match category_children_service(category_id.into_inner(), query.nested, repo.get_ref()) {
        Ok(children) => HttpResponse::Ok().json(children),
        Err(err) => service_error_response(err),
    }
}

#[post("/categories")]
pub async fn create_category(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<CreateCategoryForm>,
) -> impl Responder {
    let payload: CreateCategoryPayload = match form.try_into() {
        Ok(payload) => payload,
        Err(e) => return service_error_response(ServiceError::from(e)),
    };

    match create_category_service(payload, &user, repo.get_ref()) {
        Ok(category) => HttpResponse::Created().json(category),
        Err(err) => service_error_response(err),
    }
}

#[put("/categories/{category_id}")]
pub async fn update_category(
    category_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<UpdateCategoryForm>,
) -> impl Responder {
    let patch: CategoryPatch = match form.try_into() {
        Ok(patch) => patch,
        Err(e) => return service_error_response(ServiceError::from(e)),
    };

    match update_category_service(category_id.into_inner(), patch, &user, repo.get_ref()) {
        Ok(category) => HttpResponse::Ok().json(category),
        Err(err) => service_error_response(err),
    }
}

#[delete("/categories/{category_id}")]
pub async fn delete_category(
    category_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match delete_category_service(category_id.into_inner(), &user, repo.get_ref()) {
        Ok(true) => HttpResponse::Ok().json(json!({ "message": "Category deleted successfully" })),
        Ok(false) => error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "category not found",
        ),
        Err(err) => service_error_response(err),
    }
}
