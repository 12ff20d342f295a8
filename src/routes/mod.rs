use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;

use crate::services::ServiceError;

pub mod categories;
pub mod main;

/// JSON error body shared by every endpoint.
pub fn error_response(status: StatusCode, detail: &str) -> HttpResponse {
    HttpResponse::build(status).json(json!({
        "error": detail,
        "status_code": status.as_u16(),
    }))
}

/// Map a service failure onto its HTTP status.
pub fn service_error_response(err: ServiceError) -> HttpResponse {
    match err {
        ServiceError::Unauthorized => {
            error_response(StatusCode::FORBIDDEN, "admin role required")
        }
        ServiceError::Validation(message) => error_response(StatusCode::BAD_REQUEST, &message),
        ServiceError::NotFound => error_response(StatusCode::NOT_FOUND, "category not found"),
        ServiceError::Conflict(message) => error_response(StatusCode::CONFLICT, &message),
        ServiceError::Storage(message) => {
            log::error!("Request failed with a storage error: {message}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(StatusCode::BAD_REQUEST, &err.to_string());
    InternalError::from_response(err, response).into()
}

fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    let response = error_response(StatusCode::BAD_REQUEST, &err.to_string());
    InternalError::from_response(err, response).into()
}

/// Register every route of the service. Literal category paths are
/// registered before `{id}` so they are not captured by it.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(main::index)
        .service(main::health)
        .service(categories::list_categories)
        .service(categories::create_category)
        .service(categories::category_tree)
        .service(categories::root_categories)
        .service(categories::get_category_by_sysname)
        .service(categories::get_category)
        .service(categories::category_children)
        .service(categories::update_category)
        .service(categories::delete_category);
}
