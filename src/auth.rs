//! Bearer token extraction for actix-web handlers.

use std::future::{Ready, ready};

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, FromRequest, HttpRequest, web};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::domain::auth::AuthenticatedUser;
use crate::routes::error_response;

/// Key material used to verify access tokens.
#[derive(Clone)]
pub struct AuthConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthConfig {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify `token` and return the identity it carries.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, String> {
        decode::<AuthenticatedUser>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| format!("invalid token: {e}"))
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, String> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| "missing Authorization header".to_string())?
        .to_str()
        .map_err(|_| "invalid Authorization header".to_string())?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err("empty bearer token".to_string()),
        None => Err("Authorization header must use the Bearer scheme".to_string()),
    }
}

fn unauthorized(message: String) -> Error {
    let response = error_response(StatusCode::UNAUTHORIZED, &message);
    InternalError::from_response(message, response).into()
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(config) = req.app_data::<web::Data<AuthConfig>>() else {
            log::error!("AuthConfig is not registered with the application");
            let response =
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
            return ready(Err(InternalError::from_response(
                "authentication is not configured",
                response,
            )
            .into()));
        };

        let user = bearer_token(req).and_then(|token| config.verify(token));
        ready(user.map_err(|message| {
            log::warn!("Rejected request to {}: {message}", req.path());
            unauthorized(message)
        }))
    }
}
