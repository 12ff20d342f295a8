use serde::{Deserialize, Serialize};

/// Role required for every mutating category operation.
pub const ADMIN_ROLE: &str = "admin";

/// Identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Subject, the user identifier issued by the auth service.
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Returns `true` when `role` is among `roles`.
pub fn check_role(role: &str, roles: &[String]) -> bool {
    roles.iter().any(|r| r == role)
}
