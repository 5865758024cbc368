//! Caller identity extraction.
//!
//! Authentication itself happens upstream: the external auth gateway validates the caller's
//! token and forwards the verified identity in the `x-pod-user` and `x-pod-roles` headers. This
//! module turns those headers into typed [`AuthClaims`] for route handlers, and the ACL
//! middleware enforces per-route role requirements on the same headers.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use podium_engine::db_types::Role;

use crate::errors::ServerError;

pub const USER_HEADER: &str = "x-pod-user";
pub const ROLES_HEADER: &str = "x-pod-roles";
pub const NAME_HEADER: &str = "x-pod-name";

#[derive(Debug, Clone)]
pub struct AuthClaims {
    pub user_id: i64,
    pub roles: Vec<Role>,
    pub name: Option<String>,
}

impl AuthClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Admins get the privileged overrides (assignment bypass, owner bypass) in the engine.
    pub fn is_privileged(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("user-{}", self.user_id))
    }
}

pub fn claims_from_request(req: &HttpRequest) -> Result<AuthClaims, ServerError> {
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::CouldNotDeserializeAuthHeaders(format!("{USER_HEADER} header is missing")))?
        .parse::<i64>()
        .map_err(|e| ServerError::CouldNotDeserializeAuthHeaders(format!("{USER_HEADER} is not a valid id: {e}")))?;
    let roles = match req.headers().get(ROLES_HEADER).and_then(|v| v.to_str().ok()) {
        Some(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.parse::<Role>().map_err(|e| ServerError::CouldNotDeserializeAuthHeaders(e.to_string()))
            })
            .collect::<Result<Vec<Role>, ServerError>>()?,
        None => Vec::new(),
    };
    let name = req.headers().get(NAME_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
    Ok(AuthClaims { user_id, roles, name })
}

impl FromRequest for AuthClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}
