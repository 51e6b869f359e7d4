use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::auth::AuthUser;
use crate::database::models::Role;
use crate::error::{Error, TOKEN_NOT_FOUND};
use crate::services::UsersService;

/// Roles a route group accepts; the caller needs any one of them.
#[derive(Clone)]
pub struct RoleGate {
    pub users: Arc<UsersService>,
    pub roles: &'static [Role],
}

impl RoleGate {
    pub fn new(users: Arc<UsersService>, roles: &'static [Role]) -> Self {
        Self { users, roles }
    }
}

/// Must run inside [`super::auth::require_auth`].
pub async fn require_any_role(State(gate): State<RoleGate>, request: Request, next: Next) -> Response {
    let Some(AuthUser { user_id }) = request.extensions().get::<AuthUser>().copied() else {
        return Error::from(TOKEN_NOT_FOUND).into_response();
    };

    if let Err(err) = gate.users.check_user_any_role(user_id, gate.roles).await {
        tracing::debug!(%user_id, err = %err, "role check failed");
        return err.into_response();
    }

    next.run(request).await
}
