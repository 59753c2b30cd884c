use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::jwt::JwtKeys;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller. The token comes from `Authorization: Bearer` or,
/// failing that, from the session cookie; only access tokens are accepted.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

fn cookie_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let auth = auth
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers)? {
            Some(t) => t,
            None => cookie_token(&parts.headers, &state.config.cookie.name)
                .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?,
        };

        let keys = JwtKeys::from_ref(state);
        match keys.verify_access(token) {
            Ok(claims) => Ok(AuthUser(claims.sub)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err(AppError::Unauthorized("Invalid or expired token".into()))
            }
        }
    }
}

/// [`AuthUser`] whose account still exists. Access tokens outlive account
/// deletion, so routes that write data take this instead.
#[derive(Debug, Clone, Copy)]
pub struct ActiveUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        if state.users.find_by_id(user_id).await?.is_none() {
            warn!(user_id = %user_id, "token belongs to a deleted account");
            return Err(AppError::Unauthorized("User not found".into()));
        }
        Ok(ActiveUser(user_id))
    }
}
