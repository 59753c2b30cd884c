use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        extractors::AuthUser,
        password::hash_password,
        services::{check_password, clear_session_cookie, normalize_email},
    },
    cars::{dto::CarListResponse, services::list_owned},
    dto::MessageResponse,
    error::{AppError, AppJson, AppPath, AppResult, ErrorResponse},
    state::AppState,
    users::{
        dto::{UpdateUserRequest, UserResponse},
        repo_types::UserChanges,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/:id", get(get_user))
        .route("/user/update/:id", post(update_user))
        .route("/user/delete/:id", delete(delete_user))
        .route("/user/listings/:id", get(user_listings))
}

/// Account routes only act on the caller's own id.
fn ensure_self(caller: Uuid, target: Uuid) -> AppResult<()> {
    if caller != target {
        warn!(user_id = %caller, target = %target, "account access to another user rejected");
        return Err(AppError::NotFoundOrUnauthorized("User"));
    }
    Ok(())
}

fn non_blank(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(AppError::Validation(format!("{field} must not be empty"))),
        Some(v) => Ok(Some(v.trim().to_string())),
        None => Ok(None),
    }
}

#[utoipa::path(
    get,
    path = "/api/user/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile", body = UserResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}

#[utoipa::path(
    post,
    path = "/api/user/update/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "Caller's own user id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid field", body = ErrorResponse),
        (status = 404, description = "User not found or unauthorized", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    ensure_self(caller, id)?;

    let password_hash = match payload.password.as_deref() {
        Some(p) => {
            check_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };
    let changes = UserChanges {
        username: non_blank("Username", payload.username)?,
        email: payload.email.as_deref().map(normalize_email).transpose()?,
        password_hash,
        avatar: non_blank("Avatar", payload.avatar)?,
    };

    let user = state
        .users
        .update(id, changes)
        .await?
        .ok_or(AppError::NotFoundOrUnauthorized("User"))?;

    info!(user_id = %id, "user updated");
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(user),
    }))
}

/// Deletes the caller's account. Their listings are left in place.
#[utoipa::path(
    delete,
    path = "/api/user/delete/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "Caller's own user id")),
    responses(
        (status = 200, description = "Account deleted; listings are kept", body = MessageResponse),
        (status = 404, description = "User not found or unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    ensure_self(caller, id)?;
    if !state.users.delete(id).await? {
        return Err(AppError::NotFoundOrUnauthorized("User"));
    }
    info!(user_id = %id, "user deleted");

    let cookie = clear_session_cookie(&state.config.cookie)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::ok("User has been deleted!")),
    ))
}

#[utoipa::path(
    get,
    path = "/api/user/listings/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "Caller's own user id")),
    responses(
        (status = 200, description = "Listings owned by the caller", body = CarListResponse),
        (status = 404, description = "User not found or unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn user_listings(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<CarListResponse>> {
    ensure_self(caller, id)?;
    let cars = list_owned(state.cars.as_ref(), caller).await?;
    Ok(Json(CarListResponse {
        success: true,
        cars,
    }))
}
