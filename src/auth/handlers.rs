use axum::{
    extract::{FromRef, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ExternalSigninRequest, PublicUser, RefreshRequest, SigninRequest,
            SignupRequest, SignupResponse,
        },
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        services::{
            check_password, clear_session_cookie, external_username, issue_session,
            normalize_email, random_string,
        },
    },
    dto::MessageResponse,
    error::{AppError, AppJson, AppResult, ErrorResponse},
    state::AppState,
    users::repo_types::{NewUser, DEFAULT_AVATAR_URL},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/signin", post(signin))
        .route("/auth/google", post(external_signin))
        .route("/auth/refresh", post(refresh))
        .route("/auth/signout", get(signout))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Invalid email, username or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let email = normalize_email(&payload.email)?;
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    check_password(&payload.password)?;

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            avatar: DEFAULT_AVATAR_URL.into(),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "signup rejected");
            AppError::from(e)
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "User created successfully".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/signin",
    tag = "auth",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in; the access token is also set as a cookie", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
    )
)]
#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SigninRequest>,
) -> AppResult<impl IntoResponse> {
    let invalid = || AppError::Unauthorized("Invalid credentials".into());
    // a malformed address cannot belong to an account
    let Ok(email) = normalize_email(&payload.email) else {
        warn!("signin with malformed email");
        return Err(invalid());
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "signin unknown email");
        return Err(invalid());
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "signin invalid password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let user_id = user.id;
    let (cookie, body) = issue_session(&keys, &state.config.cookie, user)?;
    info!(user_id = %user_id, "user signed in");
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// Sign-in with an identity vouched for by an external provider; creates
/// the account on first use.
#[utoipa::path(
    post,
    path = "/api/auth/google",
    tag = "auth",
    request_body = ExternalSigninRequest,
    responses(
        (status = 200, description = "Signed in, creating the account on first use", body = AuthResponse),
        (status = 400, description = "External sign-in is disabled", body = ErrorResponse),
    )
)]
#[instrument(skip(state, payload))]
pub async fn external_signin(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ExternalSigninRequest>,
) -> AppResult<impl IntoResponse> {
    if !state.config.external_signin_enabled {
        return Err(AppError::Validation("External sign-in is disabled".into()));
    }
    let email = normalize_email(&payload.email)?;

    let user = match state.users.find_by_email(&email).await? {
        Some(user) => user,
        None => {
            let password_hash = hash_password(&random_string(16))?;
            let avatar = payload
                .photo
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AVATAR_URL.into());
            let user = state
                .users
                .create(NewUser {
                    username: external_username(&payload.name),
                    email,
                    password_hash,
                    avatar,
                })
                .await?;
            info!(user_id = %user.id, "user registered through external sign-in");
            user
        }
    };

    let keys = JwtKeys::from_ref(&state);
    let (cookie, body) = issue_session(&keys, &state.config.cookie, user)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
    )
)]
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<impl IntoResponse> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let (cookie, body): (_, AuthResponse) = issue_session(&keys, &state.config.cookie, user)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

#[utoipa::path(
    get,
    path = "/api/auth/signout",
    tag = "auth",
    responses((status = 200, description = "Session cookie cleared", body = MessageResponse))
)]
#[instrument(skip(state))]
pub async fn signout(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let cookie = clear_session_cookie(&state.config.cookie)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::ok("User has been logged out!")),
    ))
}
