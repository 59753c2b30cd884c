use axum::http::HeaderValue;
use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;

use crate::auth::dto::{AuthResponse, PublicUser};
use crate::auth::jwt::JwtKeys;
use crate::config::CookieConfig;
use crate::error::{AppError, AppResult};
use crate::users::repo_types::User;

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases, then validates.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("Password too short".into()));
    }
    Ok(())
}

pub(crate) fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Username for an account created through external sign-in:
/// the display name without whitespace, lower-cased, plus four random characters.
pub(crate) fn external_username(name: &str) -> String {
    let mut base: String = name.split_whitespace().collect::<String>().to_lowercase();
    if base.is_empty() {
        base.push_str("user");
    }
    base.push_str(&random_string(4).to_lowercase());
    base
}

fn cookie_value(raw: String) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&raw)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid cookie header: {e}")))
}

pub fn session_cookie(cfg: &CookieConfig, token: &str, max_age_secs: u64) -> AppResult<HeaderValue> {
    let secure = if cfg.secure { "; Secure" } else { "" };
    cookie_value(format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        cfg.name, token, max_age_secs, secure
    ))
}

pub fn clear_session_cookie(cfg: &CookieConfig) -> AppResult<HeaderValue> {
    session_cookie(cfg, "", 0)
}

/// Signs an access/refresh pair for `user` and builds the matching cookie.
pub fn issue_session(
    keys: &JwtKeys,
    cookie: &CookieConfig,
    user: User,
) -> AppResult<(HeaderValue, AuthResponse)> {
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    let header = session_cookie(cookie, &access_token, keys.access_ttl.as_secs())?;
    Ok((
        header,
        AuthResponse {
            success: true,
            user: PublicUser::from(user),
            access_token,
            refresh_token,
        },
    ))
}
