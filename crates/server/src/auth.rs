//! Authentication extractors: session cookie for the HTML UI, HTTP Basic
//! for the JSON API.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE, WWW_AUTHENTICATE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use croco_store::User;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "croco_session";

/// Rejection for the HTML surface: unauthenticated requests bounce to the
/// login page, authenticated non-admins get a 403.
pub enum AuthError {
    LoginRedirect,
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::LoginRedirect => Redirect::to("/login").into_response(),
            AuthError::Forbidden => {
                (StatusCode::FORBIDDEN, "Admin access required.").into_response()
            }
        }
    }
}

/// Rejection for the JSON API: 401 with a Basic challenge.
pub struct BasicAuthError;

impl IntoResponse for BasicAuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, "Basic")],
            "Invalid credentials.",
        )
            .into_response()
    }
}

/// The account behind the request's session cookie.
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            cookie_value(&parts.headers, SESSION_COOKIE).ok_or(AuthError::LoginRedirect)?;
        let store = state.store.clone();
        let user = tokio::task::spawn_blocking(move || store.get_user_by_session(&token))
            .await
            .map_err(|_| AuthError::LoginRedirect)?
            .ok()
            .flatten()
            .ok_or(AuthError::LoginRedirect)?;
        Ok(SessionUser(user))
    }
}

/// Session-authenticated account with the admin flag set.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionUser(user) = SessionUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

/// The account behind the request's Basic credentials.
pub struct BasicUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for BasicUser {
    type Rejection = BasicAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) =
            parse_basic_auth(&parts.headers).ok_or(BasicAuthError)?;

        // Credential verification re-derives the PBKDF2 hash; keep it off
        // the async workers.
        let store = state.store.clone();
        let user = tokio::task::spawn_blocking(move || {
            store.verify_credentials(&username, &password)
        })
        .await
        .map_err(|_| BasicAuthError)?
        .ok()
        .flatten()
        .ok_or(BasicAuthError)?;

        Ok(BasicUser(user))
    }
}

/// Basic-authenticated account with the admin flag set.
pub struct BasicAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for BasicAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BasicUser(user) = BasicUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if !user.is_admin {
            return Err(
                (StatusCode::FORBIDDEN, "Admin access required.").into_response()
            );
        }
        Ok(BasicAdmin(user))
    }
}

/// Pull one cookie's value out of the Cookie header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Parse `Authorization: Basic <base64(user:pass)>`.
fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = raw.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
