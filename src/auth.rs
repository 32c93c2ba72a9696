use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    config::{AppConfig, Env},
    models::Msg,
    repository::RepositoryState,
    routes::Gate,
    session::{SESSION_COOKIE_NAME, extract_cookie_value},
};

/// Where a browser without a session is sent.
pub const LOGIN_PATH: &str = "/";

/// Claims
///
/// Payload of a session token. Signed with the configured secret and checked
/// on every request that passes through the login gate.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the panel user.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens are rejected after this timestamp.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Signs a session token for `user_id` valid for `config.session_max_age`.
pub fn issue_token(
    user_id: Uuid,
    config: &AppConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + Duration::from_secs(config.session_max_age).as_secs() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// AuthUser
///
/// The resolved identity of a logged-in request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. `Authorization: Bearer <token>`.
/// 3. The `session` cookie.
///
/// The token must verify against the configured secret and its subject must
/// still exist in the repository. Rejection: `401 Unauthorized`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await {
                    return Ok(AuthUser {
                        id: user.id,
                        username: user.username,
                    });
                }
            }
        }

        let token = session_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "Rejected session token");
            StatusCode::UNAUTHORIZED
        })?;

        // A valid token for a deleted account is still rejected.
        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| extract_cookie_value(value, SESSION_COOKIE_NAME))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// True when the request was sent by the panel's own scripts.
pub fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// CheckLogin
///
/// The gate protecting the `/xpanel` scope. A request without a valid session
/// never reaches a handler: scripts get a `401` with a `Msg`, browsers are
/// redirected to the login page. Allowed requests carry the `AuthUser` in
/// their extensions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckLogin;

#[async_trait]
impl Gate<AppState> for CheckLogin {
    async fn check(&self, state: &AppState, parts: &mut Parts) -> Result<(), Response> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => {
                parts.extensions.insert(user);
                Ok(())
            }
            Err(_) if is_ajax(&parts.headers) => Err((
                StatusCode::UNAUTHORIZED,
                Json(Msg::fail("登录时效已过，请重新登录")),
            )
                .into_response()),
            Err(_) => {
                tracing::debug!(uri = %parts.uri, "Redirecting request without session to login");
                Err(Redirect::temporary(LOGIN_PATH).into_response())
            }
        }
    }
}
