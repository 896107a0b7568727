use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::User,
    policy::{Actor, Role},
    repository::RepositoryState,
};

/// Header honoured by the local-only developer bypass.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the identity token. Signed with the server secret (HS256) and
/// validated upon every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a decimal string.
    pub sub: String,
    pub email: String,
    /// Role at issuance. Informational only: the extractor re-reads the stored role.
    pub role: Role,
    /// Expiration time (seconds since the epoch).
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// issue_token
///
/// Signs an identity token for `user` valid for `config.jwt_ttl_secs`.
pub fn issue_token(config: &AppConfig, user: &User) -> AppResult<String> {
    let iat = now_secs();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat,
        exp: iat + config.jwt_ttl_secs as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| AppError::Internal(e.to_string()))
}

/// verify_token
///
/// Checks signature and expiry and returns the claims. Any failure is `Unauthenticated`.
pub fn verify_token(config: &AppConfig, token: &str) -> AppResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            Err(AppError::unauthenticated())
        }
    }
}

/// AuthUser
///
/// Extractor yielding the verified `Actor` of an authenticated request.
/// Rejects with 401 on any failure.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Actor);

/// MaybeAuthUser
///
/// Like `AuthUser` for endpoints that also serve anonymous callers. A request
/// without credentials resolves to `None`; presenting bad credentials still fails.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Actor>);

fn has_credentials(parts: &Parts, config: &AppConfig) -> bool {
    parts.headers.contains_key(header::AUTHORIZATION)
        || (config.env == Env::Local && parts.headers.contains_key(DEV_USER_HEADER))
}

/// resolve_actor
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is accepted.
/// 2. Bearer token extraction and verification.
/// 3. Store lookup, so deleted accounts and role changes take effect immediately.
async fn resolve_actor(parts: &Parts, repo: &RepositoryState, config: &AppConfig) -> AppResult<Actor> {
    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.parse::<i64>().ok());
        if let Some(id) = bypass_id {
            if let Some(user) = repo.get_user(id).await? {
                return Ok(Actor::new(user.id, user.role));
            }
        }
    }

    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(AppError::unauthenticated)?;

    let claims = verify_token(config, token)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::unauthenticated())?;

    let user = repo
        .get_user(user_id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    Ok(Actor::new(user.id, user.role))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        resolve_actor(parts, &repo, &config).await.map(AuthUser)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        if !has_credentials(parts, &config) {
            return Ok(MaybeAuthUser(None));
        }
        resolve_actor(parts, &repo, &config)
            .await
            .map(|actor| MaybeAuthUser(Some(actor)))
    }
}
