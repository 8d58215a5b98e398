use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{Role, User},
    password::hash_password,
    repository::{Repository, RepositoryState},
};

/// Claims
///
/// Payload of the HS256 session token issued by `POST /api/auth/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the `users.id` of the session owner.
    pub sub: i32,
    /// Expiration time (seconds since epoch).
    pub exp: usize,
    /// Issued at (seconds since epoch).
    pub iat: usize,
}

/// issue_token
///
/// Signs a session token for `user_id` that stays valid for `jwt_ttl_hours`.
pub fn issue_token(user_id: i32, config: &AppConfig) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.jwt_ttl_hours)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument;
/// role checks for catalog mutations go through `require_staff`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

impl AuthUser {
    /// Fails with 403 unless the user is an ADMIN or OWNER.
    pub fn require_staff(&self) -> AppResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is
///    accepted as-is.
/// 2. Bearer token extraction and JWT validation (signature and expiry).
/// 3. DB lookup, so tokens of deleted users stop working and role changes apply at once.
///
/// Rejection: 401 on any failure.
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

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i32>().ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(AuthUser {
                        id: user.id,
                        role: user.role,
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired session token"),
                kind => tracing::debug!(?kind, "rejected session token"),
            }
            unauthorized()
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or_else(unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}

/// bootstrap_owner
///
/// Ensures the OWNER account from `OWNER_EMAIL` / `OWNER_PASSWORD` exists. Registration
/// only ever creates USER accounts, so this is the way into the staff routes. Re-running
/// it resets the password to the configured one.
pub async fn bootstrap_owner(repo: &dyn Repository, config: &AppConfig) -> AppResult<Option<User>> {
    let Some(owner) = &config.owner else {
        return Ok(None);
    };

    let email = owner.email.trim().to_lowercase();
    let password_hash = hash_password(&owner.password)?;
    let user = repo.upsert_owner(&email, &password_hash).await?;

    tracing::info!(user_id = user.id, email = %user.email, "owner account ensured");
    Ok(Some(user))
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Unauthorized".to_string())
}
