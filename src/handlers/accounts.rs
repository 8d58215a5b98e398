use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use super::JsonBody;
use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    email::verification_email,
    error::{AppError, AppResult},
    models::{
        CreateTempAccountRequest, LoginRequest, LoginResponse, NewTempAccount,
        TempAccountCreated, User,
    },
    password::{hash_password, verify_password},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// login
///
/// [Public Route] Exchanges email and password for a session token. Unknown emails and
/// wrong passwords get the same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let credentials = state
        .repo
        .find_user_credentials(&normalize_email(&payload.email))
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let hash = credentials
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
    if !verify_password(&payload.password, hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = issue_token(credentials.id, &state.config)?;
    tracing::info!(user_id = credentials.id, "user logged in");

    Ok(Json(LoginResponse {
        token,
        user: credentials.into_user(),
    }))
}

/// get_me
///
/// [Authenticated Route] Profile of the caller.
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<User>> {
    state
        .repo
        .get_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// create_temp_account
///
/// [Public Route] Starts a registration: stores a pending account with a one-time token and
/// emails the verification link. A previous pending registration for the same email is
/// replaced. If the email cannot be sent the pending account is removed again.
#[utoipa::path(
    post,
    path = "/api/users/temp/create",
    request_body = CreateTempAccountRequest,
    responses(
        (status = 201, description = "Verification email sent", body = TempAccountCreated),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn create_temp_account(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateTempAccountRequest>,
) -> AppResult<(StatusCode, Json<TempAccountCreated>)> {
    let payload = CreateTempAccountRequest {
        email: normalize_email(&payload.email),
        password: payload.password,
    };
    payload.validate()?;

    if state
        .repo
        .find_user_credentials(&payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let account = state
        .repo
        .replace_temp_account(NewTempAccount {
            email: payload.email.clone(),
            password_hash: hash_password(&payload.password)?,
            token: Uuid::new_v4().simple().to_string(),
            expires_at: Utc::now() + Duration::hours(state.config.temp_account_ttl_hours),
        })
        .await?;

    let message = verification_email(
        &account.email,
        &account.token,
        &state.config.app_url,
        &state.config.email.template_dir,
    )
    .await;

    if let Err(e) = state.mailer.send(message).await {
        tracing::error!(email = %account.email, error = %e, "verification email failed");
        if let Err(cleanup) = state.repo.delete_temp_account(account.id).await {
            tracing::error!(error = %cleanup, "failed to remove temp account after email failure");
        }
        return Err(AppError::Internal(
            "Failed to send verification email".to_string(),
        ));
    }

    tracing::info!(email = %account.email, "temp account created");
    Ok((
        StatusCode::CREATED,
        Json(TempAccountCreated {
            message: "Verification email sent. Please check your inbox.".to_string(),
            email: account.email,
        }),
    ))
}

/// Where a verification link lands.
#[derive(Debug, PartialEq)]
enum Verification {
    Verified(String),
    InvalidToken,
    Expired,
    UserExists,
}

impl Verification {
    fn location(&self, app_url: &str) -> String {
        let login = format!("{app_url}/auth/login");
        match self {
            Verification::Verified(email) => reqwest::Url::parse_with_params(
                &login,
                &[("verified", "true"), ("email", email.as_str())],
            )
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{login}?verified=true")),
            Verification::InvalidToken => format!("{login}?error=invalid_token"),
            Verification::Expired => format!("{login}?error=token_expired"),
            Verification::UserExists => format!("{login}?error=user_exists"),
        }
    }
}

async fn verify_token(state: &AppState, token: &str) -> AppResult<Verification> {
    let Some(account) = state.repo.find_temp_account_by_token(token).await? else {
        return Ok(Verification::InvalidToken);
    };

    if account.is_expired(Utc::now()) {
        state.repo.delete_temp_account(account.id).await?;
        return Ok(Verification::Expired);
    }

    if state
        .repo
        .find_user_credentials(&account.email)
        .await?
        .is_some()
    {
        state.repo.delete_temp_account(account.id).await?;
        return Ok(Verification::UserExists);
    }

    match state.repo.promote_temp_account(&account).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "email verified, user created");
            Ok(Verification::Verified(user.email))
        }
        // Lost a race against another verification of the same email.
        Err(AppError::Conflict(_)) => {
            state.repo.delete_temp_account(account.id).await?;
            Ok(Verification::UserExists)
        }
        Err(e) => Err(e),
    }
}

/// verify_temp_account
///
/// [Public Route] Target of the emailed link. Always answers with a redirect to the
/// frontend login page; the query string says what happened.
#[utoipa::path(
    get,
    path = "/api/users/temp/verify/{token}",
    params(("token" = String, Path, description = "Verification token")),
    responses((status = 303, description = "Redirect to the login page"))
)]
pub async fn verify_temp_account(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Redirect {
    match verify_token(&state, &token).await {
        Ok(outcome) => Redirect::to(&outcome.location(&state.config.app_url)),
        Err(e) => {
            tracing::error!(error = %e, "email verification failed");
            Redirect::to(&format!(
                "{}/auth/login?error=verification_failed",
                state.config.app_url
            ))
        }
    }
}
