use axum::{Json, extract::State};

use super::JsonBody;
use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{TranslateRequest, TranslateResponse},
    translate::translate_many,
};

/// translate_text
///
/// [Staff Route] Machine-translates a product or category text into several languages at
/// once. Languages that fail are omitted from the result.
#[utoipa::path(
    post,
    path = "/api/translate",
    request_body = TranslateRequest,
    responses(
        (status = 200, description = "Translations by language", body = TranslateResponse),
        (status = 400, description = "Empty text or no targets"),
        (status = 502, description = "Every translation failed"),
        (status = 503, description = "Translation API not configured")
    )
)]
pub async fn translate_text(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TranslateRequest>,
) -> AppResult<Json<TranslateResponse>> {
    user.require_staff()?;

    let translator = state
        .translator
        .clone()
        .ok_or_else(|| AppError::Unavailable("DeepL API key not configured".to_string()))?;

    let translations = translate_many(
        translator,
        &payload.text,
        &payload.source_language,
        &payload.target_languages,
    )
    .await?;

    Ok(Json(TranslateResponse { translations }))
}
