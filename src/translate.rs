use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::error::{AppError, AppResult};

/// Translator
///
/// Machine translation of a single text into one target language.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> AppResult<String>;
}

/// `None` when no translation API key is configured.
pub type TranslatorState = Option<Arc<dyn Translator>>;

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// DeepLTranslator
///
/// Form-encoded POST against the DeepL v2 `translate` endpoint.
pub struct DeepLTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl DeepLTranslator {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Translator for DeepLTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> AppResult<String> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&[
                ("text", text),
                ("source_lang", source),
                ("target_lang", target),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("DeepL unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "DeepL API error for {target}: {status} - {body}"
            )));
        }

        let parsed: DeepLResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("DeepL returned malformed JSON: {e}")))?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| AppError::Upstream(format!("No translation returned for {target}")))
    }
}

/// translate_many
///
/// Translates `text` into every target concurrently. Targets that fail are logged and
/// left out of the result; if none succeed the whole call fails.
pub async fn translate_many(
    translator: Arc<dyn Translator>,
    text: &str,
    source: &str,
    targets: &[String],
) -> AppResult<BTreeMap<String, String>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(
            "Text to translate cannot be empty".to_string(),
        ));
    }
    if targets.is_empty() {
        return Err(AppError::Validation(
            "At least one target language is required".to_string(),
        ));
    }

    let mut tasks = JoinSet::new();
    for target in targets {
        let translator = Arc::clone(&translator);
        let (text, source, target) = (text.to_string(), source.to_string(), target.clone());
        tasks.spawn(async move {
            let result = translator.translate(&text, &source, &target).await;
            (target, result)
        });
    }

    let mut translations = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((target, Ok(translated))) => {
                translations.insert(target, translated);
            }
            Ok((target, Err(e))) => {
                tracing::warn!(target_lang = %target, error = %e, "translation failed");
            }
            Err(e) => tracing::error!(error = %e, "translation task panicked"),
        }
    }

    if translations.is_empty() {
        return Err(AppError::Upstream(
            "All translations failed. Please check your API key and try again.".to_string(),
        ));
    }
    Ok(translations)
}

/// MockTranslator
///
/// Deterministic translator for tests: prefixes the text with the target language and
/// fails for the languages listed in `failing`.
#[derive(Clone, Default)]
pub struct MockTranslator {
    pub failing: Vec<String>,
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> AppResult<String> {
        if self.failing.iter().any(|f| f == target) {
            return Err(AppError::Upstream(format!("mock failure for {target}")));
        }
        Ok(format!("[{target}] {text}"))
    }
}
