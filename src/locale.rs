use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, header, request::Parts},
};

use crate::models::{CategoryTranslation, ProductTranslation};

pub const DEFAULT_LOCALE: &str = "en";

/// Locale
///
/// The language a request wants content in. Resolution order: `?locale=` query
/// parameter, `locale` cookie, primary subtag of the first `Accept-Language` entry,
/// then `en`. Never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Locale {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(query_locale: Option<&str>, headers: &HeaderMap) -> Self {
        let chosen = query_locale
            .and_then(normalize)
            .or_else(|| cookie_locale(headers))
            .or_else(|| accept_language(headers))
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        Locale(chosen)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LOCALE.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();
        Ok(Locale::resolve(
            query.get("locale").map(String::as_str),
            &parts.headers,
        ))
    }
}

fn normalize(raw: &str) -> Option<String> {
    let primary = raw.trim().split(['-', '_']).next()?.to_ascii_lowercase();
    if primary.is_empty() || primary == "*" || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        None
    } else {
        Some(primary)
    }
}

fn cookie_locale(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "locale")
        .and_then(|(_, value)| normalize(value))
}

fn accept_language(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::ACCEPT_LANGUAGE)?.to_str().ok()?;
    let first = value.split(',').next()?.split(';').next()?;
    normalize(first)
}

/// Anything carrying a locale-scoped translation.
pub trait Localized {
    fn locale(&self) -> &str;
}

impl Localized for ProductTranslation {
    fn locale(&self) -> &str {
        &self.locale
    }
}

impl Localized for CategoryTranslation {
    fn locale(&self) -> &str {
        &self.locale
    }
}

/// pick_translation
///
/// The translation for `locale` if one exists, otherwise the first one.
pub fn pick_translation<'a, T: Localized>(translations: &'a [T], locale: &str) -> Option<&'a T> {
    translations
        .iter()
        .find(|t| t.locale().eq_ignore_ascii_case(locale))
        .or_else(|| translations.first())
}
