//! One-shot messages shown on the next page view.
//!
//! Messages are stored as base64-encoded JSON in a cookie, appended to by
//! form handlers before a redirect and consumed by the next page render.

use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

/// Cookie carrying pending flash messages.
pub const FLASH_COOKIE: &str = "cinelog_flash";

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    /// Build a message.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

fn decode(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

fn encode(messages: &[FlashMessage]) -> String {
    // Serializing a Vec of plain structs cannot fail
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(messages).unwrap_or_default())
}

/// Queue a message for the next page view.
#[must_use]
pub fn push(jar: CookieJar, level: Level, message: impl Into<String>) -> CookieJar {
    let mut messages = jar
        .get(FLASH_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default();
    messages.push(FlashMessage::new(level, message));

    jar.add(
        Cookie::build((FLASH_COOKIE, encode(&messages)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    )
}

/// Take every pending message, clearing the cookie.
#[must_use]
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, Vec::new());
    };
    let messages = decode(cookie.value());
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/"));
    (jar, messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_then_take() {
        let jar = push(CookieJar::new(), Level::Error, "You must log in to comment.");
        let jar = push(jar, Level::Info, "second");

        let (_, messages) = take(jar);

        assert_eq!(
            messages,
            vec![
                FlashMessage::new(Level::Error, "You must log in to comment."),
                FlashMessage::new(Level::Info, "second"),
            ]
        );
    }

    #[test]
    fn test_take_clears_cookie() {
        let jar = push(CookieJar::new(), Level::Success, "saved");

        let (jar, _) = take(jar);

        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn test_garbage_cookie_yields_nothing() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "%%%not-base64"));

        let (_, messages) = take(jar);

        assert!(messages.is_empty());
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&FlashMessage::new(Level::Success, "ok")).unwrap_or_default();
        assert_eq!(json, r#"{"level":"success","message":"ok"}"#);
    }
}
