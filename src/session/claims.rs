//! Local, unverified reading of bearer-token claims.
//!
//! Values decoded here are hints for populating request bodies and display.
//! The server verifies identity from the token itself; nothing in this crate
//! grants or denies access based on them.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::api_types::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenHints {
    pub user_id: Option<ObjectId>,
    pub is_admin: Option<bool>,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClaims {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    is_admin: Option<bool>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode the payload segment of a JWT-shaped token without verifying it.
/// Returns `None` when the token is opaque or unreadable.
pub fn decode_hints(token: &str) -> Option<TokenHints> {
    let mut segments = token.split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let raw: RawClaims = serde_json::from_slice(&bytes).ok()?;

    Some(TokenHints {
        user_id: raw.id.or(raw.sub).map(ObjectId::new),
        is_admin: raw.is_admin,
        expires_at: raw
            .exp
            .and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok()),
    })
}

#[cfg(test)]
pub(crate) fn fake_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}
