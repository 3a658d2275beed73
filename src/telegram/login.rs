//! Telegram Login Widget verification.
//!
//! The widget signs every field it returns with
//! `HMAC-SHA256(key = SHA256(bot_token), msg = data_check_string)` and sends
//! the hex digest as `hash`. See <https://core.telegram.org/widgets/login#checking-authorization>.

use std::collections::BTreeMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::BotToken;
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Login data older than this is rejected even with a valid hash.
pub const AUTH_MAX_AGE_SECS: i64 = 86_400;

const HASH_FIELD: &str = "hash";

/// Fields posted by the login widget, values rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginPayload {
    fields: BTreeMap<String, String>,
}

impl LoginPayload {
    /// Accepts strings, numbers and booleans. Numbers are spelled the way the
    /// widget's JavaScript spells them, so `"id": 42` and `"id": 42.0` both sign
    /// as `id=42`.
    pub fn from_json(map: Map<String, Value>) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => render_number(&n),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(Error::BadRequest(format!(
                        "auth_data field '{}' must be a scalar",
                        key
                    )))
                }
            };
            fields.insert(key, text);
        }
        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Every field but `hash` as `key=value`, sorted byte-wise and joined by `\n`.
    ///
    /// The sort is over the rendered lines, not the keys: `a1=x` sorts before `a=y`.
    pub fn data_check_string(&self) -> String {
        let mut lines: Vec<String> = self
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != HASH_FIELD)
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        lines.sort_unstable();
        lines.join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LoginPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The user as re-exposed after a successful check. Never carries the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: i64,
}

pub struct LoginVerifier {
    /// SHA-256 of the bot token; `None` when no token is configured.
    secret_key: Option<Vec<u8>>,
}

impl LoginVerifier {
    pub fn new(token: Option<&BotToken>) -> Self {
        let secret_key = token.map(|t| Sha256::digest(t.as_str().as_bytes()).to_vec());
        Self { secret_key }
    }

    pub fn verify(&self, payload: &LoginPayload) -> Result<VerifiedIdentity> {
        self.verify_at(payload, Utc::now().timestamp())
    }

    /// `verify` against an explicit clock, in unix seconds.
    pub fn verify_at(&self, payload: &LoginPayload, now: i64) -> Result<VerifiedIdentity> {
        let key = self
            .secret_key
            .as_deref()
            .ok_or_else(|| Error::Config("telegram bot token is not set".to_string()))?;

        let hash = payload.get(HASH_FIELD).ok_or_else(|| reject("hash missing"))?;
        if !is_lower_hex(hash) {
            return Err(reject("hash is not lowercase hex"));
        }
        let expected = hex::decode(hash).map_err(|_| reject("hash is not lowercase hex"))?;

        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|_| Error::Config("invalid login secret key".to_string()))?;
        mac.update(payload.data_check_string().as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| reject("hash mismatch"))?;

        let auth_date: i64 = payload
            .get("auth_date")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| reject("auth_date missing or not an integer"))?;
        if now.saturating_sub(auth_date) > AUTH_MAX_AGE_SECS {
            return Err(reject("auth_date too old"));
        }

        let identity = VerifiedIdentity {
            id: payload.get("id").map(str::to_string),
            username: payload.get("username").map(str::to_string),
            first_name: payload.get("first_name").map(str::to_string),
            last_name: payload.get("last_name").map(str::to_string),
            photo_url: payload.get("photo_url").map(str::to_string),
            auth_date,
        };

        info!(
            "Telegram login verified for user {}",
            identity.id.as_deref().unwrap_or("<no id>")
        );
        Ok(identity)
    }
}

/// Integral floats drop the fraction (`1.0` → `1`), as JavaScript's
/// `String(1.0)` does.
fn render_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

fn reject(reason: &str) -> Error {
    warn!("Telegram login rejected: {}", reason);
    Error::Auth(reason.to_string())
}

fn is_lower_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
