//! Access-token payload decoding.
//!
//! Identity is derived entirely on the client by splitting the JWT and
//! base64-decoding its payload segment. Signatures are never checked; the
//! token came from the server over TLS and is only read back, not trusted
//! for authorization decisions. A token that fails to decode yields no
//! identity at all.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;

/// Claims embedded in a FanZone access token.
///
/// SimpleJWT contributes `user_id`, `exp` and `iat`; the backend adds
/// profile claims. Every field is optional so an unexpected payload still
/// decodes, and unknown claims are retained in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Claims {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Expiry as unix seconds.
    pub exp: Option<i64>,
    /// Issued-at as unix seconds.
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Claims {
    /// Best identifier for the signed-in user: the username claim when
    /// present, the numeric user id otherwise.
    pub fn subject(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.user_id.map(|id| id.to_string()))
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// True once `exp` has passed. A token without an expiry claim never
    /// expires locally.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.exp, Some(exp) if exp <= now)
    }
}

/// Decode the payload segment of a JWT without verifying the signature.
///
/// Accepts only a three-part token whose middle segment is base64url JSON.
/// Anything else returns `None`; this never panics, so callers can treat an
/// undecodable token exactly like a missing one.
pub fn decode(token: &str) -> Option<Claims> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload = general_purpose::URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    serde_json::from_slice(&payload).ok()
}

/// Build a structurally valid token around an arbitrary payload. The
/// signature segment is junk, which the decoder ignores.
#[cfg(test)]
pub(crate) fn encode_unsigned(payload: &Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.unsigned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_profile_claims() {
        let token = encode_unsigned(&json!({
            "user_id": 12,
            "username": "amina",
            "email": "amina@example.com",
            "name": "Amina B",
            "exp": 4_102_444_800i64,
            "jti": "abc123",
            "token_type": "access"
        }));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.user_id, Some(12));
        assert_eq!(claims.username.as_deref(), Some("amina"));
        assert_eq!(claims.email.as_deref(), Some("amina@example.com"));
        assert_eq!(claims.name.as_deref(), Some("Amina B"));
        assert_eq!(claims.extra.get("jti"), Some(&json!("abc123")));
    }

    #[test]
    fn rejects_tokens_without_three_parts() {
        assert!(decode("").is_none());
        assert!(decode("only-one-part").is_none());
        assert!(decode("two.parts").is_none());
        assert!(decode("f.o.u.r").is_none());
    }

    #[test]
    fn rejects_bad_base64_and_bad_json() {
        assert!(decode("aGVhZGVy.!!!not-base64!!!.sig").is_none());

        let not_json = general_purpose::URL_SAFE_NO_PAD.encode(b"plain text");
        assert!(decode(&format!("h.{not_json}.sig")).is_none());
    }

    #[test]
    fn expiry_requires_the_exp_claim() {
        let eternal = decode(&encode_unsigned(&json!({ "username": "sam" }))).unwrap();
        assert!(!eternal.is_expired(i64::MAX));

        let dated = decode(&encode_unsigned(&json!({ "exp": 1000 }))).unwrap();
        assert!(dated.is_expired(1000));
        assert!(dated.is_expired(1001));
        assert!(!dated.is_expired(999));
    }

    #[test]
    fn subject_prefers_username_over_user_id() {
        let both = decode(&encode_unsigned(&json!({ "user_id": 9, "username": "karim" }))).unwrap();
        assert_eq!(both.subject(), "karim");

        let id_only = decode(&encode_unsigned(&json!({ "user_id": 9 }))).unwrap();
        assert_eq!(id_only.subject(), "9");

        assert_eq!(Claims::default().subject(), "unknown");
    }
}
