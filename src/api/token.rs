// Per-request bearer credentials: short-lived HS256 JWTs minted from the local identity

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_TTL_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token secret is empty")]
    EmptySecret,

    #[error("invalid signing key")]
    InvalidKey,

    #[error("failed to encode claims: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Claims<'a> {
    user_id: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenMinter {
    secret: Vec<u8>,
}

impl TokenMinter {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        TokenMinter { secret: secret.into() }
    }

    pub fn mint(&self, user_id: &str) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        let now = Utc::now().timestamp();
        let header = serde_json::to_vec(&Header { alg: "HS256", typ: "JWT" })?;
        let claims = serde_json::to_vec(&Claims {
            user_id,
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        })?;

        let signing_input = format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(claims));
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }
}

impl std::fmt::Debug for TokenMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMinter").field("secret", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_token_verifies_and_carries_user() {
        let minter = TokenMinter::new("s3cret");
        let token = minter.mint("user-42").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let mut mac = HmacSha256::new_from_slice(b"s3cret").unwrap();
        mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());
        let signature = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        assert!(mac.verify_slice(&signature).is_ok());

        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["userId"], "user-42");
        assert_eq!(claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(), TOKEN_TTL_SECS);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert!(matches!(TokenMinter::new("").mint("u"), Err(TokenError::EmptySecret)));
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let rendered = format!("{:?}", TokenMinter::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
