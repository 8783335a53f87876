// Auth boundary: cookie token extraction and the token verifier trait.
//
// Token issuance and the verification scheme live outside this crate;
// handlers only ever see `TokenVerifier`.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use parlor_shared::UserId;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing auth_token cookie")]
    MissingToken,
    #[error("invalid auth token")]
    InvalidToken,
}

/// Resolves a session token to a user identity.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Development verifier: the token is the user's UUID in plain text.
/// Stands in until the real token service is wired up.
pub struct InsecureUuidVerifier;

#[async_trait]
impl TokenVerifier for InsecureUuidVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        Uuid::parse_str(token)
            .map(UserId)
            .map_err(|_| AuthError::InvalidToken)
    }
}

/// Returns the value stored under `key` in a `Cookie` header, if present.
pub fn extract_cookie_token<'a>(cookie: &'a str, key: &str) -> Option<&'a str> {
    cookie.split(';').find_map(|segment| {
        let (name, value) = segment.trim().split_once('=')?;
        if name == key {
            Some(value)
        } else {
            None
        }
    })
}
