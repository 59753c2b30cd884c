use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a token authenticates requests or only mints new pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed session claims. `sub` is the user id; `iat`/`exp` are unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        kind: TokenKind,
        issued_at: i64,
        ttl_secs: i64,
        iss: &str,
        aud: &str,
    ) -> Self {
        Self {
            sub: user_id,
            iat: issued_at,
            exp: issued_at + ttl_secs,
            iss: iss.to_string(),
            aud: aud.to_string(),
            kind,
        }
    }
}
