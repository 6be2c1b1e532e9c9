//! Admin bearer tokens.
//!
//! The host platform signs admin sessions as HS256 JWTs with a secret it
//! shares with this server. Only the user id and role matter here;
//! [`issue_token`] exists for tooling and tests.

use addonlog_core::roles::ROLE_ADMIN;
use addonlog_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// The user's database id.
    pub sub: DbId,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret shared with the host platform.
    pub secret: String,
    /// Lifetime of tokens from [`issue_token`], in minutes.
    pub token_ttl_mins: i64,
}

const DEFAULT_TOKEN_TTL_MINS: i64 = 15;

impl JwtConfig {
    /// | Env Var          | Required | Default |
    /// |------------------|----------|---------|
    /// | `JWT_SECRET`     | **yes**  | --      |
    /// | `JWT_TTL_MINS`   | no       | `15`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is unset or empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let token_ttl_mins = std::env::var("JWT_TTL_MINS")
            .map(|v| v.parse().expect("JWT_TTL_MINS must be a valid i64"))
            .unwrap_or(DEFAULT_TOKEN_TTL_MINS);

        Self {
            secret,
            token_ttl_mins,
        }
    }
}

/// Sign a token for `user_id` acting with `role`.
pub fn issue_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        sub: user_id,
        role: role.to_string(),
        exp: iat + config.token_ttl_mins * 60,
        iat,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check the signature and expiry of `token` and return its claims.
///
/// Only HS256 is accepted. `exp` is required, and a token without a numeric
/// `sub` does not decode.
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}
