//! Admin session extractors.
//!
//! [`AuthUser`] is whoever the bearer token names. [`RequireAdmin`] also
//! demands the admin role; the router applies it to every `/admin` route and
//! handlers extract it again to learn the acting admin. The session is
//! decoded once per request and kept in the request extensions.
//!
//! Per add-on log permissions are checked on top of this by
//! [`AdminViewer`](crate::permissions::AdminViewer).

use addonlog_core::error::CoreError;
use addonlog_core::types::DbId;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: String,
    is_admin: bool,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}

/// The token of an `Authorization: Bearer <token>` header. The scheme name
/// is matched case-insensitively.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty());

    token.ok_or_else(|| unauthorized("Expected: Authorization: Bearer <token>"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let claims = verify_token(bearer_token(parts)?, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        let user = AuthUser {
            user_id: claims.sub,
            is_admin: claims.is_admin(),
            role: claims.role,
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// A session with the admin role. Anything else is rejected with
/// [`AppError::AdminRequired`].
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::debug!(user_id = user.user_id, role = %user.role, "Admin route refused");
            return Err(AppError::AdminRequired);
        }
        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/admin/addon-logs");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap(), "abc");
        assert_eq!(bearer_token(&parts(Some("bearer  abc "))).unwrap(), "abc");
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_unauthorized() {
        for value in [None, Some("Basic abc"), Some("Bearer"), Some("Bearer   ")] {
            let err = bearer_token(&parts(value)).unwrap_err();
            assert!(matches!(err, AppError::Core(CoreError::Unauthorized(_))), "{value:?}");
        }
    }
}
