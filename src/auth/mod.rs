//! Session lookup for the request layer.
//!
//! Handlers only see an optional user id. Tokens are opaque UUIDs issued for
//! known profiles and kept in the `sessions` tree; any other session provider
//! can replace this by producing the same [`CurrentUser`].
//!
//! Profiles and sessions are written only by the identity system, which
//! proves itself with the configured shared secret ([`IdentitySystem`]).
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::{debug, info, warn};

use crate::{dtos::Session, error::AppError, state::AppState, store::Store};

/// Identity of the caller, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub Option<String>);

impl CurrentUser {
    pub fn id(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn require(self) -> Result<String, AppError> {
        self.0.ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(CurrentUser(None));
        };
        let user_id = session_user(&state.store, token)?;
        if user_id.is_none() {
            debug!("Ignoring unknown session token");
        }
        Ok(CurrentUser(user_id))
    }
}

/// Caller authenticated as the identity system.
#[derive(Debug, Clone, Copy)]
pub struct IdentitySystem;

pub const IDENTITY_SECRET_HEADER: &str = "x-identity-secret";

#[async_trait]
impl FromRequestParts<AppState> for IdentitySystem {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.identity_secret.as_deref() else {
            warn!("Rejecting identity request: no secret configured");
            return Err(AppError::Unauthorized);
        };
        let presented = parts
            .headers
            .get(IDENTITY_SECRET_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if secrets_match(presented, expected) {
            Ok(IdentitySystem)
        } else {
            warn!("Rejecting identity request with a wrong or missing secret");
            Err(AppError::Unauthorized)
        }
    }
}

/// Compares without stopping at the first differing byte.
fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn issue_session(store: &Store, user_id: &str) -> Result<Session, AppError> {
    if !store.user_exists(user_id)? {
        return Err(AppError::NotFound(format!("User {user_id}")));
    }

    let token = uuid::Uuid::new_v4().to_string();
    store.sessions.insert(token.as_bytes(), user_id.as_bytes())?;
    info!("Issued session for user {user_id}");

    Ok(Session {
        token,
        user_id: user_id.to_string(),
    })
}

pub fn revoke_session(store: &Store, token: &str) -> Result<(), AppError> {
    if store.sessions.remove(token.as_bytes())?.is_some() {
        info!("Revoked session");
    }
    Ok(())
}

pub fn session_user(store: &Store, token: &str) -> Result<Option<String>, AppError> {
    store
        .sessions
        .get(token.as_bytes())?
        .map(|user_id| {
            String::from_utf8(user_id.to_vec())
                .map_err(|_| AppError::Corrupt("session user id is not UTF-8".into()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn store_with_user(id: &str) -> Store {
        let store = Store::temporary().unwrap();
        store
            .upsert_user(&User {
                id: id.into(),
                name: None,
                image: None,
            })
            .unwrap();
        store
    }

    fn headers_with(header: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = header {
            headers.insert(AUTHORIZATION, value.parse().unwrap());
        }
        headers
    }

    #[test]
    fn issued_token_resolves_until_revoked() {
        let store = store_with_user("alice");
        let session = issue_session(&store, "alice").unwrap();
        assert_eq!(
            session_user(&store, &session.token).unwrap().as_deref(),
            Some("alice")
        );

        revoke_session(&store, &session.token).unwrap();
        assert_eq!(session_user(&store, &session.token).unwrap(), None);
    }

    #[test]
    fn unknown_user_gets_no_session() {
        let store = Store::temporary().unwrap();
        assert!(matches!(
            issue_session(&store, "ghost"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&headers_with(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&headers_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&headers_with(Some("Bearer  "))), None);
        assert_eq!(bearer_token(&headers_with(None)), None);
    }

    #[test]
    fn secrets_must_match_exactly() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("s3creT", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }

    #[test]
    fn require_without_user_is_unauthorized() {
        assert!(matches!(
            CurrentUser(None).require(),
            Err(AppError::Unauthorized)
        ));
        assert_eq!(CurrentUser(Some("u".into())).require().unwrap(), "u");
    }
}
