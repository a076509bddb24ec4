//! Bearer-token resolution at the HTTP edge.
//!
//! Session issuance lives outside this crate. Handlers only need a way to turn the presented
//! token into a stored [`User`], which is what [`SessionResolver`] describes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};

use super::domain::{User, UserId};
use crate::error::LifecycleError;
use crate::store::{RepositoryError, UserRepository};

/// Resolves a bearer token to the acting user, `None` when the token is unknown.
pub trait SessionResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Option<User>, RepositoryError>;
}

/// Request extension type the [`Actor`] extractor looks up.
pub type SharedSessions = Arc<dyn SessionResolver>;

/// Token table backed by a user repository.
pub struct StaticSessions<U> {
    users: Arc<U>,
    tokens: RwLock<HashMap<String, UserId>>,
}

impl<U: UserRepository> StaticSessions<U> {
    pub fn new(users: Arc<U>) -> Self {
        Self {
            users,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn grant(&self, token: impl Into<String>, user: UserId) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        tokens.insert(token.into(), user);
        Ok(())
    }
}

impl<U: UserRepository> SessionResolver for StaticSessions<U> {
    fn resolve(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let user_id = {
            let tokens = self
                .tokens
                .read()
                .map_err(|_| poisoned())?;
            tokens.get(token).cloned()
        };

        match user_id {
            Some(id) => self.users.fetch_user(&id),
            None => Ok(None),
        }
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("session table poisoned".to_string())
}

/// Authenticated user making the request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = LifecycleError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let sessions = parts
            .extensions
            .get::<SharedSessions>()
            .cloned()
            .ok_or_else(|| LifecycleError::Internal("session resolver not installed".to_string()))?;

        let token = bearer_token(&parts.headers).ok_or(LifecycleError::Unauthenticated)?;

        match sessions.resolve(token)? {
            Some(user) => Ok(Actor(user)),
            None => Err(LifecycleError::Unauthenticated),
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(value).expect("valid header"),
        );
        headers
    }

    #[test]
    fn bearer_token_accepts_any_scheme_case() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer  abc123 ")), Some("abc123"));
    }

    #[test]
    fn grant_reports_a_poisoned_table() {
        use crate::access::{NewUser, Role};
        use crate::store::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Avery".to_string(),
                email: "avery@example.com".to_string(),
                phone: None,
                role: Role::Agent,
                password_hash: None,
                must_change_password: false,
            })
            .expect("user inserted");
        let sessions = StaticSessions::new(store);
        sessions
            .grant("before", user.id.clone())
            .expect("grant on a healthy table");
        assert_eq!(
            sessions.resolve("before").expect("resolve").map(|found| found.id),
            Some(user.id.clone())
        );

        let crashed = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = sessions.tokens.write();
                    panic!("writer crashed");
                })
                .join()
        });
        assert!(crashed.is_err());

        assert!(matches!(
            sessions.grant("after", user.id),
            Err(RepositoryError::Unavailable(_))
        ));
        assert!(matches!(
            sessions.resolve("before"),
            Err(RepositoryError::Unavailable(_))
        ));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blanks() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
