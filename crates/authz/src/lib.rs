//! Admin authentication: a configured credential exchanged for expiring
//! bearer session tokens, and an axum guard that checks them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use shelf_http::AppError;
use uuid::Uuid;

/// Issued on successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_in: Duration,
}

pub struct AdminAuth {
    password: Option<String>,
    ttl: Duration,
    sessions: Mutex<HashMap<String, Instant>>,
}

impl AdminAuth {
    /// `password: None` disables admin login entirely.
    pub fn new(password: Option<String>, ttl: Duration) -> Self {
        let password = password.filter(|p| !p.is_empty());
        if password.is_none() {
            tracing::warn!(
                target: "shelf-authz",
                "no admin password configured; admin login disabled"
            );
        }
        Self {
            password,
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn login(&self, candidate: &str) -> Result<Session, AppError> {
        let Some(expected) = &self.password else {
            return Err(AppError::Unauthorized {
                message: "admin login is disabled".to_string(),
                code: "admin_disabled".to_string(),
            });
        };

        if !constant_time_eq(expected.as_bytes(), candidate.as_bytes()) {
            tracing::info!(target: "shelf-authz", "admin login rejected");
            return Err(AppError::unauthorized("invalid admin credentials"));
        }

        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions();
        prune(&mut sessions);
        sessions.insert(token.clone(), Instant::now() + self.ttl);
        tracing::info!(target: "shelf-authz", active = sessions.len(), "admin session issued");

        Ok(Session {
            token,
            expires_in: self.ttl,
        })
    }

    pub fn authorize(&self, token: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions();
        match sessions.get(token) {
            Some(expires_at) if *expires_at > Instant::now() => Ok(()),
            Some(_) => {
                sessions.remove(token);
                Err(AppError::unauthorized("admin session expired"))
            }
            None => Err(AppError::unauthorized("invalid admin session")),
        }
    }

    /// Returns whether the token was live.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions().remove(token).is_some()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn prune(sessions: &mut HashMap<String, Instant>) {
    let now = Instant::now();
    sessions.retain(|_, expires_at| *expires_at > now);
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware for `axum::middleware::from_fn_with_state` guarding admin routes.
pub async fn require_session(
    State(auth): State<Arc<AdminAuth>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
    auth.authorize(token)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{HeaderValue, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn auth() -> AdminAuth {
        AdminAuth::new(Some("correct horse".to_string()), Duration::from_secs(60))
    }

    #[test]
    fn login_with_right_password_issues_usable_token() {
        let auth = auth();
        let session = auth.login("correct horse").unwrap();

        assert_eq!(session.expires_in, Duration::from_secs(60));
        assert!(auth.authorize(&session.token).is_ok());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let err = auth().login("correct horsf").unwrap_err();
        assert_eq!(err.code(), "unauthorized");
    }

    #[test]
    fn missing_password_disables_login() {
        let auth = AdminAuth::new(None, Duration::from_secs(60));
        assert!(!auth.is_enabled());
        assert_eq!(auth.login("").unwrap_err().code(), "admin_disabled");

        let blank = AdminAuth::new(Some(String::new()), Duration::from_secs(60));
        assert!(!blank.is_enabled());
    }

    #[test]
    fn expired_sessions_are_refused() {
        let auth = AdminAuth::new(Some("pw".to_string()), Duration::ZERO);
        let session = auth.login("pw").unwrap();
        assert!(auth.authorize(&session.token).is_err());
    }

    #[test]
    fn logout_revokes_token() {
        let auth = auth();
        let session = auth.login("correct horse").unwrap();

        assert!(auth.logout(&session.token));
        assert!(!auth.logout(&session.token));
        assert!(auth.authorize(&session.token).is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[tokio::test]
    async fn guard_blocks_requests_without_a_live_session() {
        let auth = Arc::new(auth());
        let session = auth.login("correct horse").unwrap();
        let app = Router::new()
            .route("/secret", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(Arc::clone(&auth), require_session));

        let anonymous = Request::builder().uri("/secret").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let signed_in = Request::builder()
            .uri("/secret")
            .header(AUTHORIZATION, format!("Bearer {}", session.token))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(signed_in).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
