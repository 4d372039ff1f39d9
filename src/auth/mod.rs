use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
const DASHBOARD_PATH: &str = "/dashboard";

/// Decision for one request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

/// Paths the gate never looks at: api routes, static assets and images.
pub fn is_exempt(path: &str) -> bool {
    path.starts_with("/api") || path.starts_with("/static") || path.ends_with(".png")
}

/// Dashboard pages need a session. A signed-in user anywhere else is sent to
/// the dashboard.
pub fn authorize(path: &str, signed_in: bool) -> Access {
    if is_exempt(path) {
        return Access::Allow;
    }

    let on_dashboard = path.starts_with(DASHBOARD_PATH);
    if on_dashboard {
        if signed_in {
            Access::Allow
        } else {
            Access::Redirect(LOGIN_PATH)
        }
    } else if signed_in {
        Access::Redirect(DASHBOARD_PATH)
    } else {
        Access::Allow
    }
}

/// Checks requests against a shared session token.
#[derive(Clone)]
pub struct AccessGate {
    token: Arc<str>,
}

impl AccessGate {
    pub fn new(token: &str) -> Self {
        Self { token: Arc::from(token) }
    }

    /// A request is signed in if it carries the token as a bearer credential or
    /// as the `session` cookie.
    pub fn is_signed_in(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if bearer == Some(&*self.token) {
            return true;
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == "session" && value == &*self.token)
    }
}

pub async fn require_session(State(gate): State<AccessGate>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let signed_in = gate.is_signed_in(request.headers());

    match authorize(&path, signed_in) {
        Access::Allow => next.run(request).await,
        Access::Redirect(to) => {
            debug!(path = %path, to, "access gate redirect");
            Redirect::to(to).into_response()
        }
    }
}
