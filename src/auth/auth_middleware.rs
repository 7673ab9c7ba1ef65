// Axum authorization middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use std::sync::Arc;

use crate::api::responses::ApiError;
use crate::auth::audit_logger::{AuditContext, AuditLogger, AuthEvent};
use crate::auth::engine::{AuthOutcome, AuthorizationEngine};
use crate::core::errors::GachaError;

/// Per-route authorization state: the engine plus the scopes the route needs
#[derive(Clone)]
pub struct ScopeGuard {
    pub engine: Arc<AuthorizationEngine>,
    pub required_scopes: Arc<[String]>,
    pub audit_logger: Arc<AuditLogger>,
}

impl ScopeGuard {
    pub fn new(engine: Arc<AuthorizationEngine>, required_scopes: &[&str]) -> Self {
        Self {
            engine,
            required_scopes: required_scopes.iter().map(|s| s.to_string()).collect(),
            audit_logger: Arc::new(AuditLogger::new()),
        }
    }
}

/// Protect `route` so its handler only runs for tokens granting `required_scopes`.
///
/// The authorized [`Principal`](crate::core::models::Principal) is available to
/// the handler as an `Extension`.
pub fn require_scopes<S>(
    route: MethodRouter<S>,
    engine: Arc<AuthorizationEngine>,
    required_scopes: &[&str],
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let guard = ScopeGuard::new(engine, required_scopes);
    route.route_layer(middleware::from_fn_with_state(guard, auth_middleware))
}

/// Authorization middleware function
///
/// Extracts the bearer token, runs the authorization engine and maps the result:
/// hard token failures become 401, missing scopes become 403.
pub async fn auth_middleware(
    State(guard): State<ScopeGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip_address = extract_ip_address(&request);
    let user_agent = extract_user_agent(&request);
    let mut context = AuditContext {
        principal: None,
        required_scopes: &guard.required_scopes[..],
        ip_address: ip_address.as_deref(),
        user_agent: user_agent.as_deref(),
    };

    let Some(token) = extract_bearer_token(request.headers()) else {
        guard.audit_logger.log_auth_event(
            &AuthEvent::AuthFailure {
                error_type: GachaError::MissingCredentials.error_type(),
                reason: "Missing bearer token".to_string(),
            },
            &context,
        );
        return Err(GachaError::MissingCredentials.into());
    };

    let outcome = match guard
        .engine
        .authorize_user_for_operation(&token, &guard.required_scopes[..])
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            guard.audit_logger.log_auth_event(
                &AuthEvent::AuthFailure {
                    error_type: e.error_type(),
                    reason: e.to_string(),
                },
                &context,
            );
            return Err(GachaError::from(e).into());
        }
    };

    match outcome {
        AuthOutcome::Granted(principal) => {
            context.principal = Some(&principal.id);
            guard.audit_logger.log_auth_event(&AuthEvent::AuthSuccess, &context);
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        AuthOutcome::Denied {
            principal,
            missing_scopes,
        } => {
            context.principal = Some(&principal.id);
            guard
                .audit_logger
                .log_auth_event(&AuthEvent::AuthDenied { missing_scopes }, &context);
            Err(GachaError::Unauthorized {
                username: principal.id.clone(),
                scopes: guard.required_scopes.to_vec(),
            }
            .into())
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Extract IP address from request headers
///
/// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
fn extract_ip_address(request: &Request) -> Option<String> {
    request
        .headers()
        .get("X-Forwarded-For")
        .or_else(|| request.headers().get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn extract_user_agent(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
