// Security event logging

use tracing::{info, warn};

/// Authorization event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthSuccess,
    /// Authenticated, but the token lacked scopes
    AuthDenied { missing_scopes: Vec<String> },
    AuthFailure { error_type: &'static str, reason: String },
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::AuthSuccess => "AUTH_SUCCESS",
            AuthEvent::AuthDenied { .. } => "AUTH_DENIED",
            AuthEvent::AuthFailure { .. } => "AUTH_FAILURE",
        }
    }
}

/// Request context attached to every audit event
#[derive(Debug, Clone, Default)]
pub struct AuditContext<'a> {
    pub principal: Option<&'a str>,
    pub required_scopes: &'a [String],
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// Audit logger for authorization decisions
///
/// Events go to the structured log only. Tokens are never logged.
#[derive(Debug, Clone, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log_auth_event(&self, event: &AuthEvent, context: &AuditContext<'_>) {
        match event {
            AuthEvent::AuthSuccess => {
                info!(
                    event = event.as_str(),
                    principal = ?context.principal,
                    required_scopes = ?context.required_scopes,
                    ip_address = ?context.ip_address,
                    user_agent = ?context.user_agent,
                    "Authorization granted"
                );
            }
            AuthEvent::AuthDenied { missing_scopes } => {
                warn!(
                    event = event.as_str(),
                    principal = ?context.principal,
                    required_scopes = ?context.required_scopes,
                    missing_scopes = ?missing_scopes,
                    ip_address = ?context.ip_address,
                    user_agent = ?context.user_agent,
                    "Authorization denied"
                );
            }
            AuthEvent::AuthFailure { error_type, reason } => {
                warn!(
                    event = event.as_str(),
                    error_type = %error_type,
                    reason = %reason,
                    required_scopes = ?context.required_scopes,
                    ip_address = ?context.ip_address,
                    user_agent = ?context.user_agent,
                    "Authentication failed"
                );
            }
        }
    }
}
