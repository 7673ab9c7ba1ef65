// Domain error types - token failures are diagnostic, infrastructure failures are not

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Hard authentication failures raised while validating a bearer token.
///
/// Every variant maps to HTTP 401. Scope insufficiency is deliberately absent:
/// it is a negative outcome, not an error (see `auth::engine::AuthOutcome`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is not three base64url segments carrying JSON
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Issuer claim absent or not allow-listed
    #[error("Invalid issuer claim")]
    InvalidIssuer,

    /// Remote key set could not be fetched or decoded
    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    /// No key in the issuer's key set matches the token's `kid`
    #[error("No key found for key id '{0}'")]
    KeyNotFound(String),

    /// Signature, expiry, audience or issuer rejected during verification
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Any other failure while parsing the token for verification
    #[error("Token parse error: {0}")]
    TokenParse(String),

    #[error("No username found on token")]
    MissingPrincipalClaim,

    #[error("No tenant found on token")]
    MissingTenantClaim,

    #[error("Invalid tenant found on token")]
    TenantMismatch,

    #[error("Missing scope claim")]
    MissingScopeClaim,
}

impl AuthError {
    /// Machine-readable error code surfaced in `extras.code`
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_)
            | AuthError::KeyNotFound(_)
            | AuthError::TokenParse(_) => "invalid_header",
            AuthError::KeySetUnavailable(_) => "jwks_unavailable",
            AuthError::SignatureInvalid(_) => "jwt_error",
            AuthError::InvalidIssuer
            | AuthError::MissingPrincipalClaim
            | AuthError::MissingTenantClaim
            | AuthError::TenantMismatch
            | AuthError::MissingScopeClaim => "invalid_claims",
        }
    }

    /// Human-readable description surfaced in `extras.description`
    ///
    /// Key-set failures return a generic text so network details never reach clients.
    pub fn description(&self) -> String {
        match self {
            AuthError::MalformedToken(_) => "Unable to decode authentication token.".to_string(),
            AuthError::InvalidIssuer => "Invalid issuer claim".to_string(),
            AuthError::KeySetUnavailable(_) => "Unable to retrieve signing keys".to_string(),
            AuthError::KeyNotFound(_) => "Unable to find appropriate key".to_string(),
            AuthError::SignatureInvalid(reason) => reason.clone(),
            AuthError::TokenParse(_) => "Unable to parse authentication token.".to_string(),
            AuthError::MissingPrincipalClaim => "No username found on token".to_string(),
            AuthError::MissingTenantClaim => "No tenant found on token".to_string(),
            AuthError::TenantMismatch => "Invalid tenant found on token".to_string(),
            AuthError::MissingScopeClaim => "Missing scope claim".to_string(),
        }
    }

    /// Taxonomy name used as the `tags.type` value
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::MalformedToken(_) => "TokenStructureError",
            AuthError::InvalidIssuer => "InvalidIssuerError",
            AuthError::KeySetUnavailable(_) => "KeySetUnavailableError",
            AuthError::KeyNotFound(_) => "KeyNotFoundError",
            AuthError::SignatureInvalid(_) => "SignatureInvalidError",
            AuthError::TokenParse(_) => "TokenParseError",
            AuthError::MissingPrincipalClaim => "MissingPrincipalClaimError",
            AuthError::MissingTenantClaim => "MissingTenantClaimError",
            AuthError::TenantMismatch => "TenantMismatchError",
            AuthError::MissingScopeClaim => "MissingScopeClaimError",
        }
    }

    pub fn status_code(&self) -> u16 {
        401
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum GachaError {
    /// Token validation failure (HTTP 401)
    #[error(transparent)]
    Token(#[from] AuthError),

    /// No bearer credentials on the request (HTTP 401)
    #[error("Missing bearer credentials")]
    MissingCredentials,

    /// Valid token lacking the operation's scopes (HTTP 403)
    #[error("Unauthorized operation for {username}")]
    Unauthorized { username: String, scopes: Vec<String> },

    /// Resource lookup miss (HTTP 404)
    #[error("{resource_type} {id} not found")]
    NotFound { resource_type: String, id: String },

    /// Required request values missing (HTTP 400)
    #[error("Required value(s) {0:?} missing")]
    RequiredValue(Vec<String>),

    /// Request value present but unusable (HTTP 400)
    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Duplicate resource or exhausted draw pool (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl GachaError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GachaError::Token(err) => err.status_code(),
            GachaError::MissingCredentials => 401,
            GachaError::Unauthorized { .. } => 403,
            GachaError::NotFound { .. } => 404,
            GachaError::RequiredValue(_) => 400,
            GachaError::InvalidValue { .. } => 400,
            GachaError::Conflict(_) => 409,
            GachaError::ConfigurationError(_) => 500,
        }
    }

    /// Get user-facing message (no infrastructure details)
    pub fn user_message(&self) -> String {
        match self {
            GachaError::Token(err) => format!("{}: {}", err.code(), err.description()),
            GachaError::MissingCredentials => "Not authenticated".to_string(),
            GachaError::Unauthorized { .. } => "Unauthorized Operation".to_string(),
            GachaError::NotFound { resource_type, id } => format!(
                "Type {} with an id value of {} could not be found.",
                title_case(resource_type),
                id
            ),
            GachaError::RequiredValue(values) => format!("Required value(s) {:?} missing", values),
            GachaError::InvalidValue { reason, .. } => reason.clone(),
            GachaError::Conflict(reason) => reason.clone(),
            GachaError::ConfigurationError(_) => "Internal error".to_string(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            GachaError::Token(err) => err.error_type(),
            GachaError::MissingCredentials => "MissingCredentialsError",
            GachaError::Unauthorized { .. } => "InsufficientScopeError",
            GachaError::NotFound { .. } => "NotFoundError",
            GachaError::RequiredValue(_) => "RequiredValueError",
            GachaError::InvalidValue { .. } => "InvalidValueError",
            GachaError::Conflict(_) => "ConflictError",
            GachaError::ConfigurationError(_) => "ConfigurationError",
        }
    }

    /// Structured context attached to the error body
    pub fn extras(&self) -> Map<String, Value> {
        let value = match self {
            GachaError::Token(err) => json!({
                "code": err.code(),
                "description": err.description(),
            }),
            GachaError::Unauthorized { username, scopes } => json!({
                "username": username,
                "scopes": scopes,
            }),
            GachaError::NotFound { resource_type, id } => json!({
                "type": resource_type,
                "id": id,
            }),
            GachaError::RequiredValue(values) => json!({ "values": values }),
            GachaError::InvalidValue { field, .. } => json!({ "field": field }),
            _ => json!({}),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

fn title_case(value: &str) -> String {
    value
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}
