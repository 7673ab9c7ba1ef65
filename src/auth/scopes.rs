// Operation scopes and scope enforcement

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::auth::claims::ClaimSet;
use crate::core::errors::AuthError;

/// Space-delimited scope claim
pub const SCOPE_CLAIM: &str = "scope";
/// Optional list-of-strings permissions claim
pub const PERMISSIONS_CLAIM: &str = "permissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrudOperation {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudOperation::Create => "create",
            CrudOperation::Read => "read",
            CrudOperation::Update => "update",
            CrudOperation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Image,
    UserImage,
    UserAlias,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::UserImage => "user_image",
            ResourceType::UserAlias => "user_alias",
        }
    }
}

impl fmt::Display for CrudOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope string in `{action}:{resource}` form
pub fn scope(operation: CrudOperation, resource: ResourceType) -> String {
    format!("{}:{}", operation, resource)
}

/// Result of checking required scopes against a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeDecision {
    /// Required scopes the token does not grant, in declaration order
    pub missing: Vec<String>,
}

impl ScopeDecision {
    pub fn is_granted(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Union of the scope claim (split on whitespace) and the permissions claim.
///
/// Fails with `MissingScopeClaim` when the scope claim key is absent, even if
/// a permissions claim is present.
pub fn granted_scopes(claims: &ClaimSet) -> Result<HashSet<String>, AuthError> {
    let scope = match claims.get(SCOPE_CLAIM, None) {
        None => return Err(AuthError::MissingScopeClaim),
        Some(Value::String(scope)) => scope,
        Some(_) => {
            return Err(AuthError::TokenParse(
                "scope claim is not a string".to_string(),
            ))
        }
    };

    let mut granted: HashSet<String> = scope.split_whitespace().map(str::to_string).collect();
    if let Some(Value::Array(permissions)) = claims.get(PERMISSIONS_CLAIM, None) {
        granted.extend(
            permissions
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string),
        );
    }
    Ok(granted)
}

/// Check that every required scope is granted.
///
/// Insufficient scopes are reported through the returned decision, never as
/// an error. An absent scope claim is always an error, including when no
/// scopes are required.
pub fn enforce_scopes<S: AsRef<str>>(
    claims: &ClaimSet,
    required: &[S],
) -> Result<ScopeDecision, AuthError> {
    let granted = granted_scopes(claims)?;
    let missing = required
        .iter()
        .map(AsRef::as_ref)
        .filter(|scope| !granted.contains(*scope))
        .map(str::to_string)
        .collect();
    Ok(ScopeDecision { missing })
}
