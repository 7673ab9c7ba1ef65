//! Token authorization engine.
//!
//! Single entry point combining claim extraction, key-set resolution and
//! signature verification, claim-shape checks, and scope enforcement. The
//! pipeline is linear and short-circuits at the first failing check:
//!
//! 1. unverified `iss` must be allow-listed (no key fetch otherwise)
//! 2. signature, `exp`, `aud` and `iss` verified against the issuer's key set
//! 3. namespaced principal claim present
//! 4. namespaced tenant claim present and equal to the configured tenant
//! 5. required scopes enforced
//!
//! Steps 1-4 and a missing scope claim are hard failures returned as
//! [`AuthError`]. Scope insufficiency is a soft denial returned as
//! [`AuthOutcome::Denied`], which still carries the principal for logging.

use jsonwebtoken::{decode_header, Algorithm};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::claims::{get_claim, ClaimSet};
use crate::auth::scopes::enforce_scopes;
use crate::auth::validator::{verify_signature, VerificationPolicy};
use crate::core::errors::AuthError;
use crate::core::models::Principal;
use crate::state::key_set_cache::KeySetCache;

pub const ISSUER_CLAIM: &str = "iss";
/// Namespaced claim carrying the principal identifier
pub const PRINCIPAL_CLAIM: &str = "email";
/// Namespaced claim carrying the principal's tenant
pub const TENANT_CLAIM: &str = "tenant";

/// Settings injected into the engine at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationConfig {
    pub allowed_issuers: Vec<String>,
    pub algorithms: Vec<Algorithm>,
    pub audience: String,
    pub namespace: String,
    pub tenant: String,
    pub leeway_secs: u64,
}

/// Outcome of an authorization check on an authenticated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted(Principal),
    Denied {
        principal: Principal,
        missing_scopes: Vec<String>,
    },
}

impl AuthOutcome {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthOutcome::Granted(_))
    }

    pub fn principal(&self) -> &Principal {
        match self {
            AuthOutcome::Granted(principal) => principal,
            AuthOutcome::Denied { principal, .. } => principal,
        }
    }

    /// `(authorized, principal)`
    pub fn into_parts(self) -> (bool, Principal) {
        match self {
            AuthOutcome::Granted(principal) => (true, principal),
            AuthOutcome::Denied { principal, .. } => (false, principal),
        }
    }
}

pub struct AuthorizationEngine {
    config: AuthorizationConfig,
    key_sets: Arc<KeySetCache>,
}

impl AuthorizationEngine {
    pub fn new(config: AuthorizationConfig, key_sets: Arc<KeySetCache>) -> Self {
        Self { config, key_sets }
    }

    /// Authenticate `token` and check it grants every scope in `required_scopes`.
    pub async fn authorize_user_for_operation<S>(
        &self,
        token: &str,
        required_scopes: &[S],
    ) -> Result<AuthOutcome, AuthError>
    where
        S: AsRef<str> + Sync,
    {
        let result = self.run_pipeline(token, required_scopes).await;
        match &result {
            Ok(AuthOutcome::Granted(principal)) => {
                debug!(principal = %principal.id, "Token authorized");
            }
            Ok(AuthOutcome::Denied { principal, missing_scopes }) => {
                warn!(
                    principal = %principal.id,
                    missing_scopes = ?missing_scopes,
                    "Token lacks required scopes"
                );
            }
            Err(e) => {
                warn!(error_type = e.error_type(), reason = %e, "Token rejected");
            }
        }
        result
    }

    async fn run_pipeline<S>(&self, token: &str, required_scopes: &[S]) -> Result<AuthOutcome, AuthError>
    where
        S: AsRef<str> + Sync,
    {
        let issuer = self.allowed_issuer(token)?;
        let claims = self.verify(token, &issuer).await?;

        let namespace = Some(self.config.namespace.as_str());
        let principal_id = claims
            .get_str(PRINCIPAL_CLAIM, namespace)
            .ok_or(AuthError::MissingPrincipalClaim)?;
        let tenant = claims
            .get_str(TENANT_CLAIM, namespace)
            .ok_or(AuthError::MissingTenantClaim)?;
        if tenant != self.config.tenant {
            return Err(AuthError::TenantMismatch);
        }
        let principal = Principal::new(principal_id, tenant);

        let decision = enforce_scopes(&claims, required_scopes)?;
        if decision.is_granted() {
            Ok(AuthOutcome::Granted(principal))
        } else {
            Ok(AuthOutcome::Denied {
                principal,
                missing_scopes: decision.missing,
            })
        }
    }

    /// Unverified issuer read, used only to select the key set.
    fn allowed_issuer(&self, token: &str) -> Result<String, AuthError> {
        match get_claim(token, ISSUER_CLAIM, None)? {
            Some(Value::String(issuer)) if self.config.allowed_issuers.contains(&issuer) => Ok(issuer),
            _ => Err(AuthError::InvalidIssuer),
        }
    }

    async fn verify(&self, token: &str, issuer: &str) -> Result<ClaimSet, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::TokenParse(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::TokenParse("token header has no key id".to_string()))?;

        let key_set = self.key_sets.key_set_for(issuer, &kid).await?;
        let policy = VerificationPolicy {
            audience: &self.config.audience,
            issuer,
            algorithms: &self.config.algorithms,
            leeway_secs: self.config.leeway_secs,
        };
        verify_signature(token, &key_set, &policy)
    }
}
