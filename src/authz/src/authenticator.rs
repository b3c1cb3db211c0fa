//! Token-to-principal composition
//!
//! Verification, claim extraction, permission resolution and instance-id
//! resolution combined into one entry point.
//!
//! ```text
//! token → TokenVerifier → Claims ─┬→ roles → RoleConfig → permissions ─┐
//!                                 └→ IDS_* claims ──────────────────────┴→ AuthenticatedPrincipal
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::claims::Claims;
use crate::config::AuthTokenConfig;
use crate::error::{Result, ViravaError};
use crate::ids_access::resolve_resource_ids;
use crate::principal::AuthenticatedPrincipal;
use crate::role_config::RoleConfig;
use crate::token::TokenVerifier;

const BEARER_PREFIX: &str = "Bearer ";

/// Claim paths of the identity fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPaths {
    pub username: String,
    pub roles: String,
    pub email: Option<String>,
    pub company_user: Option<String>,
}

impl ClaimPaths {
    pub fn new(username: impl Into<String>, roles: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            roles: roles.into(),
            email: None,
            company_user: None,
        }
    }
}

impl From<&AuthTokenConfig> for ClaimPaths {
    fn from(config: &AuthTokenConfig) -> Self {
        Self {
            username: config.username_path.clone(),
            roles: config.roles_path.clone(),
            email: config.email_path.clone(),
            company_user: config.company_user_path.clone(),
        }
    }
}

/// Application-specific data about a user, looked up by username
///
/// ```rust
/// use virava_authz::PrincipalInfoProvider;
///
/// struct Departments;
///
/// impl PrincipalInfoProvider for Departments {
///     type Info = String;
///
///     fn provide(&self, username: &str) -> String {
///         format!("{username}@sales")
///     }
/// }
/// ```
pub trait PrincipalInfoProvider: Send + Sync {
    type Info: Send + Sync + 'static;

    fn provide(&self, username: &str) -> Self::Info;
}

type CustomInfo = Arc<dyn Any + Send + Sync>;

/// Result of a successful authentication
///
/// Carries the principal together with the raw material it was built
/// from, for callers that need token fields beyond roles and permissions.
#[derive(Clone)]
pub struct Authentication {
    principal: AuthenticatedPrincipal,
    roles: Vec<String>,
    claims: Claims,
    token: String,
    custom_info: Arc<OnceLock<CustomInfo>>,
}

impl Authentication {
    pub fn new(principal: AuthenticatedPrincipal, roles: Vec<String>, claims: Claims, token: impl Into<String>) -> Self {
        Self {
            principal,
            roles,
            claims,
            token: token.into(),
            custom_info: Arc::new(OnceLock::new()),
        }
    }

    pub fn principal(&self) -> &AuthenticatedPrincipal {
        &self.principal
    }

    /// Role names exactly as carried by the token
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// String claim at a dotted path
    pub fn claim(&self, path: &str) -> Option<&str> {
        self.claims.string(path)
    }

    /// String-list claim at a dotted path
    pub fn claim_list(&self, path: &str) -> Option<Vec<String>> {
        self.claims.string_list(path)
    }

    /// The raw token this authentication was built from
    pub fn credentials(&self) -> &str {
        &self.token
    }

    /// Custom info for this principal, loaded from `provider` on first use
    ///
    /// Later calls, including calls on clones, return the same value
    /// without consulting the provider. `None` when the principal has no
    /// username or info of another type is already attached.
    pub fn custom_info<P: PrincipalInfoProvider>(&self, provider: &P) -> Option<Arc<P::Info>> {
        let username = self
            .principal
            .username()
            .filter(|username| !username.trim().is_empty())?;

        let info = self.custom_info.get_or_init(|| {
            debug!("Loading custom principal info for {}", username);
            let info: CustomInfo = Arc::new(provider.provide(username));
            info
        });

        Arc::clone(info).downcast::<P::Info>().ok()
    }

    pub fn into_principal(self) -> AuthenticatedPrincipal {
        self.principal
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("principal", &self.principal)
            .field("roles", &self.roles)
            .finish_non_exhaustive()
    }
}

/// Authenticates bearer tokens against a fixed permission table
pub struct Authenticator {
    role_config: Arc<RoleConfig>,
    verifier: TokenVerifier,
    paths: ClaimPaths,
}

impl Authenticator {
    /// Validate `config` and build a verifier from it
    pub fn new(config: &AuthTokenConfig, role_config: Arc<RoleConfig>) -> Result<Self> {
        config.validate()?;
        let verifier = TokenVerifier::new(config)?;
        Ok(Self::with_verifier(role_config, verifier, ClaimPaths::from(config)))
    }

    pub fn with_verifier(role_config: Arc<RoleConfig>, verifier: TokenVerifier, paths: ClaimPaths) -> Self {
        Self {
            role_config,
            verifier,
            paths,
        }
    }

    pub fn role_config(&self) -> &RoleConfig {
        &self.role_config
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub async fn authenticate(&self, token: &str) -> Result<Authentication> {
        let claims = self.verifier.verify(token).await?;
        let roles = extract_roles(&claims, &self.paths.roles);
        let principal = build_principal(&claims, &roles, &self.role_config, &self.paths);

        debug!(
            "Authenticated {:?} with {} role(s)",
            principal.username(),
            roles.len()
        );

        Ok(Authentication::new(principal, roles, claims, token))
    }

    /// Authenticate the value of an `Authorization` header
    pub async fn authenticate_header(&self, header: &str) -> Result<Authentication> {
        let token = extract_bearer(header)
            .ok_or_else(|| ViravaError::authentication("Missing bearer token"))?;
        self.authenticate(token).await
    }
}

/// Verify a token and build the caller's principal
pub async fn verify_and_build_principal(
    token: &str,
    role_config: &RoleConfig,
    verifier: &TokenVerifier,
    paths: &ClaimPaths,
) -> Result<AuthenticatedPrincipal> {
    let claims = verifier.verify(token).await?;
    let roles = extract_roles(&claims, &paths.roles);
    Ok(build_principal(&claims, &roles, role_config, paths))
}

/// Build a principal from already verified claims
pub fn build_principal(
    claims: &Claims,
    roles: &[String],
    role_config: &RoleConfig,
    paths: &ClaimPaths,
) -> AuthenticatedPrincipal {
    let permissions = role_config.resolve_permissions(roles);
    let ids_access = resolve_resource_ids(claims, &permissions);
    let mut principal = AuthenticatedPrincipal::new(permissions, ids_access);

    if let Some(username) = claims.string(&paths.username) {
        principal = principal.with_username(username);
    }
    if let Some(email) = paths.email.as_deref().and_then(|path| claims.string(path)) {
        principal = principal.with_email(email);
    }
    if let Some(company_user) = paths.company_user.as_deref().and_then(|path| claims.boolean(path)) {
        principal = principal.with_company_user(company_user);
    }

    principal
}

/// Role list at `path`; absent or malformed role claims yield no roles
fn extract_roles(claims: &Claims, path: &str) -> Vec<String> {
    claims.string_list(path).unwrap_or_else(|| {
        debug!("No role list at claim path {}", path);
        Vec::new()
    })
}

/// Token part of a `Bearer` authorization header
pub fn extract_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
