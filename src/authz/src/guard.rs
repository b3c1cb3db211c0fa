//! Declarative guard for protected operations

use tracing::{debug, warn};
use virava_core::{Resource, ScopeType};

use crate::authenticator::Authentication;
use crate::error::{Result, ViravaError};
use crate::principal::AuthorizationRequest;

/// Requirements of one protected operation
///
/// ```rust
/// use virava_authz::SecuredOperation;
/// use virava_core::{Resource, ScopeType};
///
/// let update_order = SecuredOperation::new(Resource::new("ORDER"), [ScopeType::Update])
///     .with_instance_id(42);
/// assert!(update_order.authorize(None).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredOperation {
    request: AuthorizationRequest,
}

impl SecuredOperation {
    pub fn new(resource: Resource, scopes: impl IntoIterator<Item = ScopeType>) -> Self {
        Self::from(AuthorizationRequest::new(resource, scopes))
    }

    pub fn with_instance_id(self, instance_id: i64) -> Self {
        Self::from(self.request.with_instance_id(instance_id))
    }

    pub fn with_all_instances(self) -> Self {
        Self::from(self.request.with_all_instances())
    }

    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    /// Check the caller; `None` means the request carried no authentication
    pub fn authorize(&self, authentication: Option<&Authentication>) -> Result<()> {
        let resource = &self.request.resource;
        let Some(authentication) = authentication else {
            warn!("Denied {} on {}: not authenticated", self.describe_scopes(), resource);
            return Err(ViravaError::access_denied("Authentication required"));
        };

        let principal = authentication.principal();
        if principal.evaluate(&self.request) {
            debug!(
                "Granted {} on {} to {:?}",
                self.describe_scopes(),
                resource,
                principal.username()
            );
            return Ok(());
        }

        warn!(
            "Denied {} on {} to {:?}",
            self.describe_scopes(),
            resource,
            principal.username()
        );
        Err(ViravaError::access_denied(format!(
            "Insufficient permissions for {} on {}",
            self.describe_scopes(),
            resource
        )))
    }

    fn describe_scopes(&self) -> String {
        self.request
            .scopes
            .iter()
            .map(ScopeType::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl From<AuthorizationRequest> for SecuredOperation {
    fn from(request: AuthorizationRequest) -> Self {
        Self { request }
    }
}
