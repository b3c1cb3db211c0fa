//! Authenticated principal and the authorization decision engine
//!
//! A principal is built once per verified token and never mutated. All
//! decisions are pure functions over that snapshot.
//!
//! Two gates apply, in order:
//!
//! 1. **Scope gate**: the caller must hold at least one of the required
//!    scopes on the resource.
//! 2. **Instance gate**: only when an instance is in play. In
//!    all-instances mode the caller needs unrestricted access to the
//!    resource; an explicit id list never satisfies it. With a specific
//!    instance id the caller needs unrestricted access or that id listed.

use std::collections::HashMap;

use serde::Serialize;
use virava_core::{Permission, Resource, ScopeSet, ScopeType};

use crate::ids_access::ResourceIdsAccess;

/// What a protected operation asks of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub resource: Resource,
    pub scopes: Vec<ScopeType>,
    pub instance_id: Option<i64>,
    pub require_all_instances: bool,
}

impl AuthorizationRequest {
    /// Scope-only request
    pub fn new(resource: Resource, scopes: impl IntoIterator<Item = ScopeType>) -> Self {
        Self {
            resource,
            scopes: scopes.into_iter().collect(),
            instance_id: None,
            require_all_instances: false,
        }
    }

    /// Restrict the request to one instance of the resource
    pub fn with_instance_id(mut self, instance_id: i64) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    /// Require unrestricted access to every instance of the resource
    pub fn with_all_instances(mut self) -> Self {
        self.require_all_instances = true;
        self
    }

    fn is_instance_aware(&self) -> bool {
        self.instance_id.is_some() || self.require_all_instances
    }
}

/// Identity and permission snapshot of an authenticated caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedPrincipal {
    username: Option<String>,
    email: Option<String>,
    company_user: Option<bool>,
    permissions: Vec<Permission>,
    resource_scopes: HashMap<Resource, ScopeSet>,
    resource_ids_access: HashMap<Resource, ResourceIdsAccess>,
    authorities: Vec<String>,
}

impl AuthenticatedPrincipal {
    /// Build a principal from resolved permissions and instance access
    ///
    /// Permissions for the same resource are merged by union.
    pub fn new(
        permissions: Vec<Permission>,
        resource_ids_access: HashMap<Resource, ResourceIdsAccess>,
    ) -> Self {
        let mut resource_scopes: HashMap<Resource, ScopeSet> = HashMap::new();
        for permission in &permissions {
            resource_scopes
                .entry(permission.resource().clone())
                .or_default()
                .extend(permission.scopes().iter().copied());
        }

        let authorities = permissions
            .iter()
            .flat_map(Permission::authorities)
            .collect();

        Self {
            username: None,
            email: None,
            company_user: None,
            permissions,
            resource_scopes,
            resource_ids_access,
            authorities,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_company_user(mut self, company_user: bool) -> Self {
        self.company_user = Some(company_user);
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn company_user(&self) -> Option<bool> {
        self.company_user
    }

    /// One entry per known resource, possibly with an empty scope set
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn resource_scopes(&self) -> &HashMap<Resource, ScopeSet> {
        &self.resource_scopes
    }

    /// Scopes held on one resource, if the resource is known
    pub fn scopes_for(&self, resource: &Resource) -> Option<&ScopeSet> {
        self.resource_scopes.get(resource)
    }

    pub fn resource_ids_access(&self) -> &HashMap<Resource, ResourceIdsAccess> {
        &self.resource_ids_access
    }

    pub fn ids_access_for(&self, resource: &Resource) -> Option<&ResourceIdsAccess> {
        self.resource_ids_access.get(resource)
    }

    /// `RESOURCE_SCOPE` strings, one per granted pair
    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    /// Scope-only decision: at least one of `scopes` must be held
    ///
    /// An empty `scopes` list has nothing to check and is allowed.
    pub fn is_authorized(&self, resource: &Resource, scopes: &[ScopeType]) -> bool {
        if scopes.is_empty() {
            return true;
        }
        self.holds_any_scope(resource, scopes)
    }

    /// Instance-aware decision; the scope gate is evaluated first
    pub fn is_authorized_for_instance(
        &self,
        resource: &Resource,
        instance_id: Option<i64>,
        require_all_instances: bool,
        scopes: &[ScopeType],
    ) -> bool {
        if scopes.is_empty() {
            return true;
        }
        if !self.holds_any_scope(resource, scopes) {
            return false;
        }

        let access = self.resource_ids_access.get(resource);

        if require_all_instances {
            return access.is_some_and(ResourceIdsAccess::can_access_all);
        }

        match instance_id {
            Some(id) => access.is_some_and(|access| access.permits(id)),
            None => true,
        }
    }

    /// Evaluate a request, using the instance-aware form when it names an instance
    pub fn evaluate(&self, request: &AuthorizationRequest) -> bool {
        if request.is_instance_aware() {
            self.is_authorized_for_instance(
                &request.resource,
                request.instance_id,
                request.require_all_instances,
                &request.scopes,
            )
        } else {
            self.is_authorized(&request.resource, &request.scopes)
        }
    }

    fn holds_any_scope(&self, resource: &Resource, scopes: &[ScopeType]) -> bool {
        match self.resource_scopes.get(resource) {
            Some(granted) if !granted.is_empty() => {
                scopes.iter().any(|scope| granted.contains(scope))
            }
            _ => false,
        }
    }
}
