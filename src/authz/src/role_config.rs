//! Permission table
//!
//! `RoleConfig` is built once from the static role declarations and the
//! complete resource list, then queried per authenticated token to merge
//! the caller's roles into one permission per resource.
//!
//! # Example
//!
//! ```rust
//! use virava_authz::RoleConfig;
//! use virava_core::{Permission, Resource, Role, Scope, ScopeType};
//!
//! let order = Resource::new("ORDER");
//! let invoice = Resource::new("INVOICE");
//! let admin = Role::new("ADMIN", vec![Permission::of(order.clone(), &[Scope::Read, Scope::Update])]);
//!
//! let config = RoleConfig::new(&[admin], vec![order.clone(), invoice.clone()]).unwrap();
//! let permissions = config.resolve_permissions(&["ADMIN"]);
//!
//! assert_eq!(permissions.len(), 2);
//! assert!(permissions[0].contains(ScopeType::Update));
//! assert!(permissions[1].is_empty());
//! ```

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use virava_core::{Permission, PermissionBuilder, Resource, ResourceKind, Role, ScopeSet};

use crate::error::{Result, ViravaError};

/// Actions granted per resource by one role key
pub type ResourceScopes = HashMap<Resource, ScopeSet>;

/// Immutable role-name → (resource → actions) index
#[derive(Debug, Clone)]
pub struct RoleConfig {
    /// Lookup key (role name or alias) → granted actions
    permission_map: HashMap<String, ResourceScopes>,

    /// Full resource universe, in declaration order
    resources: Vec<Resource>,

    /// Position of each resource in `resources`
    resource_index: HashMap<Resource, usize>,
}

impl RoleConfig {
    /// Build a table keyed by each role's own name
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either list is empty, a role name
    /// is declared twice, or a role references a resource missing from
    /// `resources`.
    pub fn new(roles: &[Role], resources: Vec<Resource>) -> Result<Self> {
        let (resources, resource_index) = Self::index_resources(roles, resources)?;

        let mut permission_map = HashMap::with_capacity(roles.len());
        for role in roles {
            if permission_map
                .insert(role.name().to_string(), Self::resource_scopes(role))
                .is_some()
            {
                return Err(ViravaError::configuration(format!(
                    "Role [{}] is declared more than once",
                    role.name()
                )));
            }
        }

        info!(
            "RoleConfig initialized with {} roles and {} resources",
            permission_map.len(),
            resources.len()
        );

        Ok(Self {
            permission_map,
            resources,
            resource_index,
        })
    }

    /// Build a table keyed by external role aliases
    ///
    /// `role_mapping` maps a lower-cased canonical role name to the role
    /// identifiers that appear in tokens. Every alias is stored upper-cased
    /// and receives the canonical role's permissions; an alias listed under
    /// several canonical roles receives the union of their permissions.
    /// Canonical roles without a mapping entry are unreachable.
    ///
    /// # Errors
    ///
    /// Same as [`RoleConfig::new`], plus a configuration error when the
    /// mapping names a canonical role that is not declared.
    pub fn with_role_mapping(
        roles: &[Role],
        resources: Vec<Resource>,
        role_mapping: &HashMap<String, Vec<String>>,
    ) -> Result<Self> {
        let (resources, resource_index) = Self::index_resources(roles, resources)?;

        let declared: HashSet<String> = roles.iter().map(|r| r.name().to_lowercase()).collect();
        if let Some(unknown) = role_mapping
            .keys()
            .find(|name| !declared.contains(&name.to_lowercase()))
        {
            return Err(ViravaError::configuration(format!(
                "Role mapping references unknown role [{unknown}]"
            )));
        }

        let mapping: HashMap<String, &Vec<String>> = role_mapping
            .iter()
            .map(|(name, aliases)| (name.to_lowercase(), aliases))
            .collect();

        let mut permission_map: HashMap<String, ResourceScopes> = HashMap::new();
        for role in roles {
            let Some(aliases) = mapping.get(&role.name().to_lowercase()) else {
                debug!("Role {} has no mapped aliases", role.name());
                continue;
            };

            let scopes = Self::resource_scopes(role);
            for alias in aliases.iter() {
                let entry = permission_map.entry(alias.to_uppercase()).or_default();
                for (resource, actions) in &scopes {
                    entry.entry(resource.clone()).or_default().extend(actions);
                }
            }
        }

        info!(
            "RoleConfig initialized with {} role aliases and {} resources",
            permission_map.len(),
            resources.len()
        );

        Ok(Self {
            permission_map,
            resources,
            resource_index,
        })
    }

    /// Build a table whose resource universe comes from a catalog
    pub fn from_kind<K: ResourceKind>(roles: &[Role]) -> Result<Self> {
        Self::new(roles, K::full_resource_list())
    }

    /// Full resource universe, in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Lookup keys (role names or aliases) known to the table
    pub fn role_keys(&self) -> impl Iterator<Item = &str> {
        self.permission_map.keys().map(String::as_str)
    }

    /// Actions a single role key grants, if the key is known
    pub fn role_scopes(&self, role: &str) -> Option<&ResourceScopes> {
        self.permission_map.get(role)
    }

    /// Merge the permissions of the caller's roles
    ///
    /// Returns exactly one permission per known resource, in resource
    /// order. Scopes are the union over every caller role; resources no
    /// role grants carry an empty scope set. Unknown caller roles are
    /// ignored.
    pub fn resolve_permissions<S: AsRef<str>>(&self, caller_roles: &[S]) -> Vec<Permission> {
        let mut builders: Vec<PermissionBuilder> = self
            .resources
            .iter()
            .cloned()
            .map(PermissionBuilder::new)
            .collect();

        for role in caller_roles {
            let Some(resource_scopes) = self.permission_map.get(role.as_ref()) else {
                continue;
            };

            for (resource, scopes) in resource_scopes {
                if let Some(&idx) = self.resource_index.get(resource) {
                    builders[idx].add_scopes(scopes);
                }
            }
        }

        builders.into_iter().map(PermissionBuilder::build).collect()
    }

    /// Validate both lists and index the resources
    fn index_resources(
        roles: &[Role],
        resources: Vec<Resource>,
    ) -> Result<(Vec<Resource>, HashMap<Resource, usize>)> {
        if roles.is_empty() {
            return Err(ViravaError::configuration("Role list cannot be empty"));
        }
        if resources.is_empty() {
            return Err(ViravaError::configuration("Resource list cannot be empty"));
        }

        let mut unique = Vec::with_capacity(resources.len());
        let mut resource_index = HashMap::with_capacity(resources.len());
        for resource in resources {
            if resource_index.contains_key(&resource) {
                warn!("Resource {} listed more than once", resource);
                continue;
            }
            resource_index.insert(resource.clone(), unique.len());
            unique.push(resource);
        }

        for role in roles {
            for permission in role.permissions() {
                if !resource_index.contains_key(permission.resource()) {
                    return Err(ViravaError::configuration(format!(
                        "Role [{}] references resource [{}] which is missing from the full resource list",
                        role.name(),
                        permission.resource()
                    )));
                }
            }
        }

        Ok((unique, resource_index))
    }

    /// Collapse a role's permissions into resource → actions
    fn resource_scopes(role: &Role) -> ResourceScopes {
        let mut scopes = ResourceScopes::new();
        for permission in role.permissions() {
            scopes
                .entry(permission.resource().clone())
                .or_default()
                .extend(permission.scopes());
        }
        scopes
    }
}
