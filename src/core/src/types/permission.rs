//! Permission values and the accumulator used to build them

use serde::{Deserialize, Serialize};

use super::resource::Resource;
use super::scope::{Scope, ScopeSet, ScopeType};

/// Immutable grant of a set of actions on one resource
///
/// An empty scope set is meaningful: the resource is known but the holder
/// may do nothing with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PermissionSpec")]
pub struct Permission {
    resource: Resource,
    scopes: ScopeSet,
}

/// Declaration form of a permission, as written in role tables
#[derive(Deserialize)]
struct PermissionSpec {
    resource: Resource,
    #[serde(default)]
    scopes: Vec<Scope>,
}

impl From<PermissionSpec> for Permission {
    fn from(spec: PermissionSpec) -> Self {
        Permission::of(spec.resource, &spec.scopes)
    }
}

impl Permission {
    /// Permission granting the union of the given declared scopes
    pub fn of(resource: Resource, scopes: &[Scope]) -> Self {
        Self {
            resource,
            scopes: Scope::expand(scopes),
        }
    }

    /// Permission granting exactly the given actions
    pub fn with_scope_types(resource: Resource, scopes: impl IntoIterator<Item = ScopeType>) -> Self {
        Self {
            resource,
            scopes: scopes.into_iter().collect(),
        }
    }

    /// Permission on a resource with no actions
    pub fn empty(resource: Resource) -> Self {
        Self {
            resource,
            scopes: ScopeSet::new(),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn contains(&self, scope: ScopeType) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Boolean view of the granted actions
    pub fn scope_holder(&self) -> ScopeHolder {
        ScopeHolder {
            create: self.contains(ScopeType::Create),
            read: self.contains(ScopeType::Read),
            update: self.contains(ScopeType::Update),
            delete: self.contains(ScopeType::Delete),
        }
    }

    /// Granted-authority strings, one per action (e.g. `ORDER_READ`)
    pub fn authorities(&self) -> impl Iterator<Item = String> + '_ {
        self.scopes.iter().map(|scope| self.resource.authority(*scope))
    }
}

/// Accumulates actions for one resource before freezing into a [`Permission`]
///
/// Builders are owned exclusively while a permission table is merged and are
/// never shared.
#[derive(Debug, Clone)]
pub struct PermissionBuilder {
    resource: Resource,
    scopes: ScopeSet,
}

impl PermissionBuilder {
    /// Start with no actions
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            scopes: ScopeSet::new(),
        }
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Union one action into the accumulator
    pub fn add_scope(&mut self, scope: ScopeType) -> &mut Self {
        self.scopes.insert(scope);
        self
    }

    /// Union several actions into the accumulator
    pub fn add_scopes<'a>(&mut self, scopes: impl IntoIterator<Item = &'a ScopeType>) -> &mut Self {
        self.scopes.extend(scopes);
        self
    }

    /// Freeze the accumulated actions
    pub fn build(self) -> Permission {
        Permission {
            resource: self.resource,
            scopes: self.scopes,
        }
    }
}

/// Flag view of a permission's actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScopeHolder {
    create: bool,
    read: bool,
    update: bool,
    delete: bool,
}

impl ScopeHolder {
    pub fn can_create(&self) -> bool {
        self.create
    }

    pub fn can_read(&self) -> bool {
        self.read
    }

    pub fn can_update(&self) -> bool {
        self.update
    }

    pub fn can_delete(&self) -> bool {
        self.delete
    }
}
