//! Action vocabulary
//!
//! `ScopeType` is the closed set of atomic actions a permission can grant.
//! `Scope` is the declaration-side vocabulary used when roles are written
//! down: it adds the `CRU` and `CRUD` unions, which expand into atoms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Ordered set of atomic actions
pub type ScopeSet = BTreeSet<ScopeType>;

/// Atomic action a caller may perform on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ScopeType {
    Create,
    Read,
    Update,
    Delete,
}

impl ScopeType {
    /// Every atomic action, in declaration order
    pub const ALL: [ScopeType; 4] = [
        ScopeType::Create,
        ScopeType::Read,
        ScopeType::Update,
        ScopeType::Delete,
    ];

    /// Lower-case action name (e.g. `"read"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Create => "create",
            ScopeType::Read => "read",
            ScopeType::Update => "update",
            ScopeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(ScopeType::Create),
            "read" => Ok(ScopeType::Read),
            "update" => Ok(ScopeType::Update),
            "delete" => Ok(ScopeType::Delete),
            _ => Err(CoreError::unknown_scope(s)),
        }
    }
}

impl TryFrom<String> for ScopeType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ScopeType> for &'static str {
    fn from(scope: ScopeType) -> Self {
        scope.as_str()
    }
}

/// Declared scope: a single action or a named union of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Scope {
    Create,
    Read,
    Update,
    Delete,
    /// Create, read and update
    Cru,
    /// Create, read, update and delete
    Crud,
}

impl Scope {
    /// Atomic actions this scope expands into
    pub fn scope_types(&self) -> &'static [ScopeType] {
        match self {
            Scope::Create => &[ScopeType::Create],
            Scope::Read => &[ScopeType::Read],
            Scope::Update => &[ScopeType::Update],
            Scope::Delete => &[ScopeType::Delete],
            Scope::Cru => &[ScopeType::Create, ScopeType::Read, ScopeType::Update],
            Scope::Crud => &ScopeType::ALL,
        }
    }

    /// Upper-case declaration name (e.g. `"CRUD"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Create => "CREATE",
            Scope::Read => "READ",
            Scope::Update => "UPDATE",
            Scope::Delete => "DELETE",
            Scope::Cru => "CRU",
            Scope::Crud => "CRUD",
        }
    }

    /// Union of the expansions of several scopes
    pub fn expand(scopes: &[Scope]) -> ScopeSet {
        scopes
            .iter()
            .flat_map(|scope| scope.scope_types().iter().copied())
            .collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Scope::Create),
            "READ" => Ok(Scope::Read),
            "UPDATE" => Ok(Scope::Update),
            "DELETE" => Ok(Scope::Delete),
            "CRU" => Ok(Scope::Cru),
            "CRUD" => Ok(Scope::Crud),
            _ => Err(CoreError::unknown_scope(s)),
        }
    }
}

impl TryFrom<String> for Scope {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Scope> for &'static str {
    fn from(scope: Scope) -> Self {
        scope.as_str()
    }
}

impl From<ScopeType> for Scope {
    fn from(scope_type: ScopeType) -> Self {
        match scope_type {
            ScopeType::Create => Scope::Create,
            ScopeType::Read => Scope::Read,
            ScopeType::Update => Scope::Update,
            ScopeType::Delete => Scope::Delete,
        }
    }
}
