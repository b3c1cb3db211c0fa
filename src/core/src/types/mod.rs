//! Permission vocabulary types

pub mod scope;
pub mod resource;
pub mod permission;
pub mod role;

// Re-export commonly used types
pub use scope::{Scope, ScopeSet, ScopeType};
pub use resource::{Resource, ResourceKind};
pub use permission::{Permission, PermissionBuilder, ScopeHolder};
pub use role::Role;
