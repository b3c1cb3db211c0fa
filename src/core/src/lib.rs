//! # Virava Core
//!
//! Permission vocabulary shared by the Virava authorization crates: the
//! closed set of actions (`ScopeType`), the declaration-side unions
//! (`Scope`), string-backed resource identifiers, and the immutable
//! permission and role values built from them.
//!
//! ## Example
//!
//! ```rust
//! use virava_core::{Permission, Resource, Role, Scope, ScopeType};
//!
//! let order = Resource::new("ORDER");
//! let admin = Role::new("ADMIN", vec![Permission::of(order.clone(), &[Scope::Cru])]);
//!
//! let permission = &admin.permissions()[0];
//! assert!(permission.contains(ScopeType::Update));
//! assert!(!permission.contains(ScopeType::Delete));
//! ```

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    Permission, PermissionBuilder, Resource, ResourceKind, Role, Scope, ScopeHolder, ScopeSet,
    ScopeType,
};
