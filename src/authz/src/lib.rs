//! # Virava Authorization
//!
//! Role, resource and scope based access control driven by signed bearer
//! tokens.
//!
//! ## Features
//!
//! - **Permission table** built once from static roles and an optional
//!   role-alias mapping
//! - **Token verification** with an HMAC secret or a cached remote RSA key set
//! - **Dotted-path claim extraction** over arbitrary nested payloads
//! - **Instance-level access** through `IDS_<RESOURCE>` claims
//! - **Pure decisions** over an immutable per-token principal
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use virava_authz::{AuthTokenConfig, Authenticator, RoleTable, SecuredOperation};
//! use virava_core::{Resource, ScopeType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = RoleTable::from_path("roles.json")?;
//!     let config = AuthTokenConfig::new("preferred_username", "realm_access.roles")
//!         .with_jwk_set_url("https://idp.example.com/realms/shop/protocol/openid-connect/certs");
//!
//!     let authenticator = Authenticator::new(&config, Arc::new(table.build()?))?;
//!     let authentication = authenticator.authenticate_header("Bearer eyJ...").await?;
//!
//!     SecuredOperation::new(Resource::new("ORDER"), [ScopeType::Update])
//!         .with_instance_id(42)
//!         .authorize(Some(&authentication))?;
//!
//!     Ok(())
//! }
//! ```

pub mod authenticator;
pub mod claims;
pub mod config;
pub mod error;
pub mod guard;
pub mod ids_access;
pub mod principal;
pub mod role_config;
pub mod token;

pub use authenticator::{
    build_principal, extract_bearer, verify_and_build_principal, Authentication, Authenticator,
    ClaimPaths, PrincipalInfoProvider,
};
pub use claims::{ClaimValue, Claims};
pub use config::{AuthTokenConfig, RoleTable};
pub use error::{Result, ViravaError};
pub use guard::SecuredOperation;
pub use ids_access::{resolve_resource_ids, ResourceIdsAccess, ACCESS_ALL_RESOURCE_IDS};
pub use principal::{AuthenticatedPrincipal, AuthorizationRequest};
pub use role_config::{ResourceScopes, RoleConfig};
pub use token::{CacheStats, HttpJwkSource, JwkCache, JwkSource, TokenVerifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
