//! Resource identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use super::scope::ScopeType;
use crate::error::{CoreError, Result};

/// Claim name prefix carrying per-resource instance-id lists
const IDS_CLAIM_PREFIX: &str = "IDS_";

/// Protected entity class (e.g. `ORDER`)
///
/// Resources form an open set: any non-blank name is accepted. Equality is
/// exact, so `ORDER` and `order` are distinct resources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resource(String);

impl Resource {
    /// Create a resource without validation
    ///
    /// Intended for literals in code; configuration input should go through
    /// [`Resource::parse`].
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Create a resource, rejecting blank names
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::invalid_resource(name));
        }
        Ok(Self(name))
    }

    /// Resource name as given
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Claim key holding the instance ids the caller may act on
    ///
    /// ```
    /// # use virava_core::Resource;
    /// assert_eq!(Resource::new("order").ids_claim_name(), "IDS_ORDER");
    /// ```
    pub fn ids_claim_name(&self) -> String {
        format!("{IDS_CLAIM_PREFIX}{}", self.0).to_uppercase()
    }

    /// Granted-authority string for one action on this resource
    pub fn authority(&self, scope: ScopeType) -> String {
        format!("{}_{}", self.0, scope.as_str()).to_uppercase()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Resource {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Resource::parse(value)
    }
}

impl From<Resource> for String {
    fn from(resource: Resource) -> Self {
        resource.0
    }
}

impl From<&str> for Resource {
    fn from(name: &str) -> Self {
        Resource::new(name)
    }
}

/// Application-defined resource catalog
///
/// Implemented by an application's resource enum so that the complete
/// resource universe can be enumerated when the permission table is built.
///
/// ```
/// use virava_core::{Resource, ResourceKind};
///
/// #[derive(Clone, Copy)]
/// enum Shop {
///     Order,
///     Invoice,
/// }
///
/// impl ResourceKind for Shop {
///     fn name(&self) -> &str {
///         match self {
///             Shop::Order => "ORDER",
///             Shop::Invoice => "INVOICE",
///         }
///     }
///
///     fn all() -> Vec<Self> {
///         vec![Shop::Order, Shop::Invoice]
///     }
/// }
///
/// assert_eq!(Shop::full_resource_list(), vec![Resource::new("ORDER"), Resource::new("INVOICE")]);
/// ```
pub trait ResourceKind: Sized {
    /// Resource name of this variant
    fn name(&self) -> &str;

    /// Every variant of the catalog
    fn all() -> Vec<Self>;

    /// This variant as a [`Resource`]
    fn resource(&self) -> Resource {
        Resource::new(self.name())
    }

    /// The full resource universe of the catalog
    fn full_resource_list() -> Vec<Resource> {
        Self::all().iter().map(ResourceKind::resource).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_claim_name_is_upper_cased() {
        assert_eq!(Resource::new("Invoice").ids_claim_name(), "IDS_INVOICE");
        assert_eq!(Resource::new("ORDER").ids_claim_name(), "IDS_ORDER");
    }

    #[test]
    fn test_authority_format() {
        let order = Resource::new("order");
        assert_eq!(order.authority(ScopeType::Read), "ORDER_READ");
        assert_eq!(order.authority(ScopeType::Delete), "ORDER_DELETE");
    }

    #[test]
    fn test_parse_rejects_blank_names() {
        assert!(Resource::parse("ORDER").is_ok());
        assert!(matches!(Resource::parse(""), Err(CoreError::InvalidResource(_))));
        assert!(matches!(Resource::parse("  "), Err(CoreError::InvalidResource(_))));
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        assert_ne!(Resource::new("ORDER"), Resource::new("order"));
    }

    #[test]
    fn test_serde_transparent() {
        let resource: Resource = serde_json::from_str("\"ORDER\"").unwrap();
        assert_eq!(resource.name(), "ORDER");
        assert_eq!(serde_json::to_string(&resource).unwrap(), "\"ORDER\"");
        assert!(serde_json::from_str::<Resource>("\"\"").is_err());
    }
}
