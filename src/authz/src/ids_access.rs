//! Instance-id access lists
//!
//! Tokens may restrict a caller to specific instances of a resource via a
//! claim named `IDS_<RESOURCE>` holding a comma separated id list, e.g.
//! `"IDS_ORDER": "12, 15, 40"`. The `ALL` token lifts the restriction.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use virava_core::{Permission, Resource};

use crate::claims::Claims;

/// Token in an id list granting access to every instance
pub const ACCESS_ALL_RESOURCE_IDS: &str = "ALL";

/// Integer or decimal number, optionally negative
static NUMBER_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").ok());

/// Instances of one resource the caller may act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdsAccess {
    resource: Resource,
    ids: Vec<i64>,
    can_access_all: bool,
}

impl ResourceIdsAccess {
    /// Unrestricted access to every instance
    pub fn all(resource: Resource) -> Self {
        Self {
            resource,
            ids: Vec::new(),
            can_access_all: true,
        }
    }

    /// Access restricted to the listed instances
    pub fn ids(resource: Resource, ids: Vec<i64>) -> Self {
        Self {
            resource,
            ids,
            can_access_all: false,
        }
    }

    /// Parse a claim value such as `"1, 2, 3"` or `"ALL"`
    ///
    /// Tokens that are not numbers are dropped. Decimal tokens are kept
    /// only when they denote a whole number (`"7.0"` becomes `7`).
    pub fn parse(resource: Resource, claim: &str) -> Self {
        let tokens: Vec<&str> = claim
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.iter().any(|token| *token == ACCESS_ALL_RESOURCE_IDS) {
            return Self::all(resource);
        }

        let ids = tokens.into_iter().filter_map(parse_id).collect();
        Self::ids(resource, ids)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Explicit id list; meaningless when [`can_access_all`](Self::can_access_all) is set
    pub fn allowed_ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn can_access_all(&self) -> bool {
        self.can_access_all
    }

    /// Whether a single instance is reachable through this entry
    pub fn permits(&self, id: i64) -> bool {
        self.can_access_all || self.ids.contains(&id)
    }
}

/// Parse one id token, dropping anything that is not a whole number
fn parse_id(token: &str) -> Option<i64> {
    if !NUMBER_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(token)) {
        debug!("Skipping non-numeric resource id {:?}", token);
        return None;
    }

    if let Ok(id) = token.parse::<i64>() {
        return Some(id);
    }

    // Decimal form: accept only whole values within range
    let (whole, fraction) = token.split_once('.')?;
    if fraction.bytes().all(|b| b == b'0') {
        whole.parse::<i64>().ok()
    } else {
        debug!("Skipping fractional resource id {:?}", token);
        None
    }
}

/// Derive instance-id access for every resource of the caller's permissions
///
/// Resources without an `IDS_<RESOURCE>` string claim get no entry, which
/// denies any check that names a specific instance.
pub fn resolve_resource_ids(
    claims: &Claims,
    permissions: &[Permission],
) -> HashMap<Resource, ResourceIdsAccess> {
    let mut access = HashMap::new();

    for permission in permissions {
        let resource = permission.resource();
        let claim_name = resource.ids_claim_name();
        let Some(value) = claims.string(&claim_name) else {
            continue;
        };

        access.insert(resource.clone(), ResourceIdsAccess::parse(resource.clone(), value));
    }

    access
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use virava_core::Scope;

    fn order() -> Resource {
        Resource::new("ORDER")
    }

    #[test]
    fn test_number_pattern_compiles() {
        assert!(NUMBER_PATTERN.is_some());
    }

    #[test]
    fn test_parse_explicit_ids() {
        let access = ResourceIdsAccess::parse(order(), "1, 2, 3");
        assert!(!access.can_access_all());
        assert_eq!(access.allowed_ids(), &[1, 2, 3]);
        assert!(access.permits(2));
        assert!(!access.permits(5));
    }

    #[test]
    fn test_parse_sentinel() {
        let access = ResourceIdsAccess::parse(order(), "1, ALL, 3");
        assert!(access.can_access_all());
        assert!(access.allowed_ids().is_empty());
        assert!(access.permits(999));
    }

    #[test]
    fn test_sentinel_must_be_a_whole_token() {
        let access = ResourceIdsAccess::parse(order(), "BALL, 4");
        assert!(!access.can_access_all());
        assert_eq!(access.allowed_ids(), &[4]);
    }

    #[test]
    fn test_non_numeric_tokens_are_dropped() {
        let access = ResourceIdsAccess::parse(order(), "7, abc, -3, 4.0, 4.5, ");
        assert_eq!(access.allowed_ids(), &[7, -3, 4]);
    }

    #[test]
    fn test_tolerates_missing_spaces() {
        let access = ResourceIdsAccess::parse(order(), "10,20 ,30");
        assert_eq!(access.allowed_ids(), &[10, 20, 30]);
    }

    #[test]
    fn test_empty_claim_restricts_to_nothing() {
        let access = ResourceIdsAccess::parse(order(), "");
        assert!(!access.can_access_all());
        assert!(access.allowed_ids().is_empty());
    }

    #[test]
    fn test_resolve_from_claims() {
        let claims = Claims::from_json(json!({
            "IDS_ORDER": "5, 6",
            "IDS_INVOICE": "ALL",
            "IDS_CUSTOMER": ["1", "2"],
        }))
        .unwrap();
        let permissions = vec![
            Permission::of(order(), &[Scope::Read]),
            Permission::of(Resource::new("INVOICE"), &[]),
            Permission::of(Resource::new("CUSTOMER"), &[Scope::Read]),
            Permission::of(Resource::new("PRODUCT"), &[Scope::Read]),
        ];

        let access = resolve_resource_ids(&claims, &permissions);

        assert_eq!(access.len(), 2);
        assert_eq!(access[&order()].allowed_ids(), &[5, 6]);
        assert!(access[&Resource::new("INVOICE")].can_access_all());
        assert!(!access.contains_key(&Resource::new("CUSTOMER")));
        assert!(!access.contains_key(&Resource::new("PRODUCT")));
    }

    #[test]
    fn test_claim_name_is_upper_cased() {
        let claims = Claims::from_json(json!({ "IDS_ORDER": "9" })).unwrap();
        let permissions = vec![Permission::of(Resource::new("order"), &[Scope::Read])];

        let access = resolve_resource_ids(&claims, &permissions);
        assert!(access[&Resource::new("order")].permits(9));
    }
}
