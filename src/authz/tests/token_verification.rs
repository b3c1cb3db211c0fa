//! Integration tests for token verification and principal construction
//!
//! RS256 tokens are signed with the fixture key and verified through an
//! in-memory key set source; HS256 tokens use a shared secret.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use proptest::prelude::*;
use serde_json::{json, Value};
use virava_authz::{
    verify_and_build_principal, AuthTokenConfig, Authenticator, ClaimPaths, JwkSource, RoleConfig,
    RoleTable, SecuredOperation, TokenVerifier, ViravaError,
};
use virava_core::{Resource, ScopeType};

const PRIVATE_KEY: &str = include_str!("fixtures/rsa_private.pem");
const KEY_SET: &str = include_str!("fixtures/jwks.json");
const KID: &str = "test-key-1";
const SECRET: &str = "integration-secret";
const ISSUER: &str = "https://idp.example.com/realms/shop";

const ROLE_TABLE: &str = r#"{
    "resources": ["ORDER", "INVOICE", "CUSTOMER"],
    "roles": [
        { "name": "SALES", "permissions": [
            { "resource": "ORDER", "scopes": ["CRU"] },
            { "resource": "CUSTOMER", "scopes": ["READ"] }
        ] },
        { "name": "ACCOUNTING", "permissions": [
            { "resource": "INVOICE", "scopes": ["CRUD"] },
            { "resource": "ORDER", "scopes": ["READ"] }
        ] }
    ]
}"#;

struct FixtureSource {
    key_set: JwkSet,
    fetches: AtomicUsize,
}

impl FixtureSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            key_set: serde_json::from_str(KEY_SET).unwrap(),
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JwkSource for FixtureSource {
    async fn fetch(&self) -> virava_authz::Result<JwkSet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.key_set.clone())
    }
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn sign_rs256(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

fn sign_hs256(claims: &Value, secret: &str) -> String {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

fn keycloak_claims() -> Value {
    json!({
        "iss": ISSUER,
        "exp": now() + 300,
        "preferred_username": "jdoe",
        "email": "jdoe@example.com",
        "company_user": true,
        "realm_access": { "roles": ["SALES", "offline_access"] },
        "IDS_ORDER": "100, 101",
        "IDS_CUSTOMER": "ALL",
        "tenant": { "region": "eu-west" },
    })
}

fn key_set_config() -> AuthTokenConfig {
    AuthTokenConfig::new("preferred_username", "realm_access.roles")
        .with_email_path("email")
        .with_company_user_path("company_user")
        .with_jwk_set_url("https://idp.example.com/realms/shop/certs")
        .with_issuer(ISSUER)
}

fn role_config() -> Arc<RoleConfig> {
    Arc::new(RoleTable::from_json_str(ROLE_TABLE).unwrap().build().unwrap())
}

fn key_set_authenticator(source: Arc<FixtureSource>) -> Authenticator {
    let config = key_set_config();
    let verifier = TokenVerifier::with_jwk_source(&config, source).unwrap();
    Authenticator::with_verifier(role_config(), verifier, ClaimPaths::from(&config))
}

// ============================================================================
// KEY SET MODE
// ============================================================================

#[tokio::test]
async fn test_rs256_end_to_end() {
    let authenticator = key_set_authenticator(FixtureSource::new());
    let token = sign_rs256(&keycloak_claims(), Some(KID));

    let auth = authenticator.authenticate(&token).await.unwrap();
    let principal = auth.principal();

    assert_eq!(principal.username(), Some("jdoe"));
    assert_eq!(principal.email(), Some("jdoe@example.com"));
    assert_eq!(principal.company_user(), Some(true));
    assert_eq!(auth.roles(), &["SALES".to_string(), "offline_access".to_string()]);
    assert_eq!(auth.claim("tenant.region"), Some("eu-west"));
    assert_eq!(auth.claim_list("realm_access.roles").map(|r| r.len()), Some(2));
    assert_eq!(auth.credentials(), token);

    let order = Resource::new("ORDER");
    let invoice = Resource::new("INVOICE");
    let customer = Resource::new("CUSTOMER");

    assert!(principal.is_authorized(&order, &[ScopeType::Create]));
    assert!(!principal.is_authorized(&order, &[ScopeType::Delete]));
    assert!(!principal.is_authorized(&invoice, &[ScopeType::Read]));
    assert!(principal.is_authorized_for_instance(&order, Some(101), false, &[ScopeType::Update]));
    assert!(!principal.is_authorized_for_instance(&order, Some(102), false, &[ScopeType::Update]));
    assert!(!principal.is_authorized_for_instance(&order, None, true, &[ScopeType::Read]));
    assert!(principal.is_authorized_for_instance(&customer, None, true, &[ScopeType::Read]));

    let mut authorities = principal.authorities().to_vec();
    authorities.sort();
    assert_eq!(
        authorities,
        vec!["CUSTOMER_READ", "ORDER_CREATE", "ORDER_READ", "ORDER_UPDATE"]
    );
}

#[tokio::test]
async fn test_signing_key_is_cached() {
    let source = FixtureSource::new();
    let authenticator = key_set_authenticator(source.clone());
    let token = sign_rs256(&keycloak_claims(), Some(KID));

    for _ in 0..3 {
        authenticator.authenticate(&token).await.unwrap();
    }

    assert_eq!(source.fetches(), 1);
    let stats = authenticator.verifier().jwk_cache_stats().unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_expired_keys_are_refetched() {
    let source = FixtureSource::new();
    let config = key_set_config().with_jwk_cache_ttl(Duration::ZERO);
    let verifier = TokenVerifier::with_jwk_source(&config, source.clone()).unwrap();
    let token = sign_rs256(&keycloak_claims(), Some(KID));

    verifier.verify(&token).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    verifier.verify(&token).await.unwrap();

    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_rs256_rejections() {
    let authenticator = key_set_authenticator(FixtureSource::new());

    let unknown_kid = sign_rs256(&keycloak_claims(), Some("rotated-away"));
    let missing_kid = sign_rs256(&keycloak_claims(), None);

    let mut wrong_issuer = keycloak_claims();
    wrong_issuer["iss"] = json!("https://evil.example.com");
    let wrong_issuer = sign_rs256(&wrong_issuer, Some(KID));

    let mut no_issuer = keycloak_claims();
    no_issuer.as_object_mut().unwrap().remove("iss");
    let no_issuer = sign_rs256(&no_issuer, Some(KID));

    let mut expired = keycloak_claims();
    expired["exp"] = json!(now() - 3600);
    let expired = sign_rs256(&expired, Some(KID));

    let mut hmac = Header::new(Algorithm::HS256);
    hmac.kid = Some(KID.to_string());
    let hmac_with_kid = encode(&hmac, &keycloak_claims(), &EncodingKey::from_secret(b"guess")).unwrap();

    for token in [unknown_kid, missing_kid, wrong_issuer, no_issuer, expired, hmac_with_kid] {
        let err = authenticator.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, ViravaError::Authentication(_)), "unexpected {err:?}");
    }
}

#[tokio::test]
async fn test_unknown_key_ids_share_one_fetch() {
    let source = FixtureSource::new();
    let authenticator = key_set_authenticator(source.clone());

    let tokens: Vec<String> = (0..100)
        .map(|i| sign_rs256(&keycloak_claims(), Some(&format!("bogus-{i}"))))
        .collect();
    for token in &tokens {
        assert!(authenticator.authenticate(token).await.is_err());
    }
    assert_eq!(source.fetches(), 1);

    // The known key is answered from the same key set
    let token = sign_rs256(&keycloak_claims(), Some(KID));
    authenticator.authenticate(&token).await.unwrap();
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn test_tampered_payload_is_rejected() {
    let authenticator = key_set_authenticator(FixtureSource::new());
    let token = sign_rs256(&keycloak_claims(), Some(KID));
    let other = sign_rs256(&json!({"preferred_username": "mallory", "iss": ISSUER}), Some(KID));

    let parts: Vec<&str> = token.split('.').collect();
    let forged_payload = other.split('.').nth(1).unwrap();
    let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    assert!(authenticator.authenticate(&forged).await.is_err());
}

// ============================================================================
// SHARED SECRET MODE
// ============================================================================

#[tokio::test]
async fn test_hs256_composed_entry_point() {
    let config = AuthTokenConfig::new("sub", "roles").with_secret(SECRET);
    let verifier = TokenVerifier::new(&config).unwrap();
    let roles = role_config();

    let token = sign_hs256(&json!({"sub": "svc-billing", "roles": ["ACCOUNTING"]}), SECRET);
    let principal = verify_and_build_principal(&token, &roles, &verifier, &ClaimPaths::from(&config))
        .await
        .unwrap();

    assert_eq!(principal.username(), Some("svc-billing"));
    assert!(principal.is_authorized(&Resource::new("INVOICE"), &[ScopeType::Delete]));
    assert!(!principal.is_authorized(&Resource::new("ORDER"), &[ScopeType::Update]));
    assert!(principal.resource_ids_access().is_empty());

    let forged = sign_hs256(&json!({"sub": "svc-billing", "roles": ["ACCOUNTING"]}), "wrong");
    let err = verify_and_build_principal(&forged, &roles, &verifier, &ClaimPaths::from(&config))
        .await
        .unwrap_err();
    assert!(matches!(err, ViravaError::Authentication(_)));
}

#[tokio::test]
async fn test_rs256_token_rejected_in_secret_mode() {
    let config = AuthTokenConfig::new("preferred_username", "realm_access.roles").with_secret(SECRET);
    let authenticator = Authenticator::new(&config, role_config()).unwrap();

    let token = sign_rs256(&keycloak_claims(), Some(KID));
    assert!(authenticator.authenticate(&token).await.is_err());
}

#[tokio::test]
async fn test_guarded_operation_with_header() {
    let config = AuthTokenConfig::new("preferred_username", "realm_access.roles").with_secret(SECRET);
    let authenticator = Authenticator::new(&config, role_config()).unwrap();
    let token = sign_hs256(&keycloak_claims(), SECRET);

    let auth = authenticator
        .authenticate_header(&format!("Bearer {token}"))
        .await
        .unwrap();

    let update_order = SecuredOperation::new(Resource::new("ORDER"), [ScopeType::Update]);
    assert!(update_order.clone().with_instance_id(100).authorize(Some(&auth)).is_ok());
    assert!(matches!(
        update_order.with_instance_id(7).authorize(Some(&auth)),
        Err(ViravaError::AccessDenied(_))
    ));

    let missing = authenticator.authenticate_header("Basic abc").await.unwrap_err();
    assert!(matches!(missing, ViravaError::Authentication(_)));
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_authenticator_requires_exactly_one_key_source() {
    let both = AuthTokenConfig::new("sub", "roles")
        .with_secret(SECRET)
        .with_jwk_set_url("https://idp.example.com/certs");
    assert!(matches!(
        Authenticator::new(&both, role_config()),
        Err(ViravaError::Configuration(_))
    ));

    let neither = AuthTokenConfig::new("sub", "roles");
    assert!(matches!(
        Authenticator::new(&neither, role_config()),
        Err(ViravaError::Configuration(_))
    ));

    let with_source = TokenVerifier::with_jwk_source(&both, FixtureSource::new());
    assert!(matches!(with_source, Err(ViravaError::Configuration(_))));
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_authenticated_permissions_match_table(
        roles in prop::collection::vec(prop::sample::select(vec!["SALES", "ACCOUNTING", "GUEST"]), 0..4),
    ) {
        tokio_test::block_on(async {
            let config = AuthTokenConfig::new("sub", "roles").with_secret(SECRET);
            let table = role_config();
            let authenticator = Authenticator::new(&config, table.clone()).unwrap();

            let token = sign_hs256(&json!({"sub": "p", "roles": roles}), SECRET);
            let auth = authenticator.authenticate(&token).await.unwrap();

            assert_eq!(auth.principal().permissions(), table.resolve_permissions(&roles).as_slice());
        });
    }

    #[test]
    fn test_any_foreign_signature_is_rejected(secret in "[a-zA-Z0-9]{8,32}") {
        prop_assume!(secret != SECRET);

        tokio_test::block_on(async {
            let config = AuthTokenConfig::new("sub", "roles").with_secret(SECRET);
            let authenticator = Authenticator::new(&config, role_config()).unwrap();

            let token = sign_hs256(&json!({"sub": "p", "roles": ["SALES"]}), &secret);
            let err = authenticator.authenticate(&token).await.unwrap_err();
            assert!(matches!(err, ViravaError::Authentication(_)));
        });
    }
}
