//! Attestation Factory Contract Tests
//!
//! End-to-end creation flow across all three contracts: factory
//! authorization, participant auto-registration, registry id allocation and
//! indexing, ledger record creation, and the verification-threshold
//! snapshot. Mirrors the shape of the registry and ledger suites.

#![cfg(test)]

extern crate std;

use soroban_sdk::testutils::{Address as _, Events};
use soroban_sdk::{Address, Env, String, Vec};

use chronicle_attestation::{AttestationContract, AttestationContractClient};
use chronicle_main_registry::{MainRegistryContract, MainRegistryContractClient};

use crate::*;

// ============================================================================
// Test Helpers
// ============================================================================

const CO_PUBLISH_THRESHOLD: i128 = 100;
const VERIFICATION_THRESHOLD: i128 = 1_000;

struct TestContext {
    env: Env,
    factory: AttestationFactoryContractClient<'static>,
    ledger: AttestationContractClient<'static>,
    registry: MainRegistryContractClient<'static>,
    admin: Address,
    creator: Address,
}

/// Deploy token + registry + ledger + factory, authorize the factory on
/// the registry and the ledger, and authorize a creator on the factory.
fn setup() -> TestContext {
    let env = Env::default();
    env.mock_all_auths();

    let admin = Address::generate(&env);

    let token_admin = Address::generate(&env);
    let token = env
        .register_stellar_asset_contract_v2(token_admin)
        .address();

    let registry_id = env.register(MainRegistryContract, ());
    let registry = MainRegistryContractClient::new(&env, &registry_id);
    registry.initialize(&admin);

    let ledger_id = env.register(AttestationContract, ());
    let ledger = AttestationContractClient::new(&env, &ledger_id);
    ledger.initialize(&admin, &registry_id, &token);

    let factory_id = env.register(AttestationFactoryContract, ());
    let factory = AttestationFactoryContractClient::new(&env, &factory_id);
    factory.initialize(&admin, &registry_id, &ledger_id, &VERIFICATION_THRESHOLD);

    registry.add_authorized_address(&admin, &factory_id);
    ledger.add_authorized_address(&admin, &factory_id);

    let creator = Address::generate(&env);
    factory.add_authorized_address(&admin, &creator);

    TestContext {
        env,
        factory,
        ledger,
        registry,
        admin,
        creator,
    }
}

fn addresses(env: &Env, n: u32) -> std::vec::Vec<Address> {
    (0..n).map(|_| Address::generate(env)).collect()
}

fn address_vec(env: &Env, addrs: &[Address]) -> Vec<Address> {
    let mut v = Vec::new(env);
    for a in addrs {
        v.push_back(a.clone());
    }
    v
}

/// Create an attestation through the factory with default thresholds.
fn create(ctx: &TestContext, authors: &[Address], contributors: &[Address]) -> u64 {
    ctx.factory.create_attestation(
        &ctx.creator,
        &address_vec(&ctx.env, authors),
        &address_vec(&ctx.env, contributors),
        &String::from_str(&ctx.env, "QmTest"),
        &Vec::new(&ctx.env),
        &Vec::new(&ctx.env),
        &CO_PUBLISH_THRESHOLD,
    )
}

// ============================================================================
// Creation Flow Tests
// ============================================================================

#[test]
fn test_create_attestation_end_to_end() {
    let ctx = setup();
    let p = addresses(&ctx.env, 4);
    let authors = &p[0..2];
    let contributors = &p[2..4];

    let mut quoted = Vec::new(&ctx.env);
    quoted.push_back(1u64);
    quoted.push_back(2u64);
    let mut tags = Vec::new(&ctx.env);
    tags.push_back(String::from_str(&ctx.env, "tag1"));
    tags.push_back(String::from_str(&ctx.env, "tag2"));

    let id = ctx.factory.create_attestation(
        &ctx.creator,
        &address_vec(&ctx.env, authors),
        &address_vec(&ctx.env, contributors),
        &String::from_str(&ctx.env, "QmContent"),
        &quoted,
        &tags,
        &CO_PUBLISH_THRESHOLD,
    );
    assert_eq!(id, 1);

    // Every participant wallet was auto-registered and indexed.
    for wallet in &p {
        assert!(ctx.registry.wallet_to_user_id(wallet) != 0);
        assert_eq!(ctx.registry.get_wallet_attestation_count(wallet), 1);
        let page = ctx.registry.get_wallet_attestations(wallet, &0, &10);
        assert_eq!(page.get(0).unwrap(), id);
    }

    // The registry maps the id to the ledger contract.
    assert_eq!(
        ctx.registry.get_attestation_address(&id),
        Some(ctx.ledger.address.clone())
    );

    // The ledger record carries the construction arguments.
    let record = ctx.ledger.get_attestation(&id).unwrap();
    assert_eq!(record.ipfs_hash, String::from_str(&ctx.env, "QmContent"));
    assert_eq!(record.authors, address_vec(&ctx.env, authors));
    assert_eq!(record.contributors, address_vec(&ctx.env, contributors));
    assert_eq!(record.quoted_attestation_ids, quoted);
    assert_eq!(record.tags, tags);
    assert_eq!(record.co_publish_threshold, CO_PUBLISH_THRESHOLD);
    assert_eq!(record.verification_threshold, VERIFICATION_THRESHOLD);

    // The first author is signed at creation.
    assert!(ctx.ledger.has_signed(&id, &p[0]));
    assert!(!record.is_activated);
}

#[test]
fn test_created_attestation_signs_and_activates() {
    let ctx = setup();
    let p = addresses(&ctx.env, 2);
    let id = create(&ctx, &p[0..1], &p[1..2]);

    assert!(ctx.ledger.has_signed(&id, &p[0]));
    ctx.ledger.sign(&p[1], &id);

    assert!(ctx.ledger.has_signed(&id, &p[1]));
    assert!(ctx.ledger.get_attestation(&id).unwrap().is_activated);
}

#[test]
fn test_sequential_ids_across_creations() {
    let ctx = setup();
    let p = addresses(&ctx.env, 2);

    assert_eq!(create(&ctx, &p[0..1], &[]), 1);
    assert_eq!(create(&ctx, &p[1..2], &[]), 2);
    assert_eq!(ctx.registry.get_attestation_count(), 2);
}

#[test]
fn test_create_reuses_existing_registrations() {
    let ctx = setup();
    let author = Address::generate(&ctx.env);
    ctx.registry.ensure_registered(&ctx.admin, &author);
    let user_id = ctx.registry.wallet_to_user_id(&author);
    let users_before = ctx.registry.get_user_count();

    create(&ctx, &[author.clone()], &[]);

    // No duplicate user for the pre-registered wallet.
    assert_eq!(ctx.registry.wallet_to_user_id(&author), user_id);
    assert_eq!(ctx.registry.get_user_count(), users_before);
}

#[test]
#[should_panic(expected = "caller is not authorized")]
fn test_create_requires_factory_authorization() {
    let ctx = setup();
    let stranger = Address::generate(&ctx.env);
    ctx.factory.create_attestation(
        &stranger,
        &address_vec(&ctx.env, &[stranger.clone()]),
        &Vec::new(&ctx.env),
        &String::from_str(&ctx.env, "QmTest"),
        &Vec::new(&ctx.env),
        &Vec::new(&ctx.env),
        &CO_PUBLISH_THRESHOLD,
    );
}

#[test]
#[should_panic(expected = "authors cannot be empty")]
fn test_create_without_authors_panics() {
    let ctx = setup();
    let contributor = Address::generate(&ctx.env);
    ctx.factory.create_attestation(
        &ctx.creator,
        &Vec::new(&ctx.env),
        &address_vec(&ctx.env, &[contributor]),
        &String::from_str(&ctx.env, "QmTest"),
        &Vec::new(&ctx.env),
        &Vec::new(&ctx.env),
        &CO_PUBLISH_THRESHOLD,
    );
}

#[test]
#[should_panic(expected = "duplicate participant")]
fn test_create_rejects_duplicate_participant() {
    let ctx = setup();
    let both = Address::generate(&ctx.env);
    ctx.factory.create_attestation(
        &ctx.creator,
        &address_vec(&ctx.env, &[both.clone()]),
        &address_vec(&ctx.env, &[both]),
        &String::from_str(&ctx.env, "QmTest"),
        &Vec::new(&ctx.env),
        &Vec::new(&ctx.env),
        &CO_PUBLISH_THRESHOLD,
    );
}

#[test]
fn test_creation_aborts_when_wallet_at_cap() {
    let ctx = setup();
    let saturated = Address::generate(&ctx.env);

    // Saturate the wallet's index directly through the registry.
    let mut solo = Vec::new(&ctx.env);
    solo.push_back(saturated.clone());
    for _ in 0..chronicle_main_registry::MAX_ATTESTATIONS_PER_WALLET {
        ctx.registry
            .add_attestation(&ctx.admin, &ctx.ledger.address, &solo);
    }
    let count_before = ctx.registry.get_attestation_count();

    let res = ctx.factory.try_create_attestation(
        &ctx.creator,
        &address_vec(&ctx.env, &[saturated.clone()]),
        &Vec::new(&ctx.env),
        &String::from_str(&ctx.env, "QmTest"),
        &Vec::new(&ctx.env),
        &Vec::new(&ctx.env),
        &CO_PUBLISH_THRESHOLD,
    );
    assert!(res.is_err());

    // Nothing was allocated and no ledger record exists past the count.
    assert_eq!(ctx.registry.get_attestation_count(), count_before);
    assert_eq!(ctx.ledger.get_attestation(&(count_before + 1)), None);
}

// ============================================================================
// Verification Threshold Tests
// ============================================================================

#[test]
fn test_threshold_snapshot_per_record() {
    let ctx = setup();
    let p = addresses(&ctx.env, 2);

    let first = create(&ctx, &p[0..1], &[]);
    ctx.factory
        .set_verification_threshold(&ctx.admin, &(VERIFICATION_THRESHOLD * 5));
    let second = create(&ctx, &p[1..2], &[]);

    // Existing records keep the threshold they were created with; later
    // factory-level changes only affect new records.
    assert_eq!(
        ctx.ledger.get_attestation(&first).unwrap().verification_threshold,
        VERIFICATION_THRESHOLD
    );
    assert_eq!(
        ctx.ledger.get_attestation(&second).unwrap().verification_threshold,
        VERIFICATION_THRESHOLD * 5
    );
    assert_eq!(
        ctx.factory.get_verification_threshold(),
        VERIFICATION_THRESHOLD * 5
    );
}

#[test]
#[should_panic(expected = "caller is not the owner")]
fn test_set_threshold_requires_owner() {
    let ctx = setup();
    ctx.factory
        .set_verification_threshold(&ctx.creator, &2_000);
}

#[test]
#[should_panic(expected = "threshold must be greater than zero")]
fn test_set_threshold_rejects_zero() {
    let ctx = setup();
    ctx.factory.set_verification_threshold(&ctx.admin, &0);
}

// ============================================================================
// Ownership and Authorization Tests
// ============================================================================

#[test]
fn test_owner_manages_authorized_set() {
    let ctx = setup();
    let account = Address::generate(&ctx.env);

    assert!(!ctx.factory.is_authorized(&account));
    ctx.factory.add_authorized_address(&ctx.admin, &account);
    assert!(ctx.factory.is_authorized(&account));

    ctx.factory.remove_authorized_address(&ctx.admin, &account);
    assert!(!ctx.factory.is_authorized(&account));
}

#[test]
#[should_panic(expected = "caller is not the owner")]
fn test_non_owner_cannot_add_authorized() {
    let ctx = setup();
    ctx.factory
        .add_authorized_address(&ctx.creator, &Address::generate(&ctx.env));
}

#[test]
#[should_panic(expected = "caller is not the owner")]
fn test_non_owner_cannot_remove_authorized() {
    let ctx = setup();
    ctx.factory
        .remove_authorized_address(&ctx.creator, &ctx.creator);
}

#[test]
fn test_transfer_ownership() {
    let ctx = setup();
    let new_owner = Address::generate(&ctx.env);

    ctx.factory.transfer_ownership(&ctx.admin, &new_owner);
    assert_eq!(ctx.factory.get_admin(), new_owner);

    assert!(ctx
        .factory
        .try_set_verification_threshold(&ctx.admin, &2_000)
        .is_err());
    ctx.factory.set_verification_threshold(&new_owner, &2_000);
    assert_eq!(ctx.factory.get_verification_threshold(), 2_000);
}

#[test]
#[should_panic(expected = "already initialized")]
fn test_initialize_twice_panics() {
    let ctx = setup();
    ctx.factory.initialize(
        &ctx.admin,
        &ctx.registry.address,
        &ctx.ledger.address,
        &VERIFICATION_THRESHOLD,
    );
}

// ============================================================================
// Event Tests
// ============================================================================

#[test]
fn test_creation_publishes_events() {
    let ctx = setup();
    let author = Address::generate(&ctx.env);
    create(&ctx, &[author], &[]);
    assert!(!ctx.env.events().all().is_empty());
}
