//! Attestation Factory Contract for Chronicle
//!
//! Orchestrates attestation creation: validates the caller against its own
//! authorized set (distinct from the registry's), auto-registers every
//! participant wallet in the Main Registry, has the registry allocate and
//! index the new attestation id, and creates the ledger record with the
//! factory's current default verification threshold baked in. A panic in
//! any sub-step aborts the entire creation.

#![no_std]

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, Address, Env, String, Symbol, Vec,
};

/// Main registry client: WASM import for wasm32, crate client for host builds.
#[cfg(target_arch = "wasm32")]
mod registry_import {
    soroban_sdk::contractimport!(
        file = "../../target/wasm32-unknown-unknown/release/chronicle_main_registry.wasm"
    );
    pub use Client as MainRegistryContractClient;
}

#[cfg(target_arch = "wasm32")]
use registry_import::MainRegistryContractClient;

#[cfg(not(target_arch = "wasm32"))]
use chronicle_main_registry::MainRegistryContractClient;

/// Attestation ledger client: WASM import for wasm32, crate client for host builds.
#[cfg(target_arch = "wasm32")]
mod attestation_import {
    soroban_sdk::contractimport!(
        file = "../../target/wasm32-unknown-unknown/release/chronicle_attestation.wasm"
    );
    pub use Client as AttestationContractClient;
}

#[cfg(target_arch = "wasm32")]
use attestation_import::AttestationContractClient;

#[cfg(not(target_arch = "wasm32"))]
use chronicle_attestation::AttestationContractClient;

/// Data keys for contract storage
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Contract owner.
    Admin,
    /// Main registry address.
    Registry,
    /// Attestation ledger address.
    AttestationContract,
    /// Membership marker for the authorized-caller set.
    Authorized(Address),
    /// Default verification threshold baked into new records.
    VerificationThreshold,
}

/// Events
mod events {
    use super::*;

    pub fn emit_attestation_created(
        env: &Env,
        attestation_id: u64,
        attestation: &Address,
        authors: &Vec<Address>,
        contributors: &Vec<Address>,
    ) {
        const ATTESTATION_CREATED: Symbol = symbol_short!("att_new");
        env.events().publish(
            (ATTESTATION_CREATED, attestation_id),
            (attestation.clone(), authors.clone(), contributors.clone()),
        );
    }

    pub fn emit_verification_threshold_updated(env: &Env, old_threshold: i128, new_threshold: i128) {
        const THRESHOLD_UPDATED: Symbol = symbol_short!("vthresh");
        env.events()
            .publish((THRESHOLD_UPDATED,), (old_threshold, new_threshold));
    }

    pub fn emit_authorized_added(env: &Env, account: &Address) {
        const AUTHORIZED_ADDED: Symbol = symbol_short!("auth_add");
        env.events().publish((AUTHORIZED_ADDED,), account.clone());
    }

    pub fn emit_authorized_removed(env: &Env, account: &Address) {
        const AUTHORIZED_REMOVED: Symbol = symbol_short!("auth_rem");
        env.events().publish((AUTHORIZED_REMOVED,), account.clone());
    }

    pub fn emit_ownership_transferred(env: &Env, old_owner: &Address, new_owner: &Address) {
        const OWNERSHIP_TRANSFERRED: Symbol = symbol_short!("own_xfer");
        env.events()
            .publish((OWNERSHIP_TRANSFERRED, old_owner.clone()), new_owner.clone());
    }
}

/// Access control
mod access_control {
    use super::*;

    pub fn get_owner(env: &Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::Admin)
            .expect("not initialized")
    }

    pub fn require_owner(env: &Env, caller: &Address) {
        let owner = get_owner(env);
        assert!(*caller == owner, "caller is not the owner");
    }

    pub fn is_authorized(env: &Env, account: &Address) -> bool {
        env.storage()
            .instance()
            .has(&DataKey::Authorized(account.clone()))
    }

    pub fn require_authorized(env: &Env, caller: &Address) {
        assert!(is_authorized(env, caller), "caller is not authorized");
    }
}

#[contract]
pub struct AttestationFactoryContract;

#[contractimpl]
impl AttestationFactoryContract {
    // ── Initialization ──────────────────────────────────────────────

    /// One-time contract initialization. After deployment the factory's
    /// own address must be authorized on both the registry and the
    /// ledger before `create_attestation` can succeed.
    pub fn initialize(
        env: Env,
        admin: Address,
        registry: Address,
        attestation_contract: Address,
        verification_threshold: i128,
    ) {
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();
        assert!(
            verification_threshold > 0,
            "threshold must be greater than zero"
        );

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Registry, &registry);
        env.storage()
            .instance()
            .set(&DataKey::AttestationContract, &attestation_contract);
        env.storage()
            .instance()
            .set(&DataKey::VerificationThreshold, &verification_threshold);
        env.storage()
            .instance()
            .set(&DataKey::Authorized(admin.clone()), &());
    }

    // ── Ownership and authorization ─────────────────────────────────

    /// Add an address to the authorized-caller set. Owner only.
    pub fn add_authorized_address(env: Env, caller: Address, account: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        env.storage()
            .instance()
            .set(&DataKey::Authorized(account.clone()), &());
        events::emit_authorized_added(&env, &account);
    }

    /// Remove an address from the authorized-caller set. Owner only.
    pub fn remove_authorized_address(env: Env, caller: Address, account: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        env.storage()
            .instance()
            .remove(&DataKey::Authorized(account.clone()));
        events::emit_authorized_removed(&env, &account);
    }

    /// Transfer contract ownership. Owner only.
    pub fn transfer_ownership(env: Env, caller: Address, new_owner: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        env.storage().instance().set(&DataKey::Admin, &new_owner);
        events::emit_ownership_transferred(&env, &caller, &new_owner);
    }

    /// Update the default verification threshold for records created from
    /// now on. Owner only; existing records keep the value they were
    /// created with.
    pub fn set_verification_threshold(env: Env, caller: Address, new_threshold: i128) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        assert!(new_threshold > 0, "threshold must be greater than zero");

        let old_threshold: i128 = env
            .storage()
            .instance()
            .get(&DataKey::VerificationThreshold)
            .expect("not initialized");
        env.storage()
            .instance()
            .set(&DataKey::VerificationThreshold, &new_threshold);
        events::emit_verification_threshold_updated(&env, old_threshold, new_threshold);
    }

    // ── Creation ────────────────────────────────────────────────────

    /// Create a new attestation.
    ///
    /// The caller must be in the factory's authorized set. Every wallet in
    /// authors and contributors is registered in the Main Registry if it
    /// is not already (with an empty name); the registry then allocates
    /// the attestation id and appends it to every participant's index,
    /// rejecting the whole creation if any wallet is at its cap. Finally
    /// the ledger record is created with the factory's current default
    /// verification threshold, which stays fixed for that record.
    #[allow(clippy::too_many_arguments)]
    pub fn create_attestation(
        env: Env,
        caller: Address,
        authors: Vec<Address>,
        contributors: Vec<Address>,
        ipfs_hash: String,
        quoted_attestation_ids: Vec<u64>,
        tags: Vec<String>,
        co_publish_threshold: i128,
    ) -> u64 {
        caller.require_auth();
        access_control::require_authorized(&env, &caller);
        assert!(!authors.is_empty(), "authors cannot be empty");

        let mut participants = Vec::new(&env);
        for author in authors.iter() {
            participants.push_back(author);
        }
        for contributor in contributors.iter() {
            participants.push_back(contributor);
        }
        for i in 0..participants.len() {
            for j in (i + 1)..participants.len() {
                assert!(
                    participants.get(i).unwrap() != participants.get(j).unwrap(),
                    "duplicate participant"
                );
            }
        }

        let this = env.current_contract_address();
        let registry_address: Address = env
            .storage()
            .instance()
            .get(&DataKey::Registry)
            .expect("not initialized");
        let attestation_address: Address = env
            .storage()
            .instance()
            .get(&DataKey::AttestationContract)
            .expect("not initialized");
        let verification_threshold: i128 = env
            .storage()
            .instance()
            .get(&DataKey::VerificationThreshold)
            .expect("not initialized");

        let registry = MainRegistryContractClient::new(&env, &registry_address);
        for wallet in participants.iter() {
            registry.ensure_registered(&this, &wallet);
        }

        let attestation_id = registry.add_attestation(&this, &attestation_address, &participants);

        let ledger = AttestationContractClient::new(&env, &attestation_address);
        ledger.create_attestation(
            &this,
            &attestation_id,
            &authors,
            &contributors,
            &ipfs_hash,
            &quoted_attestation_ids,
            &tags,
            &co_publish_threshold,
            &verification_threshold,
        );

        events::emit_attestation_created(
            &env,
            attestation_id,
            &attestation_address,
            &authors,
            &contributors,
        );
        attestation_id
    }

    // ── Read-only queries ───────────────────────────────────────────

    /// Return the current default verification threshold.
    pub fn get_verification_threshold(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::VerificationThreshold)
            .expect("not initialized")
    }

    /// Return the configured main registry address.
    pub fn get_registry(env: Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::Registry)
            .expect("not initialized")
    }

    /// Return the configured attestation ledger address.
    pub fn get_attestation_contract(env: Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::AttestationContract)
            .expect("not initialized")
    }

    /// Check membership of the authorized-caller set.
    pub fn is_authorized(env: Env, account: Address) -> bool {
        access_control::is_authorized(&env, &account)
    }

    /// Return the contract owner.
    pub fn get_admin(env: Env) -> Address {
        access_control::get_owner(&env)
    }
}

#[cfg(test)]
mod test;
