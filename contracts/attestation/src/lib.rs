//! Attestation Ledger Contract for Chronicle
//!
//! Holds one record per attestation, keyed by the sequential id the Main
//! Registry allocates: the participant sets, the signature/activation
//! workflow, donation accounting, co-publisher promotion, upvotes, and
//! gated fund claims. Records are created by the authorized factory and
//! persist indefinitely; activation is a one-way latch.
//!
//! Funds move in the token configured at initialization. Donations are
//! split evenly among the current participants with floor division; the
//! remainder of a non-divisible split stays on the contract's token
//! balance and is credited to no one. Claims zero the claimer's balance
//! before the outbound transfer.

#![no_std]

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, String, Symbol, Vec,
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

/// One attestation: immutable content fields, mutable participant sets,
/// and the signature/funding/engagement counters.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttestationRecord {
    pub authors: Vec<Address>,
    pub contributors: Vec<Address>,
    pub ipfs_hash: String,
    pub quoted_attestation_ids: Vec<u64>,
    pub tags: Vec<String>,
    /// Donation size that promotes the donor to co-publisher. Author-mutable.
    pub co_publish_threshold: i128,
    /// Cumulative-donation level past which only verified authors may
    /// claim. Baked in at creation; never changes for this record.
    pub verification_threshold: i128,
    pub signature_count: u32,
    pub is_activated: bool,
    pub upvote_count: u32,
    pub total_received_funds: i128,
}

/// Data keys for contract storage
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Contract owner.
    Admin,
    /// Main registry address, read for wallet verification.
    Registry,
    /// Funding token address.
    Token,
    /// Membership marker for the authorized-creator set.
    Authorized(Address),
    /// attestation id -> AttestationRecord
    Record(u64),
    /// (attestation id, address) -> signed flag
    HasSigned(u64, Address),
    /// (attestation id, address) -> upvoted flag
    HasUpvoted(u64, Address),
    /// (attestation id, address) -> co-publisher flag
    IsCoPublisher(u64, Address),
    /// attestation id -> append-only co-publisher list
    CoPublishers(u64),
    /// (attestation id, address) -> unclaimed balance
    UnclaimedFunds(u64, Address),
}

/// Even donation share per recipient, floor division. The remainder
/// (`amount - compute_share(amount, recipients) * recipients`) is retained
/// by the contract balance, never credited.
pub fn compute_share(amount: i128, recipients: u32) -> i128 {
    if recipients == 0 {
        return 0;
    }
    amount / recipients as i128
}

/// Events
mod events {
    use super::*;

    pub fn emit_attestation_initialized(env: &Env, attestation_id: u64) {
        const ATTESTATION_INITIALIZED: Symbol = symbol_short!("att_init");
        env.events().publish((ATTESTATION_INITIALIZED,), attestation_id);
    }

    pub fn emit_contributor_signed(env: &Env, attestation_id: u64, signer: &Address) {
        const CONTRIBUTOR_SIGNED: Symbol = symbol_short!("signed");
        env.events()
            .publish((CONTRIBUTOR_SIGNED, attestation_id), signer.clone());
    }

    pub fn emit_attestation_activated(env: &Env, attestation_id: u64) {
        const ATTESTATION_ACTIVATED: Symbol = symbol_short!("activated");
        env.events().publish((ATTESTATION_ACTIVATED,), attestation_id);
    }

    pub fn emit_funds_received(env: &Env, attestation_id: u64, sender: &Address, amount: i128) {
        const FUNDS_RECEIVED: Symbol = symbol_short!("funds_in");
        env.events()
            .publish((FUNDS_RECEIVED, attestation_id), (sender.clone(), amount));
    }

    pub fn emit_co_publisher_added(env: &Env, attestation_id: u64, co_publisher: &Address) {
        const CO_PUBLISHER_ADDED: Symbol = symbol_short!("co_pub");
        env.events()
            .publish((CO_PUBLISHER_ADDED, attestation_id), co_publisher.clone());
    }

    pub fn emit_upvoted(env: &Env, attestation_id: u64, upvoter: &Address) {
        const UPVOTED: Symbol = symbol_short!("upvote");
        env.events()
            .publish((UPVOTED, attestation_id), upvoter.clone());
    }

    pub fn emit_funds_claimed(env: &Env, attestation_id: u64, claimer: &Address, amount: i128) {
        const FUNDS_CLAIMED: Symbol = symbol_short!("claimed");
        env.events()
            .publish((FUNDS_CLAIMED, attestation_id), (claimer.clone(), amount));
    }

    pub fn emit_affiliation_revoked(env: &Env, attestation_id: u64, participant: &Address) {
        const AFFILIATION_REVOKED: Symbol = symbol_short!("revoked");
        env.events()
            .publish((AFFILIATION_REVOKED, attestation_id), participant.clone());
    }

    pub fn emit_co_publish_threshold_updated(
        env: &Env,
        attestation_id: u64,
        old_threshold: i128,
        new_threshold: i128,
    ) {
        const THRESHOLD_UPDATED: Symbol = symbol_short!("thresh");
        env.events().publish(
            (THRESHOLD_UPDATED, attestation_id),
            (old_threshold, new_threshold),
        );
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

/// Storage helpers
mod storage {
    use super::*;

    pub fn get_record(env: &Env, attestation_id: u64) -> AttestationRecord {
        env.storage()
            .instance()
            .get(&DataKey::Record(attestation_id))
            .expect("attestation not found")
    }

    pub fn try_get_record(env: &Env, attestation_id: u64) -> Option<AttestationRecord> {
        env.storage().instance().get(&DataKey::Record(attestation_id))
    }

    pub fn set_record(env: &Env, attestation_id: u64, record: &AttestationRecord) {
        env.storage()
            .instance()
            .set(&DataKey::Record(attestation_id), record);
    }

    pub fn has_signed(env: &Env, attestation_id: u64, who: &Address) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::HasSigned(attestation_id, who.clone()))
            .unwrap_or(false)
    }

    pub fn set_signed(env: &Env, attestation_id: u64, who: &Address) {
        env.storage()
            .instance()
            .set(&DataKey::HasSigned(attestation_id, who.clone()), &true);
    }

    pub fn has_upvoted(env: &Env, attestation_id: u64, who: &Address) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::HasUpvoted(attestation_id, who.clone()))
            .unwrap_or(false)
    }

    pub fn is_co_publisher(env: &Env, attestation_id: u64, who: &Address) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::IsCoPublisher(attestation_id, who.clone()))
            .unwrap_or(false)
    }

    pub fn co_publishers(env: &Env, attestation_id: u64) -> Vec<Address> {
        env.storage()
            .instance()
            .get(&DataKey::CoPublishers(attestation_id))
            .unwrap_or(Vec::new(env))
    }

    pub fn unclaimed_funds(env: &Env, attestation_id: u64, who: &Address) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::UnclaimedFunds(attestation_id, who.clone()))
            .unwrap_or(0)
    }

    pub fn set_unclaimed_funds(env: &Env, attestation_id: u64, who: &Address, amount: i128) {
        env.storage()
            .instance()
            .set(&DataKey::UnclaimedFunds(attestation_id, who.clone()), &amount);
    }

    pub fn registry(env: &Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::Registry)
            .expect("not initialized")
    }

    pub fn token(env: &Env) -> Address {
        env.storage()
            .instance()
            .get(&DataKey::Token)
            .expect("not initialized")
    }
}

/// Participant-set helpers
mod participants {
    use super::*;

    pub fn is_author(record: &AttestationRecord, who: &Address) -> bool {
        record.authors.contains(who.clone())
    }

    /// Membership of either set.
    pub fn is_participant(record: &AttestationRecord, who: &Address) -> bool {
        record.contributors.contains(who.clone()) || is_author(record, who)
    }

    pub fn total(record: &AttestationRecord) -> u32 {
        record.authors.len() + record.contributors.len()
    }

    /// Swap-with-last-and-pop removal. O(1); the relative order of the
    /// remaining entries is not preserved, and that ordering is observable
    /// through the list getters.
    pub fn swap_remove(list: &mut Vec<Address>, who: &Address) -> bool {
        match list.first_index_of(who.clone()) {
            Some(index) => {
                let last = list.len() - 1;
                let tail = list.get(last).unwrap();
                list.set(index, tail);
                list.pop_back();
                true
            }
            None => false,
        }
    }
}

#[contract]
pub struct AttestationContract;

#[contractimpl]
impl AttestationContract {
    // ── Initialization ──────────────────────────────────────────────

    /// One-time contract initialization. Stores the owner, the main
    /// registry used for wallet-verification reads, and the funding
    /// token. The owner starts authorized; the factory is added by the
    /// owner after deployment.
    pub fn initialize(env: Env, admin: Address, registry: Address, token: Address) {
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        admin.require_auth();
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Registry, &registry);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::Authorized(admin.clone()), &());
    }

    // ── Ownership and authorization ─────────────────────────────────

    /// Add an address to the authorized-creator set. Owner only.
    pub fn add_authorized_address(env: Env, caller: Address, account: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        env.storage()
            .instance()
            .set(&DataKey::Authorized(account.clone()), &());
        events::emit_authorized_added(&env, &account);
    }

    /// Remove an address from the authorized-creator set. Owner only.
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

    // ── Record creation ─────────────────────────────────────────────

    /// Create the record for a registry-allocated attestation id.
    /// Authorized only; the factory is the expected sole caller in normal
    /// operation.
    ///
    /// The first author is force-signed through the same path as `sign`,
    /// so a one-participant attestation activates at creation. The
    /// verification threshold passed here is fixed for the record's
    /// lifetime regardless of later factory-level changes.
    #[allow(clippy::too_many_arguments)]
    pub fn create_attestation(
        env: Env,
        caller: Address,
        attestation_id: u64,
        authors: Vec<Address>,
        contributors: Vec<Address>,
        ipfs_hash: String,
        quoted_attestation_ids: Vec<u64>,
        tags: Vec<String>,
        co_publish_threshold: i128,
        verification_threshold: i128,
    ) {
        caller.require_auth();
        access_control::require_authorized(&env, &caller);

        assert!(
            storage::try_get_record(&env, attestation_id).is_none(),
            "attestation id already exists"
        );
        assert!(!authors.is_empty(), "authors cannot be empty");
        assert!(
            co_publish_threshold > 0,
            "threshold must be greater than zero"
        );
        assert!(
            verification_threshold > 0,
            "threshold must be greater than zero"
        );

        // An address may appear in at most one of the two sets, once.
        let mut union = Vec::new(&env);
        for author in authors.iter() {
            union.push_back(author);
        }
        for contributor in contributors.iter() {
            union.push_back(contributor);
        }
        for i in 0..union.len() {
            for j in (i + 1)..union.len() {
                assert!(
                    union.get(i).unwrap() != union.get(j).unwrap(),
                    "duplicate participant"
                );
            }
        }

        let mut record = AttestationRecord {
            authors: authors.clone(),
            contributors,
            ipfs_hash,
            quoted_attestation_ids,
            tags,
            co_publish_threshold,
            verification_threshold,
            signature_count: 0,
            is_activated: false,
            upvote_count: 0,
            total_received_funds: 0,
        };
        events::emit_attestation_initialized(&env, attestation_id);

        let first_author = authors.get(0).unwrap();
        Self::sign_internal(&env, attestation_id, &mut record, &first_author);
        storage::set_record(&env, attestation_id, &record);
    }

    // ── Signature workflow ──────────────────────────────────────────

    /// Sign the attestation as a participant. When the last participant
    /// signs, activation latches irreversibly; the order of signing does
    /// not matter.
    pub fn sign(env: Env, caller: Address, attestation_id: u64) {
        caller.require_auth();
        let mut record = storage::get_record(&env, attestation_id);
        assert!(!record.is_activated, "attestation already activated");
        assert!(
            participants::is_participant(&record, &caller),
            "not a contributor or author"
        );

        Self::sign_internal(&env, attestation_id, &mut record, &caller);
        storage::set_record(&env, attestation_id, &record);
    }

    // ── Funding ─────────────────────────────────────────────────────

    /// Donate to the attestation's participants.
    ///
    /// Transfers `amount` of the funding token from the donor to the
    /// contract, credits each current participant an even floor share, and
    /// bumps the running total by the full amount. A donation at or above
    /// the co-publish threshold records the donor as a co-publisher, once.
    pub fn donate(env: Env, from: Address, attestation_id: u64, amount: i128) {
        from.require_auth();
        let mut record = storage::get_record(&env, attestation_id);
        assert!(amount > 0, "no funds sent");

        let total = participants::total(&record);
        assert!(total > 0, "no participants to receive funds");

        let token_client = token::Client::new(&env, &storage::token(&env));
        token_client.transfer(&from, &env.current_contract_address(), &amount);

        // Contributors first, then authors.
        let share = compute_share(amount, total);
        for contributor in record.contributors.iter() {
            let balance = storage::unclaimed_funds(&env, attestation_id, &contributor);
            storage::set_unclaimed_funds(&env, attestation_id, &contributor, balance + share);
        }
        for author in record.authors.iter() {
            let balance = storage::unclaimed_funds(&env, attestation_id, &author);
            storage::set_unclaimed_funds(&env, attestation_id, &author, balance + share);
        }
        record.total_received_funds += amount;

        events::emit_funds_received(&env, attestation_id, &from, amount);

        if amount >= record.co_publish_threshold
            && !storage::is_co_publisher(&env, attestation_id, &from)
        {
            env.storage()
                .instance()
                .set(&DataKey::IsCoPublisher(attestation_id, from.clone()), &true);
            let mut co_publishers = storage::co_publishers(&env, attestation_id);
            co_publishers.push_back(from.clone());
            env.storage()
                .instance()
                .set(&DataKey::CoPublishers(attestation_id), &co_publishers);
            events::emit_co_publisher_added(&env, attestation_id, &from);
        }

        storage::set_record(&env, attestation_id, &record);
    }

    /// Update the co-publish threshold. Author only; must stay positive.
    pub fn set_co_publish_threshold(
        env: Env,
        caller: Address,
        attestation_id: u64,
        new_threshold: i128,
    ) {
        caller.require_auth();
        let mut record = storage::get_record(&env, attestation_id);
        assert!(participants::is_author(&record, &caller), "not an author");
        assert!(new_threshold > 0, "threshold must be greater than zero");

        let old_threshold = record.co_publish_threshold;
        record.co_publish_threshold = new_threshold;
        storage::set_record(&env, attestation_id, &record);
        events::emit_co_publish_threshold_updated(&env, attestation_id, old_threshold, new_threshold);
    }

    /// Claim the caller's accumulated share.
    ///
    /// The caller must currently be a participant with a positive balance.
    /// Once cumulative donations reach the record's verification threshold,
    /// only verified authors may claim (the registry is consulted
    /// read-only). The balance is zeroed before the outbound transfer.
    pub fn claim_funds(env: Env, caller: Address, attestation_id: u64) {
        caller.require_auth();
        let record = storage::get_record(&env, attestation_id);
        assert!(
            participants::is_participant(&record, &caller),
            "not a contributor or author"
        );

        let amount = storage::unclaimed_funds(&env, attestation_id, &caller);
        assert!(amount > 0, "no funds to claim");

        if record.total_received_funds >= record.verification_threshold {
            assert!(
                Self::is_verified_author(&env, &record, &caller),
                "author needs to be verified"
            );
        }

        storage::set_unclaimed_funds(&env, attestation_id, &caller, 0);
        let token_client = token::Client::new(&env, &storage::token(&env));
        token_client.transfer(&env.current_contract_address(), &caller, &amount);

        events::emit_funds_claimed(&env, attestation_id, &caller, amount);
    }

    // ── Engagement ──────────────────────────────────────────────────

    /// Record a one-time, permanent upvote from the caller.
    pub fn upvote(env: Env, caller: Address, attestation_id: u64) {
        caller.require_auth();
        let mut record = storage::get_record(&env, attestation_id);
        assert!(
            !storage::has_upvoted(&env, attestation_id, &caller),
            "already upvoted"
        );

        env.storage()
            .instance()
            .set(&DataKey::HasUpvoted(attestation_id, caller.clone()), &true);
        record.upvote_count += 1;
        storage::set_record(&env, attestation_id, &record);
        events::emit_upvoted(&env, attestation_id, &caller);
    }

    // ── Revocation ──────────────────────────────────────────────────

    /// Withdraw from the attestation before signing. Removes the caller
    /// from whichever participant set holds it (swap-with-last-and-pop)
    /// and forfeits any unclaimed balance; forfeited funds are not
    /// redistributed. Rejected after the caller has signed.
    pub fn revoke_affiliation(env: Env, caller: Address, attestation_id: u64) {
        caller.require_auth();
        let mut record = storage::get_record(&env, attestation_id);
        assert!(
            participants::is_participant(&record, &caller),
            "not a contributor or author"
        );
        assert!(
            !storage::has_signed(&env, attestation_id, &caller),
            "cannot revoke after signing"
        );

        if !participants::swap_remove(&mut record.contributors, &caller) {
            participants::swap_remove(&mut record.authors, &caller);
        }
        storage::set_unclaimed_funds(&env, attestation_id, &caller, 0);
        storage::set_record(&env, attestation_id, &record);
        events::emit_affiliation_revoked(&env, attestation_id, &caller);
    }

    // ── Read-only queries ───────────────────────────────────────────

    /// Return the full record for an attestation id, if any.
    pub fn get_attestation(env: Env, attestation_id: u64) -> Option<AttestationRecord> {
        storage::try_get_record(&env, attestation_id)
    }

    /// Return the current author list.
    pub fn get_authors(env: Env, attestation_id: u64) -> Vec<Address> {
        storage::get_record(&env, attestation_id).authors
    }

    /// Return the current contributor list.
    pub fn get_contributors(env: Env, attestation_id: u64) -> Vec<Address> {
        storage::get_record(&env, attestation_id).contributors
    }

    /// Return the tag list.
    pub fn get_tags(env: Env, attestation_id: u64) -> Vec<String> {
        storage::get_record(&env, attestation_id).tags
    }

    /// Return the co-publisher list.
    pub fn get_co_publishers(env: Env, attestation_id: u64) -> Vec<Address> {
        storage::co_publishers(&env, attestation_id)
    }

    /// Return the quoted attestation id list.
    pub fn get_quoted_attestation_ids(env: Env, attestation_id: u64) -> Vec<u64> {
        storage::get_record(&env, attestation_id).quoted_attestation_ids
    }

    /// Return whether an address has signed.
    pub fn has_signed(env: Env, attestation_id: u64, who: Address) -> bool {
        storage::has_signed(&env, attestation_id, &who)
    }

    /// Return whether an address has upvoted.
    pub fn has_upvoted(env: Env, attestation_id: u64, who: Address) -> bool {
        storage::has_upvoted(&env, attestation_id, &who)
    }

    /// Return whether an address is a co-publisher.
    pub fn is_co_publisher(env: Env, attestation_id: u64, who: Address) -> bool {
        storage::is_co_publisher(&env, attestation_id, &who)
    }

    /// Return whether an address is currently an author.
    pub fn is_author(env: Env, attestation_id: u64, who: Address) -> bool {
        participants::is_author(&storage::get_record(&env, attestation_id), &who)
    }

    /// Return whether an address is currently a participant.
    pub fn is_participant(env: Env, attestation_id: u64, who: Address) -> bool {
        participants::is_participant(&storage::get_record(&env, attestation_id), &who)
    }

    /// Return an address's unclaimed balance.
    pub fn get_unclaimed_funds(env: Env, attestation_id: u64, who: Address) -> i128 {
        storage::unclaimed_funds(&env, attestation_id, &who)
    }

    /// Return the contract owner.
    pub fn get_admin(env: Env) -> Address {
        access_control::get_owner(&env)
    }

    /// Return the configured main registry address.
    pub fn get_registry(env: Env) -> Address {
        storage::registry(&env)
    }

    /// Return the configured funding token address.
    pub fn get_token(env: Env) -> Address {
        storage::token(&env)
    }

    /// Check membership of the authorized-creator set.
    pub fn is_authorized(env: Env, account: Address) -> bool {
        access_control::is_authorized(&env, &account)
    }
}

// ── Internal ────────────────────────────────────────────────────────

impl AttestationContract {
    /// Shared signing path for `sign` and the creation-time force-sign.
    /// Activation is re-derived from the current participant count on
    /// every signature, so it holds for any signing order. The activation
    /// event precedes the signature event for the final signer, matching
    /// the transition order.
    fn sign_internal(env: &Env, attestation_id: u64, record: &mut AttestationRecord, signer: &Address) {
        assert!(
            !storage::has_signed(env, attestation_id, signer),
            "already signed"
        );
        storage::set_signed(env, attestation_id, signer);
        record.signature_count += 1;

        if record.signature_count == participants::total(record) {
            record.is_activated = true;
            events::emit_attestation_activated(env, attestation_id);
        }

        events::emit_contributor_signed(env, attestation_id, signer);
    }

    /// Author check plus a read-only registry lookup of wallet
    /// verification.
    fn is_verified_author(env: &Env, record: &AttestationRecord, who: &Address) -> bool {
        if !participants::is_author(record, who) {
            return false;
        }
        let registry = MainRegistryContractClient::new(env, &storage::registry(env));
        registry.is_wallet_verified(who)
    }
}
