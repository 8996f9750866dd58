//! Main Registry Contract for Chronicle
//!
//! Single source of truth for wallet-to-user identity, the authorized-caller
//! set, wallet verification, and the per-wallet attestation index. Users are
//! keyed by a sequential id and may bind multiple wallets; a wallet binds to
//! at most one user, permanently. Nothing in this contract is ever deleted
//! or demoted.
//!
//! Failure style: every precondition is checked before any storage write, so
//! a panic aborts the whole invocation with no partial mutation. Message
//! families: authorization ("caller is not authorized", "caller is not the
//! owner"), duplicates ("wallet already registered to a user", "already
//! initialized"), missing entities ("user not found", "wallet not registered
//! to a user"), bad arguments ("name cannot be empty"), capacity
//! ("attestation limit reached for wallet"), and range ("offset out of
//! bounds").

#![no_std]

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, Address, Env, String, Symbol, Vec,
};

/// Hard cap on the number of attestation ids indexed per wallet.
pub const MAX_ATTESTATIONS_PER_WALLET: u32 = 100;

/// Name given to the owner's auto-registered profile at initialization.
pub const BOOTSTRAP_USER_NAME: &str = "genesis";

/// A registered user: sequential id, mutable display name, append-only
/// wallet list. User id 0 is the "not registered" sentinel and never
/// denotes a real user.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserProfile {
    pub user_id: u64,
    pub user_name: String,
    pub wallets: Vec<Address>,
}

/// Data keys for contract storage
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Contract owner.
    Admin,
    /// Membership marker for the authorized-caller set.
    Authorized(Address),
    /// Highest allocated user id.
    UserCount,
    /// user id -> UserProfile
    User(u64),
    /// wallet -> owning user id
    WalletUser(Address),
    /// wallet -> verified flag
    WalletVerified(Address),
    /// wallet -> append-only list of attestation ids
    WalletAttestations(Address),
    /// Highest allocated attestation id.
    AttestationCount,
    /// attestation id -> ledger contract address
    AttestationAddress(u64),
}

/// Events
mod events {
    use super::*;

    pub fn emit_user_registered(env: &Env, user_id: u64, name: &String) {
        const USER_REGISTERED: Symbol = symbol_short!("usr_reg");
        env.events().publish((USER_REGISTERED, user_id), name.clone());
    }

    pub fn emit_user_name_updated(env: &Env, user_id: u64, name: &String) {
        const USER_NAME_UPDATED: Symbol = symbol_short!("usr_name");
        env.events().publish((USER_NAME_UPDATED, user_id), name.clone());
    }

    pub fn emit_wallet_added(env: &Env, user_id: u64, wallet: &Address) {
        const WALLET_ADDED: Symbol = symbol_short!("wal_add");
        env.events().publish((WALLET_ADDED, user_id), wallet.clone());
    }

    pub fn emit_wallet_verified(env: &Env, wallet: &Address) {
        const WALLET_VERIFIED: Symbol = symbol_short!("wal_ver");
        env.events().publish((WALLET_VERIFIED,), wallet.clone());
    }

    pub fn emit_attestation_created(env: &Env, attestation_id: u64, attestation: &Address) {
        const ATTESTATION_CREATED: Symbol = symbol_short!("att_new");
        env.events()
            .publish((ATTESTATION_CREATED, attestation_id), attestation.clone());
    }

    pub fn emit_attestation_added_to_wallet(env: &Env, wallet: &Address, attestation_id: u64) {
        const ATTESTATION_ADDED: Symbol = symbol_short!("att_wal");
        env.events()
            .publish((ATTESTATION_ADDED, wallet.clone()), attestation_id);
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

    pub fn add_authorized(env: &Env, account: &Address) {
        env.storage()
            .instance()
            .set(&DataKey::Authorized(account.clone()), &());
    }

    pub fn remove_authorized(env: &Env, account: &Address) {
        env.storage()
            .instance()
            .remove(&DataKey::Authorized(account.clone()));
    }
}

/// Storage helpers
mod storage {
    use super::*;

    pub fn user_count(env: &Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::UserCount)
            .unwrap_or(0)
    }

    pub fn get_user(env: &Env, user_id: u64) -> Option<UserProfile> {
        env.storage().instance().get(&DataKey::User(user_id))
    }

    pub fn set_user(env: &Env, profile: &UserProfile) {
        env.storage()
            .instance()
            .set(&DataKey::User(profile.user_id), profile);
    }

    pub fn wallet_user_id(env: &Env, wallet: &Address) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::WalletUser(wallet.clone()))
            .unwrap_or(0)
    }

    pub fn bind_wallet(env: &Env, wallet: &Address, user_id: u64) {
        env.storage()
            .instance()
            .set(&DataKey::WalletUser(wallet.clone()), &user_id);
    }

    /// Allocate the next user id and create a profile bound to `wallet`.
    pub fn create_user(env: &Env, wallet: &Address, name: &String) -> u64 {
        let user_id = user_count(env) + 1;
        env.storage().instance().set(&DataKey::UserCount, &user_id);

        let mut wallets = Vec::new(env);
        wallets.push_back(wallet.clone());
        let profile = UserProfile {
            user_id,
            user_name: name.clone(),
            wallets,
        };
        set_user(env, &profile);
        bind_wallet(env, wallet, user_id);
        user_id
    }

    pub fn is_wallet_verified(env: &Env, wallet: &Address) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::WalletVerified(wallet.clone()))
            .unwrap_or(false)
    }

    pub fn wallet_attestations(env: &Env, wallet: &Address) -> Vec<u64> {
        env.storage()
            .instance()
            .get(&DataKey::WalletAttestations(wallet.clone()))
            .unwrap_or(Vec::new(env))
    }

    pub fn set_wallet_attestations(env: &Env, wallet: &Address, ids: &Vec<u64>) {
        env.storage()
            .instance()
            .set(&DataKey::WalletAttestations(wallet.clone()), ids);
    }

    pub fn attestation_count(env: &Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::AttestationCount)
            .unwrap_or(0)
    }
}

#[contract]
pub struct MainRegistryContract;

#[contractimpl]
impl MainRegistryContract {
    // ── Initialization ──────────────────────────────────────────────

    /// One-time contract initialization. Stores `owner`, grants it caller
    /// authorization, and auto-registers it as user 1 under the bootstrap
    /// name. Must be called before any other method.
    pub fn initialize(env: Env, owner: Address) {
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        owner.require_auth();
        env.storage().instance().set(&DataKey::Admin, &owner);
        access_control::add_authorized(&env, &owner);

        let name = String::from_str(&env, BOOTSTRAP_USER_NAME);
        let user_id = storage::create_user(&env, &owner, &name);
        events::emit_user_registered(&env, user_id, &name);
    }

    // ── Ownership and authorization ─────────────────────────────────

    /// Add an address to the authorized-caller set. Owner only.
    pub fn add_authorized_address(env: Env, caller: Address, account: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        access_control::add_authorized(&env, &account);
        events::emit_authorized_added(&env, &account);
    }

    /// Remove an address from the authorized-caller set. Owner only.
    pub fn remove_authorized_address(env: Env, caller: Address, account: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        access_control::remove_authorized(&env, &account);
        events::emit_authorized_removed(&env, &account);
    }

    /// Transfer contract ownership. Owner only.
    pub fn transfer_ownership(env: Env, caller: Address, new_owner: Address) {
        caller.require_auth();
        access_control::require_owner(&env, &caller);
        env.storage().instance().set(&DataKey::Admin, &new_owner);
        events::emit_ownership_transferred(&env, &caller, &new_owner);
    }

    // ── User registration ───────────────────────────────────────────

    /// Register the caller's wallet as a new user.
    ///
    /// Idempotent: if the caller's wallet is already bound to a user, the
    /// existing id is returned with no state change and no event. Callers
    /// rely on this: re-registration must never create a duplicate user
    /// or a duplicate wallet entry.
    pub fn register_user(env: Env, caller: Address, name: String) -> u64 {
        caller.require_auth();
        access_control::require_authorized(&env, &caller);

        let existing = storage::wallet_user_id(&env, &caller);
        if existing != 0 {
            return existing;
        }

        assert!(!name.is_empty(), "name cannot be empty");
        let user_id = storage::create_user(&env, &caller, &name);
        events::emit_user_registered(&env, user_id, &name);
        user_id
    }

    /// Register an arbitrary wallet with an empty name if it has no user
    /// yet, returning its user id either way. Authorized only; this is the
    /// factory's auto-registration entry point.
    pub fn ensure_registered(env: Env, caller: Address, wallet: Address) -> u64 {
        caller.require_auth();
        access_control::require_authorized(&env, &caller);

        let existing = storage::wallet_user_id(&env, &wallet);
        if existing != 0 {
            return existing;
        }

        let name = String::from_str(&env, "");
        let user_id = storage::create_user(&env, &wallet, &name);
        events::emit_user_registered(&env, user_id, &name);
        user_id
    }

    /// Update the display name of the caller's user.
    pub fn update_user_name(env: Env, caller: Address, new_name: String) {
        caller.require_auth();
        let user_id = storage::wallet_user_id(&env, &caller);
        assert!(user_id != 0, "wallet not registered to a user");
        assert!(!new_name.is_empty(), "name cannot be empty");

        let mut profile = storage::get_user(&env, user_id).expect("user not found");
        profile.user_name = new_name.clone();
        storage::set_user(&env, &profile);
        events::emit_user_name_updated(&env, user_id, &new_name);
    }

    /// Bind a further wallet to the caller's user. Self-service: any
    /// wallet already bound to a user may attach new wallets to that same
    /// user. The new wallet must not be bound to any user, the caller's
    /// own included.
    pub fn add_wallet_to_user(env: Env, caller: Address, new_wallet: Address) {
        caller.require_auth();
        let user_id = storage::wallet_user_id(&env, &caller);
        assert!(user_id != 0, "wallet not registered to a user");
        assert!(
            storage::wallet_user_id(&env, &new_wallet) == 0,
            "wallet already registered to a user"
        );

        let mut profile = storage::get_user(&env, user_id).expect("user not found");
        profile.wallets.push_back(new_wallet.clone());
        storage::set_user(&env, &profile);
        storage::bind_wallet(&env, &new_wallet, user_id);
        events::emit_wallet_added(&env, user_id, &new_wallet);
    }

    /// Mark a wallet as verified. Authorized only. Idempotent on the flag;
    /// the event fires on every call.
    pub fn verify_wallet(env: Env, caller: Address, wallet: Address) {
        caller.require_auth();
        access_control::require_authorized(&env, &caller);
        assert!(
            storage::wallet_user_id(&env, &wallet) != 0,
            "wallet not registered to a user"
        );
        env.storage()
            .instance()
            .set(&DataKey::WalletVerified(wallet.clone()), &true);
        events::emit_wallet_verified(&env, &wallet);
    }

    // ── Attestation indexing ────────────────────────────────────────

    /// Allocate the next attestation id, record its ledger address, and
    /// append the id to every participant wallet's index. Authorized only;
    /// the factory is the expected sole caller in normal operation.
    ///
    /// The call is atomic: capacity is validated for every participant
    /// before any index is touched, so a single over-cap wallet aborts the
    /// whole operation with no id allocated and no index mutated.
    pub fn add_attestation(
        env: Env,
        caller: Address,
        attestation: Address,
        participants: Vec<Address>,
    ) -> u64 {
        caller.require_auth();
        access_control::require_authorized(&env, &caller);

        // Phase 1: validate all wallets before making any state changes.
        for wallet in participants.iter() {
            let ids = storage::wallet_attestations(&env, &wallet);
            assert!(
                ids.len() < MAX_ATTESTATIONS_PER_WALLET,
                "attestation limit reached for wallet"
            );
        }

        // Phase 2: allocate and index.
        let attestation_id = storage::attestation_count(&env) + 1;
        env.storage()
            .instance()
            .set(&DataKey::AttestationCount, &attestation_id);
        env.storage()
            .instance()
            .set(&DataKey::AttestationAddress(attestation_id), &attestation);
        events::emit_attestation_created(&env, attestation_id, &attestation);

        for wallet in participants.iter() {
            let mut ids = storage::wallet_attestations(&env, &wallet);
            ids.push_back(attestation_id);
            storage::set_wallet_attestations(&env, &wallet, &ids);
            events::emit_attestation_added_to_wallet(&env, &wallet, attestation_id);
        }

        attestation_id
    }

    // ── Read-only queries ───────────────────────────────────────────

    /// Return the profile for a user id, if any.
    pub fn get_user(env: Env, user_id: u64) -> Option<UserProfile> {
        storage::get_user(&env, user_id)
    }

    /// Return the wallet list for a user id.
    pub fn get_user_wallets(env: Env, user_id: u64) -> Vec<Address> {
        storage::get_user(&env, user_id)
            .expect("user not found")
            .wallets
    }

    /// Return the owning user id for a wallet, or 0 if unregistered.
    pub fn wallet_to_user_id(env: Env, wallet: Address) -> u64 {
        storage::wallet_user_id(&env, &wallet)
    }

    /// Return whether a wallet has been verified by an authorized attester.
    pub fn is_wallet_verified(env: Env, wallet: Address) -> bool {
        storage::is_wallet_verified(&env, &wallet)
    }

    /// Return the number of attestation ids indexed for a wallet.
    pub fn get_wallet_attestation_count(env: Env, wallet: Address) -> u32 {
        storage::wallet_attestations(&env, &wallet).len()
    }

    /// Return a page of a wallet's attestation ids.
    ///
    /// Panics with "offset out of bounds" when `offset` is not strictly
    /// below the list length (an empty list therefore rejects every
    /// offset). The returned slice is shorter than `limit` when fewer than
    /// `limit` ids remain.
    pub fn get_wallet_attestations(env: Env, wallet: Address, offset: u32, limit: u32) -> Vec<u64> {
        let ids = storage::wallet_attestations(&env, &wallet);
        assert!(offset < ids.len(), "offset out of bounds");

        let end = core::cmp::min(offset.saturating_add(limit), ids.len());
        let mut page = Vec::new(&env);
        for i in offset..end {
            page.push_back(ids.get(i).unwrap());
        }
        page
    }

    /// Return the ledger address recorded for an attestation id, if any.
    pub fn get_attestation_address(env: Env, attestation_id: u64) -> Option<Address> {
        env.storage()
            .instance()
            .get(&DataKey::AttestationAddress(attestation_id))
    }

    /// Return the highest allocated user id.
    pub fn get_user_count(env: Env) -> u64 {
        storage::user_count(&env)
    }

    /// Return the highest allocated attestation id.
    pub fn get_attestation_count(env: Env) -> u64 {
        storage::attestation_count(&env)
    }

    /// Check membership of the authorized-caller set.
    pub fn is_authorized(env: Env, account: Address) -> bool {
        access_control::is_authorized(&env, &account)
    }

    /// Return the contract owner.
    pub fn get_owner(env: Env) -> Address {
        access_control::get_owner(&env)
    }
}
