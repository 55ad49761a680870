use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use blake2::{Blake2s256, Digest};
use parking_lot::{Mutex, RwLock};
use serde_json::json;

use crate::ledger::genesis_account;
use crate::types::{AccountId, RawKey, WalletId};

/// Process-wide wallet registry. Wallets are shared between handlers through
/// `Arc`, mirroring the registry's role as the single owner of key stores.
pub struct Wallets {
    items: RwLock<HashMap<WalletId, Arc<Wallet>>>,
}

impl Wallets {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> WalletId {
        let id = WalletId::random();
        self.items.write().insert(id, Arc::new(Wallet::new()));
        id
    }

    pub fn find(&self, id: &WalletId) -> Option<Arc<Wallet>> {
        self.items.read().get(id).cloned()
    }

    pub fn destroy(&self, id: &WalletId) -> bool {
        self.items.write().remove(id).is_some()
    }

    /// Moves the listed accounts from `source` into `target`, all or
    /// nothing. Fails when either store is locked or any account is missing
    /// from the source.
    pub fn move_accounts(
        target: &Arc<Wallet>,
        source: &Arc<Wallet>,
        accounts: &[AccountId],
    ) -> bool {
        if Arc::ptr_eq(target, source) {
            let store = target.store.lock();
            return store.unlocked() && accounts.iter().all(|account| store.keys.contains_key(account));
        }
        // Lock in pointer order so concurrent opposite moves cannot deadlock.
        let (first, second) = if Arc::as_ptr(target) < Arc::as_ptr(source) {
            (target, source)
        } else {
            (source, target)
        };
        let first_guard = first.store.lock();
        let second_guard = second.store.lock();
        let (mut target_guard, mut source_guard) = if Arc::ptr_eq(first, target) {
            (first_guard, second_guard)
        } else {
            (second_guard, first_guard)
        };
        if !target_guard.unlocked() || !source_guard.unlocked() {
            return false;
        }
        if !accounts
            .iter()
            .all(|account| source_guard.keys.contains_key(account))
        {
            return false;
        }
        for account in accounts {
            if let Some(key) = source_guard.keys.remove(account) {
                target_guard.keys.insert(*account, key);
            }
        }
        true
    }
}

impl Default for Wallets {
    fn default() -> Self {
        Self::new()
    }
}

struct WalletStore {
    seed: RawKey,
    deterministic_index: u32,
    keys: HashMap<AccountId, RawKey>,
    representative: AccountId,
    password: String,
    session: Option<String>,
}

impl WalletStore {
    fn unlocked(&self) -> bool {
        self.session.as_deref() == Some(self.password.as_str())
    }
}

/// An encrypted key container plus per-wallet settings. New wallets use the
/// empty password and start unlocked.
pub struct Wallet {
    store: Mutex<WalletStore>,
    free_accounts: Mutex<BTreeSet<AccountId>>,
}

impl Wallet {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(WalletStore {
                seed: RawKey::random(),
                deterministic_index: 0,
                keys: HashMap::new(),
                representative: genesis_account(),
                password: String::new(),
                session: Some(String::new()),
            }),
            free_accounts: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn valid_password(&self) -> bool {
        self.store.lock().unlocked()
    }

    /// Attempts to unlock with `password`; reports whether the store is now
    /// usable.
    pub fn enter_password(&self, password: &str) -> bool {
        let mut store = self.store.lock();
        store.session = Some(password.to_string());
        store.unlocked()
    }

    pub fn lock(&self) {
        self.store.lock().session = None;
    }

    /// Re-keys the store. Requires a valid session; reports success.
    pub fn rekey(&self, password: &str) -> bool {
        let mut store = self.store.lock();
        if !store.unlocked() {
            return false;
        }
        store.password = password.to_string();
        store.session = Some(password.to_string());
        true
    }

    /// Derives the next account from the wallet seed. `None` when locked.
    pub fn deterministic_insert(&self) -> Option<AccountId> {
        let mut store = self.store.lock();
        if !store.unlocked() {
            return None;
        }
        loop {
            let key = derive_key(&store.seed, store.deterministic_index);
            store.deterministic_index = store.deterministic_index.wrapping_add(1);
            let account = key.public_key().ok()?;
            if !store.keys.contains_key(&account) {
                store.keys.insert(account, key);
                return Some(account);
            }
        }
    }

    /// Inserts an externally supplied private key. `None` when locked.
    pub fn insert_adhoc(&self, key: RawKey) -> Option<AccountId> {
        let mut store = self.store.lock();
        if !store.unlocked() {
            return None;
        }
        let account = key.public_key().ok()?;
        store.keys.insert(account, key);
        Some(account)
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.store.lock().keys.contains_key(account)
    }

    /// Private key for `account`, available only while unlocked.
    pub fn find_key(&self, account: &AccountId) -> Option<RawKey> {
        let store = self.store.lock();
        if !store.unlocked() {
            return None;
        }
        store.keys.get(account).copied()
    }

    pub fn accounts(&self) -> Vec<AccountId> {
        let store = self.store.lock();
        let mut accounts: Vec<AccountId> = store.keys.keys().copied().collect();
        accounts.sort();
        accounts
    }

    pub fn representative(&self) -> AccountId {
        self.store.lock().representative
    }

    pub fn set_representative(&self, representative: AccountId) {
        self.store.lock().representative = representative;
    }

    /// Full key-store dump as a JSON document.
    pub fn export_json(&self) -> String {
        let store = self.store.lock();
        let mut keys = serde_json::Map::new();
        let mut accounts: Vec<&AccountId> = store.keys.keys().collect();
        accounts.sort();
        for account in accounts {
            keys.insert(
                account.encode_hex(),
                json!(store.keys[account].encode_hex()),
            );
        }
        json!({
            "seed": store.seed.encode_hex(),
            "deterministic_index": store.deterministic_index.to_string(),
            "representative": store.representative.to_account(),
            "keys": keys,
        })
        .to_string()
    }

    /// Refills the free-account pool from the key store.
    pub fn init_free_accounts(&self) {
        let accounts = self.accounts();
        let mut free = self.free_accounts.lock();
        free.clear();
        free.extend(accounts);
    }

    pub fn pop_free(&self) -> Option<AccountId> {
        let mut free = self.free_accounts.lock();
        let first = *free.iter().next()?;
        free.remove(&first);
        Some(first)
    }

    pub fn push_free(&self, account: AccountId) {
        self.free_accounts.lock().insert(account);
    }

    pub fn free_account_count(&self) -> usize {
        self.free_accounts.lock().len()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_key(seed: &RawKey, index: u32) -> RawKey {
    let mut hasher = Blake2s256::new();
    hasher.update(seed.as_bytes());
    hasher.update(index.to_be_bytes());
    RawKey(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_creates_finds_and_destroys() {
        let wallets = Wallets::new();
        let id = wallets.create();
        assert!(wallets.find(&id).is_some());
        assert!(wallets.destroy(&id));
        assert!(wallets.find(&id).is_none());
        assert!(!wallets.destroy(&id));
    }

    #[test]
    fn deterministic_insert_follows_the_seed() {
        let wallet = Wallet::new();
        let first = wallet.deterministic_insert().unwrap();
        let second = wallet.deterministic_insert().unwrap();
        assert_ne!(first, second);
        assert!(wallet.contains(&first));
        assert!(wallet.find_key(&first).is_some());
        // Re-deriving from the same seed and index yields the same key.
        let store = wallet.store.lock();
        assert_eq!(derive_key(&store.seed, 0).public_key().unwrap(), first);
        assert_eq!(derive_key(&store.seed, 1).public_key().unwrap(), second);
    }

    #[test]
    fn locked_wallet_refuses_key_operations() {
        let wallet = Wallet::new();
        let account = wallet.deterministic_insert().unwrap();
        wallet.lock();
        assert!(!wallet.valid_password());
        assert!(wallet.deterministic_insert().is_none());
        assert!(wallet.insert_adhoc(RawKey::from_bytes([5; 32])).is_none());
        assert!(wallet.find_key(&account).is_none());
        // Wrong password leaves the store locked.
        assert!(!wallet.enter_password("wrong"));
        assert!(wallet.enter_password(""));
        assert!(wallet.find_key(&account).is_some());
    }

    #[test]
    fn rekey_requires_a_valid_session() {
        let wallet = Wallet::new();
        assert!(wallet.rekey("hunter2"));
        assert!(wallet.valid_password());
        wallet.lock();
        assert!(!wallet.rekey("other"));
        assert!(wallet.enter_password("hunter2"));
        assert!(wallet.rekey("final"));
        assert!(wallet.valid_password());
    }

    #[test]
    fn adhoc_keys_map_to_their_public_key() {
        let wallet = Wallet::new();
        let key = RawKey::from_bytes([7; 32]);
        let account = wallet.insert_adhoc(key).unwrap();
        assert_eq!(account, key.public_key().unwrap());
        assert_eq!(wallet.find_key(&account), Some(key));
    }

    #[test]
    fn move_accounts_is_all_or_nothing() {
        let target = Arc::new(Wallet::new());
        let source = Arc::new(Wallet::new());
        let kept = source.insert_adhoc(RawKey::from_bytes([1; 32])).unwrap();
        let moved = source.insert_adhoc(RawKey::from_bytes([2; 32])).unwrap();

        let missing = RawKey::from_bytes([9; 32]).public_key().unwrap();
        assert!(!Wallets::move_accounts(&target, &source, &[moved, missing]));
        assert!(source.contains(&moved));

        assert!(Wallets::move_accounts(&target, &source, &[moved]));
        assert!(target.contains(&moved));
        assert!(!source.contains(&moved));
        assert!(source.contains(&kept));

        source.lock();
        assert!(!Wallets::move_accounts(&target, &source, &[kept]));
    }

    #[test]
    fn free_account_pool_round_trips() {
        let wallet = Wallet::new();
        let first = wallet.deterministic_insert().unwrap();
        let second = wallet.deterministic_insert().unwrap();
        wallet.init_free_accounts();
        assert_eq!(wallet.free_account_count(), 2);
        let popped = wallet.pop_free().unwrap();
        assert!(popped == first || popped == second);
        wallet.push_free(popped);
        assert_eq!(wallet.free_account_count(), 2);
    }

    #[test]
    fn export_contains_the_seed_and_keys() {
        let wallet = Wallet::new();
        let account = wallet.deterministic_insert().unwrap();
        let export: serde_json::Value = serde_json::from_str(&wallet.export_json()).unwrap();
        assert!(export["seed"].is_string());
        assert_eq!(export["deterministic_index"], "1");
        assert!(export["keys"][account.encode_hex()].is_string());
    }
}
