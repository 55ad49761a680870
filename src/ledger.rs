use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::types::block::OpenBlock;
use crate::types::{AccountId, Amount, Block, BlockHash, BlockSignature, RawKey};

/// Total supply, credited to the genesis account by the genesis open block.
pub const GENESIS_AMOUNT: Amount = Amount::MAX;

pub const STORE_VERSION: u32 = 1;

const GENESIS_RAW_KEY_HEX: &str = "7b3e9f1a5c8d2e4f6a0b9c8d7e6f5a4b3c2d1e0f9a8b7c6d5e4f3a2b1c0d9e8f";
const LANDING_ACCOUNT_HEX: &str = "059F68AAB29DE0D3A27443625C7EA9CDDB6517A8B76FE37727EF6A4D76832AD5";
const FAUCET_ACCOUNT_HEX: &str = "8E319CE6F3025E5B2DF66DA7AB1467FE48F1679C13DD43BFDB29FA2E9FC40D3B";

static GENESIS_KEY: Lazy<RawKey> =
    Lazy::new(|| RawKey::decode_hex(GENESIS_RAW_KEY_HEX).expect("genesis key constant"));
static GENESIS_ACCOUNT: Lazy<AccountId> =
    Lazy::new(|| GENESIS_KEY.public_key().expect("genesis public key"));
static LANDING_ACCOUNT: Lazy<AccountId> =
    Lazy::new(|| AccountId::decode_hex(LANDING_ACCOUNT_HEX).expect("landing account constant"));
static FAUCET_ACCOUNT: Lazy<AccountId> =
    Lazy::new(|| AccountId::decode_hex(FAUCET_ACCOUNT_HEX).expect("faucet account constant"));

pub fn genesis_account() -> AccountId {
    *GENESIS_ACCOUNT
}

/// Development genesis secret, used to seed balances in tests and demos.
pub fn genesis_raw_key() -> RawKey {
    *GENESIS_KEY
}

/// Reserved cold-storage account excluded from the circulating supply.
pub fn landing_account() -> AccountId {
    *LANDING_ACCOUNT
}

/// Reserved faucet account excluded from the circulating supply.
pub fn faucet_account() -> AccountId {
    *FAUCET_ACCOUNT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("block already present")]
    Old,
    #[error("previous block missing")]
    GapPrevious,
    #[error("source block not pending for the account")]
    GapSource,
    #[error("block does not extend the account frontier")]
    Fork,
    #[error("send balance exceeds the account balance")]
    Overspend,
    #[error("account already opened")]
    Opened,
    #[error("balance overflow on receive")]
    BalanceOverflow,
    #[error("representative block is not an open or change block")]
    MalformedRepresentative,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub head: BlockHash,
    pub rep_block: BlockHash,
    pub open_block: BlockHash,
    pub balance: Amount,
    pub block_count: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingKey {
    pub account: AccountId,
    pub hash: BlockHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingInfo {
    pub source: AccountId,
    pub amount: Amount,
}

/// In-memory block store and account indexes. A read guard over this type is
/// a read transaction, a write guard a write transaction.
pub struct Store {
    blocks: HashMap<BlockHash, Block>,
    accounts: BTreeMap<AccountId, AccountInfo>,
    pending: BTreeMap<PendingKey, PendingInfo>,
    representation: HashMap<AccountId, Amount>,
    unchecked: HashMap<BlockHash, Block>,
    block_account: HashMap<BlockHash, AccountId>,
    block_balance: HashMap<BlockHash, Amount>,
}

impl Store {
    fn new() -> Self {
        let mut store = Store {
            blocks: HashMap::new(),
            accounts: BTreeMap::new(),
            pending: BTreeMap::new(),
            representation: HashMap::new(),
            unchecked: HashMap::new(),
            block_account: HashMap::new(),
            block_balance: HashMap::new(),
        };
        let account = genesis_account();
        let genesis = Block::Open(OpenBlock {
            source: BlockHash(account.0),
            representative: account,
            account,
            work: 0,
            signature: BlockSignature::ZERO,
        });
        let hash = genesis.hash();
        store.accounts.insert(
            account,
            AccountInfo {
                head: hash,
                rep_block: hash,
                open_block: hash,
                balance: GENESIS_AMOUNT,
                block_count: 1,
            },
        );
        store.representation.insert(account, GENESIS_AMOUNT);
        store.block_account.insert(hash, account);
        store.block_balance.insert(hash, GENESIS_AMOUNT);
        store.blocks.insert(hash, genesis);
        store
    }

    pub fn version(&self) -> u32 {
        STORE_VERSION
    }

    pub fn block(&self, hash: &BlockHash) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn block_exists(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn block_count(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn unchecked_count(&self) -> u64 {
        self.unchecked.len() as u64
    }

    pub fn add_unchecked(&mut self, hash: BlockHash, block: Block) {
        self.unchecked.insert(hash, block);
    }

    pub fn frontier_count(&self) -> u64 {
        self.accounts.len() as u64
    }

    pub fn account_info(&self, account: &AccountId) -> Option<&AccountInfo> {
        self.accounts.get(account)
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.accounts
            .get(account)
            .map(|info| info.balance)
            .unwrap_or(Amount::ZERO)
    }

    /// Owning account of a stored block.
    pub fn account(&self, hash: &BlockHash) -> Option<AccountId> {
        self.block_account.get(hash).copied()
    }

    /// Value moved by a stored block, derived from the balance sidebands.
    pub fn amount(&self, hash: &BlockHash) -> Option<Amount> {
        let block = self.blocks.get(hash)?;
        match block {
            Block::Send(send) => {
                let previous = self.block_balance.get(&send.previous)?;
                previous.checked_sub(*self.block_balance.get(hash)?)
            }
            Block::Receive(receive) => {
                let previous = self.block_balance.get(&receive.previous)?;
                self.block_balance.get(hash)?.checked_sub(*previous)
            }
            Block::Open(_) => self.block_balance.get(hash).copied(),
            Block::Change(_) => Some(Amount::ZERO),
        }
    }

    /// Representative named by an open or change block.
    pub fn block_representative(&self, hash: &BlockHash) -> Option<AccountId> {
        match self.blocks.get(hash)? {
            Block::Open(block) => Some(block.representative),
            Block::Change(block) => Some(block.representative),
            _ => None,
        }
    }

    pub fn weight(&self, account: &AccountId) -> Amount {
        self.representation
            .get(account)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Frontier pairs starting at `start`, lexicographically, up to `count`.
    pub fn frontiers_from(&self, start: &AccountId, count: u64) -> Vec<(AccountId, BlockHash)> {
        self.accounts
            .range(*start..)
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .map(|(account, info)| (*account, info.head))
            .collect()
    }

    /// Pending block hashes addressed to `account`, scanning the key range
    /// `[ (account, 0), (account + 1, 0) )`.
    pub fn pending_for(&self, account: &AccountId, count: u64) -> Vec<BlockHash> {
        let start = PendingKey {
            account: *account,
            hash: BlockHash::ZERO,
        };
        let mut out = Vec::new();
        for (key, _) in self.pending.range(start..) {
            if key.account != *account || (out.len() as u64) >= count {
                break;
            }
            out.push(key.hash);
        }
        out
    }

    pub fn pending_info(&self, key: &PendingKey) -> Option<&PendingInfo> {
        self.pending.get(key)
    }

    /// Sum of pending amounts addressed to `account`.
    pub fn account_pending(&self, account: &AccountId) -> Amount {
        let start = PendingKey {
            account: *account,
            hash: BlockHash::ZERO,
        };
        let mut total = Amount::ZERO;
        for (key, info) in self.pending.range(start..) {
            if key.account != *account {
                break;
            }
            total = total.checked_add(info.amount).unwrap_or(Amount::MAX);
        }
        total
    }

    pub fn process(&mut self, block: Block) -> Result<BlockHash, ProcessError> {
        let hash = block.hash();
        if self.blocks.contains_key(&hash) {
            return Err(ProcessError::Old);
        }
        match &block {
            Block::Open(open) => self.process_open(hash, open)?,
            Block::Send(send) => self.process_send(hash, send)?,
            Block::Receive(receive) => self.process_receive(hash, receive)?,
            Block::Change(change) => self.process_change(hash, change)?,
        }
        self.blocks.insert(hash, block);
        Ok(hash)
    }

    fn process_open(&mut self, hash: BlockHash, open: &OpenBlock) -> Result<(), ProcessError> {
        if self.accounts.contains_key(&open.account) {
            return Err(ProcessError::Opened);
        }
        let key = PendingKey {
            account: open.account,
            hash: open.source,
        };
        let pending = self.pending.remove(&key).ok_or(ProcessError::GapSource)?;
        self.accounts.insert(
            open.account,
            AccountInfo {
                head: hash,
                rep_block: hash,
                open_block: hash,
                balance: pending.amount,
                block_count: 1,
            },
        );
        self.add_weight(open.representative, pending.amount);
        self.block_account.insert(hash, open.account);
        self.block_balance.insert(hash, pending.amount);
        Ok(())
    }

    fn process_send(
        &mut self,
        hash: BlockHash,
        send: &crate::types::SendBlock,
    ) -> Result<(), ProcessError> {
        let account = *self
            .block_account
            .get(&send.previous)
            .ok_or(ProcessError::GapPrevious)?;
        let info = self
            .accounts
            .get(&account)
            .ok_or(ProcessError::GapPrevious)?
            .clone();
        if info.head != send.previous {
            return Err(ProcessError::Fork);
        }
        let amount = info
            .balance
            .checked_sub(send.balance)
            .ok_or(ProcessError::Overspend)?;
        let representative = self
            .block_representative(&info.rep_block)
            .ok_or(ProcessError::MalformedRepresentative)?;
        self.sub_weight(representative, amount);
        self.pending.insert(
            PendingKey {
                account: send.destination,
                hash,
            },
            PendingInfo {
                source: account,
                amount,
            },
        );
        self.accounts.insert(
            account,
            AccountInfo {
                head: hash,
                balance: send.balance,
                block_count: info.block_count + 1,
                ..info
            },
        );
        self.block_account.insert(hash, account);
        self.block_balance.insert(hash, send.balance);
        Ok(())
    }

    fn process_receive(
        &mut self,
        hash: BlockHash,
        receive: &crate::types::ReceiveBlock,
    ) -> Result<(), ProcessError> {
        let account = *self
            .block_account
            .get(&receive.previous)
            .ok_or(ProcessError::GapPrevious)?;
        let info = self
            .accounts
            .get(&account)
            .ok_or(ProcessError::GapPrevious)?
            .clone();
        if info.head != receive.previous {
            return Err(ProcessError::Fork);
        }
        let representative = self
            .block_representative(&info.rep_block)
            .ok_or(ProcessError::MalformedRepresentative)?;
        let key = PendingKey {
            account,
            hash: receive.source,
        };
        let pending_amount = self
            .pending
            .get(&key)
            .ok_or(ProcessError::GapSource)?
            .amount;
        let balance = info
            .balance
            .checked_add(pending_amount)
            .ok_or(ProcessError::BalanceOverflow)?;
        self.pending.remove(&key);
        self.add_weight(representative, pending_amount);
        self.accounts.insert(
            account,
            AccountInfo {
                head: hash,
                balance,
                block_count: info.block_count + 1,
                ..info
            },
        );
        self.block_account.insert(hash, account);
        self.block_balance.insert(hash, balance);
        Ok(())
    }

    fn process_change(
        &mut self,
        hash: BlockHash,
        change: &crate::types::ChangeBlock,
    ) -> Result<(), ProcessError> {
        let account = *self
            .block_account
            .get(&change.previous)
            .ok_or(ProcessError::GapPrevious)?;
        let info = self
            .accounts
            .get(&account)
            .ok_or(ProcessError::GapPrevious)?
            .clone();
        if info.head != change.previous {
            return Err(ProcessError::Fork);
        }
        let old_representative = self
            .block_representative(&info.rep_block)
            .ok_or(ProcessError::MalformedRepresentative)?;
        self.sub_weight(old_representative, info.balance);
        self.add_weight(change.representative, info.balance);
        self.accounts.insert(
            account,
            AccountInfo {
                head: hash,
                rep_block: hash,
                block_count: info.block_count + 1,
                ..info
            },
        );
        self.block_account.insert(hash, account);
        self.block_balance.insert(hash, info.balance);
        Ok(())
    }

    fn add_weight(&mut self, representative: AccountId, amount: Amount) {
        let entry = self
            .representation
            .entry(representative)
            .or_insert(Amount::ZERO);
        *entry = entry.checked_add(amount).unwrap_or(Amount::MAX);
    }

    fn sub_weight(&mut self, representative: AccountId, amount: Amount) {
        if let Some(entry) = self.representation.get_mut(&representative) {
            *entry = entry.checked_sub(amount).unwrap_or(Amount::ZERO);
        }
    }
}

pub struct Ledger {
    store: RwLock<Store>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::new()),
        }
    }

    /// Opens a read transaction.
    pub fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read()
    }

    /// Opens a write transaction.
    pub fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write()
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.read().balance(account)
    }

    pub fn balance_pending(&self, account: &AccountId) -> (Amount, Amount) {
        let store = self.read();
        (store.balance(account), store.account_pending(account))
    }

    pub fn weight(&self, account: &AccountId) -> Amount {
        self.read().weight(account)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
