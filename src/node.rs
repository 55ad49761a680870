use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::errors::{ChainError, ChainResult};
use crate::ledger::{Ledger, ProcessError};
use crate::network::{self, BootstrapInitiator, PeerContainer};
use crate::types::block::{ChangeBlock, OpenBlock, ReceiveBlock, SendBlock};
use crate::types::{AccountId, Amount, Block, BlockHash, BlockSignature};
use crate::wallet::{Wallet, Wallets};
use crate::work::WorkPool;

/// Callback fired for every block admitted to the ledger, with the owning
/// account and the amount the block moved.
pub type BlockObserver = Box<dyn Fn(&Block, &AccountId, Amount) + Send + Sync>;

pub struct Node {
    inner: Arc<NodeInner>,
}

#[derive(Clone)]
pub struct NodeHandle {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    config: NodeConfig,
    ledger: Ledger,
    wallets: Wallets,
    work: WorkPool,
    peers: PeerContainer,
    bootstrap: BootstrapInitiator,
    block_observers: RwLock<Vec<BlockObserver>>,
    stopped: AtomicBool,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                config,
                ledger: Ledger::new(),
                wallets: Wallets::new(),
                work: WorkPool::new(),
                peers: PeerContainer::new(),
                bootstrap: BootstrapInitiator::new(),
                block_observers: RwLock::new(Vec::new()),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    pub fn handle(&self) -> NodeHandle {
        NodeHandle {
            inner: self.inner.clone(),
        }
    }
}

impl NodeHandle {
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.inner.ledger
    }

    pub fn wallets(&self) -> &Wallets {
        &self.inner.wallets
    }

    pub fn work(&self) -> &WorkPool {
        &self.inner.work
    }

    pub fn peers(&self) -> &PeerContainer {
        &self.inner.peers
    }

    pub fn bootstrap(&self) -> &BootstrapInitiator {
        &self.inner.bootstrap
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.inner.ledger.balance(account)
    }

    pub fn balance_pending(&self, account: &AccountId) -> (Amount, Amount) {
        self.inner.ledger.balance_pending(account)
    }

    pub fn weight(&self, account: &AccountId) -> Amount {
        self.inner.ledger.weight(account)
    }

    pub fn add_block_observer(&self, observer: BlockObserver) {
        self.inner.block_observers.write().push(observer);
    }

    pub fn keepalive(&self, address: &str, port: u16) {
        network::keepalive(&self.inner.peers, address, port);
    }

    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            info!("stopping node");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Admits a block through the receive pipeline: validate work, apply to
    /// the ledger, then fire the block observer stream. Blocks missing their
    /// predecessor or source are parked in the unchecked set.
    pub fn process_receive(&self, block: Block) -> ChainResult<BlockHash> {
        if !self.inner.work.validate(&block.root(), block.work()) {
            return Err(ChainError::Ledger("block work is invalid".into()));
        }
        let outcome = {
            let mut store = self.inner.ledger.write();
            match store.process(block.clone()) {
                Ok(hash) => {
                    let account = store.account(&hash);
                    let amount = store.amount(&hash).unwrap_or(Amount::ZERO);
                    Ok((hash, account, amount))
                }
                Err(err @ (ProcessError::GapPrevious | ProcessError::GapSource)) => {
                    store.add_unchecked(block.hash(), block.clone());
                    Err(err)
                }
                Err(err) => Err(err),
            }
        };
        match outcome {
            Ok((hash, account, amount)) => {
                if let Some(account) = account {
                    self.notify_block_observers(&block, &account, amount);
                }
                Ok(hash)
            }
            Err(err) => {
                warn!(%err, kind = block.kind(), "dropping block");
                Err(ChainError::Ledger(err.to_string()))
            }
        }
    }

    /// Builds, signs, works, and publishes a send on a background task. The
    /// callback receives the block hash, or `None` when any step fails, and
    /// with it the responsibility for answering the caller.
    pub fn send_async<F>(
        &self,
        wallet: Arc<Wallet>,
        source: AccountId,
        destination: AccountId,
        amount: Amount,
        callback: F,
    ) where
        F: FnOnce(Option<BlockHash>) + Send + 'static,
    {
        let node = self.clone();
        tokio::spawn(async move {
            let result = node.send_action(&wallet, &source, &destination, amount);
            if let Err(err) = &result {
                warn!(%err, "send action failed");
            }
            callback(result.ok());
        });
    }

    /// Publishes a representative change for `account`; same deferred
    /// contract as [`send_async`](Self::send_async).
    pub fn change_async<F>(
        &self,
        wallet: Arc<Wallet>,
        account: AccountId,
        representative: AccountId,
        callback: F,
    ) where
        F: FnOnce(Option<BlockHash>) + Send + 'static,
    {
        let node = self.clone();
        tokio::spawn(async move {
            let result = node.change_action(&wallet, &account, &representative);
            if let Err(err) = &result {
                warn!(%err, "change action failed");
            }
            callback(result.ok());
        });
    }

    /// Starts a background scan that receives every pending block addressed
    /// to an account of `wallet`. Reports whether the scan started.
    pub fn search_pending(&self, wallet: Arc<Wallet>) -> bool {
        if !wallet.valid_password() {
            return false;
        }
        let node = self.clone();
        tokio::spawn(async move {
            node.search_pending_action(&wallet);
        });
        true
    }

    fn send_action(
        &self,
        wallet: &Wallet,
        source: &AccountId,
        destination: &AccountId,
        amount: Amount,
    ) -> ChainResult<BlockHash> {
        let key = wallet
            .find_key(source)
            .ok_or_else(|| ChainError::Wallet("source key unavailable or wallet locked".into()))?;
        let (previous, balance) = {
            let store = self.inner.ledger.read();
            let info = store
                .account_info(source)
                .ok_or_else(|| ChainError::Ledger("source account has no chain".into()))?;
            (info.head, info.balance)
        };
        let new_balance = balance
            .checked_sub(amount)
            .ok_or_else(|| ChainError::Ledger("insufficient balance for send".into()))?;
        let mut block = Block::Send(SendBlock {
            previous,
            destination: *destination,
            balance: new_balance,
            work: 0,
            signature: BlockSignature::ZERO,
        });
        self.seal_and_process(&mut block, &key)
    }

    fn change_action(
        &self,
        wallet: &Wallet,
        account: &AccountId,
        representative: &AccountId,
    ) -> ChainResult<BlockHash> {
        let key = wallet
            .find_key(account)
            .ok_or_else(|| ChainError::Wallet("account key unavailable or wallet locked".into()))?;
        let previous = {
            let store = self.inner.ledger.read();
            store
                .account_info(account)
                .ok_or_else(|| ChainError::Ledger("account has no chain".into()))?
                .head
        };
        let mut block = Block::Change(ChangeBlock {
            previous,
            representative: *representative,
            work: 0,
            signature: BlockSignature::ZERO,
        });
        self.seal_and_process(&mut block, &key)
    }

    fn search_pending_action(&self, wallet: &Arc<Wallet>) {
        for account in wallet.accounts() {
            let pending = self.inner.ledger.read().pending_for(&account, u64::MAX);
            for source in pending {
                if let Err(err) = self.receive_action(wallet, &account, &source) {
                    warn!(%err, account = %account.to_account(), "pending receive failed");
                }
            }
        }
    }

    fn receive_action(
        &self,
        wallet: &Wallet,
        account: &AccountId,
        source: &BlockHash,
    ) -> ChainResult<BlockHash> {
        let key = wallet
            .find_key(account)
            .ok_or_else(|| ChainError::Wallet("account key unavailable or wallet locked".into()))?;
        let head = self
            .inner
            .ledger
            .read()
            .account_info(account)
            .map(|info| info.head);
        let mut block = match head {
            Some(previous) => Block::Receive(ReceiveBlock {
                previous,
                source: *source,
                work: 0,
                signature: BlockSignature::ZERO,
            }),
            None => Block::Open(OpenBlock {
                source: *source,
                representative: wallet.representative(),
                account: *account,
                work: 0,
                signature: BlockSignature::ZERO,
            }),
        };
        self.seal_and_process(&mut block, &key)
    }

    fn seal_and_process(
        &self,
        block: &mut Block,
        key: &crate::types::RawKey,
    ) -> ChainResult<BlockHash> {
        let signature = key.sign(block.hash().as_bytes())?;
        block.set_signature(BlockSignature(signature));
        let work = self
            .inner
            .work
            .generate(&block.root())
            .ok_or_else(|| ChainError::Ledger("work generation cancelled".into()))?;
        block.set_work(work);
        self.process_receive(block.clone())
    }

    fn notify_block_observers(&self, block: &Block, account: &AccountId, amount: Amount) {
        let observers = self.inner.block_observers.read();
        for observer in observers.iter() {
            observer(block, account, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::ledger::{genesis_account, genesis_raw_key, GENESIS_AMOUNT};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn genesis_wallet(node: &NodeHandle) -> Arc<Wallet> {
        let id = node.wallets().create();
        let wallet = node.wallets().find(&id).unwrap();
        wallet.insert_adhoc(genesis_raw_key()).unwrap();
        wallet
    }

    #[tokio::test]
    async fn send_async_publishes_and_reports_the_hash() {
        let node = Node::new(NodeConfig::default()).handle();
        let wallet = genesis_wallet(&node);
        let destination = crate::types::RawKey::from_bytes([1; 32])
            .public_key()
            .unwrap();

        let (tx, rx) = oneshot::channel();
        node.send_async(
            wallet,
            genesis_account(),
            destination,
            Amount(400),
            move |hash| {
                let _ = tx.send(hash);
            },
        );
        let hash = rx.await.unwrap().expect("send block published");
        let store = node.ledger().read();
        assert!(store.block_exists(&hash));
        assert_eq!(store.account_pending(&destination), Amount(400));
        assert_eq!(
            store.balance(&genesis_account()),
            GENESIS_AMOUNT.checked_sub(Amount(400)).unwrap()
        );
    }

    #[tokio::test]
    async fn send_async_reports_failures_as_none() {
        let node = Node::new(NodeConfig::default()).handle();
        let wallet = genesis_wallet(&node);
        wallet.lock();
        let (tx, rx) = oneshot::channel();
        node.send_async(
            wallet,
            genesis_account(),
            genesis_account(),
            Amount(1),
            move |hash| {
                let _ = tx.send(hash);
            },
        );
        assert_eq!(rx.await.unwrap(), None);
    }

    #[tokio::test]
    async fn change_async_rotates_the_representative() {
        let node = Node::new(NodeConfig::default()).handle();
        let wallet = genesis_wallet(&node);
        let representative = crate::types::RawKey::from_bytes([2; 32])
            .public_key()
            .unwrap();
        let (tx, rx) = oneshot::channel();
        node.change_async(wallet, genesis_account(), representative, move |hash| {
            let _ = tx.send(hash);
        });
        let hash = rx.await.unwrap().expect("change block published");
        let store = node.ledger().read();
        assert_eq!(store.block_representative(&hash), Some(representative));
        assert_eq!(store.weight(&representative), GENESIS_AMOUNT);
    }

    #[tokio::test]
    async fn observers_fire_on_admitted_blocks() {
        let node = Node::new(NodeConfig::default()).handle();
        let wallet = genesis_wallet(&node);
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = fired.clone();
        node.add_block_observer(Box::new(move |_, _, amount| {
            assert_eq!(amount, Amount(25));
            observed.fetch_add(1, Ordering::SeqCst);
        }));
        let destination = crate::types::RawKey::from_bytes([3; 32])
            .public_key()
            .unwrap();
        let (tx, rx) = oneshot::channel();
        node.send_async(
            wallet,
            genesis_account(),
            destination,
            Amount(25),
            move |hash| {
                let _ = tx.send(hash);
            },
        );
        rx.await.unwrap().expect("send published");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_pending_receives_into_wallet_accounts() {
        let node = Node::new(NodeConfig::default()).handle();
        let genesis = genesis_wallet(&node);

        let receiver_id = node.wallets().create();
        let receiver = node.wallets().find(&receiver_id).unwrap();
        let destination = receiver.deterministic_insert().unwrap();

        let (tx, rx) = oneshot::channel();
        node.send_async(
            genesis,
            genesis_account(),
            destination,
            Amount(90),
            move |hash| {
                let _ = tx.send(hash);
            },
        );
        rx.await.unwrap().expect("send published");

        assert!(node.search_pending(receiver));
        for _ in 0..200 {
            if node.balance(&destination) == Amount(90) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(node.balance(&destination), Amount(90));
        assert_eq!(node.balance_pending(&destination).1, Amount::ZERO);

        let locked_id = node.wallets().create();
        let locked = node.wallets().find(&locked_id).unwrap();
        locked.lock();
        assert!(!node.search_pending(locked));
    }
}
