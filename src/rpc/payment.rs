use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::RpcError;
use crate::rpc::Responder;
use crate::types::{AccountId, Amount};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Nothing,
}

/// Account-keyed registry of in-flight payment waiters. At most one observer
/// per account; every insert/find/erase happens under the registry mutex.
pub struct PaymentObservers {
    observers: Mutex<HashMap<AccountId, Arc<PaymentObserver>>>,
}

impl PaymentObservers {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
        }
    }

    pub fn find(&self, account: &AccountId) -> Option<Arc<PaymentObserver>> {
        self.observers.lock().get(account).cloned()
    }

    /// Builds and inserts a fresh observer; a second waiter for the account
    /// is refused and its responder handed back to the caller.
    pub fn register(
        &self,
        account: AccountId,
        threshold: Amount,
        responder: Responder,
    ) -> Result<Arc<PaymentObserver>, Responder> {
        let mut observers = self.observers.lock();
        if observers.contains_key(&account) {
            return Err(responder);
        }
        let observer = PaymentObserver::new(account, threshold, responder);
        observers.insert(account, observer.clone());
        Ok(observer)
    }

    fn remove(&self, account: &AccountId) {
        self.observers.lock().remove(account);
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}

impl Default for PaymentObservers {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-shot waiter for an inbound credit. Completes exactly once with
/// either `success` (threshold reached) or `nothing` (deadline elapsed); the
/// loser of the race is a no-op.
pub struct PaymentObserver {
    account: AccountId,
    threshold: Amount,
    completed: AtomicBool,
    responder: Mutex<Option<Responder>>,
}

impl PaymentObserver {
    fn new(account: AccountId, threshold: Amount, responder: Responder) -> Arc<Self> {
        Arc::new(Self {
            account,
            threshold,
            completed: AtomicBool::new(false),
            responder: Mutex::new(Some(responder)),
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Edge-triggered evaluation against the current ledger balance.
    pub fn observe(&self, registry: &PaymentObservers, balance: Amount) {
        if balance >= self.threshold {
            self.complete(registry, PaymentStatus::Success);
        }
    }

    pub fn complete(&self, registry: &PaymentObservers, status: PaymentStatus) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(
            account = %self.account.to_account(),
            ?status,
            "payment observer completed"
        );
        match self.responder.lock().take() {
            Some(responder) => {
                let payload = match status {
                    PaymentStatus::Success => json!({"status": "success"}),
                    PaymentStatus::Nothing => json!({"status": "nothing"}),
                };
                responder.respond(payload);
            }
            // The latch admits one winner, so a missing responder is an
            // internal fault; there is no channel left to carry it.
            None => {
                warn!(
                    account = %self.account.to_account(),
                    error = %RpcError::InternalPayment,
                    "payment observer completed without a responder"
                );
            }
        }
        registry.remove(&self.account);
    }
}
