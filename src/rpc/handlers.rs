use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::info;

use crate::errors::RpcError;
use crate::ledger::{faucet_account, genesis_account, landing_account, Store, GENESIS_AMOUNT};
use crate::node::NodeHandle;
use crate::rpc::{Responder, Rpc};
use crate::types::block::encode_work;
use crate::types::{
    decode_unsigned, parse_port, AccountId, Amount, Block, BlockHash, RawKey, WalletId,
    KRAI_RATIO, MRAI_RATIO, RAI_RATIO,
};
use crate::wallet::{Wallet, Wallets};

type HandlerResult = Result<Option<Value>, RpcError>;

/// One request in flight: the parsed body, the responder, and the route to
/// the per-action logic. Each handler validates its fields, drives the
/// node's subsystems, and produces exactly one response value; deferred
/// handlers take the responder with them instead.
pub(crate) struct RpcHandler {
    rpc: Arc<Rpc>,
    request: Map<String, Value>,
    responder: Option<Responder>,
}

impl RpcHandler {
    pub(crate) fn new(rpc: Arc<Rpc>, request: Map<String, Value>, responder: Responder) -> Self {
        Self {
            rpc,
            request,
            responder: Some(responder),
        }
    }

    pub(crate) fn process_request(mut self) {
        let action = match self.request.get("action").and_then(Value::as_str) {
            Some(action) => action.to_string(),
            None => return self.finish(Err(RpcError::ParseJson)),
        };
        // Password-carrying actions run before logging so the audit log only
        // ever sees the scrubbed body.
        if action == "password_enter" || action == "password_change" {
            let outcome = if action == "password_enter" {
                self.password_enter()
            } else {
                self.password_change()
            };
            scrub_password(&mut self.request);
            self.log_request();
            return self.finish(outcome);
        }
        self.log_request();
        let outcome = match action.as_str() {
            "account_balance" => self.account_balance(),
            "account_create" => self.account_create(),
            "account_list" => self.account_list(),
            "account_move" => self.account_move(),
            "account_representative" => self.account_representative(),
            "account_representative_set" => self.account_representative_set(),
            "account_weight" => self.account_weight(),
            "available_supply" => self.available_supply(),
            "block" => self.block(),
            "block_account" => self.block_account(),
            "block_count" => self.block_count(),
            "bootstrap" => self.bootstrap(),
            "chain" => self.chain(),
            "frontiers" => self.frontiers(),
            "frontier_count" => self.frontier_count(),
            "history" => self.history(),
            "keepalive" => self.keepalive(),
            "krai_from_raw" => self.from_raw(KRAI_RATIO),
            "krai_to_raw" => self.to_raw(KRAI_RATIO),
            "mrai_from_raw" => self.from_raw(MRAI_RATIO),
            "mrai_to_raw" => self.to_raw(MRAI_RATIO),
            "password_valid" => self.password_valid(),
            "payment_begin" => self.payment_begin(),
            "payment_init" => self.payment_init(),
            "payment_end" => self.payment_end(),
            "payment_wait" => self.payment_wait(),
            "peers" => self.peers(),
            "pending" => self.pending(),
            "process" => self.process(),
            "rai_from_raw" => self.from_raw(RAI_RATIO),
            "rai_to_raw" => self.to_raw(RAI_RATIO),
            "search_pending" => self.search_pending(),
            "send" => self.send(),
            "stop" => self.stop(),
            "validate_account_number" => self.validate_account_number(),
            "version" => self.version(),
            "wallet_add" => self.wallet_add(),
            "wallet_contains" => self.wallet_contains(),
            "wallet_create" => self.wallet_create(),
            "wallet_destroy" => self.wallet_destroy(),
            "wallet_export" => self.wallet_export(),
            "wallet_key_valid" => self.wallet_key_valid(),
            "wallet_representative" => self.wallet_representative(),
            "wallet_representative_set" => self.wallet_representative_set(),
            "work_generate" => self.work_generate(),
            "work_cancel" => self.work_cancel(),
            _ => Err(RpcError::UnknownCommand),
        };
        self.finish(outcome);
    }

    fn finish(mut self, outcome: HandlerResult) {
        match outcome {
            Ok(Some(value)) => {
                if let Some(responder) = self.responder.take() {
                    responder.respond(value);
                }
            }
            // The handler transferred the responder to a deferred callback.
            Ok(None) => {}
            Err(error) => {
                if let Some(responder) = self.responder.take() {
                    responder.error(error);
                }
            }
        }
    }

    fn node(&self) -> &NodeHandle {
        self.rpc.node()
    }

    fn log_request(&self) {
        if self.rpc.log_rpc() {
            info!(target: "rpc", "{}", reprocess_body(&self.request));
        }
    }

    fn require_control(&self) -> Result<(), RpcError> {
        if self.rpc.config().enable_control {
            Ok(())
        } else {
            Err(RpcError::ControlDisabled)
        }
    }

    fn str_field(&self, key: &str) -> Result<&str, RpcError> {
        self.request
            .get(key)
            .and_then(Value::as_str)
            .ok_or(RpcError::ParseJson)
    }

    fn account_field(&self, key: &str, error: RpcError) -> Result<AccountId, RpcError> {
        AccountId::decode_account(self.str_field(key)?).map_err(|_| error)
    }

    fn wallet_field(
        &self,
        bad_number: RpcError,
        not_found: RpcError,
    ) -> Result<Arc<Wallet>, RpcError> {
        let id = WalletId::decode_hex(self.str_field("wallet")?).map_err(|_| bad_number)?;
        self.node().wallets().find(&id).ok_or(not_found)
    }

    fn take_responder(&mut self) -> Result<Responder, RpcError> {
        self.responder.take().ok_or(RpcError::Internal)
    }

    fn account_balance(&mut self) -> HandlerResult {
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        let (balance, pending) = self.node().balance_pending(&account);
        Ok(Some(json!({
            "balance": balance.to_string(),
            "pending": pending.to_string(),
        })))
    }

    fn account_create(&mut self) -> HandlerResult {
        self.require_control()?;
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        match wallet.deterministic_insert() {
            Some(account) => Ok(Some(json!({ "account": account.to_account() }))),
            None => Err(RpcError::WalletIsLocked),
        }
    }

    fn account_list(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let accounts: Vec<Value> = wallet
            .accounts()
            .into_iter()
            .map(|account| Value::String(account.to_account()))
            .collect();
        Ok(Some(json!({ "accounts": accounts })))
    }

    fn account_move(&mut self) -> HandlerResult {
        self.require_control()?;
        let target = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let source_id =
            WalletId::decode_hex(self.str_field("source")?).map_err(|_| RpcError::BadSourceNumber)?;
        let source = self
            .node()
            .wallets()
            .find(&source_id)
            .ok_or(RpcError::SourceNotFound)?;
        let listed = self
            .request
            .get("accounts")
            .and_then(Value::as_array)
            .ok_or(RpcError::ParseJson)?;
        let mut accounts = Vec::with_capacity(listed.len());
        for entry in listed {
            let text = entry.as_str().ok_or(RpcError::ParseJson)?;
            accounts.push(AccountId::decode_hex(text).map_err(|_| RpcError::BadAccountNumber)?);
        }
        let moved = Wallets::move_accounts(&target, &source, &accounts);
        Ok(Some(json!({ "moved": flag(moved) })))
    }

    fn account_representative(&mut self) -> HandlerResult {
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        let store = self.node().ledger().read();
        let info = store.account_info(&account).ok_or(RpcError::AccountNotFound)?;
        let representative = store
            .block_representative(&info.rep_block)
            .ok_or(RpcError::Internal)?;
        Ok(Some(json!({ "representative": representative.to_account() })))
    }

    fn account_representative_set(&mut self) -> HandlerResult {
        self.require_control()?;
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        let representative =
            self.account_field("representative", RpcError::InvalidAccountNumber)?;
        let responder = self.take_responder()?;
        self.node()
            .change_async(wallet, account, representative, move |hash| {
                let hash = hash.unwrap_or(BlockHash::ZERO);
                responder.respond(json!({ "block": hash.encode_hex() }));
            });
        Ok(None)
    }

    fn account_weight(&mut self) -> HandlerResult {
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        Ok(Some(json!({ "weight": self.node().weight(&account).to_string() })))
    }

    fn available_supply(&mut self) -> HandlerResult {
        let store = self.node().ledger().read();
        let reserved = [genesis_account(), landing_account(), faucet_account()];
        let mut available = GENESIS_AMOUNT;
        for account in reserved {
            available = available
                .checked_sub(store.balance(&account))
                .unwrap_or(Amount::ZERO);
        }
        Ok(Some(json!({ "available": available.to_string() })))
    }

    fn block(&mut self) -> HandlerResult {
        let hash =
            BlockHash::decode_hex(self.str_field("hash")?).map_err(|_| RpcError::BadHashNumber)?;
        let store = self.node().ledger().read();
        match store.block(&hash) {
            Some(block) => Ok(Some(json!({ "contents": block.serialize_json() }))),
            None => Err(RpcError::BlockNotFound),
        }
    }

    fn block_account(&mut self) -> HandlerResult {
        let hash =
            BlockHash::decode_hex(self.str_field("hash")?).map_err(|_| RpcError::InvalidBlockHash)?;
        let store = self.node().ledger().read();
        if !store.block_exists(&hash) {
            return Err(RpcError::BlockNotFound);
        }
        let account = store.account(&hash).ok_or(RpcError::Internal)?;
        Ok(Some(json!({ "account": account.to_account() })))
    }

    fn block_count(&mut self) -> HandlerResult {
        let store = self.node().ledger().read();
        Ok(Some(json!({
            "count": store.block_count().to_string(),
            "unchecked": store.unchecked_count().to_string(),
        })))
    }

    fn bootstrap(&mut self) -> HandlerResult {
        self.require_control()?;
        let address = self
            .str_field("address")?
            .parse::<Ipv6Addr>()
            .map_err(|_| RpcError::InvalidAddress)?;
        let port = parse_port(self.str_field("port")?).map_err(|_| RpcError::InvalidPort)?;
        self.node()
            .bootstrap()
            .bootstrap(SocketAddrV6::new(address, port, 0, 0));
        Ok(Some(json!({ "success": "" })))
    }

    fn chain(&mut self) -> HandlerResult {
        let mut hash =
            BlockHash::decode_hex(self.str_field("block")?).map_err(|_| RpcError::InvalidBlockHash)?;
        let count = decode_unsigned(self.str_field("count")?)
            .map_err(|_| RpcError::InvalidCountLimit)?
            .min(self.rpc.config().chain_request_limit);
        let store = self.node().ledger().read();
        let mut blocks = Vec::new();
        while !hash.is_zero() && (blocks.len() as u64) < count {
            match store.block(&hash) {
                Some(block) => {
                    blocks.push(Value::String(hash.encode_hex()));
                    hash = block.previous();
                }
                None => hash = BlockHash::ZERO,
            }
        }
        Ok(Some(json!({ "blocks": blocks })))
    }

    fn frontiers(&mut self) -> HandlerResult {
        let start = self.account_field("account", RpcError::InvalidStartingAccount)?;
        let count = decode_unsigned(self.str_field("count")?)
            .map_err(|_| RpcError::InvalidCountLimit)?
            .min(self.rpc.config().frontier_request_limit);
        let store = self.node().ledger().read();
        let mut frontiers = Map::new();
        for (account, head) in store.frontiers_from(&start, count) {
            frontiers.insert(account.to_account(), Value::String(head.encode_hex()));
        }
        Ok(Some(json!({ "frontiers": frontiers })))
    }

    fn frontier_count(&mut self) -> HandlerResult {
        let store = self.node().ledger().read();
        Ok(Some(json!({ "count": store.frontier_count().to_string() })))
    }

    fn history(&mut self) -> HandlerResult {
        let mut hash =
            BlockHash::decode_hex(self.str_field("hash")?).map_err(|_| RpcError::InvalidBlockHash)?;
        let mut count =
            decode_unsigned(self.str_field("count")?).map_err(|_| RpcError::InvalidCountLimit)?;
        let store = self.node().ledger().read();
        let mut history = Vec::new();
        while let Some(block) = store.block(&hash) {
            if count == 0 {
                break;
            }
            if let Some(mut entry) = history_entry(&store, &hash, block) {
                entry["hash"] = Value::String(hash.encode_hex());
                history.push(entry);
            }
            hash = block.previous();
            count -= 1;
        }
        Ok(Some(json!({ "history": history })))
    }

    fn keepalive(&mut self) -> HandlerResult {
        self.require_control()?;
        let address = self.str_field("address")?.to_string();
        let port = parse_port(self.str_field("port")?).map_err(|_| RpcError::InvalidPort)?;
        self.node().keepalive(&address, port);
        Ok(Some(json!({})))
    }

    fn from_raw(&mut self, ratio: Amount) -> HandlerResult {
        let amount = Amount::decode_dec(self.str_field("amount")?)
            .map_err(|_| RpcError::BadAmountNumber)?;
        Ok(Some(json!({ "amount": amount.div_ratio(ratio).to_string() })))
    }

    fn to_raw(&mut self, ratio: Amount) -> HandlerResult {
        let amount = Amount::decode_dec(self.str_field("amount")?)
            .map_err(|_| RpcError::BadAmountNumber)?;
        let result = amount.checked_mul(ratio).ok_or(RpcError::AmountTooBig)?;
        Ok(Some(json!({ "amount": result.to_string() })))
    }

    fn password_change(&mut self) -> HandlerResult {
        self.require_control()?;
        let wallet = self.wallet_field(RpcError::BadAccountNumber, RpcError::WalletNotFound)?;
        let password = self.str_field("password")?;
        let changed = wallet.rekey(password);
        Ok(Some(json!({ "changed": flag(changed) })))
    }

    fn password_enter(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadAccountNumber, RpcError::WalletNotFound)?;
        let password = self.str_field("password")?;
        let valid = wallet.enter_password(password);
        Ok(Some(json!({ "valid": flag(valid) })))
    }

    fn password_valid(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadAccountNumber, RpcError::WalletNotFound)?;
        Ok(Some(json!({ "valid": flag(wallet.valid_password()) })))
    }

    fn payment_begin(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::UnableToFindWallets)?;
        let store = self.node().ledger().read();
        if !wallet.valid_password() {
            return Err(RpcError::WalletLocked);
        }
        let account = loop {
            match wallet.pop_free() {
                Some(candidate) => {
                    if !wallet.contains(&candidate) {
                        info!(
                            account = %candidate.to_account(),
                            "transaction wallet externally modified, listed free account no longer exists"
                        );
                        continue;
                    }
                    if !store.balance(&candidate).is_zero() {
                        info!(
                            account = %candidate.to_account(),
                            "skipping transaction account with a non-zero balance"
                        );
                        continue;
                    }
                    break Some(candidate);
                }
                None => break wallet.deterministic_insert(),
            }
        };
        match account {
            Some(account) => Ok(Some(json!({ "account": account.to_account() }))),
            None => Err(RpcError::UnableToCreateAccount),
        }
    }

    fn payment_init(&mut self) -> HandlerResult {
        let id = WalletId::decode_hex(self.str_field("wallet")?)
            .map_err(|_| RpcError::BadTransactionWalletNumber)?;
        let status = match self.node().wallets().find(&id) {
            Some(wallet) => {
                if wallet.valid_password() {
                    wallet.init_free_accounts();
                    "Ready"
                } else {
                    "Transaction wallet locked"
                }
            }
            None => "Unable to find transaction wallet",
        };
        Ok(Some(json!({ "status": status })))
    }

    fn payment_end(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::UnableToFindWallet)?;
        let account = self.account_field("account", RpcError::InvalidAccountNumber)?;
        let store = self.node().ledger().read();
        if !wallet.contains(&account) {
            return Err(RpcError::AccountNotInWallet);
        }
        if !store.balance(&account).is_zero() {
            return Err(RpcError::AccountHasBalance);
        }
        wallet.push_free(account);
        Ok(Some(json!({})))
    }

    fn payment_wait(&mut self) -> HandlerResult {
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        let amount = Amount::decode_dec(self.str_field("amount")?)
            .map_err(|_| RpcError::BadAmountNumber)?;
        let timeout =
            decode_unsigned(self.str_field("timeout")?).map_err(|_| RpcError::BadTimeoutNumber)?;
        let responder = self.take_responder()?;
        self.rpc.register_payment(account, amount, timeout, responder);
        Ok(None)
    }

    fn peers(&mut self) -> HandlerResult {
        let peers: Vec<Value> = self
            .node()
            .peers()
            .list()
            .into_iter()
            .map(Value::String)
            .collect();
        Ok(Some(json!({ "peers": peers })))
    }

    fn pending(&mut self) -> HandlerResult {
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        let count =
            decode_unsigned(self.str_field("count")?).map_err(|_| RpcError::InvalidCountLimit)?;
        let store = self.node().ledger().read();
        let blocks: Vec<Value> = store
            .pending_for(&account, count)
            .into_iter()
            .map(|hash| Value::String(hash.encode_hex()))
            .collect();
        Ok(Some(json!({ "blocks": blocks })))
    }

    fn process(&mut self) -> HandlerResult {
        self.require_control()?;
        let block_text = self.str_field("block")?;
        let block_json =
            serde_json::from_str::<Value>(block_text).map_err(|_| RpcError::BlockInvalid)?;
        let block = Block::deserialize_json(&block_json).map_err(|_| RpcError::BlockInvalid)?;
        if !self.node().work().validate(&block.root(), block.work()) {
            return Err(RpcError::BlockWorkInvalid);
        }
        // Admission runs the receive pipeline; ledger rejections are logged
        // there rather than reported to the caller.
        let _ = self.node().process_receive(block);
        Ok(Some(json!({})))
    }

    fn search_pending(&mut self) -> HandlerResult {
        self.require_control()?;
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let started = self.node().search_pending(wallet);
        let started = if started { "true" } else { "false" };
        Ok(Some(json!({ "started": started })))
    }

    fn send(&mut self) -> HandlerResult {
        self.require_control()?;
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let source = self.account_field("source", RpcError::BadSourceAccount)?;
        let destination = self.account_field("destination", RpcError::BadDestinationAccount)?;
        let amount = Amount::decode_dec(self.str_field("amount")?)
            .map_err(|_| RpcError::BadAmountFormat)?;
        let responder = self.take_responder()?;
        self.node()
            .send_async(wallet, source, destination, amount, move |hash| {
                let hash = hash.unwrap_or(BlockHash::ZERO);
                responder.respond(json!({ "block": hash.encode_hex() }));
            });
        Ok(None)
    }

    fn stop(&mut self) -> HandlerResult {
        self.require_control()?;
        self.rpc.stop();
        self.node().stop();
        Ok(Some(json!({})))
    }

    fn validate_account_number(&mut self) -> HandlerResult {
        let valid = AccountId::decode_account(self.str_field("account")?).is_ok();
        Ok(Some(json!({ "valid": flag(valid) })))
    }

    fn version(&mut self) -> HandlerResult {
        let store = self.node().ledger().read();
        Ok(Some(json!({
            "rpc_version": "1",
            "store_version": store.version().to_string(),
            "node_vendor": format!("Rai {}", env!("CARGO_PKG_VERSION")),
        })))
    }

    fn wallet_add(&mut self) -> HandlerResult {
        self.require_control()?;
        let key =
            RawKey::decode_hex(self.str_field("key")?).map_err(|_| RpcError::BadPrivateKey)?;
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        match wallet.insert_adhoc(key) {
            Some(account) => Ok(Some(json!({ "account": account.to_account() }))),
            None => Err(RpcError::WalletLocked),
        }
    }

    fn wallet_contains(&mut self) -> HandlerResult {
        let account = self.account_field("account", RpcError::BadAccountNumber)?;
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let exists = wallet.contains(&account);
        Ok(Some(json!({ "exists": flag(exists) })))
    }

    fn wallet_create(&mut self) -> HandlerResult {
        self.require_control()?;
        let id = self.node().wallets().create();
        Ok(Some(json!({ "wallet": id.encode_hex() })))
    }

    fn wallet_destroy(&mut self) -> HandlerResult {
        self.require_control()?;
        let id =
            WalletId::decode_hex(self.str_field("wallet")?).map_err(|_| RpcError::BadWalletNumber)?;
        if !self.node().wallets().destroy(&id) {
            return Err(RpcError::WalletNotFound);
        }
        Ok(Some(json!({})))
    }

    fn wallet_export(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadAccountNumber, RpcError::WalletNotFound)?;
        Ok(Some(json!({ "json": wallet.export_json() })))
    }

    fn wallet_key_valid(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadWalletNumber, RpcError::WalletNotFound)?;
        let valid = wallet.valid_password();
        Ok(Some(json!({ "valid": flag(valid) })))
    }

    fn wallet_representative(&mut self) -> HandlerResult {
        let wallet = self.wallet_field(RpcError::BadAccountNumber, RpcError::WalletNotFound)?;
        Ok(Some(json!({ "representative": wallet.representative().to_account() })))
    }

    fn wallet_representative_set(&mut self) -> HandlerResult {
        self.require_control()?;
        let wallet = self.wallet_field(RpcError::BadAccountNumber, RpcError::WalletNotFound)?;
        let representative =
            self.account_field("representative", RpcError::InvalidAccountNumber)?;
        wallet.set_representative(representative);
        Ok(Some(json!({ "set": "1" })))
    }

    fn work_generate(&mut self) -> HandlerResult {
        self.require_control()?;
        let hash =
            BlockHash::decode_hex(self.str_field("hash")?).map_err(|_| RpcError::BadBlockHash)?;
        let responder = self.take_responder()?;
        let node = self.node().clone();
        tokio::task::spawn_blocking(move || match node.work().generate(&hash) {
            Some(work) => responder.respond(json!({ "work": encode_work(work) })),
            None => responder.error(RpcError::Cancelled),
        });
        Ok(None)
    }

    fn work_cancel(&mut self) -> HandlerResult {
        self.require_control()?;
        let hash =
            BlockHash::decode_hex(self.str_field("hash")?).map_err(|_| RpcError::BadBlockHash)?;
        self.node().work().cancel(&hash);
        Ok(Some(json!({})))
    }
}

/// Summarizes one block for the `history` listing. Open blocks report as
/// receives, with the genesis open crediting the full genesis amount; change
/// blocks yield no entry.
fn history_entry(store: &Store, hash: &BlockHash, block: &Block) -> Option<Value> {
    match block {
        Block::Send(send) => Some(json!({
            "type": "send",
            "account": send.destination.to_account(),
            "amount": store.amount(hash)?.to_string(),
        })),
        Block::Receive(receive) => {
            let source_account = store.account(&receive.source)?;
            Some(json!({
                "type": "receive",
                "account": source_account.to_account(),
                "amount": store.amount(hash)?.to_string(),
            }))
        }
        Block::Open(open) => {
            if open.source.0 == genesis_account().0 {
                Some(json!({
                    "type": "receive",
                    "account": genesis_account().to_account(),
                    "amount": GENESIS_AMOUNT.to_string(),
                }))
            } else {
                let source_account = store.account(&open.source)?;
                Some(json!({
                    "type": "receive",
                    "account": source_account.to_account(),
                    "amount": store.amount(hash)?.to_string(),
                }))
            }
        }
        Block::Change(_) => None,
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn scrub_password(request: &mut Map<String, Value>) {
    request.remove("password");
}

fn reprocess_body(request: &Map<String, Value>) -> String {
    Value::Object(request.clone()).to_string()
}
