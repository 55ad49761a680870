pub mod handlers;
pub mod payment;

use std::net::SocketAddr;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tokio::time::sleep;
use tracing::info;

use crate::config::RpcConfig;
use crate::errors::{ChainError, ChainResult, RpcError};
use crate::node::NodeHandle;
use crate::rpc::handlers::RpcHandler;
use crate::rpc::payment::{PaymentObservers, PaymentStatus};
use crate::types::{AccountId, Amount};

/// Move-only capability to answer one request. Every accepted request gets
/// exactly one of these; consuming it produces the one JSON response.
#[derive(Debug)]
pub struct Responder {
    sender: oneshot::Sender<Value>,
}

impl Responder {
    pub fn new(sender: oneshot::Sender<Value>) -> Self {
        Self { sender }
    }

    pub fn respond(self, value: Value) {
        let _ = self.sender.send(value);
    }

    pub fn error(self, error: RpcError) {
        self.respond(json!({ "error": error.to_string() }));
    }
}

/// The JSON-over-HTTP control surface: configuration, the payment observer
/// registry, and a handle to the node whose subsystems the handlers drive.
pub struct Rpc {
    config: RpcConfig,
    node: NodeHandle,
    payment_observers: PaymentObservers,
    stopped: AtomicBool,
    stop_notify: Notify,
}

impl Rpc {
    /// Builds the RPC object and subscribes the payment registry to the
    /// node's block observer stream.
    pub fn new(node: NodeHandle, config: RpcConfig) -> Arc<Rpc> {
        let rpc = Arc::new(Rpc {
            config,
            node,
            payment_observers: PaymentObservers::new(),
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
        });
        let hook = Arc::downgrade(&rpc);
        rpc.node.add_block_observer(Box::new(move |_, account, _| {
            if let Some(rpc) = hook.upgrade() {
                rpc.observer_action(account);
            }
        }));
        rpc
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    pub fn node(&self) -> &NodeHandle {
        &self.node
    }

    pub fn payment_observers(&self) -> &PaymentObservers {
        &self.payment_observers
    }

    pub(crate) fn log_rpc(&self) -> bool {
        self.node.config().logging.log_rpc
    }

    /// Closes the acceptor; in-flight requests complete naturally.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }

    /// Re-evaluates the waiter for `account`, if any, against the current
    /// ledger balance.
    pub fn observer_action(&self, account: &AccountId) {
        if let Some(observer) = self.payment_observers.find(account) {
            observer.observe(&self.payment_observers, self.node.balance(account));
        }
    }

    /// Installs a payment waiter and fires the synchronous nudge so a
    /// threshold that is already met completes immediately. A second waiter
    /// for the same account is refused.
    pub fn register_payment(
        self: &Arc<Self>,
        account: AccountId,
        threshold: Amount,
        timeout_ms: u64,
        responder: Responder,
    ) {
        let observer = match self.payment_observers.register(account, threshold, responder) {
            Ok(observer) => observer,
            Err(responder) => return responder.error(RpcError::PaymentInProgress),
        };
        let rpc = self.clone();
        let deadline_observer = observer.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(timeout_ms)).await;
            deadline_observer.complete(&rpc.payment_observers, PaymentStatus::Nothing);
        });
        self.observer_action(&account);
    }
}

/// Parses the request body and routes it to the named action's handler.
/// Deferred actions transfer the responder to their callback; everything
/// else answers before this returns.
pub fn dispatch(rpc: Arc<Rpc>, body: &str, responder: Responder) {
    let request = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => return responder.error(RpcError::ParseJson),
    };
    RpcHandler::new(rpc, request, responder).process_request();
}

/// Serves the RPC on the configured endpoint until [`Rpc::stop`] fires.
/// `ready` reports the bound address, which matters for ephemeral ports.
pub async fn serve(rpc: Arc<Rpc>, ready: Option<oneshot::Sender<SocketAddr>>) -> ChainResult<()> {
    let router = Router::new()
        .fallback(handle_request)
        .with_state(rpc.clone());
    let listener = TcpListener::bind(rpc.config.listen_endpoint()).await?;
    let local_addr = listener.local_addr()?;
    if let Some(ready) = ready {
        let _ = ready.send(local_addr);
    }
    info!(%local_addr, "RPC server listening");
    let shutdown = async move {
        let mut notified = pin!(rpc.stop_notify.notified());
        notified.as_mut().enable();
        if rpc.stopped.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    };
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| ChainError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))
}

/// One request, one response: non-POST methods get the JSON error payload,
/// and every application outcome ships as HTTP 200.
async fn handle_request(State(rpc): State<Arc<Rpc>>, method: Method, body: String) -> Response {
    let (sender, receiver) = oneshot::channel();
    let responder = Responder::new(sender);
    if method == Method::POST {
        dispatch(rpc, &body, responder);
    } else {
        responder.error(RpcError::MethodNotPost);
    }
    let value = receiver
        .await
        .unwrap_or_else(|_| json!({ "error": RpcError::Internal.to_string() }));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
        ],
        value.to_string(),
    )
        .into_response()
}
