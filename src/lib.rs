//! Core crate for the rai cryptocurrency node's control surface.
//!
//! The `rpc` module is the entry point most consumers care about: it serves
//! the JSON-over-HTTP interface, routes each request's `action` to a handler,
//! and hosts the payment observer registry. The supporting modules carry the
//! subsystems those handlers drive: `ledger` for chain state, `wallet` for
//! key stores, `work` for proof-of-work, and `network` for peer bookkeeping,
//! all wired together by [`node::Node`] and its cloneable
//! [`node::NodeHandle`].
//!
//! Applications typically load a [`config::NodeConfig`], build a node, and
//! hand a handle to [`rpc::serve`].

pub mod config;
pub mod errors;
pub mod ledger;
pub mod network;
pub mod node;
pub mod rpc;
pub mod types;
pub mod wallet;
pub mod work;
