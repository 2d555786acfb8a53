//! Core of the transactor: submission, notification and confirmation watching.
//!
//! `Transactor` submits a transaction (or awaits one already in flight),
//! tells the user about it, and hands the hash to a `TransactionWatcher`.
//! The watcher follows the transaction through a push channel when one is
//! available for the network, or polls for its receipt otherwise, and calls
//! the registered callback once the transaction is mined.

pub mod transactor;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use transactor::{Submitted, TransactionInput, Transactor, TransactorError};
pub use watcher::{
	PendingTransaction, TransactionCallback, TransactionWatcher, WatchError, WatchHandle,
	WatchOutcome,
};
