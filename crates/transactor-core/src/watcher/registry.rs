//! Registry of transactions currently being watched.
//!
//! An entry is removed exactly once, by whichever of confirmation, failure,
//! timeout or cancellation gets to it first. Callbacks are only ever invoked
//! on an entry that was just removed, which is what keeps delivery single-shot.

use super::{PendingTransaction, WatchError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use transactor_types::TransactionHash;

#[derive(Clone, Default)]
pub(crate) struct CallbackRegistry {
	entries: Arc<Mutex<HashMap<TransactionHash, PendingTransaction>>>,
}

impl CallbackRegistry {
	/// Adds an entry, rejecting a hash that is already being watched.
	pub async fn register(&self, pending: PendingTransaction) -> Result<(), WatchError> {
		let mut entries = self.entries.lock().await;
		let hash = pending.response.hash.clone();
		if entries.contains_key(&hash) {
			return Err(WatchError::AlreadyWatching(hash));
		}
		entries.insert(hash, pending);
		Ok(())
	}

	/// Removes and returns the entry for `hash`.
	pub async fn take(&self, hash: &TransactionHash) -> Option<PendingTransaction> {
		self.entries.lock().await.remove(hash)
	}

	pub async fn contains(&self, hash: &TransactionHash) -> bool {
		self.entries.lock().await.contains_key(hash)
	}

	pub async fn has_callback(&self, hash: &TransactionHash) -> bool {
		self.entries
			.lock()
			.await
			.get(hash)
			.is_some_and(|pending| pending.callback.is_some())
	}

	/// Returns the cancellation signal of a registered entry.
	pub async fn cancel_signal(&self, hash: &TransactionHash) -> Option<Arc<Notify>> {
		self.entries
			.lock()
			.await
			.get(hash)
			.map(|pending| Arc::clone(&pending.cancel))
	}

	pub async fn len(&self) -> usize {
		self.entries.lock().await.len()
	}
}
