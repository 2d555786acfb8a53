//! In-memory push channel and notification sink.
//!
//! `MemoryPushChannel` lets an embedding application (or a test) feed push
//! events by hand, e.g. from its own event source. `MemorySink` records every
//! notification it is given.

use crate::{NotificationSink, NotifyError, PushChannel};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, RwLock};
use transactor_types::{NetworkInfo, Notification, PushEvent, TransactionHash};

/// Events buffered per subscription before `publish` waits on the receiver.
const DEFAULT_BUFFER: usize = 16;

/// Push channel whose events are published in-process.
pub struct MemoryPushChannel {
	online: AtomicBool,
	/// Open subscriptions keyed by hash.
	subscribers: RwLock<HashMap<TransactionHash, mpsc::Sender<PushEvent>>>,
}

impl MemoryPushChannel {
	pub fn new() -> Self {
		Self {
			online: AtomicBool::new(true),
			subscribers: RwLock::new(HashMap::new()),
		}
	}

	pub fn set_online(&self, online: bool) {
		self.online.store(online, Ordering::SeqCst);
	}

	/// Delivers an event to the subscriber of its hash.
	///
	/// Terminal events close the subscription. Returns false if nobody was
	/// subscribed or the subscriber went away.
	pub async fn publish(&self, event: PushEvent) -> bool {
		let sender = {
			let mut subscribers = self.subscribers.write().await;
			if event.status.is_terminal() {
				subscribers.remove(&event.hash)
			} else {
				subscribers.get(&event.hash).cloned()
			}
		};

		let Some(sender) = sender else {
			return false;
		};
		let hash = event.hash.clone();
		if sender.send(event).await.is_ok() {
			return true;
		}

		// The subscriber dropped its receiver.
		self.subscribers.write().await.remove(&hash);
		false
	}

	/// Stops tracking a hash without a terminal event.
	pub async fn close(&self, hash: &TransactionHash) {
		self.subscribers.write().await.remove(hash);
	}

	/// Number of hashes currently tracked.
	pub async fn subscription_count(&self) -> usize {
		self.subscribers.read().await.len()
	}

	pub async fn is_subscribed(&self, hash: &TransactionHash) -> bool {
		self.subscribers.read().await.contains_key(hash)
	}
}

impl Default for MemoryPushChannel {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl PushChannel for MemoryPushChannel {
	fn is_online(&self) -> bool {
		self.online.load(Ordering::SeqCst)
	}

	async fn subscribe(
		&self,
		hash: &TransactionHash,
		network: &NetworkInfo,
	) -> Result<mpsc::Receiver<PushEvent>, NotifyError> {
		if !self.is_online() {
			return Err(NotifyError::Offline);
		}

		let (sender, receiver) = mpsc::channel(DEFAULT_BUFFER);
		let mut subscribers = self.subscribers.write().await;
		subscribers.retain(|_, sender| !sender.is_closed());
		subscribers.insert(hash.clone(), sender);
		tracing::debug!(tx_hash = %hash, chain_id = network.chain_id, "Subscribed to push events");

		Ok(receiver)
	}

	async fn unsubscribe(&self, hash: &TransactionHash) {
		if self.subscribers.write().await.remove(hash).is_some() {
			tracing::debug!(tx_hash = %hash, "Unsubscribed from push events");
		}
	}
}

/// Sink that keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
	notifications: Mutex<Vec<Notification>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a copy of the notifications received so far.
	pub fn notifications(&self) -> Vec<Notification> {
		self.notifications
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

impl NotificationSink for MemorySink {
	fn notify(&self, notification: Notification) {
		self.notifications
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(notification);
	}
}
