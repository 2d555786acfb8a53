//! Transaction watcher.
//!
//! Determines when a submitted transaction is mined and delivers the merged
//! response and receipt to a registered callback at most once. On networks the
//! push channel supports, and while it is online, the watcher follows push
//! events and never polls. Everywhere else it polls the confirmation source on
//! a fixed interval until the receipt reports a confirmation.
//!
//! Every watch runs in its own task, bounded by the configured deadline and
//! optional attempt cap, and can be cancelled through its `WatchHandle`.

mod poll;
mod push;
mod registry;

use chrono::{DateTime, Utc};
use registry::CallbackRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use transactor_config::{NotifyConfig, WatcherConfig};
use transactor_delivery::ConfirmationSource;
use transactor_notify::{NotificationSink, PushChannel};
use transactor_types::{
	truncate_id, ConfirmationResult, NetworkInfo, Notification, TransactionHash,
	TransactionReceipt, TransactionResponse,
};

/// Callback invoked with the merged result once the transaction is mined.
pub type TransactionCallback = Box<dyn FnOnce(ConfirmationResult) + Send + 'static>;

/// Errors that can occur when starting or awaiting a watch.
#[derive(Debug, Error)]
pub enum WatchError {
	/// The hash is already registered with this watcher.
	#[error("Transaction {0} is already being watched")]
	AlreadyWatching(TransactionHash),
	/// The watch task panicked or was aborted.
	#[error("Watch task failed: {0}")]
	Join(String),
}

/// How a watch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
	/// The transaction was mined; the callback, if any, received this result.
	Confirmed(ConfirmationResult),
	/// The push channel reported the transaction failed, was dropped or replaced.
	Failed { reason: String },
	/// The deadline or attempt cap was reached first.
	TimedOut { attempts: u64 },
	/// The watch was cancelled before the transaction was mined.
	Cancelled,
}

/// A transaction registered with the watcher.
pub struct PendingTransaction {
	/// The response the receipt is merged into.
	pub response: TransactionResponse,
	/// When the watch started.
	pub submitted_at: DateTime<Utc>,
	callback: Option<TransactionCallback>,
	cancel: Arc<Notify>,
}

/// Handle to a running watch.
///
/// Dropping the handle leaves the watch running.
pub struct WatchHandle {
	hash: TransactionHash,
	cancel: Arc<Notify>,
	task: JoinHandle<WatchOutcome>,
}

impl WatchHandle {
	pub fn hash(&self) -> &TransactionHash {
		&self.hash
	}

	/// Stops the watch without invoking the callback.
	pub fn cancel(&self) {
		self.cancel.notify_one();
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Waits for the watch to end.
	pub async fn outcome(self) -> Result<WatchOutcome, WatchError> {
		self.task.await.map_err(|e| WatchError::Join(e.to_string()))
	}
}

/// State shared by the task following one transaction.
#[derive(Clone)]
pub(crate) struct WatchContext {
	hash: TransactionHash,
	registry: CallbackRegistry,
	source: Arc<dyn ConfirmationSource>,
	sink: Arc<dyn NotificationSink>,
	/// Set when the watch subscribed to the push channel.
	push: Option<Arc<dyn PushChannel>>,
	cancel: Arc<Notify>,
	started: Instant,
	poll_interval: Duration,
	max_poll_attempts: Option<u64>,
	/// Receipt queries made so far.
	attempts: Arc<AtomicU64>,
	/// Explorer link for the transaction, shown on notifications.
	explorer_link: String,
}

impl WatchContext {
	/// Tells the push channel to stop tracking the hash.
	async fn release(&self) {
		if let Some(push) = &self.push {
			push.unsubscribe(&self.hash).await;
		}
	}

	/// Removes the entry and hands the merged result to its callback.
	async fn deliver(&self, receipt: TransactionReceipt) -> WatchOutcome {
		self.release().await;
		let Some(pending) = self.registry.take(&self.hash).await else {
			// Another path already consumed the entry.
			return WatchOutcome::Cancelled;
		};

		let result = ConfirmationResult::new(pending.response, receipt);
		tracing::info!(
			tx_hash = %truncate_id(&self.hash.to_hex()),
			block_number = result.receipt.block_number,
			confirmations = result.confirmations(),
			"Transaction confirmed"
		);

		if let Some(callback) = pending.callback {
			callback(result.clone());
		}

		WatchOutcome::Confirmed(result)
	}

	async fn fail(&self, reason: String) -> WatchOutcome {
		self.release().await;
		self.registry.take(&self.hash).await;
		tracing::warn!(
			tx_hash = %truncate_id(&self.hash.to_hex()),
			reason = %reason,
			"Transaction failed"
		);
		self.sink.notify(
			Notification::error("Transaction Failed", reason.clone())
				.with_link(self.explorer_link.clone()),
		);
		WatchOutcome::Failed { reason }
	}

	async fn time_out(&self) -> WatchOutcome {
		self.release().await;
		let attempts = self.attempts.load(Ordering::SeqCst);
		let Some(pending) = self.registry.take(&self.hash).await else {
			return WatchOutcome::Cancelled;
		};

		let elapsed = self.started.elapsed().as_secs();
		tracing::warn!(
			tx_hash = %truncate_id(&self.hash.to_hex()),
			submitted_at = %pending.submitted_at,
			attempts,
			elapsed_secs = elapsed,
			"Transaction watch timed out"
		);
		// Push-only watches never query for receipts.
		let description = if attempts == 0 {
			format!("No confirmation for {} after {}s", self.hash, elapsed)
		} else {
			format!(
				"No confirmation for {} after {} checks in {}s",
				self.hash, attempts, elapsed
			)
		};
		self.sink.notify(
			Notification::error("Transaction Watch Timed Out", description)
				.with_link(self.explorer_link.clone()),
		);
		WatchOutcome::TimedOut { attempts }
	}

	async fn cancelled(&self) -> WatchOutcome {
		self.release().await;
		self.registry.take(&self.hash).await;
		tracing::debug!(tx_hash = %truncate_id(&self.hash.to_hex()), "Transaction watch cancelled");
		WatchOutcome::Cancelled
	}
}

/// Watches submitted transactions until they are mined.
///
/// Owns the registry of pending callbacks; two watchers never share entries.
pub struct TransactionWatcher {
	registry: CallbackRegistry,
	source: Arc<dyn ConfirmationSource>,
	push: Option<Arc<dyn PushChannel>>,
	sink: Arc<dyn NotificationSink>,
	config: WatcherConfig,
	notify: NotifyConfig,
}

impl TransactionWatcher {
	pub fn new(
		source: Arc<dyn ConfirmationSource>,
		push: Option<Arc<dyn PushChannel>>,
		sink: Arc<dyn NotificationSink>,
		config: WatcherConfig,
		notify: NotifyConfig,
	) -> Self {
		Self {
			registry: CallbackRegistry::default(),
			source,
			push,
			sink,
			config,
			notify,
		}
	}

	/// Returns true if transactions on `network` are followed through push events.
	pub fn push_available(&self, network: Option<&NetworkInfo>) -> bool {
		self.push_channel(network).is_some()
	}

	fn push_channel(&self, network: Option<&NetworkInfo>) -> Option<&Arc<dyn PushChannel>> {
		let network = network?;
		self.push
			.as_ref()
			.filter(|push| self.notify.supports(network.chain_id) && push.is_online())
	}

	/// Starts watching a submitted transaction.
	///
	/// Returns `Ok(None)` when there is nothing to do: no push channel applies
	/// and no callback was supplied, so no poll loop is scheduled.
	pub async fn watch(
		&self,
		response: TransactionResponse,
		network: Option<&NetworkInfo>,
		explorer_url: &str,
		callback: Option<TransactionCallback>,
	) -> Result<Option<WatchHandle>, WatchError> {
		let push = match (network, self.push_channel(network)) {
			(Some(network), Some(push)) => Some((network, Arc::clone(push))),
			_ => None,
		};
		if push.is_none() && callback.is_none() {
			return Ok(None);
		}

		let hash = response.hash.clone();
		let has_callback = callback.is_some();
		let cancel = Arc::new(Notify::new());
		self.registry
			.register(PendingTransaction {
				response,
				submitted_at: Utc::now(),
				callback,
				cancel: Arc::clone(&cancel),
			})
			.await?;

		let mut ctx = WatchContext {
			hash: hash.clone(),
			registry: self.registry.clone(),
			source: Arc::clone(&self.source),
			sink: Arc::clone(&self.sink),
			push: None,
			cancel,
			started: Instant::now(),
			poll_interval: self.config.poll_interval(),
			max_poll_attempts: self.config.max_poll_attempts,
			attempts: Arc::new(AtomicU64::new(0)),
			explorer_link: format!("{}{}", explorer_url, hash),
		};

		let Some((network, push)) = push else {
			tracing::debug!(tx_hash = %truncate_id(&hash.to_hex()), "Polling for transaction receipt");
			return Ok(Some(self.spawn(ctx, |ctx| async move {
				poll::poll_until_confirmed(&ctx).await
			})));
		};

		let subscription = push.subscribe(&hash, network).await;
		match subscription {
			Ok(events) => {
				ctx.push = Some(push);
				Ok(Some(self.spawn(ctx, move |ctx| async move {
					push::follow_push_events(&ctx, events).await
				})))
			}
			Err(e) if has_callback => {
				tracing::warn!(
					tx_hash = %truncate_id(&hash.to_hex()),
					error = %e,
					"Push subscription failed, polling instead"
				);
				Ok(Some(self.spawn(ctx, |ctx| async move {
					poll::poll_until_confirmed(&ctx).await
				})))
			}
			Err(e) => {
				tracing::warn!(
					tx_hash = %truncate_id(&hash.to_hex()),
					error = %e,
					"Push subscription failed"
				);
				self.registry.take(&hash).await;
				Ok(None)
			}
		}
	}

	/// Runs a watch task under the configured deadline.
	fn spawn<F, Fut>(&self, ctx: WatchContext, follow: F) -> WatchHandle
	where
		F: FnOnce(WatchContext) -> Fut,
		Fut: std::future::Future<Output = WatchOutcome> + Send + 'static,
	{
		let hash = ctx.hash.clone();
		let cancel = Arc::clone(&ctx.cancel);
		let deadline = self.config.timeout();
		let watch = follow(ctx.clone());

		let task = tokio::spawn(async move {
			match tokio::time::timeout(deadline, watch).await {
				Ok(outcome) => outcome,
				Err(_) => ctx.time_out().await,
			}
		});

		WatchHandle { hash, cancel, task }
	}

	/// Cancels the watch for `hash`. Returns false if it isn't being watched.
	pub async fn cancel(&self, hash: &TransactionHash) -> bool {
		match self.registry.cancel_signal(hash).await {
			Some(cancel) => {
				cancel.notify_one();
				true
			}
			None => false,
		}
	}

	pub async fn is_watching(&self, hash: &TransactionHash) -> bool {
		self.registry.contains(hash).await
	}

	pub async fn pending_count(&self) -> usize {
		self.registry.len().await
	}
}
