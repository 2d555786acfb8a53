//! Notification module for the transactor.
//!
//! Two collaborators live here. A `PushChannel` is a third-party service that
//! tracks transaction hashes and streams lifecycle events, sparing the client
//! from polling. A `NotificationSink` displays banners to the user.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use transactor_types::{NetworkInfo, Notification, PushEvent, TransactionHash};

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod memory;
}

/// Errors that can occur when talking to a push channel.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The push channel cannot currently reach its service.
	#[error("Push channel is offline")]
	Offline,
}

/// A push-capable notification service keyed by transaction hash.
#[async_trait]
pub trait PushChannel: Send + Sync {
	/// Returns true if the service is reachable.
	///
	/// The watcher falls back to polling when this is false.
	fn is_online(&self) -> bool;

	/// Starts tracking `hash` and returns the stream of its lifecycle events.
	///
	/// The stream ends when the channel stops tracking the hash.
	async fn subscribe(
		&self,
		hash: &TransactionHash,
		network: &NetworkInfo,
	) -> Result<mpsc::Receiver<PushEvent>, NotifyError>;

	/// Stops tracking `hash`, ending its stream if still open.
	///
	/// Called whenever a watch ends, so it must accept hashes that are no
	/// longer tracked.
	async fn unsubscribe(&self, hash: &TransactionHash);
}

/// Displays notification banners to the user.
pub trait NotificationSink: Send + Sync {
	fn notify(&self, notification: Notification);
}
