//! Transaction submission with user notifications.
//!
//! `Transactor::send` submits a request (or awaits a transaction already in
//! flight), announces it, starts a watch, and optionally waits for the first
//! confirmation before returning. Submission failures are reported to the
//! notification sink and yield no result; they never start a watch.

use crate::watcher::{TransactionCallback, TransactionWatcher, WatchHandle};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use transactor_config::{Config, TransactorConfig};
use transactor_delivery::{DeliveryError, DeliveryService};
use transactor_notify::{NotificationSink, PushChannel};
use transactor_types::{
	explorer_tx_url, truncate_id, Notification, TransactionHash, TransactionRequest,
	TransactionResponse,
};

/// Errors that can occur while submitting a transaction.
#[derive(Debug, Error)]
pub enum TransactorError {
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
}

/// What `Transactor::send` submits.
pub enum TransactionInput {
	/// Unsigned fields to sign and send.
	Request(TransactionRequest),
	/// A transaction already being sent elsewhere.
	InFlight(BoxFuture<'static, Result<TransactionResponse, DeliveryError>>),
}

impl TransactionInput {
	pub fn in_flight<F>(future: F) -> Self
	where
		F: Future<Output = Result<TransactionResponse, DeliveryError>> + Send + 'static,
	{
		TransactionInput::InFlight(Box::pin(future))
	}
}

impl From<TransactionRequest> for TransactionInput {
	fn from(request: TransactionRequest) -> Self {
		TransactionInput::Request(request)
	}
}

/// A transaction the network accepted.
pub struct Submitted {
	pub response: TransactionResponse,
	/// Block explorer page for the transaction.
	pub explorer_link: String,
	/// The running watch, if one was started.
	pub watch: Option<WatchHandle>,
}

/// Submits transactions and follows them until they are mined.
pub struct Transactor {
	delivery: Arc<DeliveryService>,
	watcher: TransactionWatcher,
	sink: Arc<dyn NotificationSink>,
	config: TransactorConfig,
}

impl Transactor {
	pub fn new(
		delivery: Arc<DeliveryService>,
		push: Option<Arc<dyn PushChannel>>,
		sink: Arc<dyn NotificationSink>,
		config: &Config,
	) -> Self {
		let watcher = TransactionWatcher::new(
			delivery.confirmation_source(),
			push,
			Arc::clone(&sink),
			config.watcher.clone(),
			config.notify.clone(),
		);

		Self {
			delivery,
			watcher,
			sink,
			config: config.transactor.clone(),
		}
	}

	pub fn watcher(&self) -> &TransactionWatcher {
		&self.watcher
	}

	/// Submits a transaction and starts watching it.
	///
	/// Returns `None` if submission failed; the failure has then been shown
	/// to the user as an error notification.
	pub async fn send(
		&self,
		input: impl Into<TransactionInput>,
		callback: Option<TransactionCallback>,
	) -> Option<Submitted> {
		match self.try_send(input.into(), callback).await {
			Ok(submitted) => Some(submitted),
			Err(e) => {
				tracing::error!(error = %e, "Transaction error");
				self.sink
					.notify(Notification::error("Transaction Error", e.to_string()));
				None
			}
		}
	}

	async fn try_send(
		&self,
		input: TransactionInput,
		callback: Option<TransactionCallback>,
	) -> Result<Submitted, TransactorError> {
		let network = match self.delivery.network().await {
			Ok(network) => Some(network),
			Err(e) => {
				tracing::warn!(error = %e, "Could not resolve network, treating it as unsupported");
				None
			}
		};
		let explorer_url = self
			.config
			.explorer_url
			.clone()
			.unwrap_or_else(|| explorer_tx_url(network.as_ref()));

		let response = match input {
			TransactionInput::InFlight(pending) => {
				tracing::debug!("Awaiting in-flight transaction");
				pending.await?
			}
			TransactionInput::Request(request) => {
				let request = self.with_gas_defaults(request);
				tracing::debug!(
					gas_price = ?request.gas_price,
					gas_limit = ?request.gas_limit,
					"Running transaction"
				);
				self.delivery.send(request).await?
			}
		};

		let hash = response.hash.clone();
		tracing::info!(
			tx_hash = %truncate_id(&hash.to_hex()),
			chain_id = ?network.as_ref().map(|n| n.chain_id),
			"Transaction sent"
		);

		if !self.watcher.push_available(network.as_ref()) {
			self.sink
				.notify(Notification::info("Local Transaction Sent", hash.to_hex()));
		}

		let watch = match self
			.watcher
			.watch(response.clone(), network.as_ref(), &explorer_url, callback)
			.await
		{
			Ok(watch) => watch,
			Err(e) => {
				tracing::warn!(tx_hash = %truncate_id(&hash.to_hex()), error = %e, "Could not watch transaction");
				self.sink
					.notify(Notification::error("Transaction Watch Error", e.to_string()));
				None
			}
		};

		if self.config.wait_for_finalization {
			self.wait_for_finalization(&hash).await;
		}

		Ok(Submitted {
			explorer_link: format!("{}{}", explorer_url, hash),
			response,
			watch,
		})
	}

	fn with_gas_defaults(&self, mut request: TransactionRequest) -> TransactionRequest {
		if request.gas_price.is_none() {
			request.gas_price = Some(self.config.default_gas_price_wei());
		}
		if request.gas_limit.is_none() {
			request.gas_limit = Some(self.config.default_gas_limit);
		}
		request
	}

	/// Waits for the first confirmation, logging instead of failing.
	async fn wait_for_finalization(&self, hash: &TransactionHash) {
		let wait = self.delivery.wait_for_confirmation(hash, 1);
		match tokio::time::timeout(self.config.finalization_timeout(), wait).await {
			Ok(Ok(receipt)) => tracing::debug!(
				tx_hash = %truncate_id(&hash.to_hex()),
				block_number = receipt.block_number,
				"Transaction finalized"
			),
			Ok(Err(e)) => tracing::warn!(
				tx_hash = %truncate_id(&hash.to_hex()),
				error = %e,
				"Failed waiting for transaction"
			),
			Err(_) => tracing::warn!(
				tx_hash = %truncate_id(&hash.to_hex()),
				"Gave up waiting for transaction after {}s",
				self.config.finalization_timeout_seconds
			),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{callback_recorder, hash, RecordingSigner, ScriptedSource, Step};
	use crate::WatchOutcome;
	use std::time::Duration;
	use transactor_delivery::{ConfirmationSource, SignerInterface};
	use transactor_notify::implementations::memory::{MemoryPushChannel, MemorySink};
	use transactor_types::{NetworkInfo, NotificationLevel, PushEvent, TransactionStatus};

	fn config() -> Config {
		"[network]\nrpc_url = \"http://localhost:8545\"\n"
			.parse()
			.unwrap()
	}

	struct Fixture {
		source: Arc<ScriptedSource>,
		signer: Arc<RecordingSigner>,
		push: Arc<MemoryPushChannel>,
		sink: Arc<MemorySink>,
		transactor: Transactor,
	}

	fn fixture_with(
		source: ScriptedSource,
		signer: Option<RecordingSigner>,
		config: Config,
	) -> Fixture {
		let source = Arc::new(source);
		let signer = Arc::new(signer.unwrap_or_else(|| RecordingSigner::new(1)));
		let push = Arc::new(MemoryPushChannel::new());
		let sink = Arc::new(MemorySink::new());

		let delivery = Arc::new(DeliveryService::new(
			Arc::clone(&source) as Arc<dyn ConfirmationSource>,
			Some(Arc::clone(&signer) as Arc<dyn SignerInterface>),
		));
		let transactor = Transactor::new(delivery, Some(push.clone()), sink.clone(), &config);

		Fixture {
			source,
			signer,
			push,
			sink,
			transactor,
		}
	}

	fn fixture(steps: Vec<Step>, chain_id: u64) -> Fixture {
		fixture_with(
			ScriptedSource::on_network(steps, Some(NetworkInfo::from_chain_id(chain_id))),
			None,
			config(),
		)
	}

	#[tokio::test(start_paused = true)]
	async fn test_request_gets_gas_defaults_and_polls_locally() {
		let f = fixture(vec![Step::Receipt(0), Step::Receipt(1)], 31337);
		let (callback, calls) = callback_recorder();

		let submitted = f
			.transactor
			.send(TransactionRequest::default(), Some(callback))
			.await
			.unwrap();

		let requests = f.signer.requests();
		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].gas_price, Some(4_100_000_000));
		assert_eq!(requests[0].gas_limit, Some(120_000));

		let notifications = f.sink.notifications();
		assert_eq!(notifications[0].message, "Local Transaction Sent");
		assert_eq!(notifications[0].description, hash(1).to_hex());
		assert_eq!(
			submitted.explorer_link,
			format!("https://unknown.etherscan.io/tx/{}", hash(1))
		);
		assert_eq!(f.source.waits(), 1);

		let outcome = submitted.watch.unwrap().outcome().await.unwrap();
		let WatchOutcome::Confirmed(result) = outcome else {
			panic!("expected confirmation, got {:?}", outcome);
		};
		assert_eq!(result.response.gas_price, Some(4_100_000_000));
		assert_eq!(result.confirmations(), 1);
		assert_eq!(calls.lock().unwrap().len(), 1);
		assert_eq!(f.source.calls(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_explicit_gas_is_kept() {
		let f = fixture(vec![Step::Receipt(1)], 31337);

		f.transactor
			.send(
				TransactionRequest::default()
					.gas_price(9_000_000_000)
					.gas_limit(50_000),
				None,
			)
			.await
			.unwrap();

		let request = &f.signer.requests()[0];
		assert_eq!(request.gas_price, Some(9_000_000_000));
		assert_eq!(request.gas_limit, Some(50_000));
	}

	#[tokio::test(start_paused = true)]
	async fn test_submission_failure_reports_and_never_watches() {
		let f = fixture_with(
			ScriptedSource::on_network(vec![Step::Receipt(1)], Some(NetworkInfo::from_chain_id(31337))),
			Some(RecordingSigner::failing()),
			config(),
		);
		let (callback, calls) = callback_recorder();

		let submitted = f
			.transactor
			.send(TransactionRequest::default(), Some(callback))
			.await;
		assert!(submitted.is_none());

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(f.source.calls(), 0);
		assert_eq!(f.source.waits(), 0);
		assert!(calls.lock().unwrap().is_empty());
		assert_eq!(f.transactor.watcher().pending_count().await, 0);

		let notifications = f.sink.notifications();
		assert_eq!(notifications.len(), 1);
		assert_eq!(notifications[0].level, NotificationLevel::Error);
		assert_eq!(notifications[0].message, "Transaction Error");
		assert!(notifications[0].description.contains("insufficient funds"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_missing_signer_is_a_submission_failure() {
		let source = Arc::new(ScriptedSource::new(vec![Step::Receipt(1)]));
		let sink = Arc::new(MemorySink::new());
		let delivery = Arc::new(DeliveryService::new(source.clone(), None));
		let transactor = Transactor::new(delivery, None, sink.clone(), &config());

		assert!(transactor
			.send(TransactionRequest::default(), None)
			.await
			.is_none());
		assert_eq!(sink.notifications()[0].message, "Transaction Error");
	}

	#[tokio::test(start_paused = true)]
	async fn test_in_flight_transaction_on_supported_network_uses_push() {
		let f = fixture(vec![Step::Receipt(0)], 5);
		let (callback, calls) = callback_recorder();
		let in_flight = TransactionInput::in_flight(async {
			Ok(TransactionResponse::from_request(
				hash(7),
				&TransactionRequest::default(),
			))
		});

		let submitted = f.transactor.send(in_flight, Some(callback)).await.unwrap();
		assert!(f.signer.requests().is_empty());
		assert_eq!(
			submitted.explorer_link,
			format!("https://goerli.etherscan.io/tx/{}", hash(7))
		);
		assert!(f
			.sink
			.notifications()
			.iter()
			.all(|n| n.message != "Local Transaction Sent"));

		f.push
			.publish(PushEvent::new(hash(7), TransactionStatus::Confirmed))
			.await;
		assert!(matches!(
			submitted.watch.unwrap().outcome().await.unwrap(),
			WatchOutcome::Confirmed(_)
		));
		// Only the receipt fetch for the receipt-less confirmed event.
		assert_eq!(f.source.calls(), 1);
		assert_eq!(calls.lock().unwrap().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_in_flight_transaction() {
		let f = fixture(vec![Step::Receipt(1)], 1);
		let in_flight = TransactionInput::in_flight(async {
			Err(DeliveryError::TransactionFailed("user rejected".to_string()))
		});

		assert!(f.transactor.send(in_flight, None).await.is_none());
		assert!(f.sink.notifications()[0]
			.description
			.contains("user rejected"));
	}

	#[tokio::test(start_paused = true)]
	async fn test_xdai_and_override_explorer_links() {
		let f = fixture(vec![Step::Receipt(1)], 100);
		let submitted = f
			.transactor
			.send(TransactionRequest::default(), None)
			.await
			.unwrap();
		assert_eq!(
			submitted.explorer_link,
			format!("https://blockscout.com/poa/xdai/tx/{}", hash(1))
		);

		let mut overridden = config();
		overridden.transactor.explorer_url = Some("https://explorer.example.org/tx/".to_string());
		let f = fixture_with(
			ScriptedSource::on_network(vec![Step::Receipt(1)], Some(NetworkInfo::from_chain_id(100))),
			None,
			overridden,
		);
		let submitted = f
			.transactor
			.send(TransactionRequest::default(), None)
			.await
			.unwrap();
		assert_eq!(
			submitted.explorer_link,
			format!("https://explorer.example.org/tx/{}", hash(1))
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_unresolved_network_polls_and_skips_finalization_wait() {
		let mut config = config();
		config.transactor.wait_for_finalization = false;
		let f = fixture_with(
			ScriptedSource::on_network(vec![Step::Receipt(1)], None),
			None,
			config,
		);
		let (callback, calls) = callback_recorder();

		let submitted = f
			.transactor
			.send(TransactionRequest::default(), Some(callback))
			.await
			.unwrap();
		assert_eq!(
			submitted.explorer_link,
			format!("https://etherscan.io/tx/{}", hash(1))
		);
		assert_eq!(f.source.waits(), 0);

		assert!(matches!(
			submitted.watch.unwrap().outcome().await.unwrap(),
			WatchOutcome::Confirmed(_)
		));
		assert_eq!(calls.lock().unwrap().len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_resubmitting_a_watched_hash_reports_watch_error() {
		let f = fixture(vec![Step::Missing], 31337);
		let (first, first_calls) = callback_recorder();
		let (second, second_calls) = callback_recorder();

		let submitted = f
			.transactor
			.send(TransactionRequest::default(), Some(first))
			.await
			.unwrap();
		let again = f
			.transactor
			.send(TransactionRequest::default(), Some(second))
			.await
			.unwrap();

		assert!(submitted.watch.is_some());
		assert!(again.watch.is_none());
		assert!(f
			.sink
			.notifications()
			.iter()
			.any(|n| n.message == "Transaction Watch Error"));

		submitted.watch.unwrap().cancel();
		assert!(first_calls.lock().unwrap().is_empty());
		assert!(second_calls.lock().unwrap().is_empty());
	}
}
