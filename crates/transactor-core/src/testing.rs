//! Test doubles shared by the watcher and transactor tests.

use crate::TransactionCallback;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use transactor_config::WatcherConfig;
use transactor_delivery::{ConfirmationSource, DeliveryError, SignerInterface};
use transactor_types::{
	ConfirmationResult, NetworkInfo, TransactionHash, TransactionReceipt, TransactionRequest,
	TransactionResponse,
};

/// What the scripted source answers to one `get_receipt` call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
	/// Not mined yet.
	Missing,
	/// Mined with the given confirmation count.
	Receipt(u64),
	/// RPC failure.
	Error,
}

/// Confirmation source answering receipt queries from a script.
///
/// The last step repeats once the script is exhausted.
pub struct ScriptedSource {
	steps: Vec<Step>,
	network: Option<NetworkInfo>,
	calls: Mutex<Vec<Instant>>,
	waits: AtomicUsize,
}

impl ScriptedSource {
	pub fn new(steps: Vec<Step>) -> Self {
		Self::on_network(steps, Some(NetworkInfo::from_chain_id(31337)))
	}

	pub fn on_network(steps: Vec<Step>, network: Option<NetworkInfo>) -> Self {
		Self {
			steps,
			network,
			calls: Mutex::new(Vec::new()),
			waits: AtomicUsize::new(0),
		}
	}

	/// Number of `get_receipt` calls so far.
	pub fn calls(&self) -> usize {
		self.calls.lock().unwrap().len()
	}

	pub fn call_times(&self) -> Vec<Instant> {
		self.calls.lock().unwrap().clone()
	}

	/// Number of `wait_for_confirmation` calls so far.
	pub fn waits(&self) -> usize {
		self.waits.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ConfirmationSource for ScriptedSource {
	async fn network(&self) -> Result<NetworkInfo, DeliveryError> {
		self.network
			.clone()
			.ok_or_else(|| DeliveryError::Network("connection refused".to_string()))
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let step = {
			let mut calls = self.calls.lock().unwrap();
			calls.push(Instant::now());
			let index = (calls.len() - 1).min(self.steps.len().saturating_sub(1));
			self.steps.get(index).copied().unwrap_or(Step::Missing)
		};

		match step {
			Step::Missing => Ok(None),
			Step::Receipt(confirmations) => Ok(Some(TransactionReceipt {
				transaction_hash: hash.clone(),
				block_number: 100,
				confirmations,
				success: true,
				gas_used: 21_000,
			})),
			Step::Error => Err(DeliveryError::Network("rpc unavailable".to_string())),
		}
	}

	async fn get_transaction(
		&self,
		_hash: &TransactionHash,
	) -> Result<Option<TransactionResponse>, DeliveryError> {
		Ok(None)
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.waits.fetch_add(1, Ordering::SeqCst);
		Ok(TransactionReceipt {
			transaction_hash: hash.clone(),
			block_number: 100,
			confirmations,
			success: true,
			gas_used: 21_000,
		})
	}
}

/// Signer that records requests and answers with a fixed hash, or fails.
pub struct RecordingSigner {
	hash: TransactionHash,
	fail: bool,
	requests: Mutex<Vec<TransactionRequest>>,
}

impl RecordingSigner {
	pub fn new(seed: u8) -> Self {
		Self {
			hash: hash(seed),
			fail: false,
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn failing() -> Self {
		Self {
			fail: true,
			..Self::new(0)
		}
	}

	pub fn requests(&self) -> Vec<TransactionRequest> {
		self.requests.lock().unwrap().clone()
	}
}

#[async_trait]
impl SignerInterface for RecordingSigner {
	async fn send_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionResponse, DeliveryError> {
		self.requests.lock().unwrap().push(request.clone());
		if self.fail {
			return Err(DeliveryError::Network("insufficient funds for gas".to_string()));
		}
		Ok(TransactionResponse::from_request(self.hash.clone(), &request))
	}
}

pub fn hash(seed: u8) -> TransactionHash {
	TransactionHash(vec![seed; 32])
}

pub fn response(seed: u8) -> TransactionResponse {
	TransactionResponse::from_request(hash(seed), &TransactionRequest::default().gas_limit(21_000))
}

pub fn confirmed_receipt(seed: u8, confirmations: u64) -> TransactionReceipt {
	TransactionReceipt {
		transaction_hash: hash(seed),
		block_number: 200,
		confirmations,
		success: true,
		gas_used: 21_000,
	}
}

pub fn watcher_config() -> WatcherConfig {
	WatcherConfig::default()
}

/// Returns a callback that records every result it receives.
pub fn callback_recorder() -> (TransactionCallback, Arc<Mutex<Vec<ConfirmationResult>>>) {
	let calls = Arc::new(Mutex::new(Vec::new()));
	let recorded = Arc::clone(&calls);
	let callback: TransactionCallback = Box::new(move |result| {
		recorded.lock().unwrap().push(result);
	});
	(callback, calls)
}
