//! Transaction delivery module for the transactor.
//!
//! This module defines the two collaborators the transactor talks to on the
//! chain side: a signer that submits transactions, and a read-only provider
//! that reports network metadata and receipts. `DeliveryService` pairs them the
//! way a provider-or-signer input is resolved into both halves.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use transactor_types::{
	NetworkInfo, TransactionHash, TransactionReceipt, TransactionRequest, TransactionResponse,
};

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when a transaction execution fails.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when a transaction is submitted without a signer.
	#[error("No signer available to send the transaction")]
	NoSigner,
}

/// An entity capable of authorizing and submitting transactions.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Signs and submits a transaction.
	///
	/// Returns once the network accepted the transaction; it is not
	/// necessarily mined yet.
	async fn send_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionResponse, DeliveryError>;
}

/// Read-only view of a network used to follow submitted transactions.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
	/// Returns the chain ID and name of the connected network.
	async fn network(&self) -> Result<NetworkInfo, DeliveryError>;

	/// Retrieves the receipt for a transaction.
	///
	/// Returns `Ok(None)` while the transaction is not mined.
	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;

	/// Looks up a transaction by hash, mined or pending.
	async fn get_transaction(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionResponse>, DeliveryError>;

	/// Waits until the transaction has at least `confirmations` confirmations.
	///
	/// Callers bound the wait themselves; implementations may block indefinitely.
	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError>;
}

/// A resolved provider-or-signer pair.
///
/// The provider is always present. The signer is optional: without one,
/// in-flight transactions can still be followed but nothing can be sent.
pub struct DeliveryService {
	/// Provider used for network metadata and receipts.
	provider: Arc<dyn ConfirmationSource>,
	/// Signer used for submission, if any.
	signer: Option<Arc<dyn SignerInterface>>,
	/// Network metadata, fetched once.
	network: OnceCell<NetworkInfo>,
}

impl DeliveryService {
	pub fn new(
		provider: Arc<dyn ConfirmationSource>,
		signer: Option<Arc<dyn SignerInterface>>,
	) -> Self {
		Self {
			provider,
			signer,
			network: OnceCell::new(),
		}
	}

	/// Returns the connected network, querying the provider on first use.
	pub async fn network(&self) -> Result<NetworkInfo, DeliveryError> {
		self.network
			.get_or_try_init(|| self.provider.network())
			.await
			.cloned()
	}

	pub fn has_signer(&self) -> bool {
		self.signer.is_some()
	}

	/// Sends a transaction through the signer.
	pub async fn send(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionResponse, DeliveryError> {
		let signer = self.signer.as_ref().ok_or(DeliveryError::NoSigner)?;
		signer.send_transaction(request).await
	}

	/// Returns the provider shared with watchers.
	pub fn confirmation_source(&self) -> Arc<dyn ConfirmationSource> {
		Arc::clone(&self.provider)
	}

	/// Waits for a transaction to reach the given number of confirmations.
	pub async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		self.provider.wait_for_confirmation(hash, confirmations).await
	}
}
