//! Lifecycle events reported by a push notification channel.
//!
//! A push channel tracks transaction hashes on behalf of the client and emits
//! one event per observed state change, so no client-side polling is needed.

use crate::{TransactionHash, TransactionReceipt};
use serde::{Deserialize, Serialize};

/// State of a tracked transaction as reported by the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
	/// Seen in the mempool.
	Pending,
	/// Replaced by a transaction with the same nonce and a higher fee.
	Speedup,
	/// Replaced by a zero-value self transfer with the same nonce.
	Cancel,
	/// Included in a block.
	Confirmed,
	/// Included in a block but reverted.
	Failed,
	/// Evicted from the mempool.
	Dropped,
}

impl TransactionStatus {
	/// Returns true if no further events are expected for the hash.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			TransactionStatus::Confirmed
				| TransactionStatus::Failed
				| TransactionStatus::Cancel
				| TransactionStatus::Dropped
		)
	}

	/// Short banner title for the status.
	pub fn title(&self) -> &'static str {
		match self {
			TransactionStatus::Pending => "Transaction Pending",
			TransactionStatus::Speedup => "Transaction Sped Up",
			TransactionStatus::Cancel => "Transaction Cancelled",
			TransactionStatus::Confirmed => "Transaction Confirmed",
			TransactionStatus::Failed => "Transaction Failed",
			TransactionStatus::Dropped => "Transaction Dropped",
		}
	}
}

/// A single event emitted by the push channel for a tracked hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
	pub hash: TransactionHash,
	pub status: TransactionStatus,
	/// Receipt data when the channel includes it with the event.
	pub receipt: Option<TransactionReceipt>,
	/// Failure reason for failed or dropped transactions.
	pub reason: Option<String>,
}

impl PushEvent {
	pub fn new(hash: TransactionHash, status: TransactionStatus) -> Self {
		Self {
			hash,
			status,
			receipt: None,
			reason: None,
		}
	}

	pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
		self.receipt = Some(receipt);
		self
	}

	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}
}
