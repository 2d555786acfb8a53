//! Transaction delivery types for the transactor.
//!
//! This module defines the request submitted to a signer, the response returned
//! once the network accepted it, the receipt reported by a confirmation source,
//! and the merged view handed to callbacks when a transaction is mined.

use crate::utils::{with_0x_prefix, without_0x_prefix};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes and serializes them as 0x-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Returns the hash as a 0x-prefixed lowercase hex string.
	pub fn to_hex(&self) -> String {
		with_0x_prefix(&hex::encode(&self.0))
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_hex())
	}
}

impl FromStr for TransactionHash {
	type Err = hex::FromHexError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		hex::decode(without_0x_prefix(s)).map(TransactionHash)
	}
}

impl Serialize for TransactionHash {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_hex())
	}
}

impl<'de> Deserialize<'de> for TransactionHash {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		s.parse()
			.map_err(|e| serde::de::Error::custom(format!("Invalid transaction hash '{}': {}", s, e)))
	}
}

/// Unsigned transaction fields handed to a signer.
///
/// Gas price and gas limit are optional; the transactor fills configured
/// defaults for whichever is missing before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
	/// Recipient address, `None` for contract creation.
	pub to: Option<Address>,
	/// Native value to transfer in wei.
	#[serde(default)]
	pub value: U256,
	/// Call data.
	#[serde(default)]
	pub data: Bytes,
	/// Explicit nonce, otherwise chosen by the signer.
	pub nonce: Option<u64>,
	/// Legacy gas price in wei.
	pub gas_price: Option<u128>,
	/// Gas limit.
	pub gas_limit: Option<u64>,
	/// Chain ID the transaction is meant for.
	pub chain_id: Option<u64>,
}

impl TransactionRequest {
	/// Sets the recipient address.
	pub fn to(mut self, to: Address) -> Self {
		self.to = Some(to);
		self
	}

	/// Sets the value in wei.
	pub fn value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	/// Sets the call data.
	pub fn data(mut self, data: impl Into<Bytes>) -> Self {
		self.data = data.into();
		self
	}

	/// Sets the gas price in wei.
	pub fn gas_price(mut self, gas_price: u128) -> Self {
		self.gas_price = Some(gas_price);
		self
	}

	/// Sets the gas limit.
	pub fn gas_limit(mut self, gas_limit: u64) -> Self {
		self.gas_limit = Some(gas_limit);
		self
	}
}

/// A transaction accepted by the network but not necessarily mined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
	/// The hash identifying the transaction.
	pub hash: TransactionHash,
	/// Sender address when known.
	pub from: Option<Address>,
	/// Recipient address, `None` for contract creation.
	pub to: Option<Address>,
	/// Native value transferred in wei.
	pub value: U256,
	/// Call data.
	pub data: Bytes,
	/// Sender nonce when known.
	pub nonce: Option<u64>,
	/// Gas price in wei when known.
	pub gas_price: Option<u128>,
	/// Gas limit when known.
	pub gas_limit: Option<u64>,
	/// Chain ID when known.
	pub chain_id: Option<u64>,
}

impl TransactionResponse {
	/// Builds a response for a request the network accepted under `hash`.
	pub fn from_request(hash: TransactionHash, request: &TransactionRequest) -> Self {
		Self {
			hash,
			from: None,
			to: request.to,
			value: request.value,
			data: request.data.clone(),
			nonce: request.nonce,
			gas_price: request.gas_price,
			gas_limit: request.gas_limit,
			chain_id: request.chain_id,
		}
	}
}

/// Transaction receipt as reported by a confirmation source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub transaction_hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Blocks mined on top of, and including, the transaction's block.
	pub confirmations: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Gas consumed by the transaction.
	#[serde(default)]
	pub gas_used: u64,
}

impl TransactionReceipt {
	/// Returns true once the receipt reports at least one confirmation.
	pub fn is_confirmed(&self) -> bool {
		self.confirmations > 0
	}
}

/// Merged view of a transaction response and its on-chain receipt.
///
/// Serializes as a single flat object so consumers see the response fields
/// and the receipt fields side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResult {
	#[serde(flatten)]
	pub response: TransactionResponse,
	#[serde(flatten)]
	pub receipt: TransactionReceipt,
}

impl ConfirmationResult {
	pub fn new(response: TransactionResponse, receipt: TransactionReceipt) -> Self {
		Self { response, receipt }
	}

	pub fn hash(&self) -> &TransactionHash {
		&self.response.hash
	}

	pub fn confirmations(&self) -> u64 {
		self.receipt.confirmations
	}
}
