//! Alloy-based EVM delivery implementation.
//!
//! Talks JSON-RPC over HTTP. When a private key is configured the provider is
//! built with a wallet and the recommended fillers, so nonce and chain ID are
//! filled in before signing; otherwise it is read-only.

use crate::{ConfirmationSource, DeliveryError, DeliveryService, SignerInterface};
use alloy_consensus::Transaction as _;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, FixedBytes, TxKind};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest as AlloyTransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use transactor_config::NetworkConfig;
use transactor_types::{
	truncate_id, NetworkInfo, TransactionHash, TransactionReceipt, TransactionRequest,
	TransactionResponse,
};

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

/// Alloy-based EVM delivery implementation.
pub struct AlloyDelivery {
	provider: HttpProvider,
	/// Address of the configured signer, `None` for a read-only provider.
	sender: Option<Address>,
	/// Interval between receipt checks while waiting for confirmations.
	poll_interval: Duration,
}

impl AlloyDelivery {
	/// Creates a provider for the configured RPC endpoint.
	///
	/// The private key, when present and non-blank, turns the provider into a
	/// signing one.
	pub fn new(config: &NetworkConfig) -> Result<Self, DeliveryError> {
		let url: reqwest::Url = config.rpc_url.parse().map_err(|e| {
			DeliveryError::Network(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
		})?;
		let poll_interval = Duration::from_millis(config.rpc_poll_interval_ms);

		let (provider, sender) = match config.signing_key() {
			Some(key) => {
				let signer: PrivateKeySigner = key.with_exposed(|key| {
					key.trim()
						.parse()
						.map_err(|_| DeliveryError::Network("Invalid private key format".to_string()))
				})?;
				let sender = signer.address();
				let provider = ProviderBuilder::new()
					.with_recommended_fillers()
					.wallet(EthereumWallet::from(signer))
					.on_http(url);
				provider.client().set_poll_interval(poll_interval);
				(Arc::new(provider) as HttpProvider, Some(sender))
			}
			None => {
				let provider = ProviderBuilder::new().on_http(url);
				provider.client().set_poll_interval(poll_interval);
				(Arc::new(provider) as HttpProvider, None)
			}
		};

		Ok(Self {
			provider,
			sender,
			poll_interval,
		})
	}

	pub fn sender(&self) -> Option<Address> {
		self.sender
	}
}

/// Converts a transaction hash into the fixed-size form alloy expects.
fn to_tx_hash(hash: &TransactionHash) -> Result<FixedBytes<32>, DeliveryError> {
	if hash.0.len() != 32 {
		return Err(DeliveryError::Network(format!(
			"Transaction hash must be 32 bytes, got {}",
			hash.0.len()
		)));
	}
	Ok(FixedBytes::<32>::from_slice(&hash.0))
}

fn to_alloy_request(request: &TransactionRequest, from: Option<Address>) -> AlloyTransactionRequest {
	let mut alloy_request = AlloyTransactionRequest {
		from,
		value: Some(request.value),
		input: TransactionInput::new(request.data.clone()),
		nonce: request.nonce,
		gas_price: request.gas_price,
		gas: request.gas_limit,
		chain_id: request.chain_id,
		..Default::default()
	};
	alloy_request.to = Some(match request.to {
		Some(to) => TxKind::Call(to),
		None => TxKind::Create,
	});
	alloy_request
}

#[async_trait]
impl SignerInterface for AlloyDelivery {
	async fn send_transaction(
		&self,
		request: TransactionRequest,
	) -> Result<TransactionResponse, DeliveryError> {
		let from = self.sender.ok_or(DeliveryError::NoSigner)?;

		let pending_tx = self
			.provider
			.send_transaction(to_alloy_request(&request, Some(from)))
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let hash = TransactionHash(pending_tx.tx_hash().0.to_vec());
		tracing::info!(tx_hash = %truncate_id(&hash.to_hex()), "Submitted transaction");

		let mut response = TransactionResponse::from_request(hash, &request);
		response.from = Some(from);
		Ok(response)
	}
}

#[async_trait]
impl ConfirmationSource for AlloyDelivery {
	async fn network(&self) -> Result<NetworkInfo, DeliveryError> {
		let chain_id = self
			.provider
			.get_chain_id()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get chain id: {}", e)))?;

		Ok(NetworkInfo::from_chain_id(chain_id))
	}

	async fn get_receipt(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let tx_hash = to_tx_hash(hash)?;

		let Some(receipt) = self
			.provider
			.get_transaction_receipt(tx_hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?
		else {
			return Ok(None);
		};

		let confirmations = match receipt.block_number {
			Some(tx_block) => {
				let current_block = self.provider.get_block_number().await.map_err(|e| {
					DeliveryError::Network(format!("Failed to get block number: {}", e))
				})?;
				current_block.saturating_sub(tx_block) + 1
			}
			None => 0,
		};

		Ok(Some(TransactionReceipt {
			transaction_hash: TransactionHash(receipt.transaction_hash.0.to_vec()),
			block_number: receipt.block_number.unwrap_or(0),
			confirmations,
			success: receipt.status(),
			gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
		}))
	}

	async fn get_transaction(
		&self,
		hash: &TransactionHash,
	) -> Result<Option<TransactionResponse>, DeliveryError> {
		let tx_hash = to_tx_hash(hash)?;

		let transaction = self
			.provider
			.get_transaction_by_hash(tx_hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get transaction: {}", e)))?;

		Ok(transaction.map(|tx| TransactionResponse {
			hash: hash.clone(),
			from: Some(tx.from),
			to: tx.to(),
			value: tx.value(),
			data: tx.input().clone(),
			nonce: Some(tx.nonce()),
			gas_price: tx.gas_price(),
			gas_limit: Some(tx.gas_limit()),
			chain_id: tx.chain_id(),
		}))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		tracing::debug!(
			tx_hash = %truncate_id(&hash.to_hex()),
			"Waiting for {} confirmations",
			confirmations
		);

		loop {
			match self.get_receipt(hash).await? {
				Some(receipt) if !receipt.success => {
					return Err(DeliveryError::TransactionFailed(format!(
						"Transaction {} reverted in block {}",
						hash, receipt.block_number
					)));
				}
				Some(receipt) if receipt.confirmations >= confirmations => return Ok(receipt),
				_ => tokio::time::sleep(self.poll_interval).await,
			}
		}
	}
}

/// Builds a `DeliveryService` backed by an HTTP provider.
///
/// The provider doubles as the signer when a private key is configured.
pub fn create_http_delivery(config: &NetworkConfig) -> Result<DeliveryService, DeliveryError> {
	let delivery = Arc::new(AlloyDelivery::new(config)?);
	let signer = delivery
		.sender()
		.is_some()
		.then(|| Arc::clone(&delivery) as Arc<dyn SignerInterface>);

	Ok(DeliveryService::new(delivery, signer))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Bytes, U256};
	use transactor_types::SecretString;

	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn network_config(private_key: Option<&str>) -> NetworkConfig {
		NetworkConfig {
			rpc_url: "http://localhost:8545".to_string(),
			private_key: private_key.map(SecretString::from),
			rpc_poll_interval_ms: 1000,
		}
	}

	#[test]
	fn test_to_tx_hash_rejects_short_hash() {
		assert!(to_tx_hash(&TransactionHash(vec![1; 20])).is_err());
		assert!(to_tx_hash(&TransactionHash(vec![1; 32])).is_ok());
	}

	#[test]
	fn test_to_alloy_request() {
		let to = Address::repeat_byte(0x22);
		let request = TransactionRequest::default()
			.to(to)
			.value(U256::from(5u64))
			.data(Bytes::from(vec![0xde, 0xad]))
			.gas_price(4_100_000_000)
			.gas_limit(120_000);

		let alloy_request = to_alloy_request(&request, None);
		assert_eq!(alloy_request.to, Some(TxKind::Call(to)));
		assert_eq!(alloy_request.value, Some(U256::from(5u64)));
		assert_eq!(alloy_request.gas_price, Some(4_100_000_000));
		assert_eq!(alloy_request.gas, Some(120_000));

		let deploy = to_alloy_request(&TransactionRequest::default(), None);
		assert_eq!(deploy.to, Some(TxKind::Create));
	}

	#[tokio::test]
	async fn test_signing_key_enables_signer() {
		let delivery = AlloyDelivery::new(&network_config(Some(TEST_KEY))).unwrap();
		assert_eq!(
			delivery.sender(),
			Some(
				"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
					.parse::<Address>()
					.unwrap()
			)
		);

		let service = create_http_delivery(&network_config(Some(TEST_KEY))).unwrap();
		assert!(service.has_signer());
	}

	#[tokio::test]
	async fn test_read_only_provider() {
		let service = create_http_delivery(&network_config(None)).unwrap();
		assert!(!service.has_signer());

		let blank = create_http_delivery(&network_config(Some(""))).unwrap();
		assert!(!blank.has_signer());
	}

	#[test]
	fn test_invalid_inputs() {
		let mut config = network_config(Some("not-a-key"));
		assert!(matches!(
			AlloyDelivery::new(&config),
			Err(DeliveryError::Network(_))
		));

		config.private_key = None;
		config.rpc_url = "not a url".to_string();
		assert!(AlloyDelivery::new(&config).is_err());
	}
}
