//! Network metadata and block explorer helpers.
//!
//! Networks are identified by chain ID. Names follow the conventional ethers
//! naming so explorer subdomains line up with etherscan's testnet hosts.

use serde::{Deserialize, Serialize};

/// Chain IDs the push notification service tracks by default.
pub const DEFAULT_PUSH_NETWORKS: [u64; 6] = [1, 3, 4, 5, 42, 100];

/// Explorer base URL for Gnosis Chain (formerly xDai).
const XDAI_EXPLORER_TX_URL: &str = "https://blockscout.com/poa/xdai/tx/";

/// Chain ID and human-readable name of a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkInfo {
	pub chain_id: u64,
	pub name: String,
}

impl NetworkInfo {
	pub fn new(chain_id: u64, name: impl Into<String>) -> Self {
		Self {
			chain_id,
			name: name.into(),
		}
	}

	/// Resolves the conventional name for a chain ID.
	///
	/// Unrecognized chains (local development nodes included) are named "unknown".
	pub fn from_chain_id(chain_id: u64) -> Self {
		let name = match chain_id {
			1 => "homestead",
			3 => "ropsten",
			4 => "rinkeby",
			5 => "goerli",
			42 => "kovan",
			100 => "xdai",
			137 => "matic",
			11155111 => "sepolia",
			_ => "unknown",
		};
		Self::new(chain_id, name)
	}
}

/// Returns the block explorer base URL for transaction links.
///
/// The transaction hash is appended directly to the returned string.
pub fn explorer_tx_url(network: Option<&NetworkInfo>) -> String {
	match network {
		Some(network) if network.chain_id == 100 => XDAI_EXPLORER_TX_URL.to_string(),
		Some(network) if network.chain_id > 1 && !network.name.is_empty() => {
			format!("https://{}.etherscan.io/tx/", network.name)
		}
		_ => "https://etherscan.io/tx/".to_string(),
	}
}
