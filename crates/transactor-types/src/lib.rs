//! Common types module for the transactor workspace.
//!
//! This module defines the data types shared by the delivery, notification
//! and watcher crates: transaction requests and responses, receipts, the
//! merged confirmation view, network metadata, push events and user-facing
//! notifications.

/// Transaction submission and confirmation types.
pub mod delivery;
/// Push channel lifecycle events.
pub mod events;
/// Network metadata and block explorer helpers.
pub mod networks;
/// User-facing notification types.
pub mod notification;
/// Redacting wrapper for sensitive configuration values.
pub mod secret_string;
/// Utility functions for formatting and conversion.
pub mod utils;

pub use delivery::*;
pub use events::*;
pub use networks::{explorer_tx_url, NetworkInfo, DEFAULT_PUSH_NETWORKS};
pub use notification::*;
pub use secret_string::SecretString;
pub use utils::{parse_gwei, truncate_id, with_0x_prefix, without_0x_prefix};
