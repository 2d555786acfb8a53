//! Notification sink that writes banners to the tracing log.
//!
//! Used by the command-line binary, where there is no UI to render into.

use crate::NotificationSink;
use transactor_types::{Notification, NotificationLevel};

/// Logs every notification at a level matching its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
	fn notify(&self, notification: Notification) {
		let link = notification.link.as_deref().unwrap_or("");
		match notification.level {
			NotificationLevel::Info => tracing::info!(
				link = %link,
				"{}: {}",
				notification.message,
				notification.description
			),
			NotificationLevel::Error => tracing::error!(
				link = %link,
				"{}: {}",
				notification.message,
				notification.description
			),
		}
	}
}
