//! User-facing notification types.
//!
//! Notifications are rendered by whatever sink the embedding application
//! provides; these types only describe what to show.

use serde::{Deserialize, Serialize};

/// Severity of a notification banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
	Info,
	Error,
}

/// A notification banner with an optional click-through link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
	pub level: NotificationLevel,
	pub message: String,
	pub description: String,
	/// Opened when the user clicks the banner, usually a block explorer page.
	pub link: Option<String>,
}

impl Notification {
	pub fn info(message: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Info,
			message: message.into(),
			description: description.into(),
			link: None,
		}
	}

	pub fn error(message: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Error,
			message: message.into(),
			description: description.into(),
			link: None,
		}
	}

	pub fn with_link(mut self, link: impl Into<String>) -> Self {
		self.link = Some(link.into());
		self
	}
}
