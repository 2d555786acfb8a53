//! Push event loop used when the push channel covers the network.

use super::{poll, WatchContext, WatchOutcome};
use tokio::sync::mpsc;
use tracing::instrument;
use transactor_types::{truncate_id, Notification, PushEvent, TransactionStatus};

/// Follows push events for the watched hash.
///
/// Every event is shown as a notification linking to the block explorer. The
/// first confirmation ends the watch and delivers the result; failures end it
/// without invoking the callback. If the stream ends early and a callback is
/// waiting, the watch continues by polling.
#[instrument(skip_all, fields(tx_hash = %truncate_id(&ctx.hash.to_hex())))]
pub(super) async fn follow_push_events(
	ctx: &WatchContext,
	mut events: mpsc::Receiver<PushEvent>,
) -> WatchOutcome {
	loop {
		let event = tokio::select! {
			_ = ctx.cancel.notified() => return ctx.cancelled().await,
			event = events.recv() => event,
		};

		let Some(event) = event else {
			if ctx.registry.has_callback(&ctx.hash).await {
				tracing::warn!("Push stream ended before confirmation, polling instead");
				return poll::poll_until_confirmed(ctx).await;
			}
			return ctx
				.fail("Push channel stopped tracking the transaction".to_string())
				.await;
		};

		tracing::debug!(status = ?event.status, "Received push event");
		ctx.sink.notify(
			Notification::info(event.status.title(), event.hash.to_hex())
				.with_link(ctx.explorer_link.clone()),
		);

		match event.status {
			TransactionStatus::Confirmed => {
				let receipt = match event.receipt {
					Some(receipt) => Some(receipt),
					None => match ctx.source.get_receipt(&ctx.hash).await {
						Ok(receipt) => receipt,
						Err(e) => {
							tracing::warn!(error = %e, "Failed to fetch receipt for confirmed transaction");
							None
						}
					},
				};

				match receipt {
					Some(mut receipt) => {
						// A confirmed event means the transaction is in a block.
						receipt.confirmations = receipt.confirmations.max(1);
						return ctx.deliver(receipt).await;
					}
					None => tracing::debug!("Confirmed event without a receipt yet"),
				}
			}
			TransactionStatus::Failed | TransactionStatus::Cancel | TransactionStatus::Dropped => {
				let reason = event
					.reason
					.unwrap_or_else(|| event.status.title().to_string());
				return ctx.fail(reason).await;
			}
			TransactionStatus::Pending | TransactionStatus::Speedup => {}
		}
	}
}
