//! Poll loop used when no push channel covers the network.

use super::{WatchContext, WatchOutcome};
use std::sync::atomic::Ordering;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::instrument;
use transactor_types::truncate_id;

/// Queries the confirmation source every poll interval until the receipt
/// reports at least one confirmation.
///
/// The first query happens one interval after the loop starts. Query errors
/// are logged and retried on the next tick.
#[instrument(skip_all, fields(tx_hash = %truncate_id(&ctx.hash.to_hex())))]
pub(super) async fn poll_until_confirmed(ctx: &WatchContext) -> WatchOutcome {
	let mut ticker = interval_at(Instant::now() + ctx.poll_interval, ctx.poll_interval);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = ctx.cancel.notified() => return ctx.cancelled().await,
			_ = ticker.tick() => {}
		}

		let attempt = ctx.attempts.fetch_add(1, Ordering::SeqCst) + 1;
		match ctx.source.get_receipt(&ctx.hash).await {
			Ok(Some(receipt)) if receipt.is_confirmed() => return ctx.deliver(receipt).await,
			Ok(Some(_)) => tracing::debug!(attempt, "Receipt has no confirmations yet"),
			Ok(None) => tracing::debug!(attempt, "Waiting for transaction to be mined"),
			Err(e) => tracing::warn!(attempt, error = %e, "Failed to check transaction receipt"),
		}

		if ctx.max_poll_attempts.is_some_and(|max| attempt >= max) {
			return ctx.time_out().await;
		}
	}
}
