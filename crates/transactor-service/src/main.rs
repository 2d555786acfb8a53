//! Command-line entry point for the transactor.
//!
//! Sends a transaction, or picks up one already sent, and follows it until it
//! is mined. Notifications are written to the log and the merged receipt is
//! printed as JSON on stdout.

use alloy_primitives::{Address, Bytes, U256};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use transactor_config::Config;
use transactor_core::{TransactionCallback, TransactionInput, Transactor, WatchOutcome};
use transactor_delivery::implementations::evm::alloy::create_http_delivery;
use transactor_delivery::{ConfirmationSource, DeliveryError};
use transactor_notify::implementations::log::LogSink;
use transactor_types::{
	parse_gwei, truncate_id, ConfirmationResult, TransactionHash, TransactionRequest,
};

/// Command-line arguments for the transactor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Sign and send a transaction, then wait for it to be mined
	Send {
		/// Recipient address; omit to deploy a contract
		#[arg(long)]
		to: Option<Address>,

		/// Value in wei
		#[arg(long, default_value = "0")]
		value: U256,

		/// Hex-encoded call data
		#[arg(long, default_value = "0x")]
		data: Bytes,

		/// Gas price in gwei, overriding the configured default
		#[arg(long, value_parser = parse_gwei)]
		gas_price_gwei: Option<u128>,

		/// Gas limit, overriding the configured default
		#[arg(long)]
		gas_limit: Option<u64>,
	},
	/// Wait for a transaction that was already sent
	Watch {
		/// Transaction hash
		hash: TransactionHash,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(rpc_url = %config.network.rpc_url, "Loaded configuration");

	let delivery = Arc::new(create_http_delivery(&config.network)?);
	let input = match args.command {
		Command::Send {
			to,
			value,
			data,
			gas_price_gwei,
			gas_limit,
		} => {
			let mut request = TransactionRequest::default().value(value).data(data);
			request.to = to;
			request.gas_price = gas_price_gwei;
			request.gas_limit = gas_limit;
			TransactionInput::Request(request)
		}
		Command::Watch { hash } => {
			let source = delivery.confirmation_source();
			TransactionInput::in_flight(async move {
				source.get_transaction(&hash).await?.ok_or_else(|| {
					DeliveryError::TransactionFailed(format!("Transaction {} not found", hash))
				})
			})
		}
	};

	// The command line has no push channel, so watches always poll.
	let transactor = Transactor::new(delivery, None, Arc::new(LogSink), &config);

	let callback: TransactionCallback = Box::new(|result: ConfirmationResult| {
		tracing::info!(
			tx_hash = %truncate_id(&result.hash().to_hex()),
			block_number = result.receipt.block_number,
			gas_used = result.receipt.gas_used,
			"Transaction mined"
		);
	});

	let submitted = transactor
		.send(input, Some(callback))
		.await
		.ok_or("Transaction was not sent")?;
	tracing::info!("Explorer: {}", submitted.explorer_link);

	let Some(watch) = submitted.watch else {
		return Err("Transaction is not being watched".into());
	};
	let hash = watch.hash().clone();

	let outcome = tokio::select! {
		outcome = watch.outcome() => outcome?,
		_ = tokio::signal::ctrl_c() => {
			transactor.watcher().cancel(&hash).await;
			tracing::info!("Interrupted, stopped watching");
			return Ok(());
		}
	};

	match outcome {
		WatchOutcome::Confirmed(result) => {
			println!("{}", serde_json::to_string_pretty(&result)?);
			Ok(())
		}
		WatchOutcome::Failed { reason } => Err(format!("Transaction failed: {}", reason).into()),
		WatchOutcome::TimedOut { attempts } => {
			Err(format!("No confirmation after {} checks", attempts).into())
		}
		WatchOutcome::Cancelled => Err("Watch was cancelled".into()),
	}
}
