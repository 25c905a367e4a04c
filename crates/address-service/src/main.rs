//! Main entry point for the address validation service.
//!
//! Validates the shipping address of submitted sales orders against the UPS
//! address validation API and records the result on the order. Runs either
//! once for a single order or as an HTTP server receiving order-submitted
//! events.

use address_config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod factory_registry;
mod server;

/// Command-line arguments for the address validation service.
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

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
	/// Validate the shipping address of one order and print the outcome
	Validate {
		/// Identifier of the sales order
		order_id: String,
	},
	/// Serve the order-submitted event endpoint
	Serve,
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

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let api_config = config.api.clone().unwrap_or_default();
	let workflow = Arc::new(factory_registry::build_workflow_from_config(config)?);

	match args.command {
		Command::Validate { order_id } => {
			let outcome = workflow.run(&order_id).await;
			println!("{}", serde_json::to_string_pretty(&outcome)?);
		},
		Command::Serve => {
			if !api_config.enabled {
				return Err("API is disabled in configuration ([api] enabled = false)".into());
			}
			server::start_server(api_config, workflow).await?;
			tracing::info!("API server finished");
		},
	}

	Ok(())
}
