//! Launchpad - stakeholder roles from CRM association labels

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use launchpad_cli::{execute, Args, LogFormat};
use launchpad_roles::{CrmTransport, HttpTransport, StakeholderEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(2);
    }

    debug!(
        base_url = %args.base_url,
        strategy = %args.strategy,
        page_size = args.page_size,
        concurrency = args.concurrency,
        "Starting launchpad"
    );

    let transport: Arc<dyn CrmTransport> =
        Arc::new(HttpTransport::new(args.crm_config()).context("failed to build CRM client")?);
    let engine = StakeholderEngine::new(transport, args.engine_config());

    let output = execute(&engine, &args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output.body)?);

    if !output.success {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "launchpad={level},launchpad_cli={level},launchpad_roles={level},warn",
            level = args.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
