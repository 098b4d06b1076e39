//! crunchbot - conversational NFT analytics
//!
//! Serves the chat API, or runs one question from the command line.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use crunchbot::{
    analytics::ENDPOINTS,
    cli::{Cli, Command, OutputFormat},
    config::Config,
    pipeline::Pipeline,
    server::Server,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Some(Command::Route { ref query }) => run_route(&cli, query).await,
        Some(Command::Ask { ref query }) => run_ask(&cli, query).await,
        Some(Command::Endpoints { format }) => print_endpoints(format),
        Some(Command::Serve) | None => return run_server(cli).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }
    Ok(config)
}

/// Route a question and print the routing decision
async fn run_route(cli: &Cli, query: &str) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let pipeline = Pipeline::from_config(&config).context("Failed to build pipeline")?;
    let routed = pipeline.route(query).await.context("Routing failed")?;
    println!("{}", serde_json::to_string_pretty(&routed)?);
    Ok(())
}

/// Answer a question end to end
async fn run_ask(cli: &Cli, query: &str) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let pipeline = Pipeline::from_config(&config).context("Failed to build pipeline")?;
    let response = pipeline.query(query).await.context("Query failed")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn print_endpoints(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ENDPOINTS[..])?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&ENDPOINTS[..])?),
        OutputFormat::Table => {
            println!("{:<12} {:<28} SORT KEYS", "ENDPOINT", "PARAMETERS");
            for spec in &ENDPOINTS {
                let sort_by = if spec.sort_by.is_empty() {
                    "-".to_string()
                } else {
                    spec.sort_by.join(", ")
                };
                println!("{:<12} {:<28} {sort_by}", spec.name.as_str(), spec.params.join(","));
            }
        }
    }
    Ok(())
}

/// Run the HTTP server
async fn run_server(cli: Cli) -> ExitCode {
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        model = %config.llm.model,
        "Starting crunchbot"
    );

    let server = match Server::new(config).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create server: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
