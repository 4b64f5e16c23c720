// ABOUTME: Entry point for the nodeapi CLI application.
// ABOUTME: Parses arguments, connects to the runtime and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use nodeapi::config::Config;
use nodeapi::error::Result;
use nodeapi::node::Node;
use nodeapi::output::{Output, OutputMode};
use nodeapi::runtime::ConnectionManager;
use nodeapi::status::LocalHostProbe;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // --verbose wins; otherwise RUST_LOG, then warn
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Normal
    });

    if let Err(e) = run(cli, &output).await {
        output.error(&e.to_string());
        std::process::exit(e.kind().exit_code());
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    let config = Config::resolve(cli.config.as_deref(), &cwd)?;

    let manager = ConnectionManager::new(&config.runtime);
    let endpoint = manager.endpoint();
    output.progress(&format!(
        "→ Connecting to {} at {}",
        endpoint.runtime_type, endpoint.socket_path
    ));
    let runtime = manager.connect().await?;
    let node = Node::from_config(runtime, &config);

    match cli.command {
        Commands::Containers(command) => commands::containers(&node, command, output).await,
        Commands::Images(command) => commands::images(&node, command, output).await,
        Commands::Networks(command) => commands::networks(&node, command, output).await,
        Commands::Services(command) => commands::services(&node, command, output).await,
        Commands::Status => {
            let status = node.status(&LocalHostProbe).await?;
            output.result(&status, || {
                format!(
                    "{} ({} {})\n  CPUs: {}  CPU: {:.1}%  Memory: {:.1}% of {} bytes\n  Address: {}\n  Containers: {}",
                    status.host.node_id,
                    status.host.os_name,
                    status.host.os_version,
                    status.host.cpu_count,
                    status.host.cpu_percent,
                    status.host.mem_percent,
                    status.host.total_memory,
                    status.host.ip_address,
                    status.host.num_containers
                )
            });
            Ok(())
        }
    }
}
