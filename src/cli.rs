// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use nodeapi::types::{ContainerName, UnitName};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nodeapi")]
#[command(about = "Node-local container lifecycle, routing and inventory for Podman and Docker")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: nodeapi.yml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Container lifecycle
    #[command(subcommand)]
    Containers(ContainerCommand),

    /// Image management
    #[command(subcommand)]
    Images(ImageCommand),

    /// Network management
    #[command(subcommand)]
    Networks(NetworkCommand),

    /// Managed services inside a container
    #[command(subcommand)]
    Services(ServiceCommand),

    /// Host telemetry and container inventory
    Status,
}

#[derive(Subcommand)]
pub enum ContainerCommand {
    /// List all containers with stats
    List,

    /// Start a container and route its ports
    Start {
        id: String,

        /// Start without provisioning a proxy route
        #[arg(long)]
        no_route: bool,
    },

    /// Stop a running container
    Stop { id: String },

    /// Create a container from an image
    Create {
        image: String,

        name: ContainerName,

        #[command(flatten)]
        options: CreateArgs,

        /// Start and route the container after creating it
        #[arg(long)]
        start: bool,
    },

    /// Create, start and route an eBPF probe container
    Probe {
        /// Image (default: base_ebpf:latest)
        #[arg(long)]
        image: Option<String>,

        /// Name (default: random job id)
        #[arg(long)]
        name: Option<ContainerName>,

        #[command(flatten)]
        options: CreateArgs,
    },

    /// Remove a container with its route and log directory
    Remove { id: String },

    /// Print a container's name
    Name { id: String },

    /// Print a container's IP address
    Ip { id: String },

    /// Run a command inside a running container
    Exec {
        id: String,

        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Static IP on the default network
    #[arg(long)]
    pub ip: Option<IpAddr>,

    /// CPU quota (1.5 = one and a half CPUs)
    #[arg(long)]
    pub cpus: Option<f64>,

    /// Memory limit in bytes
    #[arg(long)]
    pub memory: Option<i64>,
}

#[derive(Subcommand)]
pub enum ImageCommand {
    /// List images
    List,

    /// Force-remove an image
    Remove { reference: String },
}

#[derive(Subcommand)]
pub enum NetworkCommand {
    /// List networks
    List,

    /// Create a bridge network
    Create {
        name: String,

        #[arg(long)]
        subnet: String,

        #[arg(long)]
        gateway: String,
    },

    /// Remove a network
    Remove { name: String },

    /// Connect a container to a network and print its address
    Attach { container: String, network: String },
}

#[derive(Subcommand)]
pub enum ServiceCommand {
    /// List managed services in a container
    List { container: String },

    /// Start a managed service
    Start { container: String, unit: UnitName },

    /// Stop a managed service
    Stop { container: String, unit: UnitName },
}
