// ABOUTME: Network subcommand handlers.
// ABOUTME: List, create, remove and attach containers.

use super::LocalNode;
use crate::cli::NetworkCommand;
use nodeapi::error::Result;
use nodeapi::output::Output;
use nodeapi::types::ContainerId;

pub async fn networks(node: &LocalNode, command: NetworkCommand, output: &Output) -> Result<()> {
    match command {
        NetworkCommand::List => {
            let networks = node.list_networks().await?;
            output.result(&networks, || {
                networks
                    .iter()
                    .map(|n| format!("{:<12}  {:<20}  {:<8}  {}", n.id.short(), n.name, n.driver, n.subnets.join(",")))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        NetworkCommand::Create {
            name,
            subnet,
            gateway,
        } => {
            let id = node.create_network(&name, &subnet, &gateway).await?;
            output.result(&id, || id.to_string());
        }
        NetworkCommand::Remove { name } => {
            node.remove_network(&name).await?;
            output.success(&format!("removed {}", name));
        }
        NetworkCommand::Attach { container, network } => {
            let ip = node
                .attach_container(&ContainerId::new(container), &network)
                .await?;
            output.result(&ip, || ip.clone());
        }
    }
    Ok(())
}
