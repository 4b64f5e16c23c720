// ABOUTME: Container subcommand handlers.
// ABOUTME: Lifecycle transitions, inventory, lookups and exec.

use super::LocalNode;
use crate::cli::{ContainerCommand, CreateArgs};
use nodeapi::error::Result;
use nodeapi::lifecycle::{ContainerRecord, CreateOptions};
use nodeapi::output::Output;
use nodeapi::types::{ContainerId, ContainerName};

pub async fn containers(node: &LocalNode, command: ContainerCommand, output: &Output) -> Result<()> {
    match command {
        ContainerCommand::List => {
            let records = node.list_containers().await?;
            output.result(&records, || render_records(&records));
        }
        ContainerCommand::Start { id, no_route } => {
            let id = ContainerId::new(id);
            let result = if no_route {
                node.coordinator()
                    .start_container(node.runtime(), &id)
                    .await?
            } else {
                node.start_and_route(&id).await?
            };
            output.result(&result, || format!("{} {}", result.id, result.state));
        }
        ContainerCommand::Stop { id } => {
            let result = node.stop(&ContainerId::new(id)).await?;
            output.result(&result, || format!("{} {}", result.id, result.state));
        }
        ContainerCommand::Create {
            image,
            name,
            options,
            start,
        } => {
            let options = create_options(&options);
            let id = if start {
                node.launch(&image, &name, &options).await?
            } else {
                node.create(&image, &name, &options).await?
            };
            output.result(&id, || id.to_string());
        }
        ContainerCommand::Probe {
            image,
            name,
            options,
        } => {
            let id = node
                .launch_probe(image.as_deref(), name, &create_options(&options))
                .await?;
            output.result(&id, || id.to_string());
        }
        ContainerCommand::Remove { id } => {
            let id = ContainerId::new(id);
            let name = ContainerName::new(&node.container_name(&id).await?)?;
            node.decommission(&id, &name).await?;
            output.success(&format!("removed {}", name));
        }
        ContainerCommand::Name { id } => {
            let name = node.container_name(&ContainerId::new(id)).await?;
            output.result(&name, || name.clone());
        }
        ContainerCommand::Ip { id } => {
            let ip = node.container_ip(&ContainerId::new(id)).await?;
            output.result(&ip, || ip.clone());
        }
        ContainerCommand::Exec { id, command } => {
            let result = node.exec(&ContainerId::new(id), &command).await?;
            output.result(&result.stdout, || result.stdout.clone());
        }
    }
    Ok(())
}

fn create_options(args: &CreateArgs) -> CreateOptions {
    CreateOptions {
        static_ip: args.ip,
        cpus: args.cpus,
        memory: args.memory,
    }
}

fn render_records(records: &[ContainerRecord]) -> String {
    let mut lines = vec![format!(
        "{:<12}  {:<24}  {:<10}  {:<15}  {:>6}  {:>6}  {}",
        "ID", "NAME", "STATE", "IP", "CPU%", "MEM%", "IMAGE"
    )];
    for record in records {
        let names: Vec<&str> = record
            .names
            .iter()
            .map(|n| n.trim_start_matches('/'))
            .collect();
        lines.push(format!(
            "{:<12}  {:<24}  {:<10}  {:<15}  {:>6.1}  {:>6.1}  {}",
            record.id.short(),
            names.join(","),
            record.state,
            record.ip,
            record.cpu_percent,
            record.memory_percent,
            record.image
        ));
    }
    lines.join("\n")
}
