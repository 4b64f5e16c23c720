// ABOUTME: Managed service subcommand handlers.
// ABOUTME: Lists, starts and stops prefixed systemd units inside a container.

use super::LocalNode;
use crate::cli::ServiceCommand;
use nodeapi::error::Result;
use nodeapi::output::Output;
use nodeapi::types::ContainerId;

pub async fn services(node: &LocalNode, command: ServiceCommand, output: &Output) -> Result<()> {
    let service = match command {
        ServiceCommand::List { container } => {
            let services = node.list_services(&ContainerId::new(container)).await?;
            output.result(&services, || {
                services
                    .iter()
                    .map(|s| format!("{:<40}  {}", s.name, if s.active { "active" } else { "inactive" }))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            return Ok(());
        }
        ServiceCommand::Start { container, unit } => {
            node.start_service(&ContainerId::new(container), &unit).await?
        }
        ServiceCommand::Stop { container, unit } => {
            node.stop_service(&ContainerId::new(container), &unit).await?
        }
    };
    output.result(&service, || {
        format!(
            "{} {}",
            service.name,
            if service.active { "active" } else { "inactive" }
        )
    });
    Ok(())
}
