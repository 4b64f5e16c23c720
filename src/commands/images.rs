// ABOUTME: Image subcommand handlers.
// ABOUTME: Lists and force-removes images.

use super::LocalNode;
use crate::cli::ImageCommand;
use nodeapi::error::Result;
use nodeapi::output::Output;

pub async fn images(node: &LocalNode, command: ImageCommand, output: &Output) -> Result<()> {
    match command {
        ImageCommand::List => {
            let images = node.list_images().await?;
            output.result(&images, || {
                images
                    .iter()
                    .map(|i| {
                        let tags = if i.tags.is_empty() {
                            "<none>".to_string()
                        } else {
                            i.tags.join(",")
                        };
                        format!("{:<12}  {:>10}  {}", i.id.short(), i.size, tags)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
        }
        ImageCommand::Remove { reference } => {
            node.remove_image(&reference).await?;
            output.success(&format!("removed {}", reference));
        }
    }
    Ok(())
}
