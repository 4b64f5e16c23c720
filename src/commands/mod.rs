// ABOUTME: Command module aggregator for the nodeapi CLI.
// ABOUTME: One handler per top-level subcommand, all driving a connected Node.

mod containers;
mod images;
mod networks;
mod services;

pub use containers::containers;
pub use images::images;
pub use networks::networks;
pub use services::services;

use nodeapi::node::Node;
use nodeapi::runtime::BollardRuntime;

pub type LocalNode = Node<BollardRuntime>;
