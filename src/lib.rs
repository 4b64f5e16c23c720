// ABOUTME: Library root for nodeapi - node-local container management.
// ABOUTME: The operator CLI binary is in main.rs.

pub mod config;
pub mod error;
pub mod guest;
pub mod lifecycle;
pub mod node;
pub mod output;
pub mod provision;
pub mod runtime;
pub mod status;
pub mod types;
