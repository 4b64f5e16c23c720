// ABOUTME: Runtime connection error types with SNAFU pattern.
// ABOUTME: Distinguishes client setup failures from an unreachable socket.

use snafu::Snafu;

use super::traits::RuntimeInfoError;

/// Failure to establish a runtime connection.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("cannot open runtime socket {socket}: {source}"))]
    Client {
        socket: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("runtime at {socket} is unreachable: {source}"))]
    Unreachable {
        socket: String,
        source: RuntimeInfoError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// The client could not be configured for the socket.
    ClientSetup,
    /// The socket could not be dialed or did not answer a ping.
    ConnectionFailed,
    /// The runtime answered with an error.
    RuntimeOperation,
}

impl RuntimeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Client { .. } => RuntimeErrorKind::ClientSetup,
            RuntimeError::Unreachable { source, .. } => match source {
                RuntimeInfoError::ConnectionFailed(_) => RuntimeErrorKind::ConnectionFailed,
                RuntimeInfoError::Runtime(_) => RuntimeErrorKind::RuntimeOperation,
            },
        }
    }

    /// The socket the failed attempt targeted.
    pub fn socket(&self) -> &str {
        match self {
            RuntimeError::Client { socket, .. } | RuntimeError::Unreachable { socket, .. } => {
                socket
            }
        }
    }
}
