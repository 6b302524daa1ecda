use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure classes a command invocation can end in.
///
/// The kind travels next to the reply body inside [`crate::CommandResult`];
/// it is not part of the wire shape, which stays `{"success": false, "error": ...}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Command name is not one of the five known commands.
    UnknownCommand,
    /// Missing, extra, duplicated or ill-typed parameters.
    InvalidArguments,
    /// The resolved script does not exist.
    ExecutableNotFound,
    /// The child process could not be started or waited on.
    SpawnError,
    /// Standard output was not a single JSON document.
    OutputParseError,
    /// The child exceeded the configured execution bound and was killed.
    Timeout,
    /// A fault escaped dispatch and was caught by the inbound handler.
    UnexpectedHandlerError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownCommand => "UnknownCommand",
            ErrorKind::InvalidArguments => "InvalidArguments",
            ErrorKind::ExecutableNotFound => "ExecutableNotFound",
            ErrorKind::SpawnError => "SpawnError",
            ErrorKind::OutputParseError => "OutputParseError",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::UnexpectedHandlerError => "UnexpectedHandlerError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by liquidity agent operations.
#[derive(Debug)]
pub enum BridgeError {
    /// Unknown command name.
    UnknownCommand(String),
    /// Invalid or incomplete command arguments.
    InvalidArguments(String),
    /// Script missing under the scripts root.
    ExecutableNotFound(String),
    /// Child process could not be spawned or awaited.
    Spawn(String),
    /// Child exceeded its execution bound.
    Timeout(String),
    /// Invalid startup configuration.
    Config(String),
}

impl BridgeError {
    /// Failure class reported in a [`crate::CommandResult`].
    ///
    /// Configuration errors never reach a command result; they abort startup.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            BridgeError::InvalidArguments(_) | BridgeError::Config(_) => {
                ErrorKind::InvalidArguments
            }
            BridgeError::ExecutableNotFound(_) => ErrorKind::ExecutableNotFound,
            BridgeError::Spawn(_) => ErrorKind::SpawnError,
            BridgeError::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Message placed in the `error` field of the reply body.
    pub fn message(&self) -> String {
        match self {
            BridgeError::UnknownCommand(name) => format!("Unknown command: {name}"),
            BridgeError::InvalidArguments(msg)
            | BridgeError::ExecutableNotFound(msg)
            | BridgeError::Spawn(msg)
            | BridgeError::Timeout(msg)
            | BridgeError::Config(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::UnknownCommand(name) => write!(f, "Unknown command: {name}"),
            BridgeError::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            BridgeError::ExecutableNotFound(msg) => write!(f, "executable not found: {msg}"),
            BridgeError::Spawn(msg) => write!(f, "spawn error: {msg}"),
            BridgeError::Timeout(msg) => write!(f, "timeout: {msg}"),
            BridgeError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Convert BridgeError to String for blueprint job return types.
impl From<BridgeError> for String {
    fn from(err: BridgeError) -> Self {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
