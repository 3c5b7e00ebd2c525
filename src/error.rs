//! Error types for mxstack
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `Display` and `Error` impls.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for mxstack
#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Session stack error: {0}")]
    Stack(#[from] StackError),

    #[error("SSH error: {0}")]
    Ssh(#[from] SshError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("A session stack named '{0}' is already imported")]
    DuplicateName(String),

    #[error("A session stack already points at {0}")]
    DuplicatePath(PathBuf),

    #[error("Invalid stack name '{0}': names may not contain '\\' or '/'")]
    InvalidName(String),

    #[error("No session stack is imported yet; import one before retrying this action")]
    Empty,

    #[error("No session stack named '{0}' is imported")]
    NotFound(String),

    #[error("Corrupt registry line: {0}")]
    Corrupt(String),
}

/// Session-stack parsing and address-resolution errors
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Unknown session stack '{0}' in address")]
    StackNotFound(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Malformed address '{0}': expected /stack/dir/.../name")]
    MalformedAddress(String),

    #[error("Malformed session record: {0}")]
    MalformedRecord(String),

    #[error("Session '{0}' is not compatible with remote control [SSH | RDP]")]
    UnsupportedProtocol(String),
}

/// SSH invocation errors
#[derive(Error, Debug)]
pub enum SshError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Password helper '{0}' is not installed or not in PATH")]
    HelperMissing(String),

    #[error("SSH client exited with status {0}")]
    ClientFailed(i32),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Failed to create directory: {0}")]
    DirectoryCreationFailed(PathBuf),
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::DuplicateName("prod".to_string());
        assert!(err.to_string().contains("prod"));

        let err = StackError::SessionNotFound("/prod/web/db01".to_string());
        assert!(err.to_string().contains("/prod/web/db01"));

        let err = SshError::HelperMissing("sshpass".to_string());
        assert!(err.to_string().contains("sshpass"));

        let err = RegistryError::Empty;
        assert!(err.to_string().contains("import one"));
    }

    #[test]
    fn test_error_conversion() {
        let registry_err = RegistryError::Empty;
        let _top_err: Error = registry_err.into();

        let stack_err = StackError::MalformedAddress("foo".to_string());
        let _top_err: Error = stack_err.into();

        let ssh_err = SshError::ClientFailed(255);
        let _top_err: Error = ssh_err.into();
    }
}
