//! mxstack - import, search, and connect to MobaXterm session stacks
//!
//! A session stack is a `.mxtsessions` export from the MobaXterm session
//! manager: a line-oriented, ISO-8859-1, percent/backslash-delimited record
//! format. mxstack keeps a small registry of imported stack files, parses
//! each one into a directory/session tree on demand, and resolves
//! `/stack/dir/.../session` addresses for search, list, and connect.
//!
//! # Modules
//!
//! - [`registry`] - persisted name → file-path registry of imported stacks
//! - [`stack`] - the export-format parser, tree, addressing, and resolver
//! - [`ssh`] - interactive SSH launch (keys, sshpass, connection reuse)
//! - [`config`] - layered user configuration
//! - [`error`] - error types

pub mod config;
pub mod error;
pub mod registry;
pub mod ssh;
pub mod stack;

pub use config::Config;
pub use error::{Error, Result};
pub use registry::{Registry, RegistryEntry};
pub use stack::{Address, Protocol, ResolvedSession, Resolver, SearchHit, SearchKind, SessionStack};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
