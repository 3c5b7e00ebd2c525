//! Interactive SSH invocation
//!
//! Builds and runs the foreground `ssh` command for a resolved session.
//! Key-based sessions authenticate with `-i` and publickey only;
//! password-based sessions are wrapped in the configured helper
//! (`sshpass`) so the client never prompts. When a control directory is
//! configured, connections are multiplexed through a ControlMaster socket
//! named after a short stable hash of the `(host, port, user)` triple.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::config::Config;
use crate::error::{Result, SshError};

/// How many hex digits of the connection hash name the control socket
const CONTROL_ID_LEN: usize = 10;

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client exited normally
    Closed,
    /// The user interrupted the session; a clean close, not an error
    Interrupted,
}

/// Stable short identifier for a `(host, port, user)` triple, used as the
/// ControlPath socket name
pub fn connection_id(host: &str, port: u16, user: &str) -> String {
    let digest = xxh3_64(format!("{host}-{port}-{user}").as_bytes());
    let mut hex = format!("{digest:016x}");
    hex.truncate(CONTROL_ID_LEN);
    hex
}

/// Runs the interactive SSH client for resolved sessions
#[derive(Debug, Clone)]
pub struct SshLauncher {
    program: String,
    password_helper: String,
    options: BTreeMap<String, String>,
    control_dir: Option<PathBuf>,
    control_persist_secs: u64,
}

impl SshLauncher {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            program: config.ssh_program.clone(),
            password_helper: config.password_helper.clone(),
            options: config.ssh_options.clone(),
            control_dir: config.control_dir()?,
            control_persist_secs: config.control_persist_secs,
        })
    }

    /// Open an interactive terminal session to `user@host:port` and block
    /// until the client exits.
    ///
    /// With a key path, other authentication methods are disabled; without
    /// one, the password is piped through the helper. The child inherits
    /// the terminal. Exit-by-interrupt maps to [`SessionEnd::Interrupted`].
    pub async fn open_interactive(
        &self,
        host: &str,
        port: u16,
        user: &str,
        key_path: Option<&Path>,
        password: Option<&str>,
    ) -> Result<SessionEnd> {
        let args = self.build_args(host, port, user, key_path);
        let (program, invocation) = self.build_invocation(args, password);

        info!("Opening interactive session to {user}@{host}:{port}");
        debug!("client: {program}");

        let mut cmd = Command::new(&program);
        cmd.args(&invocation)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = match cmd.status().await {
            Ok(status) => status,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && password.is_some() => {
                return Err(SshError::HelperMissing(self.password_helper.clone()).into());
            }
            Err(e) => {
                return Err(SshError::Spawn {
                    program,
                    source: e,
                }
                .into());
            }
        };

        use std::os::unix::process::ExitStatusExt;
        if status.success() {
            Ok(SessionEnd::Closed)
        } else if status.signal() == Some(nix::libc::SIGINT) || status.code() == Some(130) {
            Ok(SessionEnd::Interrupted)
        } else {
            Err(SshError::ClientFailed(status.code().unwrap_or(-1)).into())
        }
    }

    /// SSH argument list for a target, without the program itself
    fn build_args(&self, host: &str, port: u16, user: &str, key_path: Option<&Path>) -> Vec<String> {
        let mut args = vec![format!("{user}@{host}"), "-p".to_string(), port.to_string()];

        if let Some(key) = key_path {
            args.push("-i".to_string());
            args.push(key.display().to_string());
            args.push("-o".to_string());
            args.push("PreferredAuthentications=publickey".to_string());
        }

        for (key, value) in &self.options {
            args.push("-o".to_string());
            args.push(format!("{key}={value}"));
        }

        if let Some(ref dir) = self.control_dir {
            let socket = dir.join(connection_id(host, port, user));
            args.push("-o".to_string());
            args.push("ControlMaster=auto".to_string());
            args.push("-o".to_string());
            args.push(format!("ControlPath={}", socket.display()));
            args.push("-o".to_string());
            args.push(format!("ControlPersist={}", self.control_persist_secs));
        }

        args
    }

    /// Wrap the argument list in the password helper when needed
    fn build_invocation(&self, args: Vec<String>, password: Option<&str>) -> (String, Vec<String>) {
        match password {
            Some(pass) => {
                let mut invocation = vec!["-p".to_string(), pass.to_string(), self.program.clone()];
                invocation.extend(args);
                (self.password_helper.clone(), invocation)
            }
            None => (self.program.clone(), args),
        }
    }
}
