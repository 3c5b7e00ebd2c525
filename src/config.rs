//! User configuration settings
//!
//! Layered configuration: environment variables → config file → defaults

use std::collections::BTreeMap;
use std::path::PathBuf;

use directories::{BaseDirs, ProjectDirs};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Override for the registry file location
    pub registry_file: Option<PathBuf>,

    /// Directory session key files are resolved against (default: ~/.ssh)
    pub key_dir: Option<PathBuf>,

    /// SSH client program
    pub ssh_program: String,

    /// Helper that pipes a password to the SSH client
    pub password_helper: String,

    /// `-o` options passed to every connection
    pub ssh_options: BTreeMap<String, String>,

    /// When set, reuse connections through a ControlMaster socket in this
    /// directory (`~` is expanded)
    pub control_dir: Option<PathBuf>,

    /// Idle linger of the master connection, in seconds
    pub control_persist_secs: u64,

    /// Enable debug logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut ssh_options = BTreeMap::new();
        ssh_options.insert("StrictHostKeyChecking".to_string(), "no".to_string());
        ssh_options.insert("UserKnownHostsFile".to_string(), "/dev/null".to_string());

        Self {
            registry_file: None,
            key_dir: None,
            ssh_program: "ssh".to_string(),
            password_helper: "sshpass".to_string(),
            ssh_options,
            control_dir: None,
            control_persist_secs: 60,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        let config: Config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Layer config file if it exists
            .merge(Toml::file(&config_path))
            // Layer environment variables (MXSTACK_SSH_PROGRAM, etc.)
            .merge(Env::prefixed("MXSTACK_"))
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Effective registry file location
    pub fn registry_path(&self) -> Result<PathBuf> {
        if let Some(ref file) = self.registry_file {
            Ok(file.clone())
        } else {
            Ok(Self::data_dir()?.join("registry"))
        }
    }

    /// Directory key files named by session records are looked up in
    pub fn key_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.key_dir {
            return Ok(expand_home(dir.clone())?);
        }
        Ok(home_dir()?.join(".ssh"))
    }

    /// ControlMaster socket directory, with `~` expanded
    pub fn control_dir(&self) -> Result<Option<PathBuf>> {
        match self.control_dir {
            Some(ref dir) => Ok(Some(expand_home(dir.clone())?)),
            None => Ok(None),
        }
    }

    /// Ensure config and data directories exist, seeding a default config
    /// file on first run so users can discover it
    pub fn ensure_directories(&self) -> Result<()> {
        let dirs = Self::project_dirs()?;

        std::fs::create_dir_all(dirs.config_dir()).map_err(|_e| {
            Error::Config(ConfigError::DirectoryCreationFailed(
                dirs.config_dir().to_path_buf(),
            ))
        })?;

        std::fs::create_dir_all(dirs.data_dir()).map_err(|_e| {
            Error::Config(ConfigError::DirectoryCreationFailed(
                dirs.data_dir().to_path_buf(),
            ))
        })?;

        let config_path = Self::config_file_path()?;
        if !config_path.exists() {
            let _ = Config::default().save();
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_file_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|_e| {
                Error::Config(ConfigError::DirectoryCreationFailed(parent.to_path_buf()))
            })?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        std::fs::write(&config_path, toml)
            .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        Ok(())
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "mxstack", "mxstack").ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
    }
}

fn home_dir() -> Result<PathBuf> {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| {
            Error::Config(ConfigError::LoadFailed(
                "Could not determine home directory".to_string(),
            ))
        })
}

/// Expand a leading `~` or `~/` to the user's home directory
fn expand_home(path: PathBuf) -> Result<PathBuf> {
    if path == PathBuf::from("~") {
        return home_dir();
    }
    if let Ok(rest) = path.strip_prefix("~") {
        return Ok(home_dir()?.join(rest));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ssh_program, "ssh");
        assert_eq!(config.password_helper, "sshpass");
        assert_eq!(config.control_persist_secs, 60);
        assert_eq!(
            config.ssh_options.get("StrictHostKeyChecking").map(String::as_str),
            Some("no")
        );
        assert!(config.control_dir.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("ssh_program"));
        assert!(toml.contains("sshpass"));
    }

    #[test]
    fn test_registry_path_override() {
        let mut config = Config::default();
        config.registry_file = Some(PathBuf::from("/tmp/custom-registry"));
        assert_eq!(
            config.registry_path().unwrap(),
            PathBuf::from("/tmp/custom-registry")
        );
    }

    #[test]
    fn test_expand_home_passthrough() {
        assert_eq!(
            expand_home(PathBuf::from("/var/run/ssh")).unwrap(),
            PathBuf::from("/var/run/ssh")
        );
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home(PathBuf::from("~/.ssh/control")).unwrap();
        assert!(expanded.ends_with(".ssh/control"));
        assert!(!expanded.starts_with("~"));
    }
}
