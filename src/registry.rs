//! Imported session-stack registry
//!
//! A small persisted list mapping a short stack name to the path of an
//! externally-authored session-stack file. On disk it is plain UTF-8 text,
//! one entry per line, `<path>\<name>` with the name last: names may not
//! contain backslashes, so the last backslash always splits the line, and
//! Windows-style source paths stay representable.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RegistryError, Result};

/// One imported session stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Short name the stack is addressed by
    pub name: String,
    /// Path of the external session-stack file
    pub path: PathBuf,
}

/// The registry, loaded in full and written through on every mutation
#[derive(Debug)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
    file: PathBuf,
}

impl Registry {
    /// Load the registry from its file. A missing file is an empty registry.
    pub fn load(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let mut entries = Vec::new();

        if file.exists() {
            let content = fs::read_to_string(&file)?;
            for line in content.lines() {
                let line = line.trim_end();
                if line.is_empty() {
                    continue;
                }
                let (path, name) = line
                    .rsplit_once('\\')
                    .ok_or_else(|| RegistryError::Corrupt(line.to_string()))?;
                entries.push(RegistryEntry {
                    name: name.to_string(),
                    path: PathBuf::from(path),
                });
            }
        }

        debug!("loaded {} registry entries from {}", entries.len(), file.display());
        Ok(Self { entries, file })
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Entries, failing when none exist.
    ///
    /// Search, list, and connect treat an empty registry as a precondition
    /// failure rather than a silent empty result.
    pub fn require_entries(&self) -> Result<&[RegistryEntry]> {
        if self.entries.is_empty() {
            return Err(RegistryError::Empty.into());
        }
        Ok(&self.entries)
    }

    /// Register a stack file under a new name and persist immediately.
    ///
    /// Both the name and the path must be unique; on any failure the
    /// registry is left unchanged, in memory and on disk.
    pub fn import(&mut self, name: &str, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();

        if name.trim().is_empty() || name.contains('\\') || name.contains('/') {
            return Err(RegistryError::InvalidName(name.to_string()).into());
        }
        if self.entries.iter().any(|e| e.name == name) {
            return Err(RegistryError::DuplicateName(name.to_string()).into());
        }
        if self.entries.iter().any(|e| e.path == path) {
            return Err(RegistryError::DuplicatePath(path).into());
        }

        self.entries.push(RegistryEntry {
            name: name.to_string(),
            path,
        });
        if let Err(e) = self.save() {
            self.entries.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Remove the named entry and persist immediately
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let removed = self.entries.remove(idx);
        if let Err(e) = self.save() {
            self.entries.insert(idx, removed);
            return Err(e);
        }
        Ok(())
    }

    /// Rewrite the whole file from the in-memory entries
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(&format!("{}\\{}\n", entry.path.display(), entry.name));
        }
        fs::write(&self.file, content)?;
        Ok(())
    }

    /// Location of the registry file
    pub fn file(&self) -> &Path {
        &self.file
    }
}
