//! Remote key tables
//!
//! Maps a remote control name and a key label to the NEC code the module
//! should transmit. Each remote is one YAML document:
//!
//! ```yaml
//! name: Living room TV
//! user_code: "00FF"
//! keys:
//!   power: "45"
//!   vol+: "46"
//! ```
//!
//! Codes must be quoted so YAML keeps them as hex strings.
//!
//! Tables written for the vendor's tooling also load: they are named
//! `<remote>_码值表.yaml` and use `用户码` and `键值/命令码` as field names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::IrCode;

/// File name suffix used by the vendor's key tables
pub const VENDOR_TABLE_SUFFIX: &str = "_码值表";

/// Errors raised while resolving a key
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The table has no such key
    #[error("Key '{key}' not found on remote '{remote}'")]
    NotFound {
        /// Remote name
        remote: String,
        /// Key label
        key: String,
    },

    /// No table file for the remote
    #[error("Remote '{remote}' not found (looked for {})", .path.display())]
    RemoteMissing {
        /// Remote name
        remote: String,
        /// First path tried
        path: PathBuf,
    },

    /// The table file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The table file is not valid YAML for a key table
    #[error("Failed to parse {}: {reason}", .path.display())]
    Parse {
        /// Table file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A code in the table is not valid hex of the right width
    #[error("Invalid code for '{key}' on remote '{remote}': {reason}")]
    InvalidCode {
        /// Remote name
        remote: String,
        /// Key label
        key: String,
        /// What was wrong with the code
        reason: String,
    },
}

/// Source of key codes
pub trait KeyLookup {
    /// Code for `key` on `remote`
    fn lookup(&self, remote: &str, key: &str) -> Result<IrCode, RemoteError>;
}

/// One remote control's key table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTable {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// 16-bit NEC user code as 4 hex digits
    #[serde(alias = "用户码")]
    pub user_code: String,
    /// Key label -> command code as 2 hex digits
    #[serde(default, alias = "键值/命令码")]
    pub keys: BTreeMap<String, String>,
}

impl RemoteTable {
    /// Load a table from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RemoteError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RemoteError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_yaml::from_str(&content).map_err(|e| RemoteError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Resolve `key`, using `remote` only for error messages
    pub fn code(&self, remote: &str, key: &str) -> Result<IrCode, RemoteError> {
        let command = self.keys.get(key).ok_or_else(|| RemoteError::NotFound {
            remote: remote.to_string(),
            key: key.to_string(),
        })?;
        IrCode::from_hex(&self.user_code, command).map_err(|e| RemoteError::InvalidCode {
            remote: remote.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Key labels in sorted order
    pub fn key_labels(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// Directory of `<remote>.yaml` tables
///
/// Tables are read on every lookup so edits apply without restarting.
#[derive(Debug, Clone)]
pub struct RemoteDirectory {
    root: PathBuf,
}

impl RemoteDirectory {
    /// Directory rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the table for `remote`
    ///
    /// A remote name that is itself an existing file is used as is, otherwise
    /// `<root>/<remote>.yaml`, `<root>/<remote>.yml` and then the vendor name
    /// `<root>/<remote>_码值表.yaml` are tried.
    pub fn resolve(&self, remote: &str) -> Result<PathBuf, RemoteError> {
        let direct = PathBuf::from(remote);
        if direct.is_file() {
            return Ok(direct);
        }

        let yaml = self.root.join(format!("{}.yaml", remote));
        if yaml.is_file() {
            return Ok(yaml);
        }
        let yml = self.root.join(format!("{}.yml", remote));
        if yml.is_file() {
            return Ok(yml);
        }
        let vendor = self.root.join(format!("{}{}.yaml", remote, VENDOR_TABLE_SUFFIX));
        if vendor.is_file() {
            return Ok(vendor);
        }

        Err(RemoteError::RemoteMissing {
            remote: remote.to_string(),
            path: yaml,
        })
    }

    /// Load the table for `remote`
    pub fn table(&self, remote: &str) -> Result<RemoteTable, RemoteError> {
        RemoteTable::from_file(self.resolve(remote)?)
    }

    /// Names of the remotes found in the directory, sorted
    pub fn remotes(&self) -> Result<Vec<String>, RemoteError> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| RemoteError::Io {
            path: self.root.clone(),
            source: e,
        })?;

        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                Some(stem.trim_end_matches(VENDOR_TABLE_SUFFIX).to_string())
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl KeyLookup for RemoteDirectory {
    fn lookup(&self, remote: &str, key: &str) -> Result<IrCode, RemoteError> {
        self.table(remote)?.code(remote, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const TV: &str = r#"
name: Living room TV
user_code: "00FF"
keys:
  power: "45"
  vol+: "46"
"#;

    fn directory_with_tv() -> (tempfile::TempDir, RemoteDirectory) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tv.yaml"), TV).unwrap();
        let remotes = RemoteDirectory::new(dir.path());
        (dir, remotes)
    }

    #[test]
    fn test_lookup_key() {
        let (_dir, remotes) = directory_with_tv();
        let code = remotes.lookup("tv", "vol+").unwrap();
        assert_eq!(code, IrCode::new(0x00FF, 0x46));
    }

    #[test]
    fn test_lookup_missing_key() {
        let (_dir, remotes) = directory_with_tv();
        let err = remotes.lookup("tv", "mute").unwrap_err();
        assert!(matches!(err, RemoteError::NotFound { ref key, .. } if key == "mute"));
    }

    #[test]
    fn test_lookup_missing_remote() {
        let (_dir, remotes) = directory_with_tv();
        let err = remotes.lookup("radio", "power").unwrap_err();
        assert!(matches!(err, RemoteError::RemoteMissing { .. }));
    }

    #[test]
    fn test_resolve_accepts_direct_path_and_yml() {
        let (dir, remotes) = directory_with_tv();
        fs::write(dir.path().join("fan.yml"), "user_code: \"01FE\"\n").unwrap();

        let direct = dir.path().join("tv.yaml");
        assert_eq!(remotes.resolve(direct.to_str().unwrap()).unwrap(), direct);
        assert_eq!(remotes.resolve("fan").unwrap(), dir.path().join("fan.yml"));
        assert_eq!(remotes.remotes().unwrap(), vec!["fan", "tv"]);
    }

    #[test]
    fn test_invalid_code_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.yaml"),
            "user_code: \"0F\"\nkeys:\n  power: \"45\"\n",
        )
        .unwrap();
        let remotes = RemoteDirectory::new(dir.path());
        let err = remotes.lookup("bad", "power").unwrap_err();
        assert!(matches!(err, RemoteError::InvalidCode { .. }));
    }

    #[test]
    fn test_parse_error_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.yaml"), "keys: [unterminated").unwrap();
        let remotes = RemoteDirectory::new(dir.path());
        let err = remotes.lookup("broken", "power").unwrap_err();
        assert!(matches!(err, RemoteError::Parse { .. }));
    }

    #[test]
    fn test_vendor_table_loads() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("aircon_码值表.yaml"),
            "用户码: \"10EF\"\n键值/命令码:\n  开关: \"1C\"\n",
        )
        .unwrap();
        let remotes = RemoteDirectory::new(dir.path());

        assert_eq!(
            remotes.resolve("aircon").unwrap(),
            dir.path().join("aircon_码值表.yaml")
        );
        assert_eq!(
            remotes.resolve("aircon_码值表").unwrap(),
            dir.path().join("aircon_码值表.yaml")
        );
        assert_eq!(remotes.lookup("aircon", "开关").unwrap(), IrCode::new(0x10EF, 0x1C));
        assert_eq!(remotes.remotes().unwrap(), vec!["aircon"]);
    }

    #[test]
    fn test_key_labels_sorted() {
        let table: RemoteTable = serde_yaml::from_str(TV).unwrap();
        let labels: Vec<&str> = table.key_labels().collect();
        assert_eq!(labels, vec!["power", "vol+"]);
        assert_eq!(table.name.as_deref(), Some("Living room TV"));
    }
}
