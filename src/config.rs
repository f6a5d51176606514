use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::TenantId;
use crate::storage::StoreOptions;

pub const CONFIG_FILE_NAME: &str = "claimstore.toml";

/// Database location used when neither a flag nor the config names one,
/// relative to the directory holding the config file
const DEFAULT_DATABASE: &str = ".claimstore/claims.db";

/// Contents of `claimstore.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClaimstoreConfig {
    /// Database file; relative paths resolve against the config directory
    pub database: Option<String>,
    pub busy_timeout_ms: Option<u64>,
    /// Tenant used when `--tenant` is not given
    pub tenant: Option<TenantId>,
}

impl ClaimstoreConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.busy_timeout_ms == Some(0) {
            anyhow::bail!("busy_timeout_ms must be greater than zero");
        }
        if self.database.as_deref().is_some_and(|db| db.trim().is_empty()) {
            anyhow::bail!("database must not be empty");
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        let mut options = StoreOptions::default();
        if let Some(ms) = self.busy_timeout_ms {
            options.busy_timeout = Duration::from_millis(ms);
        }
        options
    }

    /// Database file this config points at, resolved against `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        base.join(self.database.as_deref().unwrap_or(DEFAULT_DATABASE))
    }
}

/// Directory relative config entries resolve against
pub fn config_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Read and validate a config file. A missing file is not an error.
pub fn load_config(path: &Path) -> anyhow::Result<Option<ClaimstoreConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: ClaimstoreConfig =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ClaimstoreConfig, force: bool) -> anyhow::Result<()> {
    config.validate()?;
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory {}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip_and_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ClaimstoreConfig {
            database: Some("claims.db".into()),
            busy_timeout_ms: Some(250),
            tenant: Some(-1234),
        };

        assert!(load_config(&path).unwrap().is_none());
        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(&path).unwrap(), Some(config.clone()));
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &ClaimstoreConfig::default(), true).unwrap();
        assert_eq!(load_config(&path).unwrap(), Some(ClaimstoreConfig::default()));
    }

    #[test]
    fn test_validate() {
        let zero_timeout = ClaimstoreConfig {
            busy_timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(
            zero_timeout.validate().unwrap_err().to_string(),
            "busy_timeout_ms must be greater than zero"
        );

        let blank_database = ClaimstoreConfig {
            database: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank_database.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(write_config(&path, &zero_timeout, false).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, "busy_timeout_ms = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
        assert_eq!(err.root_cause().to_string(), "busy_timeout_ms must be greater than zero");

        std::fs::write(&path, "tenent = 5\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse"));
    }

    #[test]
    fn test_store_options() {
        let config = ClaimstoreConfig {
            busy_timeout_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(config.store_options().busy_timeout, Duration::from_millis(250));
        assert_eq!(
            ClaimstoreConfig::default().store_options().busy_timeout,
            crate::storage::connection::DEFAULT_BUSY_TIMEOUT
        );
    }

    #[test]
    fn test_database_path_resolution() {
        let base = Path::new("/srv/identity");
        assert_eq!(
            ClaimstoreConfig::default().database_path(base),
            PathBuf::from("/srv/identity/.claimstore/claims.db")
        );

        let relative = ClaimstoreConfig {
            database: Some("data/claims.db".into()),
            ..Default::default()
        };
        assert_eq!(relative.database_path(base), PathBuf::from("/srv/identity/data/claims.db"));

        let absolute = ClaimstoreConfig {
            database: Some("/var/lib/claims.db".into()),
            ..Default::default()
        };
        assert_eq!(absolute.database_path(base), PathBuf::from("/var/lib/claims.db"));

        assert_eq!(config_dir(Path::new(CONFIG_FILE_NAME)), Path::new("."));
        assert_eq!(config_dir(Path::new("/etc/claimstore.toml")), Path::new("/etc"));
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = ClaimstoreConfig::default().database_path(dir.path());
        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }
}
