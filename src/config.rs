use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fact::TotalsPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MartConfig {
    pub database: Option<String>,
    pub totals_policy: Option<TotalsPolicy>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("starmart.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MartConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MartConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MartConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starmart.toml");

        let config = MartConfig {
            database: Some("mart.db".to_string()),
            totals_policy: Some(TotalsPolicy::Trust),
        };
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("mart.db"));
        assert_eq!(loaded.totals_policy, Some(TotalsPolicy::Trust));
    }

    #[test]
    fn test_write_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("starmart.toml");

        write_config(&path, &MartConfig::default(), false).unwrap();
        assert!(write_config(&path, &MartConfig::default(), false).is_err());
        write_config(&path, &MartConfig::default(), true).unwrap();
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config(Some(&path)).unwrap().is_none());
    }
}
