use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{CredentialCheck, DenyAll, Sha256Credential};
use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use crate::repository::{DEFAULT_RECENT_QUESTIONS, DEFAULT_RECENT_SECTIONS, Repository};
use crate::storage::{DEFAULT_BUSY_TIMEOUT, SqliteStore};

pub const DEFAULT_DATABASE: &str = "knowledge.db";
pub const DEFAULT_PORT: u16 = 8080;
/// Display offset applied to stored UTC timestamps (Moscow time)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KbConfig {
    pub database: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub cache_max_entries: Option<u64>,
    pub busy_timeout_ms: Option<u64>,
    pub recent_sections: Option<usize>,
    pub recent_questions: Option<usize>,
    pub utc_offset_hours: Option<i32>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub salt: String,
    /// Hex SHA-256 of `salt || secret`
    pub hash: String,
}

impl KbConfig {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(self.database.as_deref().unwrap_or(DEFAULT_DATABASE))
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl_secs.map(Duration::from_secs).unwrap_or(DEFAULT_TTL)
    }

    pub fn cache_max_entries(&self) -> u64 {
        self.cache_max_entries.unwrap_or(DEFAULT_MAX_ENTRIES)
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BUSY_TIMEOUT)
    }

    pub fn recent_sections(&self) -> usize {
        self.recent_sections.unwrap_or(DEFAULT_RECENT_SECTIONS)
    }

    pub fn recent_questions(&self) -> usize {
        self.recent_questions.unwrap_or(DEFAULT_RECENT_QUESTIONS)
    }

    pub fn utc_offset_hours(&self) -> i32 {
        self.utc_offset_hours.unwrap_or(DEFAULT_UTC_OFFSET_HOURS)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Open the configured store and wrap it in a repository
    pub fn open_repository(&self) -> anyhow::Result<Repository> {
        let store = SqliteStore::open_with_timeout(self.database_path(), self.busy_timeout())?;
        Ok(Repository::with_cache(
            store,
            self.cache_ttl(),
            self.cache_max_entries(),
        ))
    }

    /// Build the admin gate; without an `[admin]` table every secret is refused
    pub fn credential_check(&self) -> anyhow::Result<Arc<dyn CredentialCheck>> {
        match &self.admin {
            Some(admin) => {
                let check = Sha256Credential::new(admin.salt.clone(), &admin.hash)
                    .map_err(|e| anyhow::anyhow!("invalid admin hash in config: {e}"))?;
                Ok(Arc::new(check))
            }
            None => {
                tracing::debug!("No admin credential configured; admin actions disabled");
                Ok(Arc::new(DenyAll))
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("knowbase.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<KbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: KbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &KbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_secret;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = KbConfig::default();
        assert_eq!(config.database_path(), PathBuf::from("knowledge.db"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache_max_entries(), 1_000);
        assert_eq!(config.recent_sections(), 3);
        assert_eq!(config.recent_questions(), 5);
        assert_eq!(config.utc_offset_hours(), 3);
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_round_trip_and_admin_gate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowbase.toml");
        let config = KbConfig {
            database: Some("data/kb.db".into()),
            cache_ttl_secs: Some(0),
            admin: Some(AdminConfig {
                salt: "s".into(),
                hash: hash_secret("s", "letmein"),
            }),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database_path(), PathBuf::from("data/kb.db"));
        assert_eq!(loaded.cache_ttl(), Duration::ZERO);

        let gate = loaded.credential_check().unwrap();
        assert!(gate.verify("letmein"));
        assert!(!gate.verify("guess"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: KbConfig = toml::from_str(
            r#"
            port = 9000

            [admin]
            hash = "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
            "#,
        )
        .unwrap();

        assert_eq!(config.port(), 9000);
        assert!(config.credential_check().unwrap().verify("admin123"));
    }

    #[test]
    fn test_no_admin_denies() {
        assert!(!KbConfig::default().credential_check().unwrap().verify("admin123"));
    }

    #[test]
    fn test_open_repository_creates_store() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("sub").join("kb.db");
        let config = KbConfig {
            database: Some(db.to_string_lossy().into_owned()),
            ..Default::default()
        };

        let repo = config.open_repository().unwrap();
        assert_eq!(repo.count_sections().unwrap(), 0);
        assert!(db.exists());
    }
}
