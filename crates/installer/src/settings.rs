//! Settings file emitted after a successful install.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{DatabaseType, InstallConfig};
use crate::site::{SiteContext, SECRET_KEY_FILE};

/// File name of the generated settings.
pub const SETTINGS_FILE: &str = "LocalSettings.toml";

/// Site-level settings consumed by the wiki at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSettings {
    pub generated_at: String,
    pub site: SiteSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub name: String,
    pub script_path: String,
    pub language: String,
    pub interwiki_seeded: bool,
    /// Where the `keys` step left the secret key.
    pub secret_key_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(rename = "type")]
    pub db_type: DatabaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LocalSettings {
    /// Runtime settings for `config`. Installer-only credentials are left out.
    #[must_use]
    pub fn from_config(config: &InstallConfig) -> Self {
        let db = &config.database;
        let is_sqlite = db.db_type == DatabaseType::Sqlite;

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            site: SiteSettings {
                name: config.site_name.clone(),
                script_path: config.script_path.clone(),
                language: config.language.clone(),
                interwiki_seeded: !config.skip_interwiki,
                secret_key_file: SiteContext::from_config(config)
                    .data_dir
                    .join(SECRET_KEY_FILE),
            },
            database: DatabaseSettings {
                db_type: db.db_type,
                server: (!is_sqlite).then(|| db.server.clone()),
                port: db.port,
                name: db.name.clone(),
                path: is_sqlite.then(|| db.path.clone()),
                prefix: db.prefix.clone(),
                schema: (db.db_type == DatabaseType::Postgres).then(|| db.schema.clone()),
                user: db.user.clone(),
                password: db.password.clone(),
            },
        }
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    /// Write [`SETTINGS_FILE`] into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(SETTINGS_FILE);
        std::fs::write(&path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Settings written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::InstallOptions;
    use crate::resolve::FsReader;

    fn config(options: InstallOptions) -> InstallConfig {
        InstallConfig::from_options(options, &FsReader).unwrap()
    }

    #[test]
    fn test_mysql_settings() {
        let settings = LocalSettings::from_config(&config(InstallOptions {
            site_name: Some("Family Wiki".into()),
            db_pass: Some("secret".into()),
            install_db_pass: Some("root-secret".into()),
            ..InstallOptions::default()
        }));

        assert_eq!(settings.site.name, "Family Wiki");
        assert!(settings.site.interwiki_seeded);
        assert_eq!(settings.database.server.as_deref(), Some("localhost"));
        assert_eq!(settings.database.port, None);
        assert_eq!(settings.database.path, None);
        assert_eq!(settings.database.schema, None);

        let rendered = settings.to_toml().unwrap();
        assert!(rendered.contains("type = \"mysql\""));
        assert!(rendered.contains("password = \"secret\""));
        assert!(!rendered.contains("root-secret"));
    }

    #[test]
    fn test_sqlite_settings_have_path_and_no_server() {
        let settings = LocalSettings::from_config(&config(InstallOptions {
            db_type: Some("sqlite".into()),
            db_path: Some(PathBuf::from("/var/lib/wiki")),
            skip_interwiki: true,
            ..InstallOptions::default()
        }));

        assert_eq!(settings.database.server, None);
        assert_eq!(settings.database.port, None);
        assert_eq!(settings.database.path, Some(PathBuf::from("/var/lib/wiki")));
        assert!(!settings.site.interwiki_seeded);
        assert_eq!(
            settings.site.secret_key_file,
            PathBuf::from("/var/lib/wiki/secret.key")
        );
    }

    #[test]
    fn test_write_to_round_trips() {
        let dir = TempDir::new().unwrap();
        let settings = LocalSettings::from_config(&config(InstallOptions {
            db_type: Some("postgres".into()),
            ..InstallOptions::default()
        }));

        let path = settings.write_to(&dir.path().join("conf")).unwrap();
        assert!(path.ends_with(SETTINGS_FILE));

        let loaded: LocalSettings = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.database.schema.as_deref(), Some("mediawiki"));
    }
}
