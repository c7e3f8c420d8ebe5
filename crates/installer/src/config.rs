//! Installation configuration types.
//!
//! Raw command-line options are collected into [`InstallOptions`] and turned
//! into a validated [`InstallConfig`] exactly once, before any step runs. File
//! backed options are resolved here, so an unreadable file stops the install
//! with no side effects.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::filter::SkipPolicy;
use crate::resolve::{resolve_with, FileReader, ResolvedInput};

/// Site name used when none is given.
pub const DEFAULT_SITE_NAME: &str = "MediaWiki";

/// Errors found while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file given on the command line could not be read.
    #[error("Couldn't open {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file given on the command line is not UTF-8 text.
    #[error("{} is not valid UTF-8 text: {source}", path.display())]
    NotText {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An option has a value we cannot use.
    #[error("Invalid value for --{option}: {message}")]
    Invalid {
        option: &'static str,
        message: String,
    },
}

/// Database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl DatabaseType {
    /// Port assumed when `--dbport` is omitted. Only PostgreSQL has one;
    /// MySQL connects through the server's own default.
    #[must_use]
    pub fn default_port(self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::Mysql | Self::Sqlite => None,
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mysql => write!(f, "mysql"),
            Self::Postgres => write!(f, "postgres"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(Self::Mysql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ConfigError::Invalid {
                option: "dbtype",
                message: format!("unknown database type '{s}'. Supported: mysql, postgres, sqlite"),
            }),
        }
    }
}

/// Options exactly as the operator gave them. Nothing here is validated.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub site_name: Option<String>,
    pub script_path: Option<String>,
    pub language: Option<String>,
    pub site_dir: Option<PathBuf>,
    pub conf_path: Option<PathBuf>,

    pub db_type: Option<String>,
    pub db_server: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_path: Option<PathBuf>,
    pub db_prefix: Option<String>,
    pub db_schema: Option<String>,
    pub install_db_user: Option<String>,
    pub install_db_pass: Option<String>,
    pub db_user: Option<String>,
    pub db_pass: Option<String>,
    pub db_pass_file: Option<PathBuf>,

    pub main_page_content: Option<String>,
    pub main_page_content_file: Option<PathBuf>,
    pub skip_interwiki: bool,
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub db_type: DatabaseType,
    pub server: String,
    pub port: Option<u16>,
    pub name: String,
    /// Directory holding SQLite files.
    pub path: PathBuf,
    pub prefix: String,
    /// Schema for PostgreSQL.
    pub schema: String,
    /// Account used during installation.
    pub install_user: String,
    pub install_password: Option<String>,
    /// Account used by the wiki at runtime.
    pub user: String,
    pub password: Option<String>,
}

/// Validated installation configuration.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Name of the wiki.
    pub site_name: String,
    /// Path of the wiki relative to the web server root.
    pub script_path: String,
    /// Content language code.
    pub language: String,
    /// Directory the site is installed into.
    pub site_dir: PathBuf,
    /// Directory the settings file is written to.
    pub conf_path: PathBuf,
    pub database: DatabaseConfig,
    /// Custom main page content, already resolved.
    pub main_page_content: Option<String>,
    /// Leave the interwiki table empty.
    pub skip_interwiki: bool,
    /// Advisories for the operator raised while resolving options.
    pub notices: Vec<String>,
}

impl InstallConfig {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable files or invalid values.
    pub fn from_options(
        options: InstallOptions,
        reader: &dyn FileReader,
    ) -> Result<Self, ConfigError> {
        let site_name = options
            .site_name
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_string());
        if site_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                option: "name",
                message: "site name cannot be empty".into(),
            });
        }

        let script_path = options.script_path.unwrap_or_else(|| "/wiki".to_string());
        if !script_path.is_empty() && !script_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                option: "scriptpath",
                message: format!("'{script_path}' must start with '/'"),
            });
        }

        let site_dir = options
            .site_dir
            .unwrap_or_else(|| PathBuf::from(".").join(slug(&site_name)));
        let conf_path = options.conf_path.unwrap_or_else(|| site_dir.clone());

        let db_type = match options.db_type.as_deref() {
            Some(raw) => raw.parse()?,
            None => DatabaseType::default(),
        };

        let mut notices = Vec::new();
        let password = resolve_option(
            reader,
            &mut notices,
            "dbpass",
            options.db_pass.as_deref(),
            "dbpassfile",
            options.db_pass_file.as_deref(),
        )?;

        let main_page_content = resolve_option(
            reader,
            &mut notices,
            "main-page-content",
            options.main_page_content.as_deref(),
            "main-page-content-file",
            options.main_page_content_file.as_deref(),
        )?;

        let database = DatabaseConfig {
            db_type,
            server: options.db_server.unwrap_or_else(|| "localhost".to_string()),
            port: options.db_port.or_else(|| db_type.default_port()),
            name: options.db_name.unwrap_or_else(|| "my_wiki".to_string()),
            path: options.db_path.unwrap_or_else(|| site_dir.join("data")),
            prefix: options.db_prefix.unwrap_or_default(),
            schema: options.db_schema.unwrap_or_else(|| "mediawiki".to_string()),
            install_user: options.install_db_user.unwrap_or_else(|| "root".to_string()),
            install_password: options.install_db_pass,
            user: options.db_user.unwrap_or_else(|| "wikiuser".to_string()),
            password: password.into_value(),
        };

        Ok(Self {
            site_name,
            script_path,
            language: options.language.unwrap_or_else(|| "en".to_string()),
            site_dir,
            conf_path,
            database,
            main_page_content: main_page_content.into_value(),
            skip_interwiki: options.skip_interwiki,
            notices,
        })
    }

    /// Skip policy for this install.
    #[must_use]
    pub fn skip_policy(&self) -> SkipPolicy {
        SkipPolicy::new(self.skip_interwiki)
    }
}

/// Resolve a value/file option pair, recording a notice when the file
/// replaces an inline value.
fn resolve_option(
    reader: &dyn FileReader,
    notices: &mut Vec<String>,
    inline_option: &str,
    inline: Option<&str>,
    file_option: &str,
    file: Option<&Path>,
) -> Result<ResolvedInput, ConfigError> {
    let resolved = resolve_with(reader, file, inline)?;
    if resolved.overrode_inline() {
        warn!(
            inline = inline_option,
            file = file_option,
            "File option overrides inline option"
        );
        notices.push(format!(
            "You have provided the options \"{inline_option}\" and \"{file_option}\". \
             The content of \"{file_option}\" overrides \"{inline_option}\"."
        ));
    }
    Ok(resolved)
}

/// Lowercase, filesystem friendly version of a site name.
fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;

    use super::*;

    struct CannedReader(HashMap<PathBuf, String>);

    impl FileReader for CannedReader {
        fn read_file(&self, path: &Path) -> io::Result<String> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }

    fn empty_reader() -> CannedReader {
        CannedReader(HashMap::new())
    }

    #[test]
    fn test_defaults() {
        let config = InstallConfig::from_options(InstallOptions::default(), &empty_reader()).unwrap();

        assert_eq!(config.site_name, "MediaWiki");
        assert_eq!(config.script_path, "/wiki");
        assert_eq!(config.language, "en");
        assert_eq!(config.site_dir, PathBuf::from("./mediawiki"));
        assert_eq!(config.conf_path, config.site_dir);
        assert_eq!(config.database.db_type, DatabaseType::Mysql);
        assert_eq!(config.database.port, None);
        assert_eq!(config.database.name, "my_wiki");
        assert_eq!(config.database.user, "wikiuser");
        assert_eq!(config.database.install_user, "root");
        assert_eq!(config.database.path, PathBuf::from("./mediawiki/data"));
        assert_eq!(config.main_page_content, None);
        assert!(config.notices.is_empty());
        assert_eq!(config.skip_policy(), SkipPolicy::new(false));
    }

    #[test]
    fn test_db_type_parsing() {
        assert_eq!("MySQL".parse::<DatabaseType>().unwrap(), DatabaseType::Mysql);
        assert_eq!("postgresql".parse::<DatabaseType>().unwrap(), DatabaseType::Postgres);
        assert_eq!("sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert!("oracle".parse::<DatabaseType>().is_err());
        assert_eq!(DatabaseType::Postgres.to_string(), "postgres");
    }

    #[test]
    fn test_postgres_gets_default_port() {
        let options = InstallOptions {
            db_type: Some("postgres".into()),
            ..InstallOptions::default()
        };
        let config = InstallConfig::from_options(options, &empty_reader()).unwrap();
        assert_eq!(config.database.port, Some(5432));
    }

    #[test]
    fn test_dbpassfile_overrides_dbpass() {
        let reader = CannedReader(HashMap::from([(
            PathBuf::from("/run/secrets/dbpass"),
            "from-file\r\n".to_string(),
        )]));
        let options = InstallOptions {
            db_pass: Some("inline".into()),
            db_pass_file: Some(PathBuf::from("/run/secrets/dbpass")),
            ..InstallOptions::default()
        };

        let config = InstallConfig::from_options(options, &reader).unwrap();
        assert_eq!(config.database.password.as_deref(), Some("from-file"));
        assert_eq!(config.notices.len(), 1);
        assert!(config.notices[0].contains("\"dbpassfile\" overrides \"dbpass\""));
    }

    #[test]
    fn test_both_content_options_give_one_notice() {
        let reader = CannedReader(HashMap::from([(
            PathBuf::from("/srv/main.txt"),
            "From file".to_string(),
        )]));
        let options = InstallOptions {
            main_page_content: Some("inline".into()),
            main_page_content_file: Some(PathBuf::from("/srv/main.txt")),
            ..InstallOptions::default()
        };

        let config = InstallConfig::from_options(options, &reader).unwrap();
        assert_eq!(config.main_page_content.as_deref(), Some("From file"));
        assert_eq!(config.notices.len(), 1);
        assert!(config.notices[0].contains("main-page-content-file"));
    }

    #[test]
    fn test_both_pairs_doubled_give_two_notices() {
        let reader = CannedReader(HashMap::from([
            (PathBuf::from("/srv/main.txt"), "Body".to_string()),
            (PathBuf::from("/run/secrets/dbpass"), "pw".to_string()),
        ]));
        let options = InstallOptions {
            db_pass: Some("inline".into()),
            db_pass_file: Some(PathBuf::from("/run/secrets/dbpass")),
            main_page_content: Some("inline".into()),
            main_page_content_file: Some(PathBuf::from("/srv/main.txt")),
            ..InstallOptions::default()
        };

        let config = InstallConfig::from_options(options, &reader).unwrap();
        assert_eq!(config.notices.len(), 2);
    }

    #[test]
    fn test_mysql_port_only_when_given() {
        let options = InstallOptions {
            db_port: Some(3307),
            ..InstallOptions::default()
        };
        let config = InstallConfig::from_options(options, &empty_reader()).unwrap();
        assert_eq!(config.database.port, Some(3307));
        assert_eq!(DatabaseType::Mysql.default_port(), None);
    }

    #[test]
    fn test_unreadable_main_page_file_fails() {
        let options = InstallOptions {
            main_page_content: Some("inline".into()),
            main_page_content_file: Some(PathBuf::from("/missing/main.txt")),
            ..InstallOptions::default()
        };

        let err = InstallConfig::from_options(options, &empty_reader()).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }

    #[test]
    fn test_main_page_content_from_file() {
        let reader = CannedReader(HashMap::from([(
            PathBuf::from("/srv/main.txt"),
            "Hello\n".to_string(),
        )]));
        let options = InstallOptions {
            main_page_content_file: Some(PathBuf::from("/srv/main.txt")),
            skip_interwiki: true,
            ..InstallOptions::default()
        };

        let config = InstallConfig::from_options(options, &reader).unwrap();
        assert_eq!(config.main_page_content.as_deref(), Some("Hello"));
        assert!(config.notices.is_empty());
        assert_eq!(config.skip_policy(), SkipPolicy::new(true));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let options = InstallOptions {
            site_name: Some("  ".into()),
            ..InstallOptions::default()
        };
        assert!(InstallConfig::from_options(options, &empty_reader()).is_err());

        let options = InstallOptions {
            script_path: Some("wiki".into()),
            ..InstallOptions::default()
        };
        let err = InstallConfig::from_options(options, &empty_reader()).unwrap_err();
        assert!(err.to_string().contains("--scriptpath"));

        let options = InstallOptions {
            db_type: Some("mssql".into()),
            ..InstallOptions::default()
        };
        let err = InstallConfig::from_options(options, &empty_reader()).unwrap_err();
        assert!(err.to_string().contains("--dbtype"));
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("My Family Wiki"), "my_family_wiki");
        assert_eq!(slug(" Wiki-42 "), "wiki_42");
    }
}
