//! Environment checks run before any installation step.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::config::{DatabaseType, InstallConfig};
use crate::ui;

/// Validates the environment for a family installation.
pub struct EnvironmentValidator {
    requirements: Vec<Requirement>,
}

struct Requirement {
    name: String,
    check: Box<dyn Fn() -> Result<bool>>,
    remedy: String,
    critical: bool,
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub critical: bool,
    pub remedy: String,
}

impl EnvironmentValidator {
    /// Checks relevant to `config`.
    #[must_use]
    pub fn for_config(config: &InstallConfig) -> Self {
        let mut requirements = Vec::new();

        let site_dir = config.site_dir.clone();
        requirements.push(Requirement {
            name: "Site directory".to_string(),
            check: Box::new(move || Ok(is_writable_or_creatable(&site_dir))),
            remedy: format!(
                "{} must be a writable directory or creatable",
                config.site_dir.display()
            ),
            critical: true,
        });

        let conf_path = config.conf_path.clone();
        let conf_in_site = conf_path.starts_with(&config.site_dir);
        requirements.push(Requirement {
            name: "Settings directory".to_string(),
            check: Box::new(move || {
                Ok(if conf_in_site {
                    is_writable_or_creatable(&conf_path)
                } else {
                    is_writable_dir(&conf_path)
                })
            }),
            remedy: format!(
                "{} must exist and be writable (--confpath)",
                config.conf_path.display()
            ),
            critical: true,
        });

        if config.database.db_type == DatabaseType::Sqlite {
            let db_path = config.database.path.clone();
            requirements.push(Requirement {
                name: "SQLite data directory".to_string(),
                check: Box::new(move || Ok(is_writable_or_creatable(&db_path))),
                remedy: format!(
                    "{} must be writable or creatable (--dbpath)",
                    config.database.path.display()
                ),
                critical: true,
            });
        } else {
            let db_name = config.database.name.clone();
            requirements.push(Requirement {
                name: "Database name".to_string(),
                check: Box::new(move || Ok(is_valid_db_name(&db_name))),
                remedy: "Database names may only contain letters, digits and underscores"
                    .to_string(),
                critical: true,
            });
        }

        requirements.push(Requirement {
            name: "Database password".to_string(),
            check: {
                let needs_password = config.database.db_type != DatabaseType::Sqlite;
                let has_password = config.database.password.is_some();
                Box::new(move || Ok(!needs_password || has_password))
            },
            remedy: "No --dbpass or --dbpassfile given; the wiki will connect without a password"
                .to_string(),
            critical: false,
        });

        Self { requirements }
    }

    /// Run every check without printing anything.
    #[must_use]
    pub fn evaluate(&self) -> Vec<CheckResult> {
        self.requirements
            .iter()
            .map(|requirement| CheckResult {
                name: requirement.name.clone(),
                passed: matches!((requirement.check)(), Ok(true)),
                critical: requirement.critical,
                remedy: requirement.remedy.clone(),
            })
            .collect()
    }

    /// Run and print every check.
    ///
    /// # Errors
    ///
    /// Returns an error if any critical check fails.
    pub fn validate(&self) -> Result<()> {
        let results = self.evaluate();
        let failures: Vec<&CheckResult> = results.iter().filter(|r| !r.passed).collect();

        for result in &results {
            ui::print_check_result(&result.name, result.passed, None);
        }
        println!();

        if failures.is_empty() {
            ui::print_success("Environment checks passed");
            return Ok(());
        }

        ui::print_warning("Some environment checks did not pass:");
        println!();
        for failure in &failures {
            if failure.critical {
                println!(
                    "  {} {} - {}",
                    "✗".red(),
                    failure.name.red(),
                    failure.remedy.bright_black()
                );
            } else {
                println!(
                    "  {} {} - {}",
                    "⚠".yellow(),
                    failure.name.yellow(),
                    failure.remedy.bright_black()
                );
            }
        }
        println!();

        if failures.iter().any(|f| f.critical) {
            anyhow::bail!("Critical environment checks failed, nothing was changed");
        }
        Ok(())
    }
}

/// A directory we can actually create files in, as the current user.
fn is_writable_dir(path: &Path) -> bool {
    path.is_dir() && tempfile::tempfile_in(path).is_ok()
}

/// The directory exists and is writable, or its nearest existing ancestor is.
fn is_writable_or_creatable(path: &Path) -> bool {
    let mut candidate: PathBuf = path.to_path_buf();
    loop {
        if candidate.exists() {
            return is_writable_dir(&candidate);
        }
        match candidate.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => candidate = parent.to_path_buf(),
            _ => return is_writable_dir(Path::new(".")),
        }
    }
}

fn is_valid_db_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
