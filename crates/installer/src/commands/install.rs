use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use family_installer::config::{InstallConfig, InstallOptions, DEFAULT_SITE_NAME};
use family_installer::orchestrator::{AggregateResult, Installer};
use family_installer::resolve::FsReader;
use family_installer::settings::LocalSettings;
use family_installer::site::{SiteContext, SiteStepSource};
use family_installer::ui;
use family_installer::validator::EnvironmentValidator;

/// Install one wiki of a family
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Name of the wiki
    #[arg(default_value = DEFAULT_SITE_NAME)]
    name: String,

    /// Path of the wiki relative to the web server root
    #[arg(long, value_name = "PATH")]
    scriptpath: Option<String>,

    /// Content language code
    #[arg(long, value_name = "CODE")]
    lang: Option<String>,

    /// Database type (mysql, postgres, sqlite)
    #[arg(long, value_name = "TYPE")]
    dbtype: Option<String>,

    /// Database host
    #[arg(long, value_name = "HOST")]
    dbserver: Option<String>,

    /// Database port
    #[arg(long, value_name = "PORT")]
    dbport: Option<u16>,

    /// Database name
    #[arg(long, value_name = "NAME")]
    dbname: Option<String>,

    /// Directory for SQLite files
    #[arg(long, value_name = "DIR")]
    dbpath: Option<PathBuf>,

    /// Table name prefix
    #[arg(long, value_name = "PREFIX")]
    dbprefix: Option<String>,

    /// Database user used during installation
    #[arg(long, value_name = "USER")]
    installdbuser: Option<String>,

    /// Password of the installation user
    #[arg(long, value_name = "PASSWORD")]
    installdbpass: Option<String>,

    /// Database user the wiki connects as
    #[arg(long, value_name = "USER")]
    dbuser: Option<String>,

    /// Password of the wiki database user
    #[arg(long, value_name = "PASSWORD")]
    dbpass: Option<String>,

    /// File holding the database password (overrides --dbpass)
    #[arg(long, value_name = "FILE")]
    dbpassfile: Option<PathBuf>,

    /// PostgreSQL schema
    #[arg(long, value_name = "SCHEMA")]
    dbschema: Option<String>,

    /// Directory to write LocalSettings.toml into
    #[arg(long, value_name = "DIR")]
    confpath: Option<PathBuf>,

    /// Custom main page content
    #[arg(long, value_name = "TEXT")]
    main_page_content: Option<String>,

    /// File holding custom main page content (overrides --main-page-content)
    #[arg(long, value_name = "FILE", alias = "mainpagecontentpath")]
    main_page_content_file: Option<PathBuf>,

    /// Leave the interwiki table empty
    #[arg(long, alias = "skipinterwiki")]
    skip_interwiki: bool,

    /// Only run the environment checks
    #[arg(long)]
    env_checks: bool,

    /// Directory the site is installed into
    #[arg(long, value_name = "DIR")]
    site_dir: Option<PathBuf>,

    /// Write a JSON run report to this file
    #[arg(long, value_name = "FILE")]
    report_json: Option<PathBuf>,
}

impl InstallCommand {
    pub async fn run(&self) -> Result<()> {
        ui::print_banner();

        let config = InstallConfig::from_options(self.options(), &FsReader)
            .context("Invalid installation options")?;
        for notice in &config.notices {
            ui::print_warning(notice);
        }
        Self::print_config_summary(&config);

        ui::print_section("Environment");
        EnvironmentValidator::for_config(&config).validate()?;
        if self.env_checks {
            ui::print_info("Environment checks only, nothing was installed");
            return Ok(());
        }

        ui::print_section(&format!("Installing {}", config.site_name));
        let source = SiteStepSource::new(
            SiteContext::from_config(&config),
            config.main_page_content.clone(),
        );
        let report = Installer::new(config.skip_policy()).run(&source).await;
        report.print_summary();

        if let Some(path) = &self.report_json {
            report.write_json(path)?;
            debug!(path = %path.display(), "Run report written");
        }

        if let AggregateResult::Fatal { step, message } = &report.aggregate {
            anyhow::bail!("Installation failed at step '{step}': {message}");
        }

        let settings_path = LocalSettings::from_config(&config).write_to(&config.conf_path)?;
        info!(site = %config.site_name, "Installation finished");
        ui::print_info(&format!(
            "Settings written to {}",
            settings_path.display()
        ));
        Ok(())
    }

    fn options(&self) -> InstallOptions {
        InstallOptions {
            site_name: Some(self.name.clone()),
            script_path: self.scriptpath.clone(),
            language: self.lang.clone(),
            site_dir: self.site_dir.clone(),
            conf_path: self.confpath.clone(),
            db_type: self.dbtype.clone(),
            db_server: self.dbserver.clone(),
            db_port: self.dbport,
            db_name: self.dbname.clone(),
            db_path: self.dbpath.clone(),
            db_prefix: self.dbprefix.clone(),
            db_schema: self.dbschema.clone(),
            install_db_user: self.installdbuser.clone(),
            install_db_pass: self.installdbpass.clone(),
            db_user: self.dbuser.clone(),
            db_pass: self.dbpass.clone(),
            db_pass_file: self.dbpassfile.clone(),
            main_page_content: self.main_page_content.clone(),
            main_page_content_file: self.main_page_content_file.clone(),
            skip_interwiki: self.skip_interwiki,
        }
    }

    fn print_config_summary(config: &InstallConfig) {
        ui::print_section("Configuration");
        ui::print_kv("Site", &config.site_name);
        ui::print_kv("Script path", &config.script_path);
        ui::print_kv("Language", &config.language);
        ui::print_kv("Site directory", &config.site_dir.display().to_string());
        ui::print_kv("Settings directory", &config.conf_path.display().to_string());
        ui::print_kv("Database", &format!(
            "{} ({})",
            config.database.name, config.database.db_type
        ));
        ui::print_kv(
            "Interwiki",
            if config.skip_interwiki { "skipped" } else { "seeded" },
        );
        ui::print_kv("Main page", main_page_label(config));
    }
}

fn main_page_label(config: &InstallConfig) -> &'static str {
    if config
        .main_page_content
        .as_deref()
        .is_some_and(|content| !content.is_empty())
    {
        "custom"
    } else {
        "default"
    }
}
