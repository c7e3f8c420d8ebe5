//! File-backed baseline installer.
//!
//! Supplies the standard step list in its fixed order and implements each
//! step against a site directory. Every step creates its artifact only when it
//! is missing and reports a warning otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::{DatabaseType, InstallConfig};
use crate::filter::{INTERWIKI_STEP, SYSOP_STEP};
use crate::main_page::{DefaultMessages, MainPageStep, MAIN_PAGE_STEP};
use crate::page_store::{FilePageStore, PageRef};
use crate::step::{Step, StepAction, StepOutcome, StepSource};

/// Secret key file created by the `keys` step, inside the data directory.
pub const SECRET_KEY_FILE: &str = "secret.key";

/// Interwiki prefixes seeded into a new wiki.
const DEFAULT_INTERWIKI: &[(&str, &str)] = &[
    ("mediawikiwiki", "https://www.mediawiki.org/wiki/$1"),
    ("metawikimedia", "https://meta.wikimedia.org/wiki/$1"),
    ("wikipedia", "https://en.wikipedia.org/wiki/$1"),
    ("wiktionary", "https://en.wiktionary.org/wiki/$1"),
    ("commons", "https://commons.wikimedia.org/wiki/$1"),
];

/// Facts about the site being installed, handed to every step explicitly.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub site_name: String,
    pub language: String,
    pub site_dir: PathBuf,
    /// Directory standing in for the database (`--dbpath`).
    pub data_dir: PathBuf,
    pub db_type: DatabaseType,
    pub db_name: String,
    pub db_prefix: String,
}

impl SiteContext {
    #[must_use]
    pub fn from_config(config: &InstallConfig) -> Self {
        Self {
            site_name: config.site_name.clone(),
            language: config.language.clone(),
            site_dir: config.site_dir.clone(),
            data_dir: config.database.path.clone(),
            db_type: config.database.db_type,
            db_name: config.database.name.clone(),
            db_prefix: config.database.prefix.clone(),
        }
    }

    /// Directory holding page records.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.site_dir.join("pages")
    }
}

/// Baseline tasks other than the main page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteTask {
    Database,
    Tables,
    Interwiki,
    Stats,
    Keys,
    Updates,
    Sysop,
}

impl SiteTask {
    /// Step name as used by skip policies.
    #[must_use]
    pub fn step_name(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Tables => "tables",
            Self::Interwiki => INTERWIKI_STEP,
            Self::Stats => "stats",
            Self::Keys => "keys",
            Self::Updates => "updates",
            Self::Sysop => SYSOP_STEP,
        }
    }

    /// Artifact the task creates, relative to the data directory.
    fn artifact(self) -> &'static str {
        match self {
            Self::Database => "database.json",
            Self::Tables => "tables.json",
            Self::Interwiki => "interwiki.json",
            Self::Stats => "site_stats.json",
            Self::Keys => SECRET_KEY_FILE,
            Self::Updates => "updatelog.json",
            Self::Sysop => "users.json",
        }
    }
}

/// One baseline task bound to a site.
struct SiteAction {
    task: SiteTask,
    context: Arc<SiteContext>,
}

#[async_trait]
impl StepAction for SiteAction {
    async fn run(&self) -> StepOutcome {
        let name = self.task.step_name();
        match self.perform().await {
            Ok(true) => StepOutcome::Ok,
            Ok(false) => StepOutcome::warning(format!(
                "{name}: {} already exists, left unchanged",
                self.task.artifact()
            )),
            Err(e) => StepOutcome::fatal(format!("{name}: {e}")),
        }
    }
}

impl SiteAction {
    /// Returns `false` when the artifact was already present.
    async fn perform(&self) -> std::io::Result<bool> {
        let ctx = &*self.context;
        tokio::fs::create_dir_all(&ctx.data_dir).await?;
        let path = ctx.data_dir.join(self.task.artifact());

        let contents = match self.task {
            SiteTask::Database => to_json(&json!({
                "type": ctx.db_type,
                "name": ctx.db_name,
                "prefix": ctx.db_prefix,
                "created_at": chrono::Utc::now().to_rfc3339(),
            }))?,
            SiteTask::Tables => to_json(&json!({
                "prefix": ctx.db_prefix,
                "tables": ["page", "revision", "text", "user", "interwiki", "site_stats", "updatelog"],
            }))?,
            SiteTask::Interwiki => {
                let rows: Vec<_> = DEFAULT_INTERWIKI
                    .iter()
                    .map(|(prefix, url)| json!({ "prefix": prefix, "url": url, "local": false }))
                    .collect();
                to_json(&rows)?
            }
            SiteTask::Stats => to_json(&json!({
                "total_edits": 0,
                "good_articles": 0,
                "total_pages": 0,
                "users": 0,
            }))?,
            SiteTask::Keys => format!(
                "{}{}\n",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            ),
            SiteTask::Updates => to_json(&json!({ "applied": [], "language": ctx.language }))?,
            SiteTask::Sysop => to_json(&json!([{ "name": "Admin", "groups": ["sysop", "bureaucrat"] }]))?,
        };

        write_new(&path, &contents).await
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> std::io::Result<String> {
    serde_json::to_string_pretty(value).map_err(std::io::Error::other)
}

/// Create `path` with `contents`; `Ok(false)` if it already exists.
async fn write_new(path: &Path, contents: &str) -> std::io::Result<bool> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };
    file.write_all(contents.as_bytes()).await?;
    file.flush().await?;
    debug!(path = %path.display(), "Artifact written");
    Ok(true)
}

/// Baseline step source for a file-backed site.
pub struct SiteStepSource {
    context: Arc<SiteContext>,
    main_page: Arc<MainPageStep>,
}

impl SiteStepSource {
    /// Baseline order of the step names.
    pub const BASELINE: [&'static str; 8] = [
        "database",
        "tables",
        INTERWIKI_STEP,
        "stats",
        "keys",
        "updates",
        SYSOP_STEP,
        MAIN_PAGE_STEP,
    ];

    /// Source for `context`, creating the main page with `main_page_content`
    /// when given.
    #[must_use]
    pub fn new(context: SiteContext, main_page_content: Option<String>) -> Self {
        let store = Arc::new(FilePageStore::new(context.pages_dir()));
        let main_page = Arc::new(MainPageStep::new(
            PageRef::main_page(),
            main_page_content,
            store,
            Arc::new(DefaultMessages),
        ));
        Self {
            context: Arc::new(context),
            main_page,
        }
    }

    #[must_use]
    pub fn context(&self) -> &SiteContext {
        &self.context
    }

    fn task_step(&self, task: SiteTask) -> Step {
        Step::new(
            task.step_name(),
            SiteAction {
                task,
                context: Arc::clone(&self.context),
            },
        )
    }
}

impl StepSource for SiteStepSource {
    fn baseline_steps(&self) -> Vec<Step> {
        vec![
            self.task_step(SiteTask::Database),
            self.task_step(SiteTask::Tables),
            self.task_step(SiteTask::Interwiki),
            self.task_step(SiteTask::Stats),
            self.task_step(SiteTask::Keys),
            self.task_step(SiteTask::Updates),
            self.task_step(SiteTask::Sysop),
            Step::shared(MAIN_PAGE_STEP, self.main_page.clone()),
        ]
    }
}
