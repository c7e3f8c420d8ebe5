//! Main page creation step.
//!
//! Writes the landing page of a new wiki, using the operator's custom content
//! when given and the stock welcome text otherwise. An existing page is never
//! touched, so re-running an install is safe for this step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::page_store::{AuthorIdentity, PageRef, PageStore};
use crate::step::{StepAction, StepOutcome};

/// Baseline name of the main page step.
pub const MAIN_PAGE_STEP: &str = "mainpage";

/// Placed between the page body and the footer.
pub const FOOTER_SEPARATOR: &str = "\n\n";

/// Source of the default main page texts.
pub trait ContentMessages: Send + Sync {
    /// Body used when no custom content is configured.
    fn main_page_text(&self) -> String;

    /// Footer appended to every main page.
    fn main_page_footer(&self) -> String;
}

/// Stock English welcome texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl ContentMessages for DefaultMessages {
    fn main_page_text(&self) -> String {
        "<strong>MediaWiki has been installed.</strong>".to_string()
    }

    fn main_page_footer(&self) -> String {
        "Consult the [https://www.mediawiki.org/wiki/Special:MyLanguage/Help:Contents User's Guide] \
         for information on using the wiki software.\n\n\
         == Getting started ==\n\
         * [https://www.mediawiki.org/wiki/Special:MyLanguage/Manual:Configuration_settings Configuration settings list]\n\
         * [https://www.mediawiki.org/wiki/Special:MyLanguage/Manual:FAQ MediaWiki FAQ]\n\
         * [https://lists.wikimedia.org/postorius/lists/mediawiki-announce.lists.wikimedia.org/ MediaWiki release mailing list]"
            .to_string()
    }
}

/// Creates the main page if it does not exist yet.
pub struct MainPageStep {
    target: PageRef,
    content: Option<String>,
    store: Arc<dyn PageStore>,
    messages: Arc<dyn ContentMessages>,
    author: AuthorIdentity,
}

impl MainPageStep {
    /// Step writing `target` through `store` as the system identity.
    pub fn new(
        target: PageRef,
        content: Option<String>,
        store: Arc<dyn PageStore>,
        messages: Arc<dyn ContentMessages>,
    ) -> Self {
        Self {
            target,
            content,
            store,
            messages,
            author: AuthorIdentity::system(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &PageRef {
        &self.target
    }

    /// Full page text: custom or default body, separator, footer.
    ///
    /// Empty custom content counts as no custom content.
    #[must_use]
    pub fn compose(&self) -> String {
        let body = match self.content.as_deref() {
            Some(custom) if !custom.is_empty() => custom.to_string(),
            _ => self.messages.main_page_text(),
        };
        format!(
            "{body}{FOOTER_SEPARATOR}{}",
            self.messages.main_page_footer()
        )
    }

    /// Run the step. Failures come back as [`StepOutcome::Fatal`].
    pub async fn execute(&self) -> StepOutcome {
        match self.store.exists(&self.target).await {
            Ok(true) => {
                warn!(page = %self.target, "Main page already exists, not overwriting");
                return StepOutcome::warning(format!("page '{}' already exists", self.target));
            }
            Ok(false) => {}
            Err(e) => {
                return StepOutcome::fatal(format!(
                    "main page creation failed: cannot check '{}': {e}",
                    self.target
                ));
            }
        }

        let content = self.compose();
        match self.store.write(&self.target, &content, &self.author).await {
            Ok(()) => {
                info!(page = %self.target, author = self.author.name(), "Main page created");
                StepOutcome::Ok
            }
            Err(e) => StepOutcome::fatal(format!("main page creation failed: {e}")),
        }
    }
}

#[async_trait]
impl StepAction for MainPageStep {
    async fn run(&self) -> StepOutcome {
        self.execute().await
    }
}
