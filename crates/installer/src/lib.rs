//! Wiki Family Installer Library.
//!
//! Runs the per-wiki installation steps for a wiki that belongs to a centrally
//! managed family. The baseline step list is filtered by a [`SkipPolicy`]
//! (sysop creation is always dropped, interwiki seeding on request) and run
//! strictly in order, with the main page seeded from custom content or the
//! stock welcome text.
//!
//! # Example
//!
//! ```ignore
//! use family_installer::{Installer, SkipPolicy, SiteContext, SiteStepSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = SiteStepSource::new(context, Some("Welcome!".into()));
//!     let report = Installer::new(SkipPolicy::new(true)).run(&source).await;
//!     std::process::exit(report.aggregate.exit_code());
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod filter;
pub mod main_page;
pub mod orchestrator;
pub mod page_store;
pub mod resolve;
pub mod settings;
pub mod site;
pub mod step;
pub mod ui;
pub mod validator;

// Re-export commonly used types at the crate root
pub use config::{ConfigError, InstallConfig, InstallOptions};
pub use filter::{filter_steps, SkipPolicy};
pub use main_page::MainPageStep;
pub use orchestrator::{run, AggregateResult, Installer, RunReport};
pub use site::{SiteContext, SiteStepSource};
pub use step::{Step, StepAction, StepOutcome, StepResult, StepSource};
