//! Installation steps and their outcomes.
//!
//! A step is a name plus an opaque action. The orchestrator only ever looks at
//! the name (for filtering and reporting); what the action does is up to the
//! step source that produced it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step did its work.
    Ok,
    /// The step chose not to act; the run continues.
    Warning(String),
    /// The step failed; the run halts here.
    Fatal(String),
}

impl StepOutcome {
    /// Build a warning outcome.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    /// Build a fatal outcome.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    /// Message carried by a warning or fatal outcome.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok => None,
            Self::Warning(msg) | Self::Fatal(msg) => Some(msg),
        }
    }
}

/// The unit of work behind a step.
///
/// Implementations catch their own failures and turn them into
/// [`StepOutcome::Warning`] or [`StepOutcome::Fatal`].
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(&self) -> StepOutcome;
}

#[async_trait]
impl<F> StepAction for F
where
    F: Fn() -> StepOutcome + Send + Sync,
{
    async fn run(&self) -> StepOutcome {
        self()
    }
}

/// A named installation step.
#[derive(Clone)]
pub struct Step {
    name: String,
    action: Arc<dyn StepAction>,
}

impl Step {
    /// Create a step from any action.
    pub fn new(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self {
            name: name.into(),
            action: Arc::new(action),
        }
    }

    /// Create a step sharing an already allocated action.
    pub fn shared(name: impl Into<String>, action: Arc<dyn StepAction>) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the step's action.
    pub async fn run(&self) -> StepOutcome {
        self.action.run().await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// Result recorded for an executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Name of the step that produced this result.
    pub step_name: String,
    /// What happened.
    pub outcome: StepOutcome,
}

impl StepResult {
    pub fn new(step_name: impl Into<String>, outcome: StepOutcome) -> Self {
        Self {
            step_name: step_name.into(),
            outcome,
        }
    }
}

/// Supplies the baseline, ordered list of steps for a run.
///
/// The order returned is the source of truth; callers filter a copy and never
/// reorder it.
pub trait StepSource {
    fn baseline_steps(&self) -> Vec<Step>;
}

impl<F> StepSource for F
where
    F: Fn() -> Vec<Step>,
{
    fn baseline_steps(&self) -> Vec<Step> {
        self()
    }
}
