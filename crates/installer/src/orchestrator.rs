//! Installer orchestration module.
//!
//! Fetches the baseline steps from a [`StepSource`], drops the ones the
//! [`SkipPolicy`] excludes and runs the rest strictly in order. The first fatal
//! step stops the run; nothing is retried and nothing is rolled back.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::filter::{filter_steps, SkipPolicy};
use crate::step::{Step, StepOutcome, StepResult, StepSource};
use crate::ui;

/// Run-level outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregateResult {
    /// Every step succeeded.
    Ok,
    /// Every step ran, some reported warnings.
    Warning { warnings: Vec<StepResult> },
    /// A step failed and the run stopped there.
    Fatal { step: String, message: String },
}

impl AggregateResult {
    /// Fold step results: any fatal wins, then any warning, then ok.
    #[must_use]
    pub fn from_results(results: &[StepResult]) -> Self {
        if let Some(fatal) = results.iter().find(|r| r.outcome.is_fatal()) {
            return Self::Fatal {
                step: fatal.step_name.clone(),
                message: fatal.outcome.message().unwrap_or_default().to_string(),
            };
        }

        let warnings: Vec<StepResult> = results
            .iter()
            .filter(|r| r.outcome.is_warning())
            .cloned()
            .collect();
        if warnings.is_empty() {
            Self::Ok
        } else {
            Self::Warning { warnings }
        }
    }

    /// Whether the install counts as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Fatal { .. })
    }

    /// Process exit status for this result.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running { current: usize },
    Completed(AggregateResult),
    Aborted(AggregateResult),
}

impl RunState {
    /// Whether the run has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Aborted(_))
    }

    /// Whether moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running { current }) => *current == 0,
            (Self::Running { current }, Self::Running { current: next }) => *next == current + 1,
            (Self::Pending | Self::Running { .. }, Self::Completed(result)) => result.is_success(),
            (Self::Running { .. }, Self::Aborted(result)) => !result.is_success(),
            _ => false,
        }
    }
}

/// Everything recorded about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    /// Baseline steps removed by the skip policy.
    pub skipped: Vec<String>,
    /// Results of the steps that ran, in execution order.
    pub results: Vec<StepResult>,
    pub aggregate: AggregateResult,
}

impl RunReport {
    /// Names of the steps that actually ran.
    #[must_use]
    pub fn executed(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.step_name.as_str()).collect()
    }

    /// Print a per-step summary.
    pub fn print_summary(&self) {
        ui::print_section("Installation Summary");
        for name in &self.skipped {
            ui::print_skipped(name);
        }
        for result in &self.results {
            ui::print_step_result(result);
        }
        println!();
        match &self.aggregate {
            AggregateResult::Ok => ui::print_success("Installation complete"),
            AggregateResult::Warning { warnings } => ui::print_warning(&format!(
                "Installation complete with {} warning(s)",
                warnings.len()
            )),
            AggregateResult::Fatal { step, message } => {
                ui::print_error(&format!("Installation failed at step '{step}': {message}"));
            }
        }
    }

    /// Write the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create report directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, content).context("Failed to write report file")?;
        Ok(())
    }
}

/// One execution of a filtered step list.
///
/// Consumed by [`InstallRun::execute`]; a new run needs a new instance.
pub struct InstallRun {
    steps: Vec<Step>,
    skipped: Vec<String>,
    state: RunState,
    results: Vec<StepResult>,
}

impl InstallRun {
    /// Prepare a run over `baseline` filtered by `policy`.
    #[must_use]
    pub fn new(baseline: &[Step], policy: &SkipPolicy) -> Self {
        let skip_names = policy.skip_names();
        let steps = filter_steps(baseline, &skip_names);
        let skipped = baseline
            .iter()
            .filter(|s| skip_names.contains(s.name()))
            .map(|s| s.name().to_string())
            .collect();

        Self {
            steps,
            skipped,
            state: RunState::Pending,
            results: Vec::new(),
        }
    }

    /// Steps that will run, in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid run transition {:?} -> {next:?}",
            self.state
        );
        self.state = next;
    }

    /// Run every step in order, stopping at the first fatal one.
    pub async fn execute(mut self) -> RunReport {
        let started_at = chrono::Utc::now().to_rfc3339();
        let total = self.steps.len();

        for name in &self.skipped {
            info!(step = %name, "Skipping step");
        }

        let steps = std::mem::take(&mut self.steps);
        for (index, step) in steps.iter().enumerate() {
            self.transition(RunState::Running { current: index });
            ui::print_progress_step(index + 1, total, step.name());
            info!(step = %step.name(), "Executing step");

            let outcome = step.run().await;
            match &outcome {
                StepOutcome::Ok => ui::print_success(step.name()),
                StepOutcome::Warning(message) => {
                    warn!(step = %step.name(), reason = %message, "Step reported a warning");
                    ui::print_warning(message);
                }
                StepOutcome::Fatal(message) => {
                    error!(step = %step.name(), reason = %message, "Step failed");
                    ui::print_error(message);
                }
            }

            let fatal = outcome.is_fatal();
            self.results.push(StepResult::new(step.name(), outcome));
            if fatal {
                break;
            }
        }

        let aggregate = AggregateResult::from_results(&self.results);
        if aggregate.is_success() {
            self.transition(RunState::Completed(aggregate.clone()));
        } else {
            self.transition(RunState::Aborted(aggregate.clone()));
        }

        RunReport {
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            skipped: self.skipped,
            results: self.results,
            aggregate,
        }
    }
}

/// Orchestrates installations under a fixed skip policy.
#[derive(Debug, Clone)]
pub struct Installer {
    policy: SkipPolicy,
}

impl Installer {
    #[must_use]
    pub fn new(policy: SkipPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &SkipPolicy {
        &self.policy
    }

    /// Fetch fresh baseline steps from `source` and run them.
    pub async fn run(&self, source: &dyn StepSource) -> RunReport {
        let baseline = source.baseline_steps();
        info!(
            baseline = baseline.len(),
            skip = ?self.policy.skip_names(),
            "Starting installation"
        );
        InstallRun::new(&baseline, &self.policy).execute().await
    }
}

/// Run `source` under `policy` and return only the aggregate.
pub async fn run(source: &dyn StepSource, policy: &SkipPolicy) -> AggregateResult {
    Installer::new(*policy).run(source).await.aggregate
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::TempDir;

    use super::*;

    /// Steps that log their name into a shared journal when run.
    fn journaled(
        journal: &Arc<Mutex<Vec<String>>>,
        outcomes: &[(&str, StepOutcome)],
    ) -> Vec<Step> {
        outcomes
            .iter()
            .map(|(name, outcome)| {
                let journal = Arc::clone(journal);
                let step_name = (*name).to_string();
                let outcome = outcome.clone();
                Step::new(*name, move || {
                    journal.lock().unwrap().push(step_name.clone());
                    outcome.clone()
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fatal_stops_the_run() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let steps = journaled(
            &journal,
            &[
                ("A", StepOutcome::Ok),
                ("B", StepOutcome::fatal("schema broke")),
                ("C", StepOutcome::Ok),
            ],
        );

        let result = run(&move || steps.clone(), &SkipPolicy::default()).await;

        assert_eq!(*journal.lock().unwrap(), vec!["A", "B"]);
        assert_eq!(
            result,
            AggregateResult::Fatal {
                step: "B".into(),
                message: "schema broke".into()
            }
        );
        assert_eq!(result.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_family_policy_filters_and_keeps_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let steps = journaled(
            &journal,
            &[
                ("sysop", StepOutcome::Ok),
                ("interwiki", StepOutcome::Ok),
                ("content", StepOutcome::Ok),
                ("schema", StepOutcome::Ok),
            ],
        );

        let report = Installer::new(SkipPolicy::new(true))
            .run(&move || steps.clone())
            .await;

        assert_eq!(*journal.lock().unwrap(), vec!["content", "schema"]);
        assert_eq!(report.executed(), vec!["content", "schema"]);
        assert_eq!(report.skipped, vec!["sysop", "interwiki"]);
        assert_eq!(report.aggregate, AggregateResult::Ok);
    }

    #[tokio::test]
    async fn test_warnings_do_not_stop_the_run() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let steps = journaled(
            &journal,
            &[
                ("tables", StepOutcome::Ok),
                ("mainpage", StepOutcome::warning("already exists")),
                ("updates", StepOutcome::Ok),
            ],
        );

        let report = Installer::new(SkipPolicy::default())
            .run(&move || steps.clone())
            .await;

        assert_eq!(report.executed(), vec!["tables", "mainpage", "updates"]);
        match &report.aggregate {
            AggregateResult::Warning { warnings } => {
                assert_eq!(warnings.len(), 1);
                assert_eq!(warnings[0].step_name, "mainpage");
            }
            other => panic!("expected warning aggregate, got {other:?}"),
        }
        assert!(report.aggregate.is_success());
        assert_eq!(report.aggregate.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_empty_run_is_ok() {
        let result = run(&|| Vec::<Step>::new(), &SkipPolicy::default()).await;
        assert_eq!(result, AggregateResult::Ok);
    }

    #[tokio::test]
    async fn test_run_state_ends_terminal() {
        let steps = vec![Step::new("keys", || StepOutcome::Ok)];
        let run = InstallRun::new(&steps, &SkipPolicy::default());
        assert_eq!(run.state(), &RunState::Pending);
        assert_eq!(run.steps().len(), 1);

        let report = run.execute().await;
        assert_eq!(report.aggregate, AggregateResult::Ok);
    }

    #[test]
    fn test_aggregate_precedence() {
        let results = vec![
            StepResult::new("a", StepOutcome::warning("w")),
            StepResult::new("b", StepOutcome::fatal("f")),
        ];
        assert!(matches!(
            AggregateResult::from_results(&results),
            AggregateResult::Fatal { ref step, .. } if step == "b"
        ));
        assert_eq!(AggregateResult::from_results(&[]), AggregateResult::Ok);
    }

    #[test]
    fn test_state_transitions() {
        let ok = AggregateResult::Ok;
        let fatal = AggregateResult::Fatal {
            step: "x".into(),
            message: "y".into(),
        };

        assert!(RunState::Pending.can_transition_to(&RunState::Running { current: 0 }));
        assert!(RunState::Pending.can_transition_to(&RunState::Completed(ok.clone())));
        assert!(RunState::Running { current: 0 }
            .can_transition_to(&RunState::Running { current: 1 }));
        assert!(RunState::Running { current: 1 }.can_transition_to(&RunState::Aborted(fatal.clone())));

        assert!(!RunState::Running { current: 2 }
            .can_transition_to(&RunState::Running { current: 1 }));
        assert!(!RunState::Completed(ok.clone()).can_transition_to(&RunState::Running { current: 0 }));
        assert!(!RunState::Aborted(fatal.clone()).can_transition_to(&RunState::Running { current: 0 }));
        assert!(!RunState::Pending.can_transition_to(&RunState::Aborted(fatal)));
        assert!(RunState::Completed(ok).is_terminal());
    }

    #[test]
    fn test_report_written_as_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports/install.json");
        let report = RunReport {
            started_at: "2026-01-01T00:00:00Z".into(),
            finished_at: "2026-01-01T00:00:01Z".into(),
            skipped: vec!["sysop".into()],
            results: vec![StepResult::new("mainpage", StepOutcome::Ok)],
            aggregate: AggregateResult::Ok,
        };

        report.write_json(&path).unwrap();

        let parsed: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.skipped, vec!["sysop"]);
        assert_eq!(parsed.aggregate, AggregateResult::Ok);
    }
}
