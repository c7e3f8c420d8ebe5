//! Step filtering.
//!
//! Wiki families create their administrator accounts and interwiki prefixes
//! centrally, so a family member's installation drops those steps from the
//! baseline list. Filtering is a plain function over whatever list the step
//! source produced.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::step::Step;

/// Name of the administrator (sysop) account creation step.
pub const SYSOP_STEP: &str = "sysop";

/// Name of the interwiki table seeding step.
pub const INTERWIKI_STEP: &str = "interwiki";

/// Which optional baseline steps to leave out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipPolicy {
    /// Drop the sysop creation step.
    pub skip_sysop_creation: bool,
    /// Drop the interwiki seeding step.
    pub skip_interwiki_seeding: bool,
}

impl SkipPolicy {
    /// Policy used by family installs: sysop creation is always skipped,
    /// interwiki seeding only on request.
    #[must_use]
    pub fn new(skip_interwiki_seeding: bool) -> Self {
        Self {
            skip_sysop_creation: true,
            skip_interwiki_seeding,
        }
    }

    /// Step names excluded by this policy.
    #[must_use]
    pub fn skip_names(&self) -> BTreeSet<&'static str> {
        let mut names = BTreeSet::new();
        if self.skip_sysop_creation {
            names.insert(SYSOP_STEP);
        }
        if self.skip_interwiki_seeding {
            names.insert(INTERWIKI_STEP);
        }
        names
    }
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Keep the steps whose name is not in `skip_names`, in their original order.
#[must_use]
pub fn filter_steps(steps: &[Step], skip_names: &BTreeSet<&str>) -> Vec<Step> {
    steps
        .iter()
        .filter(|step| !skip_names.contains(step.name()))
        .cloned()
        .collect()
}
