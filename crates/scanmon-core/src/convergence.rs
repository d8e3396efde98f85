//! Baseline-relative progress tracking for one monitoring run.
//!
//! The local mirror survives between runs, so absolute artifact counts include
//! points from earlier jobs. A run snapshots the count once on entry and only
//! reports growth over that baseline. Completion is inferred from the count
//! alone: a point the remote job never produces is indistinguishable from a
//! slow one until the stagnation limit is reached.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    baseline: u64,
    expected: u64,
    observed: u64,
    stagnant_polls: u32,
    max_stagnant_polls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// New artifacts since the baseline; never lower than a previous report.
    pub observed: u64,
    pub expected: u64,
    pub advanced: bool,
    pub converged: bool,
    pub stalled: bool,
    pub stagnant_polls: u32,
}

impl Convergence {
    pub fn begin(baseline: u64, expected: u64, max_stagnant_polls: u32) -> Self {
        Self {
            baseline,
            expected,
            observed: 0,
            stagnant_polls: 0,
            max_stagnant_polls,
        }
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn observe(&mut self, absolute_count: u64) -> Progress {
        let delta = absolute_count.saturating_sub(self.baseline);
        let advanced = delta > self.observed;
        if advanced {
            self.observed = delta;
            self.stagnant_polls = 0;
        }

        let converged = self.observed >= self.expected;
        if !advanced && !converged {
            self.stagnant_polls = self.stagnant_polls.saturating_add(1);
        }

        Progress {
            observed: self.observed,
            expected: self.expected,
            advanced,
            converged,
            stalled: !converged && self.stagnant_polls >= self.max_stagnant_polls,
            stagnant_polls: self.stagnant_polls,
        }
    }
}
