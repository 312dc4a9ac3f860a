//! Progressive search budget
//!
//! A build starts small and widens only when the cheap pass comes up short:
//!
//! ```text
//! Initial (5) -> FirstStep (2000) -> All (unbounded)
//! ```

/// Default number of matches an initial pass must find
pub const DEFAULT_INITIAL_COUNT: usize = 5;

/// Default bound of the first provider step
pub const DEFAULT_FIRST_STEP_COUNT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct StageBudget {
    pub initial: usize,
    pub first_step: usize,
}

impl Default for StageBudget {
    fn default() -> Self {
        StageBudget {
            initial: DEFAULT_INITIAL_COUNT,
            first_step: DEFAULT_FIRST_STEP_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum CommitCountStage {
    #[default]
    Initial,
    FirstStep,
    All,
}

impl CommitCountStage {
    pub fn next(self) -> Self {
        match self {
            CommitCountStage::Initial => CommitCountStage::FirstStep,
            CommitCountStage::FirstStep | CommitCountStage::All => CommitCountStage::All,
        }
    }

    pub fn is_initial(self) -> bool {
        self == CommitCountStage::Initial
    }

    pub fn limit(self, budget: &StageBudget) -> usize {
        match self {
            CommitCountStage::Initial => budget.initial,
            CommitCountStage::FirstStep => budget.first_step,
            CommitCountStage::All => usize::MAX,
        }
    }
}
