pub mod backup;
mod index;
mod inplace;
mod worktree;

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::StrategyChoice;
use crate::error::AutosquashError;
use crate::git::repository::Repository;
use crate::logging::info_log;
use crate::rebase::{ConflictHandler, RebasePlan};

/// The closed set of execution modes. Selection is a pure function of
/// capability detection plus configuration; every variant honors the
/// same contract: on any non-success outcome the working tree, index,
/// and HEAD are restored to their pre-execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Worktree,
    Index,
    InPlace,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Worktree => "worktree",
            StrategyKind::Index => "index",
            StrategyKind::InPlace => "in-place",
        }
    }
}

#[derive(Debug)]
pub enum ExecutionOutcome {
    Applied {
        new_head: String,
        /// Targets whose fixup was dropped at a conflict.
        skipped: Vec<String>,
    },
    Aborted {
        reason: String,
    },
}

pub fn select_strategy(
    repo: &Repository,
    choice: StrategyChoice,
    plan: &RebasePlan,
) -> StrategyKind {
    match choice {
        StrategyChoice::Worktree => StrategyKind::Worktree,
        StrategyChoice::Index => StrategyKind::Index,
        StrategyChoice::Auto => {
            if plan.single_target_is_head() {
                StrategyKind::InPlace
            } else if repo.supports_worktrees() {
                StrategyKind::Worktree
            } else {
                StrategyKind::Index
            }
        }
    }
}

pub fn execute(
    kind: StrategyKind,
    repo: &Repository,
    plan: &RebasePlan,
    handler: &mut dyn ConflictHandler,
    interrupt: &AtomicBool,
) -> Result<ExecutionOutcome, AutosquashError> {
    info_log(&format!("executing with {} strategy", kind.as_str()));
    match kind {
        StrategyKind::Worktree => worktree::execute(repo, plan, handler, interrupt),
        StrategyKind::Index => index::execute(repo, plan, handler, interrupt),
        StrategyKind::InPlace => inplace::execute(repo, plan, interrupt),
    }
}

pub(crate) fn check_interrupt(interrupt: &AtomicBool) -> Result<(), AutosquashError> {
    if interrupt.load(Ordering::Relaxed) {
        Err(AutosquashError::Interrupted)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebase::PatchGroup;

    fn plan(groups: Vec<PatchGroup>, head: &str) -> RebasePlan {
        RebasePlan {
            merge_base: "base".to_string(),
            branch_ref: "refs/heads/feature".to_string(),
            head: head.to_string(),
            groups,
        }
    }

    #[test]
    fn single_head_target_is_detected() {
        let single = plan(
            vec![PatchGroup {
                target: "headsha".to_string(),
                patches: Vec::new(),
            }],
            "headsha",
        );
        assert!(single.single_target_is_head());

        let elsewhere = plan(
            vec![PatchGroup {
                target: "othersha".to_string(),
                patches: Vec::new(),
            }],
            "headsha",
        );
        assert!(!elsewhere.single_target_is_head());
    }
}
