use std::sync::atomic::AtomicBool;

use crate::error::AutosquashError;
use crate::git::repository::Repository;
use crate::logging::warn_log;
use crate::rebase::{ConflictHandler, RebaseOrchestrator, RebasePlan, RebaseResult};
use crate::strategy::backup::BackupState;
use crate::strategy::{check_interrupt, ExecutionOutcome};

/// In-place strategy for repositories without worktree support: stash
/// the full working tree, rewrite history in the main checkout, then
/// pop the stash so the not-yet-applied modifications come back.
pub fn execute(
    repo: &Repository,
    plan: &RebasePlan,
    handler: &mut dyn ConflictHandler,
    interrupt: &AtomicBool,
) -> Result<ExecutionOutcome, AutosquashError> {
    check_interrupt(interrupt)?;

    let backup = BackupState::push(repo, &plan.branch_ref)?;

    let result = (|| {
        check_interrupt(interrupt)?;
        let orchestrator = RebaseOrchestrator::new(repo);
        orchestrator.run(plan, handler)
    })();

    match result {
        Ok(RebaseResult::Completed { new_head, skipped }) => {
            // History now contains the applied hunks; popping the stash
            // brings back the rest of the working-tree modifications.
            if let Some(stash_ref) = repo.find_stash_by_message(&backup.stash_name)? {
                if let Err(e) = repo.stash_pop(&stash_ref) {
                    warn_log(&format!(
                        "history was rewritten but the stash did not reapply cleanly: {}",
                        e
                    ));
                    backup.report_retained();
                }
            }
            Ok(ExecutionOutcome::Applied { new_head, skipped })
        }
        Ok(RebaseResult::Aborted) => {
            backup.rollback(repo)?;
            Ok(ExecutionOutcome::Aborted {
                reason: "rebase aborted at conflict".to_string(),
            })
        }
        Err(e) => {
            repo.rebase_abort()?;
            backup.rollback(repo)?;
            backup.report_retained();
            Err(e)
        }
    }
}
