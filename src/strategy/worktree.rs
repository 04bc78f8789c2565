use std::sync::atomic::AtomicBool;

use uuid::Uuid;

use crate::error::AutosquashError;
use crate::git::repository::{find_repository_in_path, Repository};
use crate::logging::{debug_log, warn_log};
use crate::rebase::{ConflictHandler, RebaseOrchestrator, RebasePlan, RebaseResult};
use crate::strategy::backup::BackupState;
use crate::strategy::{check_interrupt, ExecutionOutcome};

/// Isolated-workspace strategy: rewrite history in a scratch worktree
/// detached at the branch tip, then fast-forward the branch ref in the
/// main repository. The main working tree is untouched until the final
/// ref update, which makes rollback trivial.
pub fn execute(
    repo: &Repository,
    plan: &RebasePlan,
    handler: &mut dyn ConflictHandler,
    interrupt: &AtomicBool,
) -> Result<ExecutionOutcome, AutosquashError> {
    let backup = BackupState::snapshot(repo, &plan.branch_ref)?;

    let worktrees_dir = repo.path().join("autosquash-worktrees");
    std::fs::create_dir_all(&worktrees_dir)?;
    let scratch = worktrees_dir.join(Uuid::new_v4().to_string());

    if let Err(e) = repo.worktree_add_detached(&scratch, "HEAD") {
        // Nothing was mutated yet; the backup is not needed.
        backup.discard(repo);
        return Err(e);
    }
    debug_log(&format!("scratch worktree at {}", scratch.display()));

    let result = run_in_worktree(repo, plan, handler, interrupt, &scratch, &backup);

    // The scratch worktree is removed on every exit path.
    if let Err(e) = repo.worktree_remove(&scratch) {
        warn_log(&format!(
            "could not remove scratch worktree {}: {}",
            scratch.display(),
            e
        ));
    }

    match &result {
        Ok(ExecutionOutcome::Applied { .. }) => backup.discard(repo),
        Ok(ExecutionOutcome::Aborted { .. }) => restore_if_moved(repo, &backup)?,
        Err(_) => {
            if let Err(rollback_err) = restore_if_moved(repo, &backup) {
                warn_log(&format!("rollback failed: {}", rollback_err));
            }
            backup.report_retained();
        }
    }

    result
}

fn run_in_worktree(
    repo: &Repository,
    plan: &RebasePlan,
    handler: &mut dyn ConflictHandler,
    interrupt: &AtomicBool,
    scratch: &std::path::Path,
    backup: &BackupState,
) -> Result<ExecutionOutcome, AutosquashError> {
    check_interrupt(interrupt)?;

    let scratch_repo = find_repository_in_path(&scratch.to_string_lossy())?;
    let orchestrator = RebaseOrchestrator::new(&scratch_repo);

    match orchestrator.run(plan, handler)? {
        RebaseResult::Completed { new_head, skipped } => {
            check_interrupt(interrupt)?;

            // Advance the branch only if nobody moved it meanwhile.
            repo.update_ref_cas(
                &plan.branch_ref,
                &new_head,
                &backup.head,
                "git-autosquash: redistribute hunks",
            )?;
            // Sync the main index to the rewritten tip; working files keep
            // the not-yet-applied modifications.
            repo.reset_mixed(&new_head)?;

            Ok(ExecutionOutcome::Applied { new_head, skipped })
        }
        RebaseResult::Aborted => Ok(ExecutionOutcome::Aborted {
            reason: "rebase aborted at conflict".to_string(),
        }),
    }
}

/// Restore the main repository only if the branch ref actually moved;
/// an untouched main tree must stay untouched.
fn restore_if_moved(repo: &Repository, backup: &BackupState) -> Result<(), AutosquashError> {
    let current = repo.head_oid()?;
    if current != backup.head {
        backup.rollback(repo)?;
    }
    Ok(())
}
