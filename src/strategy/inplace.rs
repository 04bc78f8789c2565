use std::sync::atomic::AtomicBool;

use crate::error::AutosquashError;
use crate::git::repository::Repository;
use crate::logging::debug_log;
use crate::rebase::RebasePlan;
use crate::strategy::backup::BackupState;
use crate::strategy::{check_interrupt, ExecutionOutcome};

/// Direct strategy for the trivial case: every approved hunk targets the
/// branch tip, so stash → apply → amend → unstash does the job without
/// any rebase.
pub fn execute(
    repo: &Repository,
    plan: &RebasePlan,
    interrupt: &AtomicBool,
) -> Result<ExecutionOutcome, AutosquashError> {
    check_interrupt(interrupt)?;

    let Some(patch) = plan.combined_patch_for(&plan.head) else {
        return Err(AutosquashError::Generic(
            "in-place strategy selected without a HEAD-targeted patch".to_string(),
        ));
    };

    let backup = BackupState::push(repo, &plan.branch_ref)?;

    let result = (|| {
        check_interrupt(interrupt)?;
        repo.apply_patch_to_index(&patch)?;
        amend_with_hook_retry(repo)?;
        repo.head_oid()
    })();

    match result {
        Ok(new_head) => {
            if let Some(stash_ref) = repo.find_stash_by_message(&backup.stash_name)? {
                if let Err(e) = repo.stash_pop(&stash_ref) {
                    crate::logging::warn_log(&format!(
                        "HEAD was amended but the stash did not reapply cleanly: {}",
                        e
                    ));
                    backup.report_retained();
                }
            }
            Ok(ExecutionOutcome::Applied {
                new_head,
                skipped: Vec::new(),
            })
        }
        Err(e) => {
            backup.rollback(repo)?;
            backup.report_retained();
            Err(e)
        }
    }
}

/// Amend HEAD, accommodating pre-commit hooks that modify files: on the
/// telltale failure, re-stage everything and retry exactly once.
fn amend_with_hook_retry(repo: &Repository) -> Result<(), AutosquashError> {
    let output = repo.git_unchecked(&["commit", "--amend", "--no-edit"])?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let hook_modified = stderr.to_lowercase().contains("hook")
        || stdout.to_lowercase().contains("files were modified");

    if !hook_modified {
        return Err(AutosquashError::GitCliError {
            code: output.status.code(),
            stderr,
            args: vec!["commit".into(), "--amend".into(), "--no-edit".into()],
        });
    }

    debug_log("pre-commit hook modified files, re-staging and retrying amend");
    repo.git(&["add", "-A"])?;
    let retry = repo.git_unchecked(&["commit", "--amend", "--no-edit"])?;
    if retry.status.success() {
        Ok(())
    } else {
        Err(AutosquashError::HookFailure(
            String::from_utf8_lossy(&retry.stderr).to_string(),
        ))
    }
}
