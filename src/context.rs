use crate::error::AutosquashError;
use crate::git::repository::{find_repository_in_path, Repository};

/// Per-invocation state: the repository plus the branch scope, computed
/// once and threaded through the pipeline.
pub struct Context {
    pub repo: Repository,
    pub branch: String,
    pub branch_ref: String,
    pub merge_base: String,
    pub head: String,
}

impl Context {
    /// Locate the repository and verify every precondition: on a branch,
    /// a merge base with the integration branch exists, at least one
    /// commit above it, and no rebase/merge/cherry-pick in flight.
    pub fn discover() -> Result<Self, AutosquashError> {
        let repo = find_repository_in_path(".")?;

        if let Some(op) = repo.operation_in_progress() {
            return Err(AutosquashError::Precondition(format!(
                "a {} is already in progress, finish or abort it first",
                op
            )));
        }

        let branch = repo.current_branch()?.ok_or_else(|| {
            AutosquashError::Precondition(
                "not on a branch (detached HEAD)".to_string(),
            )
        })?;

        let merge_base = repo.merge_base_with_mainline(&branch)?.ok_or_else(|| {
            AutosquashError::Precondition(
                "could not find a merge base with main or master".to_string(),
            )
        })?;

        if repo.rev_list_count(&merge_base, "HEAD")? == 0 {
            return Err(AutosquashError::Precondition(
                "no commits on this branch above the merge base".to_string(),
            ));
        }

        let head = repo.head_oid()?;
        let branch_ref = format!("refs/heads/{}", branch);

        Ok(Self {
            repo,
            branch,
            branch_ref,
            merge_base,
            head,
        })
    }
}
