use std::collections::HashMap;

use crate::error::AutosquashError;
use crate::git::repository::Repository;
use crate::logging::{debug_log, info_log};
use crate::patch::GeneratedPatch;

/// Everything the strategies need to rewrite history: the branch scope
/// and the generated patches grouped by target commit.
pub struct RebasePlan {
    pub merge_base: String,
    /// Fully-qualified ref of the branch being rewritten.
    pub branch_ref: String,
    /// Original branch tip at plan time.
    pub head: String,
    pub groups: Vec<PatchGroup>,
}

pub struct PatchGroup {
    pub target: String,
    pub patches: Vec<GeneratedPatch>,
}

impl RebasePlan {
    /// The one case where an amend suffices: every patch targets the tip.
    pub fn single_target_is_head(&self) -> bool {
        self.groups.len() == 1 && self.groups[0].target == self.head
    }

    pub fn combined_patch_for(&self, target: &str) -> Option<String> {
        self.groups
            .iter()
            .find(|g| g.target == target)
            .map(|g| g.patches.iter().map(|p| p.diff_text.as_str()).collect())
    }
}

/// How the user wants to proceed at a rebase conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    /// Conflicts were resolved by hand; continue the rebase.
    Continue,
    /// Roll everything back.
    Abort,
    /// Drop the offending fixup and keep going.
    Skip,
}

/// Collaborator consulted when the rebase stops on a conflict.
pub trait ConflictHandler {
    fn on_conflict(&mut self, commit: &str, files: &[String]) -> ConflictChoice;
}

/// Non-interactive policy: always abort, never leave a paused rebase.
pub struct AbortOnConflict;

impl ConflictHandler for AbortOnConflict {
    fn on_conflict(&mut self, _commit: &str, _files: &[String]) -> ConflictChoice {
        ConflictChoice::Abort
    }
}

pub enum RebaseResult {
    Completed {
        new_head: String,
        /// Targets whose fixup was skipped at a conflict.
        skipped: Vec<String>,
    },
    Aborted,
}

/// Builds one fixup commit per target and drives a single interactive
/// rebase whose todo interleaves the originals with their fixups.
pub struct RebaseOrchestrator<'r> {
    repo: &'r Repository,
}

impl<'r> RebaseOrchestrator<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self { repo }
    }

    pub fn run(
        &self,
        plan: &RebasePlan,
        handler: &mut dyn ConflictHandler,
    ) -> Result<RebaseResult, AutosquashError> {
        if plan.groups.is_empty() {
            let new_head = self.repo.head_oid()?;
            return Ok(RebaseResult::Completed {
                new_head,
                skipped: Vec::new(),
            });
        }

        let fixups = self.build_fixup_commits(plan)?;
        let todo = self.build_todo(plan, &fixups)?;
        debug_log(&format!("rebase todo:\n{}", todo));

        let mut skipped = Vec::new();
        let mut output = self.repo.rebase_with_todo(&plan.merge_base, &todo)?;

        while !output.status.success() {
            if self.repo.operation_in_progress() != Some("rebase") {
                // The rebase never started or died outright.
                return Err(AutosquashError::GitCliError {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    args: vec!["rebase".into(), "-i".into(), plan.merge_base.clone()],
                });
            }

            let files = self.repo.conflicted_files()?;
            let stopped = self.stopped_commit().unwrap_or_else(|| "(unknown)".to_string());
            info_log(&format!(
                "rebase stopped at {} with conflicts in {}",
                stopped,
                files.join(", ")
            ));

            match handler.on_conflict(&stopped, &files) {
                ConflictChoice::Continue => {
                    output = self.repo.rebase_continue()?;
                }
                ConflictChoice::Skip => {
                    // stopped-sha may be abbreviated depending on git version.
                    let target = fixups
                        .iter()
                        .find(|(fixup, _)| {
                            fixup.starts_with(&stopped) || stopped.starts_with(fixup.as_str())
                        })
                        .map(|(_, target)| target.clone());
                    skipped.push(target.unwrap_or_else(|| stopped.clone()));
                    output = self.repo.rebase_skip()?;
                }
                ConflictChoice::Abort => {
                    self.repo.rebase_abort()?;
                    return Ok(RebaseResult::Aborted);
                }
            }
        }

        let new_head = self.repo.head_oid()?;
        Ok(RebaseResult::Completed { new_head, skipped })
    }

    /// For each target, build `fixup!` commit whose tree is the target's
    /// tree plus the generated patch, parented on the target. The diff a
    /// later `fixup` todo line applies is then exactly the patch.
    fn build_fixup_commits(
        &self,
        plan: &RebasePlan,
    ) -> Result<HashMap<String, String>, AutosquashError> {
        // fixup commit hash -> target hash
        let mut fixups = HashMap::new();
        for group in &plan.groups {
            let combined: String = group
                .patches
                .iter()
                .map(|p| p.diff_text.as_str())
                .collect();
            let tree = self.repo.build_tree_with_patch(&group.target, &combined)?;
            let subject = self.repo.commit_subject(&group.target)?;
            let message = format!("fixup! {}", subject);
            let fixup = self.repo.commit_tree(&tree, &group.target, &message)?;
            debug_log(&format!(
                "fixup {} -> target {} ({})",
                &fixup[..12.min(fixup.len())],
                &group.target[..12.min(group.target.len())],
                subject
            ));
            fixups.insert(fixup, group.target.clone());
        }
        Ok(fixups)
    }

    /// `pick` every commit in `merge_base..HEAD` oldest first, each
    /// target immediately followed by its `fixup` entry.
    fn build_todo(
        &self,
        plan: &RebasePlan,
        fixups: &HashMap<String, String>,
    ) -> Result<String, AutosquashError> {
        let mut commits = self.repo.rev_list(&plan.merge_base, "HEAD")?;
        commits.reverse();

        // target hash -> fixup hash
        let by_target: HashMap<&String, &String> =
            fixups.iter().map(|(fixup, target)| (target, fixup)).collect();

        let mut todo = String::new();
        for commit in &commits {
            todo.push_str(&format!("pick {}\n", commit));
            if let Some(fixup) = by_target.get(commit) {
                todo.push_str(&format!("fixup {}\n", fixup));
            }
        }
        Ok(todo)
    }

    fn stopped_commit(&self) -> Option<String> {
        let stopped = self.repo.path().join("rebase-merge").join("stopped-sha");
        std::fs::read_to_string(stopped)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
