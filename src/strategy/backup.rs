use chrono::Local;

use crate::error::AutosquashError;
use crate::git::repository::Repository;
use crate::logging::{debug_log, info_log, warn_log};

/// Pre-mutation snapshot: original HEAD, the branch ref, and a stash
/// commit capturing working tree + index. Consumed by `discard` on
/// success or `rollback` on failure; `rollback` is idempotent.
pub struct BackupState {
    pub head: String,
    pub branch_ref: String,
    pub stash_name: String,
    /// Object hash of the stash commit, `None` when the tree was clean.
    pub stash: Option<String>,
    /// Whether the working tree was reset when the stash was taken
    /// (`stash push`) or left in place (`stash create`).
    pub pushed: bool,
}

impl BackupState {
    /// Record state without touching the working tree (`stash create`).
    pub fn snapshot(repo: &Repository, branch_ref: &str) -> Result<Self, AutosquashError> {
        let head = repo.head_oid()?;
        let stash_name = backup_name();
        let stash = repo.stash_create(&stash_name)?;
        debug_log(&format!(
            "backup snapshot: HEAD={} stash={:?}",
            &head[..12.min(head.len())],
            stash
        ));
        Ok(Self {
            head,
            branch_ref: branch_ref.to_string(),
            stash_name,
            stash,
            pushed: false,
        })
    }

    /// Record state and clean the tree (`stash push --include-untracked`).
    pub fn push(repo: &Repository, branch_ref: &str) -> Result<Self, AutosquashError> {
        let head = repo.head_oid()?;
        let stash_name = backup_name();
        repo.stash_push_all(&stash_name)?;
        let stash = repo.find_stash_by_message(&stash_name)?;
        debug_log(&format!(
            "backup push: HEAD={} stash={:?}",
            &head[..12.min(head.len())],
            stash
        ));
        Ok(Self {
            head,
            branch_ref: branch_ref.to_string(),
            stash_name,
            stash,
            pushed: true,
        })
    }

    /// Restore HEAD, index, and working tree to the recorded state. Safe
    /// to call more than once and safe when nothing was mutated.
    pub fn rollback(&self, repo: &Repository) -> Result<(), AutosquashError> {
        info_log(&format!(
            "rolling back to {}",
            &self.head[..12.min(self.head.len())]
        ));
        repo.reset_hard(&self.head)?;
        if let Some(stash) = &self.stash {
            if let Err(e) = repo.stash_apply(stash) {
                warn_log(&format!(
                    "could not reapply stash {}: {} (recover manually with `git stash apply {}`)",
                    self.stash_name, e, self.stash_name
                ));
            }
        }
        Ok(())
    }

    /// Drop the backup stash after a successful run.
    pub fn discard(&self, repo: &Repository) {
        if self.stash.is_none() {
            return;
        }
        match repo.find_stash_by_message(&self.stash_name) {
            Ok(Some(stash_ref)) => {
                if let Err(e) = repo.stash_drop(&stash_ref) {
                    warn_log(&format!("could not drop backup stash: {}", e));
                }
            }
            _ => debug_log("backup stash already gone"),
        }
    }

    /// Tell the user the stash that survives a failed run.
    pub fn report_retained(&self) {
        if self.stash.is_some() {
            eprintln!(
                "backup stash retained for recovery: {}",
                self.stash_name
            );
        }
    }
}

fn backup_name() -> String {
    format!(
        "autosquash-backup-{}",
        Local::now().format("%Y%m%d-%H%M%S")
    )
}
