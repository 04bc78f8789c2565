use std::collections::HashMap;

use crate::config::Config;
use crate::error::AutosquashError;
use crate::git::batch::BatchGitOps;

/// Which fallback path produced a candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackKind {
    /// File has no history at the merge base.
    NewFile,
    /// File exists but blame produced no in-scope evidence.
    ExistingFile,
}

/// Prioritized candidate commits for a hunk blame could not place.
///
/// New files get the branch commits by recency (merges last); existing
/// files get the commits that touched the file first, then the rest.
pub fn fallback_candidates(
    batch: &mut BatchGitOps<'_>,
    file_path: &str,
    kind: FallbackKind,
) -> Result<Vec<String>, AutosquashError> {
    let branch: Vec<String> = batch.branch_commits()?.to_vec();
    let limit = Config::get().fallback_suggestion_limit();

    let ordered = match kind {
        FallbackKind::NewFile => batch.ordered_by_recency(&branch)?,
        FallbackKind::ExistingFile => {
            let (relevant, others) = batch.file_relevance_split(&branch, file_path)?;
            relevant.into_iter().chain(others).collect()
        }
    };

    Ok(ordered
        .into_iter()
        .map(|info| info.hash)
        .take(limit)
        .collect())
}

/// Remembers the confirmed target per file so later hunks of the same
/// file default to it.
#[derive(Default)]
pub struct FileConsistencyTracker {
    targets: HashMap<String, String>,
    reuses: HashMap<String, u32>,
}

impl FileConsistencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously assigned target plus how many times it has already
    /// been reused for this file.
    pub fn consistent_target(&mut self, file_path: &str) -> Option<(String, u32)> {
        let target = self.targets.get(file_path)?.clone();
        let reuse = self.reuses.entry(file_path.to_string()).or_insert(0);
        let seen = *reuse;
        *reuse += 1;
        Some((target, seen))
    }

    pub fn set_target(&mut self, file_path: &str, target: &str) {
        self.targets.insert(file_path.to_string(), target.to_string());
        self.reuses.insert(file_path.to_string(), 0);
    }

    pub fn clear(&mut self) {
        self.targets.clear();
        self.reuses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_tracks_reuse_counts() {
        let mut tracker = FileConsistencyTracker::new();
        assert!(tracker.consistent_target("a.c").is_none());

        tracker.set_target("a.c", "abc123");
        assert_eq!(
            tracker.consistent_target("a.c"),
            Some(("abc123".to_string(), 0))
        );
        assert_eq!(
            tracker.consistent_target("a.c"),
            Some(("abc123".to_string(), 1))
        );
        assert!(tracker.consistent_target("b.c").is_none());

        tracker.clear();
        assert!(tracker.consistent_target("a.c").is_none());
    }
}
