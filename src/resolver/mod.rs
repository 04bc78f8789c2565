pub mod blame;
pub mod fallback;

use crate::error::AutosquashError;
use crate::git::batch::BatchGitOps;
use crate::git::repository::Repository;
use crate::hunks::{DiffHunk, HunkKind};
use crate::logging::debug_log;

use blame::{blame_consensus, filter_to_scope, BlameAnalysisEngine};
use fallback::{fallback_candidates, FallbackKind, FileConsistencyTracker};

/// How a mapping's target was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    BlameMatch,
    ContextualBlameMatch,
    FallbackNewFile,
    FallbackFileHistory,
    FallbackConsistency,
    UserOverride,
    Ignore,
}

impl TargetSource {
    pub fn is_blame(&self) -> bool {
        matches!(
            self,
            TargetSource::BlameMatch | TargetSource::ContextualBlameMatch
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSource::BlameMatch => "blame_match",
            TargetSource::ContextualBlameMatch => "contextual_blame_match",
            TargetSource::FallbackNewFile => "fallback_new_file",
            TargetSource::FallbackFileHistory => "fallback_file_history",
            TargetSource::FallbackConsistency => "fallback_consistency",
            TargetSource::UserOverride => "user_override",
            TargetSource::Ignore => "ignore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// A hunk bound (or proposed to bind) to a target commit.
#[derive(Debug, Clone)]
pub struct HunkTargetMapping<'h> {
    pub hunk: &'h DiffHunk,
    pub target_commit: Option<String>,
    pub source: TargetSource,
    pub confidence: Confidence,
    pub needs_user_confirmation: bool,
    /// Prioritized alternatives shown when confirmation is needed.
    pub fallback_candidates: Vec<String>,
}

/// Resolves each hunk to its target commit: blame evidence first, then
/// the fallback providers, with per-file consistency reuse.
pub struct HunkTargetResolver<'r> {
    batch: BatchGitOps<'r>,
    blame: BlameAnalysisEngine<'r>,
    consistency: FileConsistencyTracker,
}

impl<'r> HunkTargetResolver<'r> {
    pub fn new(repo: &'r Repository, merge_base: String) -> Self {
        Self {
            batch: BatchGitOps::new(repo, merge_base),
            blame: BlameAnalysisEngine::new(repo),
            consistency: FileConsistencyTracker::new(),
        }
    }

    pub fn batch_mut(&mut self) -> &mut BatchGitOps<'r> {
        &mut self.batch
    }

    /// Resolve targets for all hunks, in file-then-line order.
    pub fn resolve_targets<'h>(
        &mut self,
        hunks: &'h [DiffHunk],
    ) -> Result<Vec<HunkTargetMapping<'h>>, AutosquashError> {
        let mut order: Vec<&'h DiffHunk> = hunks.iter().collect();
        order.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.old_start.cmp(&b.old_start))
        });

        // One blame invocation per file, covering all of its hunks.
        let mut idx = 0;
        while idx < order.len() {
            let mut end = idx;
            while end < order.len() && order[end].file_path == order[idx].file_path {
                end += 1;
            }
            let file_hunks = order[idx..end].to_vec();
            self.blame
                .preload_file(&order[idx].file_path, &file_hunks)?;
            idx = end;
        }

        let mut mappings = Vec::with_capacity(order.len());
        for hunk in order {
            mappings.push(self.resolve_single(hunk)?);
        }
        Ok(mappings)
    }

    fn resolve_single<'h>(
        &mut self,
        hunk: &'h DiffHunk,
    ) -> Result<HunkTargetMapping<'h>, AutosquashError> {
        // New files have no line provenance at all.
        if hunk.kind == HunkKind::NewFile || self.batch.is_new_file(&hunk.file_path)? {
            let candidates =
                fallback_candidates(&mut self.batch, &hunk.file_path, FallbackKind::NewFile)?;
            return Ok(HunkTargetMapping {
                hunk,
                target_commit: candidates.first().cloned(),
                source: TargetSource::FallbackNewFile,
                confidence: Confidence::Low,
                needs_user_confirmation: true,
                fallback_candidates: candidates,
            });
        }

        // An earlier hunk of this file already has a target: offer it.
        if let Some((target, reuse)) = self.consistency.consistent_target(&hunk.file_path) {
            let confidence = if reuse == 0 {
                Confidence::Medium
            } else {
                Confidence::Low
            };
            return Ok(HunkTargetMapping {
                hunk,
                target_commit: Some(target),
                source: TargetSource::FallbackConsistency,
                confidence,
                needs_user_confirmation: true,
                fallback_candidates: Vec::new(),
            });
        }

        let scope = self.batch.branch_commit_set()?;
        let primary = self.blame.blame_for_hunk(hunk)?;
        let mut relevant = filter_to_scope(&primary, &scope);
        let mut source = TargetSource::BlameMatch;

        if relevant.is_empty() {
            let contextual = self.blame.contextual_blame(hunk)?;
            relevant = filter_to_scope(&contextual, &scope);
            if !relevant.is_empty() {
                source = TargetSource::ContextualBlameMatch;
            }
        }

        if relevant.is_empty() {
            debug_log(&format!(
                "no in-scope blame for {}:{}, offering file history",
                hunk.file_path, hunk.old_start
            ));
            let candidates = fallback_candidates(
                &mut self.batch,
                &hunk.file_path,
                FallbackKind::ExistingFile,
            )?;
            return Ok(HunkTargetMapping {
                hunk,
                target_commit: candidates.first().cloned(),
                source: TargetSource::FallbackFileHistory,
                confidence: Confidence::Low,
                needs_user_confirmation: true,
                fallback_candidates: candidates,
            });
        }

        let Some((target, confidence)) = blame_consensus(&relevant, &mut self.batch) else {
            return Err(AutosquashError::Generic(format!(
                "blame consensus failed for {}",
                hunk.file_path
            )));
        };

        self.consistency.set_target(&hunk.file_path, &target);

        let needs_user_confirmation =
            !source.is_blame() || confidence != Confidence::High;
        Ok(HunkTargetMapping {
            hunk,
            target_commit: Some(target),
            source,
            confidence,
            needs_user_confirmation,
            fallback_candidates: Vec::new(),
        })
    }

    /// Record a user-confirmed target so later hunks of the same file
    /// default to it.
    pub fn confirm_target(&mut self, file_path: &str, target: &str) {
        self.consistency.set_target(file_path, target);
    }

    pub fn clear_caches(&mut self) {
        self.consistency.clear();
    }
}
