use std::collections::{HashMap, HashSet};

use crate::error::AutosquashError;
use crate::git::batch::BatchGitOps;
use crate::git::repository::Repository;
use crate::hunks::DiffHunk;
use crate::resolver::Confidence;

/// Context window, in lines, blamed around a pure addition.
const ADDITION_CONTEXT: usize = 3;
/// Extra margin for the last-resort contextual retry.
const RETRY_CONTEXT: usize = 1;

/// Blame evidence for hunk pre-image ranges, loaded one file at a time:
/// a single `git blame` invocation covers every hunk of a file via
/// repeated `-L` ranges.
pub struct BlameAnalysisEngine<'r> {
    repo: &'r Repository,
    head_line_counts: HashMap<String, usize>,
    /// Per file: blamed line number -> commit hash at HEAD.
    file_blame: HashMap<String, HashMap<usize, String>>,
}

impl<'r> BlameAnalysisEngine<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        Self {
            repo,
            head_line_counts: HashMap::new(),
            file_blame: HashMap::new(),
        }
    }

    /// Blame every hunk's window (plus the retry margin) in one
    /// subprocess invocation for this file.
    pub fn preload_file(
        &mut self,
        path: &str,
        hunks: &[&DiffHunk],
    ) -> Result<(), AutosquashError> {
        if self.file_blame.contains_key(path) {
            return Ok(());
        }

        let total = self.head_line_count(path)?;
        if total == 0 {
            self.file_blame.insert(path.to_string(), HashMap::new());
            return Ok(());
        }

        let mut ranges = Vec::new();
        for hunk in hunks {
            let (start, end) = primary_window(hunk);
            let start = start.saturating_sub(RETRY_CONTEXT).max(1);
            let end = (end + RETRY_CONTEXT).min(total);
            if start <= end {
                ranges.push((start, end - start + 1));
            }
        }

        let evidence = self.repo.blame_ranges(path, &ranges, "HEAD")?;
        self.file_blame
            .insert(path.to_string(), evidence.into_iter().collect());
        Ok(())
    }

    /// Primary blame evidence for a hunk: the deleted lines for
    /// modifications, or the surrounding context for pure additions.
    /// Returns one commit hash per blamed line.
    pub fn blame_for_hunk(&mut self, hunk: &DiffHunk) -> Result<Vec<String>, AutosquashError> {
        self.preload_file(&hunk.file_path, &[hunk])?;
        let total = self.head_line_count(&hunk.file_path)?;
        let (start, end) = primary_window(hunk);
        Ok(self.lines_in(&hunk.file_path, start, end.min(total)))
    }

    /// Widen by one line on each side, used when the primary evidence
    /// has no in-scope commit.
    pub fn contextual_blame(&mut self, hunk: &DiffHunk) -> Result<Vec<String>, AutosquashError> {
        let total = self.head_line_count(&hunk.file_path)?;
        let (start, end) = primary_window(hunk);
        let start = start.saturating_sub(RETRY_CONTEXT).max(1);
        Ok(self.lines_in(&hunk.file_path, start, (end + RETRY_CONTEXT).min(total)))
    }

    fn lines_in(&self, path: &str, start: usize, end: usize) -> Vec<String> {
        let Some(blamed) = self.file_blame.get(path) else {
            return Vec::new();
        };
        (start..=end)
            .filter_map(|line| blamed.get(&line).cloned())
            .collect()
    }

    fn head_line_count(&mut self, path: &str) -> Result<usize, AutosquashError> {
        if let Some(&count) = self.head_line_counts.get(path) {
            return Ok(count);
        }
        let count = match self.repo.show_file("HEAD", path)? {
            Some(bytes) => bytes.split(|&b| b == b'\n').filter(|l| !l.is_empty()).count(),
            None => 0,
        };
        self.head_line_counts.insert(path.to_string(), count);
        Ok(count)
    }
}

/// The 1-based inclusive line window at HEAD a hunk's evidence comes
/// from: its old range for modifications, a context window around the
/// insertion point for pure additions.
fn primary_window(hunk: &DiffHunk) -> (usize, usize) {
    if hunk.has_deletions() && hunk.old_count > 0 {
        (hunk.old_start, hunk.old_start + hunk.old_count - 1)
    } else {
        (
            hunk.old_start.saturating_sub(ADDITION_CONTEXT).max(1),
            hunk.old_start + ADDITION_CONTEXT,
        )
    }
}

/// Keep only evidence from commits inside the branch scope.
pub fn filter_to_scope(evidence: &[String], scope: &HashSet<String>) -> Vec<String> {
    evidence
        .iter()
        .filter(|hash| scope.contains(*hash))
        .cloned()
        .collect()
}

/// Pick the winning commit from in-scope blame evidence.
///
/// Highest line count wins; ties break toward the most recent author
/// time. Unanimous evidence is High confidence, a strict majority is
/// Medium, anything weaker is Low.
pub fn blame_consensus(
    evidence: &[String],
    batch: &mut BatchGitOps<'_>,
) -> Option<(String, Confidence)> {
    if evidence.is_empty() {
        return None;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for hash in evidence {
        *counts.entry(hash.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(usize, i64, String)> = None;
    for (hash, count) in counts {
        let key = (count, batch.timestamp(hash), hash.to_string());
        if best.as_ref().map_or(true, |b| key > *b) {
            best = Some(key);
        }
    }
    let (max_count, _, winner) = best?;

    let total = evidence.len();
    let confidence = if max_count == total {
        Confidence::High
    } else if max_count * 2 > total {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    Some((winner, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunks::HunkKind;

    fn hunk(old_start: usize, old_count: usize, lines: Vec<&str>) -> DiffHunk {
        DiffHunk {
            kind: HunkKind::Text,
            file_path: "f.c".to_string(),
            old_start,
            old_count,
            new_start: old_start,
            new_count: old_count,
            lines: lines.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn primary_window_covers_old_range_for_modifications() {
        let h = hunk(10, 7, vec!["@@ -10,7 +10,7 @@", " a", "-b", "+B", " c"]);
        assert_eq!(primary_window(&h), (10, 16));
    }

    #[test]
    fn primary_window_surrounds_pure_additions() {
        let h = hunk(5, 0, vec!["@@ -5,0 +6,1 @@", "+new line"]);
        assert_eq!(primary_window(&h), (2, 8));

        let near_top = hunk(1, 0, vec!["@@ -1,0 +2,1 @@", "+new line"]);
        assert_eq!(primary_window(&near_top), (1, 4));
    }

    #[test]
    fn filter_drops_out_of_scope_commits() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let scope: HashSet<String> = [a.clone()].into_iter().collect();
        let filtered = filter_to_scope(&[a.clone(), b, a.clone()], &scope);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|h| *h == a));
    }

    fn confidence_for(counts: &[(&str, usize)]) -> Confidence {
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        let max = counts.iter().map(|(_, c)| *c).max().unwrap();
        if max == total {
            Confidence::High
        } else if max * 2 > total {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    #[test]
    fn confidence_thresholds() {
        assert_eq!(confidence_for(&[("x", 4)]), Confidence::High);
        assert_eq!(confidence_for(&[("x", 3), ("y", 1)]), Confidence::Medium);
        assert_eq!(confidence_for(&[("x", 2), ("y", 2)]), Confidence::Low);
        assert_eq!(
            confidence_for(&[("x", 2), ("y", 1), ("z", 1)]),
            Confidence::Low
        );
    }
}
