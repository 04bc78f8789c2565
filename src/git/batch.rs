use std::collections::{HashMap, HashSet};

use crate::cache::CommitInfoCache;
use crate::config::Config;
use crate::error::AutosquashError;
use crate::git::repository::{exec_git, Repository};

/// Batch-loaded commit metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    pub subject: String,
    pub author: String,
    pub timestamp: i64,
    pub is_merge: bool,
    pub parent_count: usize,
}

/// Batched git lookups: one subprocess per *kind* of question instead of
/// one per commit, with a bounded LRU in front of the metadata loads.
pub struct BatchGitOps<'r> {
    repo: &'r Repository,
    merge_base: String,
    commit_cache: CommitInfoCache,
    branch_commits: Option<Vec<String>>,
    file_commits: HashMap<String, Vec<String>>,
    new_file_checks: HashMap<String, bool>,
}

impl<'r> BatchGitOps<'r> {
    pub fn new(repo: &'r Repository, merge_base: String) -> Self {
        Self {
            repo,
            merge_base,
            commit_cache: CommitInfoCache::new(Config::get().commit_cache_size()),
            branch_commits: None,
            file_commits: HashMap::new(),
            new_file_checks: HashMap::new(),
        }
    }

    pub fn merge_base(&self) -> &str {
        &self.merge_base
    }

    /// All commits in `merge_base..HEAD`, newest first. Loaded once.
    pub fn branch_commits(&mut self) -> Result<&[String], AutosquashError> {
        if self.branch_commits.is_none() {
            let commits = self.repo.rev_list(&self.merge_base, "HEAD")?;
            self.branch_commits = Some(commits);
        }
        Ok(self.branch_commits.as_deref().unwrap())
    }

    pub fn branch_commit_set(&mut self) -> Result<HashSet<String>, AutosquashError> {
        Ok(self.branch_commits()?.iter().cloned().collect())
    }

    /// Metadata for N commits in a single `git show` invocation, LRU-cached.
    pub fn load_commit_info(
        &mut self,
        hashes: &[String],
    ) -> Result<HashMap<String, CommitInfo>, AutosquashError> {
        let (cached, missing) = self.commit_cache.partition(hashes);
        let mut result: HashMap<String, CommitInfo> =
            cached.into_iter().map(|info| (info.hash.clone(), info)).collect();

        if !missing.is_empty() {
            let mut args = self.repo.global_args_for_exec();
            args.push("show".to_string());
            args.push("-s".to_string());
            args.push("--no-notes".to_string());
            // Subject last so embedded separators cannot shift fields.
            args.push("--format=%H|%h|%ct|%P|%an|%s".to_string());
            for hash in &missing {
                args.push((*hash).clone());
            }

            let output = exec_git(&args)?;
            let stdout = String::from_utf8(output.stdout)?;

            for line in stdout.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let mut fields = line.splitn(6, '|');
                let (Some(hash), Some(short), Some(ts), Some(parents), Some(author), Some(subject)) = (
                    fields.next(),
                    fields.next(),
                    fields.next(),
                    fields.next(),
                    fields.next(),
                    fields.next(),
                ) else {
                    continue;
                };

                let parent_count = parents.split_whitespace().count();
                let info = CommitInfo {
                    hash: hash.to_string(),
                    short_hash: short.to_string(),
                    subject: subject.to_string(),
                    author: author.to_string(),
                    timestamp: ts.trim().parse().unwrap_or(0),
                    is_merge: parent_count > 1,
                    parent_count,
                };
                self.commit_cache.put(info.clone());
                result.insert(info.hash.clone(), info);
            }
        }

        Ok(result)
    }

    /// `hash + subject` one-liner for reports and prompts.
    pub fn commit_display(&mut self, hash: &str) -> String {
        match self.load_commit_info(&[hash.to_string()]) {
            Ok(infos) => match infos.get(hash) {
                Some(info) => {
                    let merge_marker = if info.is_merge { " (merge)" } else { "" };
                    format!("{} {}{}", info.short_hash, info.subject, merge_marker)
                }
                None => hash[..8.min(hash.len())].to_string(),
            },
            Err(_) => hash[..8.min(hash.len())].to_string(),
        }
    }

    /// In-scope commits that touched `path`, newest first. One `git log`
    /// per file, memoized.
    pub fn commits_touching_file(&mut self, path: &str) -> Result<Vec<String>, AutosquashError> {
        if let Some(cached) = self.file_commits.get(path) {
            return Ok(cached.clone());
        }
        let range = format!("{}..HEAD", self.merge_base);
        let stdout = self
            .repo
            .git(&["log", "--format=%H", &range, "--", path])?;
        let commits: Vec<String> = stdout
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self.file_commits.insert(path.to_string(), commits.clone());
        Ok(commits)
    }

    /// Whether `path` is absent from the merge-base tree (new on branch or
    /// not yet committed at all).
    pub fn is_new_file(&mut self, path: &str) -> Result<bool, AutosquashError> {
        if let Some(&cached) = self.new_file_checks.get(path) {
            return Ok(cached);
        }
        let spec = format!("{}:{}", self.merge_base, path);
        let output = self.repo.git_unchecked(&["cat-file", "-e", &spec])?;
        let is_new = !output.status.success();
        self.new_file_checks.insert(path.to_string(), is_new);
        Ok(is_new)
    }

    /// Order commits by recency, merge commits pushed to the back.
    pub fn ordered_by_recency(
        &mut self,
        hashes: &[String],
    ) -> Result<Vec<CommitInfo>, AutosquashError> {
        let infos = self.load_commit_info(hashes)?;
        let mut ordered: Vec<CommitInfo> = hashes
            .iter()
            .filter_map(|h| infos.get(h).cloned())
            .collect();
        ordered.sort_by_key(|info| (info.is_merge, std::cmp::Reverse(info.timestamp)));
        Ok(ordered)
    }

    /// Split commits into (touched `path`, did not), each recency-ordered.
    pub fn file_relevance_split(
        &mut self,
        hashes: &[String],
        path: &str,
    ) -> Result<(Vec<CommitInfo>, Vec<CommitInfo>), AutosquashError> {
        let touching: HashSet<String> =
            self.commits_touching_file(path)?.into_iter().collect();
        let ordered = self.ordered_by_recency(hashes)?;
        Ok(ordered
            .into_iter()
            .partition(|info| touching.contains(&info.hash)))
    }

    pub fn timestamp(&mut self, hash: &str) -> i64 {
        self.load_commit_info(&[hash.to_string()])
            .ok()
            .and_then(|infos| infos.get(hash).map(|i| i.timestamp))
            .unwrap_or(0)
    }
}
