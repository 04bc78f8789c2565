use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use regex::Regex;

use crate::config::Config;
use crate::error::AutosquashError;
use crate::logging::debug_log;

/// Typed access to one git repository, backed by the git CLI.
///
/// Every operation spawns the configured git binary with `-C <workdir>`
/// global arguments, so the process working directory never matters.
#[derive(Debug, Clone)]
pub struct Repository {
    global_args: Vec<String>,
    git_dir: PathBuf,
    workdir: PathBuf,
    /// Canonical (absolute, resolved) workdir for reliable path comparisons.
    canonical_workdir: PathBuf,
}

/// Execute a git command; non-zero exit becomes `GitCliError`.
pub fn exec_git(args: &[String]) -> Result<Output, AutosquashError> {
    let output = exec_git_unchecked(args)?;

    if !output.status.success() {
        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(AutosquashError::GitCliError {
            code,
            stderr,
            args: args.to_vec(),
        });
    }

    Ok(output)
}

/// Execute a git command and hand back the raw output regardless of exit
/// status. Callers that treat non-zero as data use this.
pub fn exec_git_unchecked(args: &[String]) -> Result<Output, AutosquashError> {
    let mut cmd = Command::new(Config::get().git_cmd());
    cmd.args(args);
    cmd.output().map_err(AutosquashError::IoError)
}

/// Execute a git command with data provided on stdin.
pub fn exec_git_stdin(args: &[String], stdin_data: &[u8]) -> Result<Output, AutosquashError> {
    exec_git_stdin_with_env(args, &[], stdin_data)
}

/// Execute a git command with stdin data and extra environment variables.
pub fn exec_git_stdin_with_env(
    args: &[String],
    env: &[(String, String)],
    stdin_data: &[u8],
) -> Result<Output, AutosquashError> {
    let output = exec_git_stdin_with_env_unchecked(args, env, stdin_data)?;

    if !output.status.success() {
        let code = output.status.code();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(AutosquashError::GitCliError {
            code,
            stderr,
            args: args.to_vec(),
        });
    }

    Ok(output)
}

pub fn exec_git_stdin_with_env_unchecked(
    args: &[String],
    env: &[(String, String)],
    stdin_data: &[u8],
) -> Result<Output, AutosquashError> {
    let mut cmd = Command::new(Config::get().git_cmd());
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (k, v) in env.iter() {
        cmd.env(k, v);
    }

    let mut child = cmd.spawn().map_err(AutosquashError::IoError)?;

    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write;
        if let Err(e) = stdin.write_all(stdin_data) {
            return Err(AutosquashError::IoError(e));
        }
    }

    child.wait_with_output().map_err(AutosquashError::IoError)
}

/// Execute a git command with extra environment variables, unchecked.
pub fn exec_git_with_env_unchecked(
    args: &[String],
    env: &[(String, String)],
) -> Result<Output, AutosquashError> {
    let mut cmd = Command::new(Config::get().git_cmd());
    cmd.args(args);
    for (k, v) in env.iter() {
        cmd.env(k, v);
    }
    cmd.output().map_err(AutosquashError::IoError)
}

/// Locate the repository that contains `path`.
pub fn find_repository_in_path(path: &str) -> Result<Repository, AutosquashError> {
    let global_args = vec!["-C".to_string(), path.to_string()];
    find_repository(&global_args)
}

pub fn find_repository(global_args: &[String]) -> Result<Repository, AutosquashError> {
    let mut args = global_args.to_owned();
    args.push("rev-parse".to_string());
    args.push("--git-dir".to_string());
    args.push("--show-toplevel".to_string());

    let output = exec_git(&args).map_err(|e| match e {
        AutosquashError::GitCliError { stderr, .. } => {
            AutosquashError::Precondition(format!("not a git repository: {}", stderr.trim()))
        }
        other => other,
    })?;
    let stdout = String::from_utf8(output.stdout)?;
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

    let git_dir_str = lines.next().ok_or_else(|| {
        AutosquashError::Generic("missing --git-dir output from git rev-parse".to_string())
    })?;
    let workdir_str = lines.next().ok_or_else(|| {
        AutosquashError::Precondition("repository has no working tree".to_string())
    })?;

    let workdir = PathBuf::from(workdir_str);
    let git_dir = if Path::new(git_dir_str).is_relative() {
        workdir.join(git_dir_str)
    } else {
        PathBuf::from(git_dir_str)
    };

    if !git_dir.is_dir() {
        return Err(AutosquashError::Generic(format!(
            "git directory does not exist: {}",
            git_dir.display()
        )));
    }

    let canonical_workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.clone());

    Ok(Repository {
        global_args: vec!["-C".to_string(), workdir.to_string_lossy().to_string()],
        git_dir,
        workdir,
        canonical_workdir,
    })
}

impl Repository {
    /// Global args with `--no-pager` appended, ready for an exec helper.
    pub fn global_args_for_exec(&self) -> Vec<String> {
        let mut args = self.global_args.clone();
        if !args.iter().any(|arg| arg == "--no-pager") {
            args.push("--no-pager".to_string());
        }
        args
    }

    /// Execute an arbitrary git subcommand in this repository and return
    /// stdout as a string.
    pub fn git(&self, args: &[&str]) -> Result<String, AutosquashError> {
        let mut full_args = self.global_args_for_exec();
        full_args.extend(args.iter().map(|s| s.to_string()));
        let output = exec_git(&full_args)?;
        Ok(String::from_utf8(output.stdout)?)
    }

    /// Same, but non-zero exit is returned as the raw `Output`.
    pub fn git_unchecked(&self, args: &[&str]) -> Result<Output, AutosquashError> {
        let mut full_args = self.global_args_for_exec();
        full_args.extend(args.iter().map(|s| s.to_string()));
        exec_git_unchecked(&full_args)
    }

    pub fn path(&self) -> &Path {
        self.git_dir.as_path()
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    // ------------------------------------------------------------------
    // Revisions and refs
    // ------------------------------------------------------------------

    pub fn head_oid(&self) -> Result<String, AutosquashError> {
        Ok(self.git(&["rev-parse", "--verify", "HEAD"])?.trim().to_string())
    }

    /// Current branch name, or `None` on a detached HEAD.
    pub fn current_branch(&self) -> Result<Option<String>, AutosquashError> {
        let output = self.git_unchecked(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8(output.stdout)?.trim().to_string();
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    /// Merge base of two revisions, or `None` when they share no history.
    pub fn merge_base(&self, one: &str, two: &str) -> Result<Option<String>, AutosquashError> {
        let output = self.git_unchecked(&["merge-base", one, two])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8(output.stdout)?.trim().to_string()))
    }

    /// Merge base of the current branch with the integration branch,
    /// trying `main` then `master`.
    pub fn merge_base_with_mainline(
        &self,
        current_branch: &str,
    ) -> Result<Option<String>, AutosquashError> {
        for mainline in ["main", "master"] {
            if mainline == current_branch {
                continue;
            }
            if let Some(base) = self.merge_base(mainline, "HEAD")? {
                return Ok(Some(base));
            }
        }
        Ok(None)
    }

    /// Commits in `from..to`, newest first.
    pub fn rev_list(&self, from: &str, to: &str) -> Result<Vec<String>, AutosquashError> {
        let range = format!("{}..{}", from, to);
        let stdout = self.git(&["rev-list", &range])?;
        Ok(stdout
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    pub fn rev_list_count(&self, from: &str, to: &str) -> Result<usize, AutosquashError> {
        let range = format!("{}..{}", from, to);
        let stdout = self.git(&["rev-list", "--count", &range])?;
        Ok(stdout.trim().parse().unwrap_or(0))
    }

    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, AutosquashError> {
        let output =
            self.git_unchecked(&["merge-base", "--is-ancestor", ancestor, descendant])?;
        Ok(output.status.success())
    }

    pub fn commit_subject(&self, rev: &str) -> Result<String, AutosquashError> {
        let stdout = self.git(&["show", "-s", "--no-notes", "--format=%s", rev])?;
        Ok(stdout.trim().to_string())
    }

    /// Update a ref with compare-and-swap semantics: fails if the ref no
    /// longer points at `old`.
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new: &str,
        old: &str,
        message: &str,
    ) -> Result<(), AutosquashError> {
        self.git(&["update-ref", "-m", message, refname, new, old])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Diff, blame, file content
    // ------------------------------------------------------------------

    /// Unified diff of the working tree (and index) against HEAD.
    pub fn diff_from_head(&self) -> Result<String, AutosquashError> {
        self.git(&["diff", "--no-color", "--no-ext-diff", "-U3", "HEAD"])
    }

    /// Blame a single 1-based line range of `path` at `rev`.
    pub fn blame_range(
        &self,
        path: &str,
        start: usize,
        count: usize,
        rev: &str,
    ) -> Result<Vec<(usize, String)>, AutosquashError> {
        self.blame_ranges(path, &[(start, count)], rev)
    }

    /// Batch blame: N `(start, count)` ranges of one file in a single
    /// invocation (`-L` may repeat). Returns `(final_line_no,
    /// commit_hash)` pairs from `--line-porcelain` output.
    pub fn blame_ranges(
        &self,
        path: &str,
        ranges: &[(usize, usize)],
        rev: &str,
    ) -> Result<Vec<(usize, String)>, AutosquashError> {
        let mut args = self.global_args_for_exec();
        args.push("blame".to_string());
        args.push("--line-porcelain".to_string());
        let mut any = false;
        for &(start, count) in ranges {
            if count == 0 {
                continue;
            }
            args.push(format!("-L{},{}", start, start + count - 1));
            any = true;
        }
        if !any {
            return Ok(Vec::new());
        }
        args.push(rev.to_string());
        args.push("--".to_string());
        args.push(path.to_string());

        let output = exec_git_unchecked(&args)?;
        if !output.status.success() {
            // Range past EOF or file unknown at rev: no evidence, not an error.
            debug_log(&format!(
                "blame failed for {}: {}",
                path,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
            return Ok(Vec::new());
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(parse_line_porcelain(&stdout))
    }

    /// Content of `path` as of `rev`, or `None` when the file does not
    /// exist in that commit.
    pub fn show_file(&self, rev: &str, path: &str) -> Result<Option<Vec<u8>>, AutosquashError> {
        let spec = format!("{}:{}", rev, path);
        let output = self.git_unchecked(&["show", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout))
    }

    // ------------------------------------------------------------------
    // Stash
    // ------------------------------------------------------------------

    /// Create a stash commit without resetting the working tree, then
    /// store it under the stash ref. Returns `None` on a clean tree.
    pub fn stash_create(&self, message: &str) -> Result<Option<String>, AutosquashError> {
        let output = self.git_unchecked(&["stash", "create", message])?;
        if !output.status.success() {
            return Err(AutosquashError::GitCliError {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                args: vec!["stash".into(), "create".into()],
            });
        }
        let sha = String::from_utf8(output.stdout)?.trim().to_string();
        if sha.is_empty() {
            return Ok(None);
        }
        self.git(&["stash", "store", "-m", message, &sha])?;
        Ok(Some(sha))
    }

    /// Stash everything, including untracked files, resetting the tree.
    pub fn stash_push_all(&self, message: &str) -> Result<(), AutosquashError> {
        self.git(&["stash", "push", "--include-untracked", "-m", message])?;
        Ok(())
    }

    pub fn stash_apply(&self, stash: &str) -> Result<(), AutosquashError> {
        self.git(&["stash", "apply", stash])?;
        Ok(())
    }

    pub fn stash_pop(&self, stash: &str) -> Result<(), AutosquashError> {
        self.git(&["stash", "pop", stash])?;
        Ok(())
    }

    pub fn stash_drop(&self, stash: &str) -> Result<(), AutosquashError> {
        self.git(&["stash", "drop", stash])?;
        Ok(())
    }

    /// Resolve a stash by its message, e.g. after `stash store`.
    pub fn find_stash_by_message(&self, message: &str) -> Result<Option<String>, AutosquashError> {
        let stdout = self.git(&["stash", "list", "--format=%gd %gs"])?;
        for line in stdout.lines() {
            if let Some((reflog, subject)) = line.split_once(' ') {
                if subject.contains(message) {
                    return Ok(Some(reflog.to_string()));
                }
            }
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Worktrees
    // ------------------------------------------------------------------

    pub fn git_version(&self) -> Option<(u32, u32, u32)> {
        let args = vec!["--version".to_string()];
        let output = exec_git(&args).ok()?;
        let version_str = String::from_utf8(output.stdout).ok()?;
        parse_git_version(&version_str)
    }

    /// `git worktree add` has been available since git 2.5.
    pub fn supports_worktrees(&self) -> bool {
        match self.git_version() {
            Some((major, minor, _)) => major > 2 || (major == 2 && minor >= 5),
            None => true,
        }
    }

    pub fn worktree_add_detached(&self, path: &Path, rev: &str) -> Result<(), AutosquashError> {
        let path_str = path.to_string_lossy();
        self.git(&["worktree", "add", "--detach", &path_str, rev])?;
        Ok(())
    }

    pub fn worktree_remove(&self, path: &Path) -> Result<(), AutosquashError> {
        let path_str = path.to_string_lossy();
        self.git(&["worktree", "remove", "--force", &path_str])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Patch application and tree building
    // ------------------------------------------------------------------

    /// Apply a patch to the working tree.
    pub fn apply_patch(&self, patch: &str) -> Result<(), AutosquashError> {
        let mut args = self.global_args_for_exec();
        args.extend(
            ["apply", "--whitespace=nowarn", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        exec_git_stdin(&args, patch.as_bytes())?;
        Ok(())
    }

    /// Apply a patch to the working tree and the index.
    pub fn apply_patch_to_index(&self, patch: &str) -> Result<(), AutosquashError> {
        let mut args = self.global_args_for_exec();
        args.extend(
            ["apply", "--index", "--whitespace=nowarn", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        exec_git_stdin(&args, patch.as_bytes())?;
        Ok(())
    }

    /// Validate a patch against the file state of `target` without
    /// touching the real index or working tree.
    pub fn check_patch_against(&self, target: &str, patch: &str) -> Result<(), AutosquashError> {
        self.with_temp_index(target, |env| {
            let mut args = self.global_args_for_exec();
            args.extend(
                ["apply", "--cached", "--check", "--whitespace=nowarn", "-"]
                    .iter()
                    .map(|s| s.to_string()),
            );
            let output = exec_git_stdin_with_env_unchecked(&args, env, patch.as_bytes())?;
            if !output.status.success() {
                return Err(AutosquashError::GitCliError {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    args,
                });
            }
            Ok(())
        })
    }

    /// Build the tree that results from applying `patch` to `target`'s
    /// tree, through a temporary index. Returns the new tree oid.
    pub fn build_tree_with_patch(
        &self,
        target: &str,
        patch: &str,
    ) -> Result<String, AutosquashError> {
        self.with_temp_index(target, |env| {
            let mut apply_args = self.global_args_for_exec();
            apply_args.extend(
                ["apply", "--cached", "--whitespace=nowarn", "-"]
                    .iter()
                    .map(|s| s.to_string()),
            );
            exec_git_stdin_with_env(&apply_args, env, patch.as_bytes())?;

            let mut wt_args = self.global_args_for_exec();
            wt_args.push("write-tree".to_string());
            let output = exec_git_with_env_unchecked(&wt_args, env)?;
            if !output.status.success() {
                return Err(AutosquashError::GitCliError {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    args: wt_args,
                });
            }
            Ok(String::from_utf8(output.stdout)?.trim().to_string())
        })
    }

    fn with_temp_index<T>(
        &self,
        base_rev: &str,
        f: impl FnOnce(&[(String, String)]) -> Result<T, AutosquashError>,
    ) -> Result<T, AutosquashError> {
        let index_path = self
            .git_dir
            .join(format!("autosquash-index-{}", uuid::Uuid::new_v4()));
        let env = vec![(
            "GIT_INDEX_FILE".to_string(),
            index_path.to_string_lossy().to_string(),
        )];

        let tree_spec = format!("{}^{{tree}}", base_rev);
        let mut rt_args = self.global_args_for_exec();
        rt_args.push("read-tree".to_string());
        rt_args.push(tree_spec);
        let read_result = exec_git_with_env_unchecked(&rt_args, &env).and_then(|output| {
            if output.status.success() {
                Ok(())
            } else {
                Err(AutosquashError::GitCliError {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    args: rt_args.clone(),
                })
            }
        });

        let result = read_result.and_then(|_| f(&env));
        let _ = std::fs::remove_file(&index_path);
        result
    }

    /// Create a commit object for `tree` with a single parent.
    pub fn commit_tree(
        &self,
        tree: &str,
        parent: &str,
        message: &str,
    ) -> Result<String, AutosquashError> {
        let mut args = self.global_args_for_exec();
        args.push("commit-tree".to_string());
        args.push(tree.to_string());
        args.push("-p".to_string());
        args.push(parent.to_string());
        let output = exec_git_stdin(&args, message.as_bytes())?;
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }

    // ------------------------------------------------------------------
    // Rebase
    // ------------------------------------------------------------------

    /// Start an interactive rebase of HEAD onto `upstream` with a
    /// pre-written todo list. The sequence editor is replaced with `cp`
    /// so no editor ever opens. Returns the raw output; a non-zero exit
    /// usually means the rebase stopped on a conflict.
    pub fn rebase_with_todo(
        &self,
        upstream: &str,
        todo: &str,
    ) -> Result<Output, AutosquashError> {
        let todo_path = self
            .git_dir
            .join(format!("autosquash-todo-{}", uuid::Uuid::new_v4()));
        std::fs::write(&todo_path, todo)?;

        let env = vec![(
            "GIT_SEQUENCE_EDITOR".to_string(),
            format!("cp {}", shell_quote(&todo_path.to_string_lossy())),
        )];

        let mut args = self.global_args_for_exec();
        args.push("rebase".to_string());
        args.push("-i".to_string());
        args.push(upstream.to_string());

        let result = exec_git_with_env_unchecked(&args, &env);
        let _ = std::fs::remove_file(&todo_path);
        result
    }

    pub fn rebase_continue(&self) -> Result<Output, AutosquashError> {
        // GIT_EDITOR=true keeps fixup message rewording non-interactive.
        let env = vec![("GIT_EDITOR".to_string(), "true".to_string())];
        let mut args = self.global_args_for_exec();
        args.push("rebase".to_string());
        args.push("--continue".to_string());
        exec_git_with_env_unchecked(&args, &env)
    }

    pub fn rebase_skip(&self) -> Result<Output, AutosquashError> {
        let env = vec![("GIT_EDITOR".to_string(), "true".to_string())];
        let mut args = self.global_args_for_exec();
        args.push("rebase".to_string());
        args.push("--skip".to_string());
        exec_git_with_env_unchecked(&args, &env)
    }

    pub fn rebase_abort(&self) -> Result<(), AutosquashError> {
        let output = self.git_unchecked(&["rebase", "--abort"])?;
        if !output.status.success() {
            debug_log(&format!(
                "rebase --abort: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    /// Which multi-step git operation is in flight, if any.
    pub fn operation_in_progress(&self) -> Option<&'static str> {
        if self.git_dir.join("rebase-merge").is_dir()
            || self.git_dir.join("rebase-apply").is_dir()
        {
            Some("rebase")
        } else if self.git_dir.join("MERGE_HEAD").is_file() {
            Some("merge")
        } else if self.git_dir.join("CHERRY_PICK_HEAD").is_file() {
            Some("cherry-pick")
        } else {
            None
        }
    }

    pub fn conflicted_files(&self) -> Result<Vec<String>, AutosquashError> {
        let output = self.git_unchecked(&["diff", "--name-only", "--diff-filter=U", "-z"])?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        Ok(output
            .stdout
            .split(|&b| b == 0)
            .filter(|bytes| !bytes.is_empty())
            .filter_map(|bytes| String::from_utf8(bytes.to_vec()).ok())
            .collect())
    }

    pub fn reset_hard(&self, rev: &str) -> Result<(), AutosquashError> {
        self.git(&["reset", "--hard", rev])?;
        Ok(())
    }

    pub fn reset_mixed(&self, rev: &str) -> Result<(), AutosquashError> {
        self.git(&["reset", "--mixed", rev])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Path safety
    // ------------------------------------------------------------------

    /// Validate a repo-relative path from a diff entry: no absolute
    /// paths, no `..` escape, no symlink pointing outside the repository.
    pub fn validate_repo_path(&self, path: &str) -> Result<(), AutosquashError> {
        let candidate = Path::new(path);

        if candidate.is_absolute() {
            return Err(AutosquashError::UnsafePath(path.to_string()));
        }
        if candidate
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(AutosquashError::UnsafePath(path.to_string()));
        }

        // A path that exists must resolve inside the repository root.
        let full = self.workdir.join(candidate);
        if full.exists() {
            let resolved = full.canonicalize()?;
            if !resolved.starts_with(&self.canonical_workdir) {
                return Err(AutosquashError::UnsafePath(path.to_string()));
            }
        }

        Ok(())
    }
}

/// Parse `git blame --line-porcelain` output into (line_no, hash) pairs.
///
/// Each group starts with `<sha> <orig-line> <final-line> [<group-len>]`
/// and ends with a tab-prefixed content line.
fn parse_line_porcelain(output: &str) -> Vec<(usize, String)> {
    static HEADER: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let header = HEADER
        .get_or_init(|| Regex::new(r"^([0-9a-f]{40}) (\d+) (\d+)").expect("static regex"));

    let mut result = Vec::new();
    for line in output.lines() {
        if line.starts_with('\t') {
            continue;
        }
        let Some(caps) = header.captures(line) else {
            continue;
        };
        let Some(final_line) = caps[3].parse::<usize>().ok() else {
            continue;
        };
        result.push((final_line, caps[1].to_string()));
    }
    result
}

/// Parse "git version X.Y.Z" into (major, minor, patch).
fn parse_git_version(version_str: &str) -> Option<(u32, u32, u32)> {
    let parts: Vec<&str> = version_str.trim().split_whitespace().collect();
    let version_part = parts.get(2)?;
    let nums: Vec<&str> = version_part.split('.').collect();
    if nums.len() < 2 {
        return None;
    }
    let major = nums.first()?.parse::<u32>().ok()?;
    let minor = nums.get(1)?.parse::<u32>().ok()?;
    let patch = nums.get(2).and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
    Some((major, minor, patch))
}

fn shell_quote(path: &str) -> String {
    if path.contains(' ') || path.contains('\'') {
        format!("\"{}\"", path)
    } else {
        path.to_string()
    }
}
