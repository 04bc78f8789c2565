#![allow(dead_code)]

use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use git_autosquash::git::repository::{find_repository_in_path, Repository};

/// A throwaway real-git repository under the system temp dir.
///
/// All interaction goes through the actual git binary so tests exercise
/// the same plumbing the tool itself drives.
#[derive(Debug)]
pub struct TestRepo {
    path: PathBuf,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let n: u64 = rng.gen_range(0..10_000_000_000);
        let path = std::env::temp_dir().join(format!("git-autosquash-test-{}", n));
        fs::create_dir_all(&path).expect("failed to create test repo dir");

        let repo = Self { path };
        repo.git(&["init"]);
        // Pin the unborn branch name regardless of init.defaultBranch.
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the repository through the crate's own wrapper.
    pub fn repo(&self) -> Repository {
        find_repository_in_path(&self.path.to_string_lossy())
            .expect("test repo should be discoverable")
    }

    /// Run git, panicking (with stderr) on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let output = self.try_git(args);
        if !output.status.success() {
            panic!(
                "git {:?} failed in {}: {}",
                args,
                self.path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn try_git(&self, args: &[&str]) -> Output {
        Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .output()
            .expect("failed to spawn git")
    }

    pub fn write_file(&self, name: &str, content: &str) {
        let full = self.path.join(name);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(full, content).expect("failed to write test file");
    }

    pub fn read_file(&self, name: &str) -> String {
        fs::read_to_string(self.path.join(name)).expect("failed to read test file")
    }

    /// Stage everything and commit; returns the new HEAD hash.
    pub fn commit_all(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message]);
        self.head()
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    pub fn current_branch(&self) -> String {
        self.git(&["symbolic-ref", "--short", "HEAD"]).trim().to_string()
    }

    pub fn checkout_new_branch(&self, name: &str) {
        self.git(&["checkout", "-b", name]);
    }

    pub fn checkout(&self, rev: &str) {
        self.git(&["checkout", rev]);
    }

    /// Content of a file as of a revision.
    pub fn show(&self, rev: &str, path: &str) -> String {
        self.git(&["show", &format!("{}:{}", rev, path)])
    }

    /// `git status --porcelain` output, for clean-tree assertions.
    pub fn status_porcelain(&self) -> String {
        self.git(&["status", "--porcelain"])
    }

    pub fn commit_count(&self, range: &str) -> usize {
        self.git(&["rev-list", "--count", range])
            .trim()
            .parse()
            .expect("rev-list --count output")
    }
}

impl Drop for TestRepo {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}
