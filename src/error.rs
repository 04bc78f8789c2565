use std::fmt;

/// Crate-wide error type.
///
/// Git CLI failures keep the exit code, stderr, and argv of the failed
/// invocation so callers can decide whether non-zero is an error or data.
#[derive(Debug)]
pub enum AutosquashError {
    IoError(std::io::Error),
    /// The git CLI exited non-zero.
    GitCliError {
        code: Option<i32>,
        stderr: String,
        args: Vec<String>,
    },
    JsonError(serde_json::Error),
    Utf8Error(std::str::Utf8Error),
    FromUtf8Error(std::string::FromUtf8Error),
    /// A repository precondition was not met (not a repo, detached HEAD,
    /// no commits above the merge base, operation already in progress).
    Precondition(String),
    /// A diff entry names a path that escapes the repository root.
    UnsafePath(String),
    /// No in-scope blame evidence for a hunk. Internal: the resolver
    /// turns this into a fallback, it never reaches the user directly.
    BlameEmpty {
        file: String,
    },
    /// The patch generator found no unused candidate line for a change.
    UnplaceableChange {
        file: String,
        target: String,
        line: String,
    },
    /// `git apply --check` rejected a generated patch.
    PatchReject {
        file: String,
        target: String,
        stderr: String,
    },
    /// The rebase stopped on a conflict and the user chose to abort.
    RebaseConflict {
        commit: String,
        files: Vec<String>,
    },
    /// A commit hook failed twice in a row.
    HookFailure(String),
    /// SIGINT/SIGTERM received mid-execution.
    Interrupted,
    Generic(String),
}

impl AutosquashError {
    /// Process exit code for this error per the taxonomy mapping.
    pub fn exit_code(&self) -> i32 {
        match self {
            AutosquashError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Short taxonomy tag used in user-facing failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AutosquashError::Precondition(_) => "precondition",
            AutosquashError::UnsafePath(_) => "unsafe_path",
            AutosquashError::BlameEmpty { .. } => "blame_empty",
            AutosquashError::UnplaceableChange { .. } => "unplaceable_change",
            AutosquashError::PatchReject { .. } => "patch_reject",
            AutosquashError::RebaseConflict { .. } => "rebase_conflict",
            AutosquashError::HookFailure(_) => "hook_failure",
            AutosquashError::Interrupted => "interrupted",
            AutosquashError::GitCliError { .. } => "git_failure",
            _ => "error",
        }
    }
}

impl fmt::Display for AutosquashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutosquashError::IoError(e) => write!(f, "IO error: {}", e),
            AutosquashError::GitCliError { code, stderr, args } => match code {
                Some(c) => write!(
                    f,
                    "Git CLI ({}) failed with exit code {}: {}",
                    args.join(" "),
                    c,
                    stderr
                ),
                None => write!(f, "Git CLI ({}) failed: {}", args.join(" "), stderr),
            },
            AutosquashError::JsonError(e) => write!(f, "JSON error: {}", e),
            AutosquashError::Utf8Error(e) => write!(f, "UTF-8 error: {}", e),
            AutosquashError::FromUtf8Error(e) => write!(f, "From UTF-8 error: {}", e),
            AutosquashError::Precondition(msg) => write!(f, "precondition: {}", msg),
            AutosquashError::UnsafePath(path) => {
                write!(f, "unsafe path in diff entry: {}", path)
            }
            AutosquashError::BlameEmpty { file } => {
                write!(f, "no in-scope blame evidence for {}", file)
            }
            AutosquashError::UnplaceableChange { file, target, line } => write!(
                f,
                "unplaceable change in {} for commit {}: no unused line matches {:?}",
                file, target, line
            ),
            AutosquashError::PatchReject {
                file,
                target,
                stderr,
            } => write!(
                f,
                "generated patch for {} rejected against commit {}: {}",
                file, target, stderr
            ),
            AutosquashError::RebaseConflict { commit, files } => write!(
                f,
                "rebase conflict at {} in: {}",
                commit,
                files.join(", ")
            ),
            AutosquashError::HookFailure(msg) => write!(f, "hook failure: {}", msg),
            AutosquashError::Interrupted => write!(f, "interrupted by signal"),
            AutosquashError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AutosquashError {}

impl From<std::io::Error> for AutosquashError {
    fn from(err: std::io::Error) -> Self {
        AutosquashError::IoError(err)
    }
}

impl From<serde_json::Error> for AutosquashError {
    fn from(err: serde_json::Error) -> Self {
        AutosquashError::JsonError(err)
    }
}

impl From<std::str::Utf8Error> for AutosquashError {
    fn from(err: std::str::Utf8Error) -> Self {
        AutosquashError::Utf8Error(err)
    }
}

impl From<std::string::FromUtf8Error> for AutosquashError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AutosquashError::FromUtf8Error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(AutosquashError::Interrupted.exit_code(), 130);
        assert_eq!(
            AutosquashError::Precondition("detached HEAD".into()).exit_code(),
            1
        );
        assert_eq!(
            AutosquashError::GitCliError {
                code: Some(128),
                stderr: "fatal".into(),
                args: vec!["status".into()],
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn display_names_the_failed_invocation() {
        let err = AutosquashError::GitCliError {
            code: Some(1),
            stderr: "boom".into(),
            args: vec!["apply".into(), "--check".into()],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("apply --check"));
        assert!(rendered.contains("boom"));
    }

    #[test]
    fn taxonomy_kinds() {
        assert_eq!(
            AutosquashError::UnsafePath("../etc/passwd".into()).kind(),
            "unsafe_path"
        );
        assert_eq!(
            AutosquashError::BlameEmpty { file: "a.c".into() }.kind(),
            "blame_empty"
        );
        assert_eq!(
            AutosquashError::RebaseConflict {
                commit: "abc".into(),
                files: vec![]
            }
            .kind(),
            "rebase_conflict"
        );
        assert_eq!(
            AutosquashError::UnplaceableChange {
                file: "a.c".into(),
                target: "abc".into(),
                line: "x = 1;".into()
            }
            .kind(),
            "unplaceable_change"
        );
    }
}
