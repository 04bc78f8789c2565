use std::str;

use crate::error::AutosquashError;
use crate::git::repository::{exec_git, Repository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Unmodified,
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Ignored,
    Unknown(char),
}

impl From<char> for StatusCode {
    fn from(value: char) -> Self {
        match value {
            '.' => StatusCode::Unmodified,
            'M' => StatusCode::Modified,
            'A' => StatusCode::Added,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'C' => StatusCode::Copied,
            'U' => StatusCode::Unmerged,
            '?' => StatusCode::Untracked,
            '!' => StatusCode::Ignored,
            other => StatusCode::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Ordinary,
    Rename,
    Copy,
    Unmerged,
    Untracked,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub staged: StatusCode,
    pub unstaged: StatusCode,
    pub kind: EntryKind,
    pub orig_path: Option<String>,
}

/// Summary of the working tree used by the precondition checks and the
/// mixed-state prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingTreeState {
    Clean,
    StagedOnly,
    UnstagedOnly,
    Mixed,
}

impl Repository {
    pub fn status_entries(&self) -> Result<Vec<StatusEntry>, AutosquashError> {
        let mut args = self.global_args_for_exec();
        args.push("status".to_string());
        args.push("--porcelain=v2".to_string());
        args.push("-z".to_string());

        let output = exec_git(&args)?;
        parse_porcelain_v2(&output.stdout)
    }

    pub fn working_tree_state(&self) -> Result<WorkingTreeState, AutosquashError> {
        let entries = self.status_entries()?;

        let mut has_staged = false;
        let mut has_unstaged = false;
        for entry in &entries {
            match entry.kind {
                EntryKind::Ignored => continue,
                EntryKind::Untracked => {
                    has_unstaged = true;
                    continue;
                }
                _ => {}
            }
            if !matches!(entry.staged, StatusCode::Unmodified) {
                has_staged = true;
            }
            if !matches!(entry.unstaged, StatusCode::Unmodified) {
                has_unstaged = true;
            }
        }

        Ok(match (has_staged, has_unstaged) {
            (false, false) => WorkingTreeState::Clean,
            (true, false) => WorkingTreeState::StagedOnly,
            (false, true) => WorkingTreeState::UnstagedOnly,
            (true, true) => WorkingTreeState::Mixed,
        })
    }
}

fn parse_porcelain_v2(data: &[u8]) -> Result<Vec<StatusEntry>, AutosquashError> {
    let mut entries = Vec::new();
    let mut parts = data
        .split(|byte| *byte == 0)
        .filter(|slice| !slice.is_empty())
        .peekable();

    while let Some(raw) = parts.next() {
        let record = str::from_utf8(raw)?;
        let mut chars = record.chars();
        let tag = chars.next().ok_or_else(|| {
            AutosquashError::Generic("unexpected empty porcelain v2 record".into())
        })?;

        match tag {
            '1' | 'u' => {
                let mut fields = record.splitn(9, ' ');
                let _ = fields.next(); // tag
                let xy = fields
                    .next()
                    .ok_or_else(|| AutosquashError::Generic("missing XY field".into()))?;
                if xy.len() != 2 {
                    return Err(AutosquashError::Generic(format!(
                        "unexpected XY field length: {}",
                        xy
                    )));
                }
                let staged = StatusCode::from(xy.chars().next().unwrap());
                let unstaged = StatusCode::from(xy.chars().nth(1).unwrap());

                // skip submodule/metadata fields to capture path
                for _ in 0..6 {
                    fields.next();
                }

                let path = fields
                    .next()
                    .ok_or_else(|| AutosquashError::Generic("missing path field".into()))?
                    .to_string();

                entries.push(StatusEntry {
                    path,
                    staged,
                    unstaged,
                    kind: if matches!(staged, StatusCode::Unmerged)
                        || matches!(unstaged, StatusCode::Unmerged)
                    {
                        EntryKind::Unmerged
                    } else {
                        EntryKind::Ordinary
                    },
                    orig_path: None,
                });
            }
            '2' => {
                let mut fields = record.splitn(10, ' ');
                let _ = fields.next(); // tag
                let xy = fields
                    .next()
                    .ok_or_else(|| AutosquashError::Generic("missing XY field".into()))?;
                if xy.len() != 2 {
                    return Err(AutosquashError::Generic(format!(
                        "unexpected XY field length: {}",
                        xy
                    )));
                }
                let staged = StatusCode::from(xy.chars().next().unwrap());
                let unstaged = StatusCode::from(xy.chars().nth(1).unwrap());

                // skip submodule/metadata fields
                for _ in 0..7 {
                    fields.next();
                }

                let path = fields
                    .next()
                    .ok_or_else(|| AutosquashError::Generic("missing path field".into()))?
                    .to_string();

                let orig_path_bytes = parts.next().ok_or_else(|| {
                    AutosquashError::Generic("missing original path for rename/copy".into())
                })?;
                let orig_path = str::from_utf8(orig_path_bytes)?.to_string();

                let kind = match staged {
                    StatusCode::Renamed => EntryKind::Rename,
                    StatusCode::Copied => EntryKind::Copy,
                    _ => EntryKind::Ordinary,
                };

                entries.push(StatusEntry {
                    path,
                    staged,
                    unstaged,
                    kind,
                    orig_path: Some(orig_path),
                });
            }
            '?' => {
                let path = record.strip_prefix("? ").unwrap_or(record).to_string();

                entries.push(StatusEntry {
                    path,
                    staged: StatusCode::Unmodified,
                    unstaged: StatusCode::Untracked,
                    kind: EntryKind::Untracked,
                    orig_path: None,
                });
            }
            '!' => {
                let path = record.strip_prefix("! ").unwrap_or(record).to_string();

                entries.push(StatusEntry {
                    path,
                    staged: StatusCode::Unmodified,
                    unstaged: StatusCode::Ignored,
                    kind: EntryKind::Ignored,
                    orig_path: None,
                });
            }
            other => {
                return Err(AutosquashError::Generic(format!(
                    "unsupported porcelain v2 record tag: {}",
                    other
                )));
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_debug_snapshot;

    fn summarize(entries: &[StatusEntry]) -> (bool, bool) {
        let mut has_staged = false;
        let mut has_unstaged = false;
        for entry in entries {
            match entry.kind {
                EntryKind::Ignored => continue,
                EntryKind::Untracked => {
                    has_unstaged = true;
                    continue;
                }
                _ => {}
            }
            if !matches!(entry.staged, StatusCode::Unmodified) {
                has_staged = true;
            }
            if !matches!(entry.unstaged, StatusCode::Unmodified) {
                has_unstaged = true;
            }
        }
        (has_staged, has_unstaged)
    }

    #[test]
    fn parse_varied_porcelain_v2_records() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"1 MM N... 100644 100644 100644 1111111111111111111111111111111111111111 2222222222222222222222222222222222222222 src/lib.rs\0");
        raw.extend_from_slice(b"1 A. N... 000000 100644 100644 0000000000000000000000000000000000000000 3333333333333333333333333333333333333333 src/new.rs\0");
        raw.extend_from_slice(b"1 .M N... 100644 100644 100644 4444444444444444444444444444444444444444 5555555555555555555555555555555555555555 src/dirty.rs\0");
        raw.extend_from_slice(b"2 R. N... 100644 100644 100644 6666666666666666666666666666666666666666 7777777777777777777777777777777777777777 80 src/renamed.rs\0src/old name.rs\0");
        raw.extend_from_slice(b"u UU N... 100644 100644 100644 8888888888888888888888888888888888888888 9999999999999999999999999999999999999999 1 2 3 conflicted.txt\0");
        raw.extend_from_slice(b"? notes [draft].md\0");
        raw.extend_from_slice(b"! target/.keep\0");

        let entries = parse_porcelain_v2(&raw).expect("parse succeeds");

        assert_eq!(entries.len(), 7);
        assert!(entries
            .iter()
            .any(|e| e.path == "src/lib.rs" && e.staged == StatusCode::Modified));
        assert!(entries.iter().any(|e| e.kind == EntryKind::Rename
            && e.orig_path.as_deref() == Some("src/old name.rs")));
        assert!(entries.iter().any(|e| e.kind == EntryKind::Unmerged));
        assert!(entries
            .iter()
            .any(|e| matches!(e.unstaged, StatusCode::Untracked)));

        assert_debug_snapshot!(entries[3], @r###"
        StatusEntry {
            path: "src/renamed.rs",
            staged: Renamed,
            unstaged: Unmodified,
            kind: Rename,
            orig_path: Some(
                "src/old name.rs",
            ),
        }
        "###);
    }

    #[test]
    fn working_tree_state_classification() {
        let staged_only = b"1 M. N... 100644 100644 100644 1111111111111111111111111111111111111111 2222222222222222222222222222222222222222 a.rs\0";
        let entries = parse_porcelain_v2(staged_only).unwrap();
        assert_eq!(summarize(&entries), (true, false));

        let mixed = b"1 MM N... 100644 100644 100644 1111111111111111111111111111111111111111 2222222222222222222222222222222222222222 a.rs\0";
        let entries = parse_porcelain_v2(mixed).unwrap();
        assert_eq!(summarize(&entries), (true, true));

        let untracked_only = b"? b.rs\0";
        let entries = parse_porcelain_v2(untracked_only).unwrap();
        assert_eq!(summarize(&entries), (false, true));

        let ignored_only = b"! target/.keep\0";
        let entries = parse_porcelain_v2(ignored_only).unwrap();
        assert_eq!(summarize(&entries), (false, false));
    }
}
