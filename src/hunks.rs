use crate::error::AutosquashError;
use crate::logging::warn_log;

/// What kind of diff entry a hunk came from. Downstream stages branch on
/// this tag: binary and mode-only hunks are skipped, new/deleted files
/// pass through patch generation unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkKind {
    Text,
    Binary,
    NewFile,
    DeletedFile,
    ModeOnly,
}

/// A contiguous change region in one file of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub kind: HunkKind,
    pub file_path: String,
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// Raw body lines, beginning with the `@@` header for text hunks.
    pub lines: Vec<String>,
}

impl DiffHunk {
    /// Body lines without the `@@` header.
    pub fn body(&self) -> &[String] {
        if self.lines.first().map(|l| l.starts_with("@@")).unwrap_or(false) {
            &self.lines[1..]
        } else {
            &self.lines
        }
    }

    pub fn has_deletions(&self) -> bool {
        self.body().iter().any(|l| l.starts_with('-'))
    }

    pub fn has_additions(&self) -> bool {
        self.body().iter().any(|l| l.starts_with('+'))
    }
}

/// The atomic unit the patch generator retargets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// One removed line replaced by one or more added lines.
    Replace { removed: String, added: Vec<String> },
    /// One removed line with no replacement.
    Delete { removed: String },
    /// A run of added lines with no removed counterpart, anchored to the
    /// nearest context line in the source hunk.
    Insert {
        anchor_before: Option<String>,
        anchor_after: Option<String>,
        added: Vec<String>,
    },
}

/// Expand a text hunk into its constituent changes, in order.
///
/// A removal run followed by an addition run pairs up line for line; the
/// last removed line of a run absorbs any surplus added lines so that
/// every change claims exactly one pre-image line. Addition runs with no
/// removals become anchored insertions.
pub fn extract_changes(hunk: &DiffHunk) -> Vec<Change> {
    let body = hunk.body();
    let mut changes = Vec::new();

    let mut i = 0;
    let mut last_context: Option<String> = None;
    while i < body.len() {
        let line = &body[i];
        if let Some(ctx) = line.strip_prefix(' ') {
            last_context = Some(ctx.to_string());
            i += 1;
        } else if line.starts_with('\\') {
            // "\ No newline at end of file"
            i += 1;
        } else if line.starts_with('-') {
            let mut removed = Vec::new();
            while i < body.len() && body[i].starts_with('-') {
                removed.push(body[i][1..].to_string());
                i += 1;
            }
            let mut added = Vec::new();
            while i < body.len() && (body[i].starts_with('+') || body[i].starts_with('\\')) {
                if let Some(add) = body[i].strip_prefix('+') {
                    added.push(add.to_string());
                }
                i += 1;
            }

            if added.is_empty() {
                for r in removed {
                    changes.push(Change::Delete { removed: r });
                }
            } else {
                let pairs = removed.len().min(added.len());
                for (idx, r) in removed.iter().enumerate() {
                    if idx + 1 < pairs {
                        changes.push(Change::Replace {
                            removed: r.clone(),
                            added: vec![added[idx].clone()],
                        });
                    } else if idx + 1 == pairs {
                        // Last paired removal absorbs surplus additions.
                        changes.push(Change::Replace {
                            removed: r.clone(),
                            added: added[idx..].to_vec(),
                        });
                    } else {
                        changes.push(Change::Delete { removed: r.clone() });
                    }
                }
            }
            // The pre-image of the run anchors what follows.
            // (context tracking continues from subsequent context lines)
        } else if line.starts_with('+') {
            let mut added = Vec::new();
            while i < body.len() && (body[i].starts_with('+') || body[i].starts_with('\\')) {
                if let Some(add) = body[i].strip_prefix('+') {
                    added.push(add.to_string());
                }
                i += 1;
            }
            let anchor_after = body
                .get(i)
                .filter(|l| l.starts_with(' '))
                .map(|l| l[1..].to_string());
            changes.push(Change::Insert {
                anchor_before: last_context.clone(),
                anchor_after,
                added,
            });
        } else {
            i += 1;
        }
    }

    changes
}

/// Parses unified diff text into tagged hunks.
pub struct HunkParser;

#[derive(Default)]
struct FileSection {
    path: Option<String>,
    is_new: bool,
    is_deleted: bool,
    is_binary: bool,
    saw_mode_change: bool,
    hunks_emitted: bool,
}

impl HunkParser {
    /// Parse a diff as produced by `git diff`. In line-by-line mode each
    /// text hunk is split so that every output hunk carries exactly one
    /// removal/addition pair (or one pure run), with minimal context.
    pub fn parse(diff_text: &str, line_by_line: bool) -> Result<Vec<DiffHunk>, AutosquashError> {
        let mut hunks = Vec::new();
        let mut section = FileSection::default();
        let mut lines = diff_text.lines().peekable();

        while let Some(line) = lines.next() {
            if line.starts_with("diff --git ") {
                flush_section(&mut section, &mut hunks);
                section = FileSection::default();
                section.path = parse_git_header_path(line);
            } else if line.starts_with("new file mode") {
                section.is_new = true;
            } else if line.starts_with("deleted file mode") {
                section.is_deleted = true;
            } else if line.starts_with("old mode") || line.starts_with("new mode") {
                section.saw_mode_change = true;
            } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
                section.is_binary = true;
            } else if let Some(path) = line.strip_prefix("+++ ") {
                if path != "/dev/null" {
                    section.path = Some(strip_diff_prefix(path));
                }
            } else if let Some(path) = line.strip_prefix("--- ") {
                if path != "/dev/null" && section.path.is_none() {
                    section.path = Some(strip_diff_prefix(path));
                }
            } else if line.starts_with("@@ ") {
                let Some((old_start, old_count, new_start, new_count)) = parse_hunk_header(line)
                else {
                    return Err(AutosquashError::Generic(format!(
                        "malformed hunk header: {}",
                        line
                    )));
                };
                let file_path = section.path.clone().ok_or_else(|| {
                    AutosquashError::Generic("hunk header before any file header".to_string())
                })?;

                let mut body = vec![line.to_string()];
                while let Some(next) = lines.peek() {
                    if next.starts_with(' ')
                        || next.starts_with('+')
                        || next.starts_with('-')
                        || next.starts_with('\\')
                        || next.is_empty()
                    {
                        // An empty line inside a hunk is a context line whose
                        // content is empty (git emits a single space, but be
                        // lenient about trailing-whitespace-stripped input).
                        let raw = lines.next().unwrap();
                        if raw.is_empty() {
                            body.push(" ".to_string());
                        } else {
                            body.push(raw.to_string());
                        }
                    } else {
                        break;
                    }
                }

                let kind = if section.is_new {
                    HunkKind::NewFile
                } else if section.is_deleted {
                    HunkKind::DeletedFile
                } else {
                    HunkKind::Text
                };

                section.hunks_emitted = true;
                let hunk = DiffHunk {
                    kind,
                    file_path,
                    old_start,
                    old_count,
                    new_start,
                    new_count,
                    lines: body,
                };

                if line_by_line && kind == HunkKind::Text {
                    hunks.extend(split_line_by_line(&hunk));
                } else {
                    hunks.push(hunk);
                }
            }
        }
        flush_section(&mut section, &mut hunks);

        Ok(hunks)
    }
}

fn flush_section(section: &mut FileSection, hunks: &mut Vec<DiffHunk>) {
    let Some(path) = section.path.clone() else {
        return;
    };
    if section.is_binary {
        warn_log(&format!("skipping binary file: {}", path));
        hunks.push(DiffHunk {
            kind: HunkKind::Binary,
            file_path: path,
            old_start: 0,
            old_count: 0,
            new_start: 0,
            new_count: 0,
            lines: Vec::new(),
        });
    } else if section.saw_mode_change && !section.hunks_emitted {
        hunks.push(DiffHunk {
            kind: HunkKind::ModeOnly,
            file_path: path,
            old_start: 0,
            old_count: 0,
            new_start: 0,
            new_count: 0,
            lines: Vec::new(),
        });
    }
}

/// `diff --git a/foo b/foo` → `foo`. Quoted paths keep their unescaped form.
fn parse_git_header_path(line: &str) -> Option<String> {
    let rest = line.strip_prefix("diff --git ")?;
    // Take the b/ side; paths with spaces are covered by the later
    // `+++ b/...` header which overrides this best-effort value.
    let b_side = rest.split(" b/").nth(1)?;
    Some(b_side.trim().trim_matches('"').to_string())
}

fn strip_diff_prefix(path: &str) -> String {
    let trimmed = path.trim().trim_matches('"');
    trimmed
        .strip_prefix("a/")
        .or_else(|| trimmed.strip_prefix("b/"))
        .unwrap_or(trimmed)
        .to_string()
}

/// `@@ -12,3 +14,4 @@ ...` → (12, 3, 14, 4). Counts default to 1.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let (old_part, rest) = rest.split_once(" +")?;
    let new_part = rest.split(" @@").next()?;

    let parse_range = |spec: &str| -> Option<(usize, usize)> {
        match spec.split_once(',') {
            Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
            None => Some((spec.parse().ok()?, 1)),
        }
    };

    let (old_start, old_count) = parse_range(old_part)?;
    let (new_start, new_count) = parse_range(new_part)?;
    Some((old_start, old_count, new_start, new_count))
}

/// Split a text hunk into one-change-per-hunk pieces with one line of
/// context on each side.
fn split_line_by_line(hunk: &DiffHunk) -> Vec<DiffHunk> {
    #[derive(Clone)]
    struct BodyLine {
        text: String,
        old_no: Option<usize>,
        new_no: Option<usize>,
    }

    let mut positioned = Vec::new();
    let mut old_no = hunk.old_start;
    let mut new_no = hunk.new_start;
    for line in hunk.body() {
        if line.starts_with(' ') {
            positioned.push(BodyLine {
                text: line.clone(),
                old_no: Some(old_no),
                new_no: Some(new_no),
            });
            old_no += 1;
            new_no += 1;
        } else if line.starts_with('-') {
            positioned.push(BodyLine {
                text: line.clone(),
                old_no: Some(old_no),
                new_no: None,
            });
            old_no += 1;
        } else if line.starts_with('+') {
            positioned.push(BodyLine {
                text: line.clone(),
                old_no: None,
                new_no: Some(new_no),
            });
            new_no += 1;
        }
    }

    // Group consecutive +/- lines into change runs, then emit one hunk
    // per removal/addition pair (or per unpaired line).
    let mut result = Vec::new();
    let mut i = 0;
    while i < positioned.len() {
        if positioned[i].text.starts_with(' ') {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < positioned.len() && !positioned[i].text.starts_with(' ') {
            i += 1;
        }
        let run = &positioned[run_start..i];
        let removed: Vec<&BodyLine> = run.iter().filter(|l| l.text.starts_with('-')).collect();
        let added: Vec<&BodyLine> = run.iter().filter(|l| l.text.starts_with('+')).collect();
        let ctx_before = run_start.checked_sub(1).map(|idx| positioned[idx].clone());
        let ctx_after = positioned.get(i).cloned();

        let pair_count = removed.len().max(added.len());
        for pair_idx in 0..pair_count {
            let rem = removed.get(pair_idx).copied();
            let add = added.get(pair_idx).copied();
            // Context stays adjacent: the leading context line belongs to
            // the first pair only, the trailing one to the last.
            let ctx_before = ctx_before.as_ref().filter(|_| pair_idx == 0);
            let ctx_after = ctx_after.as_ref().filter(|_| pair_idx + 1 == pair_count);

            let mut lines = Vec::new();
            let mut old_count = 0;
            let mut new_count = 0;

            // Old-side start: the removed line itself, the preceding
            // context line, or the insertion point for a pure addition.
            let old_start = rem
                .and_then(|l| l.old_no)
                .or_else(|| ctx_before.and_then(|c| c.old_no))
                .or_else(|| ctx_after.and_then(|c| c.old_no))
                .unwrap_or(hunk.old_start);
            let new_start = add
                .and_then(|l| l.new_no)
                .or_else(|| rem.and_then(|l| l.old_no))
                .unwrap_or(hunk.new_start);

            let mut actual_old_start = old_start;
            let mut actual_new_start = new_start;

            if let Some(ctx) = ctx_before {
                lines.push(ctx.text.clone());
                old_count += 1;
                new_count += 1;
                actual_old_start = ctx.old_no.unwrap_or(old_start);
                actual_new_start = ctx.new_no.unwrap_or(new_start);
            }
            if let Some(rem) = rem {
                lines.push(rem.text.clone());
                old_count += 1;
                if ctx_before.is_none() {
                    actual_old_start = rem.old_no.unwrap_or(old_start);
                }
            }
            if let Some(add) = add {
                lines.push(add.text.clone());
                new_count += 1;
                if ctx_before.is_none() && rem.is_none() {
                    actual_new_start = add.new_no.unwrap_or(new_start);
                }
            }
            if let Some(ctx) = ctx_after {
                lines.push(ctx.text.clone());
                old_count += 1;
                new_count += 1;
            }

            let header = format!(
                "@@ -{},{} +{},{} @@",
                actual_old_start, old_count, actual_new_start, new_count
            );
            let mut body = vec![header];
            body.extend(lines);

            result.push(DiffHunk {
                kind: HunkKind::Text,
                file_path: hunk.file_path.clone(),
                old_start: actual_old_start,
                old_count,
                new_start: actual_new_start,
                new_count,
                lines: body,
            });
        }
    }

    if result.is_empty() {
        vec![hunk.clone()]
    } else {
        result
    }
}
