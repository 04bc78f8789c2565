use std::collections::{BTreeMap, HashSet};

use crate::error::AutosquashError;
use crate::hunks::{extract_changes, Change, DiffHunk, HunkKind};

/// Context lines above and below each placed change.
const CONTEXT_LINES: usize = 3;

/// A unified-diff patch rewritten against one target commit's file state.
#[derive(Debug, Clone)]
pub struct GeneratedPatch {
    pub file_path: String,
    pub target: String,
    pub diff_text: String,
}

/// Line comparison strips leading/trailing horizontal whitespace only;
/// internal whitespace is significant.
fn strips_equal(a: &str, b: &str) -> bool {
    trim_horizontal(a) == trim_horizontal(b)
}

fn trim_horizontal(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}

#[derive(Debug, Clone)]
enum PlacementKind {
    Replace { added: Vec<String> },
    Delete,
    InsertAfter { added: Vec<String> },
    InsertBefore { added: Vec<String> },
}

#[derive(Debug, Clone)]
struct Placement {
    /// 1-based line in the target file this change claims.
    line: usize,
    kind: PlacementKind,
}

impl Placement {
    fn delta(&self) -> isize {
        match &self.kind {
            PlacementKind::Replace { added } => added.len() as isize - 1,
            PlacementKind::Delete => -1,
            PlacementKind::InsertAfter { added } | PlacementKind::InsertBefore { added } => {
                added.len() as isize
            }
        }
    }
}

/// Lowest-numbered line matching `wanted` that no earlier change claimed.
fn find_candidate(
    target_lines: &[String],
    used: &HashSet<usize>,
    wanted: &str,
) -> Option<usize> {
    target_lines
        .iter()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .find(|(no, line)| !used.contains(no) && strips_equal(line, wanted))
        .map(|(no, _)| no)
}

/// Generate the patch for one `(file, target_commit)` group.
///
/// `target_lines` is the file content as of the target commit; `hunks`
/// are the approved source hunks for this group, in original order. The
/// used-line set guarantees each historical line is claimed by at most
/// one change, so identical textual changes land on distinct lines.
pub fn generate_patch(
    file_path: &str,
    target: &str,
    target_lines: &[String],
    hunks: &[&DiffHunk],
) -> Result<String, AutosquashError> {
    if hunks.iter().all(|h| h.kind == HunkKind::NewFile) {
        return Ok(passthrough_patch(file_path, hunks, true));
    }
    if hunks.iter().all(|h| h.kind == HunkKind::DeletedFile) {
        return Ok(passthrough_patch(file_path, hunks, false));
    }

    let mut used: HashSet<usize> = HashSet::new();
    let mut placements: Vec<Placement> = Vec::new();

    for hunk in hunks {
        for change in extract_changes(hunk) {
            let placement = place_change(file_path, target, target_lines, &mut used, change)?;
            placements.push(placement);
        }
    }

    placements.sort_by_key(|p| p.line);
    Ok(render_patch(file_path, target_lines, &placements))
}

fn place_change(
    file_path: &str,
    target: &str,
    target_lines: &[String],
    used: &mut HashSet<usize>,
    change: Change,
) -> Result<Placement, AutosquashError> {
    let unplaceable = |line: &str| AutosquashError::UnplaceableChange {
        file: file_path.to_string(),
        target: target.to_string(),
        line: line.to_string(),
    };

    match change {
        Change::Replace { removed, added } => {
            let line = find_candidate(target_lines, used, &removed)
                .ok_or_else(|| unplaceable(&removed))?;
            used.insert(line);
            Ok(Placement {
                line,
                kind: PlacementKind::Replace { added },
            })
        }
        Change::Delete { removed } => {
            let line = find_candidate(target_lines, used, &removed)
                .ok_or_else(|| unplaceable(&removed))?;
            used.insert(line);
            Ok(Placement {
                line,
                kind: PlacementKind::Delete,
            })
        }
        Change::Insert {
            anchor_before,
            anchor_after,
            added,
        } => {
            if let Some(anchor) = anchor_before.as_deref() {
                if let Some(line) = find_candidate(target_lines, used, anchor) {
                    used.insert(line);
                    return Ok(Placement {
                        line,
                        kind: PlacementKind::InsertAfter { added },
                    });
                }
            }
            if let Some(anchor) = anchor_after.as_deref() {
                if let Some(line) = find_candidate(target_lines, used, anchor) {
                    used.insert(line);
                    return Ok(Placement {
                        line,
                        kind: PlacementKind::InsertBefore { added },
                    });
                }
            }
            if target_lines.is_empty() {
                // Insertion into an empty file needs no anchor.
                return Ok(Placement {
                    line: 0,
                    kind: PlacementKind::InsertBefore { added },
                });
            }
            let wanted = anchor_before
                .or(anchor_after)
                .unwrap_or_else(|| added.first().cloned().unwrap_or_default());
            Err(unplaceable(&wanted))
        }
    }
}

fn render_patch(file_path: &str, target_lines: &[String], placements: &[Placement]) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- a/{}\n+++ b/{}\n", file_path, file_path));

    if placements.len() == 1 && placements[0].line == 0 {
        // Whole-content insertion into an empty file.
        if let PlacementKind::InsertBefore { added } = &placements[0].kind {
            out.push_str(&format!("@@ -0,0 +1,{} @@\n", added.len()));
            for line in added {
                out.push('+');
                out.push_str(line);
                out.push('\n');
            }
        }
        return out;
    }

    let total = target_lines.len();
    let by_line: BTreeMap<usize, &Placement> =
        placements.iter().map(|p| (p.line, p)).collect();

    // Merge context windows that overlap or abut into single hunks.
    let mut groups: Vec<(usize, usize, Vec<&Placement>)> = Vec::new();
    for placement in placements {
        let start = placement.line.saturating_sub(CONTEXT_LINES).max(1);
        let end = (placement.line + CONTEXT_LINES).min(total);
        match groups.last_mut() {
            Some((_, group_end, members)) if start <= *group_end + 1 => {
                *group_end = (*group_end).max(end);
                members.push(placement);
            }
            _ => groups.push((start, end, vec![placement])),
        }
    }

    let mut offset: isize = 0;
    for (start, end, members) in groups {
        let old_count = end - start + 1;
        let delta: isize = members.iter().map(|p| p.delta()).sum();
        let new_count = (old_count as isize + delta) as usize;
        let new_start = (start as isize + offset) as usize;

        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            start, old_count, new_start, new_count
        ));

        for line_no in start..=end {
            let old_line = &target_lines[line_no - 1];
            match by_line.get(&line_no).map(|p| &p.kind) {
                Some(PlacementKind::Replace { added }) => {
                    out.push('-');
                    out.push_str(old_line);
                    out.push('\n');
                    for add in added {
                        out.push('+');
                        out.push_str(add);
                        out.push('\n');
                    }
                }
                Some(PlacementKind::Delete) => {
                    out.push('-');
                    out.push_str(old_line);
                    out.push('\n');
                }
                Some(PlacementKind::InsertAfter { added }) => {
                    out.push(' ');
                    out.push_str(old_line);
                    out.push('\n');
                    for add in added {
                        out.push('+');
                        out.push_str(add);
                        out.push('\n');
                    }
                }
                Some(PlacementKind::InsertBefore { added }) => {
                    for add in added {
                        out.push('+');
                        out.push_str(add);
                        out.push('\n');
                    }
                    out.push(' ');
                    out.push_str(old_line);
                    out.push('\n');
                }
                None => {
                    out.push(' ');
                    out.push_str(old_line);
                    out.push('\n');
                }
            }
        }

        offset += delta;
    }

    out
}

/// New-file and deleted-file hunks carry their own complete content; the
/// patch is the source hunk with the appropriate headers.
fn passthrough_patch(file_path: &str, hunks: &[&DiffHunk], new_file: bool) -> String {
    let mut out = String::new();
    if new_file {
        out.push_str(&format!("--- /dev/null\n+++ b/{}\n", file_path));
    } else {
        out.push_str(&format!("--- a/{}\n+++ /dev/null\n", file_path));
    }
    for hunk in hunks {
        for line in &hunk.lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunks::HunkParser;

    fn lines(content: &[&str]) -> Vec<String> {
        content.iter().map(|s| s.to_string()).collect()
    }

    fn text_hunks(diff: &str) -> Vec<DiffHunk> {
        HunkParser::parse(diff, false).unwrap()
    }

    #[test]
    fn single_replace_binds_to_lowest_matching_line() {
        let target = lines(&["alpha", "beta", "gamma"]);
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,3 +1,3 @@
 alpha
-beta
+BETA
 gamma
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();
        assert_eq!(
            patch,
            "--- a/f.txt\n+++ b/f.txt\n@@ -1,3 +1,3 @@\n alpha\n-beta\n+BETA\n gamma\n"
        );
    }

    #[test]
    fn dual_identical_edits_claim_distinct_lines() {
        // Two hunks with identical textual content must resolve to two
        // distinct occurrences in the target file.
        let mut content: Vec<String> = (1..=120).map(|i| format!("line {}", i)).collect();
        content[89] = "    #if MICROPY_PY___FILE__".to_string(); // line 90
        content[113] = "    #if MICROPY_PY___FILE__".to_string(); // line 114

        let diff = "\
diff --git a/module.c b/module.c
index 1111111..2222222 100644
--- a/module.c
+++ b/module.c
@@ -89,3 +89,3 @@
 line 89
-    #if MICROPY_PY___FILE__
+    #if MICROPY_MODULE___FILE__
 line 91
@@ -113,3 +113,3 @@
 line 113
-    #if MICROPY_PY___FILE__
+    #if MICROPY_MODULE___FILE__
 line 115
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("module.c", "t", &content, &refs).unwrap();

        assert!(patch.contains("@@ -87,7 +87,7 @@"));
        assert!(patch.contains("@@ -111,7 +111,7 @@"));
        assert_eq!(patch.matches("-    #if MICROPY_PY___FILE__").count(), 2);
        assert_eq!(
            patch.matches("+    #if MICROPY_MODULE___FILE__").count(),
            2
        );
    }

    #[test]
    fn identical_changes_in_one_hunk_walk_forward() {
        let target = lines(&["x", "same", "y", "same", "z"]);
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,5 +1,5 @@
 x
-same
+first
 y
-same
+second
 z
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();

        // One merged hunk covering both changes, in file order.
        assert!(patch.contains("@@ -1,5 +1,5 @@"));
        let first_idx = patch.find("+first").unwrap();
        let second_idx = patch.find("+second").unwrap();
        assert!(first_idx < second_idx);
    }

    #[test]
    fn nearby_changes_merge_into_one_hunk() {
        let target: Vec<String> = (1..=20).map(|i| format!("line {}", i)).collect();
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -4,5 +4,5 @@
 line 4
-line 5
+LINE 5
 line 6
-line 7
+LINE 7
 line 8
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();

        let headers = patch.lines().filter(|l| l.starts_with("@@")).count();
        assert_eq!(headers, 1);
        assert!(patch.contains("@@ -2,9 +2,9 @@"));
    }

    #[test]
    fn distant_changes_stay_separate_hunks() {
        let target: Vec<String> = (1..=40).map(|i| format!("line {}", i)).collect();
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,3 +1,3 @@
-line 1
+LINE 1
 line 2
 line 3
@@ -29,3 +29,3 @@
 line 29
-line 30
+LINE 30
 line 31
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();

        let headers = patch.lines().filter(|l| l.starts_with("@@")).count();
        assert_eq!(headers, 2);
        assert!(patch.contains("@@ -1,4 +1,4 @@"));
        assert!(patch.contains("@@ -27,7 +27,7 @@"));
    }

    #[test]
    fn insertion_anchors_after_context() {
        let target = lines(&["one", "two", "three"]);
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,3 +1,4 @@
 one
+one point five
 two
 three
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();

        assert!(patch.contains("@@ -1,3 +1,4 @@"));
        let one_idx = patch.find(" one\n").unwrap();
        let add_idx = patch.find("+one point five").unwrap();
        assert!(one_idx < add_idx);
    }

    #[test]
    fn deletion_shrinks_new_count() {
        let target = lines(&["a", "b", "c", "d", "e"]);
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,5 +1,4 @@
 a
 b
-c
 d
 e
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();

        assert!(patch.contains("@@ -1,5 +1,4 @@"));
        assert!(patch.contains("-c\n"));
    }

    #[test]
    fn unplaceable_change_is_an_error() {
        let target = lines(&["alpha", "beta"]);
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,2 +1,2 @@
 alpha
-x = 1;
+x = 2;
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let err = generate_patch("f.txt", "t", &target, &refs).unwrap_err();
        match err {
            AutosquashError::UnplaceableChange { file, line, .. } => {
                assert_eq!(file, "f.txt");
                assert_eq!(line, "x = 1;");
            }
            other => panic!("expected UnplaceableChange, got {:?}", other),
        }
    }

    #[test]
    fn comparison_ignores_leading_and_trailing_whitespace() {
        let target = lines(&["\tindent(x);  "]);
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -1,1 +1,1 @@
-  indent(x);
+  indent(y);
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("f.txt", "t", &target, &refs).unwrap();
        // The emitted removal must carry the target file's exact text.
        assert!(patch.contains("-\tindent(x);  \n"));
    }

    #[test]
    fn new_file_hunks_pass_through() {
        let diff = "\
diff --git a/fresh.txt b/fresh.txt
new file mode 100644
index 0000000..1111111
--- /dev/null
+++ b/fresh.txt
@@ -0,0 +1,2 @@
+hello
+world
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let patch = generate_patch("fresh.txt", "t", &[], &refs).unwrap();
        assert!(patch.starts_with("--- /dev/null\n+++ b/fresh.txt\n"));
        assert!(patch.contains("@@ -0,0 +1,2 @@"));
        assert!(patch.contains("+hello"));
    }

    #[test]
    fn determinism_same_inputs_same_patch() {
        let target: Vec<String> = (1..=30).map(|i| format!("line {}", i)).collect();
        let diff = "\
diff --git a/f.txt b/f.txt
index 1111111..2222222 100644
--- a/f.txt
+++ b/f.txt
@@ -9,3 +9,3 @@
 line 9
-line 10
+LINE 10
 line 11
";
        let hunks = text_hunks(diff);
        let refs: Vec<&DiffHunk> = hunks.iter().collect();
        let first = generate_patch("f.txt", "t", &target, &refs).unwrap();
        let second = generate_patch("f.txt", "t", &target, &refs).unwrap();
        assert_eq!(first, second);
    }
}
