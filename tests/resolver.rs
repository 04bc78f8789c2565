mod repos;

use repos::test_repo::TestRepo;

use git_autosquash::git::status::WorkingTreeState;
use git_autosquash::hunks::HunkParser;
use git_autosquash::resolver::{Confidence, HunkTargetResolver, TargetSource};

fn numbered_lines(count: usize) -> String {
    (1..=count)
        .map(|i| format!("line {}\n", i))
        .collect::<String>()
}

/// Base commit on main, then a feature branch; returns the merge base.
fn setup_feature_branch(repo: &TestRepo) -> String {
    repo.write_file("README.md", "# test\n");
    let base = repo.commit_all("initial commit");
    repo.checkout_new_branch("feature");
    base
}

#[test]
fn clean_tree_reports_clean_state() {
    let test_repo = TestRepo::new();
    setup_feature_branch(&test_repo);
    let repo = test_repo.repo();
    assert_eq!(repo.working_tree_state().unwrap(), WorkingTreeState::Clean);
}

#[test]
fn in_progress_merge_is_detected() {
    let test_repo = TestRepo::new();
    setup_feature_branch(&test_repo);
    let repo = test_repo.repo();
    assert_eq!(repo.operation_in_progress(), None);

    let head = test_repo.head();
    std::fs::write(repo.path().join("MERGE_HEAD"), format!("{}\n", head)).unwrap();
    assert_eq!(repo.operation_in_progress(), Some("merge"));
}

#[test]
fn detached_head_has_no_branch() {
    let test_repo = TestRepo::new();
    setup_feature_branch(&test_repo);
    let head = test_repo.head();
    test_repo.checkout(&head);

    let repo = test_repo.repo();
    assert_eq!(repo.current_branch().unwrap(), None);
}

#[test]
fn unique_blame_yields_high_confidence_match() {
    let test_repo = TestRepo::new();
    test_repo.write_file("a.c", &numbered_lines(8));
    test_repo.commit_all("initial commit");
    test_repo.checkout_new_branch("feature");

    let mut content = numbered_lines(8);
    content = content.replace("line 4\n", "feature line 4\n");
    test_repo.write_file("a.c", &content);
    let target = test_repo.commit_all("feature touches line 4");

    // Working tree edits the same line again.
    let content = content.replace("feature line 4\n", "reworked line 4\n");
    test_repo.write_file("a.c", &content);

    let repo = test_repo.repo();
    let merge_base = repo.merge_base("main", "HEAD").unwrap().unwrap();
    let diff = repo.diff_from_head().unwrap();
    let hunks = HunkParser::parse(&diff, false).unwrap();
    assert_eq!(hunks.len(), 1);

    let mut resolver = HunkTargetResolver::new(&repo, merge_base);
    let mappings = resolver.resolve_targets(&hunks).unwrap();

    assert_eq!(mappings.len(), 1);
    let mapping = &mappings[0];
    assert_eq!(mapping.source, TargetSource::BlameMatch);
    assert_eq!(mapping.confidence, Confidence::High);
    assert!(!mapping.needs_user_confirmation);
    assert_eq!(mapping.target_commit.as_deref(), Some(target.as_str()));
}

#[test]
fn later_hunk_in_same_file_reuses_earlier_target() {
    let test_repo = TestRepo::new();
    test_repo.write_file("b.c", &numbered_lines(20));
    test_repo.commit_all("initial commit");
    test_repo.checkout_new_branch("feature");

    // The feature commit touches line 2 only.
    let mut content = numbered_lines(20);
    content = content.replace("line 2\n", "feature line 2\n");
    test_repo.write_file("b.c", &content);
    let target = test_repo.commit_all("feature touches line 2");

    // Working tree: one hunk on the feature line, one far away on a line
    // that predates the branch.
    let content = content
        .replace("feature line 2\n", "reworked line 2\n")
        .replace("line 14\n", "reworked line 14\n");
    test_repo.write_file("b.c", &content);

    let repo = test_repo.repo();
    let merge_base = repo.merge_base("main", "HEAD").unwrap().unwrap();
    let diff = repo.diff_from_head().unwrap();
    let hunks = HunkParser::parse(&diff, false).unwrap();
    assert_eq!(hunks.len(), 2, "edits far apart should stay separate hunks");

    let mut resolver = HunkTargetResolver::new(&repo, merge_base);
    let mappings = resolver.resolve_targets(&hunks).unwrap();

    assert_eq!(mappings[0].source, TargetSource::BlameMatch);
    assert_eq!(mappings[0].confidence, Confidence::High);
    assert_eq!(mappings[0].target_commit.as_deref(), Some(target.as_str()));

    // The second hunk has no in-scope blame of its own and inherits the
    // file's confirmed target as a consistency fallback.
    assert_eq!(mappings[1].source, TargetSource::FallbackConsistency);
    assert_eq!(mappings[1].confidence, Confidence::Medium);
    assert!(mappings[1].needs_user_confirmation);
    assert_eq!(mappings[1].target_commit.as_deref(), Some(target.as_str()));
}

#[test]
fn out_of_scope_blame_falls_back_to_file_history() {
    let test_repo = TestRepo::new();
    test_repo.write_file("c.c", &numbered_lines(6));
    test_repo.commit_all("initial commit");
    test_repo.checkout_new_branch("feature");

    // Branch work that never touches c.c.
    test_repo.write_file("other.txt", "unrelated\n");
    let branch_commit = test_repo.commit_all("unrelated feature work");

    // Working tree edits a line whose provenance is below the merge base.
    let content = numbered_lines(6).replace("line 3\n", "edited line 3\n");
    test_repo.write_file("c.c", &content);

    let repo = test_repo.repo();
    let merge_base = repo.merge_base("main", "HEAD").unwrap().unwrap();
    let diff = repo.diff_from_head().unwrap();
    let hunks = HunkParser::parse(&diff, false).unwrap();

    let mut resolver = HunkTargetResolver::new(&repo, merge_base);
    let mappings = resolver.resolve_targets(&hunks).unwrap();

    assert_eq!(mappings.len(), 1);
    let mapping = &mappings[0];
    assert_eq!(mapping.source, TargetSource::FallbackFileHistory);
    assert_eq!(mapping.confidence, Confidence::Low);
    assert!(mapping.needs_user_confirmation);
    assert!(!mapping.fallback_candidates.is_empty());
    assert_eq!(mapping.fallback_candidates[0], branch_commit);
}

#[test]
fn staged_new_file_offers_recent_branch_commits() {
    let test_repo = TestRepo::new();
    setup_feature_branch(&test_repo);

    test_repo.write_file("feature.txt", "work\n");
    let first = test_repo.commit_all("first branch commit");
    test_repo.write_file("feature.txt", "more work\n");
    let second = test_repo.commit_all("second branch commit");

    // A brand-new staged file has no blame history at all.
    test_repo.write_file("brand_new.txt", "fresh content\n");
    test_repo.git(&["add", "brand_new.txt"]);

    let repo = test_repo.repo();
    let merge_base = repo.merge_base("main", "HEAD").unwrap().unwrap();
    let diff = repo.diff_from_head().unwrap();
    let hunks = HunkParser::parse(&diff, false).unwrap();
    assert_eq!(hunks.len(), 1);

    let mut resolver = HunkTargetResolver::new(&repo, merge_base);
    let mappings = resolver.resolve_targets(&hunks).unwrap();

    let mapping = &mappings[0];
    assert_eq!(mapping.source, TargetSource::FallbackNewFile);
    assert!(mapping.needs_user_confirmation);
    // Most recent first.
    assert_eq!(mapping.fallback_candidates[0], second);
    assert!(mapping.fallback_candidates.contains(&first));
}

#[test]
fn repeated_resolution_is_deterministic() {
    let test_repo = TestRepo::new();
    test_repo.write_file("d.c", &numbered_lines(10));
    test_repo.commit_all("initial commit");
    test_repo.checkout_new_branch("feature");

    let content = numbered_lines(10).replace("line 5\n", "feature line 5\n");
    test_repo.write_file("d.c", &content);
    test_repo.commit_all("feature touches line 5");

    let edited = content.replace("feature line 5\n", "reworked line 5\n");
    test_repo.write_file("d.c", &edited);

    let repo = test_repo.repo();
    let merge_base = repo.merge_base("main", "HEAD").unwrap().unwrap();
    let diff = repo.diff_from_head().unwrap();
    let hunks = HunkParser::parse(&diff, false).unwrap();

    let run = |hunks: &[git_autosquash::hunks::DiffHunk]| {
        let mut resolver = HunkTargetResolver::new(&repo, merge_base.clone());
        resolver
            .resolve_targets(hunks)
            .unwrap()
            .into_iter()
            .map(|m| (m.target_commit, m.source, m.confidence))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(&hunks), run(&hunks));
}
