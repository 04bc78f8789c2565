use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::sync::atomic::AtomicBool;

use crate::approval::{
    view_for, ApprovalOutcome, Approver, AutoAcceptApprover, ConsoleApprover, Decision,
};
use crate::config::{Config, StrategyChoice};
use crate::context::Context;
use crate::error::AutosquashError;
use crate::git::status::WorkingTreeState;
use crate::hunks::{DiffHunk, HunkKind, HunkParser};
use crate::logging::info_log;
use crate::patch::{generate_patch, GeneratedPatch};
use crate::rebase::{ConflictChoice, ConflictHandler, PatchGroup, RebasePlan};
use crate::resolver::HunkTargetResolver;
use crate::strategy::{self, ExecutionOutcome};

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

pub struct CliOptions {
    pub line_by_line: bool,
    pub auto_accept: bool,
    pub strategy: Option<StrategyChoice>,
}

/// Run the whole flow; translate failures into the exit-code mapping and
/// a taxonomy-tagged report on stderr.
pub fn run(opts: &CliOptions, interrupt: &AtomicBool) -> i32 {
    match try_run(opts, interrupt) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error ({}): {}", e.kind(), e);
            e.exit_code()
        }
    }
}

fn try_run(opts: &CliOptions, interrupt: &AtomicBool) -> Result<i32, AutosquashError> {
    let ctx = Context::discover()?;
    println!("Current branch: {}", ctx.branch);
    println!("Merge base: {}", ctx.merge_base);

    let state = ctx.repo.working_tree_state()?;
    match state {
        WorkingTreeState::Clean => {
            println!("Working tree is clean, nothing to do");
            return Ok(EXIT_OK);
        }
        WorkingTreeState::Mixed if !opts.auto_accept => {
            if !confirm_mixed_state()? {
                println!("Operation cancelled");
                return Ok(EXIT_CANCELLED);
            }
        }
        _ => {}
    }

    // Phase 1: parse the working-tree diff into hunks.
    let diff = ctx.repo.diff_from_head()?;
    let hunks = HunkParser::parse(&diff, opts.line_by_line)?;
    for hunk in &hunks {
        ctx.repo.validate_repo_path(&hunk.file_path)?;
    }

    let text_hunks: Vec<DiffHunk> = hunks
        .into_iter()
        .filter(|h| {
            matches!(
                h.kind,
                HunkKind::Text | HunkKind::NewFile | HunkKind::DeletedFile
            )
        })
        .collect();

    if text_hunks.is_empty() {
        println!("No changes found to process");
        return Ok(EXIT_OK);
    }
    println!("Found {} hunks to process", text_hunks.len());

    // Phase 2: resolve each hunk to a target commit.
    let mut resolver = HunkTargetResolver::new(&ctx.repo, ctx.merge_base.clone());
    let mappings = resolver.resolve_targets(&text_hunks)?;

    let views: Vec<_> = mappings
        .iter()
        .map(|m| {
            let display = match &m.target_commit {
                Some(target) => resolver.batch_mut().commit_display(target),
                None => "(no target)".to_string(),
            };
            view_for(m, display)
        })
        .collect();

    // Phase 3: hand the proposals to the approval collaborator.
    let mut approver: Box<dyn Approver> = if opts.auto_accept {
        Box::new(AutoAcceptApprover)
    } else {
        Box::new(ConsoleApprover)
    };
    let decisions = match approver.review(&views)? {
        ApprovalOutcome::Cancelled => return Ok(EXIT_CANCELLED),
        ApprovalOutcome::Decisions(decisions) => decisions,
    };

    let mut approved: Vec<(&DiffHunk, String)> = Vec::new();
    let mut ignored = 0usize;
    for (mapping, decision) in mappings.iter().zip(decisions) {
        match decision {
            Decision::Approve => match &mapping.target_commit {
                Some(target) => {
                    resolver.confirm_target(&mapping.hunk.file_path, target);
                    approved.push((mapping.hunk, target.clone()));
                }
                None => ignored += 1,
            },
            Decision::Override(target) => {
                resolver.confirm_target(&mapping.hunk.file_path, &target);
                approved.push((mapping.hunk, target));
            }
            Decision::Ignore => ignored += 1,
        }
    }

    if approved.is_empty() {
        println!("No hunks approved; nothing to do");
        return Ok(EXIT_OK);
    }

    // Modifying anything below the merge base is never allowed.
    let scope = resolver.batch_mut().branch_commit_set()?;
    for (_, target) in &approved {
        if !scope.contains(target) {
            return Err(AutosquashError::Precondition(format!(
                "target commit {} is outside the branch scope",
                target
            )));
        }
    }

    // Phase 4: rewrite each approved hunk against its target commit.
    let patches = generate_patches(&ctx, approved)?;
    info_log(&format!("generated {} patches", patches.len()));

    let mut groups: BTreeMap<String, Vec<GeneratedPatch>> = BTreeMap::new();
    for patch in patches {
        groups.entry(patch.target.clone()).or_default().push(patch);
    }
    let plan = RebasePlan {
        merge_base: ctx.merge_base.clone(),
        branch_ref: ctx.branch_ref.clone(),
        head: ctx.head.clone(),
        groups: groups
            .into_iter()
            .map(|(target, patches)| PatchGroup { target, patches })
            .collect(),
    };

    // Phase 5: pick a strategy and execute.
    let choice = opts.strategy.unwrap_or_else(|| Config::get().strategy());
    let kind = strategy::select_strategy(&ctx.repo, choice, &plan);

    let mut console_handler = ConsoleConflictHandler;
    let mut abort_handler = crate::rebase::AbortOnConflict;
    let handler: &mut dyn ConflictHandler = if opts.auto_accept {
        &mut abort_handler
    } else {
        &mut console_handler
    };

    match strategy::execute(kind, &ctx.repo, &plan, handler, interrupt)? {
        ExecutionOutcome::Applied { new_head, skipped } => {
            println!(
                "Squash complete: branch now at {}",
                &new_head[..12.min(new_head.len())]
            );
            if ignored > 0 {
                println!("{} hunk(s) left in the working tree", ignored);
            }
            for target in &skipped {
                println!(
                    "fixup for {} skipped at a conflict; its changes remain in the working tree",
                    &target[..12.min(target.len())]
                );
            }
            Ok(EXIT_OK)
        }
        ExecutionOutcome::Aborted { reason } => {
            eprintln!("error (rebase_conflict): {}; all changes rolled back", reason);
            Ok(EXIT_FAILURE)
        }
    }
}

fn generate_patches(
    ctx: &Context,
    approved: Vec<(&DiffHunk, String)>,
) -> Result<Vec<GeneratedPatch>, AutosquashError> {
    // Group hunks by (file, target); BTreeMap keeps output deterministic.
    let mut by_group: BTreeMap<(String, String), Vec<&DiffHunk>> = BTreeMap::new();
    for (hunk, target) in approved {
        by_group
            .entry((hunk.file_path.clone(), target))
            .or_default()
            .push(hunk);
    }

    let mut patches = Vec::new();
    for ((file, target), mut hunks) in by_group {
        hunks.sort_by_key(|h| h.old_start);

        let target_lines: Vec<String> = match ctx.repo.show_file(&target, &file)? {
            Some(bytes) => String::from_utf8_lossy(&bytes)
                .lines()
                .map(|l| l.to_string())
                .collect(),
            None => Vec::new(),
        };

        let diff_text = generate_patch(&file, &target, &target_lines, &hunks)?;

        // Every generated patch must apply cleanly to the target state.
        ctx.repo
            .check_patch_against(&target, &diff_text)
            .map_err(|e| match e {
                AutosquashError::GitCliError { stderr, .. } => AutosquashError::PatchReject {
                    file: file.clone(),
                    target: target.clone(),
                    stderr,
                },
                other => other,
            })?;

        patches.push(GeneratedPatch {
            file_path: file,
            target,
            diff_text,
        });
    }
    Ok(patches)
}

fn confirm_mixed_state() -> Result<bool, AutosquashError> {
    println!("\nMixed staged and unstaged changes detected.");
    println!("  a) Process all changes (staged + unstaged)");
    println!("  q) Quit");
    loop {
        print!("Your choice [a/q]: ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        match answer.trim().to_lowercase().as_str() {
            "a" => return Ok(true),
            "q" => return Ok(false),
            _ => println!("Please enter a or q"),
        }
    }
}

/// Interactive conflict prompt: the user resolves by hand and continues,
/// skips the fixup, or aborts the whole run.
struct ConsoleConflictHandler;

impl ConflictHandler for ConsoleConflictHandler {
    fn on_conflict(&mut self, commit: &str, files: &[String]) -> ConflictChoice {
        println!("\nRebase conflict at {} in:", commit);
        for file in files {
            println!("  {}", file);
        }
        println!("Resolve the conflicts, then choose:");
        println!("  c) continue  s) skip this fixup  a) abort");
        loop {
            print!("Your choice [c/s/a]: ");
            let _ = io::stdout().flush();
            let mut answer = String::new();
            if io::stdin().lock().read_line(&mut answer).is_err() {
                return ConflictChoice::Abort;
            }
            match answer.trim().to_lowercase().as_str() {
                "c" => return ConflictChoice::Continue,
                "s" => return ConflictChoice::Skip,
                "a" => return ConflictChoice::Abort,
                _ => println!("Please enter c, s, or a"),
            }
        }
    }
}
