use std::io::{self, BufRead, Write};

use crate::error::AutosquashError;
use crate::resolver::{Confidence, HunkTargetMapping};

/// What the user (or policy) decided for one proposed mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Override(String),
    Ignore,
}

/// One reviewable row: the mapping plus display strings the collaborator
/// can show without talking to git itself.
pub struct MappingView {
    pub file_path: String,
    pub line_summary: String,
    pub target_display: String,
    pub confidence: Confidence,
    pub source: &'static str,
    pub needs_user_confirmation: bool,
    pub preview: Vec<String>,
}

pub enum ApprovalOutcome {
    Decisions(Vec<Decision>),
    Cancelled,
}

/// The approval collaborator. The core behaves identically whether this
/// is a console prompt, a script, or the auto-accept policy.
pub trait Approver {
    fn review(&mut self, views: &[MappingView]) -> Result<ApprovalOutcome, AutosquashError>;
}

pub fn view_for(mapping: &HunkTargetMapping<'_>, target_display: String) -> MappingView {
    let hunk = mapping.hunk;
    let end = hunk.new_start + hunk.new_count.saturating_sub(1);
    let preview: Vec<String> = hunk.body().iter().take(3).cloned().collect();
    MappingView {
        file_path: hunk.file_path.clone(),
        line_summary: format!("{}-{}", hunk.new_start, end),
        target_display,
        confidence: mapping.confidence,
        source: mapping.source.as_str(),
        needs_user_confirmation: mapping.needs_user_confirmation,
        preview,
    }
}

/// Accepts only high-confidence blame matches; everything else stays in
/// the working tree.
pub struct AutoAcceptApprover;

impl Approver for AutoAcceptApprover {
    fn review(&mut self, views: &[MappingView]) -> Result<ApprovalOutcome, AutosquashError> {
        let decisions = views
            .iter()
            .map(|view| {
                if view.confidence == Confidence::High && !view.needs_user_confirmation {
                    Decision::Approve
                } else {
                    Decision::Ignore
                }
            })
            .collect();
        Ok(ApprovalOutcome::Decisions(decisions))
    }
}

/// Plain y/n/q console review, one mapping at a time.
pub struct ConsoleApprover;

impl Approver for ConsoleApprover {
    fn review(&mut self, views: &[MappingView]) -> Result<ApprovalOutcome, AutosquashError> {
        let stdin = io::stdin();
        let mut decisions = Vec::with_capacity(views.len());

        println!("\nReview hunk → commit mappings:");
        println!("{}", "=".repeat(60));

        for (i, view) in views.iter().enumerate() {
            println!("\n[{}/{}] {}", i + 1, views.len(), view.file_path);
            println!("  Lines: {}", view.line_summary);
            println!("  Target: {}", view.target_display);
            println!(
                "  Confidence: {} ({})",
                view.confidence.as_str(),
                view.source
            );
            for line in &view.preview {
                println!("  {}", line);
            }

            loop {
                print!("\nApprove this mapping? [y/n/q]: ");
                io::stdout().flush()?;
                let mut answer = String::new();
                stdin.lock().read_line(&mut answer)?;
                match answer.trim().to_lowercase().as_str() {
                    "y" => {
                        decisions.push(Decision::Approve);
                        break;
                    }
                    "n" => {
                        decisions.push(Decision::Ignore);
                        break;
                    }
                    "q" => {
                        println!("Operation cancelled");
                        return Ok(ApprovalOutcome::Cancelled);
                    }
                    _ => println!("Please enter y, n, or q"),
                }
            }
        }

        Ok(ApprovalOutcome::Decisions(decisions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(confidence: Confidence, needs_confirmation: bool) -> MappingView {
        MappingView {
            file_path: "a.c".to_string(),
            line_summary: "1-3".to_string(),
            target_display: "abcd1234 subject".to_string(),
            confidence,
            source: "blame_match",
            needs_user_confirmation: needs_confirmation,
            preview: Vec::new(),
        }
    }

    #[test]
    fn auto_accept_takes_only_confirmed_high_confidence() {
        let views = vec![
            view(Confidence::High, false),
            view(Confidence::High, true),
            view(Confidence::Medium, true),
            view(Confidence::Low, true),
        ];
        let mut approver = AutoAcceptApprover;
        let ApprovalOutcome::Decisions(decisions) = approver.review(&views).unwrap() else {
            panic!("auto-accept never cancels");
        };
        assert_eq!(
            decisions,
            vec![
                Decision::Approve,
                Decision::Ignore,
                Decision::Ignore,
                Decision::Ignore,
            ]
        );
    }
}
