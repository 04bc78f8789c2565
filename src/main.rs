use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;

use git_autosquash::app::{self, CliOptions};
use git_autosquash::config::StrategyChoice;

#[derive(Parser)]
#[command(name = "git-autosquash")]
#[command(version)]
#[command(about = "Automatically squash working-tree changes back into the commits that introduced them", long_about = None)]
struct Cli {
    /// Split changes line-by-line instead of using git's natural hunks
    #[arg(long)]
    line_by_line: bool,

    /// Skip the interactive review; accept only high-confidence blame
    /// matches and leave everything else in the working tree
    #[arg(long)]
    auto_accept: bool,

    /// Execution strategy (overrides GIT_AUTOSQUASH_STRATEGY)
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<StrategyChoice>,
}

fn parse_strategy(input: &str) -> Result<StrategyChoice, String> {
    StrategyChoice::from_str(input)
        .ok_or_else(|| format!("unknown strategy '{}' (worktree|index|auto)", input))
}

fn main() {
    let cli = Cli::parse();

    // SIGINT/SIGTERM only raise a flag; mutation points consult it and
    // run the strategy rollback before exiting.
    let interrupt = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&interrupt)) {
            eprintln!("warning: could not register signal handler: {}", e);
        }
    }

    let opts = CliOptions {
        line_by_line: cli.line_by_line,
        auto_accept: cli.auto_accept,
        strategy: cli.strategy,
    };

    std::process::exit(app::run(&opts, &interrupt));
}
