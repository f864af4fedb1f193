mod changes;
mod commit;
mod config;
mod event;
mod github;
mod process;
mod workflow;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::workflow::{Outcome, Workflow};

/// pr-autocommit: pushes local fixes back to a pull request branch from a
/// GitHub Actions run, or requests changes on the pull request.
#[derive(Parser, Debug)]
#[command(name = "pr-autocommit", version, about)]
struct Cli {
    /// Directory the status command runs in. Changed files are read from the
    /// root of the repository containing it.
    #[arg(long, global = true, default_value = ".")]
    workdir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Commit modified tracked files to the PR head branch through the API
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Post a "request changes" review and fail the run
    Reject {
        /// Review body
        #[arg(short, long)]
        message: String,
    },
    /// List the files changed in the pull request
    Files,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;
    let event = event::Event::load(&config)?;
    let api = github::GitHubClient::new(&config)?;
    let executor = process::ShellExecutor::in_dir(&cli.workdir);

    let workflow = Workflow::new(event, &api, &executor, &cli.workdir)?;
    let _main_span = info_span!("pr_autocommit", repo = %workflow.repo()).entered();
    debug!(command = ?cli.command, workdir = %cli.workdir.display(), "starting");

    let outcome = match cli.command {
        Command::Commit { message } => workflow.commit_changes(&message).await?,
        Command::Reject { message } => workflow.reject_pr(&message).await?,
        Command::Files => {
            for file in workflow.files_in_pr().await? {
                println!("{}", file);
            }
            return Ok(ExitCode::SUCCESS);
        }
    };

    print_outcome(&outcome);
    Ok(outcome.exit_code())
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Clean => println!("{}", "No changes to commit.".green()),
        Outcome::Committed { chain, files } => {
            println!(
                "{} {} ({} file{})",
                "Committed".green().bold(),
                chain.new_commit,
                files.len(),
                if files.len() == 1 { "" } else { "s" }
            );
            for file in files {
                println!("  • {}", file);
            }
        }
        Outcome::Rejected { pr_number } => {
            println!("{} on PR #{}", "Requested changes".red().bold(), pr_number)
        }
    }
}
