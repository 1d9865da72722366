use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "ec2dev")]
#[command(version)]
#[command(about = "Toggle a dev EC2 instance and keep ~/.ssh/config pointed at it", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Defaults to `toggle` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Toggle the instance state (start <-> stop) and reconcile the SSH config
    Toggle(ToggleArgs),

    /// Show the instance's current state without changing anything
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Default)]
pub struct ToggleArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
