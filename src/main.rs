mod cli;
mod commands;
mod config;
mod poll;
mod provider;
mod runner;
mod ssh_config;
mod transition;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ToggleArgs};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    // Single-shot tool: bare `ec2dev` means toggle
    match cli.command.unwrap_or(Command::Toggle(ToggleArgs::default())) {
        Command::Toggle(args) => commands::toggle::run(&ctx, args.yes),
        Command::Status => commands::status::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ec2dev", &mut io::stdout());
            Ok(())
        }
    }
}
