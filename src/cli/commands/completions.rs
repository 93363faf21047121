//! Shell completions command.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell as Target};

use crate::cli::{Cli, Shell};
use crate::error::Result;

/// Write completions for the `craft` binary to stdout.
///
/// # Errors
///
/// Infallible; returns `Result` to match the other commands.
pub fn execute(shell: &Shell) -> Result<()> {
    let target = match shell {
        Shell::Bash => Target::Bash,
        Shell::Zsh => Target::Zsh,
        Shell::Fish => Target::Fish,
        Shell::PowerShell => Target::PowerShell,
        Shell::Elvish => Target::Elvish,
    };
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(target, &mut cmd, name, &mut io::stdout());
    Ok(())
}
