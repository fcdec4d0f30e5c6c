//! Completions command implementation

use clap::CommandFactory;
use clap_complete::generate;
use std::io;

use crate::cli::{Cli, CompletionsArgs};

/// Handle `rotor completions` command
pub fn handle_completions(args: &CompletionsArgs) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_complete::Shell;

    #[test]
    fn test_completions_args_construct() {
        let _args = CompletionsArgs { shell: Shell::Bash };
        let _args = CompletionsArgs { shell: Shell::Zsh };
        // Output goes to stdout; generation is exercised manually via
        // `rotor completions bash > /tmp/test.sh`.
    }
}
