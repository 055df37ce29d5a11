//! # Shell Completion Module
//!
//! ```bash
//! # Generate bash completions
//! fluid completion bash > ~/.local/share/bash-completion/completions/fluid
//!
//! # Generate zsh completions
//! fluid completion zsh > ~/.config/zsh/completions/_fluid
//! ```

use clap::Command;
use clap_complete::{generate, Generator};
use std::io::{self, Write};

/// Generate shell completions for the given shell on stdout
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    write_completions(gen, cmd, &mut io::stdout());
}

/// Generate shell completions into any writer
pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;
    use clap_complete::Shell;

    #[test]
    fn test_bash_completion_mentions_commands() {
        let mut buffer = Vec::new();
        write_completions(Shell::Bash, &mut Args::command(), &mut buffer);

        let script = String::from_utf8(buffer).unwrap();
        assert!(script.contains("_fluid"));
        assert!(script.contains("build"));
        assert!(script.contains("import"));
    }
}
