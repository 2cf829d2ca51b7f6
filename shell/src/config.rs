use argh::FromArgs;

/// Prompt shown after the working directory.
pub const DEFAULT_PROMPT: &str = ">>> ";

#[derive(FromArgs, Debug)]
/// A small interactive shell with pipelines and output redirection.
pub struct Args {
    #[argh(option, short = 'c')]
    /// run LINE instead of reading from the terminal; may be repeated, lines run in order.
    pub command: Vec<String>,

    #[argh(option, default = "String::from(DEFAULT_PROMPT)")]
    /// text shown after the working directory when prompting.
    pub prompt: String,
}

/// Settings of one interpreter session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    /// Lines to run non-interactively; empty means read from the terminal.
    pub commands: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_owned(),
            commands: Vec::new(),
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            prompt: args.prompt,
            commands: args.command,
        }
    }
}
