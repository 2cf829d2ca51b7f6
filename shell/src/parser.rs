//! Splitting of an input line into pipeline stages.
//!
//! The grammar is deliberately rigid: stages are separated by the literal
//! `" | "` token, the output target of a stage follows the first `" > "`, and
//! fields are separated by single spaces. There is no quoting.

/// Separator between two pipeline stages.
pub const PIPE_DELIMITER: &str = " | ";

/// Separator between a stage's command text and its output file.
pub const REDIRECT_DELIMITER: &str = " > ";

/// One command of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// The command name, i.e. the first field of the stage.
    pub name: String,
    /// Every field of the stage, the command name included (`args[0] == name`).
    pub args: Vec<String>,
    /// File that receives the stage's standard output, if any.
    pub output_redirect: Option<String>,
}

impl Stage {
    /// Arguments that follow the command name.
    pub fn operands(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }
}

/// Split a raw input line into the texts of its pipeline stages.
///
/// A line without a `" | "` delimiter yields a single stage. The empty line
/// yields no stage at all, which callers treat as "nothing to do".
pub fn split_pipeline(line: &str) -> Vec<String> {
    if line.is_empty() {
        return Vec::new();
    }
    line.split(PIPE_DELIMITER).map(str::to_owned).collect()
}

/// Parse one stage text into a [`Stage`].
///
/// Only the first `" > "` is consumed; everything after it is the target path.
pub fn split_stage(text: &str) -> Stage {
    let (command, output_redirect) = match text.split_once(REDIRECT_DELIMITER) {
        Some((command, target)) => (command, Some(target.to_owned())),
        None => (text, None),
    };

    let args: Vec<String> = command.split(' ').map(str::to_owned).collect();
    let name = args.first().cloned().unwrap_or_default();

    Stage {
        name,
        args,
        output_redirect,
    }
}
