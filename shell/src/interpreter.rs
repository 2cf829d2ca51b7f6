use crate::builtin::BuiltinRegistry;
use crate::command::{EXIT_SUCCESS, ExitCode};
use crate::config::Config;
use crate::env::Environment;
use crate::parser;
use crate::pipeline::PipelineExecutor;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};

/// Line that ends the session.
const EXIT_LINE: &str = "exit";

/// A minimal shell that runs pipelines of built-in and external commands.
///
/// The interpreter owns the session [`Environment`], the builtin table and the
/// configuration; every line is executed to completion before the next one
/// is read.
///
/// Example
/// ```no_run
/// use shello::{Config, Interpreter};
/// let mut sh = Interpreter::new(Config::default());
/// let code = sh.run_line("version");
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    registry: BuiltinRegistry,
    config: Config,
}

impl Interpreter {
    pub fn new(config: Config) -> Self {
        Self::with_environment(config, Environment::new())
    }

    pub fn with_environment(config: Config, env: Environment) -> Self {
        Self {
            env,
            registry: BuiltinRegistry::default(),
            config,
        }
    }

    /// Run one input line and return the exit status of its last stage.
    ///
    /// `exit` only marks the session as finished; the empty line does nothing.
    pub fn run_line(&mut self, line: &str) -> ExitCode {
        if line == EXIT_LINE {
            self.env.should_exit = true;
            return EXIT_SUCCESS;
        }

        let stages = parser::split_pipeline(line);
        if stages.is_empty() {
            return EXIT_SUCCESS;
        }
        PipelineExecutor::new(&self.registry, &mut self.env).execute(&stages)
    }

    /// Run `lines` in order until one of them is `exit`.
    ///
    /// Returns the status of the last line that ran.
    pub fn run_commands<S: AsRef<str>>(&mut self, lines: &[S]) -> ExitCode {
        let mut status = EXIT_SUCCESS;
        for line in lines {
            status = self.run_line(line.as_ref());
            if self.env.should_exit {
                break;
            }
        }
        status
    }

    /// The prompt line: the cached working directory followed by the configured prompt.
    pub fn prompt(&mut self) -> String {
        format!("[{}] {}", self.env.working_directory(), self.config.prompt)
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Read-Eval-Print Loop over the terminal.
    ///
    /// Ends on `exit`, end of input or an interrupt.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            println!();
            let prompt = self.prompt();
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    let code = self.run_line(&line);
                    log::debug!("{line:?} exited with {code}");
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}
