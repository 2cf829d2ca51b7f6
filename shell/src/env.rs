use std::collections::HashMap;
use std::env as stdenv;
use std::io;
use std::path::Path;

/// Session state of the interpreter.
///
/// The environment contains:
/// - `vars`: variables consulted by builtins (e.g. `HOME` for a bare `cd`).
/// - the cached working directory shown by the prompt.
/// - `should_exit`: set by the `exit` line so the driving loop can stop.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
    cwd: Option<String>,
}

impl Environment {
    /// Capture the current process variables into a new `Environment`.
    ///
    /// The working directory cache starts empty and is filled on first read.
    pub fn new() -> Self {
        Self {
            vars: stdenv::vars().collect(),
            should_exit: false,
            cwd: None,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The cached absolute working directory, read from the process on first use.
    pub fn working_directory(&mut self) -> &str {
        self.cwd.get_or_insert_with(|| match stdenv::current_dir() {
            Ok(dir) => dir.to_string_lossy().into_owned(),
            Err(e) => {
                log::warn!("cannot read working directory: {e}");
                String::new()
            }
        })
    }

    /// Change the process working directory and refresh the cache.
    ///
    /// The cache is left as it was when the change fails.
    pub fn change_directory(&mut self, target: &Path) -> io::Result<()> {
        stdenv::set_current_dir(target)?;
        let current = stdenv::current_dir()?;
        self.cwd = Some(current.to_string_lossy().into_owned());
        log::debug!("working directory is now {}", current.display());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn cached_directory(&self) -> Option<&str> {
        self.cwd.as_deref()
    }
}
