use crate::builtin::{BuiltinEntry, BuiltinRegistry};
use nix::sys::wait::WaitStatus;

/// Status of a stage or pipeline as the shell reports it; 0 is success.
pub type ExitCode = i32;

pub const EXIT_SUCCESS: ExitCode = 0;
pub const EXIT_FAILURE: ExitCode = 1;
/// The program was found but could not be executed.
pub const EXIT_CANNOT_EXECUTE: ExitCode = 126;
/// The program could not be found on the search path.
pub const EXIT_NOT_FOUND: ExitCode = 127;

/// How a stage's command name is carried out.
#[derive(Debug, Clone, Copy)]
pub enum CommandKind<'r> {
    Builtin(&'r BuiltinEntry),
    External,
}

impl<'r> CommandKind<'r> {
    /// Builtins shadow programs of the same name.
    pub fn resolve(registry: &'r BuiltinRegistry, name: &str) -> Self {
        match registry.lookup(name) {
            Some(entry) => CommandKind::Builtin(entry),
            None => CommandKind::External,
        }
    }
}

/// Exit code of a reaped child, `128 + signal` when it was killed.
pub fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => EXIT_FAILURE,
    }
}
