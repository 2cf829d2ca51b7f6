use std::io;

use thiserror::Error;

/// Failures of the pipeline machinery itself.
///
/// None of these end the interpreter: the executor reports them, stops
/// building further stages and still reaps whatever it already started.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cannot duplicate standard {stream}: {source}")]
    Duplicate {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot redirect standard {stream}: {source}")]
    Install {
        stream: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("cannot create pipe: {0}")]
    Pipe(#[source] nix::Error),

    #[error("{path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: nix::Error,
    },

    #[error("cannot flush standard output: {0}")]
    Flush(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
