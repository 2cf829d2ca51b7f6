//! Scoped handles over the descriptors a pipeline rewires.
//!
//! Every descriptor created here is an [`OwnedFd`] opened close-on-exec, so a
//! forked stage only ever inherits fds 0, 1 and 2, and dropping a handle on
//! any path (success or early `?`) releases it.

use crate::error::{Result, ShellError};
use nix::fcntl::OFlag;
use nix::unistd;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Permission bits for files created by redirects and `tee`.
const OUTPUT_FILE_MODE: u32 = 0o600;

/// One of the two standard streams a pipeline rewires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Input,
    Output,
}

impl StdStream {
    fn raw_fd(self) -> RawFd {
        match self {
            StdStream::Input => libc::STDIN_FILENO,
            StdStream::Output => libc::STDOUT_FILENO,
        }
    }

    fn label(self) -> &'static str {
        match self {
            StdStream::Input => "input",
            StdStream::Output => "output",
        }
    }

    /// Close-on-exec duplicate of whatever the stream currently refers to.
    fn duplicate(self) -> Result<OwnedFd> {
        let cloned = match self {
            StdStream::Input => io::stdin().as_fd().try_clone_to_owned(),
            StdStream::Output => io::stdout().as_fd().try_clone_to_owned(),
        };
        cloned.map_err(|source| ShellError::Duplicate {
            stream: self.label(),
            source,
        })
    }
}

/// Point `stream` at `fd`. The handle is consumed and closed, leaving the
/// standard descriptor as the only reference.
pub fn install(fd: OwnedFd, stream: StdStream) -> Result<()> {
    unistd::dup2(fd.as_raw_fd(), stream.raw_fd()).map_err(|source| ShellError::Install {
        stream: stream.label(),
        source,
    })?;
    Ok(())
}

/// A new pipe as `(read end, write end)`.
pub fn pipe() -> Result<(OwnedFd, OwnedFd)> {
    unistd::pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)
}

/// Open `path` for writing, creating it with mode `0600` if needed.
///
/// The file is truncated unless `append` is set.
pub fn open_output(path: impl AsRef<Path>, append: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(OUTPUT_FILE_MODE);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options.open(path)
}

/// Push buffered bytes of the process's stdout to fd 1.
///
/// Must run before fd 1 is repointed and before every fork, otherwise the
/// bytes end up at the wrong target or are written twice.
pub fn flush_stdout() -> Result<()> {
    io::stdout().flush().map_err(ShellError::Flush)
}

/// The shell's own standard input and output, set aside while a pipeline
/// rewires fds 0 and 1.
///
/// Dropping the value points fds 0 and 1 back at the saved descriptors and
/// closes the copies.
#[derive(Debug)]
pub struct SavedStdio {
    stdin: OwnedFd,
    stdout: OwnedFd,
}

impl SavedStdio {
    pub fn capture() -> Result<Self> {
        Ok(Self {
            stdin: StdStream::Input.duplicate()?,
            stdout: StdStream::Output.duplicate()?,
        })
    }

    /// Fresh duplicate of the original standard input.
    pub fn input(&self) -> Result<OwnedFd> {
        self.stdin.try_clone().map_err(|source| ShellError::Duplicate {
            stream: StdStream::Input.label(),
            source,
        })
    }

    /// Fresh duplicate of the original standard output.
    pub fn output(&self) -> Result<OwnedFd> {
        self.stdout.try_clone().map_err(|source| ShellError::Duplicate {
            stream: StdStream::Output.label(),
            source,
        })
    }
}

impl Drop for SavedStdio {
    fn drop(&mut self) {
        if let Err(e) = flush_stdout() {
            log::warn!("{e}");
        }
        for (saved, stream) in [
            (&self.stdin, StdStream::Input),
            (&self.stdout, StdStream::Output),
        ] {
            if let Err(e) = unistd::dup2(saved.as_raw_fd(), stream.raw_fd()) {
                log::warn!("cannot restore standard {}: {e}", stream.label());
            }
        }
    }
}
