//! Construction and execution of a pipeline.
//!
//! Stages are wired left to right. Before stage `i` is forked, fd 0 of the
//! shell points at the read end of pipe `i - 1` and fd 1 at the write end of
//! pipe `i` (or, for the last stage, at the saved standard output or the
//! redirect target); the child simply inherits both. Once every stage is
//! started the shell's own fds 0 and 1 are restored and the children are
//! reaped.

use crate::builtin::{BuiltinEntry, BuiltinRegistry};
use crate::command::{CommandKind, EXIT_FAILURE, EXIT_SUCCESS, ExitCode, exit_code};
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::external::exec_stage;
use crate::io_adapters::{self, SavedStdio, StdStream};
use crate::parser::{self, Stage};
use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, fork};
use std::io::{self, Write};
use std::os::fd::OwnedFd;

/// Processes forked for one pipeline, in stage order.
#[derive(Debug)]
struct Job {
    stages: usize,
    pids: Vec<Pid>,
}

impl Job {
    fn new(stages: usize) -> Self {
        Self {
            stages,
            pids: Vec::with_capacity(stages),
        }
    }

    /// Reap every started process.
    ///
    /// The result is the last stage's status, or failure when construction
    /// stopped before the last stage was started.
    fn wait(self) -> ExitCode {
        let mut last = EXIT_FAILURE;
        for &pid in &self.pids {
            last = loop {
                match waitpid(pid, None) {
                    Ok(status) => {
                        log::debug!("reaped {pid}: {status:?}");
                        break exit_code(status);
                    }
                    Err(Errno::EINTR) => continue,
                    Err(e) => {
                        log::warn!("cannot wait for {pid}: {e}");
                        break EXIT_FAILURE;
                    }
                }
            };
        }
        if self.pids.len() == self.stages {
            last
        } else {
            EXIT_FAILURE
        }
    }
}

/// Runs pipelines against a fixed builtin table and the session environment.
pub struct PipelineExecutor<'a> {
    registry: &'a BuiltinRegistry,
    env: &'a mut Environment,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(registry: &'a BuiltinRegistry, env: &'a mut Environment) -> Self {
        Self { registry, env }
    }

    /// Execute the stage texts produced by [`parser::split_pipeline`] and
    /// return the exit status of the last stage.
    ///
    /// A lone builtin runs inside the shell process so that `cd` affects the
    /// shell itself; everything else gets a process per stage.
    pub fn execute<S: AsRef<str>>(&mut self, stages: &[S]) -> ExitCode {
        if stages.is_empty() {
            return EXIT_SUCCESS;
        }

        if let [single] = stages {
            let stage = parser::split_stage(single.as_ref());
            if let CommandKind::Builtin(entry) = CommandKind::resolve(self.registry, &stage.name) {
                return self.run_in_process(entry, &stage).unwrap_or_else(|e| {
                    report(&e);
                    EXIT_FAILURE
                });
            }
        }

        let mut job = Job::new(stages.len());
        if let Err(e) = self.spawn_all(stages, &mut job) {
            report(&e);
        }
        job.wait()
    }

    fn run_in_process(&mut self, entry: &BuiltinEntry, stage: &Stage) -> Result<ExitCode> {
        // Restores fd 1 when dropped, after the builtin has run.
        let _saved = match &stage.output_redirect {
            Some(path) => {
                let saved = SavedStdio::capture()?;
                let file = open_redirect(path)?;
                io_adapters::flush_stdout()?;
                io_adapters::install(file, StdStream::Output)?;
                Some(saved)
            }
            None => None,
        };

        log::debug!("running builtin {} in-process", entry.name);
        Ok(entry.invoke(
            self.registry,
            stage.operands(),
            &mut io::stdin().lock(),
            &mut io::stdout().lock(),
            &mut io::stderr(),
            self.env,
        ))
    }

    /// Start every stage, stopping at the first resource failure.
    ///
    /// The shell's fds 0 and 1 are back in place when this returns, on
    /// success and failure alike.
    fn spawn_all<S: AsRef<str>>(&mut self, stages: &[S], job: &mut Job) -> Result<()> {
        let saved = SavedStdio::capture()?;
        let last = stages.len() - 1;

        let dangling = stages
            .iter()
            .enumerate()
            .try_fold(Some(saved.input()?), |fd_in, (i, text)| {
                let stage = parser::split_stage(text.as_ref());
                log::debug!("stage {i}: {stage:?}");
                self.launch(&stage, fd_in, i == last, &saved, job)
            })?;
        debug_assert!(dangling.is_none());
        Ok(())
    }

    /// Wire one stage and fork it; returns the input for the next stage.
    fn launch(
        &mut self,
        stage: &Stage,
        fd_in: Option<OwnedFd>,
        is_last: bool,
        saved: &SavedStdio,
        job: &mut Job,
    ) -> Result<Option<OwnedFd>> {
        if let Some(fd) = fd_in {
            io_adapters::install(fd, StdStream::Input)?;
        }

        let (fd_out, next_in) = if is_last {
            let fd_out = match &stage.output_redirect {
                Some(path) => open_redirect(path)?,
                None => saved.output()?,
            };
            (fd_out, None)
        } else {
            if let Some(path) = &stage.output_redirect {
                log::debug!("{}: output goes to the next stage, not {path}", stage.name);
            }
            let (read_end, write_end) = io_adapters::pipe()?;
            (write_end, Some(read_end))
        };

        io_adapters::flush_stdout()?;
        io_adapters::install(fd_out, StdStream::Output)?;

        let (pid, next_in) = self.fork_stage(stage, next_in)?;
        job.pids.push(pid);
        Ok(next_in)
    }

    /// Fork a process for `stage` with the current fds 0 and 1.
    ///
    /// `next_in` is handed back to the parent and closed in the child, which
    /// must not keep the read end of its own output pipe.
    fn fork_stage(
        &mut self,
        stage: &Stage,
        next_in: Option<OwnedFd>,
    ) -> Result<(Pid, Option<OwnedFd>)> {
        // SAFETY: the interpreter is single-threaded, so the child may allocate
        // before it execs or exits.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                log::debug!("forked {child} for {}", stage.name);
                Ok((child, next_in))
            }
            Ok(ForkResult::Child) => {
                drop(next_in);
                // Rust starts with SIGPIPE ignored; a stage whose reader is
                // gone should die quietly, builtin or not.
                // SAFETY: the child has a single thread.
                if let Err(e) = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
                    log::debug!("cannot reset SIGPIPE for {}: {e}", stage.name);
                }
                let code = match CommandKind::resolve(self.registry, &stage.name) {
                    CommandKind::Builtin(entry) => entry.invoke(
                        self.registry,
                        stage.operands(),
                        &mut io::stdin().lock(),
                        &mut io::stdout().lock(),
                        &mut io::stderr(),
                        self.env,
                    ),
                    CommandKind::External => exec_stage(stage, self.env),
                };
                let _ = io::stdout().flush();
                // SAFETY: leaves the child without running the shell's
                // destructors or exit handlers.
                unsafe { libc::_exit(code) }
            }
            Err(source) => Err(ShellError::Spawn {
                name: stage.name.clone(),
                source,
            }),
        }
    }
}

fn open_redirect(path: &str) -> Result<OwnedFd> {
    io_adapters::open_output(path, false)
        .map(OwnedFd::from)
        .map_err(|source| ShellError::Redirect {
            path: path.to_owned(),
            source,
        })
}

fn report(e: &ShellError) {
    log::warn!("pipeline aborted: {e:?}");
    eprintln!("shello: {e}");
}
