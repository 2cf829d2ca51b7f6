use crate::args::{self, ExtractedArgs};
use crate::command::ExitCode;
use crate::env::Environment;
use crate::io_adapters::open_output;
use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Size of the chunks `tee` and `wc` read at a time.
const CHUNK_SIZE: usize = 4096;

/// Built-in commands known to the shell at compile time.
///
/// Builtins run in the shell process when they are the only stage of a
/// pipeline and in a forked child otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Help,
    Version,
    ChangeDirectory,
    WordCount,
    Tee,
}

/// One row of the builtin table.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinEntry {
    pub name: &'static str,
    pub builtin: Builtin,
    /// Single-character flags the command accepts, e.g. `"cwlL"`.
    pub accepted_options: &'static str,
}

/// Immutable table of builtins, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    entries: Vec<BuiltinEntry>,
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        let entry = |name: &'static str, builtin, accepted_options: &'static str| BuiltinEntry {
            name,
            builtin,
            accepted_options,
        };
        Self {
            entries: vec![
                entry("help", Builtin::Help, ""),
                entry("version", Builtin::Version, ""),
                entry("cd", Builtin::ChangeDirectory, ""),
                entry("wc", Builtin::WordCount, "cwlL"),
                entry("tee", Builtin::Tee, "a"),
            ],
        }
    }
}

impl BuiltinRegistry {
    pub fn lookup(&self, name: &str) -> Option<&BuiltinEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[BuiltinEntry] {
        &self.entries
    }
}

impl BuiltinEntry {
    /// Validate `operands` against the accepted flags and run the command.
    ///
    /// Errors are written to `stderr` prefixed with the command name and turn
    /// into exit status 1; they never propagate to the caller.
    pub fn invoke(
        &self,
        registry: &BuiltinRegistry,
        operands: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> ExitCode {
        let result = match args::extract(self.accepted_options, operands) {
            Ok(args) => match self.builtin {
                Builtin::Help => help(registry, stdout),
                Builtin::Version => version(stdout),
                Builtin::ChangeDirectory => change_directory(&args, env),
                Builtin::WordCount => word_count(&args, stdin, stdout, stderr),
                Builtin::Tee => tee(&args, stdin, stdout, stderr),
            },
            Err(e) => Err(e.into()),
        };
        let flushed = stdout.flush().context("cannot flush standard output");

        match result.and_then(|code| flushed.map(|()| code)) {
            Ok(code) => code,
            Err(e) => {
                log::debug!("{} failed: {e:#}", self.name);
                let _ = writeln!(stderr, "{}: {:#}", self.name, e);
                1
            }
        }
    }
}

fn help(registry: &BuiltinRegistry, stdout: &mut dyn Write) -> Result<ExitCode> {
    writeln!(stdout, "Available internal commands:")?;
    for (i, entry) in registry.entries().iter().enumerate() {
        write!(stdout, "{}. {}", i + 1, entry.name)?;
        if !entry.accepted_options.is_empty() {
            write!(stdout, ", with arguments: -{}", entry.accepted_options)?;
        }
        writeln!(stdout)?;
    }
    Ok(0)
}

fn version(stdout: &mut dyn Write) -> Result<ExitCode> {
    writeln!(stdout, "{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
    writeln!(
        stdout,
        "[This is a free piece of software which falls under GNU GPL.]"
    )?;
    Ok(0)
}

fn change_directory(args: &ExtractedArgs, env: &mut Environment) -> Result<ExitCode> {
    let target = match args.operands.as_slice() {
        [] => env.get_var("HOME").context("HOME not set")?,
        [target] => target.clone(),
        _ => bail!("too many arguments"),
    };
    env.change_directory(Path::new(&target))
        .with_context(|| target.clone())?;
    Ok(0)
}

/// Counters gathered by `wc` over one input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub lines: usize,
    pub words: usize,
    pub bytes: usize,
    /// Length in bytes of the longest line, its newline included.
    pub max_line: usize,
}

impl Counts {
    /// Count everything `source` yields until end of input.
    pub fn read_from(source: &mut dyn Read) -> std::io::Result<Self> {
        let mut counts = Counts::default();
        let mut in_word = false;
        let mut line_bytes = 0;
        let mut buf = [0u8; CHUNK_SIZE];
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for &byte in &buf[..n] {
                counts.bytes += 1;
                line_bytes += 1;
                match byte {
                    b'\n' => {
                        counts.lines += 1;
                        counts.max_line = counts.max_line.max(line_bytes);
                        line_bytes = 0;
                        in_word = false;
                    }
                    b' ' | b'\t' => in_word = false,
                    _ => {
                        if !in_word {
                            counts.words += 1;
                        }
                        in_word = true;
                    }
                }
            }
        }
        counts.max_line = counts.max_line.max(line_bytes);
        Ok(counts)
    }

    fn accumulate(&mut self, other: Counts) {
        self.lines += other.lines;
        self.words += other.words;
        self.bytes += other.bytes;
        self.max_line = self.max_line.max(other.max_line);
    }

    /// Render the counters selected by `options`, always in `l w c L` order.
    ///
    /// No selected counter means `lines words bytes`.
    pub fn render(&self, options: &[char]) -> String {
        let fields: Vec<String> = if options.is_empty() {
            vec![self.lines, self.words, self.bytes]
                .into_iter()
                .map(|n| n.to_string())
                .collect()
        } else {
            [
                ('l', self.lines),
                ('w', self.words),
                ('c', self.bytes),
                ('L', self.max_line),
            ]
            .into_iter()
            .filter(|(flag, _)| options.contains(flag))
            .map(|(_, n)| n.to_string())
            .collect()
        };
        fields.join(" ")
    }
}

fn word_count(
    args: &ExtractedArgs,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<ExitCode> {
    if args.operands.is_empty() {
        let counts = Counts::read_from(stdin).context("error reading standard input")?;
        writeln!(stdout, "{}", counts.render(&args.options))?;
        return Ok(0);
    }

    let mut status = 0;
    let mut total = Counts::default();
    for fname in &args.operands {
        let counts = File::open(fname).and_then(|mut f| Counts::read_from(&mut f));
        match counts {
            Ok(counts) => {
                writeln!(stdout, "{} {}", counts.render(&args.options), fname)?;
                total.accumulate(counts);
            }
            Err(e) => {
                writeln!(stderr, "wc: {}: {}", fname, e)?;
                status = 1;
            }
        }
    }
    if args.operands.len() > 1 {
        writeln!(stdout, "{} total", total.render(&args.options))?;
    }
    Ok(status)
}

fn tee(
    args: &ExtractedArgs,
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<ExitCode> {
    let append = args.has('a');
    let mut status = 0;
    let mut sinks = Vec::with_capacity(args.operands.len());
    for fname in &args.operands {
        match open_output(fname, append) {
            Ok(file) => sinks.push((fname, file)),
            Err(e) => {
                writeln!(stderr, "tee: {}: {}", fname, e)?;
                status = 1;
            }
        }
    }

    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match stdin.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("error reading standard input"),
        };
        stdout.write_all(&buf[..n])?;
        for (fname, file) in &mut sinks {
            file.write_all(&buf[..n])
                .with_context(|| format!("error writing {}", fname))?;
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::tests::lock_current_dir;
    use std::env as stdenv;
    use std::fs;
    use std::io::Cursor;

    struct Outcome {
        code: ExitCode,
        stdout: String,
        stderr: String,
    }

    fn run(name: &str, operands: &[&str], input: &[u8], env: &mut Environment) -> Outcome {
        let registry = BuiltinRegistry::default();
        let entry = registry.lookup(name).expect("builtin is registered");
        let operands: Vec<String> = operands.iter().map(|s| s.to_string()).collect();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let code = entry.invoke(
            &registry,
            &operands,
            &mut Cursor::new(input.to_vec()),
            &mut stdout,
            &mut stderr,
            env,
        );
        Outcome {
            code,
            stdout: String::from_utf8(stdout).unwrap(),
            stderr: String::from_utf8(stderr).unwrap(),
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = BuiltinRegistry::default();
        assert_eq!(registry.lookup("wc").unwrap().builtin, Builtin::WordCount);
        assert_eq!(registry.lookup("tee").unwrap().accepted_options, "a");
        assert!(registry.lookup("ls").is_none());
        assert!(registry.lookup("exit").is_none());
    }

    #[test]
    fn test_help_lists_commands_and_options() {
        let out = run("help", &[], b"", &mut Environment::default());
        assert_eq!(out.code, 0);
        assert_eq!(
            out.stdout,
            "Available internal commands:\n\
             1. help\n\
             2. version\n\
             3. cd\n\
             4. wc, with arguments: -cwlL\n\
             5. tee, with arguments: -a\n"
        );
    }

    #[test]
    fn test_version_mentions_crate_version() {
        let out = run("version", &[], b"", &mut Environment::default());
        assert_eq!(out.code, 0);
        assert!(out.stdout.starts_with("shello v"));
        assert!(out.stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_invalid_option_is_reported_with_command_name() {
        let out = run("version", &["-x"], b"", &mut Environment::default());
        assert_eq!(out.code, 1);
        assert!(out.stdout.is_empty());
        assert_eq!(out.stderr, "version: invalid option (-x)\n");
    }

    #[test]
    fn test_wc_counts_stdin_when_no_args() {
        let out = run("wc", &[], b"a b\nc\n", &mut Environment::default());
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, "2 3 6\n");
    }

    #[test]
    fn test_wc_selected_counters_in_fixed_order() {
        let out = run("wc", &["-Lcw"], b"one two\nthree\n", &mut Environment::default());
        assert_eq!(out.stdout, "3 14 8\n");

        let out = run("wc", &["-l"], b"x\ny\nz", &mut Environment::default());
        assert_eq!(out.stdout, "2\n");
    }

    #[test]
    fn test_wc_words_split_on_space_tab_newline_only() {
        let counts = Counts::read_from(&mut Cursor::new(b"a\tb  c\n\nd,e".to_vec())).unwrap();
        assert_eq!(
            counts,
            Counts {
                lines: 2,
                words: 4,
                bytes: 11,
                max_line: 7,
            }
        );
    }

    #[test]
    fn test_wc_counts_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wc.txt");
        fs::write(&path, "one two\nthree\n").unwrap();
        let fname = path.to_string_lossy().to_string();

        let out = run("wc", &[&fname], b"", &mut Environment::default());
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, format!("2 3 14 {}\n", fname));
    }

    #[test]
    fn test_wc_multiple_files_print_total() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a");
        let second = dir.path().join("b");
        fs::write(&first, "a b\n").unwrap();
        fs::write(&second, "ccccc\n").unwrap();
        let first = first.to_string_lossy().to_string();
        let second = second.to_string_lossy().to_string();

        let out = run("wc", &["-lL", &first, &second], b"", &mut Environment::default());
        assert_eq!(out.code, 0);
        assert_eq!(
            out.stdout,
            format!("1 4 {}\n1 6 {}\n2 6 total\n", first, second)
        );
    }

    #[test]
    fn test_wc_missing_file_reports_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present");
        fs::write(&present, "x\n").unwrap();
        let present = present.to_string_lossy().to_string();
        let missing = dir.path().join("missing").to_string_lossy().to_string();

        let out = run("wc", &[&missing, &present], b"", &mut Environment::default());
        assert_eq!(out.code, 1);
        assert!(out.stderr.starts_with(&format!("wc: {}: ", missing)));
        assert!(out.stdout.starts_with(&format!("1 1 2 {}\n", present)));
    }

    #[test]
    fn test_tee_copies_input_to_stdout_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, "stale contents\n").unwrap();

        let out = run(
            "tee",
            &[&first.to_string_lossy(), &second.to_string_lossy()],
            b"hello\nworld\n",
            &mut Environment::default(),
        );
        assert_eq!(out.code, 0);
        assert_eq!(out.stdout, "hello\nworld\n");
        assert_eq!(fs::read_to_string(&first).unwrap(), "hello\nworld\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "hello\nworld\n");
    }

    #[test]
    fn test_tee_append_flag() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log.txt");
        fs::write(&log, "first\n").unwrap();

        let out = run("tee", &["-a", &log.to_string_lossy()], b"second\n", &mut Environment::default());
        assert_eq!(out.code, 0);
        assert_eq!(fs::read_to_string(&log).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_tee_unopenable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("no_such_dir").join("f.txt");

        let out = run("tee", &[&bad.to_string_lossy()], b"data", &mut Environment::default());
        assert_eq!(out.code, 1);
        assert_eq!(out.stdout, "data");
        assert!(out.stderr.starts_with("tee: "));
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();

        let mut env = Environment::default();
        let out = run("cd", &[&canonical_temp.to_string_lossy()], b"", &mut env);

        assert_eq!(out.code, 0);
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), canonical_temp);
        assert_eq!(env.working_directory(), canonical_temp.to_string_lossy());

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();

        let mut env = Environment::default();
        env.set_var("HOME", canonical_temp.to_string_lossy().to_string());
        let out = run("cd", &[], b"", &mut env);

        assert_eq!(out.code, 0);
        assert_eq!(env.cached_directory(), Some(&*canonical_temp.to_string_lossy()));

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_with_two_operands_is_usage_error() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = Environment::default();
        let before = env.working_directory().to_owned();

        let out = run("cd", &["/", "/tmp"], b"", &mut env);
        assert_eq!(out.code, 1);
        assert_eq!(out.stderr, "cd: too many arguments\n");
        assert_eq!(env.cached_directory(), Some(before.as_str()));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = Environment::default();

        let name = format!("nonexistent_dir_for_shello_test_{}", std::process::id());
        let out = run("cd", &[&name], b"", &mut env);

        assert_eq!(out.code, 1);
        assert!(out.stderr.starts_with(&format!("cd: {}: ", name)));
        assert_eq!(env.cached_directory(), None);
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }
}
