use crate::command::{EXIT_CANNOT_EXECUTE, EXIT_NOT_FOUND, ExitCode};
use crate::env::Environment;
use crate::parser::Stage;
use nix::unistd::execv;
use std::borrow::Cow;
use std::ffi::{CString, OsStr};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Replace the current process image with the program named by `stage`.
///
/// Only meant for a freshly forked child: on failure the reason is printed
/// on standard error and the process exits with 127 (not found) or 126.
pub fn exec_stage(stage: &Stage, env: &Environment) -> ExitCode {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    let Some(program) = find_command_path(OsStr::new(&search_paths), Path::new(&stage.name))
    else {
        eprintln!("shello: {}: command not found", stage.name);
        return EXIT_NOT_FOUND;
    };

    let argv: Result<Vec<CString>, _> = stage.args.iter().map(|a| CString::new(a.as_str())).collect();
    let (program, argv) = match (CString::new(program.as_os_str().as_bytes()), argv) {
        (Ok(program), Ok(argv)) => (program, argv),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("shello: {}: {}", stage.name, e);
            return EXIT_CANNOT_EXECUTE;
        }
    };

    // Only returns on failure.
    let Err(e) = execv(&program, &argv);
    eprintln!("shello: {}: {}", stage.name, e.desc());
    EXIT_CANNOT_EXECUTE
}

/// Locate the program for a stage name.
///
/// Names with a directory part are taken as paths and only checked for
/// existence; a bare name is looked up in each directory of `search_paths`
/// and the first regular file wins.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    if path.starts_with("./") && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, None) => None,
        // Single component -> search in PATH
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        // Multiple components -> relative to the current dir
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
