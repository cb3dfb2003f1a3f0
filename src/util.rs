use crate::{Error, Result};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

const SERVICE_SUFFIX: &str = ".service";

/// Map a service name to its unit file name (`<name>.service`).
///
/// An existing `.service` suffix is kept as-is. Any other dots are part of the name, so
/// `backup.timer` becomes `backup.timer.service`.
pub(crate) fn service_unit_name(input: &str) -> Result<String> {
    validate_no_control("service name", input)?;
    if input.trim().is_empty() {
        return Err(Error::invalid_input("service name must not be blank"));
    }
    if input.contains('/') || input.contains('\\') {
        return Err(Error::invalid_input(
            "service name must not contain path separators",
        ));
    }
    if input == "." || input == ".." {
        return Err(Error::invalid_input(format!(
            "service name must not be {input:?}"
        )));
    }

    match input.strip_suffix(SERVICE_SUFFIX) {
        Some(stem) if !stem.is_empty() => Ok(input.to_string()),
        _ => Ok(format!("{input}{SERVICE_SUFFIX}")),
    }
}

pub(crate) fn validate_no_control(context: &'static str, input: &str) -> Result<()> {
    if input.contains('\0') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain NUL"
        )));
    }
    if input.contains('\n') || input.contains('\r') {
        return Err(Error::invalid_input(format!(
            "{context} must not contain newlines"
        )));
    }
    if input.chars().any(|c| c.is_control()) {
        return Err(Error::invalid_input(format!(
            "{context} must not contain control characters"
        )));
    }
    Ok(())
}

/// First whitespace-delimited token of a start command (empty when there is none).
pub(crate) fn exec_program(exec: &str) -> &str {
    exec.split_whitespace().next().unwrap_or("")
}

/// Resolve `program` the way a shell would: names with a path separator are checked directly,
/// bare names are searched in `search_path` (or the process `PATH` when `None`).
pub(crate) fn resolve_executable(program: &str, search_path: Option<OsString>) -> Result<PathBuf> {
    if program.is_empty() {
        return Err(Error::ExecutableNotFound {
            executable: String::new(),
            detail: "start command has no program".to_string(),
        });
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());
    let search_path = search_path.or_else(|| std::env::var_os("PATH"));

    which::which_in(program, search_path, cwd).map_err(|e| Error::ExecutableNotFound {
        executable: program.to_string(),
        detail: e.to_string(),
    })
}
