use std::time::Duration;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A required unit configuration field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    Name,
    Description,
    Exec,
    User,
    Group,
    WorkingDirectory,
}

impl Field {
    /// Human-readable label used in "... is required" messages.
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Service name",
            Field::Description => "Description",
            Field::Exec => "Exec command",
            Field::User => "User",
            Field::Group => "Group",
            Field::WorkingDirectory => "Working directory",
        }
    }
}

/// Error returned by unitgen APIs.
///
/// Every variant maps to a process exit code through [`Error::exit_code`]; the binary prints the
/// message once and exits, library code never terminates the process.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required field was empty after defaults were applied.
    #[error("{} is required", .field.label())]
    MissingField { field: Field },

    /// Input validation failure (e.g. a service name containing path separators).
    #[error("invalid input: {context}")]
    InvalidInput { context: String },

    /// The first token of the start command is not an executable reachable via `PATH`.
    #[error("Error finding executable: {executable}")]
    ExecutableNotFound { executable: String, detail: String },

    /// The unit template could not be rendered.
    #[error("error rendering unit file: {context}")]
    Render { context: String },

    /// The current process is not allowed to perform an action (filesystem perms, D-Bus policy).
    #[error("permission denied for {action}: {detail}")]
    PermissionDenied {
        action: &'static str,
        detail: String,
    },

    /// The service manager does not know the requested unit.
    #[error("unit not found: {unit}")]
    UnitNotFound { unit: String },

    /// Timed out while talking to the service manager.
    #[error("timeout for {action}: {timeout:?}")]
    Timeout {
        action: &'static str,
        timeout: Duration,
    },

    /// A backend is unavailable in the current environment (missing binary, missing D-Bus,
    /// feature disabled).
    #[error("backend unavailable ({backend}): {detail}")]
    BackendUnavailable {
        backend: &'static str,
        detail: String,
    },

    /// Raw D-Bus error that did not match a more specific classification.
    #[error("dbus error {name}: {message}")]
    DbusError { name: String, message: String },

    /// Generic I/O error with context.
    #[error("io error: {context}")]
    IoError { context: String },

    /// A subprocess exited unsuccessfully.
    ///
    /// `output` holds the combined stdout/stderr, truncated to avoid unbounded output.
    #[error("command failed: {command} (exit={exit_code:?})")]
    ProcessError {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },
}

impl Error {
    pub(crate) fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
        }
    }

    pub(crate) fn process_error(
        command: impl Into<String>,
        exit_code: Option<i32>,
        output: impl AsRef<str>,
    ) -> Self {
        Self::ProcessError {
            command: command.into(),
            exit_code,
            output: truncate_for_error(output.as_ref(), 8 * 1024).into_owned(),
        }
    }

    /// Process exit code for this error: `2` for usage errors, `1` for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::MissingField { .. } | Error::InvalidInput { .. } => 2,
            _ => 1,
        }
    }

    /// Captured subprocess output to show the operator verbatim, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Error::ProcessError { output, .. } if !output.trim().is_empty() => Some(output),
            _ => None,
        }
    }
}

fn truncate_for_error(input: &str, max_bytes: usize) -> std::borrow::Cow<'_, str> {
    if input.len() <= max_bytes {
        return std::borrow::Cow::Borrowed(input);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    std::borrow::Cow::Owned(input[..end].to_string())
}
