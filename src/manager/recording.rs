use crate::manager::{Operation, ServiceManager};
use crate::{CommandOutput, Error, GeneratedUnitFile, Result};

use std::sync::{Mutex, MutexGuard};

/// A call observed by [`RecordingManager`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordedCall {
    Install { unit: String, contents: String },
    Reload,
    Enable { unit: String },
    Start { unit: String },
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            RecordedCall::Install { .. } => Operation::Install,
            RecordedCall::Reload => Operation::Reload,
            RecordedCall::Enable { .. } => Operation::Enable,
            RecordedCall::Start { .. } => Operation::Start,
        }
    }
}

/// In-memory service manager that records every call and never touches the system.
///
/// Use [`RecordingManager::failing_at`] to make one operation fail with a `ProcessError`, the same
/// shape a failing `systemctl` produces.
#[derive(Debug, Default)]
pub struct RecordingManager {
    calls: Mutex<Vec<RecordedCall>>,
    fail_at: Option<Operation>,
}

impl RecordingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(op: Operation) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(op),
        }
    }

    /// Calls recorded so far, in order (including the one that failed, if any).
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().iter().map(RecordedCall::operation).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: RecordedCall, output: &str) -> Result<CommandOutput> {
        let op = call.operation();
        self.lock().push(call);
        if self.fail_at == Some(op) {
            return Err(Error::process_error(
                format!("recording {}", op.as_str()),
                Some(1),
                format!("{} failed\n", op.as_str()),
            ));
        }
        Ok(CommandOutput::new(output))
    }
}

impl ServiceManager for RecordingManager {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn install(&self, file: &GeneratedUnitFile) -> Result<CommandOutput> {
        self.record(
            RecordedCall::Install {
                unit: file.unit.clone(),
                contents: file.contents.clone(),
            },
            "",
        )
    }

    fn reload(&self) -> Result<CommandOutput> {
        self.record(RecordedCall::Reload, "")
    }

    fn enable(&self, unit: &str) -> Result<CommandOutput> {
        let output = format!("Created symlink multi-user.target.wants/{unit}.\n");
        self.record(
            RecordedCall::Enable {
                unit: unit.to_string(),
            },
            &output,
        )
    }

    fn start(&self, unit: &str) -> Result<CommandOutput> {
        self.record(
            RecordedCall::Start {
                unit: unit.to_string(),
            },
            "",
        )
    }
}
