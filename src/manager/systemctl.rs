use crate::manager::{Operation, ServiceManager};
use crate::{CommandOutput, Error, GeneratedUnitFile, GeneratorOptions, Result};

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Stdio;

/// Service manager backed by `systemctl` and `cp` subprocesses, optionally behind `sudo`.
#[derive(Clone, Debug)]
pub struct SystemctlManager {
    privilege_command: Option<String>,
    systemctl_command: String,
    copy_command: String,
    systemd_system_dir: PathBuf,
}

impl SystemctlManager {
    pub fn new(opts: &GeneratorOptions) -> Self {
        Self {
            privilege_command: opts
                .privilege_command
                .clone()
                .filter(|s| !s.trim().is_empty()),
            systemctl_command: opts.systemctl_command.clone(),
            copy_command: opts.copy_command.clone(),
            systemd_system_dir: opts.systemd_system_dir.clone(),
        }
    }

    fn argv<I, S>(&self, program: &str, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut argv = Vec::<OsString>::new();
        if let Some(prefix) = &self.privilege_command {
            argv.push(OsString::from(prefix));
        }
        argv.push(OsString::from(program));
        argv.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        argv
    }

    fn systemctl(&self, op: Operation, args: &[&str]) -> Result<CommandOutput> {
        let argv = self.argv(&self.systemctl_command, args);
        crate::runtime::block_on_result(run_command(op, argv))
    }
}

impl ServiceManager for SystemctlManager {
    fn name(&self) -> &'static str {
        "systemctl"
    }

    fn install(&self, file: &GeneratedUnitFile) -> Result<CommandOutput> {
        let mut dest = self.systemd_system_dir.as_os_str().to_os_string();
        dest.push("/");
        let argv = self.argv(&self.copy_command, [file.path.as_os_str(), dest.as_os_str()]);
        crate::runtime::block_on_result(run_command(Operation::Install, argv))
    }

    fn reload(&self) -> Result<CommandOutput> {
        self.systemctl(Operation::Reload, &["daemon-reload"])
    }

    fn enable(&self, unit: &str) -> Result<CommandOutput> {
        self.systemctl(Operation::Enable, &["enable", unit])
    }

    fn start(&self, unit: &str) -> Result<CommandOutput> {
        self.systemctl(Operation::Start, &["start", unit])
    }
}

async fn run_command(op: Operation, argv: Vec<OsString>) -> Result<CommandOutput> {
    let Some((program, args)) = argv.split_first() else {
        return Err(Error::invalid_input("empty command line"));
    };
    let cmdline = display_argv(&argv);

    tracing::debug!(operation = op.as_str(), command = %cmdline, "spawn");

    let mut cmd = async_process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            return Error::BackendUnavailable {
                backend: "systemctl",
                detail: format!("{} not found", program.to_string_lossy()),
            };
        }
        Error::IoError {
            context: format!("spawn {cmdline}: {e}"),
        }
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        tracing::debug!(
            operation = op.as_str(),
            command = %cmdline,
            exit_code = ?output.status.code(),
            "command failed"
        );
        return Err(Error::process_error(
            cmdline,
            output.status.code(),
            combined,
        ));
    }

    Ok(CommandOutput::new(combined))
}

fn display_argv(argv: &[OsString]) -> String {
    argv.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
