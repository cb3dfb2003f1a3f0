use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration options for `Generator` and the service-manager backends.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct GeneratorOptions {
    /// Directory the rendered unit is written to before installation.
    ///
    /// Default: `/tmp`.
    pub staging_dir: PathBuf,

    /// Base directory for installed systemd unit files.
    ///
    /// Default: `/etc/systemd/system`.
    pub systemd_system_dir: PathBuf,

    /// Command prefixed to privileged subprocesses (`None` runs them directly).
    ///
    /// Default: `Some("sudo")`.
    pub privilege_command: Option<String>,

    /// `systemctl` binary used by the subprocess backend.
    pub systemctl_command: String,

    /// File copy binary used by the subprocess backend.
    pub copy_command: String,

    /// D-Bus method call timeout (feature=`dbus`).
    pub dbus_call_timeout: Duration,

    /// Search path used to resolve the start command's program (`None`: the process `PATH`).
    pub search_path: Option<OsString>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("/tmp"),
            systemd_system_dir: PathBuf::from("/etc/systemd/system"),
            privilege_command: Some("sudo".to_string()),
            systemctl_command: "systemctl".to_string(),
            copy_command: "cp".to_string(),
            dbus_call_timeout: Duration::from_secs(25),
            search_path: None,
        }
    }
}
