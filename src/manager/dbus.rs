use crate::manager::{Operation, ServiceManager};
use crate::{CommandOutput, Error, GeneratedUnitFile, GeneratorOptions, Result};

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use zbus::zvariant::OwnedObjectPath;

const SYSTEMD_DESTINATION: &str = "org.freedesktop.systemd1";
const SYSTEMD_MANAGER_PATH: &str = "/org/freedesktop/systemd1";
const SYSTEMD_MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

/// `(type, file name, destination)` as returned by `EnableUnitFiles`.
type UnitFileChange = (String, String, String);

/// Service manager talking to systemd over the system D-Bus (feature=`dbus`).
///
/// Runs with the caller's own privileges: installation writes the unit directly and systemd's
/// D-Bus policy (or polkit) decides whether reload/enable/start are allowed. The bus connection is
/// opened on first use.
#[derive(Debug)]
pub struct DbusManager {
    conn: Mutex<Option<zbus::Connection>>,
    dbus_call_timeout: Duration,
    systemd_system_dir: PathBuf,
}

impl DbusManager {
    pub fn new(opts: &GeneratorOptions) -> Self {
        Self {
            conn: Mutex::new(None),
            dbus_call_timeout: opts.dbus_call_timeout,
            systemd_system_dir: opts.systemd_system_dir.clone(),
        }
    }

    async fn connection(&self) -> Result<zbus::Connection> {
        let cached = self.conn.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let conn = zbus::connection::Builder::system()
            .map_err(|e| Error::BackendUnavailable {
                backend: "system_bus",
                detail: e.to_string(),
            })?
            .method_timeout(self.dbus_call_timeout)
            .build()
            .await
            .map_err(|e| Error::BackendUnavailable {
                backend: "system_bus",
                detail: e.to_string(),
            })?;

        *self.conn.lock().unwrap_or_else(|e| e.into_inner()) = Some(conn.clone());
        Ok(conn)
    }

    async fn manager_proxy(&self) -> Result<zbus::Proxy<'static>> {
        let conn = self.connection().await?;
        zbus::Proxy::new(
            &conn,
            SYSTEMD_DESTINATION,
            SYSTEMD_MANAGER_PATH,
            SYSTEMD_MANAGER_INTERFACE,
        )
        .await
        .map_err(map_zbus_error)
    }

    async fn daemon_reload(&self) -> Result<()> {
        let proxy = self.manager_proxy().await?;
        proxy
            .call::<_, _, ()>("Reload", &())
            .await
            .map_err(|e| map_zbus_method_error(Operation::Reload, self.dbus_call_timeout, e, None))
    }

    async fn enable_unit_files(&self, unit: &str) -> Result<(bool, Vec<UnitFileChange>)> {
        let proxy = self.manager_proxy().await?;
        proxy
            .call("EnableUnitFiles", &(vec![unit], false, false))
            .await
            .map_err(|e| {
                map_zbus_method_error(Operation::Enable, self.dbus_call_timeout, e, Some(unit))
            })
    }

    async fn start_unit(&self, unit: &str) -> Result<OwnedObjectPath> {
        let proxy = self.manager_proxy().await?;
        proxy
            .call("StartUnit", &(unit, "replace"))
            .await
            .map_err(|e| {
                map_zbus_method_error(Operation::Start, self.dbus_call_timeout, e, Some(unit))
            })
    }
}

impl ServiceManager for DbusManager {
    fn name(&self) -> &'static str {
        "dbus"
    }

    fn install(&self, file: &GeneratedUnitFile) -> Result<CommandOutput> {
        let changed = crate::fsutil::install_unit_file(
            &self.systemd_system_dir,
            &file.unit,
            file.contents.as_bytes(),
        )?;
        let dest = crate::fsutil::unit_file_path(&self.systemd_system_dir, &file.unit);
        tracing::debug!(unit = %file.unit, dest = %dest.display(), changed, "unit file placed");
        Ok(CommandOutput::empty())
    }

    fn reload(&self) -> Result<CommandOutput> {
        tracing::debug!(method = "Reload", "dbus call");
        crate::runtime::block_on_result(self.daemon_reload())?;
        Ok(CommandOutput::empty())
    }

    fn enable(&self, unit: &str) -> Result<CommandOutput> {
        tracing::debug!(method = "EnableUnitFiles", %unit, "dbus call");
        let (carries_install_info, changes) =
            crate::runtime::block_on_result(self.enable_unit_files(unit))?;
        Ok(CommandOutput::new(describe_changes(
            unit,
            carries_install_info,
            &changes,
        )))
    }

    fn start(&self, unit: &str) -> Result<CommandOutput> {
        tracing::debug!(method = "StartUnit", %unit, "dbus call");
        let job = crate::runtime::block_on_result(self.start_unit(unit))?;
        tracing::debug!(%unit, job = %job.as_str(), "start job queued");
        Ok(CommandOutput::empty())
    }
}

/// Render `EnableUnitFiles` changes the way `systemctl enable` reports them.
fn describe_changes(unit: &str, carries_install_info: bool, changes: &[UnitFileChange]) -> String {
    let mut out = String::new();
    for (kind, path, source) in changes {
        let line = match kind.as_str() {
            "symlink" => format!("Created symlink {path} \u{2192} {source}."),
            "unlink" => format!("Removed \"{path}\"."),
            other if source.is_empty() => format!("{other} {path}"),
            other => format!("{other} {path} {source}"),
        };
        out.push_str(&line);
        out.push('\n');
    }
    if !carries_install_info {
        out.push_str(&format!(
            "The unit files have no installation config (WantedBy=, RequiredBy=, ...) for {unit}.\n"
        ));
    }
    out
}

fn map_zbus_method_error(
    op: Operation,
    timeout: Duration,
    err: zbus::Error,
    unit: Option<&str>,
) -> Error {
    match &err {
        zbus::Error::MethodError(name, detail, _reply) => {
            let name = name.to_string();
            let message = detail.clone().unwrap_or_default();

            if (name.contains("NoSuchUnit") || name.contains("UnknownUnit"))
                && let Some(unit) = unit
            {
                return Error::UnitNotFound {
                    unit: unit.to_string(),
                };
            }

            if name.contains("AccessDenied")
                || name.contains("PermissionDenied")
                || name.contains("PolicyKit")
                || name.contains("InteractiveAuthorizationRequired")
            {
                return Error::PermissionDenied {
                    action: op.as_str(),
                    detail: format!("{name}: {message}"),
                };
            }

            Error::DbusError { name, message }
        }
        zbus::Error::InputOutput(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            Error::Timeout {
                action: op.as_str(),
                timeout,
            }
        }
        _ => map_zbus_error(err),
    }
}

fn map_zbus_error(err: zbus::Error) -> Error {
    match err {
        zbus::Error::MethodError(name, detail, _reply) => Error::DbusError {
            name: name.to_string(),
            message: detail.unwrap_or_default(),
        },
        zbus::Error::InputOutput(e) => Error::IoError {
            context: format!("dbus io error: {e}"),
        },
        other => Error::IoError {
            context: format!("dbus error: {other}"),
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn dummy_msg() -> zbus::Message {
        zbus::Message::method_call("/org/freedesktop/systemd1", "Dummy")
            .expect("builder")
            .build(&())
            .expect("msg")
    }

    fn method_error(name: &str, detail: &str) -> zbus::Error {
        let name = zbus::names::OwnedErrorName::try_from(name).expect("name");
        zbus::Error::MethodError(name, Some(detail.to_string()), dummy_msg())
    }

    #[test]
    fn maps_no_such_unit_to_unit_not_found() {
        let err = method_error("org.freedesktop.systemd1.NoSuchUnit", "missing");
        let mapped = map_zbus_method_error(
            Operation::Start,
            Duration::from_secs(5),
            err,
            Some("demo.service"),
        );

        let Error::UnitNotFound { unit } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(unit, "demo.service");
    }

    #[test]
    fn maps_access_denied_to_permission_denied() {
        let err = method_error("org.freedesktop.DBus.Error.AccessDenied", "no");
        let mapped = map_zbus_method_error(Operation::Reload, Duration::from_secs(5), err, None);

        let Error::PermissionDenied { action, .. } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(action, "reload");
    }

    #[test]
    fn maps_interactive_auth_to_permission_denied() {
        let err = method_error(
            "org.freedesktop.DBus.Error.InteractiveAuthorizationRequired",
            "Interactive authentication required.",
        );
        let mapped = map_zbus_method_error(
            Operation::Enable,
            Duration::from_secs(5),
            err,
            Some("demo.service"),
        );

        let Error::PermissionDenied { action, detail } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(action, "enable");
        assert!(detail.contains("Interactive authentication required."));
    }

    #[test]
    fn maps_io_timeout_to_timeout_variant() {
        let err = zbus::Error::InputOutput(Arc::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "timeout",
        )));

        let mapped = map_zbus_method_error(Operation::Start, Duration::from_secs(7), err, None);

        let Error::Timeout { action, timeout } = mapped else {
            panic!("unexpected error: {mapped:?}");
        };
        assert_eq!(action, "start");
        assert_eq!(timeout, Duration::from_secs(7));
    }

    #[test]
    fn describe_changes_matches_systemctl_wording() {
        let changes = vec![(
            "symlink".to_string(),
            "/etc/systemd/system/multi-user.target.wants/demo.service".to_string(),
            "/etc/systemd/system/demo.service".to_string(),
        )];
        let text = describe_changes("demo.service", true, &changes);
        assert_eq!(
            text,
            "Created symlink /etc/systemd/system/multi-user.target.wants/demo.service \u{2192} /etc/systemd/system/demo.service.\n"
        );
    }

    #[test]
    fn describe_changes_warns_without_install_info() {
        let text = describe_changes("demo.service", false, &[]);
        assert!(text.contains("no installation config"), "text={text}");
        assert!(text.contains("demo.service"));
    }
}
