use crate::{Error, Field, Result, util};

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Restart policy written to every generated unit.
pub const RESTART_POLICY: &str = "always";

/// Install target written to every generated unit.
pub const WANTED_BY: &str = "multi-user.target";

/// Configuration for a generated systemd service unit.
///
/// Values are substituted into the unit text verbatim. Nothing is escaped, so a value containing a
/// newline produces a broken unit file; callers that accept untrusted input must check for that
/// themselves.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct UnitConfig {
    /// Service name; the unit is written as `<name>.service`.
    pub name: String,
    /// `Description=...`.
    pub description: String,
    /// `ExecStart=...`, as a single command line.
    pub exec_start: String,
    /// `User=...` (default: `root`).
    pub user: String,
    /// `Group=...` (default: `root`).
    pub group: String,
    /// `WorkingDirectory=...` (default: `/`).
    pub working_directory: String,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            exec_start: String::new(),
            user: "root".to_string(),
            group: "root".to_string(),
            working_directory: "/".to_string(),
        }
    }
}

/// A rendered unit written to the staging directory.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct GeneratedUnitFile {
    /// Unit name, e.g. `myapp.service`.
    pub unit: String,
    /// Where the unit was written.
    pub path: PathBuf,
    /// Rendered unit text.
    pub contents: String,
}

impl UnitConfig {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        exec_start: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            exec_start: exec_start.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    /// Unit file name for this configuration (`<name>.service`).
    pub fn unit_name(&self) -> Result<String> {
        util::service_unit_name(&self.name)
    }

    /// Validate required fields and resolve the start command's program via `PATH`.
    pub fn validate(&self) -> Result<()> {
        self.validate_in(None)
    }

    /// Like [`UnitConfig::validate`], resolving the program against `search_path` instead of the
    /// process `PATH`.
    pub fn validate_in(&self, search_path: Option<OsString>) -> Result<()> {
        self.check_required()?;
        self.unit_name()?;

        let program = util::exec_program(&self.exec_start);
        let resolved = util::resolve_executable(program, search_path)?;
        tracing::debug!(%program, resolved = %resolved.display(), "start command resolved");
        Ok(())
    }

    fn check_required(&self) -> Result<()> {
        let fields = [
            (Field::Name, &self.name),
            (Field::Description, &self.description),
            (Field::Exec, &self.exec_start),
            (Field::User, &self.user),
            (Field::Group, &self.group),
            (Field::WorkingDirectory, &self.working_directory),
        ];
        for (field, value) in fields {
            if value.is_empty() {
                return Err(Error::MissingField { field });
            }
        }
        Ok(())
    }

    /// Render the unit file content.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        self.write_unit(&mut out).map_err(|e| Error::Render {
            context: e.to_string(),
        })?;
        Ok(out)
    }

    fn write_unit(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "[Unit]")?;
        writeln!(out, "Description={}", self.description)?;
        writeln!(out)?;
        writeln!(out, "[Service]")?;
        writeln!(out, "ExecStart={}", self.exec_start)?;
        writeln!(out, "Restart={RESTART_POLICY}")?;
        writeln!(out, "User={}", self.user)?;
        writeln!(out, "Group={}", self.group)?;
        writeln!(out, "WorkingDirectory={}", self.working_directory)?;
        writeln!(out)?;
        writeln!(out, "[Install]")?;
        writeln!(out, "WantedBy={WANTED_BY}")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn myapp() -> UnitConfig {
        UnitConfig::new("myapp", "My App", "/usr/bin/myapp --flag")
            .with_user("appuser")
            .with_group("appgroup")
            .with_working_directory("/opt/myapp")
    }

    #[test]
    fn render_matches_fixed_layout() {
        let rendered = myapp().render().expect("render ok");
        assert_eq!(
            rendered,
            "[Unit]\n\
             Description=My App\n\
             \n\
             [Service]\n\
             ExecStart=/usr/bin/myapp --flag\n\
             Restart=always\n\
             User=appuser\n\
             Group=appgroup\n\
             WorkingDirectory=/opt/myapp\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n"
        );
    }

    #[test]
    fn render_is_deterministic() {
        let cfg = myapp();
        assert_eq!(cfg.render().expect("ok"), cfg.render().expect("ok"));
    }

    #[test]
    fn render_has_each_section_once_in_order() {
        let rendered = UnitConfig::new("x", "[Service] lookalike", "/bin/true")
            .render()
            .expect("render ok");

        let headers: Vec<&str> = rendered
            .lines()
            .filter(|l| l.starts_with('[') && l.ends_with(']'))
            .collect();
        assert_eq!(headers, ["[Unit]", "[Service]", "[Install]"]);
        assert_eq!(rendered.matches("\nRestart=always\n").count(), 1);
        assert!(rendered.ends_with("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn render_does_not_escape_values() {
        let rendered = UnitConfig::new("x", "line one\nline two", "/bin/echo \"$HOME\" %i")
            .render()
            .expect("render ok");
        assert!(rendered.contains("Description=line one\nline two\n"));
        assert!(rendered.contains("ExecStart=/bin/echo \"$HOME\" %i\n"));
    }

    #[test]
    fn defaults_are_root_and_slash() {
        let cfg = UnitConfig::default();
        assert_eq!(cfg.user, "root");
        assert_eq!(cfg.group, "root");
        assert_eq!(cfg.working_directory, "/");
    }

    #[test]
    fn each_empty_field_is_rejected_independently() {
        let cases: [(Field, fn(&mut UnitConfig)); 6] = [
            (Field::Name, |c| c.name.clear()),
            (Field::Description, |c| c.description.clear()),
            (Field::Exec, |c| c.exec_start.clear()),
            (Field::User, |c| c.user.clear()),
            (Field::Group, |c| c.group.clear()),
            (Field::WorkingDirectory, |c| c.working_directory.clear()),
        ];

        for (expected, clear) in cases {
            let mut cfg = UnitConfig::new("demo", "Demo", "/bin/sh -c true");
            clear(&mut cfg);
            let err = cfg.validate().expect_err("must fail");
            let Error::MissingField { field } = err else {
                panic!("unexpected error for {expected:?}: {err:?}");
            };
            assert_eq!(field, expected);
        }
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let cfg = UnitConfig::default();
        let err = cfg.validate().expect_err("must fail");
        assert_eq!(err.to_string(), "Service name is required");
    }

    #[test]
    fn validate_rejects_unresolvable_program() {
        let cfg = UnitConfig::new("demo", "Demo", "unitgen-no-such-binary --serve");
        let err = cfg
            .validate_in(Some(OsString::from("/nonexistent-unitgen-dir")))
            .expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "Error finding executable: unitgen-no-such-binary"
        );
    }

    #[cfg(unix)]
    #[test]
    fn validate_accepts_absolute_program() {
        UnitConfig::new("demo", "Demo", "/bin/sh -c 'sleep 1'")
            .validate()
            .expect("valid");
    }

    #[test]
    fn unit_name_appends_service_suffix() {
        assert_eq!(myapp().unit_name().expect("ok"), "myapp.service");
    }
}
