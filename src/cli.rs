//! Command-line surface of the `unitgen` binary.
//!
//! Flags are accepted in Go style (`-name foo`, `-name=foo`) as well as GNU style (`--name foo`);
//! [`normalize_args`] rewrites the former before clap sees them.

use crate::{Backend, CommandOutput, GeneratorOptions, Plan, Step, UnitConfig};

use clap::{ArgAction, CommandFactory, Parser};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

/// Generate a systemd service unit and optionally install, enable and start it.
#[derive(Parser, Debug)]
#[command(name = "unitgen", version, about)]
pub struct Cli {
    /// Name of the systemd service
    #[arg(long, default_value = "")]
    pub name: String,

    /// Description of the systemd service
    #[arg(long, default_value = "")]
    pub description: String,

    /// Command to start the service
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub exec: String,

    /// User to run the service as
    #[arg(long, default_value = "root")]
    pub user: String,

    /// Group to run the service as
    #[arg(long, default_value = "root")]
    pub group: String,

    /// Working directory for the service
    #[arg(long, default_value = "/")]
    pub workdir: String,

    /// Install the unit file and reload the service manager
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub install: bool,

    /// Enable and start the service (requires -install)
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub enable: bool,

    /// Service-manager client
    #[arg(long, value_enum, env = "UNITGEN_BACKEND", default_value = "systemctl")]
    pub backend: Backend,

    /// Directory the generated unit is written to
    #[arg(long, env = "UNITGEN_OUTPUT_DIR", default_value = "/tmp")]
    pub output_dir: PathBuf,

    /// systemd unit directory to install into
    #[arg(long, env = "UNITGEN_UNIT_DIR", default_value = "/etc/systemd/system")]
    pub unit_dir: PathBuf,

    /// Privilege-escalation command for the systemctl backend (empty to disable)
    #[arg(long, env = "UNITGEN_SUDO", default_value = "sudo")]
    pub sudo: String,

    /// Run systemctl/cp without a privilege-escalation command
    #[arg(long)]
    pub no_sudo: bool,

    /// Log progress details to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse the process arguments, accepting Go-style single-dash long flags.
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    pub fn unit_config(&self) -> UnitConfig {
        UnitConfig::new(&self.name, &self.description, &self.exec)
            .with_user(&self.user)
            .with_group(&self.group)
            .with_working_directory(&self.workdir)
    }

    pub fn plan(&self) -> Plan {
        Plan::new(self.install, self.enable)
    }

    pub fn options(&self) -> GeneratorOptions {
        let mut opts = GeneratorOptions::default();
        opts.staging_dir = self.output_dir.clone();
        opts.systemd_system_dir = self.unit_dir.clone();
        opts.privilege_command = if self.no_sudo || self.sudo.trim().is_empty() {
            None
        } else {
            Some(self.sudo.clone())
        };
        opts
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "unitgen=debug" } else { "warn" }
    }
}

/// Rewrite single-dash long options (`-name`, `-name=x`) to their double-dash form.
///
/// Only names clap knows as long options are rewritten. A separate value that starts with `-` is
/// joined to its flag (`--name=-x`), so values may start with `-` as they can with Go's `flag`
/// package. Everything after `--` is left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let cmd = Cli::command();
    // `None`: not one of our long options; `Some(true)`: consumes the next argument.
    let takes_value = |long: &str| -> Option<bool> {
        if long == "help" || long == "version" {
            return Some(false);
        }
        let arg = cmd.get_arguments().find(|a| a.get_long() == Some(long))?;
        let sets_value = matches!(arg.get_action(), ArgAction::Set | ArgAction::Append);
        let optional = arg.get_num_args().is_some_and(|n| n.min_values() == 0);
        Some(sets_value && !optional)
    };

    let mut out = Vec::<OsString>::new();
    let mut iter = args.into_iter().map(Into::into);
    if let Some(bin) = iter.next() {
        out.push(bin);
    }

    let mut value_next = false;
    let mut passthrough = false;
    for arg in iter {
        if passthrough {
            out.push(arg);
            continue;
        }
        if value_next {
            value_next = false;
            // Glue dash-led values onto their flag so clap never reads `-x` as an option.
            match out.last_mut() {
                Some(flag) if arg.as_encoded_bytes().starts_with(b"-") => {
                    flag.push("=");
                    flag.push(&arg);
                }
                _ => out.push(arg),
            }
            continue;
        }

        let Some(s) = arg.to_str() else {
            out.push(arg);
            continue;
        };
        if s == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let long = if let Some(rest) = s.strip_prefix("--") {
            Some((rest, false))
        } else if let Some(rest) = s.strip_prefix('-') {
            Some((rest, true))
        } else {
            None
        };

        let Some((rest, single_dash)) = long else {
            out.push(arg);
            continue;
        };
        let (name, has_inline_value) = match rest.split_once('=') {
            Some((name, _)) => (name, true),
            None => (rest, false),
        };

        match takes_value(name) {
            Some(needs_value) => {
                value_next = needs_value && !has_inline_value;
                if single_dash {
                    out.push(OsString::from(format!("-{s}")));
                } else {
                    out.push(arg);
                }
            }
            None => out.push(arg),
        }
    }
    out
}

/// Write the operator-facing message for a completed step.
pub fn print_step(out: &mut impl Write, step: &Step) -> io::Result<()> {
    match step {
        Step::Generated { path } => {
            writeln!(out, "Systemd unit file generated at: {}", path.display())
        }
        Step::Installed { output } => write_verbatim(out, output),
        Step::Reloaded { output } => {
            write_verbatim(out, output)?;
            writeln!(out, "Systemd unit file installed and daemon reloaded.")
        }
        Step::Enabled { output } => {
            write_verbatim(out, output)?;
            writeln!(out, "Systemd unit file enabled.")
        }
        Step::Started { output } => {
            write_verbatim(out, output)?;
            writeln!(out, "Systemd unit file started.")
        }
    }
}

fn write_verbatim(out: &mut impl Write, output: &CommandOutput) -> io::Result<()> {
    if output.is_empty() {
        return Ok(());
    }
    let text = output.text.as_str();
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.into_string().expect("utf8"))
            .collect()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn normalize_rewrites_single_dash_long_flags() {
        let args = normalize_args(["unitgen", "-name", "demo", "-install", "-user=app"]);
        assert_eq!(
            strings(args),
            ["unitgen", "--name", "demo", "--install", "--user=app"]
        );
    }

    #[test]
    fn normalize_joins_values_to_their_flags() {
        let args = normalize_args(["unitgen", "-exec", "-name", "-description", "-x"]);
        assert_eq!(
            strings(args),
            ["unitgen", "--exec=-name", "--description=-x"]
        );
    }

    #[test]
    fn normalize_keeps_short_and_unknown_flags() {
        let args = normalize_args(["unitgen", "-v", "-bogus", "--", "-name"]);
        assert_eq!(strings(args), ["unitgen", "-v", "-bogus", "--", "-name"]);
    }

    #[test]
    fn print_step_messages() {
        let mut buf = Vec::new();
        print_step(
            &mut buf,
            &Step::Generated {
                path: PathBuf::from("/tmp/demo.service"),
            },
        )
        .expect("write");
        print_step(
            &mut buf,
            &Step::Enabled {
                output: CommandOutput::new("Created symlink a \u{2192} b."),
            },
        )
        .expect("write");

        assert_eq!(
            String::from_utf8(buf).expect("utf8"),
            "Systemd unit file generated at: /tmp/demo.service\n\
             Created symlink a \u{2192} b.\n\
             Systemd unit file enabled.\n"
        );
    }

    #[test]
    fn print_step_skips_blank_output() {
        let mut buf = Vec::new();
        print_step(
            &mut buf,
            &Step::Installed {
                output: CommandOutput::new(" \n"),
            },
        )
        .expect("write");
        assert!(buf.is_empty());
    }
}
