//! unitgen generates a systemd service unit from a flat configuration record, writes it to a
//! staging directory, and optionally installs, enables and starts it.
//!
//! The run is a strict forward pipeline: validate → render → write → install + daemon-reload →
//! enable + start. The first failure stops the run; nothing is retried or rolled back.
//!
//! ## Quick start
//! ```no_run
//! use unitgen::{Backend, Generator, GeneratorOptions, Plan, UnitConfig};
//!
//! fn deploy() -> Result<(), unitgen::Error> {
//!     let opts = GeneratorOptions::default();
//!     let manager = Backend::Systemctl.client(&opts)?;
//!     let config = UnitConfig::new("myapp", "My App", "/usr/bin/myapp --flag")
//!         .with_user("appuser")
//!         .with_group("appgroup")
//!         .with_working_directory("/opt/myapp");
//!
//!     let report = Generator::new(opts, manager).run(&config, Plan::new(true, true), |_| {})?;
//!     println!("{}", report.unit_file.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Unit layout
//! The rendered unit always has the same shape: `[Unit]` with `Description=`, `[Service]` with
//! `ExecStart=`, `Restart=always`, `User=`, `Group=`, `WorkingDirectory=`, and `[Install]` with
//! `WantedBy=multi-user.target`. Values are substituted verbatim without escaping.
//!
//! ## Backends
//! - `systemctl` (default): `sudo cp` and `sudo systemctl daemon-reload|enable|start`.
//! - `dbus` (feature=`dbus`): systemd's D-Bus API on the system bus, with the caller's privileges.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::dbg_macro)]

pub mod cli;
mod error;
mod fsutil;
mod generator;
mod manager;
mod options;
mod runtime;
mod types;
mod util;

pub use crate::error::{Error, Field, Result};
pub use crate::generator::Generator;
pub use crate::manager::recording::{RecordedCall, RecordingManager};
pub use crate::manager::systemctl::SystemctlManager;
pub use crate::manager::{Backend, Operation, ServiceManager};
pub use crate::options::GeneratorOptions;
pub use crate::types::manager::{CommandOutput, Plan, RunReport, Step};
pub use crate::types::unit_file::{GeneratedUnitFile, RESTART_POLICY, UnitConfig, WANTED_BY};

#[cfg(feature = "dbus")]
pub use crate::manager::dbus::DbusManager;
