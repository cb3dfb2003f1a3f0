//! Service-manager clients.
//!
//! The generator never talks to systemd directly; it goes through [`ServiceManager`], which has a
//! subprocess implementation (`sudo systemctl ...`), a D-Bus implementation (feature=`dbus`) and an
//! in-memory recorder for tests.

#[cfg(feature = "dbus")]
pub(crate) mod dbus;
pub(crate) mod recording;
pub(crate) mod systemctl;

use crate::{CommandOutput, GeneratedUnitFile, GeneratorOptions, Result};

/// Which service-manager client to use.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
#[non_exhaustive]
pub enum Backend {
    /// `sudo cp` + `sudo systemctl ...` subprocesses.
    #[default]
    Systemctl,
    /// systemd's D-Bus API on the system bus, as the current user.
    Dbus,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Systemctl => "systemctl",
            Backend::Dbus => "dbus",
        }
    }

    /// Build the client for this backend. No system state is touched until a method is called.
    pub fn client(self, opts: &GeneratorOptions) -> Result<Box<dyn ServiceManager>> {
        tracing::debug!(backend = self.as_str(), "service manager selected");
        match self {
            Backend::Systemctl => Ok(Box::new(systemctl::SystemctlManager::new(opts))),
            #[cfg(feature = "dbus")]
            Backend::Dbus => Ok(Box::new(dbus::DbusManager::new(opts))),
            #[cfg(not(feature = "dbus"))]
            Backend::Dbus => Err(crate::Error::BackendUnavailable {
                backend: "dbus",
                detail: "feature dbus is disabled".to_string(),
            }),
        }
    }
}

/// A service-manager operation, in pipeline order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    Install,
    Reload,
    Enable,
    Start,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Reload => "reload",
            Operation::Enable => "enable",
            Operation::Start => "start",
        }
    }
}

/// Privileged operations the generator delegates to the system service manager.
///
/// Implementations perform exactly one operation per call and never retry or roll back.
pub trait ServiceManager {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Copy the generated unit file into the system unit directory.
    fn install(&self, file: &GeneratedUnitFile) -> Result<CommandOutput>;

    /// Ask the service manager to reload its unit definitions.
    fn reload(&self) -> Result<CommandOutput>;

    /// Enable `unit` for automatic start at boot.
    fn enable(&self, unit: &str) -> Result<CommandOutput>;

    /// Start `unit` now.
    fn start(&self, unit: &str) -> Result<CommandOutput>;
}

impl<T: ServiceManager + ?Sized> ServiceManager for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn install(&self, file: &GeneratedUnitFile) -> Result<CommandOutput> {
        (**self).install(file)
    }

    fn reload(&self) -> Result<CommandOutput> {
        (**self).reload()
    }

    fn enable(&self, unit: &str) -> Result<CommandOutput> {
        (**self).enable(unit)
    }

    fn start(&self, unit: &str) -> Result<CommandOutput> {
        (**self).start(unit)
    }
}

impl<T: ServiceManager + ?Sized> ServiceManager for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn install(&self, file: &GeneratedUnitFile) -> Result<CommandOutput> {
        (**self).install(file)
    }

    fn reload(&self) -> Result<CommandOutput> {
        (**self).reload()
    }

    fn enable(&self, unit: &str) -> Result<CommandOutput> {
        (**self).enable(unit)
    }

    fn start(&self, unit: &str) -> Result<CommandOutput> {
        (**self).start(unit)
    }
}
