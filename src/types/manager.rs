use std::path::PathBuf;

/// Output captured from a service-manager operation.
///
/// For subprocess backends this is the combined stdout/stderr of the command; D-Bus backends
/// synthesize an equivalent summary.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct CommandOutput {
    pub text: String,
}

impl CommandOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Which optional stages a run performs after generating the unit file.
///
/// `enable` only takes effect together with `install`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct Plan {
    pub install: bool,
    pub enable: bool,
}

impl Plan {
    pub fn new(install: bool, enable: bool) -> Self {
        Self { install, enable }
    }

    pub fn generate_only() -> Self {
        Self::default()
    }

    pub(crate) fn runs_enable(&self) -> bool {
        self.install && self.enable
    }
}

/// A completed pipeline step, reported as soon as it finishes.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Step {
    Generated { path: PathBuf },
    Installed { output: crate::CommandOutput },
    Reloaded { output: crate::CommandOutput },
    Enabled { output: crate::CommandOutput },
    Started { output: crate::CommandOutput },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Generated { .. } => "generate",
            Step::Installed { .. } => "install",
            Step::Reloaded { .. } => "reload",
            Step::Enabled { .. } => "enable",
            Step::Started { .. } => "start",
        }
    }
}

/// Summary of a successful run.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RunReport {
    pub unit_file: crate::GeneratedUnitFile,
    pub steps: Vec<Step>,
}

impl RunReport {
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(Step::name).collect()
    }
}
