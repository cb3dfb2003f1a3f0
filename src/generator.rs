use crate::{
    GeneratedUnitFile, GeneratorOptions, Plan, Result, RunReport, ServiceManager, Step, UnitConfig,
};

/// Runs the generate → install → enable pipeline against a [`ServiceManager`].
///
/// Every step either succeeds and advances or returns the first error; nothing is retried or
/// rolled back. A failed reload leaves the unit installed but not loaded.
#[derive(Debug)]
pub struct Generator<M> {
    opts: GeneratorOptions,
    manager: M,
}

impl<M: ServiceManager> Generator<M> {
    pub fn new(opts: GeneratorOptions, manager: M) -> Self {
        Self { opts, manager }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.opts
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Validate `config`, render it and write `<staging_dir>/<name>.service`.
    ///
    /// Nothing is written when validation fails.
    pub fn generate(&self, config: &UnitConfig) -> Result<GeneratedUnitFile> {
        config.validate_in(self.opts.search_path.clone())?;
        let unit = config.unit_name()?;
        let contents = config.render()?;

        tracing::info!(
            unit = %unit,
            staging_dir = %self.opts.staging_dir.display(),
            bytes = contents.len(),
            "generate"
        );

        crate::fsutil::write_unit_file(&self.opts.staging_dir, &unit, contents)
    }

    /// Run the full pipeline, reporting each completed step to `on_step` as it finishes.
    pub fn run(
        &self,
        config: &UnitConfig,
        plan: Plan,
        mut on_step: impl FnMut(&Step),
    ) -> Result<RunReport> {
        let mut steps = Vec::<Step>::new();
        let mut complete = |step: Step| {
            on_step(&step);
            steps.push(step);
        };

        let unit_file = self.generate(config)?;
        complete(Step::Generated {
            path: unit_file.path.clone(),
        });

        if plan.install {
            let backend = self.manager.name();
            let unit = unit_file.unit.as_str();

            tracing::info!(%unit, backend, dest = %self.opts.systemd_system_dir.display(), "install");
            let output = self.manager.install(&unit_file)?;
            complete(Step::Installed { output });

            tracing::info!(%unit, backend, "daemon_reload");
            let output = self.manager.reload()?;
            complete(Step::Reloaded { output });

            if plan.runs_enable() {
                tracing::info!(%unit, backend, "enable");
                let output = self.manager.enable(unit)?;
                complete(Step::Enabled { output });

                tracing::info!(%unit, backend, "start");
                let output = self.manager.start(unit)?;
                complete(Step::Started { output });
            }
        } else if plan.enable {
            tracing::warn!(unit = %unit_file.unit, "enable requested without install; skipping");
        }

        Ok(RunReport { unit_file, steps })
    }
}
