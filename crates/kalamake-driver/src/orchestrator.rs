//! Build pass orchestration.
//!
//! A pass walks `Idle → VariantSelection → PathPreparation → Invocation`
//! and ends in `Success` or `Failed`. Variants run one after another and
//! the first failing variant stops the pass.

use crate::command::{CommandLine, OutputPaths};
use crate::compile_commands::{CompilationDatabase, DATABASE_FILE};
use crate::error::{DriverError, Result};
use crate::runner::{find_environment_script, Invocation, ProcessRunner};
use crate::settings::Settings;
use crate::variant::{select_variants, VariantSelection};
use kalamake_build::paths::collect_files;
use kalamake_build::{BuildPlan, BuildVariant, CompilerId, CustomFlag, PostBuildAction, Warning};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Stage of a build pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildState {
    Idle,
    VariantSelection,
    PathPreparation,
    Invocation,
    Success,
    Failed,
}

/// What happened to one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum VariantOutcome {
    Success { output: PathBuf },
    Failed { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantReport {
    pub variant: BuildVariant,
    pub outcome: VariantOutcome,
}

/// Result of a build pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub variants: Vec<VariantReport>,
    pub warnings: Vec<Warning>,
    pub state: BuildState,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.state == BuildState::Success
    }

    /// Binaries produced by successful variants.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.variants.iter().filter_map(|report| match &report.outcome {
            VariantOutcome::Success { output } => Some(output.as_path()),
            _ => None,
        })
    }
}

/// One variant of a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledVariant {
    pub variant: BuildVariant,
    pub outputs: Option<OutputPaths>,
    /// `None` for variants that would be skipped.
    pub invocation: Option<Invocation>,
}

/// Everything a build pass would run, without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub variants: Vec<ScheduledVariant>,
    pub warnings: Vec<Warning>,
}

/// Drives the compiler for every selected variant of a plan.
pub struct Orchestrator<R> {
    runner: R,
    settings: Settings,
}

impl<R: ProcessRunner> Orchestrator<R> {
    pub fn new(runner: R, settings: Settings) -> Self {
        Self { runner, settings }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Compute the invocations of a pass without creating directories or
    /// starting processes. Environment scripts are not probed.
    pub fn schedule(&self, plan: &BuildPlan) -> Result<Schedule> {
        let VariantSelection { variants, warnings } = select_variants(plan);

        let mut scheduled = Vec::with_capacity(variants.len());
        for variant in variants {
            if variant == BuildVariant::None {
                scheduled.push(ScheduledVariant {
                    variant,
                    outputs: None,
                    invocation: None,
                });
                continue;
            }

            let outputs = OutputPaths::for_variant(plan, variant);
            let command_line = CommandLine::build(plan, variant, &outputs)?;
            let invocation = self.invocation(plan, &command_line, None);
            scheduled.push(ScheduledVariant {
                variant,
                outputs: Some(outputs),
                invocation: Some(invocation),
            });
        }

        Ok(Schedule {
            variants: scheduled,
            warnings,
        })
    }

    /// Run a full build pass.
    ///
    /// Variant failures are reported in the returned [`BuildReport`]. Errors
    /// are returned for problems that stop the pass as a whole: a missing
    /// MSVC environment, an unwritable compilation database or a failed
    /// post-build copy.
    pub fn build(&mut self, plan: &BuildPlan) -> Result<BuildReport> {
        let mut state = BuildState::Idle;
        tracing::info!(
            "building {} with {} ({})",
            plan.name,
            plan.compiler,
            plan.profile.as_deref().unwrap_or("global")
        );

        transition(&mut state, BuildState::VariantSelection);
        let VariantSelection { variants, warnings } = select_variants(plan);
        let mut report = BuildReport {
            variants: Vec::with_capacity(variants.len()),
            warnings,
            state,
        };
        tracing::debug!("selected variants: {variants:?}");

        if plan.has_custom_flag(CustomFlag::ExportCompileCommands) {
            self.export_compile_commands(plan, &variants)?;
        }

        let environment_script = if plan.compiler == CompilerId::Cl {
            Some(find_environment_script(&self.settings.toolchain.vcvars)?)
        } else {
            None
        };

        let mut stopped = false;
        for variant in variants {
            if stopped {
                report.variants.push(VariantReport {
                    variant,
                    outcome: VariantOutcome::Skipped {
                        reason: "an earlier variant failed".to_string(),
                    },
                });
                continue;
            }

            if variant == BuildVariant::None {
                report.variants.push(VariantReport {
                    variant,
                    outcome: VariantOutcome::Skipped {
                        reason: "no valid flag combination".to_string(),
                    },
                });
                continue;
            }

            transition(&mut state, BuildState::PathPreparation);
            let outputs = OutputPaths::for_variant(plan, variant);
            if let Err(err) = prepare_directories(plan, &outputs) {
                tracing::warn!("{variant}: {err}");
                report.variants.push(VariantReport {
                    variant,
                    outcome: VariantOutcome::Failed {
                        reason: err.to_string(),
                    },
                });
                continue;
            }

            transition(&mut state, BuildState::Invocation);
            let outcome = self.run_variant(plan, variant, &outputs, environment_script.as_deref());
            if matches!(outcome, VariantOutcome::Failed { .. }) {
                stopped = true;
            }
            report.variants.push(VariantReport { variant, outcome });
        }

        let failed = report
            .variants
            .iter()
            .any(|r| matches!(r.outcome, VariantOutcome::Failed { .. }));

        if failed {
            transition(&mut state, BuildState::Failed);
        } else {
            run_post_build(&plan.post_build, &mut report.warnings)?;
            transition(&mut state, BuildState::Success);
        }

        report.state = state;
        Ok(report)
    }

    fn run_variant(
        &mut self,
        plan: &BuildPlan,
        variant: BuildVariant,
        outputs: &OutputPaths,
        environment_script: Option<&Path>,
    ) -> VariantOutcome {
        let command_line = match CommandLine::build(plan, variant, outputs) {
            Ok(command_line) => command_line,
            Err(err) => {
                return VariantOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };

        let invocation = self.invocation(plan, &command_line, environment_script);
        tracing::info!("{variant}: {}", invocation.display());

        match self.runner.run(&invocation) {
            Ok(0) => {
                tracing::info!("{variant}: built {}", outputs.binary.display());
                VariantOutcome::Success {
                    output: outputs.binary.clone(),
                }
            }
            Ok(code) => VariantOutcome::Failed {
                reason: format!("{} exited with status {code}", plan.compiler),
            },
            Err(err) => VariantOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }

    fn invocation(
        &self,
        plan: &BuildPlan,
        command_line: &CommandLine,
        environment_script: Option<&Path>,
    ) -> Invocation {
        Invocation {
            program: self.settings.compiler_program(plan.compiler),
            args: command_line.tokens(),
            environment_script: environment_script.map(Path::to_path_buf),
            working_dir: plan.descriptor_dir.clone(),
        }
    }

    fn export_compile_commands(&self, plan: &BuildPlan, variants: &[BuildVariant]) -> Result<()> {
        let Some(variant) = variants.iter().copied().find(|v| *v != BuildVariant::None) else {
            return Ok(());
        };

        let outputs = OutputPaths::for_variant(plan, variant);
        let command_line = CommandLine::build(plan, variant, &outputs)?;
        let program = self.settings.compiler_program(plan.compiler);
        let database =
            CompilationDatabase::from_command_line(&plan.descriptor_dir, &program, &command_line);

        create_dir(&plan.build_path)?;
        let path = plan.build_path.join(DATABASE_FILE);
        database.write(&path)?;
        tracing::info!("wrote {}", path.display());
        Ok(())
    }
}

fn transition(state: &mut BuildState, next: BuildState) {
    tracing::debug!("build state {state:?} -> {next:?}");
    *state = next;
}

fn prepare_directories(plan: &BuildPlan, outputs: &OutputPaths) -> Result<()> {
    for dir in outputs.directories(plan.family()) {
        create_dir(dir)?;
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| DriverError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn run_post_build(actions: &[PostBuildAction], warnings: &mut Vec<Warning>) -> Result<()> {
    for action in actions {
        match action {
            PostBuildAction::Copy { from, to } => {
                if !from.exists() {
                    warnings.push(Warning::general(format!(
                        "post-build copy source {} does not exist",
                        from.display()
                    )));
                    continue;
                }
                tracing::info!("copying {} to {}", from.display(), to.display());
                copy(from, to)?;
            }
        }
    }
    Ok(())
}

/// Copy a file or a directory tree. A file copied onto an existing
/// directory keeps its name.
fn copy(from: &Path, to: &Path) -> Result<()> {
    let failed = |source: std::io::Error| DriverError::PostBuild {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    if from.is_dir() {
        for file in collect_files(from).map_err(failed)? {
            let Ok(relative) = file.strip_prefix(from) else {
                continue;
            };
            let target = to.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(failed)?;
            }
            std::fs::copy(&file, &target).map_err(failed)?;
        }
        return Ok(());
    }

    let target = match from.file_name() {
        Some(name) if to.is_dir() => to.join(name),
        _ => to.to_path_buf(),
    };
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(failed)?;
    }
    std::fs::copy(from, &target).map_err(failed)?;
    Ok(())
}
