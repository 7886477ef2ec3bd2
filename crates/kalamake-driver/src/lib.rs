//! Compiler command generation and build orchestration for KalaMake.
//!
//! This crate turns a resolved [`kalamake_build::BuildPlan`] into compiler
//! invocations:
//! - Flag tables per compiler family (warnings, standards, variants)
//! - Build variant selection from custom flags, `buildtype` or flag heuristics
//! - Output path layout and command-line lowering for MSVC and GNU drivers
//! - Sequential execution through a [`ProcessRunner`], post-build copies and
//!   `compile_commands.json` export
//!
//! # Example
//!
//! ```ignore
//! use kalamake_build::{resolve, Descriptor, ResolveContext};
//! use kalamake_driver::{Orchestrator, Settings, SystemRunner};
//!
//! let mut ctx = ResolveContext::new("project/app.kma")?;
//! let descriptor = Descriptor::load(&mut ctx)?;
//! let resolution = resolve(&descriptor, None, &ctx)?;
//!
//! let mut orchestrator = Orchestrator::new(SystemRunner, Settings::default());
//! let report = orchestrator.build(&resolution.plan)?;
//! assert!(report.succeeded());
//! ```

mod command;
pub mod compile_commands;
mod error;
pub mod flags;
mod orchestrator;
mod runner;
mod settings;
mod variant;

pub use command::{CommandLine, OutputPaths};
pub use compile_commands::{CompilationDatabase, CompileCommand, DATABASE_FILE};
pub use error::{DriverError, Result};
pub use orchestrator::{
    BuildReport, BuildState, Orchestrator, Schedule, ScheduledVariant, VariantOutcome,
    VariantReport,
};
pub use runner::{
    find_environment_script, probe_environment_script, Invocation, ProcessRunner, SystemRunner,
    ENVIRONMENT_SCRIPT_CANDIDATES,
};
pub use settings::{Settings, ToolchainSettings, SETTINGS_FILE};
pub use variant::{detect_debug, detect_release, select_variants, VariantSelection};
