use clap::{Parser, Subcommand};
use kalamake_build::{resolve, Descriptor, ResolveContext, Resolution, Warning};
use kalamake_driver::{Orchestrator, Settings, SystemRunner, VariantOutcome};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kalamake")]
#[command(author, version, about = "Build C and C++ projects from .kma descriptors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: kalamake.toml next to the descriptor)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a descriptor and build every selected variant
    Compile {
        /// Descriptor file
        descriptor: PathBuf,

        /// Profile to build (default: targetprofile or the global settings)
        profile: Option<String>,
    },

    /// Resolve a descriptor without building
    Check {
        /// Descriptor file
        descriptor: PathBuf,

        /// Profile to resolve
        profile: Option<String>,

        /// Print the resolved build plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the compiler command of each selected variant
    Flags {
        /// Descriptor file
        descriptor: PathBuf,

        /// Profile to resolve
        profile: Option<String>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            descriptor,
            profile,
        } => {
            let (ctx, resolution) = load(&descriptor, profile.as_deref())?;
            let settings = load_settings(cli.config.as_deref(), ctx.base_dir())?;
            let plan = resolution.plan;

            let mut orchestrator = Orchestrator::new(SystemRunner, settings);
            let report = orchestrator.build(&plan)?;
            report_warnings(&report.warnings);

            for variant in &report.variants {
                match &variant.outcome {
                    VariantOutcome::Success { output } => {
                        println!("{}: {}", variant.variant, output.display())
                    }
                    VariantOutcome::Failed { reason } => {
                        eprintln!("{}: failed: {}", variant.variant, reason)
                    }
                    VariantOutcome::Skipped { reason } => {
                        eprintln!("{}: skipped: {}", variant.variant, reason)
                    }
                }
            }

            if !report.succeeded() {
                return Err(miette::miette!("build of `{}` failed", plan.name));
            }
        }

        Commands::Check {
            descriptor,
            profile,
            json,
        } => {
            let (_, resolution) = load(&descriptor, profile.as_deref())?;
            if json {
                let text = serde_json::to_string_pretty(&resolution.plan).into_diagnostic()?;
                println!("{}", text);
            } else {
                println!("{}: OK", descriptor.display());
            }
        }

        Commands::Flags {
            descriptor,
            profile,
        } => {
            let (ctx, resolution) = load(&descriptor, profile.as_deref())?;
            let settings = load_settings(cli.config.as_deref(), ctx.base_dir())?;

            let schedule = Orchestrator::new(SystemRunner, settings).schedule(&resolution.plan)?;
            report_warnings(&schedule.warnings);

            for scheduled in &schedule.variants {
                match &scheduled.invocation {
                    Some(invocation) => println!("{}: {}", scheduled.variant, invocation.display()),
                    None => println!("{}: skipped", scheduled.variant),
                }
            }
        }
    }

    Ok(())
}

/// Load, merge and resolve a descriptor, logging soft failures.
fn load(descriptor: &Path, profile: Option<&str>) -> Result<(ResolveContext, Resolution)> {
    let mut ctx = ResolveContext::new(descriptor)?;
    let parsed = Descriptor::load(&mut ctx)?;
    let resolution = resolve(&parsed, profile, &ctx)?;
    report_warnings(&resolution.warnings);
    Ok((ctx, resolution))
}

fn load_settings(explicit: Option<&Path>, descriptor_dir: &Path) -> Result<Settings> {
    let settings = match explicit {
        Some(path) => Settings::from_file(path)?,
        None => Settings::discover(descriptor_dir)?,
    };
    Ok(settings)
}

fn report_warnings(warnings: &[Warning]) {
    for warning in warnings {
        tracing::warn!("{warning}");
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("KALAMAKE_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("kalamake_build=debug,kalamake_driver=debug,info")
        } else {
            EnvFilter::new("warn,kalamake_driver=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
