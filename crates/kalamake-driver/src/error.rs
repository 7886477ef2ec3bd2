//! Error types for kalamake-driver.

use kalamake_build::BuildError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for kalamake-driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors that can occur while generating or running compiler invocations.
#[derive(Error, Diagnostic, Debug)]
pub enum DriverError {
    /// Descriptor parsing or resolution failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    /// Failed to read the settings file.
    #[error("failed to read settings {}: {source}", path.display())]
    #[diagnostic(code(kalamake::settings))]
    ReadSettings {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the settings file.
    #[error("failed to parse settings {}: {source}", path.display())]
    #[diagnostic(code(kalamake::settings))]
    ParseSettings {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Static libraries cannot be produced yet.
    #[error("cannot build `{name}`: link-only binaries are not supported yet")]
    #[diagnostic(
        code(kalamake::link_only),
        help("use `binarytype: link-runtime` or `runtime-only` for now")
    )]
    LinkOnlyUnsupported { name: String },

    /// No MSVC environment script was found.
    #[error("no MSVC environment script found, searched {} locations", searched.len())]
    #[diagnostic(
        code(kalamake::msvc_environment),
        help("install Visual Studio or the Build Tools, or list vcvars64.bat under [toolchain] vcvars in kalamake.toml")
    )]
    EnvironmentScriptNotFound { searched: Vec<PathBuf> },

    /// Environment scripts can only run through `cmd` on Windows.
    #[error("cannot run environment script {} on this host", script.display())]
    #[diagnostic(code(kalamake::msvc_environment))]
    EnvironmentScriptUnsupported { script: PathBuf },

    /// The compiler process could not be started.
    #[error("failed to execute compiler {}: {source}", program.display())]
    #[diagnostic(code(kalamake::spawn))]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// An output directory could not be created.
    #[error("failed to create directory {}: {source}", path.display())]
    #[diagnostic(code(kalamake::create_dir))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A post-build copy failed.
    #[error("post-build copy from {} to {} failed: {source}", from.display(), to.display())]
    #[diagnostic(code(kalamake::post_build))]
    PostBuild {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write compile_commands.json.
    #[error("failed to write compilation database {}: {source}", path.display())]
    #[diagnostic(code(kalamake::compile_commands))]
    WriteDatabase {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to encode or decode compile_commands.json.
    #[error("invalid compilation database: {0}")]
    #[diagnostic(code(kalamake::compile_commands))]
    Json(#[from] serde_json::Error),
}
