//! Descriptor parsing and build plan resolution for KalaMake.
//!
//! This crate provides:
//! - The `.kma` descriptor format (version banner, categories, fields)
//! - Registries mapping descriptor spellings to typed values
//! - Resolution of global defaults and profile overrides into a [`BuildPlan`]
//!
//! # Example
//!
//! ```text
//! #KMA VERSION 1.0
//!
//! #global
//! name: app
//! binarytype: executable
//! compiler: g++
//! standard: c++17
//! sources: src/
//! headers: include/
//! warninglevel: strict
//! customflags: build-debug, build-release
//!
//! #profile tools
//! name: app-tools
//! defines: TOOLS_BUILD
//! ```
//!
//! ```ignore
//! use kalamake_build::{resolve, Descriptor, ResolveContext};
//!
//! let mut ctx = ResolveContext::new("project/app.kma")?;
//! let descriptor = Descriptor::load(&mut ctx)?;
//! let resolution = resolve(&descriptor, Some("tools"), &ctx)?;
//! println!("{:#?}", resolution.plan);
//! ```

mod context;
mod descriptor;
mod error;
pub mod paths;
mod plan;
pub mod registry;
mod resolve;
mod target;

pub use context::ResolveContext;
pub use descriptor::{
    Descriptor, RawCopy, RawProfile, RawScope, RawValue, COMMENT_PREFIX, LIST_SEPARATOR,
    VERSION_BANNER,
};
pub use error::{BuildError, Result};
pub use plan::{BuildPlan, Link, PostBuildAction, Warning};
pub use registry::{
    BinaryType, BuildVariant, Category, CompilerId, CustomFlag, Field, GeneratorType, Standard,
    WarningLevel,
};
pub use resolve::{prefix_flag, resolve, validate_name, Resolution, MAX_NAME_LEN};
pub use target::{binary_extensions, BinaryExtensions, CompilerFamily, TargetOs};
