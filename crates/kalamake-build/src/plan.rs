//! Resolved build plan types.

use crate::registry::{BinaryType, BuildVariant, CompilerId, CustomFlag, Field, Standard, WarningLevel};
use crate::target::{binary_extensions, BinaryExtensions, CompilerFamily, TargetOs};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Fully merged, validated configuration of one profile.
///
/// Every path is absolute. Every list is free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Profile the plan was resolved for, `None` for the global defaults.
    pub profile: Option<String>,
    /// Binary name from the `name` field.
    pub name: String,
    /// File name of the produced binary without extension. Equal to `name`
    /// unless the build path names a file.
    pub output_name: String,
    pub binary_type: BinaryType,
    pub compiler: CompilerId,
    pub standard: Standard,
    /// Variant requested through `buildtype`.
    pub build_type: Option<BuildVariant>,
    pub sources: Vec<PathBuf>,
    /// Header files and include directories.
    pub headers: Vec<PathBuf>,
    /// Directories passed to the compiler as include paths. Header files
    /// contribute their parent directory.
    pub include_dirs: Vec<PathBuf>,
    pub build_path: PathBuf,
    pub object_path: PathBuf,
    pub links: Vec<Link>,
    pub debug_links: Vec<Link>,
    pub warning_level: WarningLevel,
    pub defines: Vec<String>,
    /// Release-side flags, already carrying the family prefix.
    pub flags: Vec<String>,
    /// Debug-side flags, already carrying the family prefix.
    pub debug_flags: Vec<String>,
    pub custom_flags: Vec<CustomFlag>,
    pub post_build: Vec<PostBuildAction>,
    pub target_os: TargetOs,
    /// Directory of the root descriptor.
    pub descriptor_dir: PathBuf,
}

impl BuildPlan {
    pub fn family(&self) -> CompilerFamily {
        self.compiler.family()
    }

    pub fn has_custom_flag(&self, flag: CustomFlag) -> bool {
        self.custom_flags.contains(&flag)
    }

    /// Extensions of the binary this plan produces.
    pub fn extensions(&self) -> BinaryExtensions {
        binary_extensions(self.family(), self.target_os, self.binary_type)
    }

    /// Links used by a variant. Debug builds fall back to the release links
    /// when no debug links are configured.
    pub fn links_for(&self, variant: BuildVariant) -> &[Link] {
        if variant.is_debug() && !self.debug_links.is_empty() {
            &self.debug_links
        } else {
            &self.links
        }
    }

    /// User flags used by a variant.
    pub fn flags_for(&self, variant: BuildVariant) -> &[String] {
        if variant.is_debug() {
            &self.debug_flags
        } else {
            &self.flags
        }
    }
}

/// A library to link against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    /// A library file on disk.
    Path(PathBuf),
    /// A library found through the linker search path, such as `m` or
    /// `ws2_32.lib`.
    Name(String),
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Path(path) => write!(f, "{}", path.display()),
            Link::Name(name) => f.write_str(name),
        }
    }
}

/// Action run after every variant of a pass succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PostBuildAction {
    Copy { from: PathBuf, to: PathBuf },
}

/// A soft failure: the offending item was dropped and processing continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub field: Option<Field>,
    pub message: String,
}

impl Warning {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}
