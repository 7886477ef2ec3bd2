//! Compiler families, target operating systems and binary extensions.

use crate::registry::BinaryType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flag syntax grouping shared by several compiler drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    /// `cl` and `clang-cl`: `/X` flags.
    Msvc,
    /// `gcc`, `g++`, `clang`, `clang++`: `-x` flags.
    Gnu,
}

impl CompilerFamily {
    /// Leading character of a flag in this family.
    pub const fn flag_prefix(self) -> char {
        match self {
            CompilerFamily::Msvc => '/',
            CompilerFamily::Gnu => '-',
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerFamily::Msvc => f.write_str("msvc"),
            CompilerFamily::Gnu => f.write_str("gnu"),
        }
    }
}

/// Operating system the binary is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Windows,
    Linux,
}

impl TargetOs {
    /// The operating system this process runs on.
    pub const fn host() -> Self {
        if cfg!(windows) {
            TargetOs::Windows
        } else {
            TargetOs::Linux
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOs::Windows => f.write_str("windows"),
            TargetOs::Linux => f.write_str("linux"),
        }
    }
}

/// File extensions of a produced binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryExtensions {
    /// Extension of the binary itself, including the dot. Empty when the
    /// platform uses no extension.
    pub binary: &'static str,
    /// Extension of the companion import library, if one is produced.
    pub import_library: Option<&'static str>,
}

impl BinaryExtensions {
    const fn single(binary: &'static str) -> Self {
        Self {
            binary,
            import_library: None,
        }
    }

    const fn with_import(binary: &'static str, import_library: &'static str) -> Self {
        Self {
            binary,
            import_library: Some(import_library),
        }
    }
}

/// Output extensions keyed by (family, OS, binary type).
pub const fn binary_extensions(
    family: CompilerFamily,
    os: TargetOs,
    binary_type: BinaryType,
) -> BinaryExtensions {
    use CompilerFamily::{Gnu, Msvc};
    use TargetOs::{Linux, Windows};

    match (binary_type, family, os) {
        (BinaryType::Executable, Msvc, _) | (BinaryType::Executable, Gnu, Windows) => {
            BinaryExtensions::single(".exe")
        }
        (BinaryType::Executable, Gnu, Linux) => BinaryExtensions::single(""),

        (BinaryType::LinkRuntime, Msvc, _) => BinaryExtensions::with_import(".dll", ".lib"),
        (BinaryType::LinkRuntime, Gnu, Windows) => BinaryExtensions::with_import(".dll", ".dll.a"),
        (BinaryType::LinkRuntime, Gnu, Linux) => BinaryExtensions::single(".so"),

        (BinaryType::RuntimeOnly, Msvc, _) | (BinaryType::RuntimeOnly, Gnu, Windows) => {
            BinaryExtensions::single(".dll")
        }
        (BinaryType::RuntimeOnly, Gnu, Linux) => BinaryExtensions::single(".so"),

        (BinaryType::LinkOnly, Msvc, _) => BinaryExtensions::single(".lib"),
        (BinaryType::LinkOnly, Gnu, _) => BinaryExtensions::single(".a"),
    }
}
