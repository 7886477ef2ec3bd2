//! Tool settings (kalamake.toml format).
//!
//! ```toml
//! [toolchain]
//! vcvars = ["D:/VS/VC/Auxiliary/Build/vcvars64.bat"]
//!
//! [toolchain.compilers]
//! "g++" = "/opt/gcc-14/bin/g++"
//! ```

use crate::error::{DriverError, Result};
use kalamake_build::CompilerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up next to the descriptor.
pub const SETTINGS_FILE: &str = "kalamake.toml";

/// Root settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub toolchain: ToolchainSettings,
}

/// Compiler discovery settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSettings {
    /// Environment scripts probed before the standard Visual Studio
    /// locations.
    #[serde(default)]
    pub vcvars: Vec<PathBuf>,

    /// Executable overrides per compiler.
    #[serde(default)]
    pub compilers: BTreeMap<CompilerId, PathBuf>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DriverError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| DriverError::ParseSettings {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `kalamake.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if path.is_file() {
            tracing::debug!("loading settings from {}", path.display());
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Executable to run for a compiler.
    pub fn compiler_program(&self, compiler: CompilerId) -> PathBuf {
        self.toolchain
            .compilers
            .get(&compiler)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(compiler.program()))
    }
}
