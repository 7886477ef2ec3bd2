//! Explicit state threaded through loading and resolution.

use crate::error::{BuildError, Result};
use crate::paths;
use crate::target::TargetOs;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

/// Where a descriptor lives and what it is resolved for.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    descriptor_path: PathBuf,
    base_dir: PathBuf,
    target_os: TargetOs,
    include_stack: Vec<PathBuf>,
    loaded: FxHashSet<PathBuf>,
}

impl ResolveContext {
    /// Create a context for the descriptor at `path`, targeting the host OS.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let descriptor_path = paths::canonicalize(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            descriptor_path,
            base_dir,
            target_os: TargetOs::host(),
            include_stack: Vec::new(),
            loaded: FxHashSet::default(),
        })
    }

    /// Resolve for a different operating system than the host.
    pub fn with_target_os(mut self, target_os: TargetOs) -> Self {
        self.target_os = target_os;
        self
    }

    /// Canonical path of the root descriptor.
    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    /// Directory of the root descriptor.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn target_os(&self) -> TargetOs {
        self.target_os
    }

    /// Record that `path` is being loaded. Fails if it is already on the
    /// include stack. Returns `false` without entering when `path` was
    /// already loaded through another include.
    pub(crate) fn enter(&mut self, path: &Path) -> Result<bool> {
        if self.include_stack.iter().any(|p| p == path) {
            return Err(BuildError::IncludeCycle {
                path: path.to_path_buf(),
            });
        }
        if !self.loaded.insert(path.to_path_buf()) {
            return Ok(false);
        }
        self.include_stack.push(path.to_path_buf());
        Ok(true)
    }

    /// Forget previously loaded descriptors before a new load.
    pub(crate) fn reset(&mut self) {
        self.include_stack.clear();
        self.loaded.clear();
    }

    pub(crate) fn leave(&mut self) {
        self.include_stack.pop();
    }
}
