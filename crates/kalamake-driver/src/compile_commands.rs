//! compile_commands.json generation.
//!
//! Editors and clang tooling read this file to learn how each source is
//! compiled.

use crate::command::CommandLine;
use crate::error::{DriverError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name written into the build path.
pub const DATABASE_FILE: &str = "compile_commands.json";

/// A single compile command from compile_commands.json.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    /// The working directory for compilation.
    pub directory: PathBuf,

    /// The source file path.
    pub file: PathBuf,

    /// The compilation arguments, compiler first.
    pub arguments: Vec<String>,
}

/// Collection of compile commands, one per source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilationDatabase {
    commands: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// One entry per source of `command_line`, compiling only that source.
    pub fn from_command_line(directory: &Path, program: &Path, command_line: &CommandLine) -> Self {
        let commands = command_line
            .source_tokens()
            .iter()
            .map(|source| {
                let mut arguments = vec![program.display().to_string()];
                arguments.extend(command_line.compile_tokens().iter().cloned());
                arguments.push("-c".to_string());
                arguments.push(source.clone());
                CompileCommand {
                    directory: directory.to_path_buf(),
                    file: PathBuf::from(source),
                    arguments,
                }
            })
            .collect();
        Self { commands }
    }

    /// Parse compile commands from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        let commands: Vec<CompileCommand> = serde_json::from_str(json)?;
        Ok(Self { commands })
    }

    /// Get all compile commands.
    pub fn commands(&self) -> &[CompileCommand] {
        &self.commands
    }

    /// Find the compile command for a specific source file.
    pub fn find_command(&self, source: &Path) -> Option<&CompileCommand> {
        self.commands
            .iter()
            .find(|cmd| cmd.file == source || cmd.file.ends_with(source))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.commands)?)
    }

    /// Write the database to `path`, replacing any previous file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| DriverError::WriteDatabase {
            path: path.to_path_buf(),
            source,
        })
    }
}
