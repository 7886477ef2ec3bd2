//! Process execution and MSVC environment discovery.

use crate::error::{DriverError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Locations of `vcvars64.bat`, newest Visual Studio first and IDE editions
/// before Build Tools.
pub const ENVIRONMENT_SCRIPT_CANDIDATES: &[&str] = &[
    r"C:\Program Files\Microsoft Visual Studio\2022\Enterprise\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files\Microsoft Visual Studio\2022\Professional\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2022\BuildTools\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Enterprise\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Professional\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Community\VC\Auxiliary\Build\vcvars64.bat",
    r"C:\Program Files (x86)\Microsoft Visual Studio\2019\BuildTools\VC\Auxiliary\Build\vcvars64.bat",
];

/// One compiler process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Script that sets up the compiler environment before `program` runs.
    pub environment_script: Option<PathBuf>,
    pub working_dir: PathBuf,
}

impl Invocation {
    /// Shell-like rendering for logs and dry runs.
    pub fn display(&self) -> String {
        let mut line = quote(&self.program.display().to_string());
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        line
    }
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.contains(char::is_whitespace) {
        format!("\"{token}\"")
    } else {
        token.to_string()
    }
}

/// Runs compiler invocations and reports their exit status.
pub trait ProcessRunner {
    /// Run to completion. Returns the exit code, `-1` when the process was
    /// terminated without one.
    fn run(&mut self, invocation: &Invocation) -> Result<i32>;
}

/// Runs invocations as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<i32> {
        let mut cmd = match &invocation.environment_script {
            Some(script) => environment_command(script, invocation)?,
            None => {
                let mut cmd = Command::new(&invocation.program);
                cmd.args(&invocation.args);
                cmd
            }
        };
        cmd.current_dir(&invocation.working_dir);

        let status = cmd.status().map_err(|source| DriverError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(windows)]
fn environment_command(script: &Path, invocation: &Invocation) -> Result<Command> {
    use std::os::windows::process::CommandExt;

    let line = format!(
        "\"call \"{}\" >nul && {}\"",
        script.display(),
        invocation.display()
    );
    let mut cmd = Command::new("cmd");
    cmd.args(["/S", "/C"]).raw_arg(line);
    Ok(cmd)
}

#[cfg(not(windows))]
fn environment_command(script: &Path, _invocation: &Invocation) -> Result<Command> {
    Err(DriverError::EnvironmentScriptUnsupported {
        script: script.to_path_buf(),
    })
}

/// Find `vcvars64.bat`, trying `extra` locations before the standard ones.
pub fn find_environment_script(extra: &[PathBuf]) -> Result<PathBuf> {
    probe_environment_script(extra, |path| path.is_file())
}

/// Like [`find_environment_script`] with a custom existence check.
pub fn probe_environment_script(
    extra: &[PathBuf],
    exists: impl Fn(&Path) -> bool,
) -> Result<PathBuf> {
    let candidates: Vec<PathBuf> = extra
        .iter()
        .cloned()
        .chain(ENVIRONMENT_SCRIPT_CANDIDATES.iter().map(PathBuf::from))
        .collect();

    for candidate in &candidates {
        tracing::debug!("probing environment script {}", candidate.display());
        if exists(candidate) {
            return Ok(candidate.clone());
        }
    }

    Err(DriverError::EnvironmentScriptNotFound {
        searched: candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_order_prefers_newest_ide() {
        let community = PathBuf::from(ENVIRONMENT_SCRIPT_CANDIDATES[2]);
        let build_tools_2019 = PathBuf::from(ENVIRONMENT_SCRIPT_CANDIDATES[7]);

        let found = probe_environment_script(&[], |path| {
            path == community.as_path() || path == build_tools_2019.as_path()
        })
        .unwrap();
        assert_eq!(found, community);
    }

    #[test]
    fn test_configured_scripts_probed_first() {
        let custom = PathBuf::from("D:/vs/vcvars64.bat");
        let found = probe_environment_script(std::slice::from_ref(&custom), |_| true).unwrap();
        assert_eq!(found, custom);
    }

    #[test]
    fn test_missing_script_lists_all_candidates() {
        let err = probe_environment_script(&[PathBuf::from("x.bat")], |_| false).unwrap_err();
        match err {
            DriverError::EnvironmentScriptNotFound { searched } => {
                assert_eq!(searched.len(), ENVIRONMENT_SCRIPT_CANDIDATES.len() + 1);
                assert_eq!(searched[0], PathBuf::from("x.bat"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_display_quotes_spaces() {
        let invocation = Invocation {
            program: PathBuf::from("g++"),
            args: vec!["-o".into(), "my app".into()],
            environment_script: None,
            working_dir: PathBuf::from("."),
        };
        assert_eq!(invocation.display(), "g++ -o \"my app\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_exit_code() {
        let mut runner = SystemRunner;
        let ok = Invocation {
            program: PathBuf::from("true"),
            args: Vec::new(),
            environment_script: None,
            working_dir: std::env::temp_dir(),
        };
        assert_eq!(runner.run(&ok).unwrap(), 0);

        let missing = Invocation {
            program: PathBuf::from("kalamake-no-such-compiler"),
            ..ok
        };
        assert!(matches!(runner.run(&missing), Err(DriverError::Spawn { .. })));
    }
}
