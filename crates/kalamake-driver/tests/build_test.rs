//! Integration tests for command generation and build passes, driven by a
//! recording process runner.

use kalamake_build::{resolve, BuildPlan, BuildVariant, Descriptor, ResolveContext, TargetOs};
use kalamake_driver::{
    flags, BuildState, CompilationDatabase, DriverError, Invocation, Orchestrator, ProcessRunner,
    Settings, ToolchainSettings, VariantOutcome, DATABASE_FILE,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Records invocations and answers with scripted exit codes.
#[derive(Default)]
struct RecordingRunner {
    invocations: Vec<Invocation>,
    exit_codes: Vec<i32>,
}

impl RecordingRunner {
    fn failing_at(call: usize) -> Self {
        let mut exit_codes = vec![0; call];
        exit_codes.push(1);
        Self {
            invocations: Vec::new(),
            exit_codes,
        }
    }
}

impl ProcessRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> kalamake_driver::Result<i32> {
        let code = self
            .exit_codes
            .get(self.invocations.len())
            .copied()
            .unwrap_or(0);
        self.invocations.push(invocation.clone());
        Ok(code)
    }
}

struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().canonicalize().unwrap();
        let project = Self { _dir: dir, root };
        project.file("src/main.cpp", "int main() { return 0; }");
        project
    }

    fn file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn plan(&self, body: &str, os: TargetOs) -> BuildPlan {
        self.file("app.kma", &format!("#KMA VERSION 1.0\n{body}"));
        let mut ctx = ResolveContext::new(self.root.join("app.kma"))
            .unwrap()
            .with_target_os(os);
        let descriptor = Descriptor::load(&mut ctx).unwrap();
        resolve(&descriptor, None, &ctx).unwrap().plan
    }

    /// Settings whose environment script exists, for `cl` builds.
    fn msvc_settings(&self) -> Settings {
        let script = self.file("vcvars64.bat", "@echo off");
        Settings {
            toolchain: ToolchainSettings {
                vcvars: vec![script],
                ..Default::default()
            },
        }
    }
}

fn global(compiler: &str, standard: &str, extra: &str) -> String {
    format!(
        "#global\nname: app\nbinarytype: executable\ncompiler: {compiler}\nstandard: {standard}\nsources: src/\n{extra}"
    )
}

fn warning_tokens(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|arg| flags::is_warning_token(arg))
        .collect()
}

#[test]
fn test_cl_strict_emits_single_w4() {
    let project = Project::new();
    let plan = project.plan(
        &global("cl", "c++17", "warninglevel: strict\ncustomflags: build-release\n"),
        TargetOs::Windows,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), project.msvc_settings());
    let report = orchestrator.build(&plan).unwrap();
    assert!(report.succeeded());

    let invocation = &orchestrator.runner().invocations[0];
    assert_eq!(warning_tokens(&invocation.args), vec!["/W4"]);
    assert_eq!(
        invocation.environment_script,
        Some(project.root.join("vcvars64.bat"))
    );
    assert!(invocation.args.contains(&"/EHsc".to_string()));
    assert!(invocation.args.contains(&"/std:c++17".to_string()));
}

#[test]
fn test_gpp_strict_emits_six_warnings_once() {
    let project = Project::new();
    let plan = project.plan(
        &global(
            "g++",
            "c++17",
            "warninglevel: strict\nflags: -Wall -O2\ncustomflags: build-release\n",
        ),
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    orchestrator.build(&plan).unwrap();

    let args = &orchestrator.runner().invocations[0].args;
    assert_eq!(
        warning_tokens(args),
        vec![
            "-Wall",
            "-Wextra",
            "-Wpedantic",
            "-Wshadow",
            "-Wconversion",
            "-Wsign-conversion"
        ]
    );
    // "-O2" from the user flags and the release variant appears once.
    assert_eq!(args.iter().filter(|a| *a == "-O2").count(), 1);
}

#[test]
fn test_token_order_for_gnu_executable() {
    let project = Project::new();
    project.file("include/app.hpp", "");
    let plan = project.plan(
        &global(
            "g++",
            "c++20",
            "headers: include/\ndefines: APP_VERSION=2\nflags: -march=native\nlinks: m\ncustomflags: build-release, warnings-as-errors\n",
        ),
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    orchestrator.build(&plan).unwrap();

    let invocation = &orchestrator.runner().invocations[0];
    let binary = project.root.join("build/release/app");
    let expected: Vec<String> = vec![
        "-std=c++20".into(),
        "-Wall".into(),
        "-Wextra".into(),
        "-Werror".into(),
        "-DAPP_VERSION=2".into(),
        format!("-I{}", project.root.join("include").display()),
        "-march=native".into(),
        "-O2".into(),
        "-DNDEBUG".into(),
        "-o".into(),
        binary.display().to_string(),
        project.root.join("src/main.cpp").display().to_string(),
        "-lm".into(),
    ];
    assert_eq!(invocation.args, expected);
    assert_eq!(invocation.program, PathBuf::from("g++"));
    assert_eq!(invocation.working_dir, project.root);
    assert!(binary.parent().unwrap().is_dir());
}

#[test]
fn test_link_runtime_outputs_per_os() {
    let project = Project::new();
    let body = "#global\nname: engine\nbinarytype: link-runtime\ncompiler: g++\nstandard: c++17\nsources: src/\ncustomflags: build-release\n";

    let linux = project.plan(body, TargetOs::Linux);
    let schedule = Orchestrator::new(RecordingRunner::default(), Settings::default())
        .schedule(&linux)
        .unwrap();
    let outputs = schedule.variants[0].outputs.as_ref().unwrap();
    assert_eq!(outputs.binary, project.root.join("build/release/engine.so"));
    assert_eq!(outputs.import_library, None);
    let args = &schedule.variants[0].invocation.as_ref().unwrap().args;
    assert!(args.contains(&"-shared".to_string()));
    assert!(args.contains(&"-fPIC".to_string()));

    let windows = project.plan(body, TargetOs::Windows);
    let schedule = Orchestrator::new(RecordingRunner::default(), Settings::default())
        .schedule(&windows)
        .unwrap();
    let outputs = schedule.variants[0].outputs.as_ref().unwrap();
    let import = project.root.join("build/release/engine.dll.a");
    assert_eq!(outputs.binary, project.root.join("build/release/engine.dll"));
    assert_eq!(outputs.import_library, Some(import.clone()));
    let args = &schedule.variants[0].invocation.as_ref().unwrap().args;
    assert!(args.contains(&format!("-Wl,--out-implib,{}", import.display())));
    assert!(!args.contains(&"-fPIC".to_string()));
}

#[test]
fn test_msvc_link_section() {
    let project = Project::new();
    let plan = project.plan(
        "#global\nname: engine\nbinarytype: link-runtime\ncompiler: cl\nstandard: c++17\nsources: src/\nlinks: user32, ws2_32.lib\ncustomflags: build-debug\n",
        TargetOs::Windows,
    );

    let schedule = Orchestrator::new(RecordingRunner::default(), Settings::default())
        .schedule(&plan)
        .unwrap();
    let args = &schedule.variants[0].invocation.as_ref().unwrap().args;
    let link = args.iter().position(|a| a == "/link").unwrap();
    let dir = project.root.join("build").join("debug");
    assert_eq!(
        &args[link..],
        &[
            "/link".to_string(),
            "user32.lib".to_string(),
            "ws2_32.lib".to_string(),
            format!("/IMPLIB:{}", dir.join("engine.lib").display()),
        ]
    );
    assert!(args.contains(&"/LD".to_string()));
    assert!(args.contains(&format!("/Fe:{}", dir.join("engine.dll").display())));
    assert_eq!(args.iter().filter(|a| *a == "/link").count(), 1);
}

#[test]
fn test_flag_heuristics_detect_reldebug() {
    let project = Project::new();
    let plan = project.plan(&global("g++", "c++17", "flags: -O2 -g\n"), TargetOs::Linux);

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    let report = orchestrator.build(&plan).unwrap();

    // No debug flags: the debug side is skipped with a warning.
    let variants: Vec<_> = report.variants.iter().map(|r| r.variant).collect();
    assert_eq!(variants, vec![BuildVariant::None, BuildVariant::RelDebug]);
    assert!(matches!(
        report.variants[0].outcome,
        VariantOutcome::Skipped { .. }
    ));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.succeeded());
    assert_eq!(orchestrator.runner().invocations.len(), 1);
}

#[test]
fn test_build_flags_order_and_debug_lists() {
    let project = Project::new();
    let plan = project.plan(
        &global(
            "g++",
            "c++17",
            "links: m\ndebuglinks: dl\nflags: -O2\ndebugflags: -O0 -g\ncustomflags: build-minsizerel, build-release, build-debug\n",
        ),
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    let report = orchestrator.build(&plan).unwrap();

    let variants: Vec<_> = report.variants.iter().map(|r| r.variant).collect();
    assert_eq!(
        variants,
        vec![
            BuildVariant::Debug,
            BuildVariant::Release,
            BuildVariant::MinSizeRel
        ]
    );

    let invocations = &orchestrator.runner().invocations;
    assert!(invocations[0].args.contains(&"-ldl".to_string()));
    assert!(!invocations[0].args.contains(&"-lm".to_string()));
    assert!(invocations[1].args.contains(&"-lm".to_string()));
    assert!(invocations[2].args.contains(&"-Os".to_string()));
    assert_eq!(report.outputs().count(), 3);
}

#[test]
fn test_build_type_selects_single_variant() {
    let project = Project::new();
    project.file("src/main.c", "int main(void) { return 0; }");
    let plan = project.plan(&global("gcc", "c11", "buildtype: debug\n"), TargetOs::Linux);

    let schedule = Orchestrator::new(RecordingRunner::default(), Settings::default())
        .schedule(&plan)
        .unwrap();
    assert_eq!(schedule.variants.len(), 1);
    assert_eq!(schedule.variants[0].variant, BuildVariant::Debug);
    assert!(schedule.warnings.is_empty());
}

#[test]
fn test_failure_stops_remaining_variants() {
    let project = Project::new();
    project.file("assets/readme.txt", "hello");
    let plan = project.plan(
        &global(
            "g++",
            "c++17",
            "customflags: build-debug, build-release, build-reldebug\n#postbuild\ncopy: assets/readme.txt, dist/readme.txt\n",
        ),
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::failing_at(1), Settings::default());
    let report = orchestrator.build(&plan).unwrap();

    assert_eq!(report.state, BuildState::Failed);
    assert!(!report.succeeded());
    assert_eq!(orchestrator.runner().invocations.len(), 2);
    assert!(matches!(
        report.variants[1].outcome,
        VariantOutcome::Failed { .. }
    ));
    assert!(matches!(
        report.variants[2].outcome,
        VariantOutcome::Skipped { .. }
    ));
    // Post-build actions only run after a fully successful pass.
    assert!(!project.root.join("dist/readme.txt").exists());
}

#[test]
fn test_directory_failure_fails_only_that_variant() {
    let project = Project::new();
    project.file("assets/readme.txt", "hello");
    let plan = project.plan(
        &global(
            "g++",
            "c++17",
            "customflags: build-debug, build-release\n#postbuild\ncopy: assets/readme.txt, dist/readme.txt\n",
        ),
        TargetOs::Linux,
    );
    // A regular file where the debug output directory belongs.
    project.file("build/debug", "");

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    let report = orchestrator.build(&plan).unwrap();

    assert_eq!(report.variants[0].variant, BuildVariant::Debug);
    match &report.variants[0].outcome {
        VariantOutcome::Failed { reason } => assert!(reason.contains("build")),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.variants[1].variant, BuildVariant::Release);
    assert!(matches!(
        report.variants[1].outcome,
        VariantOutcome::Success { .. }
    ));

    let invocations = &orchestrator.runner().invocations;
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].args.contains(&"-O2".to_string()));
    assert_eq!(report.state, BuildState::Failed);
    assert!(!project.root.join("dist/readme.txt").exists());
}

#[test]
fn test_post_build_copy_after_success() {
    let project = Project::new();
    project.file("assets/readme.txt", "hello");
    let plan = project.plan(
        &global(
            "g++",
            "c++17",
            "customflags: build-release\n#postbuild\ncopy: assets/readme.txt, dist/readme.txt\ncopy: missing.txt, dist/missing.txt\n",
        ),
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    let report = orchestrator.build(&plan).unwrap();

    assert!(report.succeeded());
    assert_eq!(
        fs::read_to_string(project.root.join("dist/readme.txt")).unwrap(),
        "hello"
    );
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_link_only_is_unsupported() {
    let project = Project::new();
    let plan = project.plan(
        "#global\nname: core\nbinarytype: link-only\ncompiler: g++\nstandard: c++17\nsources: src/\ncustomflags: build-release\n",
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    let report = orchestrator.build(&plan).unwrap();
    assert_eq!(report.state, BuildState::Failed);
    assert!(orchestrator.runner().invocations.is_empty());

    let err = orchestrator.schedule(&plan).unwrap_err();
    assert!(matches!(err, DriverError::LinkOnlyUnsupported { .. }));
}

#[test]
fn test_cl_without_environment_script_fails() {
    let project = Project::new();
    let plan = project.plan(
        &global("cl", "c++17", "customflags: build-release\n"),
        TargetOs::Windows,
    );
    let settings = Settings {
        toolchain: ToolchainSettings {
            vcvars: vec![project.root.join("absent.bat")],
            ..Default::default()
        },
    };

    // Only meaningful where Visual Studio is not installed.
    if cfg!(windows) {
        eprintln!("Skipping test: host may have Visual Studio installed");
        return;
    }

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), settings);
    let err = orchestrator.build(&plan).unwrap_err();
    assert!(matches!(err, DriverError::EnvironmentScriptNotFound { .. }));
    assert!(orchestrator.runner().invocations.is_empty());
}

#[test]
fn test_compiler_override_from_settings() {
    let project = Project::new();
    let plan = project.plan(
        &global("g++", "c++17", "customflags: build-release\n"),
        TargetOs::Linux,
    );
    let settings = Settings::parse("[toolchain.compilers]\n\"g++\" = \"/opt/gcc-14/bin/g++\"\n").unwrap();

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), settings);
    orchestrator.build(&plan).unwrap();
    assert_eq!(
        orchestrator.runner().invocations[0].program,
        PathBuf::from("/opt/gcc-14/bin/g++")
    );
}

#[test]
fn test_compile_commands_exported() {
    let project = Project::new();
    project.file("src/util.cpp", "");
    let plan = project.plan(
        &global(
            "clang++",
            "c++20",
            "debugflags: -O0 -g\ncustomflags: build-debug, build-release, export-compile-commands\n",
        ),
        TargetOs::Linux,
    );

    let mut orchestrator = Orchestrator::new(RecordingRunner::default(), Settings::default());
    orchestrator.build(&plan).unwrap();

    let json = fs::read_to_string(project.root.join("build").join(DATABASE_FILE)).unwrap();
    let database = CompilationDatabase::parse(&json).unwrap();
    assert_eq!(database.commands().len(), 2);

    let command = database
        .find_command(&project.root.join("src/util.cpp"))
        .unwrap();
    assert_eq!(command.arguments[0], "clang++");
    assert!(command.arguments.contains(&"-O0".to_string()));
    assert!(!command.arguments.contains(&"-o".to_string()));
    assert_eq!(command.directory, project.root);
}
