//! Lowering of a build plan into compiler command-line tokens.

use crate::error::{DriverError, Result};
use crate::flags;
use kalamake_build::paths::dedup;
use kalamake_build::{BinaryType, BuildPlan, BuildVariant, CompilerFamily, Link, TargetOs};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Files and directories one variant writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `<buildPath>/<variant>/<outputName><extension>`.
    pub binary: PathBuf,
    /// Import library next to the binary, for link-runtime builds on
    /// Windows-style toolchains.
    pub import_library: Option<PathBuf>,
    /// `<objectPath>/<variant>`.
    pub object_dir: PathBuf,
}

impl OutputPaths {
    pub fn for_variant(plan: &BuildPlan, variant: BuildVariant) -> Self {
        let extensions = plan.extensions();
        let dir = plan.build_path.join(variant.as_str());

        Self {
            binary: dir.join(format!("{}{}", plan.output_name, extensions.binary)),
            import_library: extensions
                .import_library
                .map(|ext| dir.join(format!("{}{}", plan.output_name, ext))),
            object_dir: plan.object_path.join(variant.as_str()),
        }
    }

    /// Directories that must exist before the compiler runs.
    pub fn directories(&self, family: CompilerFamily) -> Vec<&Path> {
        let mut dirs: Vec<&Path> = self.binary.parent().into_iter().collect();
        if family == CompilerFamily::Msvc {
            dirs.push(&self.object_dir);
        }
        dirs
    }
}

/// The full argument list of one compiler invocation, excluding the
/// compiler executable.
///
/// Tokens are kept in segments so that the compile-only part can be reused
/// for the compilation database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    compile: Vec<String>,
    output: Vec<String>,
    sources: Vec<String>,
    link: Vec<String>,
}

impl CommandLine {
    /// Build the command line of `variant`.
    pub fn build(plan: &BuildPlan, variant: BuildVariant, outputs: &OutputPaths) -> Result<Self> {
        if plan.binary_type == BinaryType::LinkOnly {
            return Err(DriverError::LinkOnlyUnsupported {
                name: plan.name.clone(),
            });
        }

        let family = plan.family();
        let mut compile = Vec::new();

        compile.extend(flags::standard_flag(family, plan.standard));
        compile.extend(owned(flags::warning_flags(plan.compiler, plan.warning_level)));
        compile.extend(owned(flags::custom_flag_tokens(family, &plan.custom_flags)));
        compile.extend(plan.defines.iter().map(|define| format!("-D{define}")));

        let include_prefix = match family {
            CompilerFamily::Msvc => "/I",
            CompilerFamily::Gnu => "-I",
        };
        compile.extend(
            plan.include_dirs
                .iter()
                .map(|dir| format!("{include_prefix}{}", dir.display())),
        );

        if family == CompilerFamily::Msvc && plan.standard.is_cpp() {
            compile.push("/EHsc".to_string());
        }

        compile.extend(plan.flags_for(variant).iter().cloned());
        compile.extend(owned(flags::variant_flags(family, variant).to_vec()));

        if plan.binary_type.is_shared() {
            match family {
                CompilerFamily::Msvc => compile.push("/LD".to_string()),
                CompilerFamily::Gnu => {
                    compile.push("-shared".to_string());
                    if plan.target_os == TargetOs::Linux {
                        compile.push("-fPIC".to_string());
                    }
                }
            }
        }

        let output = match family {
            CompilerFamily::Msvc => vec![
                format!("/Fe:{}", outputs.binary.display()),
                format!("/Fo:{}{}", outputs.object_dir.display(), MAIN_SEPARATOR),
            ],
            CompilerFamily::Gnu => {
                let mut output: Vec<String> = outputs
                    .import_library
                    .iter()
                    .map(|import| format!("-Wl,--out-implib,{}", import.display()))
                    .collect();
                output.push("-o".to_string());
                output.push(outputs.binary.display().to_string());
                output
            }
        };

        let sources = plan
            .sources
            .iter()
            .map(|source| source.display().to_string())
            .collect();

        let link = link_tokens(family, plan.links_for(variant), outputs);

        Ok(Self {
            compile,
            output,
            sources,
            link,
        })
    }

    /// Tokens that only affect compilation: standard, warnings, defines,
    /// includes and optimization flags.
    pub fn compile_tokens(&self) -> &[String] {
        &self.compile
    }

    pub fn source_tokens(&self) -> &[String] {
        &self.sources
    }

    /// Every token in invocation order, with repeats removed.
    pub fn tokens(&self) -> Vec<String> {
        let all = self
            .compile
            .iter()
            .chain(&self.output)
            .chain(&self.sources)
            .chain(&self.link)
            .cloned()
            .collect();
        dedup(all)
    }
}

fn link_tokens(family: CompilerFamily, links: &[Link], outputs: &OutputPaths) -> Vec<String> {
    match family {
        CompilerFamily::Gnu => links
            .iter()
            .map(|link| match link {
                Link::Path(path) => path.display().to_string(),
                Link::Name(name) if name.contains('.') => format!("-l:{name}"),
                Link::Name(name) => format!("-l{name}"),
            })
            .collect(),
        CompilerFamily::Msvc => {
            let mut tokens: Vec<String> = links
                .iter()
                .map(|link| match link {
                    Link::Path(path) => path.display().to_string(),
                    Link::Name(name) if name.contains('.') => name.clone(),
                    Link::Name(name) => format!("{name}.lib"),
                })
                .collect();
            if let Some(import) = &outputs.import_library {
                tokens.push(format!("/IMPLIB:{}", import.display()));
            }
            if !tokens.is_empty() {
                tokens.insert(0, "/link".to_string());
            }
            tokens
        }
    }
}

fn owned(tokens: Vec<&str>) -> impl Iterator<Item = String> + '_ {
    tokens.into_iter().map(str::to_string)
}
