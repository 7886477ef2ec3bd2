//! Validation and resolution of a parsed descriptor into a [`BuildPlan`].
//!
//! Stages run in a fixed order and the first hard failure aborts the whole
//! resolution:
//!
//! name → binary type → standard → compiler → sources → build/object paths
//! → headers → links → warning level → defines → flags → custom flags →
//! cross-field path checks.
//!
//! Soft failures (unusable files, unknown link kinds) drop the offending
//! item and are returned as [`Warning`]s.

use crate::context::ResolveContext;
use crate::descriptor::{Descriptor, RawProfile, RawValue};
use crate::error::{BuildError, Result};
use crate::paths;
use crate::plan::{BuildPlan, Link, PostBuildAction, Warning};
use crate::registry::{
    BinaryType, BuildVariant, CompilerId, CustomFlag, Field, Standard, WarningLevel,
};
use crate::target::{binary_extensions, CompilerFamily};
use std::path::{Path, PathBuf};

/// Longest accepted binary or profile name.
pub const MAX_NAME_LEN: usize = 20;

const STATIC_LIBRARY_EXTENSIONS: &[&str] = &["lib", "a"];

/// Output of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub plan: BuildPlan,
    pub warnings: Vec<Warning>,
}

/// Check a binary or profile name: 1 to 20 characters of `[A-Za-z0-9._-]`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BuildError::NameTooShort {
            name: name.to_string(),
        });
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(BuildError::NameTooLong {
            name: name.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    if let Some(character) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(BuildError::NameIllegalChar {
            name: name.to_string(),
            character,
        });
    }
    Ok(())
}

/// Resolve `descriptor` for `profile`.
///
/// With no explicit profile, the global `targetprofile` is used when set,
/// otherwise the global defaults alone.
pub fn resolve(
    descriptor: &Descriptor,
    profile: Option<&str>,
    ctx: &ResolveContext,
) -> Result<Resolution> {
    let profile = select_profile(descriptor, profile)?;
    Resolver::new(descriptor, profile, ctx).run()
}

fn select_profile<'d>(
    descriptor: &'d Descriptor,
    requested: Option<&str>,
) -> Result<Option<&'d RawProfile>> {
    let target = descriptor
        .global
        .get(Field::TargetProfile)
        .map(|value| value.text.clone());
    if let Some(target) = &target {
        if descriptor.profile(target).is_none() {
            return Err(BuildError::UnknownProfile {
                name: target.clone(),
            });
        }
    }

    let name = requested.map(str::to_string).or(target);

    match name {
        Some(name) => descriptor
            .profile(&name)
            .map(Some)
            .ok_or(BuildError::UnknownProfile { name }),
        None => Ok(None),
    }
}

struct Resolver<'a> {
    descriptor: &'a Descriptor,
    profile: Option<&'a RawProfile>,
    ctx: &'a ResolveContext,
    warnings: Vec<Warning>,
}

impl<'a> Resolver<'a> {
    fn new(
        descriptor: &'a Descriptor,
        profile: Option<&'a RawProfile>,
        ctx: &'a ResolveContext,
    ) -> Self {
        Self {
            descriptor,
            profile,
            ctx,
            warnings: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Resolution> {
        if let Some(field) = Field::REQUIRED
            .iter()
            .copied()
            .find(|field| !self.descriptor.global.contains(*field))
        {
            return Err(BuildError::MissingField { field });
        }

        let name = self.required(Field::Name)?.text.clone();
        validate_name(&name)?;

        let binary_type: BinaryType = self.registry_value(Field::BinaryType)?;
        let standard: Standard = self.registry_value(Field::Standard)?;
        let compiler: CompilerId = self.registry_value(Field::Compiler)?;
        check_compatibility(compiler, standard)?;
        let family = compiler.family();

        let sources = self.sources(standard)?;
        let (build_path, output_name) = self.build_path(&name, family, binary_type)?;
        let object_path = self.object_path(&build_path)?;
        let headers = self.headers(standard)?;
        let include_dirs = paths::dedup(
            headers
                .iter()
                .filter_map(|header| {
                    if header.is_dir() {
                        Some(header.clone())
                    } else {
                        header.parent().map(Path::to_path_buf)
                    }
                })
                .collect(),
        );
        let links = self.links(Field::Links);
        let debug_links = self.links(Field::DebugLinks);

        let warning_level = match self.value(Field::WarningLevel) {
            Some(_) => self.registry_value(Field::WarningLevel)?,
            None => WarningLevel::default(),
        };

        let defines = self.defines()?;
        let flags = self.flags(Field::Flags, family);
        let debug_flags = self.flags(Field::DebugFlags, family);
        let custom_flags = self.custom_flags()?;
        let build_type = self.build_type()?;

        self.check_paths(&build_path, &object_path)?;

        let post_build = self.post_build();

        let plan = BuildPlan {
            profile: self.profile.map(|p| p.name.clone()),
            name,
            output_name,
            binary_type,
            compiler,
            standard,
            build_type,
            sources,
            headers,
            include_dirs,
            build_path,
            object_path,
            links,
            debug_links,
            warning_level,
            defines,
            flags,
            debug_flags,
            custom_flags,
            post_build,
            target_os: self.ctx.target_os(),
            descriptor_dir: self.ctx.base_dir().to_path_buf(),
        };

        Ok(Resolution {
            plan,
            warnings: self.warnings,
        })
    }

    /// The profile's value for `field`, falling back to the global one.
    fn value(&self, field: Field) -> Option<&'a RawValue> {
        if field.is_overridable() {
            if let Some(value) = self.profile.and_then(|p| p.fields.get(field)) {
                return Some(value);
            }
        }
        self.descriptor.global.get(field)
    }

    fn required(&self, field: Field) -> Result<&'a RawValue> {
        self.value(field).ok_or(BuildError::MissingField { field })
    }

    fn registry_value<T: RegistryValue>(&self, field: Field) -> Result<T> {
        let raw = self.required(field)?;
        T::from_spelling(&raw.text).ok_or_else(|| BuildError::InvalidValue {
            field,
            value: raw.text.clone(),
        })
    }

    fn warn(&mut self, field: Field, message: String) {
        self.warnings.push(Warning::new(field, message));
    }

    fn sources(&mut self, standard: Standard) -> Result<Vec<PathBuf>> {
        let raw = self.required(Field::Sources)?;
        let allowed = standard.source_extensions();
        let mut sources = Vec::new();

        for item in raw.items() {
            let path = resolve_existing(Field::Sources, &raw.origin, item)?;
            let candidates = if path.is_dir() {
                paths::collect_files(&path)
                    .map_err(|source| BuildError::Path {
                        field: Field::Sources,
                        path: path.clone(),
                        source,
                    })?
                    .iter()
                    .map(|file| canonical(Field::Sources, file))
                    .collect::<Result<Vec<_>>>()?
            } else {
                vec![path]
            };

            for file in candidates {
                if matches_extension(&file, allowed) {
                    sources.push(file);
                } else {
                    self.warn(
                        Field::Sources,
                        format!(
                            "skipping {}: {} sources must end in {}",
                            file.display(),
                            standard,
                            describe_extensions(allowed)
                        ),
                    );
                }
            }
        }

        let sources = paths::dedup(sources);
        if sources.is_empty() {
            return Err(BuildError::NoSources);
        }
        Ok(sources)
    }

    fn headers(&mut self, standard: Standard) -> Result<Vec<PathBuf>> {
        let Some(raw) = self.value(Field::Headers) else {
            return Ok(Vec::new());
        };
        let allowed = standard.header_extensions();
        let mut headers = Vec::new();

        for item in raw.items() {
            let path = resolve_existing(Field::Headers, &raw.origin, item)?;
            if path.is_dir() || matches_extension(&path, allowed) {
                headers.push(path);
            } else {
                self.warn(
                    Field::Headers,
                    format!(
                        "skipping {}: {} headers must end in {}",
                        path.display(),
                        standard,
                        describe_extensions(allowed)
                    ),
                );
            }
        }

        Ok(paths::dedup(headers))
    }

    /// Returns the build directory and the binary's file stem.
    fn build_path(
        &self,
        name: &str,
        family: CompilerFamily,
        binary_type: BinaryType,
    ) -> Result<(PathBuf, String)> {
        let Some(raw) = self.value(Field::BuildPath) else {
            return Ok((self.ctx.base_dir().join("build"), name.to_string()));
        };

        let path = paths::normalize(&paths::absolutize(&raw.origin, &raw.text));
        if path.is_dir() {
            let path = canonical(Field::BuildPath, &path)?;
            return Ok((path, name.to_string()));
        }

        if path.extension().is_none() {
            if path.exists() {
                return Err(BuildError::InvalidExtension {
                    field: Field::BuildPath,
                    path,
                    expected: "a directory or a file name with the binary's extension".to_string(),
                });
            }
            return Ok((path, name.to_string()));
        }

        let expected = binary_extensions(family, self.ctx.target_os(), binary_type).binary;
        if expected.is_empty() || !paths::has_suffix(&path, expected) {
            let expected = if expected.is_empty() {
                format!(
                    "no extension for {} binaries built by {} on {}",
                    binary_type,
                    family,
                    self.ctx.target_os()
                )
            } else {
                format!("`{expected}`")
            };
            return Err(BuildError::InvalidExtension {
                field: Field::BuildPath,
                path,
                expected,
            });
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        let stem = file_name[..file_name.len() - expected.len()].to_string();
        validate_name(&stem)?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.ctx.base_dir().to_path_buf());
        Ok((dir, stem))
    }

    fn object_path(&self, build_path: &Path) -> Result<PathBuf> {
        let Some(raw) = self.value(Field::ObjectPath) else {
            return Ok(build_path.join("obj"));
        };

        let path = paths::normalize(&paths::absolutize(&raw.origin, &raw.text));
        if path.is_dir() {
            return canonical(Field::ObjectPath, &path);
        }
        if path.exists() || path.extension().is_some() {
            return Err(BuildError::InvalidExtension {
                field: Field::ObjectPath,
                path,
                expected: "a directory".to_string(),
            });
        }
        Ok(path)
    }

    fn links(&mut self, field: Field) -> Vec<Link> {
        let Some(raw) = self.value(field) else {
            return Vec::new();
        };
        let mut links = Vec::new();

        for item in raw.items() {
            let extension = paths::extension(Path::new(item));
            let is_library = match extension.as_deref() {
                None => true,
                Some(ext) => STATIC_LIBRARY_EXTENSIONS.contains(&ext),
            };
            if !is_library {
                self.warn(
                    field,
                    format!("skipping `{item}`: links must end in .lib or .a or be a library name"),
                );
                continue;
            }

            if paths::has_separator(item) {
                let path = paths::absolutize(&raw.origin, item);
                match paths::canonicalize(&path) {
                    Ok(path) if path.is_file() => links.push(Link::Path(path)),
                    _ => self.warn(
                        field,
                        format!("skipping `{item}`: {} is not a readable file", path.display()),
                    ),
                }
                continue;
            }

            let local = raw.origin.join(item);
            match extension {
                Some(_) if local.is_file() => match paths::canonicalize(&local) {
                    Ok(path) => links.push(Link::Path(path)),
                    Err(err) => self.warn(field, format!("skipping `{item}`: {err}")),
                },
                _ => links.push(Link::Name(item.to_string())),
            }
        }

        paths::dedup(links)
    }

    fn defines(&self) -> Result<Vec<String>> {
        let Some(raw) = self.value(Field::Defines) else {
            return Ok(Vec::new());
        };
        let mut defines = Vec::new();
        for item in raw.items() {
            if item.chars().any(char::is_whitespace) {
                return Err(BuildError::InvalidDefine {
                    define: item.to_string(),
                });
            }
            defines.push(item.to_string());
        }
        Ok(paths::dedup(defines))
    }

    fn flags(&self, field: Field, family: CompilerFamily) -> Vec<String> {
        let Some(raw) = self.value(field) else {
            return Vec::new();
        };
        let flags = raw
            .items()
            .flat_map(str::split_whitespace)
            .map(|token| prefix_flag(token, family))
            .collect();
        paths::dedup(flags)
    }

    fn custom_flags(&self) -> Result<Vec<CustomFlag>> {
        let Some(raw) = self.value(Field::CustomFlags) else {
            return Ok(Vec::new());
        };
        let flags = raw
            .items()
            .map(|item| {
                CustomFlag::parse(item).ok_or_else(|| BuildError::InvalidValue {
                    field: Field::CustomFlags,
                    value: item.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(paths::dedup(flags))
    }

    fn build_type(&self) -> Result<Option<BuildVariant>> {
        let Some(raw) = self.value(Field::BuildType) else {
            return Ok(None);
        };
        match BuildVariant::parse(&raw.text) {
            Some(variant) if variant != BuildVariant::None => Ok(Some(variant)),
            _ => Err(BuildError::InvalidValue {
                field: Field::BuildType,
                value: raw.text.clone(),
            }),
        }
    }

    fn check_paths(&self, build_path: &Path, object_path: &Path) -> Result<()> {
        if build_path == object_path {
            return Err(BuildError::PathConflict {
                field: Field::ObjectPath,
                message: format!(
                    "object path {} must differ from the build path",
                    object_path.display()
                ),
            });
        }
        if build_path == self.ctx.base_dir() {
            return Err(BuildError::PathConflict {
                field: Field::BuildPath,
                message: format!(
                    "build path {} must not be the descriptor directory",
                    build_path.display()
                ),
            });
        }
        Ok(())
    }

    fn post_build(&self) -> Vec<PostBuildAction> {
        self.descriptor
            .post_build
            .iter()
            .map(|copy| PostBuildAction::Copy {
                from: paths::normalize(&paths::absolutize(&copy.origin, &copy.from)),
                to: paths::normalize(&paths::absolutize(&copy.origin, &copy.to)),
            })
            .collect()
    }
}

/// Registry enums the resolver can parse generically.
trait RegistryValue: Sized {
    fn from_spelling(text: &str) -> Option<Self>;
}

macro_rules! impl_registry_value {
    ($($ty:ty),+) => {
        $(
            impl RegistryValue for $ty {
                fn from_spelling(text: &str) -> Option<Self> {
                    <$ty>::parse(text)
                }
            }
        )+
    };
}

impl_registry_value!(BinaryType, Standard, CompilerId, WarningLevel);

fn check_compatibility(compiler: CompilerId, standard: Standard) -> Result<()> {
    let compatible = if standard.is_cpp() {
        compiler.supports_cpp()
    } else {
        !compiler.is_cpp_only()
    };
    if compatible {
        Ok(())
    } else {
        Err(BuildError::IncompatibleStandard { compiler, standard })
    }
}

fn resolve_existing(field: Field, origin: &Path, item: &str) -> Result<PathBuf> {
    canonical(field, &paths::absolutize(origin, item))
}

fn canonical(field: Field, path: &Path) -> Result<PathBuf> {
    paths::canonicalize(path).map_err(|source| BuildError::Path {
        field,
        path: path.to_path_buf(),
        source,
    })
}

fn matches_extension(path: &Path, allowed: &[&str]) -> bool {
    paths::extension(path).is_some_and(|ext| allowed.contains(&ext.as_str()))
}

fn describe_extensions(allowed: &[&str]) -> String {
    allowed
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Give a flag its family prefix. MSVC also accepts `-`-prefixed flags,
/// which are rewritten to `/`.
pub fn prefix_flag(token: &str, family: CompilerFamily) -> String {
    let prefix = family.flag_prefix();
    if token.starts_with(prefix) {
        return token.to_string();
    }
    match (family, token.strip_prefix('-')) {
        (CompilerFamily::Msvc, Some(rest)) => format!("{prefix}{rest}"),
        _ => format!("{prefix}{token}"),
    }
}
