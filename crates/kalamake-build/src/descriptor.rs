//! `.kma` descriptor parsing.
//!
//! A descriptor is line oriented:
//!
//! ```text
//! #KMA VERSION 1.0
//! // comment
//! #include shared/common.kma
//!
//! #global
//! name: app
//! binarytype: executable
//! compiler: g++
//! standard: c++17
//! sources: src/
//!
//! #profile fast
//! flags: -O2
//!
//! #postbuild
//! copy: assets, build/release/assets
//! ```
//!
//! Parsing produces raw, unvalidated strings keyed by field. Validation and
//! path resolution happen later in [`crate::resolve`].

use crate::context::ResolveContext;
use crate::error::{BuildError, Result};
use crate::paths;
use crate::registry::{Category, Field};
use crate::resolve::validate_name;
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// The only supported version banner.
pub const VERSION_BANNER: &str = "#KMA VERSION 1.0";

/// Separator between the items of a list value.
pub const LIST_SEPARATOR: &str = ", ";

/// Lines starting with this are ignored.
pub const COMMENT_PREFIX: &str = "//";

const COPY_ACTION: &str = "copy";

/// A field value exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub text: String,
    /// 1-based line number.
    pub line: usize,
    /// Directory of the descriptor the value was written in. Relative paths
    /// resolve against it.
    pub origin: PathBuf,
}

impl RawValue {
    /// The value split into list items, in order, duplicates included.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.text
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
    }
}

/// Fields set in one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawScope {
    fields: IndexMap<Field, RawValue>,
}

impl RawScope {
    pub fn get(&self, field: Field) -> Option<&RawValue> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &RawValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, field: Field, value: RawValue, scope: &str) -> Result<()> {
        match self.fields.entry(field) {
            Entry::Occupied(_) => Err(BuildError::DuplicateField {
                field,
                scope: scope.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }
}

/// A `#profile <name>` category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProfile {
    pub name: String,
    pub line: usize,
    pub fields: RawScope,
}

/// A `copy: <from>, <to>` line of the `#postbuild` category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCopy {
    pub from: String,
    pub to: String,
    pub line: usize,
    pub origin: PathBuf,
}

/// An unresolved descriptor, with its includes merged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub path: PathBuf,
    pub directory: PathBuf,
    /// `#include` targets as written.
    pub includes: Vec<RawValue>,
    pub global: RawScope,
    pub profiles: IndexMap<String, RawProfile>,
    pub post_build: Vec<RawCopy>,
}

impl Descriptor {
    /// Parse descriptor text. Does not touch the filesystem, so includes are
    /// recorded but not followed.
    pub fn parse(text: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Parser::new(path, directory).run(text)
    }

    /// Read and parse the context's descriptor, following includes.
    ///
    /// A descriptor reached through several includes is merged once.
    pub fn load(ctx: &mut ResolveContext) -> Result<Self> {
        ctx.reset();
        let path = ctx.descriptor_path().to_path_buf();
        ctx.enter(&path)?;
        let result = Self::read_and_merge(&path, ctx);
        ctx.leave();
        result
    }

    /// `None` when `path` was already merged.
    fn load_include(path: &Path, ctx: &mut ResolveContext) -> Result<Option<Self>> {
        if !ctx.enter(path)? {
            tracing::debug!(path = %path.display(), "descriptor already included");
            return Ok(None);
        }
        let result = Self::read_and_merge(path, ctx);
        ctx.leave();
        result.map(Some)
    }

    fn read_and_merge(path: &Path, ctx: &mut ResolveContext) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading descriptor");

        let text = std::fs::read_to_string(path).map_err(|source| BuildError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut descriptor = Self::parse(&text, path)?;

        for include in descriptor.includes.clone() {
            let target = paths::absolutize(&include.origin, &include.text);
            if !target.is_file() || paths::extension(&target).as_deref() != Some("kma") {
                return Err(BuildError::IncludeNotFound { path: target });
            }
            let target = paths::canonicalize(&target).map_err(|source| BuildError::Read {
                path: target.clone(),
                source,
            })?;
            if let Some(included) = Self::load_include(&target, ctx)? {
                descriptor.merge(included)?;
            }
        }

        Ok(descriptor)
    }

    /// Merge an included descriptor: its global fields fill the gaps of ours,
    /// its profiles and post-build actions are appended.
    fn merge(&mut self, included: Descriptor) -> Result<()> {
        for (field, value) in included.global.fields {
            self.global.fields.entry(field).or_insert(value);
        }

        for (name, profile) in included.profiles {
            if self.profiles.contains_key(&name) {
                return Err(BuildError::DuplicateProfile { name });
            }
            self.profiles.insert(name, profile);
        }

        self.post_build.extend(included.post_build);
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Option<&RawProfile> {
        self.profiles.get(name)
    }
}

/// The category the parser is currently filling.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    /// Before the first `#global`/`#profile`/`#postbuild` line.
    Preamble,
    Global,
    Profile(String),
    PostBuild,
}

struct Parser<'a> {
    path: &'a Path,
    directory: PathBuf,
    section: Section,
    seen_global: bool,
    seen_post_build: bool,
    includes: Vec<RawValue>,
    global: RawScope,
    profiles: IndexMap<String, RawProfile>,
    post_build: Vec<RawCopy>,
}

impl<'a> Parser<'a> {
    fn new(path: &'a Path, directory: PathBuf) -> Self {
        Self {
            path,
            directory,
            section: Section::Preamble,
            seen_global: false,
            seen_post_build: false,
            includes: Vec::new(),
            global: RawScope::default(),
            profiles: IndexMap::new(),
            post_build: Vec::new(),
        }
    }

    fn run(mut self, text: &str) -> Result<Descriptor> {
        let mut lines = text.lines().enumerate();

        match lines.next() {
            Some((_, first)) if first.trim_end() == VERSION_BANNER => {}
            _ => {
                return Err(BuildError::Version {
                    path: self.path.to_path_buf(),
                })
            }
        }

        let mut last_line = 1;
        for (index, raw) in lines {
            let number = index + 1;
            last_line = number;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
                continue;
            }

            if line.starts_with('#') {
                self.category_line(line, number)?;
            } else {
                self.field_line(line, number)?;
            }
        }

        if !self.seen_global {
            return Err(self.structure(last_line, "missing #global category"));
        }

        Ok(Descriptor {
            path: self.path.to_path_buf(),
            directory: self.directory,
            includes: self.includes,
            global: self.global,
            profiles: self.profiles,
            post_build: self.post_build,
        })
    }

    fn category_line(&mut self, line: &str, number: usize) -> Result<()> {
        let (head, argument) = match line.split_once(' ') {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };

        match (Category::parse(head), argument) {
            (Some(Category::Include), Some(target)) => {
                if self.section != Section::Preamble {
                    return Err(self.structure(number, "#include must appear before #global"));
                }
                let include = self.raw(target, number);
                self.includes.push(include);
            }
            (Some(Category::Global), None) => {
                if self.seen_global {
                    return Err(self.structure(number, "#global category is declared more than once"));
                }
                self.seen_global = true;
                self.section = Section::Global;
            }
            (Some(Category::Profile), Some(name)) => {
                validate_name(name)?;
                if self.profiles.contains_key(name) {
                    return Err(BuildError::DuplicateProfile {
                        name: name.to_string(),
                    });
                }
                self.profiles.insert(
                    name.to_string(),
                    RawProfile {
                        name: name.to_string(),
                        line: number,
                        fields: RawScope::default(),
                    },
                );
                self.section = Section::Profile(name.to_string());
            }
            (Some(Category::PostBuild), None) => {
                if self.seen_post_build {
                    return Err(self.structure(number, "#postbuild category is declared more than once"));
                }
                self.seen_post_build = true;
                self.section = Section::PostBuild;
            }
            _ => return Err(self.unknown(line, number)),
        }

        Ok(())
    }

    fn field_line(&mut self, line: &str, number: usize) -> Result<()> {
        let Some((prefix, rest)) = line.split_once(':') else {
            return Err(self.unknown(line, number));
        };
        let value = match rest.strip_prefix(' ') {
            Some(value) => value.trim(),
            None if rest.trim().is_empty() => "",
            None => return Err(self.unknown(line, number)),
        };

        if prefix == COPY_ACTION && self.section == Section::PostBuild {
            return self.copy_action(value, line, number);
        }

        let Some(field) = Field::parse(prefix) else {
            return Err(self.unknown(line, number));
        };
        if value.is_empty() {
            return Err(BuildError::EmptyValue { field, line: number });
        }

        let raw = self.raw(value, number);
        match &self.section {
            Section::Preamble => Err(self.structure(number, "field line outside of a category")),
            Section::PostBuild => Err(self.structure(number, "#postbuild only accepts copy actions")),
            Section::Global => self.global.insert(field, raw, "the #global category"),
            Section::Profile(name) => {
                if !field.is_overridable() {
                    return Err(BuildError::NotOverridable {
                        field,
                        profile: name.clone(),
                    });
                }
                let scope = format!("profile `{name}`");
                match self.profiles.get_mut(name) {
                    Some(profile) => profile.fields.insert(field, raw, &scope),
                    None => Err(BuildError::UnknownProfile { name: name.clone() }),
                }
            }
        }
    }

    fn copy_action(&mut self, value: &str, line: &str, number: usize) -> Result<()> {
        let items: Vec<&str> = value.split(LIST_SEPARATOR).map(str::trim).collect();
        match items.as_slice() {
            [from, to] if !from.is_empty() && !to.is_empty() => {
                self.post_build.push(RawCopy {
                    from: from.to_string(),
                    to: to.to_string(),
                    line: number,
                    origin: self.directory.clone(),
                });
                Ok(())
            }
            _ => Err(self.structure(
                number,
                &format!("`{line}` must have the form `copy: <from>, <to>`"),
            )),
        }
    }

    fn raw(&self, text: &str, line: usize) -> RawValue {
        RawValue {
            text: text.to_string(),
            line,
            origin: self.directory.clone(),
        }
    }

    fn unknown(&self, line: &str, number: usize) -> BuildError {
        BuildError::UnknownLine {
            path: self.path.to_path_buf(),
            line: number,
            text: line.to_string(),
        }
    }

    fn structure(&self, line: usize, message: &str) -> BuildError {
        BuildError::Structure {
            path: self.path.to_path_buf(),
            line,
            message: message.to_string(),
        }
    }
}
