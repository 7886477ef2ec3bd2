//! Error types for kalamake-build.

use crate::registry::{CompilerId, Field, Standard};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for kalamake-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Hard failures of descriptor parsing and resolution.
///
/// Every variant aborts the whole resolution; no partial build plan is
/// produced.
#[derive(Error, Diagnostic, Debug)]
pub enum BuildError {
    /// Failed to read a descriptor file.
    #[error("failed to read descriptor {}: {source}", path.display())]
    #[diagnostic(code(kalamake::read))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Line 0 is not the supported version banner.
    #[error("version field value is incorrect or missing in {}", path.display())]
    #[diagnostic(
        code(kalamake::version),
        help("the first line of a descriptor must be `#KMA VERSION 1.0`")
    )]
    Version { path: PathBuf },

    /// A line matched no category or field.
    #[error("unrecognized line {line} in {}: `{text}`", path.display())]
    #[diagnostic(code(kalamake::unknown_line))]
    UnknownLine {
        path: PathBuf,
        line: usize,
        text: String,
    },

    /// Category structure is broken (missing or repeated sections, lines
    /// outside any category).
    #[error("{message} (line {line} in {})", path.display())]
    #[diagnostic(code(kalamake::structure))]
    Structure {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A field appeared twice in one scope.
    #[error("field `{field}` is declared more than once in {scope}")]
    #[diagnostic(code(kalamake::duplicate_field))]
    DuplicateField { field: Field, scope: String },

    /// A profile tried to set a global-only field.
    #[error("field `{field}` cannot be overridden in profile `{profile}`")]
    #[diagnostic(
        code(kalamake::not_overridable),
        help("move this field to the #global category")
    )]
    NotOverridable { field: Field, profile: String },

    /// A required global field is absent.
    #[error("field `{field}` is required in the #global category")]
    #[diagnostic(code(kalamake::missing_field))]
    MissingField { field: Field },

    /// A field line carries no value.
    #[error("field `{field}` has no value (line {line})")]
    #[diagnostic(code(kalamake::empty_value))]
    EmptyValue { field: Field, line: usize },

    /// A value is not a member of its registry.
    #[error("invalid value `{value}` for field `{field}`")]
    #[diagnostic(code(kalamake::invalid_value))]
    InvalidValue { field: Field, value: String },

    /// Name shorter than one character.
    #[error("name `{name}` is too short, it must contain at least 1 character")]
    #[diagnostic(code(kalamake::name))]
    NameTooShort { name: String },

    /// Name longer than twenty characters.
    #[error("name `{name}` is too long, it must not exceed {max} characters")]
    #[diagnostic(code(kalamake::name))]
    NameTooLong { name: String, max: usize },

    /// Name contains a character outside `[A-Za-z0-9._-]`.
    #[error("name `{name}` contains illegal character `{character}`")]
    #[diagnostic(
        code(kalamake::name),
        help("names may only contain letters, digits, `.`, `_` and `-`")
    )]
    NameIllegalChar { name: String, character: char },

    /// Two profiles share a name.
    #[error("profile `{name}` is declared more than once")]
    #[diagnostic(code(kalamake::duplicate_profile))]
    DuplicateProfile { name: String },

    /// The requested or target profile does not exist.
    #[error("profile `{name}` does not exist")]
    #[diagnostic(code(kalamake::unknown_profile))]
    UnknownProfile { name: String },

    /// An include target is missing or not a descriptor.
    #[error("included descriptor {} does not exist or is not a .kma file", path.display())]
    #[diagnostic(code(kalamake::include))]
    IncludeNotFound { path: PathBuf },

    /// A descriptor includes itself, directly or indirectly.
    #[error("descriptor {} is included recursively", path.display())]
    #[diagnostic(code(kalamake::include))]
    IncludeCycle { path: PathBuf },

    /// Compiler cannot handle the chosen language standard.
    #[error("compiler `{compiler}` cannot be used with standard `{standard}`")]
    #[diagnostic(
        code(kalamake::incompatible_standard),
        help("C++ standards need clang++, g++, cl or clang-cl; C standards need clang, gcc, cl or clang-cl")
    )]
    IncompatibleStandard {
        compiler: CompilerId,
        standard: Standard,
    },

    /// A path could not be resolved to a canonical location.
    #[error("failed to resolve `{}` in field `{field}`: {source}", path.display())]
    #[diagnostic(code(kalamake::path))]
    Path {
        field: Field,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Every source entry was filtered out.
    #[error("no valid source files remain after filtering")]
    #[diagnostic(
        code(kalamake::no_sources),
        help("C standards accept .c files, C++ standards accept .cpp files")
    )]
    NoSources,

    /// A path extension does not fit the binary it names.
    #[error("`{}` in field `{field}` has an invalid extension, expected {expected}", path.display())]
    #[diagnostic(code(kalamake::extension))]
    InvalidExtension {
        field: Field,
        path: PathBuf,
        expected: String,
    },

    /// A define cannot be passed to a compiler.
    #[error("define `{define}` is not valid, defines must be non-empty and contain no whitespace")]
    #[diagnostic(code(kalamake::define))]
    InvalidDefine { define: String },

    /// Two resolved paths collide.
    #[error("{message}")]
    #[diagnostic(code(kalamake::path_conflict))]
    PathConflict { field: Field, message: String },
}

impl BuildError {
    /// The descriptor field the error is about, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            BuildError::DuplicateField { field, .. }
            | BuildError::NotOverridable { field, .. }
            | BuildError::MissingField { field }
            | BuildError::EmptyValue { field, .. }
            | BuildError::InvalidValue { field, .. }
            | BuildError::Path { field, .. }
            | BuildError::InvalidExtension { field, .. }
            | BuildError::PathConflict { field, .. } => Some(*field),
            BuildError::NameTooShort { .. }
            | BuildError::NameTooLong { .. }
            | BuildError::NameIllegalChar { .. } => Some(Field::Name),
            BuildError::IncompatibleStandard { .. } => Some(Field::Compiler),
            BuildError::NoSources => Some(Field::Sources),
            BuildError::InvalidDefine { .. } => Some(Field::Defines),
            BuildError::UnknownProfile { .. } => Some(Field::TargetProfile),
            BuildError::Read { .. }
            | BuildError::Version { .. }
            | BuildError::UnknownLine { .. }
            | BuildError::Structure { .. }
            | BuildError::DuplicateProfile { .. }
            | BuildError::IncludeNotFound { .. }
            | BuildError::IncludeCycle { .. } => None,
        }
    }
}
