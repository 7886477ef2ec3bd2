//! Spelling tables for every descriptor enumeration.
//!
//! Each registry is a closed enum with a bidirectional mapping between the
//! variant and the exact text used in `.kma` files.

use crate::target::CompilerFamily;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! registry {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $spelling:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $spelling)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The descriptor spelling of this value.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $spelling,)+
                }
            }

            /// Look up a value by its exact descriptor spelling.
            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($spelling => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

registry! {
    /// Top-level descriptor section. The spelling is the line prefix.
    pub enum Category {
        Version => "#KMA VERSION",
        Include => "#include",
        Global => "#global",
        Profile => "#profile",
        PostBuild => "#postbuild",
    }
}

registry! {
    /// A named setting inside the global category or a profile.
    pub enum Field {
        Name => "name",
        BinaryType => "binarytype",
        Compiler => "compiler",
        Standard => "standard",
        TargetProfile => "targetprofile",
        BuildType => "buildtype",
        BuildPath => "buildpath",
        ObjectPath => "objectpath",
        Sources => "sources",
        Headers => "headers",
        Links => "links",
        DebugLinks => "debuglinks",
        WarningLevel => "warninglevel",
        Defines => "defines",
        Flags => "flags",
        DebugFlags => "debugflags",
        CustomFlags => "customflags",
    }
}

impl Field {
    /// Whether a profile may set this field.
    pub const fn is_overridable(self) -> bool {
        !matches!(
            self,
            Field::BinaryType | Field::Compiler | Field::Standard | Field::TargetProfile
        )
    }

    /// Fields the global category must provide once includes are merged.
    pub const REQUIRED: &'static [Field] = &[
        Field::Name,
        Field::BinaryType,
        Field::Compiler,
        Field::Standard,
        Field::Sources,
    ];
}

registry! {
    /// Kind of binary a descriptor produces.
    pub enum BinaryType {
        Executable => "executable",
        /// Static library.
        LinkOnly => "link-only",
        /// Shared library without an import library.
        RuntimeOnly => "runtime-only",
        /// Shared library with an import library.
        LinkRuntime => "link-runtime",
    }
}

impl BinaryType {
    pub const fn is_shared(self) -> bool {
        matches!(self, BinaryType::RuntimeOnly | BinaryType::LinkRuntime)
    }
}

registry! {
    /// Concrete compiler driver.
    pub enum CompilerId {
        ClangCl => "clang-cl",
        Cl => "cl",
        Clang => "clang",
        ClangPlusPlus => "clang++",
        Gcc => "gcc",
        GPlusPlus => "g++",
    }
}

impl CompilerId {
    pub const fn family(self) -> CompilerFamily {
        match self {
            CompilerId::ClangCl | CompilerId::Cl => CompilerFamily::Msvc,
            CompilerId::Clang
            | CompilerId::ClangPlusPlus
            | CompilerId::Gcc
            | CompilerId::GPlusPlus => CompilerFamily::Gnu,
        }
    }

    /// Clang-based drivers understand `-Weverything`.
    pub const fn is_clang(self) -> bool {
        matches!(
            self,
            CompilerId::ClangCl | CompilerId::Clang | CompilerId::ClangPlusPlus
        )
    }

    /// Drivers that compile every input as C++.
    pub const fn is_cpp_only(self) -> bool {
        matches!(self, CompilerId::ClangPlusPlus | CompilerId::GPlusPlus)
    }

    /// Drivers that can compile and link C++.
    pub const fn supports_cpp(self) -> bool {
        !matches!(self, CompilerId::Clang | CompilerId::Gcc)
    }

    /// Name of the executable on the search path.
    pub const fn program(self) -> &'static str {
        self.as_str()
    }
}

registry! {
    /// Language standard.
    pub enum Standard {
        C89 => "c89",
        C99 => "c99",
        C11 => "c11",
        C17 => "c17",
        C23 => "c23",
        Cpp14 => "c++14",
        Cpp17 => "c++17",
        Cpp20 => "c++20",
        Cpp23 => "c++23",
    }
}

impl Standard {
    pub const fn is_cpp(self) -> bool {
        matches!(
            self,
            Standard::Cpp14 | Standard::Cpp17 | Standard::Cpp20 | Standard::Cpp23
        )
    }

    /// Extensions accepted for source files under this standard.
    pub const fn source_extensions(self) -> &'static [&'static str] {
        if self.is_cpp() {
            &["cpp"]
        } else {
            &["c"]
        }
    }

    /// Extensions accepted for header files under this standard.
    pub const fn header_extensions(self) -> &'static [&'static str] {
        if self.is_cpp() {
            &["h", "hpp"]
        } else {
            &["h"]
        }
    }
}

registry! {
    /// Semantic warning strictness, lowered per compiler family.
    pub enum WarningLevel {
        None => "none",
        Basic => "basic",
        Normal => "normal",
        Strong => "strong",
        Strict => "strict",
        All => "all",
    }
}

impl Default for WarningLevel {
    fn default() -> Self {
        WarningLevel::Normal
    }
}

registry! {
    /// Directives that drive the build pipeline instead of reaching the
    /// compiler verbatim.
    pub enum CustomFlag {
        StandardRequired => "standard-required",
        WarningsAsErrors => "warnings-as-errors",
        BuildDebug => "build-debug",
        BuildRelease => "build-release",
        BuildRelDebug => "build-reldebug",
        BuildMinSizeRel => "build-minsizerel",
        ExportCompileCommands => "export-compile-commands",
    }
}

impl CustomFlag {
    /// The variant a `build-*` flag requests.
    pub const fn requested_variant(self) -> Option<BuildVariant> {
        match self {
            CustomFlag::BuildDebug => Some(BuildVariant::Debug),
            CustomFlag::BuildRelease => Some(BuildVariant::Release),
            CustomFlag::BuildRelDebug => Some(BuildVariant::RelDebug),
            CustomFlag::BuildMinSizeRel => Some(BuildVariant::MinSizeRel),
            _ => None,
        }
    }
}

registry! {
    /// Optimization/debug configuration of one build pass.
    pub enum BuildVariant {
        Debug => "debug",
        Release => "release",
        RelDebug => "reldebug",
        MinSizeRel => "minsizerel",
        /// No usable flag combination; the build is skipped.
        None => "none",
    }
}

impl BuildVariant {
    /// Variants that carry debug information and use the debug lists.
    pub const fn is_debug(self) -> bool {
        matches!(self, BuildVariant::Debug)
    }
}

registry! {
    /// Project-file generator kinds handled by the external solution generator.
    pub enum GeneratorType {
        VisualStudio => "vs",
        VsCode => "vscode",
        Ninja => "ninja",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spellings_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.as_str()), Some(*field));
        }
        for compiler in CompilerId::ALL {
            assert_eq!(CompilerId::parse(&compiler.to_string()), Some(*compiler));
        }
        assert_eq!(Category::parse("#profile"), Some(Category::Profile));
        assert_eq!(GeneratorType::parse("vscode"), Some(GeneratorType::VsCode));
    }

    #[test]
    fn test_unknown_spellings() {
        assert_eq!(Standard::parse("c++98"), None);
        assert_eq!(BinaryType::parse("Executable"), None);
        assert_eq!(CustomFlag::parse("build-fast"), None);
    }

    #[test]
    fn test_compiler_families() {
        assert_eq!(CompilerId::Cl.family(), CompilerFamily::Msvc);
        assert_eq!(CompilerId::ClangCl.family(), CompilerFamily::Msvc);
        for compiler in [
            CompilerId::Clang,
            CompilerId::ClangPlusPlus,
            CompilerId::Gcc,
            CompilerId::GPlusPlus,
        ] {
            assert_eq!(compiler.family(), CompilerFamily::Gnu);
        }
    }

    #[test]
    fn test_non_overridable_fields() {
        let fixed: Vec<_> = Field::ALL
            .iter()
            .filter(|f| !f.is_overridable())
            .copied()
            .collect();
        assert_eq!(
            fixed,
            vec![
                Field::BinaryType,
                Field::Compiler,
                Field::Standard,
                Field::TargetProfile
            ]
        );
    }

    #[test]
    fn test_build_flags_request_variants() {
        assert_eq!(
            CustomFlag::BuildRelDebug.requested_variant(),
            Some(BuildVariant::RelDebug)
        );
        assert_eq!(CustomFlag::WarningsAsErrors.requested_variant(), None);
    }
}
