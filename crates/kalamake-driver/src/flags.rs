//! Per-family flag tables.
//!
//! Every table is total over its registry so that each combination can be
//! checked exhaustively.

use kalamake_build::{BuildVariant, CompilerFamily, CompilerId, CustomFlag, Standard, WarningLevel};

/// GNU warning flags in increasing strictness. Lower levels take a prefix.
const GNU_WARNINGS: &[&str] = &[
    "-Wall",
    "-Wextra",
    "-Wpedantic",
    "-Wshadow",
    "-Wconversion",
    "-Wsign-conversion",
];

/// Warning flags for a compiler at a warning level.
pub fn warning_flags(compiler: CompilerId, level: WarningLevel) -> Vec<&'static str> {
    match compiler.family() {
        CompilerFamily::Msvc => vec![match level {
            WarningLevel::None => "/W0",
            WarningLevel::Basic => "/W1",
            WarningLevel::Normal => "/W2",
            WarningLevel::Strong => "/W3",
            WarningLevel::Strict => "/W4",
            WarningLevel::All => "/Wall",
        }],
        CompilerFamily::Gnu => {
            let mut flags = match level {
                WarningLevel::None => vec!["-w"],
                WarningLevel::Basic => GNU_WARNINGS[..1].to_vec(),
                WarningLevel::Normal => GNU_WARNINGS[..2].to_vec(),
                WarningLevel::Strong => GNU_WARNINGS[..3].to_vec(),
                WarningLevel::Strict | WarningLevel::All => GNU_WARNINGS.to_vec(),
            };
            if level == WarningLevel::All && compiler.is_clang() {
                flags.push("-Weverything");
            }
            flags
        }
    }
}

/// Language standard selection. MSVC has no switch for C89/C99.
pub fn standard_flag(family: CompilerFamily, standard: Standard) -> Option<String> {
    match family {
        CompilerFamily::Gnu => Some(format!("-std={standard}")),
        CompilerFamily::Msvc => {
            let value = match standard {
                Standard::C89 | Standard::C99 => return None,
                Standard::C11 => "c11",
                Standard::C17 => "c17",
                Standard::C23 => "clatest",
                Standard::Cpp14 => "c++14",
                Standard::Cpp17 => "c++17",
                Standard::Cpp20 => "c++20",
                Standard::Cpp23 => "c++latest",
            };
            Some(format!("/std:{value}"))
        }
    }
}

/// Compiler flags produced by custom flags. Pipeline-only flags produce
/// nothing.
pub fn custom_flag_tokens(family: CompilerFamily, flags: &[CustomFlag]) -> Vec<&'static str> {
    flags
        .iter()
        .filter_map(|flag| match (flag, family) {
            (CustomFlag::StandardRequired, CompilerFamily::Msvc) => Some("/permissive-"),
            (CustomFlag::StandardRequired, CompilerFamily::Gnu) => None,
            (CustomFlag::WarningsAsErrors, CompilerFamily::Msvc) => Some("/WX"),
            (CustomFlag::WarningsAsErrors, CompilerFamily::Gnu) => Some("-Werror"),
            (
                CustomFlag::BuildDebug
                | CustomFlag::BuildRelease
                | CustomFlag::BuildRelDebug
                | CustomFlag::BuildMinSizeRel
                | CustomFlag::ExportCompileCommands,
                _,
            ) => None,
        })
        .collect()
}

/// Optimization and debug-info flags appended for a variant.
pub const fn variant_flags(family: CompilerFamily, variant: BuildVariant) -> &'static [&'static str] {
    match (family, variant) {
        (CompilerFamily::Msvc, BuildVariant::Debug) => &["/Od", "/Zi"],
        (CompilerFamily::Msvc, BuildVariant::Release) => &["/O2", "-DNDEBUG"],
        (CompilerFamily::Msvc, BuildVariant::RelDebug) => &["/O2", "/Zi"],
        (CompilerFamily::Msvc, BuildVariant::MinSizeRel) => &["/O1", "-DNDEBUG"],
        (CompilerFamily::Gnu, BuildVariant::Debug) => &["-O0", "-g"],
        (CompilerFamily::Gnu, BuildVariant::Release) => &["-O2", "-DNDEBUG"],
        (CompilerFamily::Gnu, BuildVariant::RelDebug) => &["-O2", "-g"],
        (CompilerFamily::Gnu, BuildVariant::MinSizeRel) => &["-Os", "-DNDEBUG"],
        (_, BuildVariant::None) => &[],
    }
}

/// Whether a token is produced by [`warning_flags`] for some level.
pub fn is_warning_token(token: &str) -> bool {
    token == "-w"
        || token == "-Weverything"
        || GNU_WARNINGS.contains(&token)
        || matches!(token, "/W0" | "/W1" | "/W2" | "/W3" | "/W4" | "/Wall")
}
