//! Build variant selection.

use kalamake_build::{BuildPlan, BuildVariant, CompilerFamily, CustomFlag, Field, Warning};

/// Variants to build for a plan, in build order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantSelection {
    /// May contain [`BuildVariant::None`] when the debug side could not be
    /// detected. Such entries are skipped by the orchestrator.
    pub variants: Vec<BuildVariant>,
    pub warnings: Vec<Warning>,
}

/// Pick the variants of a build pass.
///
/// `build-*` custom flags win, then `buildtype`, then detection from the
/// user's flag lists.
pub fn select_variants(plan: &BuildPlan) -> VariantSelection {
    let requested: Vec<BuildVariant> = [
        CustomFlag::BuildDebug,
        CustomFlag::BuildRelease,
        CustomFlag::BuildRelDebug,
        CustomFlag::BuildMinSizeRel,
    ]
    .into_iter()
    .filter(|flag| plan.has_custom_flag(*flag))
    .filter_map(CustomFlag::requested_variant)
    .collect();

    if !requested.is_empty() {
        return VariantSelection {
            variants: requested,
            warnings: Vec::new(),
        };
    }

    if let Some(variant) = plan.build_type {
        return VariantSelection {
            variants: vec![variant],
            warnings: Vec::new(),
        };
    }

    let family = plan.family();
    let mut selection = VariantSelection::default();

    match detect_debug(family, &plan.debug_flags) {
        Some(variant) => selection.variants.push(variant),
        None => {
            selection.variants.push(BuildVariant::None);
            selection.warnings.push(Warning::new(
                Field::DebugFlags,
                "no debug flag combination found, skipping the debug build",
            ));
        }
    }

    match detect_release(family, &plan.flags) {
        Some(variant) => selection.variants.push(variant),
        None => {
            selection.variants.push(BuildVariant::Release);
            selection.warnings.push(Warning::new(
                Field::Flags,
                "no optimization flag found, building release",
            ));
        }
    }

    selection
}

/// Release-side variant implied by a flag list.
pub fn detect_release(family: CompilerFamily, flags: &[String]) -> Option<BuildVariant> {
    let (optimize, debug_info, size) = match family {
        CompilerFamily::Msvc => ("/O2", "/Zi", "/O1"),
        CompilerFamily::Gnu => ("-O2", "-g", "-Os"),
    };

    if has(flags, optimize) && has(flags, debug_info) {
        Some(BuildVariant::RelDebug)
    } else if has(flags, optimize) {
        Some(BuildVariant::Release)
    } else if has(flags, size) {
        Some(BuildVariant::MinSizeRel)
    } else {
        None
    }
}

/// Debug variant implied by a flag list.
pub fn detect_debug(family: CompilerFamily, flags: &[String]) -> Option<BuildVariant> {
    let (no_optimize, debug_info) = match family {
        CompilerFamily::Msvc => ("/Od", "/Zi"),
        CompilerFamily::Gnu => ("-O0", "-g"),
    };

    (has(flags, no_optimize) && has(flags, debug_info)).then_some(BuildVariant::Debug)
}

fn has(flags: &[String], token: &str) -> bool {
    flags.iter().any(|flag| flag == token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_release_side_detection() {
        let gnu = CompilerFamily::Gnu;
        assert_eq!(detect_release(gnu, &tokens("-O2 -g")), Some(BuildVariant::RelDebug));
        assert_eq!(detect_release(gnu, &tokens("-g -O2")), Some(BuildVariant::RelDebug));
        assert_eq!(detect_release(gnu, &tokens("-O2")), Some(BuildVariant::Release));
        assert_eq!(detect_release(gnu, &tokens("-Os")), Some(BuildVariant::MinSizeRel));
        assert_eq!(detect_release(gnu, &tokens("-march=native")), None);

        let msvc = CompilerFamily::Msvc;
        assert_eq!(detect_release(msvc, &tokens("/O2 /Zi")), Some(BuildVariant::RelDebug));
        assert_eq!(detect_release(msvc, &tokens("/O1")), Some(BuildVariant::MinSizeRel));
        assert_eq!(detect_release(msvc, &tokens("-O2")), None);
    }

    #[test]
    fn test_debug_side_detection() {
        assert_eq!(
            detect_debug(CompilerFamily::Gnu, &tokens("-O0 -g")),
            Some(BuildVariant::Debug)
        );
        assert_eq!(detect_debug(CompilerFamily::Gnu, &tokens("-g")), None);
        assert_eq!(
            detect_debug(CompilerFamily::Msvc, &tokens("/Zi /Od")),
            Some(BuildVariant::Debug)
        );
        assert_eq!(detect_debug(CompilerFamily::Msvc, &[]), None);
    }
}
