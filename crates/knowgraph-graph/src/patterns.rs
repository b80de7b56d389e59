//! Textual dependency-detection patterns, one family per kind. Each regex
//! captures exactly one group: the raw target token.

use knowgraph_core::DependencyKind;
use once_cell::sync::Lazy;
use regex::Regex;

pub struct PatternFamily {
    pub kind: DependencyKind,
    pub patterns: Vec<Regex>,
}

pub static DEPENDENCY_PATTERNS: Lazy<Vec<PatternFamily>> = Lazy::new(|| {
    vec![
        PatternFamily {
            kind: DependencyKind::Reference,
            patterns: compile(&[
                // Markdown link target.
                r"\[[^\]]+\]\(([^)]+)\)",
                // Mentions.
                r"@([A-Za-z0-9_-]+)",
                // "see other-doc.md" references.
                r"(?i)see\s+([A-Za-z0-9_/.-]+\.md)",
            ]),
        },
        PatternFamily {
            kind: DependencyKind::Imports,
            patterns: compile(&[
                r"(?m)^\s*import\s+([A-Za-z0-9_.]+)",
                r"(?m)^\s*from\s+([A-Za-z0-9_.]+)\s+import",
                r#"(?i)require\s+["']([^"']+)["']"#,
            ]),
        },
        PatternFamily {
            kind: DependencyKind::Extends,
            patterns: compile(&[
                r"(?i)extends\s+([A-Za-z0-9_.]+)",
                r"(?i)inherits\s+from\s+([A-Za-z0-9_.]+)",
            ]),
        },
        PatternFamily {
            kind: DependencyKind::Implements,
            patterns: compile(&[
                r"(?i)implements\s+([A-Za-z0-9_.]+)",
                r"(?i)interface\s+([A-Za-z0-9_.]+)",
            ]),
        },
        PatternFamily {
            kind: DependencyKind::DependsOn,
            patterns: compile(&[
                r"(?i)depends\s+on\s+([A-Za-z0-9_.]+)",
                r"(?i)requires\s+([A-Za-z0-9_.]+)",
            ]),
        },
    ]
});

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).expect("dependency pattern must compile"))
        .collect()
}

/// Strength of an edge of `kind` matched in `context`: the kind's base
/// strength, scaled up for urgency wording and down for de-emphasis
/// wording, clamped to [0, 1]. Pure and total.
pub fn dependency_strength(kind: DependencyKind, context: &str) -> f64 {
    let mut strength = kind.base_strength();
    let context = context.to_lowercase();
    if context.contains("critical") || context.contains("essential") {
        strength *= 1.2;
    } else if context.contains("optional") || context.contains("maybe") {
        strength *= 0.8;
    }
    strength.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn strength_stays_in_unit_interval() {
        for kind in DependencyKind::ALL {
            for context in ["", "critical path", "essential", "optional maybe", "plain"] {
                let s = dependency_strength(kind, context);
                assert!((0.0..=1.0).contains(&s), "{kind}/{context}: {s}");
            }
        }
    }

    #[test]
    fn urgency_scales_up_and_deemphasis_scales_down() {
        let base = dependency_strength(DependencyKind::Reference, "plain mention");
        assert_relative_eq!(base, 0.3);
        assert_relative_eq!(
            dependency_strength(DependencyKind::Reference, "this is CRITICAL"),
            0.36
        );
        assert_relative_eq!(
            dependency_strength(DependencyKind::Reference, "optional extra"),
            0.24
        );
        // Extends at 0.9 * 1.2 clamps to 1.0.
        assert_relative_eq!(
            dependency_strength(DependencyKind::Extends, "essential base"),
            1.0
        );
    }

    #[test]
    fn markdown_link_captures_target() {
        let re = &DEPENDENCY_PATTERNS[0].patterns[0];
        let caps = re.captures("as designed in [the ADR](./adr-0001.md)").unwrap();
        assert_eq!(&caps[1], "./adr-0001.md");
    }

    #[test]
    fn import_patterns_capture_module() {
        let family = DEPENDENCY_PATTERNS
            .iter()
            .find(|f| f.kind == DependencyKind::Imports)
            .unwrap();
        let caps = family.patterns[0].captures("import billing_core").unwrap();
        assert_eq!(&caps[1], "billing_core");
        let caps = family.patterns[1]
            .captures("from billing.models import Invoice")
            .unwrap();
        assert_eq!(&caps[1], "billing.models");
    }
}
