//! Human readable rendering of findings and diagnostics.

use console::style;
use iorder_pm::{Diagnostic, Finding, FindingKind, Pool, ResolvableId};

pub fn name_of(pool: &Pool, id: ResolvableId) -> String {
    match pool.get(id) {
        Some(resolvable) => resolvable.to_string(),
        None => id.to_string(),
    }
}

fn stack_of(pool: &Pool, stack: &[ResolvableId]) -> String {
    stack
        .iter()
        .map(|id| name_of(pool, *id))
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub fn describe_finding(pool: &Pool, finding: &Finding) -> String {
    let name = name_of(pool, finding.resolvable);
    match &finding.kind {
        FindingKind::RequiredForDelete => format!(
            "{} {} is still required",
            style("FAILED DEL").red().bold(),
            style(name).white().bold()
        ),
        FindingKind::ObsoleteNotInstallable { by } => format!(
            "{} {} (obsoleted by {})",
            style("FAILED OBS").red().bold(),
            style(name).white().bold(),
            name_of(pool, *by)
        ),
        FindingKind::NotInstallable => format!(
            "{} {}",
            style("FAILED INS").red().bold(),
            style(name).white().bold()
        ),
        FindingKind::Unsatisfied { capability } => format!(
            "  {} no runnable provider for '{}' required by {}",
            style("-").yellow(),
            style(capability).yellow(),
            name
        ),
        FindingKind::Cycle { stack } => format!(
            "  {} cycle at {} via {}",
            style("-").cyan(),
            name,
            stack_of(pool, stack)
        ),
    }
}

pub fn describe_diagnostic(pool: &Pool, diagnostic: &Diagnostic) -> String {
    match diagnostic {
        Diagnostic::Unsatisfied { resolvable, capability } => format!(
            "  {} no runnable provider for '{}' required by {}",
            style("-").yellow(),
            style(capability).yellow(),
            name_of(pool, *resolvable)
        ),
        Diagnostic::Cycle { resolvable, stack } => format!(
            "  {} cycle at {} via {}",
            style("-").cyan(),
            name_of(pool, *resolvable),
            stack_of(pool, stack)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iorder_pm::{Capability, Phase, Resolvable};

    #[test]
    fn test_describe_uses_names() {
        console::set_colors_enabled(false);

        let mut pool = Pool::new();
        let bash = pool.add(Resolvable::package("bash", "3.1"));
        let finding = Finding {
            phase: Phase::Install,
            resolvable: bash,
            kind: FindingKind::Unsatisfied {
                capability: Capability::parse("glibc >= 2.4").unwrap(),
            },
        };

        assert_eq!(
            describe_finding(&pool, &finding),
            "  - no runnable provider for 'glibc >= 2.4' required by bash-3.1.noarch"
        );
    }

    #[test]
    fn test_unknown_id_falls_back() {
        let pool = Pool::new();
        assert_eq!(name_of(&pool, ResolvableId(3)), "#3");
    }
}
