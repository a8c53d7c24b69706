//! Step-by-step validation of a transaction set.
//!
//! The driver walks the delete phase, then the install phase. Each element is
//! staged in the pool first, then (unless filtered out) checked against a
//! freshly cleared [`Analyzer`]. Failed checks become [`Finding`]s; nothing
//! short of an internal error stops the pass.

use std::collections::HashSet;
use std::fmt;

use crate::analyzer::{Analyzer, Diagnostic};
use crate::error::Result;
use crate::pool::Pool;
use crate::progress::{ProgressCounter, ProgressReceiver};
use crate::resolvable::{Capability, ResolvableId};
use crate::transaction::{stage_delete, stage_install, TransactionSet};

/// Validation phase, also the name of its progress counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Delete,
    Install,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Delete => "DELETE",
            Phase::Install => "INSTALL",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// A resolvable to delete is still required by the rest of the system
    RequiredForDelete,
    /// An installed resolvable obsoleted by `by` is not installable
    ObsoleteNotInstallable { by: ResolvableId },
    /// A resolvable to install is not installable
    NotInstallable,
    /// No runnable provider for a capability
    Unsatisfied { capability: Capability },
    /// Reached again while being analyzed; resolved optimistically
    Cycle { stack: Vec<ResolvableId> },
}

/// One problem noticed during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub phase: Phase,
    pub resolvable: ResolvableId,
    pub kind: FindingKind,
}

impl Finding {
    /// Whether this is a failed check rather than an analyzer diagnostic
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            FindingKind::RequiredForDelete
                | FindingKind::ObsoleteNotInstallable { .. }
                | FindingKind::NotInstallable
        )
    }

    fn from_diagnostic(phase: Phase, diagnostic: Diagnostic) -> Self {
        match diagnostic {
            Diagnostic::Unsatisfied { resolvable, capability } => Finding {
                phase,
                resolvable,
                kind: FindingKind::Unsatisfied { capability },
            },
            Diagnostic::Cycle { resolvable, stack } => Finding {
                phase,
                resolvable,
                kind: FindingKind::Cycle { stack },
            },
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FindingKind::RequiredForDelete => write!(f, "FAILED DEL {}", self.resolvable),
            FindingKind::ObsoleteNotInstallable { by } => {
                write!(f, "FAILED OBS {} (obsoleted by {})", self.resolvable, by)
            }
            FindingKind::NotInstallable => write!(f, "FAILED INS {}", self.resolvable),
            FindingKind::Unsatisfied { capability } => {
                write!(f, "{}: '{}' unsatisfied for {}", self.phase, capability, self.resolvable)
            }
            FindingKind::Cycle { stack } => {
                write!(f, "{}: cycle at {} via {:?}", self.phase, self.resolvable, stack)
            }
        }
    }
}

/// Per phase counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseStats {
    pub total: usize,
    pub analyzed: usize,
    pub skipped: usize,
}

/// Options of a validation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Stop after the current element when the progress receiver asks to
    pub honor_abort: bool,
}

/// Aggregated outcome of a validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    findings: Vec<Finding>,
    pub delete: PhaseStats,
    pub install: PhaseStats,
    pub aborted: bool,
}

impl ValidationReport {
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Failed checks, without the analyzer diagnostics explaining them
    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|finding| finding.is_failure())
    }

    pub fn cycles(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|finding| matches!(finding.kind, FindingKind::Cycle { .. }))
    }

    /// No failed check and the pass ran to the end
    pub fn is_clean(&self) -> bool {
        !self.aborted && self.failures().next().is_none()
    }

    pub fn stats(&self, phase: Phase) -> PhaseStats {
        match phase {
            Phase::Delete => self.delete,
            Phase::Install => self.install,
        }
    }

    fn stats_mut(&mut self, phase: Phase) -> &mut PhaseStats {
        match phase {
            Phase::Delete => &mut self.delete,
            Phase::Install => &mut self.install,
        }
    }

    fn push(&mut self, phase: Phase, resolvable: ResolvableId, kind: FindingKind) {
        self.findings.push(Finding { phase, resolvable, kind });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.failures().count();
        let cycles = self.cycles().count();
        write!(
            f,
            "{} delete(s) checked, {} skipped; {} install(s) checked, {} skipped; {} failure(s)",
            self.delete.analyzed, self.delete.skipped, self.install.analyzed, self.install.skipped, failures
        )?;
        if cycles > 0 {
            write!(f, ", {} cycle(s)", cycles)?;
        }
        if self.aborted {
            write!(f, " (aborted)")?;
        }
        Ok(())
    }
}

/// Drives one [`Analyzer`] over a transaction set
pub struct Validator<'a> {
    analyzer: Analyzer,
    interest: &'a HashSet<String>,
    options: ValidationOptions,
    receiver: Option<&'a mut dyn ProgressReceiver>,
    report: ValidationReport,
}

impl<'a> Validator<'a> {
    /// `interest` holds resolvable idents; empty means every element is analyzed
    pub fn new(interest: &'a HashSet<String>, options: ValidationOptions) -> Self {
        Self {
            analyzer: Analyzer::new(),
            interest,
            options,
            receiver: None,
            report: ValidationReport::default(),
        }
    }

    /// Report phase ticks to `receiver`
    pub fn with_receiver(mut self, receiver: &'a mut dyn ProgressReceiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Validate every element of `set`, staging each one in `pool` on the way
    pub fn run(mut self, pool: &mut Pool, set: &TransactionSet) -> Result<ValidationReport> {
        self.report.delete.total = set.to_delete().len();
        self.report.install.total = set.to_install().len();

        let mut receiver = self.receiver.take();
        if !self.delete_phase(pool, set, receiver.as_deref_mut())? {
            self.install_phase(pool, set, receiver.as_deref_mut())?;
        }

        log::debug!("Validation done: {}", self.report);
        Ok(self.report)
    }

    /// Returns true if the pass was aborted
    fn delete_phase(
        &mut self,
        pool: &mut Pool,
        set: &TransactionSet,
        receiver: Option<&mut (dyn ProgressReceiver + 'a)>,
    ) -> Result<bool> {
        let phase = Phase::Delete;
        let mut tics = new_counter(phase, set.to_delete().len(), receiver);
        tics.to_min();

        for &id in set.to_delete() {
            let proceed = tics.incr();
            stage_delete(pool, id)?;

            if self.is_interesting(pool, id) {
                self.analyzer.clear();
                if !self.analyzer.is_installable(&*pool, id)? {
                    log::warn!("FAILED DEL {}", display(pool, id));
                    self.report.push(phase, id, FindingKind::RequiredForDelete);
                }
                self.drain(phase);
                self.report.stats_mut(phase).analyzed += 1;
            } else {
                self.report.stats_mut(phase).skipped += 1;
            }

            if !proceed && self.options.honor_abort {
                log::info!("Validation aborted during {}", phase);
                self.report.aborted = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn install_phase(
        &mut self,
        pool: &mut Pool,
        set: &TransactionSet,
        receiver: Option<&mut (dyn ProgressReceiver + 'a)>,
    ) -> Result<bool> {
        let phase = Phase::Install;
        let mut tics = new_counter(phase, set.to_install().len(), receiver);
        tics.to_min();

        for entry in set.to_install() {
            let proceed = tics.incr();
            stage_install(pool, entry.id)?;

            if self.is_interesting(pool, entry.id) {
                self.analyzer.clear();
                for &obsolete in &entry.obsoletes {
                    if !self.analyzer.is_installable(&*pool, obsolete)? {
                        log::warn!("FAILED OBS {}", display(pool, obsolete));
                        self.report
                            .push(phase, obsolete, FindingKind::ObsoleteNotInstallable { by: entry.id });
                    }
                }
                if !self.analyzer.is_installable(&*pool, entry.id)? {
                    log::warn!("FAILED INS {}", display(pool, entry.id));
                    self.report.push(phase, entry.id, FindingKind::NotInstallable);
                }
                self.drain(phase);
                self.report.stats_mut(phase).analyzed += 1;
            } else {
                self.report.stats_mut(phase).skipped += 1;
            }

            if !proceed && self.options.honor_abort {
                log::info!("Validation aborted during {}", phase);
                self.report.aborted = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_interesting(&self, pool: &Pool, id: ResolvableId) -> bool {
        if self.interest.is_empty() {
            return true;
        }
        pool.get(id)
            .is_some_and(|resolvable| self.interest.contains(&resolvable.ident()))
    }

    /// Attach the analyzer diagnostics of the last element to the report
    fn drain(&mut self, phase: Phase) {
        for diagnostic in self.analyzer.take_diagnostics() {
            self.report.findings.push(Finding::from_diagnostic(phase, diagnostic));
        }
    }
}

fn new_counter<'r>(
    phase: Phase,
    total: usize,
    receiver: Option<&'r mut (dyn ProgressReceiver + '_)>,
) -> ProgressCounter<'r> {
    let counter = ProgressCounter::new(phase.as_str(), total as u64);
    match receiver {
        Some(receiver) => counter.send_to(receiver),
        None => counter,
    }
}

fn display(pool: &Pool, id: ResolvableId) -> String {
    match pool.get(id) {
        Some(resolvable) => resolvable.to_string(),
        None => id.to_string(),
    }
}

/// Validate `set` against `pool` with a single analyzer.
///
/// Shorthand for [`Validator`] with an optional progress receiver.
pub fn validate(
    pool: &mut Pool,
    set: &TransactionSet,
    interest: &HashSet<String>,
    options: ValidationOptions,
    receiver: Option<&mut dyn ProgressReceiver>,
) -> Result<ValidationReport> {
    let validator = Validator::new(interest, options);
    match receiver {
        Some(receiver) => validator.with_receiver(receiver).run(pool, set),
        None => validator.run(pool, set),
    }
}
