//! Runnability analysis.
//!
//! A resolvable is *runnable* when each of its requirements is provided either
//! by the base system or by a resolvable on the system that is runnable itself.
//! A resolvable is on the system when it is installed and not being deleted,
//! or when it is being installed.
//! It is *installable* when it is already known to be runnable, or when each
//! of its pre-requirements has such a provider.
//!
//! The [`Analyzer`] walks the requirement graph depth first, memoizing one
//! [`Verdict`] per resolvable. Verdicts are only valid for the pool state they
//! were computed against: call [`Analyzer::clear`] whenever that state changes.
//!
//! Cycles are resolved optimistically. When a resolvable is reached again while
//! it is still being analyzed, it is assumed runnable and a
//! [`Diagnostic::Cycle`] is recorded (unless it is a plain self requirement).

use std::collections::HashMap;
use std::fmt;

use crate::error::{IorderError, Result};
use crate::pool::{Provider, ResolvableSource};
use crate::resolvable::{Capability, ResolvableId};

const LOG_STACK: &str = "iorder::stack";
const LOG_CACHE: &str = "iorder::cache";
const LOG_VERBOSE: &str = "iorder::verbose";

/// Memoized runnability of a resolvable.
///
/// `Unknown` covers both "never analyzed" and "analysis in progress".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    True,
    False,
    #[default]
    Unknown,
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Verdict::True
        } else {
            Verdict::False
        }
    }
}

/// Something the analyzer noticed while walking the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No provider of `capability` is the system or a runnable resolvable on the system
    Unsatisfied {
        resolvable: ResolvableId,
        capability: Capability,
    },
    /// `resolvable` was reached again while its ancestors in `stack` were being analyzed
    Cycle {
        resolvable: ResolvableId,
        stack: Vec<ResolvableId>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unsatisfied { resolvable, capability } => {
                write!(f, "no runnable provider for '{}' required by {}", capability, resolvable)
            }
            Diagnostic::Cycle { resolvable, stack } => {
                write!(f, "cycle at {} via [", resolvable)?;
                for (idx, id) in stack.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", id)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Cycle-aware, memoizing runnability analyzer.
///
/// Owns its verdict cache and analysis stack; the pool is borrowed per query
/// and never mutated. Not reentrant: do not query the analyzer from within a
/// callback that runs while it is analyzing.
#[derive(Debug, Default)]
pub struct Analyzer {
    cache: HashMap<ResolvableId, Verdict>,
    stack: Vec<ResolvableId>,
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every requirement of `id` has a runnable provider on the system.
    pub fn is_runnable<S>(&mut self, source: &S, id: ResolvableId) -> Result<bool>
    where
        S: ResolvableSource + ?Sized,
    {
        log::debug!("Runnable?       {}", display(source, id));
        let result = self.runnable(source, id);
        let runnable = self.unwind_on_error(result)?;
        if runnable {
            log::debug!("Runnable:       {}", display(source, id));
        } else {
            log::info!("NotRunnable:    {}", display(source, id));
        }
        Ok(runnable)
    }

    /// Whether `id` is known to be runnable, or every pre-requirement has a
    /// runnable provider on the system.
    ///
    /// Only the runnable verdicts it depends on are cached, never the result itself.
    pub fn is_installable<S>(&mut self, source: &S, id: ResolvableId) -> Result<bool>
    where
        S: ResolvableSource + ?Sized,
    {
        log::debug!("Installable?    {}", display(source, id));
        let resolvable = source.resolvable(id).ok_or(IorderError::UnknownResolvable(id))?;

        let installable = if self.verdict(id) == Verdict::True {
            true
        } else {
            let result = self.check_caps(source, id, resolvable.prerequires());
            self.unwind_on_error(result)?
        };
        if installable {
            log::debug!("Installable:    {}", resolvable);
        } else {
            log::info!("NotInstallable: {}", resolvable);
        }
        Ok(installable)
    }

    /// Forget all verdicts and reset the analysis stack.
    ///
    /// Diagnostics are kept until taken.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.stack.clear();
        log::trace!(target: LOG_CACHE, "Cache cleared!");
    }

    /// Memoized verdict of a resolvable
    pub fn verdict(&self, id: ResolvableId) -> Verdict {
        self.cache.get(&id).copied().unwrap_or_default()
    }

    /// Number of memoized verdicts
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Current depth of the analysis stack
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain the diagnostics collected so far
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// An error leaves the walk half done: drop the stack so the next query
    /// does not mistake stale entries for a cycle.
    fn unwind_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() && !self.stack.is_empty() {
            log::debug!(target: LOG_STACK, "Unwinding {:?} after error", self.stack);
            self.stack.clear();
        }
        result
    }

    /// Get-or-compute the runnable verdict
    fn runnable<S>(&mut self, source: &S, id: ResolvableId) -> Result<bool>
    where
        S: ResolvableSource + ?Sized,
    {
        match self.verdict(id) {
            Verdict::True => Ok(true),
            Verdict::False => Ok(false),
            Verdict::Unknown => {
                let runnable = self.analyze(source, id)?;
                self.cache.insert(id, Verdict::from(runnable));
                Ok(runnable)
            }
        }
    }

    fn analyze<S>(&mut self, source: &S, id: ResolvableId) -> Result<bool>
    where
        S: ResolvableSource + ?Sized,
    {
        let resolvable = source.resolvable(id).ok_or(IorderError::UnknownResolvable(id))?;

        if !self.push(id) {
            // A self requirement re-enters on top of the stack; anything deeper is a cycle.
            if self.stack.last() != Some(&id) {
                log::warn!(
                    target: LOG_STACK,
                    "{} ** CYCLE: {} {:?}",
                    self.ltag(),
                    resolvable,
                    self.stack
                );
                self.diagnostics.push(Diagnostic::Cycle {
                    resolvable: id,
                    stack: self.stack.clone(),
                });
            }
            return Ok(true);
        }

        log::trace!(target: LOG_STACK, "{}->{} {:?}", self.ltag(), resolvable, self.stack);
        let runnable = self.check_caps(source, id, resolvable.requires())?;
        log::trace!(target: LOG_STACK, "{}<-{} {:?}", self.ltag(), resolvable, self.stack);

        self.pop(id)?;
        Ok(runnable)
    }

    /// Find a runnable provider for each capability
    fn check_caps<S>(&mut self, source: &S, owner: ResolvableId, caps: &[Capability]) -> Result<bool>
    where
        S: ResolvableSource + ?Sized,
    {
        for cap in caps {
            if !self.find_runnable_provider(source, owner, cap)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn find_runnable_provider<S>(&mut self, source: &S, owner: ResolvableId, cap: &Capability) -> Result<bool>
    where
        S: ResolvableSource + ?Sized,
    {
        log::trace!(target: LOG_VERBOSE, "{}  {}", self.ltag(), cap);

        for provider in source.what_provides(cap) {
            let id = match provider {
                Provider::System => {
                    log::trace!(target: LOG_VERBOSE, "{}     by system", self.ltag());
                    return Ok(true);
                }
                Provider::Resolvable(id) => id,
            };

            if !source.on_system(id) {
                continue;
            }

            if self.runnable(source, id)? {
                log::trace!(target: LOG_VERBOSE, "{}    {}", self.ltag(), display(source, id));
                return Ok(true);
            }
            log::debug!(target: LOG_VERBOSE, "{}    not runnable: {}", self.ltag(), display(source, id));
        }

        log::info!(
            "{}    NO runnable provider for '{}' required by {}",
            self.ltag(),
            cap,
            display(source, owner)
        );
        self.diagnostics.push(Diagnostic::Unsatisfied {
            resolvable: owner,
            capability: cap.clone(),
        });
        Ok(false)
    }

    /// Push onto the analysis stack, or return false if already on it
    fn push(&mut self, id: ResolvableId) -> bool {
        if self.stack.contains(&id) {
            return false;
        }
        self.stack.push(id);
        true
    }

    /// Pop from the analysis stack, expecting `id` on top
    fn pop(&mut self, id: ResolvableId) -> Result<()> {
        if self.stack.last() == Some(&id) {
            self.stack.pop();
            return Ok(());
        }

        log::error!(target: LOG_STACK, "** Stack corrupted! Expect {} {:?}", id, self.stack);
        Err(IorderError::StackCorrupted {
            expected: id,
            stack: self.stack.clone(),
        })
    }

    fn ltag(&self) -> String {
        format!("[{:04}]", self.stack.len())
    }
}

fn display<S>(source: &S, id: ResolvableId) -> String
where
    S: ResolvableSource + ?Sized,
{
    match source.resolvable(id) {
        Some(resolvable) => resolvable.to_string(),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Pool, ResStatus, TransactOrigin};
    use crate::resolvable::{Resolvable, ResKind};
    use std::cell::Cell;

    fn cap(s: &str) -> Capability {
        Capability::parse(s).unwrap()
    }

    fn pkg(name: &str, requires: &[&str]) -> Resolvable {
        let mut r = Resolvable::package(name, "1.0");
        r.requires = requires.iter().map(|s| cap(s)).collect();
        r
    }

    /// Counts provider lookups to tell cache hits from traversals
    struct Counting<'a> {
        pool: &'a Pool,
        lookups: Cell<usize>,
    }

    impl ResolvableSource for Counting<'_> {
        fn resolvable(&self, id: ResolvableId) -> Option<&Resolvable> {
            self.pool.get(id)
        }

        fn status(&self, id: ResolvableId) -> Option<ResStatus> {
            self.pool.status(id)
        }

        fn what_provides(&self, capability: &Capability) -> Vec<Provider> {
            self.lookups.set(self.lookups.get() + 1);
            self.pool.what_provides(capability)
        }
    }

    /// Points `dangling` at a resolvable the pool never handed out
    struct Dangling<'a> {
        pool: &'a Pool,
    }

    impl ResolvableSource for Dangling<'_> {
        fn resolvable(&self, id: ResolvableId) -> Option<&Resolvable> {
            self.pool.get(id)
        }

        fn status(&self, id: ResolvableId) -> Option<ResStatus> {
            self.pool.status(id)
        }

        fn what_provides(&self, capability: &Capability) -> Vec<Provider> {
            if capability.name() == "dangling" {
                return vec![Provider::Resolvable(ResolvableId(99))];
            }
            self.pool.what_provides(capability)
        }

        fn on_system(&self, _id: ResolvableId) -> bool {
            true
        }
    }

    #[test]
    fn test_no_requirements_is_runnable() {
        let mut pool = Pool::new();
        let a = pool.add(pkg("a", &[]));
        let b = pool.add_installed(pkg("b", &[]));

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, a).unwrap());
        assert!(analyzer.is_runnable(&pool, b).unwrap());
        assert!(analyzer.diagnostics().is_empty());
    }

    #[test]
    fn test_system_provider() {
        let mut pool = Pool::new();
        pool.add_system_provide(cap("rpmlib(PayloadIsLzma)"));
        let a = pool.add(pkg("a", &["rpmlib(PayloadIsLzma)"]));

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, a).unwrap());
    }

    #[test]
    fn test_requires_installed_runnable_provider() {
        let mut pool = Pool::new();
        pool.add_installed(pkg("glibc", &[]));
        let bash = pool.add(pkg("bash", &["glibc"]));

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, bash).unwrap());
    }

    #[test]
    fn test_uninstalled_provider_does_not_count() {
        let mut pool = Pool::new();
        let glibc = pool.add(pkg("glibc", &[]));
        let bash = pool.add(pkg("bash", &["glibc"]));

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, bash).unwrap());
        assert_eq!(analyzer.verdict(bash), Verdict::False);
        // never looked at, since it is not on the system
        assert_eq!(analyzer.verdict(glibc), Verdict::Unknown);
    }

    #[test]
    fn test_provider_being_deleted_does_not_count() {
        let mut pool = Pool::new();
        let glibc = pool.add_installed(pkg("glibc", &[]));
        let bash = pool.add(pkg("bash", &["glibc"]));

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, bash).unwrap());

        pool.set_transact(glibc, true, TransactOrigin::User).unwrap();
        analyzer.clear();
        assert!(!analyzer.is_runnable(&pool, bash).unwrap());
    }

    #[test]
    fn test_provider_being_installed_counts() {
        let mut pool = Pool::new();
        let glibc = pool.add(pkg("glibc", &[]));
        let bash = pool.add(pkg("bash", &["glibc"]));

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, bash).unwrap());

        pool.set_transact(glibc, true, TransactOrigin::User).unwrap();
        analyzer.clear();
        assert!(analyzer.is_runnable(&pool, bash).unwrap());
    }

    #[test]
    fn test_unsatisfiable_names_resolvable_and_capability() {
        let mut pool = Pool::new();
        let r = pool.add(pkg("r", &["libmissing.so.1"]));

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, r).unwrap());
        assert_eq!(
            analyzer.take_diagnostics(),
            vec![Diagnostic::Unsatisfied {
                resolvable: r,
                capability: cap("libmissing.so.1"),
            }]
        );
        assert!(analyzer.diagnostics().is_empty());
    }

    #[test]
    fn test_transitive_failure() {
        let mut pool = Pool::new();
        pool.add_installed(pkg("lib", &["libmissing"]));
        let app = pool.add(pkg("app", &["lib"]));

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, app).unwrap());
        assert_eq!(analyzer.diagnostics().len(), 2);
        assert_eq!(analyzer.depth(), 0);
    }

    #[test]
    fn test_falls_through_to_next_provider() {
        let mut pool = Pool::new();
        let mut broken = pkg("sendmail", &["libmissing"]);
        broken.provides.push(cap("mta"));
        let mut working = pkg("postfix", &[]);
        working.provides.push(cap("mta"));
        pool.add_installed(broken);
        pool.add_installed(working);
        let mailx = pool.add(pkg("mailx", &["mta"]));

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, mailx).unwrap());
    }

    #[test]
    fn test_self_requirement_terminates() {
        let mut pool = Pool::new();
        let mut r = pkg("r", &["self-cap"]);
        r.provides.push(cap("self-cap"));
        let r = pool.add_installed(r);

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, r).unwrap());
        assert!(analyzer.diagnostics().is_empty());
        assert_eq!(analyzer.depth(), 0);
    }

    #[test]
    fn test_two_cycle_resolves_optimistically() {
        let mut pool = Pool::new();
        let mut r1 = pkg("r1", &["c2"]);
        r1.provides.push(cap("c1"));
        let mut r2 = pkg("r2", &["c1"]);
        r2.provides.push(cap("c2"));
        let r1 = pool.add_installed(r1);
        let r2 = pool.add_installed(r2);

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, r1).unwrap());
        assert!(analyzer.is_runnable(&pool, r2).unwrap());

        let diagnostics = analyzer.take_diagnostics();
        assert_eq!(
            diagnostics,
            vec![Diagnostic::Cycle {
                resolvable: r1,
                stack: vec![r1, r2],
            }]
        );
        assert_eq!(analyzer.depth(), 0);
        assert_eq!(diagnostics[0].to_string(), "cycle at #0 via [#0 #1]");
    }

    #[test]
    fn test_cycle_with_broken_member_still_fails_outside() {
        let mut pool = Pool::new();
        let mut r1 = pkg("r1", &["c2", "libmissing"]);
        r1.provides.push(cap("c1"));
        let mut r2 = pkg("r2", &["c1"]);
        r2.provides.push(cap("c2"));
        let r1 = pool.add_installed(r1);
        let r2 = pool.add_installed(r2);

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, r1).unwrap());
        // r2 was decided while r1 was still assumed runnable
        assert_eq!(analyzer.verdict(r2), Verdict::True);
        assert_eq!(analyzer.verdict(r1), Verdict::False);
    }

    #[test]
    fn test_repeated_query_hits_cache() {
        let mut pool = Pool::new();
        pool.add_installed(pkg("glibc", &[]));
        let bash = pool.add(pkg("bash", &["glibc"]));
        let source = Counting {
            pool: &pool,
            lookups: Cell::new(0),
        };

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&source, bash).unwrap());
        let lookups = source.lookups.get();
        assert!(lookups > 0);

        assert!(analyzer.is_runnable(&source, bash).unwrap());
        assert_eq!(source.lookups.get(), lookups);
        assert_eq!(analyzer.cache_len(), 2);
    }

    #[test]
    fn test_clear_allows_new_verdict() {
        let mut pool = Pool::new();
        let r = pool.add(pkg("r", &["late-cap"]));

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, r).unwrap());

        pool.add_system_provide(cap("late-cap"));
        assert!(!analyzer.is_runnable(&pool, r).unwrap(), "stale verdict until cleared");

        analyzer.clear();
        assert_eq!(analyzer.cache_len(), 0);
        assert!(analyzer.is_runnable(&pool, r).unwrap());
    }

    #[test]
    fn test_installable_uses_prerequires() {
        let mut pool = Pool::new();
        pool.add_installed(pkg("coreutils", &[]));
        let mut r = pkg("r", &["libmissing"]);
        r.prerequires.push(cap("coreutils"));
        let r = pool.add(r);

        let mut analyzer = Analyzer::new();
        assert!(!analyzer.is_runnable(&pool, r).unwrap());
        assert!(analyzer.is_installable(&pool, r).unwrap());
    }

    #[test]
    fn test_runnable_implies_installable() {
        let mut pool = Pool::new();
        let mut r = pkg("r", &[]);
        r.prerequires.push(cap("libmissing"));
        let r = pool.add(r);

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, r).unwrap());
        assert!(analyzer.is_installable(&pool, r).unwrap());

        analyzer.clear();
        assert!(!analyzer.is_installable(&pool, r).unwrap());
    }

    #[test]
    fn test_non_package_kinds() {
        let mut pool = Pool::new();
        pool.add_installed(Resolvable::new(ResKind::Pattern, "base", "10"));
        let mut x11 = Resolvable::new(ResKind::Pattern, "x11", "10");
        x11.requires.push(cap("pattern:base"));
        let x11 = pool.add(x11);

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_runnable(&pool, x11).unwrap());
    }

    #[test]
    fn test_unknown_resolvable() {
        let pool = Pool::new();
        let mut analyzer = Analyzer::new();
        let err = analyzer.is_runnable(&pool, ResolvableId(3)).unwrap_err();
        assert!(matches!(err, IorderError::UnknownResolvable(ResolvableId(3))));
    }

    #[test]
    fn test_error_unwinds_stack() {
        let mut pool = Pool::new();
        let r = pool.add_installed(pkg("r", &["dangling"]));

        let mut analyzer = Analyzer::new();
        let err = analyzer.is_runnable(&Dangling { pool: &pool }, r).unwrap_err();
        assert!(matches!(err, IorderError::UnknownResolvable(ResolvableId(99))));
        assert_eq!(analyzer.depth(), 0);

        // r is analyzed afresh, not taken for a cycle on a stale stack
        assert!(!analyzer.is_runnable(&pool, r).unwrap());
        assert!(!analyzer
            .diagnostics()
            .iter()
            .any(|diagnostic| matches!(diagnostic, Diagnostic::Cycle { .. })));
    }

    #[test]
    fn test_installable_error_unwinds_stack() {
        let mut pool = Pool::new();
        let mut r = pkg("r", &[]);
        r.prerequires.push(cap("helper"));
        pool.add_installed(pkg("helper", &["dangling"]));
        let r = pool.add(r);

        let mut analyzer = Analyzer::new();
        assert!(analyzer.is_installable(&Dangling { pool: &pool }, r).is_err());
        assert_eq!(analyzer.depth(), 0);
    }

    #[test]
    fn test_pop_mismatch_is_stack_corruption() {
        let mut analyzer = Analyzer::new();
        assert!(analyzer.push(ResolvableId(1)));
        assert!(!analyzer.push(ResolvableId(1)));

        let err = analyzer.pop(ResolvableId(2)).unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(
            err,
            IorderError::StackCorrupted { expected: ResolvableId(2), .. }
        ));
        assert!(analyzer.pop(ResolvableId(1)).is_ok());
    }
}
