//! JSON test cases: a pool, a transaction applied to it, and what to look at.
//!
//! ```json
//! {
//!   "system": ["rpmlib(PayloadIsLzma)"],
//!   "resolvables": [
//!     { "name": "libtiff", "edition": "3.8.2-5", "media": 1, "requires": ["glibc >= 2.4"] },
//!     { "name": "glibc", "edition": "2.4-31", "installed": true }
//!   ],
//!   "transaction": [ { "name": "libtiff", "action": "install" } ],
//!   "interest": ["libtiff"]
//! }
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{IorderError, Result};
use crate::pool::{Pool, TransactOrigin};
use crate::resolvable::{ident_of, Capability, ResKind, Resolvable, ResolvableId};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TestCase {
    /// Capabilities provided by the base system
    pub system: Vec<Capability>,

    pub resolvables: Vec<TestResolvable>,

    /// Decisions applied to the pool before the transaction set is built
    pub transaction: Vec<TransactionStep>,

    /// Idents to analyze; empty means all
    pub interest: Vec<String>,

    /// Idents expected to be part of the transaction set
    pub expect: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TestResolvable {
    #[serde(flatten)]
    pub resolvable: Resolvable,

    #[serde(default)]
    pub installed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Delete,
}

#[derive(Debug, Deserialize)]
pub struct TransactionStep {
    #[serde(default)]
    pub kind: ResKind,

    pub name: String,

    /// Picks one edition when several share the ident
    #[serde(default)]
    pub edition: Option<String>,

    pub action: Action,

    #[serde(default = "user_origin")]
    pub origin: TransactOrigin,
}

fn user_origin() -> TransactOrigin {
    TransactOrigin::User
}

impl TestCase {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let testcase = Self::parse(&content)?;
        log::debug!(
            "Loaded test case {} ({} resolvables, {} steps)",
            path.display(),
            testcase.resolvables.len(),
            testcase.transaction.len()
        );
        Ok(testcase)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Build the pool in declaration order, without applying the transaction
    pub fn build_pool(&self) -> Pool {
        let mut pool = Pool::new();
        for capability in &self.system {
            pool.add_system_provide(capability.clone());
        }
        for entry in &self.resolvables {
            if entry.installed {
                pool.add_installed(entry.resolvable.clone());
            } else {
                pool.add(entry.resolvable.clone());
            }
        }
        pool
    }

    /// Apply the transaction steps to `pool`, returning the resolvables they named.
    ///
    /// Installing marks the chosen edition as candidate and supersedes the
    /// installed editions of the same ident.
    pub fn apply_transaction(&self, pool: &mut Pool) -> Result<Vec<ResolvableId>> {
        let mut applied = Vec::with_capacity(self.transaction.len());

        for step in &self.transaction {
            let id = pool
                .find(step.kind, &step.name, step.edition.as_deref())
                .ok_or_else(|| IorderError::TestCase(format!("no resolvable matches {}", step)))?;
            let installed = pool.status(id).is_some_and(|status| status.is_installed());

            match step.action {
                Action::Install => {
                    if installed {
                        return Err(IorderError::TestCase(format!("{} is already installed", step)));
                    }
                    pool.set_candidate(id)?;
                    pool.set_transact(id, true, step.origin)?;
                    for installed in pool.installed_of(&ident_of(step.kind, &step.name)) {
                        pool.set_transact(installed, true, step.origin)?;
                    }
                }
                Action::Delete => {
                    if !installed {
                        return Err(IorderError::TestCase(format!("{} is not installed", step)));
                    }
                    pool.set_transact(id, true, step.origin)?;
                }
            }
            applied.push(id);
        }

        Ok(applied)
    }

    pub fn interest_set(&self) -> HashSet<String> {
        self.interest.iter().cloned().collect()
    }

    /// Resolve the expected idents against `pool`: the install candidate if
    /// there is one, else the installed resolvables.
    pub fn expected_members(&self, pool: &Pool) -> Result<Vec<ResolvableId>> {
        let mut members = Vec::new();
        for ident in &self.expect {
            if let Some(candidate) = pool.candidate(ident) {
                members.push(candidate);
                continue;
            }
            let installed = pool.installed_of(ident);
            if installed.is_empty() {
                return Err(IorderError::TestCase(format!("unknown expected ident: {}", ident)));
            }
            members.extend(installed);
        }
        Ok(members)
    }
}

impl std::fmt::Display for TransactionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ident_of(self.kind, &self.name))?;
        if let Some(edition) = &self.edition {
            write!(f, "-{}", edition)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"{
        "system": ["rpmlib(PayloadIsLzma)"],
        "resolvables": [
            { "name": "glibc", "edition": "2.4-31", "installed": true },
            { "name": "bash", "edition": "3.0", "installed": true },
            { "name": "bash", "edition": "3.1", "media": 2, "requires": ["glibc >= 2.4"] },
            { "kind": "pattern", "name": "x11", "edition": "10.3" }
        ],
        "transaction": [
            { "name": "bash", "edition": "3.1", "action": "install" },
            { "kind": "pattern", "name": "x11", "action": "install", "origin": "solver" }
        ],
        "interest": ["bash"],
        "expect": ["bash", "glibc"]
    }"#;

    #[test]
    fn test_parse() {
        let testcase = TestCase::parse(BASIC).unwrap();
        assert_eq!(testcase.system.len(), 1);
        assert_eq!(testcase.resolvables.len(), 4);
        assert!(testcase.resolvables[0].installed);
        assert_eq!(testcase.resolvables[2].resolvable.media_nr, 2);
        assert_eq!(testcase.transaction[0].origin, TransactOrigin::User);
        assert_eq!(testcase.transaction[1].origin, TransactOrigin::Solver);
        assert_eq!(testcase.transaction[1].kind, ResKind::Pattern);
        assert!(testcase.interest_set().contains("bash"));
    }

    #[test]
    fn test_apply_transaction() {
        let testcase = TestCase::parse(BASIC).unwrap();
        let mut pool = testcase.build_pool();
        let applied = testcase.apply_transaction(&mut pool).unwrap();

        assert_eq!(applied, vec![ResolvableId(2), ResolvableId(3)]);
        assert!(pool.status(ResolvableId(1)).unwrap().is_to_be_uninstalled());
        assert!(pool.status(ResolvableId(2)).unwrap().is_to_be_installed());
        assert!(pool.status(ResolvableId(3)).unwrap().is_by_solver());
        assert!(!pool.status(ResolvableId(0)).unwrap().transacts());
    }

    #[test]
    fn test_expected_members() {
        let testcase = TestCase::parse(BASIC).unwrap();
        let mut pool = testcase.build_pool();
        testcase.apply_transaction(&mut pool).unwrap();

        assert_eq!(
            testcase.expected_members(&pool).unwrap(),
            vec![ResolvableId(2), ResolvableId(0)]
        );
    }

    #[test]
    fn test_unknown_step() {
        let testcase = TestCase::parse(
            r#"{ "resolvables": [], "transaction": [{ "name": "nope", "action": "delete" }] }"#,
        )
        .unwrap();
        let mut pool = testcase.build_pool();
        let err = testcase.apply_transaction(&mut pool).unwrap_err();
        assert!(matches!(err, IorderError::TestCase(_)));
    }

    #[test]
    fn test_delete_requires_installed() {
        let testcase = TestCase::parse(
            r#"{ "resolvables": [{ "name": "a", "edition": "1" }],
                 "transaction": [{ "name": "a", "action": "delete" }] }"#,
        )
        .unwrap();
        let mut pool = testcase.build_pool();
        let err = testcase.apply_transaction(&mut pool).unwrap_err();
        assert_eq!(err.to_string(), "Invalid test case: a is not installed");
    }

    #[test]
    fn test_invalid_json() {
        let err = TestCase::parse("{ not json").unwrap_err();
        assert!(matches!(err, IorderError::Json(_)));
    }
}
