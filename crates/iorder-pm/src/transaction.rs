use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::pool::{Pool, TransactOrigin};
use crate::resolvable::ResolvableId;

/// How the members of a transaction set are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderPolicy {
    /// Ascending batch (media) number, stable within a batch
    #[default]
    #[serde(rename = "by-batch")]
    OrderByBatch,
    /// Pool order
    #[serde(rename = "unordered")]
    Unordered,
}

impl OrderPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "by-batch" | "by-media" | "batch" => Some(OrderPolicy::OrderByBatch),
            "unordered" | "none" => Some(OrderPolicy::Unordered),
            _ => None,
        }
    }
}

/// A resolvable to install, together with the installed resolvables it obsoletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEntry {
    pub id: ResolvableId,
    pub obsoletes: Vec<ResolvableId>,
}

/// Resolvables to delete and to install, built from the transacting pool entries.
///
/// Every transacting resolvable lands in exactly one of the two sequences:
/// installed ones are deleted, the others installed.
#[derive(Debug, Clone, Default)]
pub struct TransactionSet {
    to_delete: Vec<ResolvableId>,
    to_install: Vec<InstallEntry>,
    policy: OrderPolicy,
}

impl TransactionSet {
    /// Collect the transacting resolvables of `pool`
    pub fn build(pool: &Pool, policy: OrderPolicy) -> Self {
        let mut to_delete = Vec::new();
        let mut to_install = Vec::new();

        for id in pool.transacting() {
            let Some(status) = pool.status(id) else {
                continue;
            };
            if status.is_to_be_uninstalled() {
                to_delete.push(id);
            } else {
                to_install.push(InstallEntry {
                    id,
                    obsoletes: pool.what_obsoletes(id),
                });
            }
        }

        if policy == OrderPolicy::OrderByBatch {
            let media_nr = |id: ResolvableId| pool.get(id).map(|r| r.media_nr).unwrap_or(0);
            to_delete.sort_by_key(|id| media_nr(*id));
            to_install.sort_by_key(|entry| media_nr(entry.id));
        }

        log::debug!(
            "Transaction set: {} to delete, {} to install ({:?})",
            to_delete.len(),
            to_install.len(),
            policy
        );

        Self {
            to_delete,
            to_install,
            policy,
        }
    }

    pub fn to_delete(&self) -> &[ResolvableId] {
        &self.to_delete
    }

    pub fn to_install(&self) -> &[InstallEntry] {
        &self.to_install
    }

    pub fn policy(&self) -> OrderPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_install.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_install.is_empty()
    }

    /// Whether `id` is a member of either sequence
    pub fn contains(&self, id: ResolvableId) -> bool {
        self.to_delete.contains(&id) || self.to_install.iter().any(|entry| entry.id == id)
    }

    /// Members the host expected to transact that are in neither sequence
    pub fn missing_members(&self, expected: &[ResolvableId]) -> Vec<ResolvableId> {
        let missing: Vec<ResolvableId> = expected
            .iter()
            .copied()
            .filter(|id| !self.contains(*id))
            .collect();
        for id in &missing {
            log::warn!("MISSING {} in transaction set", id);
        }
        missing
    }

    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            installs: self.to_install.len(),
            removals: self.to_delete.len(),
            obsoletes: self.to_install.iter().map(|entry| entry.obsoletes.len()).sum(),
        }
    }
}

/// Summary of a transaction set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub installs: usize,
    pub removals: usize,
    pub obsoletes: usize,
}

impl fmt::Display for TransactionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if self.installs > 0 {
            parts.push(format!("{} install(s)", self.installs));
        }
        if self.removals > 0 {
            parts.push(format!("{} removal(s)", self.removals));
        }

        if parts.is_empty() {
            write!(f, "Nothing to do")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Mark a delete member as transacting on behalf of the user
pub fn stage_delete(pool: &mut Pool, id: ResolvableId) -> Result<bool> {
    pool.set_transact(id, true, TransactOrigin::User)
}

/// Make `id` the candidate of its ident and mark it for installation,
/// superseding the installed resolvables of the same ident.
pub fn stage_install(pool: &mut Pool, id: ResolvableId) -> Result<bool> {
    pool.set_candidate(id)?;
    let ident = pool.try_get(id)?.ident();
    pool.set_to_install(&ident)
}

/// Resolvables transacting on the solver's behalf.
///
/// After the host applied its own decisions, anything still transacting by
/// solver was pulled in without being asked for.
pub fn unexpected_solver_transacts(pool: &Pool) -> Vec<ResolvableId> {
    let found: Vec<ResolvableId> = pool
        .transacting()
        .filter(|id| pool.status(*id).is_some_and(|status| status.is_by_solver()))
        .collect();
    for id in &found {
        match pool.get(*id) {
            Some(resolvable) => log::warn!("MISSING {}", resolvable),
            None => log::warn!("MISSING {}", id),
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvable::{Capability, Resolvable};

    fn pkg(name: &str, media_nr: u32) -> Resolvable {
        Resolvable::package(name, "1.0").with_media(media_nr)
    }

    fn mark(pool: &mut Pool, id: ResolvableId) {
        pool.set_transact(id, true, TransactOrigin::User).unwrap();
    }

    #[test]
    fn test_empty_pool() {
        let pool = Pool::new();
        let set = TransactionSet::build(&pool, OrderPolicy::OrderByBatch);
        assert!(set.is_empty());
        assert_eq!(set.summary().to_string(), "Nothing to do");
    }

    #[test]
    fn test_partition_by_intent() {
        let mut pool = Pool::new();
        let p1 = pool.add_installed(pkg("p1", 1));
        let p2 = pool.add_installed(pkg("p2", 1));
        let q1 = pool.add(pkg("q1", 1));
        let idle = pool.add(pkg("idle", 1));
        mark(&mut pool, p1);
        mark(&mut pool, p2);
        mark(&mut pool, q1);

        let set = TransactionSet::build(&pool, OrderPolicy::OrderByBatch);
        assert_eq!(set.to_delete(), &[p1, p2]);
        assert_eq!(set.to_install().iter().map(|e| e.id).collect::<Vec<_>>(), vec![q1]);
        assert!(!set.contains(idle));
        assert_eq!(set.len(), 3);
        assert_eq!(set.summary().to_string(), "1 install(s), 2 removal(s)");
    }

    #[test]
    fn test_order_by_batch_is_stable() {
        let mut pool = Pool::new();
        let a = pool.add(pkg("a", 3));
        let b = pool.add(pkg("b", 1));
        let c = pool.add(pkg("c", 3));
        let d = pool.add(pkg("d", 2));
        for id in [a, b, c, d] {
            mark(&mut pool, id);
        }

        let ordered = TransactionSet::build(&pool, OrderPolicy::OrderByBatch);
        let ids: Vec<_> = ordered.to_install().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, d, a, c]);

        let unordered = TransactionSet::build(&pool, OrderPolicy::Unordered);
        let ids: Vec<_> = unordered.to_install().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![a, b, c, d]);
    }

    #[test]
    fn test_install_entry_carries_obsoletes() {
        let mut pool = Pool::new();
        let old = pool.add_installed(pkg("libtiff-old", 1));
        let mut new = pkg("libtiff", 1);
        new.obsoletes.push(Capability::new("libtiff-old"));
        let new = pool.add(new);
        mark(&mut pool, new);

        let set = TransactionSet::build(&pool, OrderPolicy::OrderByBatch);
        assert_eq!(set.to_install()[0].obsoletes, vec![old]);
        assert_eq!(set.summary().obsoletes, 1);
    }

    #[test]
    fn test_missing_members() {
        let mut pool = Pool::new();
        let a = pool.add(pkg("a", 1));
        let b = pool.add(pkg("b", 1));
        mark(&mut pool, a);

        let set = TransactionSet::build(&pool, OrderPolicy::Unordered);
        assert_eq!(set.missing_members(&[a, b]), vec![b]);
    }

    #[test]
    fn test_stage_install_supersedes() {
        let mut pool = Pool::new();
        let old = pool.add_installed(Resolvable::package("bash", "3.0"));
        let new = pool.add(Resolvable::package("bash", "3.1"));

        assert!(stage_install(&mut pool, new).unwrap());
        assert!(pool.status(new).unwrap().is_to_be_installed());
        assert!(pool.status(old).unwrap().is_to_be_uninstalled());
        assert_eq!(pool.candidate("bash"), Some(new));
    }

    #[test]
    fn test_stage_delete() {
        let mut pool = Pool::new();
        let old = pool.add_installed(pkg("old", 1));
        assert!(stage_delete(&mut pool, old).unwrap());
        assert!(pool.status(old).unwrap().is_by_user());
    }

    #[test]
    fn test_unexpected_solver_transacts() {
        let mut pool = Pool::new();
        let user = pool.add(pkg("user", 1));
        let solver = pool.add(pkg("solver", 1));
        pool.set_transact(user, true, TransactOrigin::User).unwrap();
        pool.set_transact(solver, true, TransactOrigin::Solver).unwrap();

        assert_eq!(unexpected_solver_transacts(&pool), vec![solver]);
    }

    #[test]
    fn test_order_policy_from_str() {
        assert_eq!(OrderPolicy::from_str("by-batch"), Some(OrderPolicy::OrderByBatch));
        assert_eq!(OrderPolicy::from_str("Unordered"), Some(OrderPolicy::Unordered));
        assert_eq!(OrderPolicy::from_str("random"), None);
    }
}
