//! Resolvable store and capability provider index.
//!
//! The [`Pool`] owns every resolvable together with its mutable [`ResStatus`].
//! Consumers that only need to read (the runnability analyzer) go through the
//! [`ResolvableSource`] trait, so they never hold on to pool internals.

mod pool;
mod status;

pub use pool::Pool;
pub use status::{ResStatus, TransactOrigin};

use crate::resolvable::{Capability, Resolvable, ResolvableId};

/// One entry of a provider lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Satisfied by the base system, outside the package database
    System,
    /// Satisfied by a resolvable in the pool
    Resolvable(ResolvableId),
}

/// Read access to resolvables, their status and their providers.
///
/// `what_provides` must return providers in a stable order for a fixed pool
/// state: verdicts depend on which provider is tried first.
pub trait ResolvableSource {
    fn resolvable(&self, id: ResolvableId) -> Option<&Resolvable>;

    fn status(&self, id: ResolvableId) -> Option<ResStatus>;

    fn what_provides(&self, capability: &Capability) -> Vec<Provider>;

    /// Whether a resolvable is on the system once its pending transaction is done
    fn on_system(&self, id: ResolvableId) -> bool {
        self.status(id).is_some_and(|status| status.on_system())
    }
}
