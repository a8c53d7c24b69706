use indexmap::IndexMap;
use std::collections::HashMap;

use super::{Provider, ResStatus, ResolvableSource, TransactOrigin};
use crate::error::{IorderError, Result};
use crate::resolvable::{ident_of, Capability, ResKind, Resolvable, ResolvableId};

/// Pool of all known resolvables, installed and available.
///
/// The pool is both the store holding each resolvable's mutable status and the
/// capability index answering "who provides this?". Ids are 0-based and dense.
#[derive(Debug, Default)]
pub struct Pool {
    /// All resolvables indexed by id
    resolvables: Vec<Resolvable>,

    /// Status of each resolvable, parallel to `resolvables`
    statuses: Vec<ResStatus>,

    /// Capabilities satisfied by the base system outside the package database
    system_provides: Vec<Capability>,

    /// Resolvable ids indexed by provided (kind, name), in insertion order
    providers: HashMap<(ResKind, String), Vec<ResolvableId>>,

    /// Resolvable ids grouped by ident, in insertion order
    idents: IndexMap<String, Vec<ResolvableId>>,

    /// Explicitly chosen install candidate per ident
    candidates: HashMap<String, ResolvableId>,

    /// Status snapshot taken by `save_state`
    saved: Option<Vec<ResStatus>>,
}

impl Pool {
    /// Create a new empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an available resolvable, returning its id
    pub fn add(&mut self, resolvable: Resolvable) -> ResolvableId {
        self.add_with_status(resolvable, ResStatus::available())
    }

    /// Add an installed resolvable, returning its id
    pub fn add_installed(&mut self, resolvable: Resolvable) -> ResolvableId {
        self.add_with_status(resolvable, ResStatus::installed())
    }

    fn add_with_status(&mut self, resolvable: Resolvable, status: ResStatus) -> ResolvableId {
        let id = ResolvableId(self.resolvables.len() as u32);

        let self_provide = resolvable.self_provide();
        for cap in std::iter::once(&self_provide).chain(resolvable.provides.iter()) {
            let ids = self
                .providers
                .entry((cap.kind(), cap.name().to_string()))
                .or_default();
            if ids.last() != Some(&id) {
                ids.push(id);
            }
        }

        self.idents.entry(resolvable.ident()).or_default().push(id);

        log::trace!("Added {} as {} ({})", resolvable, id, status);
        self.resolvables.push(resolvable);
        self.statuses.push(status);
        id
    }

    /// Declare a capability as provided by the base system
    pub fn add_system_provide(&mut self, capability: Capability) {
        self.system_provides.push(capability);
    }

    pub fn len(&self) -> usize {
        self.resolvables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvables.is_empty()
    }

    /// Get a resolvable by id
    pub fn get(&self, id: ResolvableId) -> Option<&Resolvable> {
        self.resolvables.get(id.index())
    }

    /// Get a resolvable by id, failing for ids this pool never handed out
    pub fn try_get(&self, id: ResolvableId) -> Result<&Resolvable> {
        self.get(id).ok_or(IorderError::UnknownResolvable(id))
    }

    /// Iterate all resolvables in id order
    pub fn iter(&self) -> impl Iterator<Item = (ResolvableId, &Resolvable)> {
        self.resolvables
            .iter()
            .enumerate()
            .map(|(idx, r)| (ResolvableId(idx as u32), r))
    }

    pub fn status(&self, id: ResolvableId) -> Option<ResStatus> {
        self.statuses.get(id.index()).copied()
    }

    /// Set or reset the transact flag of a resolvable.
    ///
    /// Returns `Ok(false)` if the change was refused because a weaker origin
    /// tried to revoke a stronger one.
    pub fn set_transact(&mut self, id: ResolvableId, flag: bool, origin: TransactOrigin) -> Result<bool> {
        let status = self
            .statuses
            .get_mut(id.index())
            .ok_or(IorderError::UnknownResolvable(id))?;
        let changed = status.set_transact(flag, origin);
        if !changed {
            log::debug!("Refused to reset transact of {} by {}", id, origin);
        }
        Ok(changed)
    }

    /// All resolvables sharing an ident, in insertion order
    pub fn by_ident(&self, ident: &str) -> &[ResolvableId] {
        self.idents.get(ident).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find a resolvable by kind, name and optionally edition.
    ///
    /// Without an edition the last added match wins.
    pub fn find(&self, kind: ResKind, name: &str, edition: Option<&str>) -> Option<ResolvableId> {
        self.by_ident(&ident_of(kind, name))
            .iter()
            .rev()
            .copied()
            .find(|id| match edition {
                Some(edition) => self.resolvables[id.index()].edition.to_string() == edition,
                None => true,
            })
    }

    /// Installed resolvables of an ident
    pub fn installed_of(&self, ident: &str) -> Vec<ResolvableId> {
        self.by_ident(ident)
            .iter()
            .copied()
            .filter(|id| self.statuses[id.index()].is_installed())
            .collect()
    }

    /// Choose the install candidate for the resolvable's ident
    pub fn set_candidate(&mut self, id: ResolvableId) -> Result<()> {
        let ident = self.try_get(id)?.ident();
        self.candidates.insert(ident, id);
        Ok(())
    }

    /// Install candidate of an ident: the explicit choice, else the last
    /// available resolvable added for it.
    pub fn candidate(&self, ident: &str) -> Option<ResolvableId> {
        if let Some(id) = self.candidates.get(ident) {
            return Some(*id);
        }
        self.by_ident(ident)
            .iter()
            .rev()
            .copied()
            .find(|id| !self.statuses[id.index()].is_installed())
    }

    /// Mark the candidate of an ident for installation.
    ///
    /// The installed resolvables of the same ident are superseded: they are
    /// marked to transact as well, which for installed items means removal.
    /// Returns false if there is no candidate to install.
    pub fn set_to_install(&mut self, ident: &str) -> Result<bool> {
        let Some(candidate) = self.candidate(ident) else {
            log::debug!("No candidate to install for {}", ident);
            return Ok(false);
        };

        if !self.set_transact(candidate, true, TransactOrigin::User)? {
            return Ok(false);
        }

        for installed in self.installed_of(ident) {
            if installed != candidate {
                log::trace!("{} supersedes {}", candidate, installed);
                self.set_transact(installed, true, TransactOrigin::User)?;
            }
        }
        Ok(true)
    }

    /// Ids of all transacting resolvables, in id order
    pub fn transacting(&self) -> impl Iterator<Item = ResolvableId> + '_ {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, status)| status.transacts())
            .map(|(idx, _)| ResolvableId(idx as u32))
    }

    /// Installed resolvables the given one would obsolete if installed.
    ///
    /// Obsoletes match against names and editions of installed resolvables,
    /// not against what they provide.
    pub fn what_obsoletes(&self, id: ResolvableId) -> Vec<ResolvableId> {
        let Some(resolvable) = self.get(id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for cap in resolvable.obsoletes() {
            for &other in self.by_ident(&ident_of(cap.kind(), cap.name())) {
                if other == id || result.contains(&other) {
                    continue;
                }
                if !self.statuses[other.index()].is_installed() {
                    continue;
                }
                if self.resolvables[other.index()].self_provide().matches(cap) {
                    result.push(other);
                }
            }
        }
        result
    }

    /// Remember the status of every resolvable
    pub fn save_state(&mut self) {
        self.saved = Some(self.statuses.clone());
        log::debug!("Saved state of {} resolvables", self.statuses.len());
    }

    /// Restore the statuses remembered by `save_state`.
    ///
    /// Resolvables added after the snapshot are reset to their plain
    /// installed/available state. Returns false if nothing was saved.
    pub fn restore_state(&mut self) -> bool {
        let Some(saved) = &self.saved else {
            return false;
        };

        for (idx, status) in self.statuses.iter_mut().enumerate() {
            *status = match saved.get(idx) {
                Some(saved) => *saved,
                None if status.is_installed() => ResStatus::installed(),
                None => ResStatus::available(),
            };
        }
        self.candidates.clear();
        log::debug!("Restored state of {} resolvables", saved.len());
        true
    }
}

impl ResolvableSource for Pool {
    fn resolvable(&self, id: ResolvableId) -> Option<&Resolvable> {
        self.get(id)
    }

    fn status(&self, id: ResolvableId) -> Option<ResStatus> {
        Pool::status(self, id)
    }

    fn what_provides(&self, capability: &Capability) -> Vec<Provider> {
        let mut result = Vec::new();

        if self.system_provides.iter().any(|provided| provided.matches(capability)) {
            result.push(Provider::System);
        }

        let key = (capability.kind(), capability.name().to_string());
        if let Some(ids) = self.providers.get(&key) {
            for &id in ids {
                let resolvable = &self.resolvables[id.index()];
                let provides = std::iter::once(resolvable.self_provide())
                    .chain(resolvable.provides.iter().cloned())
                    .any(|provided| provided.matches(capability));
                if provides {
                    result.push(Provider::Resolvable(id));
                }
            }
        }

        result
    }
}
