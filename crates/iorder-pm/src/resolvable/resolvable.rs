use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Capability, Edition, Rel, ResKind};

/// Handle of a resolvable inside a [`Pool`](crate::pool::Pool).
///
/// Ids are dense and assigned in insertion order, so ordering by id is the
/// pool's stable input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvableId(pub u32);

impl ResolvableId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResolvableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A manageable unit: package, pattern, product or patch.
///
/// Only the identity and the four capability lists live here. Mutable status
/// is owned by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolvable {
    pub kind: ResKind,
    pub name: String,
    pub edition: Edition,
    pub arch: String,

    /// Batch (media) number of the source this resolvable comes from
    #[serde(rename = "media")]
    pub media_nr: u32,

    pub provides: Vec<Capability>,
    pub requires: Vec<Capability>,
    pub prerequires: Vec<Capability>,
    pub obsoletes: Vec<Capability>,
}

impl Resolvable {
    pub fn new(kind: ResKind, name: impl Into<String>, edition: impl Into<Edition>) -> Self {
        Self {
            kind,
            name: name.into(),
            edition: edition.into(),
            arch: "noarch".to_string(),
            ..Default::default()
        }
    }

    pub fn package(name: impl Into<String>, edition: impl Into<Edition>) -> Self {
        Self::new(ResKind::Package, name, edition)
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    pub fn with_media(mut self, media_nr: u32) -> Self {
        self.media_nr = media_nr;
        self
    }

    pub fn provides(&self) -> &[Capability] {
        &self.provides
    }

    pub fn requires(&self) -> &[Capability] {
        &self.requires
    }

    pub fn prerequires(&self) -> &[Capability] {
        &self.prerequires
    }

    pub fn obsoletes(&self) -> &[Capability] {
        &self.obsoletes
    }

    /// Identity shared by all editions of this resolvable.
    ///
    /// Packages use their bare name, other kinds are prefixed: `pattern:x11`.
    pub fn ident(&self) -> String {
        ident_of(self.kind, &self.name)
    }

    /// The capability every resolvable implicitly provides: `kind:name = edition`.
    pub fn self_provide(&self) -> Capability {
        Capability::versioned(self.kind, self.name.clone(), Rel::Eq, self.edition.clone())
    }
}

/// Ident of a resolvable of the given kind and name
pub fn ident_of(kind: ResKind, name: &str) -> String {
    match kind {
        ResKind::Package => name.to_string(),
        kind => format!("{}:{}", kind, name),
    }
}

impl fmt::Display for Resolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind != ResKind::Package {
            write!(f, "{}:", self.kind)?;
        }
        write!(f, "{}-{}.{}", self.name, self.edition, self.arch)
    }
}
