use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::Edition;
use crate::error::IorderError;

/// Kind of resolvable a capability refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResKind {
    #[default]
    Package,
    Pattern,
    Product,
    Patch,
}

impl ResKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResKind::Package => "package",
            ResKind::Pattern => "pattern",
            ResKind::Product => "product",
            ResKind::Patch => "patch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "package" => Some(ResKind::Package),
            "pattern" => Some(ResKind::Pattern),
            "product" => Some(ResKind::Product),
            "patch" => Some(ResKind::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for ResKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relational operator of a versioned capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rel {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl Rel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rel::Lt => "<",
            Rel::Le => "<=",
            Rel::Eq => "=",
            Rel::Ge => ">=",
            Rel::Gt => ">",
            Rel::Ne => "!=",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(Rel::Lt),
            "<=" => Some(Rel::Le),
            "=" | "==" => Some(Rel::Eq),
            ">=" => Some(Rel::Ge),
            ">" => Some(Rel::Gt),
            "!=" => Some(Rel::Ne),
            _ => None,
        }
    }

    fn less(&self) -> bool {
        matches!(self, Rel::Lt | Rel::Le | Rel::Ne)
    }

    fn equal(&self) -> bool {
        matches!(self, Rel::Le | Rel::Eq | Rel::Ge)
    }

    fn greater(&self) -> bool {
        matches!(self, Rel::Gt | Rel::Ge | Rel::Ne)
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, optionally versioned predicate over resolvables of one kind.
///
/// Capabilities are immutable values. `requires`, `provides` and friends of a
/// [`Resolvable`](super::Resolvable) are plain lists of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    kind: ResKind,
    name: String,
    range: Option<(Rel, Edition)>,
}

impl Capability {
    /// Unversioned package capability
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(ResKind::Package, name)
    }

    pub fn with_kind(kind: ResKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            range: None,
        }
    }

    pub fn versioned(kind: ResKind, name: impl Into<String>, rel: Rel, edition: impl Into<Edition>) -> Self {
        Self {
            kind,
            name: name.into(),
            range: Some((rel, edition.into())),
        }
    }

    /// Parse `[kind:]name [op edition]`
    pub fn parse(s: &str) -> Result<Self, IorderError> {
        let mut parts = s.split_whitespace();
        let Some(head) = parts.next() else {
            return Err(IorderError::InvalidCapability(s.to_string()));
        };

        let (kind, name) = match head.split_once(':') {
            Some((k, n)) if !n.is_empty() => match ResKind::from_str(k) {
                Some(kind) => (kind, n),
                None => (ResKind::Package, head),
            },
            _ => (ResKind::Package, head),
        };

        let range = match (parts.next(), parts.next()) {
            (None, _) => None,
            (Some(op), Some(edition)) => {
                let rel = Rel::parse(op).ok_or_else(|| IorderError::InvalidCapability(s.to_string()))?;
                Some((rel, Edition::parse(edition)))
            }
            (Some(_), None) => return Err(IorderError::InvalidCapability(s.to_string())),
        };

        if parts.next().is_some() {
            return Err(IorderError::InvalidCapability(s.to_string()));
        }

        Ok(Self {
            kind,
            name: name.to_string(),
            range,
        })
    }

    pub fn kind(&self) -> ResKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> Option<(Rel, &Edition)> {
        self.range.as_ref().map(|(rel, ed)| (*rel, ed))
    }

    /// Whether a provided capability `self` satisfies the requested `other`
    /// (same kind, same name, overlapping edition ranges).
    pub fn matches(&self, other: &Capability) -> bool {
        if self.kind != other.kind || self.name != other.name {
            return false;
        }
        match (&self.range, &other.range) {
            (Some((a_rel, a_ed)), Some((b_rel, b_ed))) => ranges_overlap(*a_rel, a_ed, *b_rel, b_ed),
            _ => true,
        }
    }
}

fn ranges_overlap(a_rel: Rel, a_ed: &Edition, b_rel: Rel, b_ed: &Edition) -> bool {
    match a_ed.compare(b_ed) {
        Ordering::Less => a_rel.greater() || b_rel.less(),
        Ordering::Greater => a_rel.less() || b_rel.greater(),
        Ordering::Equal => {
            (a_rel.equal() && b_rel.equal())
                || (a_rel.less() && b_rel.less())
                || (a_rel.greater() && b_rel.greater())
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind != ResKind::Package {
            write!(f, "{}:", self.kind)?;
        }
        write!(f, "{}", self.name)?;
        if let Some((rel, edition)) = &self.range {
            write!(f, " {} {}", rel, edition)?;
        }
        Ok(())
    }
}

impl FromStr for Capability {
    type Err = IorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::parse(s)
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Capability::parse(&s).map_err(serde::de::Error::custom)
    }
}
