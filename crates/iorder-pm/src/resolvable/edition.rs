use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Version of a resolvable: `[epoch:]version[-release]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Edition {
    epoch: u32,
    version: String,
    release: Option<String>,
}

impl Edition {
    /// Parse an edition string. Never fails; malformed epochs count as 0.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) if !e.is_empty() && e.bytes().all(|b| b.is_ascii_digit()) => {
                (e.parse().unwrap_or(0), rest)
            }
            _ => (0, s),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) if !v.is_empty() && !r.is_empty() => (v.to_string(), Some(r.to_string())),
            _ => (rest.to_string(), None),
        };

        Self { epoch, version, release }
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
    }

    /// Compare two editions. The release only takes part when both sides carry one,
    /// so `2.0` matches any `2.0-N`.
    pub fn compare(&self, other: &Edition) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_segments(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => compare_segments(a, b),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl From<&str> for Edition {
    fn from(s: &str) -> Self {
        Edition::parse(s)
    }
}

impl Serialize for Edition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Edition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Edition::parse(&s))
    }
}

/// Segment-wise comparison of version strings.
///
/// Runs of digits compare numerically, runs of letters lexically, anything else
/// separates segments. A numeric segment is newer than an alphabetic one, and
/// with a common prefix the string with more segments is newer.
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut left = Segments::new(a);
    let mut right = Segments::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(l), Some(r)) => {
                let ord = match (is_numeric(l), is_numeric(r)) {
                    (true, true) => {
                        let l = l.trim_start_matches('0');
                        let r = r.trim_start_matches('0');
                        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
                    }
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.rest = self.rest.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
        let first = self.rest.chars().next()?;

        let end = if first.is_ascii_digit() {
            self.rest.find(|c: char| !c.is_ascii_digit())
        } else {
            self.rest.find(|c: char| !c.is_ascii_alphabetic())
        }
        .unwrap_or(self.rest.len());

        let (segment, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(segment)
    }
}

fn is_numeric(segment: &str) -> bool {
    segment.starts_with(|c: char| c.is_ascii_digit())
}
