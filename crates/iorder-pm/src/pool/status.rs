use serde::{Deserialize, Serialize};
use std::fmt;

/// Who asked for a resolvable to transact.
///
/// Ordered by strength: a `User` decision cannot be reverted by the `Solver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactOrigin {
    #[default]
    Solver,
    User,
}

impl fmt::Display for TransactOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactOrigin::Solver => write!(f, "solver"),
            TransactOrigin::User => write!(f, "user"),
        }
    }
}

/// Mutable status of a resolvable inside the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResStatus {
    installed: bool,
    transacts: bool,
    origin: TransactOrigin,
}

impl ResStatus {
    pub fn installed() -> Self {
        Self {
            installed: true,
            ..Default::default()
        }
    }

    pub fn available() -> Self {
        Self::default()
    }

    /// Installed before the transaction, whatever is decided for it
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Whether the resolvable is on the system once its transaction is carried
    /// out: installed and not deleted, or not installed and installed now.
    pub fn on_system(&self) -> bool {
        self.installed != self.transacts
    }

    pub fn transacts(&self) -> bool {
        self.transacts
    }

    pub fn origin(&self) -> TransactOrigin {
        self.origin
    }

    pub fn is_by_solver(&self) -> bool {
        self.transacts && self.origin == TransactOrigin::Solver
    }

    pub fn is_by_user(&self) -> bool {
        self.transacts && self.origin == TransactOrigin::User
    }

    /// Transacting and installed: going to be deleted.
    pub fn is_to_be_uninstalled(&self) -> bool {
        self.transacts && self.installed
    }

    /// Transacting and not installed: going to be installed.
    pub fn is_to_be_installed(&self) -> bool {
        self.transacts && !self.installed
    }

    /// Set or reset the transact flag.
    ///
    /// Returns false if a weaker origin tries to revoke a stronger decision.
    pub fn set_transact(&mut self, flag: bool, origin: TransactOrigin) -> bool {
        if self.transacts == flag {
            if flag && origin > self.origin {
                self.origin = origin;
            }
            return true;
        }

        if self.transacts && origin < self.origin {
            return false;
        }

        self.transacts = flag;
        self.origin = origin;
        true
    }
}

impl fmt::Display for ResStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.installed { "I" } else { "U" })?;
        if self.transacts {
            write!(f, "T({})", self.origin)?;
        } else {
            f.write_str("_")?;
        }
        Ok(())
    }
}
