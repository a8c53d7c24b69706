pub mod analyzer;
pub mod config;
pub mod error;
pub mod pool;
pub mod progress;
pub mod resolvable;
pub mod testcase;
pub mod transaction;
pub mod validate;

pub use analyzer::{Analyzer, Diagnostic, Verdict};
pub use config::Config;
pub use error::{IorderError, Result};
pub use pool::{Pool, Provider, ResStatus, ResolvableSource, TransactOrigin};
pub use progress::{LogReceiver, ProgressCounter, ProgressData, ProgressReceiver};
pub use resolvable::{Capability, Edition, Rel, ResKind, Resolvable, ResolvableId};
pub use testcase::TestCase;
pub use transaction::{
    stage_delete, stage_install, unexpected_solver_transacts, InstallEntry, OrderPolicy,
    TransactionSet, TransactionSummary,
};
pub use validate::{
    validate, Finding, FindingKind, Phase, PhaseStats, ValidationOptions, ValidationReport, Validator,
};
