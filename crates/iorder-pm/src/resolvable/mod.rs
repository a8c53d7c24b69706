// Resolvable model
//
// Resolvables (packages, patterns, products, patches), the capabilities they
// provide, require and obsolete, and the editions those capabilities compare.

mod capability;
mod edition;
mod resolvable;

pub use capability::{Capability, Rel, ResKind};
pub use edition::{compare_segments, Edition};
pub use resolvable::{ident_of, Resolvable, ResolvableId};
