//! Document operations per entity kind.
//!
//! - `collection.rs` - the generic create/fetch/update/delete pipeline
//! - `mutators.rs` - counter and array-append capabilities
//! - `activity.rs`, `result.rs`, `stats.rs` - typed handles per kind

mod activity;
mod collection;
mod kind;
mod mutators;
mod result;
mod stats;

pub use activity::Activities;
pub use collection::DocumentCollection;
pub use kind::EntityKind;
pub use mutators::{ArrayAppends, CounterMutations};
pub use result::{CONTRIBUTIONS_COUNT, LOCATION_ALIAS, RESULTS_FIELD, Results};
pub use stats::{ENROLLMENTS_COUNT, Stats};
