//! Update-and-return statements used by the field mutators.
//!
//! - `statement.rs` - `UpdateStatement` builder and its rendered text
//! - `validator.rs` - identifier checks for spliced path segments

mod statement;
mod validator;

pub use statement::{Projection, SetExpression, UpdateStatement};
pub use validator::validate_segment;
