//! Integrity enforcement for writes: shape validation, foreign key checks,
//! and cascade/restrict handling on delete.

pub mod cascade;
pub mod validator;

pub use cascade::{CascadeExecutor, CascadeReport};
pub use validator::{validate_shape, ReferenceChecker};
