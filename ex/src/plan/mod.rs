//! Plan validation
//!
//! Turns the advisor's untyped candidate actions into typed [`ActionSpec`]s,
//! or rejects the whole plan before anything touches the host.
//!
//! [`ActionSpec`]: crate::domain::ActionSpec

mod error;
mod validator;

pub use error::PlanError;
pub use validator::{PlanValidator, SUPPORTED_INSTALLER};
