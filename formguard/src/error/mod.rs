//! Error types

mod rule;
mod validation;

pub use rule::*;
pub use validation::*;
