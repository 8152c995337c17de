//! Rules: definitions, the registry, built-ins and rule sets.
//!
//! A rule is looked up by name at evaluation time, so the registry can gain
//! or change rules after fields referencing them were bound.
//!
//! # Example
//!
//! ```
//! use formguard::rules::{RuleRegistry, ValidatorDefinition};
//!
//! let registry = RuleRegistry::with_builtins();
//! registry.register(
//!     "noSpaces",
//!     ValidatorDefinition::new(
//!         |_param, value| !value.as_text().unwrap_or_default().contains(' '),
//!         "Spaces are not allowed",
//!     ),
//! );
//! assert!(registry.contains("noSpaces"));
//! ```

pub mod builtin;
pub mod date;
mod definition;
mod registry;
mod set;

pub use definition::{Completion, PARAM_PLACEHOLDER, Predicate, RuleOutcome, ValidatorDefinition};
pub use registry::RuleRegistry;
pub use set::{RuleParam, RuleSet, SECTION_KEY};
