//! Declarative validation for observable values.
//!
//! Rules are bound to [`Observable`] values through an [`Engine`]. Bound
//! fields can be grouped into named sections that nest, gate themselves on a
//! flag and pass inherited rules down to their fields. Validation targets a
//! single field, a collection, a section or any mix of these, and runs either
//! synchronously or with async rules awaited concurrently.
//!
//! ```
//! use formguard::prelude::*;
//!
//! let engine = Engine::new();
//! let email = Observable::new(Value::from("not an email"));
//! let field = engine.bind(&email, RuleSet::new().rule("required", true).rule("email", true));
//!
//! assert_eq!(engine.is_valid(&field), Ok(false));
//! assert_eq!(field.error_message(), "Please enter a valid email address");
//! ```

pub mod combinator;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod observable;
pub mod result;
pub mod rules;
pub mod section;
mod sync;
pub mod target;
pub mod value;

pub use config::{EngineConfig, UnknownSectionPolicy};
pub use engine::Engine;
pub use error::{Result, RuleFault, ValidationError};
pub use field::{FieldId, FieldValidator};
pub use observable::{MaybeObservable, Observable, ObservableId, Subscription};
pub use result::{FieldError, ValidationResult};
pub use rules::{Completion, RuleParam, RuleRegistry, RuleSet, ValidatorDefinition};
pub use target::{FieldCollection, Target};
pub use value::Value;

pub mod prelude {
    pub use crate::combinator::{Pending, all_settled, all_true};
    pub use crate::config::{EngineConfig, UnknownSectionPolicy};
    pub use crate::engine::Engine;
    pub use crate::error::{RuleFault, ValidationError};
    pub use crate::field::FieldValidator;
    pub use crate::observable::{MaybeObservable, Observable, Subscription};
    pub use crate::result::{FieldError, ValidationResult};
    pub use crate::rules::{Completion, RuleRegistry, RuleSet, ValidatorDefinition};
    pub use crate::target::{FieldCollection, Target};
    pub use crate::value::Value;
}
