//! Validation targets.
//!
//! Every orchestrator entry point accepts anything convertible into a
//! [`Target`]: a bound field, a section name, a collection of observables,
//! or a list mixing all of these.

use crate::field::FieldValidator;
use crate::observable::Observable;
use crate::value::Value;

/// What to validate.
#[derive(Debug, Clone, Default)]
pub enum Target {
    /// Nothing was supplied. Resolving it is a configuration error.
    #[default]
    Missing,
    /// A single bound field.
    Field(FieldValidator),
    /// Observables, some of which may be bound. Unbound members are ignored.
    Collection(Vec<Observable<Value>>),
    /// A section by name, including its descendants.
    Section(String),
    /// Several targets validated together.
    List(Vec<Target>),
}

impl Target {
    /// A section target.
    pub fn section(name: impl Into<String>) -> Self {
        Self::Section(name.into())
    }

    /// A collection target built from a [`FieldCollection`].
    pub fn collection<C: FieldCollection + ?Sized>(source: &C) -> Self {
        Self::Collection(source.members())
    }

    /// A list target.
    pub fn list<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        Self::List(targets.into_iter().map(Into::into).collect())
    }
}

/// A value holding observables that may be bound as fields, such as a form
/// view-model.
pub trait FieldCollection {
    /// The observables to consider, in order.
    fn members(&self) -> Vec<Observable<Value>>;
}

impl FieldCollection for Vec<Observable<Value>> {
    fn members(&self) -> Vec<Observable<Value>> {
        self.clone()
    }
}

impl FieldCollection for [Observable<Value>] {
    fn members(&self) -> Vec<Observable<Value>> {
        self.to_vec()
    }
}

impl From<FieldValidator> for Target {
    fn from(field: FieldValidator) -> Self {
        Self::Field(field)
    }
}

impl From<&FieldValidator> for Target {
    fn from(field: &FieldValidator) -> Self {
        Self::Field(field.clone())
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Self::Section(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Self::Section(name)
    }
}

impl From<&String> for Target {
    fn from(name: &String) -> Self {
        Self::Section(name.clone())
    }
}

impl From<Observable<Value>> for Target {
    fn from(observable: Observable<Value>) -> Self {
        Self::Collection(vec![observable])
    }
}

impl From<&Observable<Value>> for Target {
    fn from(observable: &Observable<Value>) -> Self {
        Self::Collection(vec![observable.clone()])
    }
}

impl From<Vec<Observable<Value>>> for Target {
    fn from(observables: Vec<Observable<Value>>) -> Self {
        Self::Collection(observables)
    }
}

impl<const N: usize> From<[Observable<Value>; N]> for Target {
    fn from(observables: [Observable<Value>; N]) -> Self {
        Self::Collection(observables.into())
    }
}

impl From<Vec<Target>> for Target {
    fn from(targets: Vec<Target>) -> Self {
        Self::List(targets)
    }
}

impl<const N: usize> From<[Target; N]> for Target {
    fn from(targets: [Target; N]) -> Self {
        Self::List(targets.into())
    }
}

impl<T: Into<Target>> From<Option<T>> for Target {
    fn from(target: Option<T>) -> Self {
        target.map_or(Self::Missing, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert!(matches!(Target::from("a"), Target::Section(name) if name == "a"));
        assert!(matches!(Target::from(None::<&str>), Target::Missing));
        assert!(matches!(Target::from(Some("b")), Target::Section(name) if name == "b"));

        let first = Observable::new(Value::Null);
        let second = Observable::new(Value::Null);
        assert!(matches!(
            Target::from([first.clone(), second]),
            Target::Collection(members) if members.len() == 2
        ));
        assert!(matches!(
            Target::list([Target::from("a"), Target::from(&first)]),
            Target::List(targets) if targets.len() == 2
        ));
    }

    #[test]
    fn test_collection_trait() {
        struct Form {
            name: Observable<Value>,
            email: Observable<Value>,
        }

        impl FieldCollection for Form {
            fn members(&self) -> Vec<Observable<Value>> {
                vec![self.name.clone(), self.email.clone()]
            }
        }

        let form = Form {
            name: Observable::new(Value::Null),
            email: Observable::new(Value::Null),
        };
        let Target::Collection(members) = Target::collection(&form) else {
            panic!("expected a collection");
        };
        assert_eq!(members[1].id(), form.email.id());
    }
}
