//! Tests for synchronous validation through the engine.

use formguard::{
    Engine, FieldCollection, Observable, RuleSet, Target, ValidationError, ValidationResult, Value,
};

struct SignupForm {
    name: Observable<Value>,
    email: Observable<Value>,
    nickname: Observable<Value>,
}

impl SignupForm {
    fn new() -> Self {
        Self {
            name: Observable::new(Value::Null),
            email: Observable::new(Value::Null),
            nickname: Observable::new(Value::Null),
        }
    }
}

impl FieldCollection for SignupForm {
    fn members(&self) -> Vec<Observable<Value>> {
        vec![self.name.clone(), self.email.clone(), self.nickname.clone()]
    }
}

#[test]
fn test_required_field() {
    let engine = Engine::new();
    let form = SignupForm::new();
    engine.bind(&form.name, RuleSet::new().rule("required", true));

    assert_eq!(engine.is_valid(Target::collection(&form)), Ok(false));
    form.name.set(Value::from("asdf"));
    assert_eq!(engine.is_valid(Target::collection(&form)), Ok(true));

    let single = Observable::new(Value::Null);
    let field = engine.bind(&single, RuleSet::new().rule("required", true));
    assert_eq!(engine.is_valid(&field), Ok(false));
    single.set(Value::from("asdf"));
    assert_eq!(engine.is_valid(&field), Ok(true));
}

#[test]
fn test_sections_partition_fields() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("asdf"));
    let v2 = Observable::new(Value::Null);
    engine.bind(&v, RuleSet::new().rule("required", true).in_section("a"));
    engine.bind(&v2, RuleSet::new().rule("required", true).in_section("b"));

    assert_eq!(engine.is_valid([v.clone(), v2.clone()]), Ok(false));
    assert_eq!(engine.is_valid("a"), Ok(true));
    assert_eq!(engine.is_valid("b"), Ok(false));
}

#[test]
fn test_section_children() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("asdf"));
    let v2 = Observable::new(Value::Null);
    engine.bind(&v, RuleSet::new().rule("required", true).in_section("a"));
    engine.bind(&v2, RuleSet::new().rule("required", true).in_section("b"));
    engine.add_section_child("a", "b");

    assert_eq!(engine.is_valid("a"), Ok(false));
    v2.set(Value::from("asdf"));
    assert_eq!(engine.is_valid("a"), Ok(true));
}

#[test]
fn test_variable_validation() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("asdf"));
    let v2 = Observable::new(Value::Null);
    let validate_b = Observable::new(false);
    engine.bind(&v, RuleSet::new().rule("required", true).in_section("a"));
    let f2 = engine.bind(&v2, RuleSet::new().rule("required", true).in_section("b"));
    engine.add_section_child("a", "b");
    engine.add_variable_validation("b", &validate_b);

    assert_eq!(engine.is_valid("a"), Ok(true));
    assert!(!f2.has_error());

    validate_b.set(true);
    assert_eq!(engine.is_valid("a"), Ok(false));
    assert!(f2.has_error());

    // Turning the gate off clears the field without another validation pass.
    validate_b.set(false);
    assert!(!f2.has_error());
    assert!(!f2.is_active());
}

#[test]
fn test_static_gate() {
    let engine = Engine::new();
    let v = Observable::new(Value::Null);
    engine.bind(&v, RuleSet::new().rule("required", true).in_section("optional"));
    engine.add_variable_validation("optional", false);
    assert_eq!(engine.is_valid("optional"), Ok(true));
}

#[test]
fn test_extend_chaining_accumulates() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("asdf"));
    engine.bind(&v, RuleSet::new().rule("required", true));
    engine.bind(&v, RuleSet::new().rule("minLength", 5));

    assert_eq!(engine.is_valid(&v), Ok(false));
    assert_eq!(
        engine.field(&v).unwrap().error_message(),
        "Please enter at least 5 characters"
    );
}

#[test]
fn test_binding_twice_equals_union() {
    let chained = Engine::new();
    let once = Engine::new();
    for text in ["", "abc", "abcdef", "abcdefghijk"] {
        let a = Observable::new(Value::from(text));
        chained.bind(&a, RuleSet::new().rule("required", true));
        chained.bind(&a, RuleSet::new().rule("minLength", 4).rule("maxLength", 8));

        let b = Observable::new(Value::from(text));
        once.bind(
            &b,
            RuleSet::new()
                .rule("required", true)
                .rule("minLength", 4)
                .rule("maxLength", 8),
        );

        assert_eq!(chained.is_valid(&a), once.is_valid(&b), "value {text:?}");
        assert_eq!(
            chained.field(&a).unwrap().error_message(),
            once.field(&b).unwrap().error_message()
        );
    }
}

#[test]
fn test_section_validators_are_inherited() {
    let engine = Engine::new();
    let v = Observable::new(Value::Null);
    engine.bind(&v, RuleSet::new().rule("date", true).in_section("test"));
    engine.add_section_validators("test", RuleSet::new().rule("required", true));

    assert_eq!(engine.is_valid("test"), Ok(false));
    v.set(Value::from("01/01/2000"));
    assert_eq!(engine.is_valid("test"), Ok(true));
}

#[test]
fn test_section_rules_do_not_replace_field_rules() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("abcdef"));
    let field = engine.bind(&v, RuleSet::new().rule("maxLength", 3).in_section("s"));
    engine.add_section_validators(
        "s",
        RuleSet::new().rule("maxLength", 10).rule("required", true),
    );

    assert_eq!(engine.is_valid(&field), Ok(false));
    assert_eq!(engine.is_valid("s"), Ok(false));
    assert_eq!(field.error_message(), "Please enter no more than 3 characters");
    assert_eq!(engine.is_valid(&field), Ok(false));
    assert_eq!(field.rules().names(), vec!["maxLength"]);
    assert_eq!(field.rules().get("maxLength").unwrap().get(), Value::from(3));

    // The section's `required` only applies when validating through the section.
    v.set(Value::Null);
    assert_eq!(engine.is_valid(&field), Ok(true));
    assert_eq!(engine.is_valid("s"), Ok(false));
    assert_eq!(field.error_message(), "This field is required");
}

#[test]
fn test_dynamic_param_for_matches() {
    let engine = Engine::new();
    let password = Observable::new(Value::from("hunter22"));
    let confirm = Observable::new(Value::from("hunter22"));
    let field = engine.bind(&confirm, RuleSet::new().rule("matches", &password));

    assert_eq!(engine.is_valid(&field), Ok(true));
    password.set(Value::from("changed!"));
    assert_eq!(engine.is_valid(&field), Ok(false));
    assert_eq!(field.error_message(), "Values do not match");
}

#[test]
fn test_empty_targets_are_valid() {
    let engine = Engine::new();
    engine.add_section_child("empty", "also-empty");
    assert_eq!(engine.is_valid(Target::List(vec![])), Ok(true));
    assert_eq!(engine.is_valid("empty"), Ok(true));
    assert_eq!(engine.is_valid(Vec::<Observable<Value>>::new()), Ok(true));
}

#[test]
fn test_cycles_resolve_each_field_once() {
    let engine = Engine::new();
    let v = Observable::new(Value::Null);
    let v2 = Observable::new(Value::from("x"));
    engine.bind(&v, RuleSet::new().rule("required", true).in_section("a"));
    engine.bind(&v2, RuleSet::new().rule("required", true).in_section("b"));
    engine.add_section_child("a", "b");
    engine.add_section_child("b", "a");

    assert_eq!(engine.resolve("a").unwrap().len(), 2);
    assert_eq!(engine.is_valid("b"), Ok(false));
    v.set(Value::from("y"));
    assert_eq!(engine.is_valid("b"), Ok(true));
}

#[test]
fn test_validate_reports_failing_fields() {
    let engine = Engine::new();
    let form = SignupForm::new();
    form.email.set(Value::from("nope"));
    engine.bind(&form.name, RuleSet::new().rule("required", true).in_section("profile"));
    engine.bind(&form.email, RuleSet::new().rule("email", true).in_section("contact"));
    engine.bind(&form.nickname, RuleSet::new().rule("maxLength", 10));

    let result = engine.validate(Target::collection(&form)).unwrap();
    assert!(result.is_invalid());
    assert_eq!(
        result.messages(),
        vec!["This field is required", "Please enter a valid email address"]
    );
    assert_eq!(result.first_error().unwrap().field, form.name.id());
    assert_eq!(result.in_section("contact").count(), 1);

    form.name.set(Value::from("Ada"));
    form.email.set(Value::from("ada@example.com"));
    assert_eq!(engine.validate(Target::collection(&form)), Ok(ValidationResult::Valid));
}

#[test]
fn test_deactivate_clears_state() {
    let engine = Engine::new();
    let v = Observable::new(Value::Null);
    let field = engine.bind(&v, RuleSet::new().rule("required", true).in_section("a"));

    assert_eq!(engine.is_valid("a"), Ok(false));
    engine.deactivate("a").unwrap();
    assert!(!field.has_error());
    assert_eq!(field.error_message(), "");

    // Changes are no longer observed.
    v.set(Value::from(""));
    assert!(!field.has_error());
}

#[test]
fn test_json_rule_sets() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("abcdef"));
    let field = engine
        .bind_json(&v, r#"{"required": true, "maxLength": 3, "section": "json"}"#)
        .unwrap();
    assert_eq!(field.sections(), vec!["json"]);
    assert_eq!(engine.is_valid("json"), Ok(false));

    assert!(matches!(
        engine.bind_json(&v, "not json"),
        Err(ValidationError::InvalidRuleSet(_))
    ));
}

#[test]
fn test_rule_fault_propagates() {
    let engine = Engine::new();
    let v = Observable::new(Value::from("x"));
    let field = engine.bind(&v, RuleSet::new().rule("maxLength", "many"));

    let err = engine.is_valid(&field).unwrap_err();
    assert!(matches!(err, ValidationError::Rule { ref rule, .. } if rule == "maxLength"));
    assert!(field.has_error());
}

#[test]
fn test_reset_forgets_bindings() {
    let engine = Engine::new();
    let v = Observable::new(Value::Null);
    engine.bind(&v, RuleSet::new().rule("required", true).in_section("a"));
    assert_eq!(engine.is_valid("a"), Ok(false));

    engine.reset();
    assert_eq!(engine.is_valid("a"), Ok(true));
    assert_eq!(engine.is_valid(&v), Ok(true));
    assert!(engine.sections().is_empty());
}
