use std::time::Duration;

use formguard::prelude::*;
use simplelog::{Config, LevelFilter, SimpleLogger};

struct Signup {
    username: Observable<Value>,
    email: Observable<Value>,
    password: Observable<Value>,
    confirm: Observable<Value>,
    birthdate: Observable<Value>,
    company: Observable<Value>,
    is_business: Observable<bool>,
}

impl FieldCollection for Signup {
    fn members(&self) -> Vec<Observable<Value>> {
        vec![
            self.username.clone(),
            self.email.clone(),
            self.password.clone(),
            self.confirm.clone(),
            self.birthdate.clone(),
            self.company.clone(),
        ]
    }
}

fn report(label: &str, result: &ValidationResult) {
    if result.is_valid() {
        println!("{label}: valid");
        return;
    }
    println!("{label}: invalid");
    for error in result.errors() {
        println!(
            "  field {} [{}]: {}",
            error.field,
            error.section().unwrap_or("-"),
            error.message
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ValidationError> {
    SimpleLogger::init(LevelFilter::Debug, Config::default())
        .expect("Failed to initialize logger");

    let engine = Engine::new();
    engine.register(
        "available",
        ValidatorDefinition::new_async(
            |_param, value: Value| async move {
                // Pretend to ask a server.
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, RuleFault>(value.as_text().as_deref() != Some("admin"))
            },
            "That username is taken",
        ),
    );

    let form = Signup {
        username: Observable::new(Value::from("admin")),
        email: Observable::new(Value::from("ada@example")),
        password: Observable::new(Value::from("correct horse")),
        confirm: Observable::new(Value::from("correct hose")),
        birthdate: Observable::new(Value::from("12/10/1815")),
        company: Observable::new(Value::Null),
        is_business: Observable::new(false),
    };

    engine.bind(
        &form.username,
        RuleSet::new()
            .rule("required", true)
            .rule("maxLength", 16)
            .rule("available", true)
            .in_section("account"),
    );
    engine.bind(&form.email, RuleSet::new().rule("email", true).in_section("account"));
    engine.bind(&form.password, RuleSet::new().rule("minLength", 8).in_section("account"));
    engine.bind(
        &form.confirm,
        RuleSet::new().rule("matches", &form.password).in_section("account"),
    );
    engine.bind_json(&form.birthdate, r#"{"birthdate": true, "section": "profile"}"#)?;
    engine.bind(&form.company, RuleSet::new().in_section("business"));

    engine.add_section_validators("account", RuleSet::new().rule("required", true));
    engine.add_section_child("profile", "business");
    engine.add_section_validators("business", RuleSet::new().rule("required", true));
    engine.add_variable_validation("business", &form.is_business);

    report("account", &engine.validate("account")?);
    report("profile", &engine.validate("profile")?);

    let ok = engine.is_valid_async(Target::collection(&form)).await?;
    println!("whole form (async): {ok}");

    form.username.set(Value::from("ada"));
    form.email.set(Value::from("ada@example.com"));
    form.confirm.set(Value::from("correct horse"));
    form.birthdate.set(Value::from("12/10/1995"));
    form.is_business.set(true);

    report("profile", &engine.validate("profile")?);
    form.company.set(Value::from("Analytical Engines Ltd"));

    let ok = engine.is_valid_async(Target::list(["account", "profile"])).await?;
    println!("whole form (async): {ok}");

    engine.deactivate(Target::collection(&form))?;
    Ok(())
}
