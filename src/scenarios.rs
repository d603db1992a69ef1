//! Named end-to-end runs of the decoration engine, each producing a short
//! transcript. Used by the `class-decorators` binary.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::decorators::{ClassDefinition, ClassElement, Initializer};
use crate::error::{DecorationError, ErrorKind};
use crate::interpreter::{Interpreter, to_number};
use crate::types::JsValue;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unknown scenario '{0}' (try --list)")]
    Unknown(String),

    #[error(transparent)]
    Definition(#[from] DecorationError),

    #[error("uncaught exception: {0}")]
    Uncaught(String),

    #[error("expectation failed: {0}")]
    Expectation(String),
}

pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: fn(&mut Session) -> Result<(), ScenarioError>,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "stacked-methods",
        description: "two wrapping decorators on one method",
        run: stacked_methods,
    },
    Scenario {
        name: "accessor-multipliers",
        description: "an accessor decorator replacing get, set and init",
        run: accessor_multipliers,
    },
    Scenario {
        name: "initializers",
        description: "when static and instance extra initializers run",
        run: initializers,
    },
    Scenario {
        name: "live-access",
        description: "a captured public access surface after deletion",
        run: live_access,
    },
    Scenario {
        name: "private-spelling",
        description: "private access against a same-spelled public property",
        run: private_spelling,
    },
    Scenario {
        name: "class-extension",
        description: "a class decorator returning a subclass",
        run: class_extension,
    },
    Scenario {
        name: "class-replacement",
        description: "a class decorator returning an unrelated constructor",
        run: class_replacement,
    },
];

pub fn find(name: &str) -> Result<&'static Scenario, ScenarioError> {
    SCENARIOS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| ScenarioError::Unknown(name.to_string()))
}

impl Scenario {
    /// Run on a fresh interpreter and return the transcript.
    pub fn run(&self) -> Result<Vec<String>, ScenarioError> {
        let mut session = Session {
            interp: Interpreter::new(),
            lines: Rc::new(RefCell::new(Vec::new())),
        };
        (self.run)(&mut session)?;
        Ok(session.lines.take())
    }
}

type Lines = Rc<RefCell<Vec<String>>>;

/// Turns a thrown value into a scenario failure.
trait Uncaught<T> {
    fn uncaught(self, interp: &Interpreter) -> Result<T, ScenarioError>;
}

impl<T> Uncaught<T> for Result<T, JsValue> {
    fn uncaught(self, interp: &Interpreter) -> Result<T, ScenarioError> {
        self.map_err(|thrown| ScenarioError::Uncaught(interp.format_value(&thrown)))
    }
}

struct Session {
    interp: Interpreter,
    lines: Lines,
}

impl Session {
    fn say(&self, line: impl Into<String>) {
        self.lines.borrow_mut().push(line.into());
    }

    fn check(&self, holds: bool, what: &str) -> Result<(), ScenarioError> {
        if holds {
            Ok(())
        } else {
            Err(ScenarioError::Expectation(what.to_string()))
        }
    }

    fn show(&self, value: &JsValue) -> String {
        self.interp.format_value(value)
    }

    /// A decorator storing `context.access` into `slot`.
    fn capture_access(&mut self, slot: &Rc<RefCell<JsValue>>) -> JsValue {
        let slot = slot.clone();
        self.interp
            .create_native_function("captureAccess", 2, move |interp, _, args| {
                let ctx = args.get(1).cloned().unwrap_or(JsValue::Undefined);
                *slot.borrow_mut() = interp.get(&ctx, "access")?;
                Ok(JsValue::Undefined)
            })
    }

    fn access_get(&mut self, access: &JsValue, receiver: &JsValue) -> Result<JsValue, JsValue> {
        let get = self.interp.get(access, "get")?;
        self.interp
            .call(&get, &JsValue::Undefined, &[receiver.clone()])
    }
}

fn stacked_methods(s: &mut Session) -> Result<(), ScenarioError> {
    let lines = s.lines.clone();
    let greet = s.interp.create_native_function("greet", 0, move |_, _, _| {
        lines.borrow_mut().push("  greet body".to_string());
        Ok(JsValue::from("hello"))
    });
    let mut element = ClassElement::method("greet", greet);
    for label in ["@logged", "@timed"] {
        let lines = s.lines.clone();
        let wrap = s.interp.create_native_function(label, 2, move |interp, _, args| {
            let original = args.first().cloned().unwrap_or(JsValue::Undefined);
            let lines = lines.clone();
            lines.borrow_mut().push(format!("applying {label}"));
            Ok(interp.create_native_function("wrapper", 0, move |interp, this, args| {
                lines.borrow_mut().push(format!("  enter {label}"));
                interp.call(&original, this, args)
            }))
        });
        element = element.decorate(wrap);
    }
    let defined = s
        .interp
        .define_class(ClassDefinition::new("Greeter").element(element))?;
    let instance = s.interp.construct(defined.constructor(), &[]).uncaught(&s.interp)?;
    let method = s.interp.get(&instance, "greet").uncaught(&s.interp)?;
    let result = s.interp.call(&method, &instance, &[]).uncaught(&s.interp)?;
    let name = s.interp.function_name(&method).unwrap_or_default();
    s.say(format!("result: {}", s.show(&result)));
    s.say(format!("greet.name: {name}"));
    s.check(name == "greet", "replacement keeps the method name")
}

fn accessor_multipliers(s: &mut Session) -> Result<(), ScenarioError> {
    let multipliers = s
        .interp
        .create_native_function("multipliers", 2, |interp, _, args| {
            let target = args.first().cloned().unwrap_or(JsValue::Undefined);
            let inner_get = interp.get(&target, "get")?;
            let inner_set = interp.get(&target, "set")?;
            let get = interp.create_native_function("get", 0, move |interp, this, _| {
                let v = interp.call(&inner_get, this, &[])?;
                Ok(JsValue::Number(to_number(&v) * 2.0))
            });
            let set = interp.create_native_function("set", 1, move |interp, this, args| {
                let v = args.first().map(to_number).unwrap_or(f64::NAN);
                interp.call(&inner_set, this, &[JsValue::Number(v * 4.0)])
            });
            let init = interp.create_native_function("init", 1, |_, _, args| {
                let v = args.first().map(to_number).unwrap_or(f64::NAN);
                Ok(JsValue::Number(v * 9.0))
            });
            Ok(interp.object_from_entries(&[("get", get), ("set", set), ("init", init)]))
        });
    let defined = s.interp.define_class(
        ClassDefinition::new("Meter").element(
            ClassElement::accessor("reading", Some(Initializer::value(JsValue::Number(1.0))))
                .decorate(multipliers),
        ),
    )?;
    let meter = s.interp.construct(defined.constructor(), &[]).uncaught(&s.interp)?;
    let first = s.interp.get(&meter, "reading").uncaught(&s.interp)?;
    s.say(format!("initial read: {}", s.show(&first)));
    s.interp.set(&meter, "reading", JsValue::Number(5.0)).uncaught(&s.interp)?;
    let second = s.interp.get(&meter, "reading").uncaught(&s.interp)?;
    s.say(format!("after set(5): {}", s.show(&second)));
    s.check(
        first.as_number() == Some(18.0) && second.as_number() == Some(40.0),
        "init x9 then get x2 gives 18; set x4 then get x2 gives 40",
    )
}

fn initializers(s: &mut Session) -> Result<(), ScenarioError> {
    let register = |s: &mut Session, label: &'static str| {
        let lines = s.lines.clone();
        s.interp
            .create_native_function("register", 2, move |interp, _, args| {
                let ctx = args.get(1).cloned().unwrap_or(JsValue::Undefined);
                let hook = interp.get(&ctx, "addInitializer")?;
                let lines = lines.clone();
                let init = interp.create_native_function("init", 0, move |_, _, _| {
                    lines.borrow_mut().push(format!("{label} initializer"));
                    Ok(JsValue::Undefined)
                });
                interp.call(&hook, &JsValue::Undefined, &[init])?;
                Ok(JsValue::Undefined)
            })
    };
    let on_static = register(s, "static");
    let on_instance = register(s, "instance");
    let lines = s.lines.clone();
    let class_decorator = s.interp.create_native_function("sealed", 2, move |_, _, _| {
        lines.borrow_mut().push("class decorator".to_string());
        Ok(JsValue::Undefined)
    });
    let noop = s
        .interp
        .create_native_function("", 0, |_, _, _| Ok(JsValue::Undefined));
    let lines = s.lines.clone();
    let def = ClassDefinition::new("Service")
        .decorate(class_decorator)
        .constructor(move |_, _, _| {
            lines.borrow_mut().push("constructor body".to_string());
            Ok(JsValue::Undefined)
        })
        .element(ClassElement::method("start", noop.clone()).decorate(on_instance))
        .element(ClassElement::method("configure", noop).make_static().decorate(on_static));

    s.say("-- define");
    let defined = s.interp.define_class(def)?;
    s.say("-- construct");
    s.interp.construct(defined.constructor(), &[]).uncaught(&s.interp)?;
    let lines = s.lines.borrow().clone();
    s.check(
        lines
            == [
                "-- define",
                "static initializer",
                "class decorator",
                "-- construct",
                "instance initializer",
                "constructor body",
            ],
        "static initializers run at definition, instance ones before the body",
    )
}

fn live_access(s: &mut Session) -> Result<(), ScenarioError> {
    let slot = Rc::new(RefCell::new(JsValue::Undefined));
    let capture = s.capture_access(&slot);
    let defined = s.interp.define_class(
        ClassDefinition::new("Point").element(
            ClassElement::field("x", Some(Initializer::value(JsValue::Number(1.0)))).decorate(capture),
        ),
    )?;
    let access = slot.borrow().clone();
    let point = s.interp.construct(defined.constructor(), &[]).uncaught(&s.interp)?;

    let before = s.access_get(&access, &point).uncaught(&s.interp)?;
    s.say(format!("access.get(p) = {}", s.show(&before)));
    s.interp.delete_property(&point, "x").uncaught(&s.interp)?;
    let after = s.access_get(&access, &point).uncaught(&s.interp)?;
    s.say(format!("after delete p.x: access.get(p) = {}", s.show(&after)));
    s.check(after.is_undefined(), "public access reads the live property")
}

fn private_spelling(s: &mut Session) -> Result<(), ScenarioError> {
    let slot = Rc::new(RefCell::new(JsValue::Undefined));
    let capture = s.capture_access(&slot);
    let x = s.interp.new_private_name("#x");
    let defined = s.interp.define_class(
        ClassDefinition::new("Vault").element(
            ClassElement::field(x, Some(Initializer::value(JsValue::Number(1.0)))).decorate(capture),
        ),
    )?;
    let access = slot.borrow().clone();
    let vault = s.interp.construct(defined.constructor(), &[]).uncaught(&s.interp)?;
    let own = s.access_get(&access, &vault).uncaught(&s.interp)?;
    s.say(format!("access.get(vault) = {}", s.show(&own)));

    let impostor = s
        .interp
        .object_from_entries(&[("#x", JsValue::Number(2.0))]);
    match s.access_get(&access, &impostor) {
        Ok(v) => Err(ScenarioError::Expectation(format!(
            "impostor read succeeded with {}",
            s.show(&v)
        ))),
        Err(thrown) => {
            s.say(format!("access.get({{ '#x': 2 }}) threw {}", s.show(&thrown)));
            s.check(
                s.interp.error_kind(&thrown) == Some(ErrorKind::PrivateAccessViolation),
                "same spelling does not grant private access",
            )
        }
    }
}

/// Defines `Base` with a private method observed by an access-capturing
/// decorator, under the given class decorator. Returns the final binding
/// and the captured access surface.
fn private_method_class(
    s: &mut Session,
    class_decorator: JsValue,
) -> Result<(JsValue, JsValue), ScenarioError> {
    let slot = Rc::new(RefCell::new(JsValue::Undefined));
    let capture = s.capture_access(&slot);
    let secret = s.interp.new_private_name("#secret");
    let method = s
        .interp
        .create_native_function("#secret", 0, |_, _, _| Ok(JsValue::Number(42.0)));
    let defined = s.interp.define_class(
        ClassDefinition::new("Base")
            .decorate(class_decorator)
            .element(ClassElement::method(secret, method).decorate(capture)),
    )?;
    s.say(format!("binding: {}", s.show(defined.constructor())));
    let access = slot.borrow().clone();
    Ok((defined.constructor().clone(), access))
}

fn class_extension(s: &mut Session) -> Result<(), ScenarioError> {
    let extend = s.interp.create_native_function("extend", 2, |interp, _, args| {
        let base = args.first().cloned().unwrap_or(JsValue::Undefined);
        let sub = interp
            .define_class(ClassDefinition::new("Extended").extends(base))
            .map_err(DecorationError::into_value)?;
        Ok(sub.constructor().clone())
    });
    let (binding, access) = private_method_class(s, extend)?;
    let instance = s.interp.construct(&binding, &[]).uncaught(&s.interp)?;
    let method = s.access_get(&access, &instance).uncaught(&s.interp)?;
    let value = s.interp.call(&method, &instance, &[]).uncaught(&s.interp)?;
    s.say(format!("access.get(new Extended()) called = {}", s.show(&value)));
    s.check(
        value.as_number() == Some(42.0),
        "subclass instances carry the original brand",
    )
}

fn class_replacement(s: &mut Session) -> Result<(), ScenarioError> {
    let replace = s.interp.create_native_function("replace", 2, |interp, _, _| {
        Ok(interp.create_native_constructor("Impostor", 0, |_, _, _| Ok(JsValue::Undefined)))
    });
    let (binding, access) = private_method_class(s, replace)?;
    let instance = s.interp.construct(&binding, &[]).uncaught(&s.interp)?;
    match s.access_get(&access, &instance) {
        Ok(_) => Err(ScenarioError::Expectation(
            "replacement instances must not reach private methods".to_string(),
        )),
        Err(thrown) => {
            s.say(format!("access.get(new Impostor()) threw {}", s.show(&thrown)));
            s.check(
                s.interp.error_kind(&thrown) == Some(ErrorKind::PrivateAccessViolation),
                "replacement loses the brand",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_passes() {
        for scenario in SCENARIOS {
            let transcript = scenario.run();
            assert!(transcript.is_ok(), "{}: {:?}", scenario.name, transcript.err());
        }
    }

    #[test]
    fn stacked_methods_transcript() {
        let lines = find("stacked-methods").unwrap().run().unwrap();
        assert_eq!(
            lines,
            vec![
                "applying @timed",
                "applying @logged",
                "  enter @logged",
                "  enter @timed",
                "  greet body",
                "result: \"hello\"",
                "greet.name: greet",
            ]
        );
    }

    #[test]
    fn accessor_transcript() {
        let lines = find("accessor-multipliers").unwrap().run().unwrap();
        assert_eq!(lines, vec!["initial read: 18", "after set(5): 40"]);
    }

    #[test]
    fn unknown_scenario_is_an_error() {
        let err = find("nope").err().unwrap();
        assert_eq!(err.to_string(), "unknown scenario 'nope' (try --list)");
    }
}
