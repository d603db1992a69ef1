//! Applying an element's decorators and folding their results back into
//! the element.

use tracing::trace;

use super::context::DecorationContext;
use super::element::{ElementDescriptor, ElementKey, ElementKind, ElementOriginal, Initializer, Placement};
use crate::error::ErrorKind;
use crate::interpreter::{Interpreter, PrivateName};
use crate::types::JsValue;

/// What one decorator asked for.
pub(crate) enum DecorationResult {
    Unchanged,
    Replaced(JsValue),
    Initializer(JsValue),
    Accessor {
        get: Option<JsValue>,
        set: Option<JsValue>,
        init: Option<JsValue>,
    },
}

/// The element after all of its decorators ran.
pub(crate) enum DecoratedValue {
    Function(JsValue),
    Field {
        init: Option<Initializer>,
        transforms: Vec<JsValue>,
    },
    Accessor {
        get: JsValue,
        set: JsValue,
        storage: PrivateName,
        init: Option<Initializer>,
        transforms: Vec<JsValue>,
    },
}

impl From<ElementOriginal> for DecoratedValue {
    fn from(original: ElementOriginal) -> Self {
        match original {
            ElementOriginal::Function(f) => DecoratedValue::Function(f),
            ElementOriginal::Field(init) => DecoratedValue::Field {
                init,
                transforms: Vec::new(),
            },
            ElementOriginal::Accessor {
                get,
                set,
                storage,
                init,
            } => DecoratedValue::Accessor {
                get,
                set,
                storage,
                init,
                transforms: Vec::new(),
            },
        }
    }
}

pub(crate) struct DecoratedElement {
    pub kind: ElementKind,
    pub placement: Placement,
    pub key: ElementKey,
    pub value: DecoratedValue,
    pub extra_initializers: Vec<JsValue>,
}

/// Run every decorator of `desc`, nearest to the declaration first, each
/// one seeing the output of the previous.
pub(crate) fn decorate_element(
    interp: &mut Interpreter,
    desc: ElementDescriptor,
) -> Result<DecoratedElement, JsValue> {
    let ctx = DecorationContext::for_element(interp, &desc);
    let name = desc.context_name();
    let mut value = DecoratedValue::from(desc.original);

    for decorator in desc.decorators.iter().rev() {
        trace!(kind = %desc.kind, name = %name, "applying decorator");
        let input = match &value {
            DecoratedValue::Function(f) => f.clone(),
            DecoratedValue::Field { .. } => JsValue::Undefined,
            DecoratedValue::Accessor { get, set, .. } => {
                interp.object_from_entries(&[("get", get.clone()), ("set", set.clone())])
            }
        };
        let result = apply_decorator(interp, desc.kind, &name, decorator, input, &ctx.object)?;
        integrate(interp, &mut value, result, &name);
    }

    Ok(DecoratedElement {
        kind: desc.kind,
        placement: desc.placement,
        key: desc.key,
        value,
        extra_initializers: ctx.finish(),
    })
}

fn apply_decorator(
    interp: &mut Interpreter,
    kind: ElementKind,
    name: &str,
    decorator: &JsValue,
    input: JsValue,
    ctx: &JsValue,
) -> Result<DecorationResult, JsValue> {
    if !interp.is_callable(decorator) {
        return Err(interp.create_engine_error(
            ErrorKind::InvalidDecoratorTarget,
            &format!("Decorator applied to {kind} '{name}' is not a function"),
        ));
    }
    let result = interp.call(decorator, &JsValue::Undefined, &[input, ctx.clone()])?;
    validate_result(interp, kind, result)
}

/// Check a decorator's return value against what its element kind allows.
pub(crate) fn validate_result(
    interp: &mut Interpreter,
    kind: ElementKind,
    result: JsValue,
) -> Result<DecorationResult, JsValue> {
    if result.is_undefined() {
        return Ok(DecorationResult::Unchanged);
    }
    match kind {
        ElementKind::Method | ElementKind::Getter | ElementKind::Setter => {
            if interp.is_callable(&result) {
                Ok(DecorationResult::Replaced(result))
            } else {
                Err(invalid_result(interp, kind, "a function or undefined"))
            }
        }
        ElementKind::Field => {
            if interp.is_callable(&result) {
                Ok(DecorationResult::Initializer(result))
            } else {
                Err(invalid_result(interp, kind, "a function or undefined"))
            }
        }
        ElementKind::Accessor => {
            if !result.is_object() {
                return Err(invalid_result(interp, kind, "an object or undefined"));
            }
            let get = accessor_member(interp, &result, "get")?;
            let set = accessor_member(interp, &result, "set")?;
            let init = accessor_member(interp, &result, "init")?;
            Ok(DecorationResult::Accessor { get, set, init })
        }
    }
}

fn accessor_member(interp: &mut Interpreter, result: &JsValue, member: &str) -> Result<Option<JsValue>, JsValue> {
    let value = interp.get(result, member)?;
    if value.is_undefined() {
        Ok(None)
    } else if interp.is_callable(&value) {
        Ok(Some(value))
    } else {
        Err(interp.create_engine_error(
            ErrorKind::InvalidDecoratorResult,
            &format!("accessor decorator result '{member}' must be a function or undefined"),
        ))
    }
}

fn invalid_result(interp: &mut Interpreter, kind: ElementKind, expected: &str) -> JsValue {
    interp.create_engine_error(
        ErrorKind::InvalidDecoratorResult,
        &format!("{kind} decorators must return {expected}"),
    )
}

fn integrate(interp: &mut Interpreter, value: &mut DecoratedValue, result: DecorationResult, name: &str) {
    match (value, result) {
        (_, DecorationResult::Unchanged) => {}
        (DecoratedValue::Function(current), DecorationResult::Replaced(f)) => {
            interp.set_function_name(&f, name);
            *current = f;
        }
        (DecoratedValue::Field { transforms, .. }, DecorationResult::Initializer(f)) => {
            transforms.push(f);
        }
        (
            DecoratedValue::Accessor {
                get: current_get,
                set: current_set,
                transforms,
                ..
            },
            DecorationResult::Accessor { get, set, init },
        ) => {
            if let Some(get) = get {
                *current_get = get;
            }
            if let Some(set) = set {
                *current_set = set;
            }
            if let Some(init) = init {
                transforms.push(init);
            }
        }
        // validate_result only yields results matching the element kind.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_is_always_unchanged() {
        let mut interp = Interpreter::new();
        for kind in [
            ElementKind::Method,
            ElementKind::Getter,
            ElementKind::Setter,
            ElementKind::Field,
            ElementKind::Accessor,
        ] {
            let result = validate_result(&mut interp, kind, JsValue::Undefined).unwrap();
            assert!(matches!(result, DecorationResult::Unchanged));
        }
    }

    #[test]
    fn wrong_shapes_name_the_kind() {
        let mut interp = Interpreter::new();
        let err = validate_result(&mut interp, ElementKind::Getter, JsValue::Number(1.0))
            .err()
            .unwrap();
        assert_eq!(interp.error_kind(&err), Some(ErrorKind::InvalidDecoratorResult));
        assert_eq!(
            interp.format_value(&err),
            "TypeError: getter decorators must return a function or undefined"
        );

        let obj = interp.new_object();
        let err = validate_result(&mut interp, ElementKind::Field, obj).err().unwrap();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: field decorators must return a function or undefined"
        );

        let err = validate_result(&mut interp, ElementKind::Accessor, JsValue::from("nope"))
            .err()
            .unwrap();
        assert_eq!(interp.error_kind(&err), Some(ErrorKind::InvalidDecoratorResult));
        assert_eq!(
            interp.format_value(&err),
            "TypeError: accessor decorators must return an object or undefined"
        );
    }

    #[test]
    fn function_without_accessor_members_changes_nothing() {
        let mut interp = Interpreter::new();
        let f = interp.create_native_function("f", 0, |_, _, _| Ok(JsValue::Undefined));
        let DecorationResult::Accessor { get, set, init } =
            validate_result(&mut interp, ElementKind::Accessor, f).unwrap()
        else {
            panic!("expected accessor result");
        };
        assert!(get.is_none());
        assert!(set.is_none());
        assert!(init.is_none());
    }

    #[test]
    fn accessor_members_must_be_callable() {
        let mut interp = Interpreter::new();
        let result = interp.object_from_entries(&[("init", JsValue::from("nope"))]);
        let err = validate_result(&mut interp, ElementKind::Accessor, result)
            .err()
            .unwrap();
        assert_eq!(interp.error_kind(&err), Some(ErrorKind::InvalidDecoratorResult));

        let get = interp.create_native_function("g", 0, |_, _, _| Ok(JsValue::Undefined));
        let result = interp.object_from_entries(&[("get", get)]);
        let DecorationResult::Accessor { get, set, init } =
            validate_result(&mut interp, ElementKind::Accessor, result).unwrap()
        else {
            panic!("expected accessor result");
        };
        assert!(get.is_some());
        assert!(set.is_none());
        assert!(init.is_none());
    }

    #[test]
    fn replaced_methods_are_renamed() {
        let mut interp = Interpreter::new();
        let original = interp.create_native_function("size", 0, |_, _, _| Ok(JsValue::Undefined));
        let replacement = interp.create_native_function("wrapper", 0, |_, _, _| Ok(JsValue::Undefined));
        let mut value = DecoratedValue::Function(original);
        integrate(
            &mut interp,
            &mut value,
            DecorationResult::Replaced(replacement.clone()),
            "get size",
        );
        assert_eq!(interp.function_name(&replacement).as_deref(), Some("get size"));
        assert!(matches!(value, DecoratedValue::Function(_)));
    }
}
