use tracing::{debug, trace};

use super::context::DecorationContext;
use crate::error::ErrorKind;
use crate::interpreter::{Interpreter, same_value};
use crate::types::JsValue;

/// The outcome of a successful class definition.
#[derive(Debug, Clone)]
pub struct DefinedClass {
    pub(crate) constructor: JsValue,
    pub(crate) original: JsValue,
}

impl DefinedClass {
    /// The value the class name is bound to, after class decorators.
    pub fn constructor(&self) -> &JsValue {
        &self.constructor
    }

    /// The constructor built from the class body, before class decorators.
    /// Its construction path is the only one that installs the class brand.
    pub fn original(&self) -> &JsValue {
        &self.original
    }

    pub fn is_replaced(&self) -> bool {
        !same_value(&self.constructor, &self.original)
    }
}

/// Apply class decorators in declaration order; a function result becomes
/// the new binding and is what the next decorator sees.
pub(crate) fn apply_class_decorators(
    interp: &mut Interpreter,
    name: &str,
    decorators: &[JsValue],
    constructor: JsValue,
) -> Result<JsValue, JsValue> {
    let mut binding = constructor;
    for decorator in decorators {
        trace!(class = %name, "applying class decorator");
        if !interp.is_callable(decorator) {
            return Err(interp.create_engine_error(
                ErrorKind::InvalidDecoratorTarget,
                &format!("Decorator applied to class '{name}' is not a function"),
            ));
        }
        let ctx = DecorationContext::for_class(interp, name);
        let result = interp.call(decorator, &JsValue::Undefined, &[binding.clone(), ctx.object.clone()])?;
        if result.is_undefined() {
            continue;
        }
        if !interp.is_callable(&result) {
            return Err(interp.create_engine_error(
                ErrorKind::InvalidDecoratorResult,
                "class decorators must return a function or undefined",
            ));
        }
        debug!(
            class = %name,
            replacement = %interp.format_value(&result),
            "class decorator replaced the binding"
        );
        binding = result;
    }
    Ok(binding)
}
