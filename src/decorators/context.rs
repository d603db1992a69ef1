//! The context object handed to every decorator of one element.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::element::{ElementDescriptor, ElementKey, ElementKind};
use crate::error::ErrorKind;
use crate::interpreter::Interpreter;
use crate::types::JsValue;

pub(crate) struct DecorationContext {
    pub object: JsValue,
    extra_initializers: Rc<RefCell<Vec<JsValue>>>,
    finished: Rc<Cell<bool>>,
}

impl DecorationContext {
    /// `{ kind, name, static, private, access, addInitializer }`, shared by
    /// all decorators on the element.
    pub fn for_element(interp: &mut Interpreter, desc: &ElementDescriptor) -> Self {
        let extra_initializers = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(Cell::new(false));
        let access = access_object(interp, desc);
        let add_initializer = add_initializer_function(interp, &extra_initializers, &finished);
        let object = interp.object_from_entries(&[
            ("kind", JsValue::from(desc.kind.as_str())),
            ("name", JsValue::from(desc.context_name().as_str())),
            ("static", JsValue::Boolean(desc.is_static())),
            ("private", JsValue::Boolean(desc.key.is_private())),
            ("access", access),
            ("addInitializer", add_initializer),
        ]);
        Self {
            object,
            extra_initializers,
            finished,
        }
    }

    /// `{ kind: "class", name }`.
    pub fn for_class(interp: &mut Interpreter, name: &str) -> Self {
        let object = interp.object_from_entries(&[
            ("kind", JsValue::from("class")),
            ("name", JsValue::from(name)),
        ]);
        Self {
            object,
            extra_initializers: Rc::new(RefCell::new(Vec::new())),
            finished: Rc::new(Cell::new(false)),
        }
    }

    /// Close `addInitializer` and hand back what it collected, in call order.
    pub fn finish(self) -> Vec<JsValue> {
        self.finished.set(true);
        self.extra_initializers.take()
    }
}

fn add_initializer_function(
    interp: &mut Interpreter,
    list: &Rc<RefCell<Vec<JsValue>>>,
    finished: &Rc<Cell<bool>>,
) -> JsValue {
    let list = list.clone();
    let finished = finished.clone();
    interp.create_native_function("addInitializer", 1, move |interp, _this, args| {
        if finished.get() {
            return Err(interp.create_engine_error(
                ErrorKind::InitializerAfterDecoration,
                "Cannot add an initializer after decoration has finished",
            ));
        }
        let initializer = args.first().cloned().unwrap_or(JsValue::Undefined);
        if !interp.is_callable(&initializer) {
            return Err(interp.create_engine_error(
                ErrorKind::InvalidDecoratorTarget,
                "An initializer must be a function",
            ));
        }
        list.borrow_mut().push(initializer);
        Ok(JsValue::Undefined)
    })
}

fn access_object(interp: &mut Interpreter, desc: &ElementDescriptor) -> JsValue {
    let (readable, writable) = match desc.kind {
        ElementKind::Method | ElementKind::Getter => (true, false),
        ElementKind::Setter => (false, true),
        ElementKind::Field | ElementKind::Accessor => (true, true),
    };
    let mut entries = Vec::with_capacity(2);
    if readable {
        let key = desc.key.clone();
        let get = interp.create_native_function("get", 1, move |interp, _this, args| {
            let receiver = args.first().cloned().unwrap_or(JsValue::Undefined);
            read_element(interp, &key, &receiver)
        });
        entries.push(("get", get));
    }
    if writable {
        let key = desc.key.clone();
        let set = interp.create_native_function("set", 2, move |interp, _this, args| {
            let receiver = args.first().cloned().unwrap_or(JsValue::Undefined);
            let value = args.get(1).cloned().unwrap_or(JsValue::Undefined);
            write_element(interp, &key, &receiver, value.clone())?;
            Ok(value)
        });
        entries.push(("set", set));
    }
    interp.object_from_entries(&entries)
}

fn read_element(interp: &mut Interpreter, key: &ElementKey, receiver: &JsValue) -> Result<JsValue, JsValue> {
    match key {
        ElementKey::String(s) => interp.get(receiver, s),
        ElementKey::Symbol(sym) => interp.get(receiver, sym),
        ElementKey::Private(name) => interp.private_get(receiver, name),
    }
}

fn write_element(
    interp: &mut Interpreter,
    key: &ElementKey,
    receiver: &JsValue,
    value: JsValue,
) -> Result<(), JsValue> {
    match key {
        ElementKey::String(s) => interp.set(receiver, s, value),
        ElementKey::Symbol(sym) => interp.set(receiver, sym, value),
        ElementKey::Private(name) => interp.private_set(receiver, name, value),
    }
}
