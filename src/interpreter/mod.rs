use crate::error::ErrorKind;
use crate::types::{JsObject, JsString, JsSymbol, JsValue};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

mod types;
pub use types::*;

mod helpers;
pub use helpers::*;
mod call;
mod private;
mod property;

pub struct Interpreter {
    objects: Vec<Option<Rc<RefCell<JsObjectData>>>>,
    object_prototype: Option<Rc<RefCell<JsObjectData>>>,
    function_prototype: Option<Rc<RefCell<JsObjectData>>>,
    error_prototypes: FxHashMap<String, Rc<RefCell<JsObjectData>>>,
    private_methods: FxHashMap<PrivateName, BrandLink>,
    next_symbol_id: u64,
    next_private_id: u64,
    next_brand_id: u64,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let mut interp = Self {
            objects: Vec::new(),
            object_prototype: None,
            function_prototype: None,
            error_prototypes: FxHashMap::default(),
            private_methods: FxHashMap::default(),
            next_symbol_id: 1,
            next_private_id: 1,
            next_brand_id: 1,
        };
        interp.setup_prototypes();
        interp
    }

    fn setup_prototypes(&mut self) {
        let object_proto = Rc::new(RefCell::new(JsObjectData::new()));
        self.allocate_object_slot(object_proto.clone());
        self.object_prototype = Some(object_proto);

        let function_proto = self.create_object();
        self.function_prototype = Some(function_proto);

        let error_proto = self.create_object();
        {
            let mut e = error_proto.borrow_mut();
            e.insert_builtin("name".to_string(), JsValue::from("Error"));
            e.insert_builtin("message".to_string(), JsValue::from(""));
        }
        let type_error_proto = self.create_object();
        {
            let mut e = type_error_proto.borrow_mut();
            e.prototype = Some(error_proto.clone());
            e.insert_builtin("name".to_string(), JsValue::from("TypeError"));
            e.insert_builtin("message".to_string(), JsValue::from(""));
        }
        self.error_prototypes
            .insert("Error".to_string(), error_proto);
        self.error_prototypes
            .insert("TypeError".to_string(), type_error_proto);
    }

    pub(crate) fn allocate_object_slot(&mut self, obj: Rc<RefCell<JsObjectData>>) -> u64 {
        let id = self.objects.len() as u64;
        self.objects.push(Some(obj.clone()));
        obj.borrow_mut().id = Some(id);
        id
    }

    pub(crate) fn create_object(&mut self) -> Rc<RefCell<JsObjectData>> {
        let mut data = JsObjectData::new();
        data.prototype = self.object_prototype.clone();
        let obj = Rc::new(RefCell::new(data));
        self.allocate_object_slot(obj.clone());
        obj
    }

    fn object_value(obj: &Rc<RefCell<JsObjectData>>) -> JsValue {
        match obj.borrow().id {
            Some(id) => JsValue::Object(JsObject { id }),
            None => JsValue::Undefined,
        }
    }

    /// A fresh ordinary object inheriting from `Object.prototype`.
    pub fn new_object(&mut self) -> JsValue {
        let obj = self.create_object();
        Self::object_value(&obj)
    }

    /// An ordinary object with enumerable data properties in the given order.
    pub fn object_from_entries(&mut self, entries: &[(&str, JsValue)]) -> JsValue {
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            for (key, value) in entries {
                o.insert_value((*key).to_string(), value.clone());
            }
        }
        Self::object_value(&obj)
    }

    pub(crate) fn get_object(&self, id: u64) -> Option<Rc<RefCell<JsObjectData>>> {
        self.objects.get(id as usize).and_then(|slot| slot.clone())
    }

    pub(crate) fn object_of(&self, val: &JsValue) -> Option<Rc<RefCell<JsObjectData>>> {
        match val {
            JsValue::Object(o) => self.get_object(o.id),
            _ => None,
        }
    }

    pub(crate) fn create_function(&mut self, func: JsFunction) -> JsValue {
        let (fn_name, fn_length) = match &func {
            JsFunction::Native(name, arity, _) => (name.clone(), *arity),
            JsFunction::Class(name) => (name.clone(), 0),
        };
        let mut obj_data = JsObjectData::new();
        obj_data.prototype = self.function_prototype.clone();
        obj_data.callable = Some(func);
        obj_data.insert_property(
            "length".to_string(),
            PropertyDescriptor::data(JsValue::Number(fn_length as f64), false, false, true),
        );
        obj_data.insert_property(
            "name".to_string(),
            PropertyDescriptor::data(JsValue::from(fn_name.as_str()), false, false, true),
        );
        let obj = Rc::new(RefCell::new(obj_data));
        let func_id = self.allocate_object_slot(obj);
        JsValue::Object(JsObject { id: func_id })
    }

    /// Wrap a Rust closure as a callable function object.
    pub fn create_native_function(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
    ) -> JsValue {
        self.create_function(JsFunction::native(
            name.to_string(),
            arity,
            move |interp, this, args| f(interp, this, args).into(),
        ))
    }

    /// Like [`Interpreter::create_native_function`], but usable with
    /// `construct`: it gets a `prototype` object whose `constructor` points
    /// back, and is called with the freshly created instance as `this`.
    pub fn create_native_constructor(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
    ) -> JsValue {
        let func_val = self.create_native_function(name, arity, f);
        let proto = self.create_object();
        let proto_val = Self::object_value(&proto);
        proto
            .borrow_mut()
            .insert_builtin("constructor".to_string(), func_val.clone());
        if let Some(func) = self.object_of(&func_val) {
            let mut func = func.borrow_mut();
            func.is_constructor = true;
            func.insert_property(
                "prototype".to_string(),
                PropertyDescriptor::data(proto_val, true, false, false),
            );
        }
        func_val
    }

    pub fn is_callable(&self, val: &JsValue) -> bool {
        self.object_of(val)
            .is_some_and(|obj| obj.borrow().callable.is_some())
    }

    pub fn is_constructor(&self, val: &JsValue) -> bool {
        self.object_of(val).is_some_and(|obj| {
            let obj = obj.borrow();
            obj.callable.is_some() && obj.is_constructor
        })
    }

    pub fn new_symbol(&mut self, description: Option<&str>) -> JsSymbol {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        JsSymbol {
            id,
            description: description.map(JsString::from_str),
        }
    }

    /// Mint a private name. The leading `#` is added if missing.
    pub fn new_private_name(&mut self, description: &str) -> PrivateName {
        let id = self.next_private_id;
        self.next_private_id += 1;
        let description: Rc<str> = if description.starts_with('#') {
            Rc::from(description)
        } else {
            Rc::from(format!("#{description}"))
        };
        PrivateName { id, description }
    }

    pub(crate) fn new_brand(&mut self) -> Brand {
        let id = self.next_brand_id;
        self.next_brand_id += 1;
        Brand(id)
    }

    pub(crate) fn create_error(&mut self, name: &str, msg: &str) -> JsValue {
        let error_proto = self.error_prototypes.get(name).cloned();
        let obj = self.create_object();
        {
            let mut o = obj.borrow_mut();
            if let Some(proto) = error_proto {
                o.prototype = Some(proto);
            }
            o.insert_builtin("message".to_string(), JsValue::from(msg));
            o.insert_builtin("name".to_string(), JsValue::from(name));
        }
        Self::object_value(&obj)
    }

    pub(crate) fn create_type_error(&mut self, msg: &str) -> JsValue {
        self.create_error("TypeError", msg)
    }

    /// A `TypeError` tagged with the engine error kind that raised it.
    pub(crate) fn create_engine_error(&mut self, kind: ErrorKind, msg: &str) -> JsValue {
        let err = self.create_type_error(msg);
        if let Some(obj) = self.object_of(&err) {
            obj.borrow_mut().error_kind = Some(kind);
        }
        err
    }

    /// The engine error kind of a thrown value, if the engine raised it.
    pub fn error_kind(&self, val: &JsValue) -> Option<ErrorKind> {
        self.object_of(val).and_then(|obj| obj.borrow().error_kind)
    }

    /// The `name` own property of a function, if it is a string.
    pub fn function_name(&self, func: &JsValue) -> Option<String> {
        let obj = self.object_of(func)?;
        let name = obj.borrow().get_property_value("name");
        match name {
            Some(JsValue::String(s)) => Some(s.to_rust_string()),
            _ => None,
        }
    }

    pub(crate) fn set_function_name(&mut self, func: &JsValue, name: &str) {
        if let Some(obj) = self.object_of(func) {
            // A non-configurable `name` is left alone.
            obj.borrow_mut().define_own_property(
                "name".to_string(),
                PropertyDescriptor::data(JsValue::from(name), false, false, true),
            );
        }
    }

    pub fn format_value(&self, val: &JsValue) -> String {
        match val {
            JsValue::Object(o) => {
                if let Some(obj) = self.get_object(o.id) {
                    let obj = obj.borrow();
                    if let Some(func) = &obj.callable {
                        let name = match obj.get_property_value("name") {
                            Some(JsValue::String(s)) => s.to_rust_string(),
                            _ => String::new(),
                        };
                        return match func {
                            JsFunction::Class(_) => format!("[class {name}]"),
                            JsFunction::Native(..) if name.is_empty() => {
                                "[Function (anonymous)]".to_string()
                            }
                            JsFunction::Native(..) => format!("[Function: {name}]"),
                        };
                    }
                    let name = obj.get_property("name");
                    let message = obj.get_property("message");
                    if let JsValue::String(ref msg) = message {
                        let msg_str = msg.to_rust_string();
                        if let JsValue::String(ref n) = name {
                            let n_str = n.to_rust_string();
                            if n_str.is_empty() {
                                return msg_str;
                            }
                            return format!("{n_str}: {msg_str}");
                        }
                        return msg_str;
                    }
                }
                format!("{val}")
            }
            JsValue::String(s) => format!("{:?}", s.to_rust_string()),
            _ => format!("{val}"),
        }
    }
}
