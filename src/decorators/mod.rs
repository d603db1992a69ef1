//! The class decoration engine.
//!
//! [`Interpreter::define_class`] turns a [`ClassDefinition`] into a
//! constructor in four passes:
//!
//! 1. the builder checks member names and evaluates every decorator
//!    expression, class decorators first;
//! 2. each element is decorated in declaration order and installed on the
//!    prototype or the constructor, its field definition and extra
//!    initializers registered for later;
//! 3. the static phase defines static fields on the constructor, then runs
//!    the static extra initializers;
//! 4. class decorators see the finished constructor and may replace it.
//!
//! Instance fields and extra initializers run from [`Interpreter::construct`],
//! after the parent constructor and before the constructor body.

mod apply;
mod context;
mod element;
mod finalize;
mod initializers;


use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, debug_span};

pub use element::{ClassDefinition, ClassElement, DecoratorExpr, ElementKey, ElementKind, Initializer, Placement};
pub use finalize::DefinedClass;
pub use initializers::InitializerPlan;

use apply::{DecoratedElement, DecoratedValue};
use element::ElementDescriptor;
use initializers::{FieldRecord, FieldSlot, InitializerRegistry};

use crate::error::DecorationError;
use crate::interpreter::{
    Brand, BrandLink, ClassData, Interpreter, JsFunction, NativeFn, PrivateElement, PrivateName,
    PropertyDescriptor,
};
use crate::types::JsValue;

/// State of one class definition in progress. Definitions started from
/// inside a decorator get their own session.
struct DecorationSession {
    constructor: JsValue,
    prototype: JsValue,
    class_data: Rc<ClassData>,
    registry: InitializerRegistry,
    private_names: Vec<PrivateName>,
}

impl DecorationSession {
    /// Create the constructor and its prototype object, wired to `parent`.
    fn open(
        interp: &mut Interpreter,
        name: &str,
        parent: Option<JsValue>,
        body: Option<NativeFn>,
    ) -> Result<Self, JsValue> {
        let proto_parent = match &parent {
            Some(parent) => {
                if !interp.is_constructor(parent) {
                    return Err(interp.create_type_error(&format!(
                        "Class extends value {} is not a constructor",
                        interp.format_value(parent)
                    )));
                }
                let proto_parent = interp.get(parent, "prototype")?;
                if !proto_parent.is_object() && !proto_parent.is_null() {
                    return Err(interp.create_type_error(&format!(
                        "Class extends value does not have valid prototype property {}",
                        interp.format_value(&proto_parent)
                    )));
                }
                Some(proto_parent)
            }
            None => None,
        };

        let prototype = interp.new_object();
        if let Some(proto_parent) = &proto_parent
            && let Some(proto) = interp.object_of(&prototype)
        {
            proto.borrow_mut().prototype = interp.object_of(proto_parent);
        }

        let class_data = Rc::new(ClassData {
            name: name.to_string(),
            parent: parent.clone(),
            brand: interp.new_brand(),
            static_brand: interp.new_brand(),
            body,
            instance_plan: RefCell::new(Rc::default()),
            static_plan: RefCell::new(None),
        });

        let constructor = interp.create_function(JsFunction::Class(name.to_string()));
        if let Some(ctor) = interp.object_of(&constructor) {
            let mut ctor = ctor.borrow_mut();
            ctor.is_constructor = true;
            ctor.class_data = Some(class_data.clone());
            if let Some(parent) = &parent {
                ctor.prototype = interp.object_of(parent);
            }
            ctor.insert_property(
                "prototype".to_string(),
                PropertyDescriptor::data(prototype.clone(), false, false, false),
            );
        }
        if let Some(proto) = interp.object_of(&prototype) {
            proto
                .borrow_mut()
                .insert_builtin("constructor".to_string(), constructor.clone());
        }

        Ok(Self {
            constructor,
            prototype,
            class_data,
            registry: InitializerRegistry::default(),
            private_names: Vec::new(),
        })
    }

    /// Put a decorated element in place and register what must run later.
    fn install(&mut self, interp: &mut Interpreter, element: DecoratedElement) -> Result<(), JsValue> {
        let (target, brand) = match element.placement {
            Placement::Static => (self.constructor.clone(), self.class_data.static_brand),
            Placement::Instance => (self.prototype.clone(), self.class_data.brand),
        };
        let field = match element.value {
            DecoratedValue::Function(f) => {
                match (element.key.slot(), element.kind) {
                    (FieldSlot::Private(name), ElementKind::Getter | ElementKind::Setter) => {
                        let (old_get, old_set) = match interp.private_method(&name) {
                            Some(BrandLink {
                                element: PrivateElement::Accessor { get, set },
                                ..
                            }) => (get, set),
                            _ => (None, None),
                        };
                        let accessor = if element.kind == ElementKind::Getter {
                            PrivateElement::Accessor {
                                get: Some(f),
                                set: old_set,
                            }
                        } else {
                            PrivateElement::Accessor {
                                get: old_get,
                                set: Some(f),
                            }
                        };
                        self.register_private(interp, name, brand, accessor);
                    }
                    (FieldSlot::Private(name), _) => {
                        self.register_private(interp, name, brand, PrivateElement::Method(f));
                    }
                    (FieldSlot::Public(key), ElementKind::Getter) => {
                        interp.define_accessor_half(&target, key, Some(f), None)?;
                    }
                    (FieldSlot::Public(key), ElementKind::Setter) => {
                        interp.define_accessor_half(&target, key, None, Some(f))?;
                    }
                    (FieldSlot::Public(key), _) => {
                        interp.define_own_property(&target, key, PropertyDescriptor::data(f, true, false, true))?;
                    }
                }
                None
            }
            DecoratedValue::Field { init, transforms } => Some(FieldRecord {
                slot: element.key.slot(),
                init,
                transforms,
            }),
            DecoratedValue::Accessor {
                get,
                set,
                storage,
                init,
                transforms,
            } => {
                match element.key.slot() {
                    FieldSlot::Private(name) => {
                        let accessor = PrivateElement::Accessor {
                            get: Some(get),
                            set: Some(set),
                        };
                        self.register_private(interp, name, brand, accessor);
                    }
                    FieldSlot::Public(key) => {
                        interp.define_accessor_half(&target, key, Some(get), Some(set))?;
                    }
                }
                Some(FieldRecord {
                    slot: FieldSlot::Private(storage),
                    init,
                    transforms,
                })
            }
        };
        self.registry
            .register(element.placement, field, element.extra_initializers);
        Ok(())
    }

    fn register_private(
        &mut self,
        interp: &mut Interpreter,
        name: PrivateName,
        brand: Brand,
        element: PrivateElement,
    ) {
        if !self.private_names.contains(&name) {
            self.private_names.push(name.clone());
        }
        interp.register_private_method(name, BrandLink { brand, element });
    }

    /// Store the instance plan on the class, then run the static phase.
    fn close(&mut self, interp: &mut Interpreter) -> Result<JsValue, JsValue> {
        let (instance_plan, static_plan) = std::mem::take(&mut self.registry).into_plans();
        *self.class_data.instance_plan.borrow_mut() = Rc::new(instance_plan);
        *self.class_data.static_plan.borrow_mut() = Some(static_plan);
        interp.run_static_initializers(&self.constructor)?;
        Ok(self.constructor.clone())
    }

    /// Forget a definition that threw: its private methods can never be
    /// reached, since no instance of the class escapes.
    fn discard(self, interp: &mut Interpreter) {
        debug!(count = self.private_names.len(), "discarding private methods");
        interp.unregister_private_methods(&self.private_names);
    }
}

impl Interpreter {
    /// Evaluate a decorated class definition.
    ///
    /// On failure nothing is bound: the error carries the thrown value,
    /// classified by [`DecorationError`].
    pub fn define_class(&mut self, definition: ClassDefinition) -> Result<DefinedClass, DecorationError> {
        let span = debug_span!("define_class", class = %definition.name());
        let _guard = span.enter();
        self.evaluate_class_definition(definition)
            .map_err(|thrown| self.decoration_error(thrown))
    }

    fn evaluate_class_definition(&mut self, definition: ClassDefinition) -> Result<DefinedClass, JsValue> {
        let built = element::build(self, definition)?;
        let mut session = DecorationSession::open(self, &built.name, built.parent, built.body)?;
        match self.decorate_class(&mut session, &built.name, built.elements, &built.decorators) {
            Ok(defined) => {
                debug!(replaced = defined.is_replaced(), "class defined");
                Ok(defined)
            }
            Err(thrown) => {
                session.discard(self);
                Err(thrown)
            }
        }
    }

    fn decorate_class(
        &mut self,
        session: &mut DecorationSession,
        name: &str,
        elements: Vec<ElementDescriptor>,
        decorators: &[JsValue],
    ) -> Result<DefinedClass, JsValue> {
        for desc in elements {
            let decorated = apply::decorate_element(self, desc)?;
            session.install(self, decorated)?;
        }
        let original = session.close(self)?;
        let constructor = finalize::apply_class_decorators(self, name, decorators, original.clone())?;
        Ok(DefinedClass {
            constructor,
            original,
        })
    }

    /// Classify a thrown value at the API boundary.
    pub fn decoration_error(&self, thrown: JsValue) -> DecorationError {
        match self.error_kind(&thrown) {
            Some(kind) => {
                let message = self
                    .object_of(&thrown)
                    .and_then(|obj| obj.borrow().get_property_value("message"))
                    .map(|m| m.to_string())
                    .unwrap_or_default();
                DecorationError::Engine {
                    kind,
                    message,
                    value: thrown,
                }
            }
            None => DecorationError::Thrown {
                message: self.format_value(&thrown),
                value: thrown,
            },
        }
    }
}
