//! Field definitions and extra initializers, recorded at definition time
//! and replayed later: once for the constructor, once per construction for
//! instances.

use std::rc::Rc;

use tracing::debug;

use super::element::{Initializer, Placement};
use crate::interpreter::{ClassData, Interpreter, PrivateName, PropertyDescriptor, PropertyKey};
use crate::types::JsValue;

#[derive(Clone)]
pub(crate) enum FieldSlot {
    Public(PropertyKey),
    Private(PrivateName),
}

/// A field (or accessor storage) definition: the declared initializer,
/// then each decorator-supplied transform in application order.
#[derive(Clone)]
pub(crate) struct FieldRecord {
    pub slot: FieldSlot,
    pub init: Option<Initializer>,
    pub transforms: Vec<JsValue>,
}

#[derive(Clone)]
enum PlanStep {
    Define(FieldRecord),
    Run(Vec<JsValue>),
}

/// An ordered list of field definitions and extra-initializer batches.
#[derive(Clone, Default)]
pub struct InitializerPlan {
    steps: Vec<PlanStep>,
}

impl InitializerPlan {
    fn define(&mut self, field: FieldRecord) {
        self.steps.push(PlanStep::Define(field));
    }

    fn run(&mut self, initializers: Vec<JsValue>) {
        if !initializers.is_empty() {
            self.steps.push(PlanStep::Run(initializers));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn replay(&self, interp: &mut Interpreter, receiver: &JsValue) -> Result<(), JsValue> {
        for step in &self.steps {
            match step {
                PlanStep::Define(field) => define_field(interp, field, receiver)?,
                PlanStep::Run(initializers) => {
                    for initializer in initializers {
                        interp.call(initializer, receiver, &[])?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn define_field(interp: &mut Interpreter, field: &FieldRecord, receiver: &JsValue) -> Result<(), JsValue> {
    let mut value = match &field.init {
        Some(init) => init.run(interp, receiver)?,
        None => JsValue::Undefined,
    };
    for transform in &field.transforms {
        value = interp.call(transform, receiver, &[value])?;
    }
    match &field.slot {
        FieldSlot::Public(key) => {
            interp.define_own_property(receiver, key, PropertyDescriptor::data_default(value))
        }
        FieldSlot::Private(name) => interp.private_field_add(receiver, name, value),
    }
}

/// Collects per-element registrations while a class is being defined.
#[derive(Default)]
pub(crate) struct InitializerRegistry {
    instance: InitializerPlan,
    static_fields: InitializerPlan,
    static_extras: Vec<JsValue>,
}

impl InitializerRegistry {
    /// Instance registrations keep declaration order, each element's extra
    /// initializers right after its field. Static extras all run after the
    /// last static field.
    pub fn register(&mut self, placement: Placement, field: Option<FieldRecord>, extras: Vec<JsValue>) {
        match placement {
            Placement::Instance => {
                if let Some(field) = field {
                    self.instance.define(field);
                }
                self.instance.run(extras);
            }
            Placement::Static => {
                if let Some(field) = field {
                    self.static_fields.define(field);
                }
                self.static_extras.extend(extras);
            }
        }
    }

    /// `(instance plan, static plan)`.
    pub fn into_plans(self) -> (InitializerPlan, InitializerPlan) {
        let mut static_plan = self.static_fields;
        static_plan.run(self.static_extras);
        (self.instance, static_plan)
    }
}

impl Interpreter {
    pub(crate) fn class_data_of(&self, constructor: &JsValue) -> Option<Rc<ClassData>> {
        self.object_of(constructor)
            .and_then(|obj| obj.borrow().class_data.clone())
    }

    fn not_a_class(&mut self, constructor: &JsValue) -> JsValue {
        self.create_type_error(&format!(
            "{} is not a class constructor",
            self.format_value(constructor)
        ))
    }

    /// Install the static brand on `constructor`, define its static fields
    /// and run its static extra initializers. Only the first call does
    /// anything beyond the brand.
    pub fn run_static_initializers(&mut self, constructor: &JsValue) -> Result<(), JsValue> {
        let Some(class_data) = self.class_data_of(constructor) else {
            return Err(self.not_a_class(constructor));
        };
        self.install_brand(constructor, class_data.static_brand);
        let plan = class_data.static_plan.borrow_mut().take();
        if let Some(plan) = plan {
            debug!(class = %class_data.name, "running static initializers");
            plan.replay(self, constructor)?;
        }
        Ok(())
    }

    /// Install the instance brand on `instance`, then define fields and run
    /// extra initializers in declaration order.
    pub fn run_instance_initializers(&mut self, constructor: &JsValue, instance: &JsValue) -> Result<(), JsValue> {
        let Some(class_data) = self.class_data_of(constructor) else {
            return Err(self.not_a_class(constructor));
        };
        self.install_brand(instance, class_data.brand);
        let plan = class_data.instance_plan.borrow().clone();
        plan.replay(self, instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(interp: &mut Interpreter, log: &Rc<RefCell<Vec<String>>>, label: &str) -> JsValue {
        let log = log.clone();
        let label = label.to_string();
        interp.create_native_function(&label.clone(), 0, move |_, _, _| {
            log.borrow_mut().push(label.clone());
            Ok(JsValue::Undefined)
        })
    }

    #[test]
    fn static_extras_run_after_all_static_fields() {
        let mut interp = Interpreter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InitializerRegistry::default();
        let first = recorder(&mut interp, &log, "extra-a");
        registry.register(
            Placement::Static,
            Some(FieldRecord {
                slot: FieldSlot::Public("a".into()),
                init: None,
                transforms: Vec::new(),
            }),
            vec![first],
        );
        let log_field = log.clone();
        registry.register(
            Placement::Static,
            Some(FieldRecord {
                slot: FieldSlot::Public("b".into()),
                init: Some(Initializer::new(move |_, _| {
                    log_field.borrow_mut().push("field-b".to_string());
                    Ok(JsValue::Number(2.0))
                })),
                transforms: Vec::new(),
            }),
            Vec::new(),
        );
        let (instance, static_plan) = registry.into_plans();
        assert!(instance.is_empty());

        let target = interp.new_object();
        static_plan.replay(&mut interp, &target).unwrap();
        assert_eq!(*log.borrow(), vec!["field-b", "extra-a"]);
        assert!(interp.has_own_property(&target, "a"));
        assert_eq!(interp.get(&target, "b").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn instance_extras_interleave_with_fields() {
        let mut interp = Interpreter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = InitializerRegistry::default();
        for label in ["x", "y"] {
            let log_field = log.clone();
            let field_label = format!("field-{label}");
            let extra = recorder(&mut interp, &log, &format!("extra-{label}"));
            registry.register(
                Placement::Instance,
                Some(FieldRecord {
                    slot: FieldSlot::Public(label.into()),
                    init: Some(Initializer::new(move |_, _| {
                        log_field.borrow_mut().push(field_label.clone());
                        Ok(JsValue::Undefined)
                    })),
                    transforms: Vec::new(),
                }),
                vec![extra],
            );
        }
        let (instance, _) = registry.into_plans();
        let target = interp.new_object();
        instance.replay(&mut interp, &target).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["field-x", "extra-x", "field-y", "extra-y"]
        );
    }

    #[test]
    fn transforms_compose_in_order() {
        let mut interp = Interpreter::new();
        let add_one = interp.create_native_function("addOne", 1, |_, _, args| {
            Ok(JsValue::Number(args[0].as_number().unwrap_or(f64::NAN) + 1.0))
        });
        let double = interp.create_native_function("double", 1, |_, _, args| {
            Ok(JsValue::Number(args[0].as_number().unwrap_or(f64::NAN) * 2.0))
        });
        let field = FieldRecord {
            slot: FieldSlot::Public("n".into()),
            init: Some(Initializer::value(JsValue::Number(3.0))),
            transforms: vec![add_one, double],
        };
        let target = interp.new_object();
        define_field(&mut interp, &field, &target).unwrap();
        assert_eq!(interp.get(&target, "n").unwrap().as_number(), Some(8.0));
    }
}
