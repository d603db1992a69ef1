//! Class definitions as Rust values, and the builder that turns them into
//! element descriptors.

use std::collections::hash_map::Entry;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::initializers::FieldSlot;
use crate::error::ErrorKind;
use crate::interpreter::{Completion, Interpreter, NativeFn, PrivateName, PropertyKey};
use crate::types::{JsSymbol, JsValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Method,
    Getter,
    Setter,
    Field,
    Accessor,
}

impl ElementKind {
    /// The `kind` string seen by decorators.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Method => "method",
            ElementKind::Getter => "getter",
            ElementKind::Setter => "setter",
            ElementKind::Field => "field",
            ElementKind::Accessor => "accessor",
        }
    }

    fn name_prefix(self) -> &'static str {
        match self {
            ElementKind::Getter => "get ",
            ElementKind::Setter => "set ",
            _ => "",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Static,
    Instance,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKey {
    String(String),
    Symbol(JsSymbol),
    Private(PrivateName),
}

impl ElementKey {
    pub fn is_private(&self) -> bool {
        matches!(self, ElementKey::Private(_))
    }

    /// `name` for strings, `[description]` for symbols, `#name` for privates.
    pub fn display_name(&self) -> String {
        match self {
            ElementKey::String(s) => s.clone(),
            ElementKey::Symbol(sym) => sym.function_name(),
            ElementKey::Private(name) => name.description().to_string(),
        }
    }

    /// Where the element lives: an ordinary property or a private name.
    pub(crate) fn slot(&self) -> FieldSlot {
        match self {
            ElementKey::String(s) => FieldSlot::Public(PropertyKey::from(s)),
            ElementKey::Symbol(sym) => FieldSlot::Public(PropertyKey::from(sym)),
            ElementKey::Private(name) => FieldSlot::Private(name.clone()),
        }
    }
}

impl From<&str> for ElementKey {
    fn from(s: &str) -> Self {
        ElementKey::String(s.to_string())
    }
}

impl From<String> for ElementKey {
    fn from(s: String) -> Self {
        ElementKey::String(s)
    }
}

impl From<JsSymbol> for ElementKey {
    fn from(sym: JsSymbol) -> Self {
        ElementKey::Symbol(sym)
    }
}

impl From<PrivateName> for ElementKey {
    fn from(name: PrivateName) -> Self {
        ElementKey::Private(name)
    }
}

/// Computes the initial value of a field for a receiver.
#[derive(Clone)]
pub struct Initializer(Rc<dyn Fn(&mut Interpreter, &JsValue) -> Completion>);

impl Initializer {
    pub fn new(f: impl Fn(&mut Interpreter, &JsValue) -> Result<JsValue, JsValue> + 'static) -> Self {
        Initializer(Rc::new(move |interp, this| f(interp, this).into()))
    }

    /// An initializer that always yields `value`.
    pub fn value(value: JsValue) -> Self {
        Initializer(Rc::new(move |_, _| Completion::Normal(value.clone())))
    }

    pub(crate) fn run(&self, interp: &mut Interpreter, this: &JsValue) -> Result<JsValue, JsValue> {
        (self.0)(interp, this).into_result()
    }
}

impl fmt::Debug for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Initializer")
    }
}

/// A decorator expression: a value, or code evaluated by the builder.
#[derive(Clone)]
pub enum DecoratorExpr {
    Value(JsValue),
    Deferred(Rc<dyn Fn(&mut Interpreter) -> Completion>),
}

impl DecoratorExpr {
    pub fn deferred(f: impl Fn(&mut Interpreter) -> Result<JsValue, JsValue> + 'static) -> Self {
        DecoratorExpr::Deferred(Rc::new(move |interp| f(interp).into()))
    }

    fn evaluate(&self, interp: &mut Interpreter) -> Result<JsValue, JsValue> {
        match self {
            DecoratorExpr::Value(v) => Ok(v.clone()),
            DecoratorExpr::Deferred(f) => f(interp).into_result(),
        }
    }
}

impl From<JsValue> for DecoratorExpr {
    fn from(v: JsValue) -> Self {
        DecoratorExpr::Value(v)
    }
}

#[derive(Clone)]
enum ElementBody {
    Function(JsValue),
    Initializer(Option<Initializer>),
}

/// One member of a class body.
#[derive(Clone)]
pub struct ClassElement {
    kind: ElementKind,
    placement: Placement,
    key: ElementKey,
    body: ElementBody,
    decorators: Vec<DecoratorExpr>,
}

impl ClassElement {
    fn new(kind: ElementKind, key: ElementKey, body: ElementBody) -> Self {
        Self {
            kind,
            placement: Placement::Instance,
            key,
            body,
            decorators: Vec::new(),
        }
    }

    pub fn method(key: impl Into<ElementKey>, function: JsValue) -> Self {
        Self::new(ElementKind::Method, key.into(), ElementBody::Function(function))
    }

    pub fn getter(key: impl Into<ElementKey>, function: JsValue) -> Self {
        Self::new(ElementKind::Getter, key.into(), ElementBody::Function(function))
    }

    pub fn setter(key: impl Into<ElementKey>, function: JsValue) -> Self {
        Self::new(ElementKind::Setter, key.into(), ElementBody::Function(function))
    }

    pub fn field(key: impl Into<ElementKey>, init: Option<Initializer>) -> Self {
        Self::new(ElementKind::Field, key.into(), ElementBody::Initializer(init))
    }

    /// An auto-accessor: hidden storage plus a get/set pair.
    pub fn accessor(key: impl Into<ElementKey>, init: Option<Initializer>) -> Self {
        Self::new(ElementKind::Accessor, key.into(), ElementBody::Initializer(init))
    }

    pub fn make_static(mut self) -> Self {
        self.placement = Placement::Static;
        self
    }

    /// Add a decorator. Decorators are listed in written order.
    pub fn decorate(mut self, expr: impl Into<DecoratorExpr>) -> Self {
        self.decorators.push(expr.into());
        self
    }
}

/// A class declaration: name, heritage, constructor body, decorators and
/// members in declaration order.
#[derive(Clone)]
pub struct ClassDefinition {
    name: String,
    parent: Option<JsValue>,
    body: Option<NativeFn>,
    decorators: Vec<DecoratorExpr>,
    elements: Vec<ClassElement>,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            body: None,
            decorators: Vec::new(),
            elements: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: JsValue) -> Self {
        self.parent = Some(parent);
        self
    }

    /// The constructor body. It runs after fields are defined; returning
    /// an object replaces the instance.
    pub fn constructor(
        mut self,
        f: impl Fn(&mut Interpreter, &JsValue, &[JsValue]) -> Result<JsValue, JsValue> + 'static,
    ) -> Self {
        self.body = Some(Rc::new(move |interp, this, args| f(interp, this, args).into()));
        self
    }

    pub fn decorate(mut self, expr: impl Into<DecoratorExpr>) -> Self {
        self.decorators.push(expr.into());
        self
    }

    pub fn element(mut self, element: ClassElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What an element starts out as, before any decorator runs.
pub(crate) enum ElementOriginal {
    Function(JsValue),
    Field(Option<Initializer>),
    Accessor {
        get: JsValue,
        set: JsValue,
        storage: PrivateName,
        init: Option<Initializer>,
    },
}

pub(crate) struct ElementDescriptor {
    pub kind: ElementKind,
    pub placement: Placement,
    pub key: ElementKey,
    /// Evaluated decorators, in written order.
    pub decorators: Vec<JsValue>,
    pub original: ElementOriginal,
}

impl ElementDescriptor {
    /// The context `name`: getters and setters carry a `get `/`set ` prefix.
    pub fn context_name(&self) -> String {
        format!("{}{}", self.kind.name_prefix(), self.key.display_name())
    }

    pub fn is_static(&self) -> bool {
        self.placement == Placement::Static
    }
}

pub(crate) struct BuiltClass {
    pub name: String,
    pub parent: Option<JsValue>,
    pub body: Option<NativeFn>,
    pub decorators: Vec<JsValue>,
    pub elements: Vec<ElementDescriptor>,
}

/// Validate member names, then evaluate every decorator expression (class
/// decorators first, then each element in order).
pub(crate) fn build(interp: &mut Interpreter, def: ClassDefinition) -> Result<BuiltClass, JsValue> {
    validate_names(interp, &def)?;

    let mut decorators = Vec::with_capacity(def.decorators.len());
    for expr in &def.decorators {
        decorators.push(expr.evaluate(interp)?);
    }

    let mut elements = Vec::with_capacity(def.elements.len());
    for element in def.elements {
        let mut evaluated = Vec::with_capacity(element.decorators.len());
        for expr in &element.decorators {
            evaluated.push(expr.evaluate(interp)?);
        }
        let original = match element.body {
            ElementBody::Function(f) => {
                if !interp.is_callable(&f) {
                    return Err(interp.create_type_error(&format!(
                        "{} '{}' must be a function",
                        element.kind,
                        element.key.display_name()
                    )));
                }
                ElementOriginal::Function(f)
            }
            ElementBody::Initializer(init) if element.kind == ElementKind::Accessor => {
                auto_accessor(interp, &element.key, init)
            }
            ElementBody::Initializer(init) => ElementOriginal::Field(init),
        };
        trace!(
            kind = %element.kind,
            name = %element.key.display_name(),
            decorators = evaluated.len(),
            "built element"
        );
        elements.push(ElementDescriptor {
            kind: element.kind,
            placement: element.placement,
            key: element.key,
            decorators: evaluated,
            original,
        });
    }

    Ok(BuiltClass {
        name: def.name,
        parent: def.parent,
        body: def.body,
        decorators,
        elements,
    })
}

/// Storage slot plus the get/set trampolines reading and writing it.
fn auto_accessor(interp: &mut Interpreter, key: &ElementKey, init: Option<Initializer>) -> ElementOriginal {
    let display = key.display_name();
    let storage = interp.new_private_name(&format!("{display} storage"));
    let slot = storage.clone();
    let get = interp.create_native_function(&format!("get {display}"), 0, move |interp, this, _| {
        interp.private_get(this, &slot)
    });
    let slot = storage.clone();
    let set = interp.create_native_function(&format!("set {display}"), 1, move |interp, this, args| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        interp.private_set(this, &slot, value)?;
        Ok(JsValue::Undefined)
    });
    ElementOriginal::Accessor {
        get,
        set,
        storage,
        init,
    }
}

fn validate_names(interp: &mut Interpreter, def: &ClassDefinition) -> Result<(), JsValue> {
    // Private spelling -> (declared name, placement, kinds seen).
    let mut privates: FxHashMap<String, (PrivateName, Placement, Vec<ElementKind>)> =
        FxHashMap::default();

    for element in &def.elements {
        let reserved = match &element.key {
            ElementKey::String(s) if s == "constructor" => {
                element.placement == Placement::Instance
                    || matches!(element.kind, ElementKind::Field | ElementKind::Accessor)
            }
            ElementKey::String(s) if s == "prototype" => element.placement == Placement::Static,
            ElementKey::Private(name) => name.description() == "#constructor",
            _ => false,
        };
        if reserved {
            let placement = match element.placement {
                Placement::Static => "static ",
                Placement::Instance => "",
            };
            return Err(interp.create_engine_error(
                ErrorKind::DuplicateOrReservedName,
                &format!(
                    "Classes may not have a {placement}{} named '{}'",
                    element.kind,
                    element.key.display_name()
                ),
            ));
        }

        let ElementKey::Private(name) = &element.key else {
            continue;
        };
        let spelling = name.description().to_string();
        match privates.entry(spelling) {
            Entry::Vacant(slot) => {
                slot.insert((name.clone(), element.placement, vec![element.kind]));
            }
            Entry::Occupied(mut slot) => {
                let (declared, placement, kinds) = slot.get_mut();
                let pairs_up = declared == name
                    && *placement == element.placement
                    && kinds.len() == 1
                    && matches!(
                        (kinds[0], element.kind),
                        (ElementKind::Getter, ElementKind::Setter)
                            | (ElementKind::Setter, ElementKind::Getter)
                    );
                if !pairs_up {
                    return Err(interp.create_engine_error(
                        ErrorKind::DuplicateOrReservedName,
                        &format!("Identifier '{}' has already been declared", name.description()),
                    ));
                }
                kinds.push(element.kind);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn noop(interp: &mut Interpreter) -> JsValue {
        interp.create_native_function("noop", 0, |_, _, _| Ok(JsValue::Undefined))
    }

    fn rejected(interp: &mut Interpreter, def: ClassDefinition) -> Option<ErrorKind> {
        match build(interp, def) {
            Ok(_) => None,
            Err(e) => interp.error_kind(&e),
        }
    }

    #[test]
    fn display_names() {
        let mut interp = Interpreter::new();
        let sym = interp.new_symbol(Some("tag"));
        let private = interp.new_private_name("secret");
        assert_eq!(ElementKey::from("m").display_name(), "m");
        assert_eq!(ElementKey::from(sym).display_name(), "[tag]");
        assert_eq!(ElementKey::from(private).display_name(), "#secret");
    }

    #[test]
    fn reserved_names_are_rejected() {
        let mut interp = Interpreter::new();
        let f = noop(&mut interp);
        let def = ClassDefinition::new("A").element(ClassElement::method("constructor", f.clone()));
        assert_eq!(
            rejected(&mut interp, def),
            Some(ErrorKind::DuplicateOrReservedName)
        );

        let def = ClassDefinition::new("A").element(ClassElement::method("prototype", f.clone()).make_static());
        assert_eq!(
            rejected(&mut interp, def),
            Some(ErrorKind::DuplicateOrReservedName)
        );

        let def = ClassDefinition::new("A").element(ClassElement::field("constructor", None).make_static());
        assert_eq!(
            rejected(&mut interp, def),
            Some(ErrorKind::DuplicateOrReservedName)
        );

        let hash_ctor = interp.new_private_name("#constructor");
        let def = ClassDefinition::new("A").element(ClassElement::field(hash_ctor, None));
        assert_eq!(
            rejected(&mut interp, def),
            Some(ErrorKind::DuplicateOrReservedName)
        );

        // A static method may be called `constructor`, an instance field `prototype`.
        let def = ClassDefinition::new("A")
            .element(ClassElement::method("constructor", f).make_static())
            .element(ClassElement::field("prototype", None));
        assert!(build(&mut interp, def).is_ok());
    }

    #[test]
    fn private_getter_setter_pair_is_not_a_duplicate() {
        let mut interp = Interpreter::new();
        let f = noop(&mut interp);
        let x = interp.new_private_name("#x");
        let def = ClassDefinition::new("A")
            .element(ClassElement::getter(x.clone(), f.clone()))
            .element(ClassElement::setter(x.clone(), f.clone()));
        assert!(build(&mut interp, def).is_ok());

        let def = ClassDefinition::new("A")
            .element(ClassElement::getter(x.clone(), f.clone()))
            .element(ClassElement::setter(x.clone(), f.clone()).make_static());
        assert_eq!(
            rejected(&mut interp, def),
            Some(ErrorKind::DuplicateOrReservedName)
        );

        let other_x = interp.new_private_name("#x");
        let def = ClassDefinition::new("A")
            .element(ClassElement::field(x, None))
            .element(ClassElement::method(other_x, f));
        assert_eq!(
            rejected(&mut interp, def),
            Some(ErrorKind::DuplicateOrReservedName)
        );
    }

    #[test]
    fn names_are_checked_before_any_decorator_is_evaluated() {
        let mut interp = Interpreter::new();
        let f = noop(&mut interp);
        let evaluated = Rc::new(RefCell::new(0));
        let seen = evaluated.clone();
        let def = ClassDefinition::new("A")
            .decorate(DecoratorExpr::deferred(move |_| {
                *seen.borrow_mut() += 1;
                Ok(JsValue::Undefined)
            }))
            .element(ClassElement::method("constructor", f));
        assert!(build(&mut interp, def).is_err());
        assert_eq!(*evaluated.borrow(), 0);
    }

    #[test]
    fn decorators_evaluate_class_first_then_elements_in_order() {
        let mut interp = Interpreter::new();
        let f = noop(&mut interp);
        let log = Rc::new(RefCell::new(Vec::new()));
        let tag = |label: &'static str| {
            let log = log.clone();
            DecoratorExpr::deferred(move |_| {
                log.borrow_mut().push(label);
                Ok(JsValue::Undefined)
            })
        };
        let def = ClassDefinition::new("A")
            .element(ClassElement::method("a", f.clone()).decorate(tag("a1")).decorate(tag("a2")))
            .element(ClassElement::field("b", None).decorate(tag("b1")))
            .decorate(tag("class"));
        let built = build(&mut interp, def).unwrap();
        assert_eq!(*log.borrow(), vec!["class", "a1", "a2", "b1"]);
        assert_eq!(built.elements.len(), 2);
        assert_eq!(built.elements[0].decorators.len(), 2);
    }

    #[test]
    fn accessor_gets_private_storage_and_trampolines() {
        let mut interp = Interpreter::new();
        let def = ClassDefinition::new("A")
            .element(ClassElement::accessor("count", Some(Initializer::value(JsValue::Number(1.0)))));
        let built = build(&mut interp, def).unwrap();
        let ElementOriginal::Accessor { get, set, storage, .. } = &built.elements[0].original else {
            panic!("expected accessor");
        };
        assert_eq!(interp.function_name(get).as_deref(), Some("get count"));
        assert_eq!(interp.function_name(set).as_deref(), Some("set count"));
        assert_eq!(storage.description(), "#count storage");
    }

    #[test]
    fn getter_context_names_are_prefixed() {
        let mut interp = Interpreter::new();
        let f = noop(&mut interp);
        let def = ClassDefinition::new("A")
            .element(ClassElement::getter("size", f.clone()))
            .element(ClassElement::setter("size", f));
        let built = build(&mut interp, def).unwrap();
        assert_eq!(built.elements[0].context_name(), "get size");
        assert_eq!(built.elements[1].context_name(), "set size");
    }
}
