use crate::decorators::InitializerPlan;
use crate::error::ErrorKind;
use crate::types::{JsSymbol, JsValue};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Debug)]
pub enum Completion {
    Normal(JsValue),
    Throw(JsValue),
}

impl Completion {
    pub fn into_result(self) -> Result<JsValue, JsValue> {
        match self {
            Completion::Normal(v) => Ok(v),
            Completion::Throw(e) => Err(e),
        }
    }
}

impl From<Result<JsValue, JsValue>> for Completion {
    fn from(result: Result<JsValue, JsValue>) -> Self {
        match result {
            Ok(v) => Completion::Normal(v),
            Err(e) => Completion::Throw(e),
        }
    }
}

pub type NativeFn = Rc<dyn Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion>;

#[derive(Clone)]
pub enum JsFunction {
    Native(String, usize, NativeFn),
    /// A class constructor; its behaviour lives in the object's `class_data`.
    Class(String),
}

impl JsFunction {
    pub fn native(
        name: String,
        arity: usize,
        f: impl Fn(&mut super::Interpreter, &JsValue, &[JsValue]) -> Completion + 'static,
    ) -> Self {
        JsFunction::Native(name, arity, Rc::new(f))
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsFunction::Native(name, arity, _) => {
                write!(f, "JsFunction::Native({name:?}, {arity})")
            }
            JsFunction::Class(name) => write!(f, "JsFunction::Class({name:?})"),
        }
    }
}

/// An ordinary property key. Symbols are their own namespace: no string
/// spelling reaches a symbol-keyed property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(JsSymbol),
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl From<&String> for PropertyKey {
    fn from(s: &String) -> Self {
        PropertyKey::String(s.clone())
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(sym: JsSymbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl From<&JsSymbol> for PropertyKey {
    fn from(sym: &JsSymbol) -> Self {
        PropertyKey::Symbol(sym.clone())
    }
}

impl From<&PropertyKey> for PropertyKey {
    fn from(key: &PropertyKey) -> Self {
        key.clone()
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Symbol(sym) => write!(f, "{}", JsValue::Symbol(sym.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn accessor(
        get: Option<JsValue>,
        set: Option<JsValue>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get.unwrap_or(JsValue::Undefined)),
            set: Some(set.unwrap_or(JsValue::Undefined)),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }
}

/// A private name. Two names are the same only if they were minted by the
/// same declaration; the `#spelling` is for display.
#[derive(Debug, Clone)]
pub struct PrivateName {
    pub(crate) id: u64,
    pub(crate) description: Rc<str>,
}

impl PrivateName {
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for PrivateName {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PrivateName {}

impl Hash for PrivateName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Marker installed on every object that went through a class's
/// construction path (or, for the static brand, on the constructor itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Brand(pub(crate) u64);

#[derive(Debug, Clone)]
pub enum PrivateElement {
    Field(JsValue),
    Method(JsValue),
    Accessor {
        get: Option<JsValue>,
        set: Option<JsValue>,
    },
}

/// A private method, getter or setter together with the brand a receiver
/// must carry to reach it.
#[derive(Debug, Clone)]
pub struct BrandLink {
    pub brand: Brand,
    pub element: PrivateElement,
}

/// Per-constructor state for classes defined through the engine.
pub struct ClassData {
    pub name: String,
    pub parent: Option<JsValue>,
    pub brand: Brand,
    pub static_brand: Brand,
    pub body: Option<NativeFn>,
    pub instance_plan: RefCell<Rc<InitializerPlan>>,
    /// Taken by the first `run_static_initializers` call.
    pub static_plan: RefCell<Option<InitializerPlan>>,
}

pub struct JsObjectData {
    pub id: Option<u64>,
    pub properties: FxHashMap<PropertyKey, PropertyDescriptor>,
    pub prototype: Option<Rc<RefCell<JsObjectData>>>,
    pub callable: Option<JsFunction>,
    pub is_constructor: bool,
    pub extensible: bool,
    pub private_elements: FxHashMap<PrivateName, PrivateElement>,
    pub brands: FxHashSet<Brand>,
    pub class_data: Option<Rc<ClassData>>,
    pub error_kind: Option<ErrorKind>,
}

impl JsObjectData {
    pub(crate) fn new() -> Self {
        Self {
            id: None,
            properties: FxHashMap::default(),
            prototype: None,
            callable: None,
            is_constructor: false,
            extensible: true,
            private_elements: FxHashMap::default(),
            brands: FxHashSet::default(),
            class_data: None,
            error_kind: None,
        }
    }

    /// The data value found along the prototype chain; accessors read as
    /// `undefined` here, since no receiver is available to call them with.
    pub fn get_property(&self, key: impl Into<PropertyKey>) -> JsValue {
        self.get_property_descriptor(key)
            .and_then(|desc| desc.value)
            .unwrap_or(JsValue::Undefined)
    }

    pub fn get_property_descriptor(&self, key: impl Into<PropertyKey>) -> Option<PropertyDescriptor> {
        self.find_descriptor(&key.into())
    }

    fn find_descriptor(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.properties.get(key) {
            return Some(desc.clone());
        }
        self.prototype
            .as_ref()
            .and_then(|proto| proto.borrow().find_descriptor(key))
    }

    pub fn get_own_property(&self, key: impl Into<PropertyKey>) -> Option<&PropertyDescriptor> {
        self.properties.get(&key.into())
    }

    pub fn has_own_property(&self, key: impl Into<PropertyKey>) -> bool {
        self.properties.contains_key(&key.into())
    }

    pub fn define_own_property(&mut self, key: impl Into<PropertyKey>, desc: PropertyDescriptor) -> bool {
        let key = key.into();
        if let Some(current) = self.properties.get(&key) {
            if current.configurable == Some(false) {
                if desc.configurable == Some(true) {
                    return false;
                }
                if desc.enumerable.is_some() && desc.enumerable != current.enumerable {
                    return false;
                }
                if current.is_data_descriptor()
                    && desc.is_data_descriptor()
                    && current.writable == Some(false)
                {
                    if desc.writable == Some(true) {
                        return false;
                    }
                    if desc.value.is_some() {
                        return false;
                    }
                }
                if current.is_data_descriptor() != desc.is_data_descriptor() {
                    return false;
                }
            }
        } else if !self.extensible {
            return false;
        }
        self.properties.insert(key, desc);
        true
    }

    pub fn delete_own_property(&mut self, key: impl Into<PropertyKey>) -> bool {
        let key = key.into();
        match self.properties.get(&key) {
            None => true,
            Some(desc) if desc.configurable == Some(false) => false,
            Some(_) => {
                self.properties.remove(&key);
                true
            }
        }
    }

    pub fn insert_value(&mut self, key: impl Into<PropertyKey>, value: JsValue) {
        self.properties
            .insert(key.into(), PropertyDescriptor::data_default(value));
    }

    pub fn insert_builtin(&mut self, key: impl Into<PropertyKey>, value: JsValue) {
        self.properties
            .insert(key.into(), PropertyDescriptor::data(value, true, false, true));
    }

    pub fn insert_property(&mut self, key: impl Into<PropertyKey>, desc: PropertyDescriptor) {
        self.properties.insert(key.into(), desc);
    }

    pub fn get_property_value(&self, key: impl Into<PropertyKey>) -> Option<JsValue> {
        self.properties.get(&key.into()).and_then(|d| d.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_names_compare_by_identity() {
        let a = PrivateName {
            id: 1,
            description: Rc::from("#x"),
        };
        let b = PrivateName {
            id: 2,
            description: Rc::from("#x"),
        };
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        let mut set = FxHashSet::default();
        set.insert(a.clone());
        assert!(!set.contains(&b));
    }

    #[test]
    fn delete_respects_configurable() {
        let mut obj = JsObjectData::new();
        obj.insert_value("a".to_string(), JsValue::Number(1.0));
        obj.insert_property(
            "b".to_string(),
            PropertyDescriptor::data(JsValue::Number(2.0), true, true, false),
        );
        assert!(obj.delete_own_property("a"));
        assert!(!obj.delete_own_property("b"));
        assert!(obj.delete_own_property("missing"));
        assert!(!obj.has_own_property("a"));
        assert!(obj.has_own_property("b"));
    }

    #[test]
    fn non_configurable_read_only_rejects_redefinition() {
        let mut obj = JsObjectData::new();
        obj.insert_property(
            "k".to_string(),
            PropertyDescriptor::data(JsValue::Number(1.0), false, false, false),
        );
        assert!(!obj.define_own_property(
            "k".to_string(),
            PropertyDescriptor::data(JsValue::Number(2.0), false, false, false),
        ));
        assert_eq!(obj.get_property("k").as_number(), Some(1.0));
    }

    #[test]
    fn lookup_walks_prototype_chain() {
        let proto = Rc::new(RefCell::new(JsObjectData::new()));
        proto
            .borrow_mut()
            .insert_value("inherited".to_string(), JsValue::Boolean(true));
        let mut obj = JsObjectData::new();
        obj.prototype = Some(proto);
        assert!(matches!(obj.get_property("inherited"), JsValue::Boolean(true)));
        assert!(!obj.has_own_property("inherited"));
        assert!(obj.get_property_descriptor("inherited").is_some());
    }

    #[test]
    fn symbol_keys_live_apart_from_string_keys() {
        let tag = JsSymbol {
            id: 1,
            description: Some(crate::types::JsString::from_str("tag")),
        };
        let mut obj = JsObjectData::new();
        obj.insert_value(&tag, JsValue::Number(1.0));
        obj.insert_value(format!("{}", PropertyKey::from(&tag)), JsValue::Number(2.0));
        obj.insert_value("Symbol(tag)#1", JsValue::Number(3.0));
        assert_eq!(obj.get_property(&tag).as_number(), Some(1.0));
        assert_eq!(obj.get_property("Symbol(tag)").as_number(), Some(2.0));
        assert_eq!(obj.properties.len(), 3);
    }
}
