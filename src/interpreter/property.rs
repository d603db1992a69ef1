//! Ordinary `[[Get]]`, `[[Set]]`, `[[DefineOwnProperty]]` and `[[Delete]]`
//! on string- and symbol-keyed properties.

use super::*;

impl Interpreter {
    /// Read `receiver[key]`, running an inherited getter with `receiver`
    /// as `this`.
    pub fn get(&mut self, receiver: &JsValue, key: impl Into<PropertyKey>) -> Result<JsValue, JsValue> {
        let key = key.into();
        let obj = match receiver {
            JsValue::Object(o) => self.get_object(o.id),
            JsValue::Undefined | JsValue::Null => {
                return Err(self.create_type_error(&format!(
                    "Cannot read properties of {receiver} (reading '{key}')"
                )));
            }
            // Primitives have no wrapper prototypes here.
            _ => return Ok(JsValue::Undefined),
        };
        let desc = obj.and_then(|o| o.borrow().get_property_descriptor(&key));
        match desc {
            Some(ref d) if d.is_accessor_descriptor() => match &d.get {
                Some(getter) if !getter.is_undefined() => {
                    let getter = getter.clone();
                    self.call(&getter, receiver, &[])
                }
                _ => Ok(JsValue::Undefined),
            },
            Some(d) => Ok(d.value.unwrap_or(JsValue::Undefined)),
            None => Ok(JsValue::Undefined),
        }
    }

    /// Strict-mode assignment `receiver[key] = value`.
    pub fn set(
        &mut self,
        receiver: &JsValue,
        key: impl Into<PropertyKey>,
        value: JsValue,
    ) -> Result<(), JsValue> {
        let key = key.into();
        let obj = match receiver {
            JsValue::Object(o) => match self.get_object(o.id) {
                Some(obj) => obj,
                None => return Ok(()),
            },
            JsValue::Undefined | JsValue::Null => {
                return Err(self.create_type_error(&format!(
                    "Cannot set properties of {receiver} (setting '{key}')"
                )));
            }
            _ => {
                return Err(self.create_type_error(&format!(
                    "Cannot create property '{key}' on {}",
                    self.format_value(receiver)
                )));
            }
        };
        let desc = obj.borrow().get_property_descriptor(&key);
        if let Some(ref d) = desc
            && d.is_accessor_descriptor()
        {
            return match &d.set {
                Some(setter) if !setter.is_undefined() => {
                    let setter = setter.clone();
                    self.call(&setter, receiver, &[value]).map(|_| ())
                }
                _ => Err(self.create_type_error(&format!(
                    "Cannot set property {key} which has only a getter"
                ))),
            };
        }
        if let Some(ref d) = desc
            && d.writable == Some(false)
        {
            return Err(self.create_type_error(&format!(
                "Cannot assign to read only property '{key}'"
            )));
        }
        let mut o = obj.borrow_mut();
        if let Some(own) = o.properties.get_mut(&key) {
            own.value = Some(value);
            return Ok(());
        }
        if !o.extensible {
            drop(o);
            return Err(self.create_type_error(&format!(
                "Cannot add property {key}, object is not extensible"
            )));
        }
        o.insert_value(key, value);
        Ok(())
    }

    /// `[[DefineOwnProperty]]`, throwing when the definition is rejected.
    pub fn define_own_property(
        &mut self,
        target: &JsValue,
        key: impl Into<PropertyKey>,
        desc: PropertyDescriptor,
    ) -> Result<(), JsValue> {
        let key = key.into();
        let Some(obj) = self.object_of(target) else {
            return Err(self.create_type_error("Cannot define a property on a non-object"));
        };
        let ok = obj.borrow_mut().define_own_property(&key, desc);
        if ok {
            Ok(())
        } else {
            Err(self.create_type_error(&format!("Cannot redefine property: {key}")))
        }
    }

    /// Strict-mode `delete target[key]`.
    pub fn delete_property(&mut self, target: &JsValue, key: impl Into<PropertyKey>) -> Result<(), JsValue> {
        let key = key.into();
        let Some(obj) = self.object_of(target) else {
            return Ok(());
        };
        let deleted = obj.borrow_mut().delete_own_property(&key);
        if deleted {
            Ok(())
        } else {
            Err(self.create_type_error(&format!("Cannot delete property '{key}'")))
        }
    }

    pub fn has_own_property(&self, target: &JsValue, key: impl Into<PropertyKey>) -> bool {
        self.object_of(target)
            .is_some_and(|obj| obj.borrow().has_own_property(key))
    }

    /// The `[[Prototype]]` of an object, as a value.
    pub fn get_prototype_of(&self, target: &JsValue) -> JsValue {
        self.object_of(target)
            .and_then(|obj| obj.borrow().prototype.clone())
            .map(|proto| Self::object_value(&proto))
            .unwrap_or(JsValue::Null)
    }

    /// Merge a getter or setter into an accessor property, keeping the
    /// other half when the existing property is already an accessor.
    pub(crate) fn define_accessor_half(
        &mut self,
        target: &JsValue,
        key: impl Into<PropertyKey>,
        getter: Option<JsValue>,
        setter: Option<JsValue>,
    ) -> Result<(), JsValue> {
        let key = key.into();
        let existing = self
            .object_of(target)
            .and_then(|obj| obj.borrow().get_own_property(&key).cloned())
            .filter(PropertyDescriptor::is_accessor_descriptor);
        let (old_get, old_set) = match existing {
            Some(d) => (d.get, d.set),
            None => (None, None),
        };
        let desc = PropertyDescriptor::accessor(
            getter.or(old_get),
            setter.or(old_set),
            false,
            true,
        );
        self.define_own_property(target, key, desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_invokes_inherited_getter_with_receiver() {
        let mut interp = Interpreter::new();
        let proto = interp.new_object();
        let getter = interp.create_native_function("get tag", 0, |interp, this, _| {
            interp.get(this, "own")
        });
        interp
            .define_accessor_half(&proto, "tag", Some(getter), None)
            .unwrap();
        let obj = interp.new_object();
        interp.object_of(&obj).unwrap().borrow_mut().prototype = interp.object_of(&proto);
        interp.set(&obj, "own", JsValue::from("mine")).unwrap();
        let v = interp.get(&obj, "tag").unwrap();
        assert_eq!(v.to_string(), "mine");
    }

    #[test]
    fn set_rejects_read_only_and_getter_only() {
        let mut interp = Interpreter::new();
        let obj = interp.new_object();
        interp
            .define_own_property(
                &obj,
                "fixed",
                PropertyDescriptor::data(JsValue::Number(1.0), false, true, true),
            )
            .unwrap();
        assert!(interp.set(&obj, "fixed", JsValue::Number(2.0)).is_err());
        let getter = interp.create_native_function("get g", 0, |_, _, _| Ok(JsValue::Null));
        interp
            .define_accessor_half(&obj, "g", Some(getter), None)
            .unwrap();
        assert!(interp.set(&obj, "g", JsValue::Number(2.0)).is_err());
    }

    #[test]
    fn accessor_halves_merge() {
        let mut interp = Interpreter::new();
        let obj = interp.new_object();
        let getter = interp.create_native_function("get v", 0, |_, _, _| Ok(JsValue::Number(7.0)));
        let setter = interp.create_native_function("set v", 1, |_, _, _| Ok(JsValue::Undefined));
        interp
            .define_accessor_half(&obj, "v", Some(getter), None)
            .unwrap();
        interp
            .define_accessor_half(&obj, "v", None, Some(setter))
            .unwrap();
        assert_eq!(interp.get(&obj, "v").unwrap().as_number(), Some(7.0));
        assert!(interp.set(&obj, "v", JsValue::Number(1.0)).is_ok());
    }

    #[test]
    fn nullish_receivers_throw_type_errors() {
        let mut interp = Interpreter::new();
        let err = interp.get(&JsValue::Undefined, "x").unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: Cannot read properties of undefined (reading 'x')"
        );
        assert!(interp.set(&JsValue::Null, "x", JsValue::Null).is_err());
        assert!(interp.get(&JsValue::Number(1.0), "x").unwrap().is_undefined());
    }

    #[test]
    fn delete_then_read_is_undefined() {
        let mut interp = Interpreter::new();
        let obj = interp.object_from_entries(&[("a", JsValue::Number(1.0))]);
        interp.delete_property(&obj, "a").unwrap();
        assert!(!interp.has_own_property(&obj, "a"));
        assert!(interp.get(&obj, "a").unwrap().is_undefined());
    }
}
