//! Private names and brands.
//!
//! Private fields live in the receiver's own `private_elements` table.
//! Private methods and accessors live once per declaration in the
//! interpreter's `private_methods` table, each behind the brand of the class
//! that declared it; a receiver reaches them only if it carries that brand.

use super::*;

impl Interpreter {
    pub(crate) fn install_brand(&mut self, target: &JsValue, brand: Brand) {
        if let Some(obj) = self.object_of(target) {
            obj.borrow_mut().brands.insert(brand);
        }
    }

    pub fn has_brand(&self, target: &JsValue, brand: Brand) -> bool {
        self.object_of(target)
            .is_some_and(|obj| obj.borrow().brands.contains(&brand))
    }

    pub(crate) fn register_private_method(&mut self, name: PrivateName, link: BrandLink) {
        self.private_methods.insert(name, link);
    }

    /// Drop the methods of a class whose definition did not complete.
    pub(crate) fn unregister_private_methods(&mut self, names: &[PrivateName]) {
        for name in names {
            self.private_methods.remove(name);
        }
    }

    pub(crate) fn private_method(&self, name: &PrivateName) -> Option<BrandLink> {
        self.private_methods.get(name).cloned()
    }

    fn private_violation(&mut self, receiver: &JsValue, name: &PrivateName) -> JsValue {
        let msg = format!(
            "Cannot access private member {} from {} whose class did not declare it",
            name.description(),
            if receiver.is_object() {
                "an object"
            } else {
                "a non-object"
            }
        );
        self.create_engine_error(ErrorKind::PrivateAccessViolation, &msg)
    }

    /// Look up `name` on `receiver`: its own private field first, then a
    /// method or accessor guarded by a brand the receiver carries.
    fn resolve_private(&self, receiver: &JsValue, name: &PrivateName) -> Option<PrivateElement> {
        let obj = self.object_of(receiver)?;
        let obj = obj.borrow();
        if let Some(field) = obj.private_elements.get(name) {
            return Some(field.clone());
        }
        let link = self.private_methods.get(name)?;
        obj.brands
            .contains(&link.brand)
            .then(|| link.element.clone())
    }

    pub fn private_get(&mut self, receiver: &JsValue, name: &PrivateName) -> Result<JsValue, JsValue> {
        match self.resolve_private(receiver, name) {
            Some(PrivateElement::Field(v)) | Some(PrivateElement::Method(v)) => Ok(v),
            Some(PrivateElement::Accessor { get: Some(getter), .. }) => {
                self.call(&getter, receiver, &[])
            }
            Some(PrivateElement::Accessor { get: None, .. }) => {
                Err(self.create_engine_error(
                    ErrorKind::PrivateAccessViolation,
                    &format!(
                        "'{}' was defined without a getter",
                        name.description()
                    ),
                ))
            }
            None => Err(self.private_violation(receiver, name)),
        }
    }

    pub fn private_set(
        &mut self,
        receiver: &JsValue,
        name: &PrivateName,
        value: JsValue,
    ) -> Result<(), JsValue> {
        match self.resolve_private(receiver, name) {
            Some(PrivateElement::Field(_)) => {
                if let Some(obj) = self.object_of(receiver) {
                    obj.borrow_mut()
                        .private_elements
                        .insert(name.clone(), PrivateElement::Field(value));
                }
                Ok(())
            }
            Some(PrivateElement::Method(_)) => Err(self.create_engine_error(
                ErrorKind::PrivateAccessViolation,
                &format!("Private method {} is not writable", name.description()),
            )),
            Some(PrivateElement::Accessor { set: Some(setter), .. }) => {
                self.call(&setter, receiver, &[value]).map(|_| ())
            }
            Some(PrivateElement::Accessor { set: None, .. }) => Err(self.create_engine_error(
                ErrorKind::PrivateAccessViolation,
                &format!("'{}' was defined without a setter", name.description()),
            )),
            None => Err(self.private_violation(receiver, name)),
        }
    }

    /// Define a private field on `receiver`; a field is added at most once.
    pub(crate) fn private_field_add(
        &mut self,
        receiver: &JsValue,
        name: &PrivateName,
        value: JsValue,
    ) -> Result<(), JsValue> {
        let Some(obj) = self.object_of(receiver) else {
            return Err(self.private_violation(receiver, name));
        };
        if obj.borrow().private_elements.contains_key(name) {
            return Err(self.create_engine_error(
                ErrorKind::PrivateAccessViolation,
                &format!(
                    "Cannot initialize {} twice on the same object",
                    name.description()
                ),
            ));
        }
        obj.borrow_mut()
            .private_elements
            .insert(name.clone(), PrivateElement::Field(value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_keyed_by_identity_not_spelling() {
        let mut interp = Interpreter::new();
        let a = interp.new_private_name("#x");
        let b = interp.new_private_name("#x");
        let obj = interp.new_object();
        interp.private_field_add(&obj, &a, JsValue::Number(1.0)).unwrap();
        assert_eq!(interp.private_get(&obj, &a).unwrap().as_number(), Some(1.0));
        let err = interp.private_get(&obj, &b).unwrap_err();
        assert_eq!(
            interp.error_kind(&err),
            Some(ErrorKind::PrivateAccessViolation)
        );
    }

    #[test]
    fn fields_cannot_be_added_twice() {
        let mut interp = Interpreter::new();
        let name = interp.new_private_name("#x");
        let obj = interp.new_object();
        interp.private_field_add(&obj, &name, JsValue::Null).unwrap();
        assert!(interp.private_field_add(&obj, &name, JsValue::Null).is_err());
        interp.private_set(&obj, &name, JsValue::Number(3.0)).unwrap();
        assert_eq!(interp.private_get(&obj, &name).unwrap().as_number(), Some(3.0));
    }

    #[test]
    fn methods_require_the_brand() {
        let mut interp = Interpreter::new();
        let name = interp.new_private_name("#m");
        let brand = interp.new_brand();
        let method = interp.create_native_function("#m", 0, |_, _, _| Ok(JsValue::Number(5.0)));
        interp.register_private_method(
            name.clone(),
            BrandLink {
                brand,
                element: PrivateElement::Method(method.clone()),
            },
        );
        let branded = interp.new_object();
        let stranger = interp.new_object();
        interp.install_brand(&branded, brand);
        assert!(interp.has_brand(&branded, brand));
        assert!(same_value(&interp.private_get(&branded, &name).unwrap(), &method));
        assert!(interp.private_get(&stranger, &name).is_err());
        assert!(interp.private_set(&branded, &name, JsValue::Null).is_err());
        assert!(interp.private_get(&JsValue::Number(1.0), &name).is_err());
    }
}
