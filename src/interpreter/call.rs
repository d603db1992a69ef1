use super::*;

impl Interpreter {
    pub fn call_function(&mut self, func_val: &JsValue, this_val: &JsValue, args: &[JsValue]) -> Completion {
        let callable = self
            .object_of(func_val)
            .and_then(|obj| obj.borrow().callable.clone());
        match callable {
            Some(JsFunction::Native(_, _, f)) => f(self, this_val, args),
            Some(JsFunction::Class(name)) => Completion::Throw(self.create_type_error(&format!(
                "Class constructor {name} cannot be invoked without 'new'"
            ))),
            None => Completion::Throw(self.create_type_error(&format!(
                "{} is not a function",
                self.format_value(func_val)
            ))),
        }
    }

    pub fn call(&mut self, func_val: &JsValue, this_val: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
        self.call_function(func_val, this_val, args).into_result()
    }

    /// `new ctor(...args)`.
    pub fn construct(&mut self, ctor: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
        self.construct_with_new_target(ctor, args, ctor)
    }

    pub(crate) fn construct_with_new_target(
        &mut self,
        ctor: &JsValue,
        args: &[JsValue],
        new_target: &JsValue,
    ) -> Result<JsValue, JsValue> {
        if !self.is_constructor(ctor) {
            return Err(self.create_type_error(&format!(
                "{} is not a constructor",
                self.format_value(ctor)
            )));
        }
        let Some(obj) = self.object_of(ctor) else {
            return Err(self.create_type_error("not a constructor"));
        };
        let (callable, class_data) = {
            let o = obj.borrow();
            (o.callable.clone(), o.class_data.clone())
        };
        if let Some(class_data) = class_data {
            let this = match &class_data.parent {
                Some(parent) => self.construct_with_new_target(parent, args, new_target)?,
                None => self.ordinary_create_from_constructor(new_target)?,
            };
            self.run_instance_initializers(ctor, &this)?;
            if let Some(body) = &class_data.body {
                let result = body(self, &this, args).into_result()?;
                if result.is_object() {
                    return Ok(result);
                }
            }
            return Ok(this);
        }
        let this = self.ordinary_create_from_constructor(new_target)?;
        match callable {
            Some(JsFunction::Native(_, _, f)) => {
                let result = f(self, &this, args).into_result()?;
                if result.is_object() {
                    Ok(result)
                } else {
                    Ok(this)
                }
            }
            _ => Ok(this),
        }
    }

    /// A fresh object inheriting from `new_target.prototype`, or from
    /// `Object.prototype` when that is not an object.
    fn ordinary_create_from_constructor(&mut self, new_target: &JsValue) -> Result<JsValue, JsValue> {
        let proto = self.get(new_target, "prototype")?;
        let obj = self.create_object();
        if let Some(proto) = self.object_of(&proto) {
            obj.borrow_mut().prototype = Some(proto);
        }
        Ok(Self::object_value(&obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calling_a_non_function_throws() {
        let mut interp = Interpreter::new();
        let obj = interp.new_object();
        let err = interp.call(&obj, &JsValue::Undefined, &[]).unwrap_err();
        assert_eq!(
            interp.format_value(&err),
            "TypeError: [object Object] is not a function"
        );
    }

    #[test]
    fn native_receives_this_and_args() {
        let mut interp = Interpreter::new();
        let f = interp.create_native_function("pick", 1, |_, this, args| {
            Ok(args.first().cloned().unwrap_or_else(|| this.clone()))
        });
        let v = interp
            .call(&f, &JsValue::Null, &[JsValue::Number(4.0)])
            .unwrap();
        assert_eq!(v.as_number(), Some(4.0));
        let v = interp.call(&f, &JsValue::Boolean(true), &[]).unwrap();
        assert!(matches!(v, JsValue::Boolean(true)));
    }

    #[test]
    fn construct_native_constructor() {
        let mut interp = Interpreter::new();
        let ctor = interp.create_native_constructor("Point", 1, |interp, this, args| {
            let x = args.first().cloned().unwrap_or(JsValue::Undefined);
            interp.set(this, "x", x)?;
            Ok(JsValue::Undefined)
        });
        let p = interp.construct(&ctor, &[JsValue::Number(2.0)]).unwrap();
        assert_eq!(interp.get(&p, "x").unwrap().as_number(), Some(2.0));
        let proto = interp.get(&ctor, "prototype").unwrap();
        assert!(same_value(&interp.get_prototype_of(&p), &proto));
    }

    #[test]
    fn plain_functions_are_not_constructors() {
        let mut interp = Interpreter::new();
        let f = interp.create_native_function("f", 0, |_, _, _| Ok(JsValue::Undefined));
        assert!(interp.construct(&f, &[]).is_err());
    }
}
