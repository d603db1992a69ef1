//! A class decoration engine on a small JavaScript-style object runtime.
//!
//! Classes are described as Rust values ([`ClassDefinition`],
//! [`ClassElement`]); decorators, methods and initializers are native
//! functions created through the [`Interpreter`].

pub mod decorators;
pub mod error;
pub mod interpreter;
pub mod scenarios;
pub mod types;

pub use decorators::{
    ClassDefinition, ClassElement, DecoratorExpr, DefinedClass, ElementKey, ElementKind, Initializer,
    Placement,
};
pub use error::{DecorationError, ErrorKind};
pub use interpreter::{Interpreter, PrivateName};
pub use types::{JsObject, JsString, JsSymbol, JsValue};
