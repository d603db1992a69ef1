//! Error types for class definition.
//!
//! Inside the runtime every failure is a thrown JS value. Errors raised by the
//! decoration engine itself are `TypeError` objects tagged with an
//! [`ErrorKind`]; [`DecorationError`] classifies a thrown value at the Rust
//! API boundary.

use thiserror::Error;

use crate::types::JsValue;

/// Categorized failures raised by the decoration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    /// A non-callable value was used where a callable was required.
    #[error("invalid decorator target")]
    InvalidDecoratorTarget,

    /// A decorator returned a value of the wrong shape for its element kind.
    #[error("invalid decorator result")]
    InvalidDecoratorResult,

    /// An access surface was used on a receiver lacking the required brand.
    #[error("private access violation")]
    PrivateAccessViolation,

    /// A member name the builder refuses (reserved or declared twice).
    #[error("duplicate or reserved name")]
    DuplicateOrReservedName,

    /// `addInitializer` was called after the element's decorators returned.
    #[error("initializer added after decoration finished")]
    InitializerAfterDecoration,
}

/// The error returned by [`crate::Interpreter::define_class`].
#[derive(Debug, Error)]
pub enum DecorationError {
    /// The engine rejected the definition.
    #[error("{kind}: {message}")]
    Engine {
        /// What went wrong.
        kind: ErrorKind,
        /// The message of the thrown `TypeError`.
        message: String,
        /// The thrown `TypeError` object.
        value: JsValue,
    },

    /// Code run during the definition (a decorator, an initializer, a
    /// constructor) threw.
    #[error("uncaught exception: {message}")]
    Thrown {
        /// The thrown value, formatted.
        message: String,
        /// The thrown value itself.
        value: JsValue,
    },
}

impl DecorationError {
    /// The engine error kind, if this was raised by the engine.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DecorationError::Engine { kind, .. } => Some(*kind),
            DecorationError::Thrown { .. } => None,
        }
    }

    /// The thrown value, so nested definitions can rethrow it unchanged.
    #[must_use]
    pub fn into_value(self) -> JsValue {
        match self {
            DecorationError::Engine { value, .. } | DecorationError::Thrown { value, .. } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display_includes_kind() {
        let err = DecorationError::Engine {
            kind: ErrorKind::InvalidDecoratorResult,
            message: "field decorators must return a function or undefined".to_string(),
            value: JsValue::Undefined,
        };
        assert_eq!(
            err.to_string(),
            "invalid decorator result: field decorators must return a function or undefined"
        );
        assert_eq!(err.kind(), Some(ErrorKind::InvalidDecoratorResult));
    }

    #[test]
    fn thrown_error_keeps_value() {
        let err = DecorationError::Thrown {
            message: "boom".to_string(),
            value: JsValue::Number(3.0),
        };
        assert_eq!(err.kind(), None);
        assert_eq!(err.into_value().as_number(), Some(3.0));
    }
}
