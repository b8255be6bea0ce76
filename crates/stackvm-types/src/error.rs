//! Errors raised by the value and operation provider

use thiserror::Error;

/// Failure inside a value operation (arithmetic, comparison, attribute
/// access, iteration or a native call).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// Operator applied to operand types it does not support
    #[error("unsupported operand type(s) for {operation}: '{left}' and '{right}'")]
    UnsupportedOperands {
        operation: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// A value of the wrong type was supplied
    #[error("type error in {operation}: expected {expected}, got {got}")]
    TypeError {
        operation: String,
        expected: String,
        got: String,
    },

    /// Attribute lookup failed
    #[error("'{type_name}' object has no attribute '{attr}'")]
    Attribute {
        type_name: &'static str,
        attr: String,
    },

    /// Integer result does not fit in 64 bits
    #[error("integer overflow in '{0}'")]
    Overflow(&'static str),

    /// Repetition result would not fit in memory
    #[error("repeated {0} is too large")]
    TooLarge(&'static str),

    /// Containers nested deeper than [`MAX_NESTING`](crate::value::MAX_NESTING)
    #[error("maximum nesting depth exceeded in {0}")]
    Nesting(&'static str),

    /// Native called with the wrong number of arguments
    #[error("{name}() takes {expected} argument(s) ({got} given)")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// Value is not iterable
    #[error("'{0}' object is not iterable")]
    NotIterable(&'static str),

    /// Index outside the bounds of a sequence
    #[error("{0} index out of range")]
    Index(&'static str),

    /// Argument has the right type but an unusable value
    #[error("{0}")]
    Value(String),
}

impl OpError {
    pub(crate) fn type_error(operation: &str, expected: &str, got: &str) -> Self {
        OpError::TypeError {
            operation: operation.to_string(),
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}
