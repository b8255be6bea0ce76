//! stackvm value and operation provider
//!
//! Supplies everything the interpreter treats as opaque: the runtime
//! [`Value`] representation, the [`ValueOps`] capability that gives values
//! their arithmetic, comparison, attribute, iteration and call behaviour,
//! and the [`CodeUnit`] artifact produced by an external compiler.

pub mod builtins;
pub mod code;
pub mod error;
mod methods;
pub mod ops;
pub mod sync;
pub mod value;

// Re-exports
pub use code::{CodeUnit, Constant};
pub use error::OpError;
pub use ops::{BinaryOp, CompareOp, StandardOps, ValueOps};
pub use value::{namespace, Callable, Function, NativeFunction, Namespace, Value, ValueIter};
