//! Shared ownership primitives for runtime values.
//!
//! We use parking_lot because:
//! - It has no poisoning (a failed native call cannot wedge a list).
//! - Values stay `Send + Sync`, so a `CodeUnit` can be handed to worker threads.

pub use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use std::sync::Arc;

/// Alias for the common pattern Arc<RwLock<T>>
pub type Shared<T> = Arc<RwLock<T>>;

/// Helper to create Shared<T> easily
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}
