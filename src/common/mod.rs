pub mod amounts;
pub mod base58;
pub mod config;
mod error;
mod error_kind;
pub mod hex;

pub use self::error::{Error, Result};
pub use self::error_kind::ErrorKind;
pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use std::sync::Arc;
