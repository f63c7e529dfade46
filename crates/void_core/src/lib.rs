//! # void_core - Void Engine Core
//!
//! Zero-dependency primitives shared by the property runtime:
//! - **ReturnValue**: the operation result taxonomy
//! - **TypeUid / ObjectId**: 128-bit type identifiers and object ids
//! - **TypeRegistry**: runtime type metadata and compatibility
//!
//! Everything here stays free of external dependencies so it can sit at the
//! bottom of the workspace.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod error;
pub mod id;
pub mod type_registry;

pub use error::*;
pub use id::*;
pub use type_registry::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ReturnValue, TypeRegistryError};
    pub use crate::id::{ObjectId, TypeUid};
    pub use crate::type_registry::{TypeInfo, TypeRegistry};
}
