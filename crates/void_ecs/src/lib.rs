//! # void_ecs - Native Component Storage
//!
//! The simulation-side memory the property runtime synchronises with:
//! - Generational entity IDs for use-after-free safety
//! - Components described by field metadata (name, type uid, offset)
//! - Locked byte-level read/write accessors behind [`ComponentAccess`]
//!
//! ## Example
//!
//! ```
//! use void_ecs::prelude::*;
//!
//! let world = World::new();
//! let light = world.register_component(
//!     ComponentInfo::new("Light", 4).with_property(PropertyDescriptor::of::<f32>("intensity", 0)),
//! );
//! let entity = world.spawn();
//! let handle = world.add_component_with(entity, light, 5.0f32).unwrap();
//! assert_eq!(world.read_field::<f32>(handle, 0).unwrap(), 5.0);
//! ```

pub mod component;
pub mod entity;
pub mod world;

pub use component::{ComponentId, ComponentInfo, ComponentRegistry, PropertyDescriptor};
pub use entity::{Entity, EntityAllocator};
pub use world::{AccessError, ComponentAccess, ComponentHandle, World};

/// Prelude
pub mod prelude {
    pub use crate::component::{ComponentId, ComponentInfo, PropertyDescriptor};
    pub use crate::entity::Entity;
    pub use crate::world::{AccessError, ComponentAccess, ComponentHandle, World};
}
