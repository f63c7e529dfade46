//! World - Native component memory with locked byte accessors
//!
//! The world owns one byte block per (entity, component). It is the only
//! place native memory lives; everything else reaches it through the
//! [`ComponentAccess`] trait using a [`ComponentHandle`] plus byte offsets.

use std::collections::HashMap;

use bytemuck::Pod;
use parking_lot::RwLock;
use thiserror::Error;

use crate::component::{ComponentId, ComponentInfo, ComponentRegistry, PropertyDescriptor};
use crate::entity::{Entity, EntityAllocator};

/// Address of one component instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    /// Owning entity
    pub entity: Entity,
    /// Component type
    pub component: ComponentId,
}

impl ComponentHandle {
    /// Create a handle
    pub const fn new(entity: Entity, component: ComponentId) -> Self {
        Self { entity, component }
    }
}

/// Native memory access errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Entity was despawned or the component removed
    #[error("component handle {0:?} is no longer valid")]
    StaleHandle(ComponentHandle),
    /// Range does not fit inside the component
    #[error("range {offset}..{end} is outside component of {size} bytes")]
    OutOfBounds { offset: usize, end: usize, size: usize },
    /// Component type is not registered
    #[error("component {0:?} is not registered")]
    UnknownComponent(ComponentId),
}

/// Byte-level access to native component memory.
///
/// Implementations lock internally; each call is atomic with respect to
/// other calls on the same storage.
pub trait ComponentAccess: Send + Sync {
    /// Copy `out.len()` bytes starting at `offset`
    fn read(&self, handle: ComponentHandle, offset: usize, out: &mut [u8]) -> Result<(), AccessError>;

    /// Overwrite bytes starting at `offset`
    fn write(&self, handle: ComponentHandle, offset: usize, bytes: &[u8]) -> Result<(), AccessError>;

    /// True while the handle addresses live memory
    fn is_alive(&self, handle: ComponentHandle) -> bool;

    /// Field metadata of the component behind `handle`
    fn properties(&self, handle: ComponentHandle) -> Vec<PropertyDescriptor>;

    /// Component type name
    fn component_name(&self, handle: ComponentHandle) -> Option<String>;

    /// A single field by name
    fn descriptor(&self, handle: ComponentHandle, name: &str) -> Option<PropertyDescriptor> {
        self.properties(handle).into_iter().find(|p| p.name == name)
    }
}

#[derive(Default)]
struct WorldState {
    entities: EntityAllocator,
    components: ComponentRegistry,
    data: HashMap<ComponentHandle, Vec<u8>>,
}

impl WorldState {
    fn block(&self, handle: ComponentHandle) -> Result<&Vec<u8>, AccessError> {
        if !self.entities.is_alive(handle.entity) {
            return Err(AccessError::StaleHandle(handle));
        }
        self.data.get(&handle).ok_or(AccessError::StaleHandle(handle))
    }

    fn block_mut(&mut self, handle: ComponentHandle) -> Result<&mut Vec<u8>, AccessError> {
        if !self.entities.is_alive(handle.entity) {
            return Err(AccessError::StaleHandle(handle));
        }
        self.data.get_mut(&handle).ok_or(AccessError::StaleHandle(handle))
    }
}

fn check_range(offset: usize, len: usize, size: usize) -> Result<(), AccessError> {
    let end = offset.saturating_add(len);
    if end > size {
        return Err(AccessError::OutOfBounds { offset, end, size });
    }
    Ok(())
}

/// Entity/component storage
#[derive(Default)]
pub struct World {
    state: RwLock<WorldState>,
}

impl World {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type
    pub fn register_component(&self, info: ComponentInfo) -> ComponentId {
        if !info.is_layout_valid() {
            log::warn!("Component '{}' declares fields outside its {} bytes", info.name, info.size);
        }
        self.state.write().components.register(info)
    }

    /// Look up a component id by name
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.state.read().components.get_id(name)
    }

    /// Spawn an empty entity
    pub fn spawn(&self) -> Entity {
        self.state.write().entities.allocate()
    }

    /// Despawn an entity and drop all its component memory
    pub fn despawn(&self, entity: Entity) -> bool {
        let mut state = self.state.write();
        if !state.entities.deallocate(entity) {
            return false;
        }
        state.data.retain(|handle, _| handle.entity != entity);
        true
    }

    /// Check if an entity is alive
    pub fn is_entity_alive(&self, entity: Entity) -> bool {
        self.state.read().entities.is_alive(entity)
    }

    /// Attach a zero-initialised component
    pub fn add_component(&self, entity: Entity, component: ComponentId) -> Result<ComponentHandle, AccessError> {
        let mut state = self.state.write();
        let size = state
            .components
            .get(component)
            .map(|info| info.size)
            .ok_or(AccessError::UnknownComponent(component))?;
        let handle = ComponentHandle::new(entity, component);
        if !state.entities.is_alive(entity) {
            return Err(AccessError::StaleHandle(handle));
        }
        state.data.insert(handle, vec![0; size]);
        Ok(handle)
    }

    /// Attach a component initialised from a plain-old-data value
    pub fn add_component_with<T: Pod>(
        &self,
        entity: Entity,
        component: ComponentId,
        value: T,
    ) -> Result<ComponentHandle, AccessError> {
        let handle = self.add_component(entity, component)?;
        self.write(handle, 0, bytemuck::bytes_of(&value))?;
        Ok(handle)
    }

    /// Detach a component
    pub fn remove_component(&self, handle: ComponentHandle) -> bool {
        self.state.write().data.remove(&handle).is_some()
    }

    /// Read a typed field at `offset`
    pub fn read_field<T: Pod>(&self, handle: ComponentHandle, offset: usize) -> Result<T, AccessError> {
        let mut value = T::zeroed();
        self.read(handle, offset, bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }

    /// Write a typed field at `offset`
    pub fn write_field<T: Pod>(&self, handle: ComponentHandle, offset: usize, value: T) -> Result<(), AccessError> {
        self.write(handle, offset, bytemuck::bytes_of(&value))
    }
}

impl ComponentAccess for World {
    fn read(&self, handle: ComponentHandle, offset: usize, out: &mut [u8]) -> Result<(), AccessError> {
        let state = self.state.read();
        let block = state.block(handle)?;
        check_range(offset, out.len(), block.len())?;
        out.copy_from_slice(&block[offset..offset + out.len()]);
        Ok(())
    }

    fn write(&self, handle: ComponentHandle, offset: usize, bytes: &[u8]) -> Result<(), AccessError> {
        let mut state = self.state.write();
        let block = state.block_mut(handle)?;
        check_range(offset, bytes.len(), block.len())?;
        block[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn is_alive(&self, handle: ComponentHandle) -> bool {
        self.state.read().block(handle).is_ok()
    }

    fn properties(&self, handle: ComponentHandle) -> Vec<PropertyDescriptor> {
        self.state
            .read()
            .components
            .get(handle.component)
            .map(|info| info.properties.clone())
            .unwrap_or_default()
    }

    fn component_name(&self, handle: ComponentHandle) -> Option<String> {
        self.state
            .read()
            .components
            .get(handle.component)
            .map(|info| info.name.clone())
    }
}
