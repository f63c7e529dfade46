//! Component - Native data layouts described by property metadata
//!
//! Components are plain byte blocks. Their public surface is a list of
//! [`PropertyDescriptor`]s (name, type uid, byte offset, size) that the
//! property runtime uses to bind values to native memory.

use std::collections::BTreeMap;

use void_core::TypeUid;

/// Unique identifier for a component type
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Invalid component ID
    pub const INVALID: Self = Self(u32::MAX);

    /// Check if this is a valid ID
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 != u32::MAX
    }
}

/// Metadata for one field of a component
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Field name
    pub name: String,
    /// Declared type of the field
    pub type_uid: TypeUid,
    /// Byte offset inside the component
    pub offset: usize,
    /// Size in bytes
    pub size: usize,
}

impl PropertyDescriptor {
    /// Describe a field of type `T` at `offset`
    pub fn of<T: 'static>(name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            type_uid: TypeUid::of::<T>(),
            offset,
            size: std::mem::size_of::<T>(),
        }
    }

    /// One past the last byte of the field
    #[inline]
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.size)
    }
}

/// Information about a component type
#[derive(Clone, Debug)]
pub struct ComponentInfo {
    /// Unique ID for this component
    pub id: ComponentId,
    /// Type name
    pub name: String,
    /// Size in bytes
    pub size: usize,
    /// Public fields
    pub properties: Vec<PropertyDescriptor>,
}

impl ComponentInfo {
    /// Create info for a named component of `size` bytes
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            id: ComponentId::INVALID,
            name: name.into(),
            size,
            properties: Vec::new(),
        }
    }

    /// Create info sized for a Rust type
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self::new(name, std::mem::size_of::<T>())
    }

    /// Add a field description
    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Find a field by name
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Check that every field fits inside the component
    pub fn is_layout_valid(&self) -> bool {
        self.properties.iter().all(|p| p.end() <= self.size)
    }
}

/// Registry for component types
#[derive(Default)]
pub struct ComponentRegistry {
    components: Vec<ComponentInfo>,
    name_map: BTreeMap<String, ComponentId>,
}

impl ComponentRegistry {
    /// Create a new component registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component; a name already registered returns its id
    pub fn register(&mut self, mut info: ComponentInfo) -> ComponentId {
        if let Some(&id) = self.name_map.get(&info.name) {
            return id;
        }

        let id = ComponentId(self.components.len() as u32);
        info.id = id;
        self.name_map.insert(info.name.clone(), id);
        self.components.push(info);
        id
    }

    /// Get component ID by name
    pub fn get_id(&self, name: &str) -> Option<ComponentId> {
        self.name_map.get(name).copied()
    }

    /// Get component info
    pub fn get(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.components.get(id.0 as usize)
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
