//! Runtime type information keyed by [`TypeUid`]
//!
//! Stores the metadata the property runtime needs to reason about value
//! types without knowing them statically: names, layout and declared
//! compatibility between types.

use core::fmt;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;

use crate::error::TypeRegistryError;
use crate::id::TypeUid;

/// Information about a registered type
#[derive(Clone)]
pub struct TypeInfo {
    /// 128-bit uid
    pub uid: TypeUid,
    /// Human-readable type name
    pub name: String,
    /// Size in bytes
    pub size: usize,
    /// Alignment requirement
    pub align: usize,
    /// Other uids a value of this type may be assigned from
    pub compatible: BTreeSet<TypeUid>,
}

impl TypeInfo {
    /// Create type info for a concrete type
    pub fn of<T: 'static>() -> Self {
        Self {
            uid: TypeUid::of::<T>(),
            name: core::any::type_name::<T>().into(),
            size: core::mem::size_of::<T>(),
            align: core::mem::align_of::<T>(),
            compatible: BTreeSet::new(),
        }
    }

    /// Declare another uid as assignable to this type
    pub fn with_compatible(mut self, uid: TypeUid) -> Self {
        self.compatible.insert(uid);
        self
    }

    /// Check if a value of `uid` may be stored in this type
    pub fn accepts(&self, uid: TypeUid) -> bool {
        self.uid == uid || self.compatible.contains(&uid)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("uid", &self.uid)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

/// Table of all known value types
pub struct TypeRegistry {
    by_uid: BTreeMap<TypeUid, TypeInfo>,
    by_name: BTreeMap<String, TypeUid>,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            by_uid: BTreeMap::new(),
            by_name: BTreeMap::new(),
        }
    }

    /// Register a type; re-registering the same type replaces its info
    pub fn register(&mut self, info: TypeInfo) -> Result<TypeUid, TypeRegistryError> {
        if let Some(existing) = self.by_uid.get(&info.uid) {
            if existing.name != info.name {
                return Err(TypeRegistryError::UidCollision {
                    existing: existing.name.as_str().into(),
                    new: info.name.as_str().into(),
                });
            }
        }
        let uid = info.uid;
        self.by_name.insert(info.name.clone(), uid);
        self.by_uid.insert(uid, info);
        Ok(uid)
    }

    /// Get type info by uid
    pub fn get(&self, uid: TypeUid) -> Option<&TypeInfo> {
        self.by_uid.get(&uid)
    }

    /// Get type info by name
    pub fn get_by_name(&self, name: &str) -> Option<&TypeInfo> {
        self.by_name.get(name).and_then(|uid| self.by_uid.get(uid))
    }

    /// Check if a type is registered
    pub fn contains(&self, uid: TypeUid) -> bool {
        self.by_uid.contains_key(&uid)
    }

    /// Check whether a value of type `from` may be assigned to type `to`
    pub fn is_compatible(&self, to: TypeUid, from: TypeUid) -> bool {
        if to == from {
            return true;
        }
        self.by_uid.get(&to).map(|info| info.accepts(from)).unwrap_or(false)
    }

    /// Remove a type
    pub fn unregister(&mut self, uid: TypeUid) -> Result<TypeInfo, TypeRegistryError> {
        let info = self
            .by_uid
            .remove(&uid)
            .ok_or_else(|| TypeRegistryError::NotRegistered(alloc::format!("{}", uid).into()))?;
        self.by_name.remove(&info.name);
        Ok(info)
    }

    /// Iterate over all registered types
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.by_uid.values()
    }

    /// Get the number of registered types
    pub fn len(&self) -> usize {
        self.by_uid.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.by_uid.is_empty()
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.by_uid.clear();
        self.by_name.clear();
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.by_uid.len())
            .finish()
    }
}
