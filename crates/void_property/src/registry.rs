//! Object registry - factories keyed by [`TypeUid`]
//!
//! Holds everything needed to build values of a type without naming it:
//! type metadata, default values, native byte codecs, JSON codecs and
//! named modifier factories. Lookups take a shared lock; registration
//! takes it exclusively.
//!
//! Registries are passed around as `Arc<ObjectRegistry>`. A process-wide
//! instance is available through [`init`] / [`global`] / [`shutdown`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use void_core::{TypeInfo, TypeRegistry, TypeRegistryError, TypeUid};

use crate::any::{Any, AnyType};
use crate::engine::ByteCodec;
use crate::modifier::{Modifier, ReadOnlyModifier};
use crate::property::StackProperty;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Type(#[from] TypeRegistryError),
    #[error("modifier factory '{0}' is already registered")]
    DuplicateModifier(String),
    #[error("object registry is not initialised")]
    NotInitialized,
}

/// Converts between an [`Any`] and JSON
#[derive(Clone, Copy)]
pub struct JsonCodec {
    uid: TypeUid,
    type_name: &'static str,
    to_json: fn(&Any) -> Option<serde_json::Result<serde_json::Value>>,
    from_json: fn(&serde_json::Value) -> serde_json::Result<Any>,
}

fn to_json<T: AnyType + Serialize>(value: &Any) -> Option<serde_json::Result<serde_json::Value>> {
    value.get_ref::<T>().map(serde_json::to_value)
}

fn from_json<T: AnyType + DeserializeOwned>(json: &serde_json::Value) -> serde_json::Result<Any> {
    T::deserialize(json).map(Any::new)
}

impl JsonCodec {
    /// Codec for a serde type
    pub fn of<T: AnyType + Serialize + DeserializeOwned>() -> Self {
        Self {
            uid: TypeUid::of::<T>(),
            type_name: std::any::type_name::<T>(),
            to_json: to_json::<T>,
            from_json: from_json::<T>,
        }
    }

    /// Type this codec handles
    pub fn type_uid(&self) -> TypeUid {
        self.uid
    }

    /// JSON of `value`; `None` if it holds another type
    pub fn to_json(&self, value: &Any) -> Option<serde_json::Result<serde_json::Value>> {
        (self.to_json)(value)
    }

    /// Value from JSON
    pub fn from_json(&self, json: &serde_json::Value) -> serde_json::Result<Any> {
        (self.from_json)(json)
    }
}

impl fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCodec").field("type", &self.type_name).finish()
    }
}

/// Builds a fresh modifier
pub type ModifierFactory = Arc<dyn Fn() -> Arc<dyn Modifier> + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    types: TypeRegistry,
    defaults: HashMap<TypeUid, fn() -> Any>,
    codecs: HashMap<TypeUid, ByteCodec>,
    json: HashMap<TypeUid, JsonCodec>,
    modifiers: HashMap<String, ModifierFactory>,
}

/// Type-keyed factories and codecs
#[derive(Default)]
pub struct ObjectRegistry {
    state: RwLock<RegistryState>,
}

impl ObjectRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the scalar and glam vector types and the built-in
    /// `read_only` modifier
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let results = [
            registry.register_native::<f32>(),
            registry.register_native::<f64>(),
            registry.register_native::<i32>(),
            registry.register_native::<i64>(),
            registry.register_native::<u32>(),
            registry.register_native::<u64>(),
            registry.register_serde::<bool>(),
            registry.register_serde::<String>(),
            registry.register_native::<glam::Vec2>(),
            registry.register_native::<glam::Vec3>(),
            registry.register_native::<glam::Vec4>(),
            registry.register_native::<glam::Quat>(),
        ];
        for result in results {
            if let Err(err) = result {
                log::error!("registry: default registration failed: {}", err);
            }
        }
        let read_only = registry.register_modifier("read_only", || {
            Arc::new(ReadOnlyModifier) as Arc<dyn Modifier>
        });
        if let Err(err) = read_only {
            log::error!("registry: {}", err);
        }
        registry
    }

    /// Register type metadata and a default-value factory
    pub fn register_type<T: AnyType>(&self) -> Result<TypeUid, RegistryError> {
        let mut state = self.state.write();
        let uid = state.types.register(TypeInfo::of::<T>())?;
        state.defaults.insert(uid, Any::of_default::<T>);
        log::trace!("registry: type {}", std::any::type_name::<T>());
        Ok(uid)
    }

    /// Register a type that can live in native component memory
    pub fn register_pod<T: AnyType + Pod>(&self) -> Result<TypeUid, RegistryError> {
        let uid = self.register_type::<T>()?;
        self.state.write().codecs.insert(uid, ByteCodec::of::<T>());
        Ok(uid)
    }

    /// Register a type that can be exported to JSON
    pub fn register_serde<T: AnyType + Serialize + DeserializeOwned>(&self) -> Result<TypeUid, RegistryError> {
        let uid = self.register_type::<T>()?;
        self.state.write().json.insert(uid, JsonCodec::of::<T>());
        Ok(uid)
    }

    /// [`register_pod`](Self::register_pod) and
    /// [`register_serde`](Self::register_serde) together
    pub fn register_native<T>(&self) -> Result<TypeUid, RegistryError>
    where
        T: AnyType + Pod + Serialize + for<'de> Deserialize<'de>,
    {
        self.register_pod::<T>()?;
        self.register_serde::<T>()
    }

    /// Register a named modifier factory
    pub fn register_modifier<F>(&self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Arc<dyn Modifier> + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        if state.modifiers.contains_key(name) {
            return Err(RegistryError::DuplicateModifier(name.to_string()));
        }
        state.modifiers.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Default value of a registered type
    pub fn create_any(&self, uid: TypeUid) -> Option<Any> {
        let factory = self.state.read().defaults.get(&uid).copied()?;
        Some(factory())
    }

    /// New property of a registered type, holding its default value
    pub fn create_property(&self, uid: TypeUid, name: &str) -> Option<Arc<StackProperty>> {
        self.create_any(uid).map(|default| StackProperty::new(name, default))
    }

    /// New modifier from a named factory
    pub fn create_modifier(&self, name: &str) -> Option<Arc<dyn Modifier>> {
        let factory = self.state.read().modifiers.get(name).cloned()?;
        Some(factory())
    }

    /// Native codec of a type
    pub fn codec(&self, uid: TypeUid) -> Option<ByteCodec> {
        self.state.read().codecs.get(&uid).copied()
    }

    /// JSON codec of a type
    pub fn json_codec(&self, uid: TypeUid) -> Option<JsonCodec> {
        self.state.read().json.get(&uid).copied()
    }

    /// Type metadata
    pub fn type_info(&self, uid: TypeUid) -> Option<TypeInfo> {
        self.state.read().types.get(uid).cloned()
    }

    /// Whether a value of `from` may be stored in `to`
    pub fn is_compatible(&self, to: TypeUid, from: TypeUid) -> bool {
        self.state.read().types.is_compatible(to, from)
    }

    /// Number of registered types
    pub fn type_count(&self) -> usize {
        self.state.read().types.len()
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ObjectRegistry")
            .field("types", &state.types.len())
            .field("codecs", &state.codecs.len())
            .field("json", &state.json.len())
            .field("modifiers", &state.modifiers.len())
            .finish()
    }
}

static GLOBAL: RwLock<Option<Arc<ObjectRegistry>>> = parking_lot::const_rwlock(None);

/// Create the process-wide registry (with defaults) if needed and return it
pub fn init() -> Arc<ObjectRegistry> {
    let mut global = GLOBAL.write();
    global
        .get_or_insert_with(|| {
            log::debug!("registry: initialised");
            Arc::new(ObjectRegistry::with_defaults())
        })
        .clone()
}

/// The process-wide registry
pub fn global() -> Result<Arc<ObjectRegistry>, RegistryError> {
    GLOBAL.read().clone().ok_or(RegistryError::NotInitialized)
}

/// Drop the process-wide registry. Holders of an `Arc` keep theirs.
pub fn shutdown() -> bool {
    GLOBAL.write().take().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = ObjectRegistry::with_defaults();
        let any = registry.create_any(TypeUid::of::<f32>()).unwrap();
        assert_eq!(any.get::<f32>(), Some(0.0));
        assert!(registry.codec(TypeUid::of::<glam::Vec4>()).is_some());
        assert!(registry.codec(TypeUid::of::<bool>()).is_none());
        assert!(registry.json_codec(TypeUid::of::<bool>()).is_some());
        assert!(registry.create_any(TypeUid::from_name("Unknown")).is_none());

        let property = registry.create_property(TypeUid::of::<i32>(), "count").unwrap();
        assert_eq!(property.get::<i32>(), Some(0));
    }

    #[test]
    fn test_modifier_factories() {
        let registry = ObjectRegistry::with_defaults();
        assert!(registry.create_modifier("read_only").is_some());
        let err = registry
            .register_modifier("read_only", || Arc::new(ReadOnlyModifier) as Arc<dyn Modifier>)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModifier(_)));
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec::of::<glam::Vec2>();
        let json = codec.to_json(&Any::new(glam::Vec2::new(1.0, 2.0))).unwrap().unwrap();
        let back = codec.from_json(&json).unwrap();
        assert_eq!(back.get::<glam::Vec2>(), Some(glam::Vec2::new(1.0, 2.0)));
        assert!(codec.to_json(&Any::new(1u8)).is_none());
    }

    #[test]
    fn test_global_lifecycle() {
        let first = init();
        let second = init();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(global().is_ok());
        assert!(shutdown());
        assert!(matches!(global(), Err(RegistryError::NotInitialized)));
    }
}
