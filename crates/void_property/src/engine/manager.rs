use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use void_core::ReturnValue;
use void_ecs::{ComponentAccess, ComponentHandle};

use super::thread::EngineThread;
use super::value::{EnginePropertyParams, EngineSyncDirection, EngineValue, EngineValueOptions};
use crate::registry::ObjectRegistry;

/// Builds and owns [`EngineValue`]s for one native storage
pub struct EngineValueManager {
    access: Arc<dyn ComponentAccess>,
    registry: Arc<ObjectRegistry>,
    defaults: EngineValueOptions,
    values: RwLock<BTreeMap<String, Arc<EngineValue>>>,
}

impl EngineValueManager {
    /// Manager over `access`, using `registry` for native codecs
    pub fn new(access: Arc<dyn ComponentAccess>, registry: Arc<ObjectRegistry>) -> Self {
        Self {
            access,
            registry,
            defaults: EngineValueOptions::default(),
            values: RwLock::new(BTreeMap::new()),
        }
    }

    /// Options used by [`construct_values`](Self::construct_values)
    pub fn with_options(mut self, options: EngineValueOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Default construction options
    pub fn options(&self) -> EngineValueOptions {
        self.defaults
    }

    /// Build an engine value for one native field, replacing any value
    /// with the same name
    pub fn construct_value(
        &self,
        name: impl Into<String>,
        params: EnginePropertyParams,
        options: EngineValueOptions,
    ) -> Result<Arc<EngineValue>, ReturnValue> {
        let name = name.into();
        if !self.access.is_alive(params.handle) {
            log::debug!("engine: cannot bind '{}', handle {:?} is not alive", name, params.handle);
            return Err(ReturnValue::InvalidArgument);
        }
        let Some(codec) = self.registry.codec(params.descriptor.type_uid) else {
            log::debug!("engine: no native codec for '{}' ({:?})", name, params.descriptor.type_uid);
            return Err(ReturnValue::NotSupported);
        };
        let value = EngineValue::new(name.clone(), params, options, codec, self.access.clone())?;
        if self.values.write().insert(name.clone(), value.clone()).is_some() {
            log::debug!("engine: replaced value '{}'", name);
        }
        Ok(value)
    }

    /// One engine value per field of the component behind `handle`, named
    /// `component.field`. Fields without a native codec are skipped.
    pub fn construct_values(&self, handle: ComponentHandle) -> Vec<Arc<EngineValue>> {
        let Some(component) = self.access.component_name(handle) else {
            return Vec::new();
        };
        self.access
            .properties(handle)
            .into_iter()
            .filter_map(|descriptor| {
                let name = format!("{}.{}", component, descriptor.name);
                self.construct_value(name, EnginePropertyParams::new(handle, descriptor), self.defaults)
                    .ok()
            })
            .collect()
    }

    /// Value by name
    pub fn value(&self, name: &str) -> Option<Arc<EngineValue>> {
        self.values.read().get(name).cloned()
    }

    /// Forget a value. Properties still holding it keep its last value.
    pub fn remove_value(&self, name: &str) -> bool {
        self.values.write().remove(name).is_some()
    }

    /// All values, ordered by name
    pub fn values(&self) -> Vec<Arc<EngineValue>> {
        self.values.read().values().cloned().collect()
    }

    /// Forget every value
    pub fn remove_all(&self) {
        self.values.write().clear();
    }

    /// Sync every value. `Success` if anything changed, `Fail` if any
    /// value failed; the others are still synced.
    pub fn sync(&self, thread: &EngineThread, direction: EngineSyncDirection) -> ReturnValue {
        let values = self.values();
        let mut result = ReturnValue::NothingToDo;
        for value in &values {
            match value.sync(thread, direction) {
                ReturnValue::Success if result == ReturnValue::NothingToDo => result = ReturnValue::Success,
                code if code.is_err() => {
                    log::debug!("engine: sync of '{}' failed ({})", value.name(), code);
                    result = ReturnValue::Fail;
                }
                _ => {}
            }
        }
        result
    }

    /// Sync a single value
    pub fn sync_value(&self, thread: &EngineThread, name: &str, direction: EngineSyncDirection) -> ReturnValue {
        match self.value(name) {
            Some(value) => value.sync(thread, direction),
            None => ReturnValue::NotFound,
        }
    }
}

impl fmt::Debug for EngineValueManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineValueManager")
            .field("values", &self.values.read().len())
            .field("defaults", &self.defaults)
            .finish()
    }
}
