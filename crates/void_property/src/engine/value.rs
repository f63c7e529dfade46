use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use void_core::{ReturnValue, TypeUid};
use void_ecs::{ComponentAccess, ComponentHandle, PropertyDescriptor};

use super::codec::ByteCodec;
use super::thread::EngineThread;
use crate::any::Any;
use crate::property::StackProperty;
use crate::value::{Value, ValueKind};

/// Direction of an engine sync
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineSyncDirection {
    /// Copy from whichever side changed since the last sync
    #[default]
    Auto,
    /// Cached value to native memory
    ToEngine,
    /// Native memory to cached value
    FromEngine,
}

/// When a write reaches native memory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushMode {
    /// Cache the write and flush it on the next sync
    #[default]
    Deferred,
    /// Write native memory immediately when on the engine thread,
    /// deferred otherwise
    Direct,
}

/// Which side wins an [`EngineSyncDirection::Auto`] sync when both changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    #[default]
    ToEngine,
    FromEngine,
}

/// Where an engine value lives in native memory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnginePropertyParams {
    /// Component instance
    pub handle: ComponentHandle,
    /// Field metadata
    pub descriptor: PropertyDescriptor,
    /// Added to the descriptor offset, for fields of nested structs
    pub base_offset: usize,
}

impl EnginePropertyParams {
    /// Params for a top-level field
    pub fn new(handle: ComponentHandle, descriptor: PropertyDescriptor) -> Self {
        Self {
            handle,
            descriptor,
            base_offset: 0,
        }
    }

    /// Byte offset of the field inside the component, `None` on overflow
    pub fn offset(&self) -> Option<usize> {
        self.base_offset.checked_add(self.descriptor.offset)
    }
}

/// Construction options for an [`EngineValue`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EngineValueOptions {
    pub push_mode: PushMode,
    /// Directions this value may sync in; `Auto` allows both
    pub direction: EngineSyncDirection,
    pub conflict: ConflictPolicy,
}

struct EngineState {
    value: Any,
    default: Any,
    local_dirty: bool,
    // native bytes as of the last sync
    snapshot: Vec<u8>,
    valid: bool,
}

/// Value-stack entry mirroring a field of native component memory
pub struct EngineValue {
    name: String,
    params: EnginePropertyParams,
    options: EngineValueOptions,
    codec: ByteCodec,
    access: Arc<dyn ComponentAccess>,
    state: Mutex<EngineState>,
    owner: Mutex<Weak<StackProperty>>,
}

impl EngineValue {
    pub(crate) fn new(
        name: String,
        params: EnginePropertyParams,
        options: EngineValueOptions,
        codec: ByteCodec,
        access: Arc<dyn ComponentAccess>,
    ) -> Result<Arc<Self>, ReturnValue> {
        let default = codec.zeroed().ok_or(ReturnValue::IncompatibleTypes)?;
        Ok(Arc::new(Self {
            name,
            params,
            options,
            codec,
            access,
            state: Mutex::new(EngineState {
                value: default.clone(),
                default,
                local_dirty: false,
                snapshot: Vec::new(),
                valid: true,
            }),
            owner: Mutex::new(Weak::new()),
        }))
    }

    /// Name, `component.field` for manager-built values
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native location
    pub fn params(&self) -> &EnginePropertyParams {
        &self.params
    }

    /// Construction options
    pub fn options(&self) -> EngineValueOptions {
        self.options
    }

    /// Declared value type
    pub fn type_uid(&self) -> TypeUid {
        self.codec.type_uid()
    }

    /// True if a write is waiting for a sync
    pub fn is_dirty(&self) -> bool {
        self.state.lock().local_dirty
    }

    /// False once the native handle went stale
    pub fn is_bound(&self) -> bool {
        self.state.lock().valid
    }

    fn allows(&self, direction: EngineSyncDirection) -> bool {
        self.options.direction == EngineSyncDirection::Auto || self.options.direction == direction
    }

    fn layout_matches(&self) -> bool {
        let matches = self.params.descriptor.type_uid == self.codec.type_uid()
            && self.params.descriptor.size == self.codec.size();
        if !matches {
            log::warn!(
                "engine value '{}': declared {} bytes of {:?}, native field is {} bytes of {:?}",
                self.name,
                self.codec.size(),
                self.codec.type_uid(),
                self.params.descriptor.size,
                self.params.descriptor.type_uid
            );
        }
        matches
    }

    fn native_offset(&self) -> Result<usize, ReturnValue> {
        self.params.offset().ok_or_else(|| {
            log::warn!(
                "engine value '{}': offset {} + {} overflows",
                self.name,
                self.params.base_offset,
                self.params.descriptor.offset
            );
            ReturnValue::InvalidArgument
        })
    }

    // Caller holds the state lock. Returns true if the cached value changed.
    fn invalidate(&self, state: &mut EngineState) -> bool {
        if state.valid {
            log::warn!(
                "engine value '{}': component {:?} is gone, falling back to default",
                self.name,
                self.params.handle
            );
        }
        state.valid = false;
        state.local_dirty = false;
        let default = state.default.clone();
        state.value.set_value(&default).changed()
    }

    /// Copy between the cached value and native memory
    pub fn sync(&self, thread: &EngineThread, direction: EngineSyncDirection) -> ReturnValue {
        thread.debug_check();
        let (code, changed) = self.sync_locked(direction);
        if changed {
            self.notify_owner();
        }
        code
    }

    fn sync_locked(&self, direction: EngineSyncDirection) -> (ReturnValue, bool) {
        let mut state = self.state.lock();
        if !self.access.is_alive(self.params.handle) {
            let changed = self.invalidate(&mut state);
            return (ReturnValue::Fail, changed);
        }
        if !self.layout_matches() {
            return (ReturnValue::IncompatibleTypes, false);
        }
        let offset = match self.native_offset() {
            Ok(offset) => offset,
            Err(code) => return (code, false),
        };

        let mut native = vec![0u8; self.codec.size()];
        if let Err(err) = self.access.read(self.params.handle, offset, &mut native) {
            log::warn!("engine value '{}': read failed: {}", self.name, err);
            return (ReturnValue::Fail, false);
        }
        state.valid = true;
        let engine_dirty = native != state.snapshot;

        let resolved = match direction {
            EngineSyncDirection::Auto => match (state.local_dirty, engine_dirty) {
                (true, true) => match self.options.conflict {
                    ConflictPolicy::ToEngine => EngineSyncDirection::ToEngine,
                    ConflictPolicy::FromEngine => EngineSyncDirection::FromEngine,
                },
                (true, false) => EngineSyncDirection::ToEngine,
                (false, true) => EngineSyncDirection::FromEngine,
                (false, false) => return (ReturnValue::NothingToDo, false),
            },
            explicit => explicit,
        };
        if !self.allows(resolved) {
            return if direction == EngineSyncDirection::Auto {
                (ReturnValue::NothingToDo, false)
            } else {
                (ReturnValue::NotSupported, false)
            };
        }

        match resolved {
            EngineSyncDirection::ToEngine => {
                let Some(bytes) = self.codec.encode(&state.value) else {
                    return (ReturnValue::IncompatibleTypes, false);
                };
                state.local_dirty = false;
                if bytes == native {
                    state.snapshot = native;
                    return (ReturnValue::NothingToDo, false);
                }
                if let Err(err) = self.access.write(self.params.handle, offset, &bytes) {
                    log::warn!("engine value '{}': write failed: {}", self.name, err);
                    return (ReturnValue::Fail, false);
                }
                log::trace!("engine value '{}': pushed to engine", self.name);
                state.snapshot = bytes;
                (ReturnValue::Success, false)
            }
            _ => {
                let Some(decoded) = self.codec.decode(&native) else {
                    return (ReturnValue::IncompatibleTypes, false);
                };
                let changed = state.value.set_value(&decoded).changed();
                state.snapshot = native;
                state.local_dirty = false;
                let code = if changed {
                    ReturnValue::Success
                } else {
                    ReturnValue::NothingToDo
                };
                (code, changed)
            }
        }
    }

    // Layout was checked by the caller
    fn push_direct(&self, state: &mut EngineState) {
        let Ok(offset) = self.native_offset() else {
            return;
        };
        let Some(bytes) = self.codec.encode(&state.value) else {
            return;
        };
        match self.access.write(self.params.handle, offset, &bytes) {
            Ok(()) => {
                state.snapshot = bytes;
                state.local_dirty = false;
            }
            Err(err) => log::debug!("engine value '{}': direct push failed: {}", self.name, err),
        }
    }

    fn notify_owner(&self) {
        let owner = self.owner.lock().upgrade();
        if let Some(owner) = owner {
            owner.refresh();
        }
    }
}

impl Value for EngineValue {
    fn get_value(&self) -> Result<Any, ReturnValue> {
        let mut state = self.state.lock();
        if state.valid && !self.access.is_alive(self.params.handle) {
            self.invalidate(&mut state);
        }
        Ok(state.value.clone())
    }

    fn set_value(&self, value: &Any) -> ReturnValue {
        if !self.allows(EngineSyncDirection::ToEngine) {
            return ReturnValue::NotSupported;
        }
        if !self.is_compatible(value.type_uid()) || !self.layout_matches() {
            return ReturnValue::IncompatibleTypes;
        }
        let mut state = self.state.lock();
        if !state.valid || !self.access.is_alive(self.params.handle) {
            self.invalidate(&mut state);
            return ReturnValue::Fail;
        }
        let code = state.value.set_value(value);
        if !code.changed() {
            return match code {
                ReturnValue::Fail => ReturnValue::IncompatibleTypes,
                other => other,
            };
        }
        state.local_dirty = true;
        if self.options.push_mode == PushMode::Direct {
            match EngineThread::current() {
                Some(thread) => {
                    thread.debug_check();
                    self.push_direct(&mut state);
                }
                None => log::trace!("engine value '{}': off engine thread, deferring", self.name),
            }
        }
        ReturnValue::Success
    }

    fn is_compatible(&self, uid: TypeUid) -> bool {
        uid == self.codec.type_uid()
    }

    fn clone_value(&self) -> Option<Arc<dyn Value>> {
        None
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Engine
    }

    fn attach(&self, owner: &Weak<StackProperty>) {
        *self.owner.lock() = owner.clone();
    }

    fn detach(&self) {
        *self.owner.lock() = Weak::new();
    }

    fn as_engine(&self) -> Option<&EngineValue> {
        Some(self)
    }
}

impl fmt::Debug for EngineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineValue")
            .field("name", &self.name)
            .field("handle", &self.params.handle)
            .field("offset", &self.params.offset())
            .field("options", &self.options)
            .finish()
    }
}
