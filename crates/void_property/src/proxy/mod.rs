//! Property proxies - foreign-thread access to engine-thread properties
//!
//! A [`PropertyProxy`] keeps a cached copy of a property's value behind its
//! own lock. Foreign threads only ever touch that cache. A write marks the
//! cache dirty and submits a coalesced flush to the engine's
//! [`TaskQueue`]; the flush runs on the engine thread, commits the cached
//! value through [`StackProperty::set_value`] and pushes any
//! [`EngineValue`](crate::engine::EngineValue) entries to native memory.
//!
//! ```text
//! foreign thread            proxy cache              engine thread
//!   set_member ──────────▶ cached, dirty ──(task)──▶ update_remote_values
//!   get_member ◀────────── cached        ◀────────── update_local_values
//! ```
//!
//! Any number of writes before the flush runs result in a single flush
//! carrying the last written value.

mod host;
mod members;

pub use host::HostValue;
pub use members::ProxyMembers;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use void_core::{ObjectId, ReturnValue, TypeUid};
use void_event::{Priority, Subscription};

use crate::any::Any;
use crate::engine::{EngineSyncDirection, EngineThread, EngineValueManager};
use crate::property::StackProperty;
use crate::task_queue::{TaskQueue, TaskToken};

/// What a proxy does with member names its type does not have
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMember {
    /// Report `NotFound`
    #[default]
    Error,
    /// Treat as a no-op
    Ignore,
}

/// Proxy behaviour
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProxyOptions {
    /// Refresh the cache whenever the property changes
    pub refresh_on_change: bool,
    pub unknown_member: UnknownMember,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            refresh_on_change: true,
            unknown_member: UnknownMember::Error,
        }
    }
}

struct ProxyState<T> {
    cached: T,
    dirty: bool,
    token: Option<TaskToken>,
}

struct ProxyShared<T: ProxyMembers> {
    id: u64,
    property: Weak<StackProperty>,
    queue: Arc<dyn TaskQueue>,
    engine: Option<Arc<EngineValueManager>>,
    options: ProxyOptions,
    state: Mutex<ProxyState<T>>,
    flushes: AtomicUsize,
}

impl<T: ProxyMembers> ProxyShared<T> {
    fn schedule(self: &Arc<Self>, state: &mut ProxyState<T>) {
        let weak = Arc::downgrade(self);
        let token = self.queue.add_coalesced(
            self.id,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.update_remote_values();
                }
            }),
        );
        state.token = Some(token);
    }

    fn unknown_member(&self, name: &str) -> ReturnValue {
        log::debug!("proxy: '{}' has no member '{}'", std::any::type_name::<T>(), name);
        match self.options.unknown_member {
            UnknownMember::Error => ReturnValue::NotFound,
            UnknownMember::Ignore => ReturnValue::NothingToDo,
        }
    }

    fn update_remote_values(&self) -> ReturnValue {
        let value = {
            let mut state = self.state.lock();
            state.token = None;
            if !state.dirty {
                return ReturnValue::NothingToDo;
            }
            state.dirty = false;
            state.cached.clone()
        };
        self.flushes.fetch_add(1, Ordering::SeqCst);

        let Some(property) = self.property.upgrade() else {
            log::debug!("proxy: property is gone, dropping flush");
            return ReturnValue::NotFound;
        };
        let code = property.set_value(&Any::new(value));
        if code.is_err() {
            log::warn!("proxy: commit to '{}' failed ({})", property.name(), code);
        } else {
            self.push_to_engine(&property);
        }
        // Modifiers may have clamped or vetoed the write without a change event
        self.reload(&property);
        code
    }

    fn push_to_engine(&self, property: &StackProperty) {
        let Some(thread) = EngineThread::current() else {
            log::trace!("proxy: not on the engine thread, native write waits for the next sync");
            return;
        };
        for entry in property.values() {
            let Some(engine_value) = entry.as_engine() else {
                continue;
            };
            let code = match &self.engine {
                Some(manager) => match manager.sync_value(&thread, engine_value.name(), EngineSyncDirection::ToEngine) {
                    ReturnValue::NotFound => engine_value.sync(&thread, EngineSyncDirection::ToEngine),
                    code => code,
                },
                None => engine_value.sync(&thread, EngineSyncDirection::ToEngine),
            };
            if code.is_err() {
                log::debug!("proxy: push of '{}' failed ({})", engine_value.name(), code);
            }
        }
    }

    fn update_local_values(&self) -> ReturnValue {
        let Some(property) = self.property.upgrade() else {
            return ReturnValue::NotFound;
        };
        self.reload(&property)
    }

    fn reload(&self, property: &StackProperty) -> ReturnValue {
        let value = match property.get_value() {
            Ok(value) => value,
            Err(code) => return code,
        };
        let Some(value) = value.get::<T>() else {
            return ReturnValue::IncompatibleTypes;
        };
        let mut state = self.state.lock();
        if state.dirty {
            // Pending foreign write wins until it is flushed
            return ReturnValue::NothingToDo;
        }
        if state.cached == value {
            ReturnValue::NothingToDo
        } else {
            state.cached = value;
            ReturnValue::Success
        }
    }
}

/// Lock-guarded cache of a property's value for use from other threads
pub struct PropertyProxy<T: ProxyMembers> {
    shared: Arc<ProxyShared<T>>,
    _subscription: Subscription,
}

impl<T: ProxyMembers> PropertyProxy<T> {
    /// Proxy for `property`, flushing through `queue`.
    /// `IncompatibleTypes` if the property does not hold a `T`.
    pub fn new(property: &Arc<StackProperty>, queue: Arc<dyn TaskQueue>, options: ProxyOptions) -> Result<Self, ReturnValue> {
        Self::build(property, queue, None, options)
    }

    /// Proxy whose flushes push through `engine`
    pub fn with_engine(
        property: &Arc<StackProperty>,
        queue: Arc<dyn TaskQueue>,
        engine: Arc<EngineValueManager>,
        options: ProxyOptions,
    ) -> Result<Self, ReturnValue> {
        Self::build(property, queue, Some(engine), options)
    }

    fn build(
        property: &Arc<StackProperty>,
        queue: Arc<dyn TaskQueue>,
        engine: Option<Arc<EngineValueManager>>,
        options: ProxyOptions,
    ) -> Result<Self, ReturnValue> {
        if property.type_uid() != TypeUid::of::<T>() {
            log::debug!(
                "proxy: '{}' does not hold a {}",
                property.name(),
                std::any::type_name::<T>()
            );
            return Err(ReturnValue::IncompatibleTypes);
        }
        let cached = property
            .get_value()
            .ok()
            .and_then(|value| value.get::<T>())
            .unwrap_or_default();
        let shared = Arc::new(ProxyShared {
            id: ObjectId::next().to_bits(),
            property: Arc::downgrade(property),
            queue,
            engine,
            options,
            state: Mutex::new(ProxyState {
                cached,
                dirty: false,
                token: None,
            }),
            flushes: AtomicUsize::new(0),
        });
        let subscription = if options.refresh_on_change {
            let weak = Arc::downgrade(&shared);
            // Ahead of other observers so they read a fresh cache
            property.on_changed().subscription_with_priority(
                move |_: &StackProperty| {
                    if let Some(shared) = weak.upgrade() {
                        shared.update_local_values();
                    }
                },
                Priority::High,
            )
        } else {
            Subscription::empty()
        };
        Ok(Self {
            shared,
            _subscription: subscription,
        })
    }

    /// Replace the whole cached value and schedule a flush
    pub fn set_value(&self, value: T) -> ReturnValue {
        let mut state = self.shared.state.lock();
        if state.cached == value {
            return ReturnValue::NothingToDo;
        }
        state.cached = value;
        state.dirty = true;
        self.shared.schedule(&mut state);
        ReturnValue::Success
    }

    /// Cached value
    pub fn get_value(&self) -> T {
        self.shared.state.lock().cached.clone()
    }

    /// Write one member of the cached value and schedule a flush
    pub fn set_member(&self, name: &str, value: &HostValue) -> ReturnValue {
        let mut state = self.shared.state.lock();
        match state.cached.set_member(name, value) {
            ReturnValue::Success => {
                state.dirty = true;
                self.shared.schedule(&mut state);
                ReturnValue::Success
            }
            ReturnValue::NotFound => self.shared.unknown_member(name),
            code => code,
        }
    }

    /// Read one member of the cached value
    pub fn get_member(&self, name: &str) -> Result<HostValue, ReturnValue> {
        let member = self.shared.state.lock().cached.get_member(name);
        match member {
            Some(value) => Ok(value),
            None => match self.shared.unknown_member(name) {
                ReturnValue::NothingToDo => Ok(HostValue::Undefined),
                code => Err(code),
            },
        }
    }

    /// Cached value in host form
    pub fn to_host(&self) -> HostValue {
        self.shared.state.lock().cached.to_host()
    }

    /// Replace the cached value from host form
    pub fn set_host(&self, value: &HostValue) -> ReturnValue {
        match T::from_host(value) {
            Some(value) => self.set_value(value),
            None => ReturnValue::InvalidArgument,
        }
    }

    /// Commit the cached value to the property. Runs on the engine
    /// thread; scheduled automatically by writes.
    pub fn update_remote_values(&self) -> ReturnValue {
        self.shared.update_remote_values()
    }

    /// Refresh the cache from the property. A pending write is kept.
    pub fn update_local_values(&self) -> ReturnValue {
        self.shared.update_local_values()
    }

    /// Whether a write is waiting to be flushed
    pub fn is_dirty(&self) -> bool {
        self.shared.state.lock().dirty
    }

    /// Number of flushes that carried a value
    pub fn flush_count(&self) -> usize {
        self.shared.flushes.load(Ordering::SeqCst)
    }

    /// The proxied property, if still alive
    pub fn property(&self) -> Option<Arc<StackProperty>> {
        self.shared.property.upgrade()
    }
}

impl<T: ProxyMembers> Drop for PropertyProxy<T> {
    fn drop(&mut self) {
        let token = self.shared.state.lock().token.take();
        if let Some(token) = token {
            self.shared.queue.cancel_task(token);
        }
    }
}

impl<T: ProxyMembers> fmt::Debug for PropertyProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("PropertyProxy")
            .field("cached", &state.cached)
            .field("dirty", &state.dirty)
            .field("flushes", &self.flush_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_queue::PollingTaskQueue;

    fn setup(value: f32, options: ProxyOptions) -> (Arc<StackProperty>, Arc<PollingTaskQueue>, PropertyProxy<f32>) {
        let property = StackProperty::of("speed", value);
        let queue = Arc::new(PollingTaskQueue::new("engine"));
        let proxy = PropertyProxy::new(&property, queue.clone(), options).unwrap();
        (property, queue, proxy)
    }

    #[test]
    fn test_type_check() {
        let property = StackProperty::of("speed", 1.0f32);
        let queue: Arc<dyn TaskQueue> = Arc::new(PollingTaskQueue::new("engine"));
        let err = PropertyProxy::<i32>::new(&property, queue, ProxyOptions::default()).unwrap_err();
        assert_eq!(err, ReturnValue::IncompatibleTypes);
    }

    #[test]
    fn test_writes_coalesce() {
        let (property, queue, proxy) = setup(0.0, ProxyOptions::default());
        assert_eq!(proxy.set_value(1.0), ReturnValue::Success);
        assert_eq!(proxy.set_value(2.0), ReturnValue::Success);
        assert_eq!(proxy.set_value(2.0), ReturnValue::NothingToDo);
        assert!(proxy.is_dirty());
        assert_eq!(queue.pending(), 1);
        assert_eq!(property.get::<f32>(), Some(0.0));

        assert_eq!(queue.process_tasks(), 1);
        assert_eq!(proxy.flush_count(), 1);
        assert!(!proxy.is_dirty());
        assert_eq!(property.get::<f32>(), Some(2.0));
    }

    #[test]
    fn test_refresh_keeps_pending_write() {
        let (property, queue, proxy) = setup(0.0, ProxyOptions::default());
        property.set(5.0f32);
        assert_eq!(proxy.get_value(), 5.0);

        proxy.set_value(7.0);
        property.set(9.0f32);
        assert_eq!(proxy.get_value(), 7.0);

        queue.process_tasks();
        assert_eq!(property.get::<f32>(), Some(7.0));
    }

    #[test]
    fn test_unknown_member_policy() {
        let (_property, queue, proxy) = setup(0.0, ProxyOptions::default());
        assert_eq!(proxy.set_member("nope", &HostValue::Number(1.0)), ReturnValue::NotFound);
        assert_eq!(proxy.get_member("nope"), Err(ReturnValue::NotFound));

        let options = ProxyOptions {
            unknown_member: UnknownMember::Ignore,
            ..ProxyOptions::default()
        };
        let (_property, _queue, lenient) = setup(0.0, options);
        assert_eq!(lenient.set_member("nope", &HostValue::Number(1.0)), ReturnValue::NothingToDo);
        assert_eq!(lenient.get_member("nope"), Ok(HostValue::Undefined));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_drop_cancels_flush() {
        let (property, queue, proxy) = setup(0.0, ProxyOptions::default());
        proxy.set_value(3.0);
        assert_eq!(queue.pending(), 1);
        drop(proxy);
        assert_eq!(queue.pending(), 0);
        assert_eq!(property.get::<f32>(), Some(0.0));
    }
}
