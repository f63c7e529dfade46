//! # void_property - Property Runtime
//!
//! Stack-evaluated properties shared between an engine thread and the
//! threads that script or edit it:
//! - **Any**: type-erased values keyed by [`TypeUid`](void_core::TypeUid)
//! - **StackProperty**: a stack of value entries filtered by a stack of
//!   modifiers, with default value and change notification
//! - **Values**: stored, bound to another property or function, custom
//!   getter/setter, or mirrored from native component memory
//! - **MetaObject**: named properties, events, functions and attachments,
//!   with event-to-function connectors
//! - **TaskQueue**: coalescing FIFO execution on a chosen thread
//! - **PropertyProxy**: lock-guarded cache for foreign threads, flushed to
//!   the engine thread through a task queue
//!
//! ## Evaluation
//!
//! ```text
//! get:  top entry value ──▶ modifier[0] ─▶ ... ─▶ modifier[n] ──▶ caller
//! set:  caller ──▶ modifier[n] ─▶ ... ─▶ modifier[0] ──▶ top entry
//! ```
//!
//! Change events fire after the property's lock is released, on the
//! thread that caused the change.

pub mod any;
pub mod binding;
pub mod config;
mod dependency;
pub mod engine;
pub mod evaluation;
pub mod function;
pub mod modifier;
pub mod object;
pub mod property;
pub mod proxy;
pub mod registry;
pub mod serialize;
pub mod task_queue;
pub mod value;

pub use any::{Any, AnyType};
pub use property::StackProperty;
pub use void_core::ReturnValue;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::any::{Any, AnyType, CloneOptions, CloneRole, CloneValue};
    pub use crate::binding::Binding;
    pub use crate::config::RuntimeConfig;
    pub use crate::engine::{
        EnginePropertyParams, EngineSyncDirection, EngineThread, EngineValue, EngineValueManager,
        EngineValueOptions, PushMode,
    };
    pub use crate::evaluation::{Action, Evaluation};
    pub use crate::function::Function;
    pub use crate::modifier::{ClampModifier, FnModifier, Modifier, ReadOnlyModifier, ScaleModifier};
    pub use crate::object::{connect, disconnect, Attachment, Connector, MetaObject};
    pub use crate::property::StackProperty;
    pub use crate::proxy::{HostValue, PropertyProxy, ProxyMembers, ProxyOptions};
    pub use crate::registry::ObjectRegistry;
    pub use crate::task_queue::{PollingTaskQueue, TaskQueue, ThreadedTaskQueue};
    pub use crate::value::{Bind, BindSource, CustomValue, DefaultValueBind, StoredValue, Value};
    pub use void_core::{ReturnValue, TypeUid};
}
