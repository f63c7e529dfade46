//! Value stack entries
//!
//! Every entry on a [`StackProperty`](crate::property::StackProperty)
//! values stack implements [`Value`]. The evaluation loop is written once
//! against this capability set; the variants only decide where the value
//! lives:
//!
//! - [`StoredValue`]: owns its [`Any`]
//! - [`Bind`]: forwards to another property or a function (weak source)
//! - [`CustomValue`]: get/set hooks with a cached mirror
//! - [`EngineValue`](crate::engine::EngineValue): native component memory
//!
//! [`DefaultValueBind`] is not a stack entry; it feeds a property's
//! default value instead.

mod bind;
mod custom;
mod default_bind;
mod stored;

pub use bind::{Bind, BindSource};
pub use custom::CustomValue;
pub use default_bind::DefaultValueBind;
pub use stored::StoredValue;

use std::fmt;
use std::sync::{Arc, Weak};

use void_core::{ReturnValue, TypeUid};

use crate::any::Any;
use crate::engine::EngineValue;
use crate::property::StackProperty;

/// Variant tag of a [`Value`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Stored,
    Bind,
    Custom,
    Engine,
}

/// Capability set of a values-stack entry
pub trait Value: Send + Sync {
    /// Current value of the entry
    fn get_value(&self) -> Result<Any, ReturnValue>;

    /// Try to store `value`. `NothingToDo` and `Success` both count as
    /// accepted; `NotSupported` means the entry never accepts writes.
    fn set_value(&self, value: &Any) -> ReturnValue;

    /// Whether values of `uid` can flow through this entry
    fn is_compatible(&self, uid: TypeUid) -> bool;

    /// Detached copy of the entry, if the variant can be cloned
    fn clone_value(&self) -> Option<Arc<dyn Value>>;

    /// Variant tag
    fn kind(&self) -> ValueKind;

    /// False once the entry can structurally no longer serve values
    /// (e.g. a bind whose source was dropped). Invalid entries are evicted
    /// from the stack during evaluation.
    fn is_valid(&self) -> bool {
        true
    }

    /// Called when the entry is placed on `owner`'s stack
    fn attach(&self, _owner: &Weak<StackProperty>) {}

    /// Called when the entry leaves the stack
    fn detach(&self) {}

    /// Downcast to the engine variant
    fn as_engine(&self) -> Option<&EngineValue> {
        None
    }
}

impl fmt::Debug for dyn Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("kind", &self.kind())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Pointer identity of two entries
pub fn same_value(a: &Arc<dyn Value>, b: &Arc<dyn Value>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
