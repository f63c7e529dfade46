use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use void_core::ReturnValue;

use super::bind::{BindSource, SourceLink};
use crate::property::StackProperty;

/// Keeps a property's default value in step with a source.
///
/// Only the default is written, so a property the user never set keeps
/// reporting `is_default_value() == true` while the bound default moves.
pub struct DefaultValueBind {
    link: SourceLink,
    target: Mutex<Weak<StackProperty>>,
}

impl DefaultValueBind {
    /// Create an unattached default bind
    pub fn new(source: BindSource) -> Arc<Self> {
        Arc::new(Self {
            link: SourceLink::new(source),
            target: Mutex::new(Weak::new()),
        })
    }

    /// The bind source
    pub fn source(&self) -> &BindSource {
        self.link.source()
    }

    /// True while the source exists
    pub fn is_valid(&self) -> bool {
        self.link.source().is_alive()
    }

    /// Copy the source value into the target's default
    pub fn apply(&self) -> ReturnValue {
        let Some(target) = self.target.lock().upgrade() else {
            return ReturnValue::NotFound;
        };
        match self.link.read() {
            Ok(value) => target.set_default_value(&value),
            Err(code) => {
                log::debug!("default bind on '{}': source unavailable ({})", target.name(), code);
                code
            }
        }
    }

    pub(crate) fn attach(self: &Arc<Self>, target: &Weak<StackProperty>) {
        *self.target.lock() = target.clone();
        let this = Arc::downgrade(self);
        self.link.start(Arc::new(move || {
            if let Some(this) = this.upgrade() {
                this.apply();
            }
        }));
    }

    pub(crate) fn detach(&self) {
        self.link.stop();
        *self.target.lock() = Weak::new();
    }
}

impl fmt::Debug for DefaultValueBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultValueBind")
            .field("source", self.source())
            .finish()
    }
}
