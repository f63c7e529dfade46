use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use void_core::{ReturnValue, TypeUid};
use void_event::Subscription;

use super::{Value, ValueKind};
use crate::any::Any;
use crate::dependency;
use crate::function::Function;
use crate::property::StackProperty;

/// Where a bind reads from. Always a weak reference.
#[derive(Clone)]
pub enum BindSource {
    /// Two-way forward to another property
    Property(Weak<StackProperty>),
    /// Read-only result of a function; re-evaluated when any property the
    /// function read changes
    Function(Weak<Function>),
}

impl BindSource {
    /// Bind to a property
    pub fn property(property: &Arc<StackProperty>) -> Self {
        Self::Property(Arc::downgrade(property))
    }

    /// Bind to a function
    pub fn function(function: &Arc<Function>) -> Self {
        Self::Function(Arc::downgrade(function))
    }

    /// True while the source exists
    pub fn is_alive(&self) -> bool {
        match self {
            Self::Property(p) => p.strong_count() > 0,
            Self::Function(f) => f.strong_count() > 0,
        }
    }

    /// Whether a value of `uid` can come from this source
    pub fn accepts(&self, uid: TypeUid) -> bool {
        match self {
            Self::Property(p) => p.upgrade().map_or(false, |p| p.accepts(uid)),
            Self::Function(f) => f
                .upgrade()
                .map_or(false, |f| f.result_uid().map_or(true, |result| result == uid)),
        }
    }

    /// Same source object
    pub fn same_as(&self, other: &BindSource) -> bool {
        match (self, other) {
            (Self::Property(a), Self::Property(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for BindSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(p) => match p.upgrade() {
                Some(p) => write!(f, "Property({})", p.name()),
                None => f.write_str("Property(<dropped>)"),
            },
            Self::Function(func) => match func.upgrade() {
                Some(func) => write!(f, "Function({})", func.name()),
                None => f.write_str("Function(<dropped>)"),
            },
        }
    }
}

pub(crate) type Reaction = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Watch {
    reaction: Option<Reaction>,
    watched: Vec<Weak<StackProperty>>,
    subscriptions: Vec<Subscription>,
}

/// A bind source plus the change subscriptions that keep a target fresh
pub(crate) struct SourceLink {
    source: BindSource,
    watch: Mutex<Watch>,
}

impl SourceLink {
    pub(crate) fn new(source: BindSource) -> Self {
        Self {
            source,
            watch: Mutex::new(Watch::default()),
        }
    }

    pub(crate) fn source(&self) -> &BindSource {
        &self.source
    }

    /// Evaluate the source. Never called with the watch lock held, since
    /// the source may notify and re-enter the reaction.
    pub(crate) fn read(&self) -> Result<Any, ReturnValue> {
        match &self.source {
            BindSource::Property(weak) => {
                let source = weak.upgrade().ok_or(ReturnValue::NotFound)?;
                source.get_value()
            }
            BindSource::Function(weak) => {
                let function = weak.upgrade().ok_or(ReturnValue::NotFound)?;
                let (result, deps) = dependency::collect(|| function.call(&[]));
                self.watch_all(deps);
                result.ok_or(ReturnValue::Fail)
            }
        }
    }

    /// Start reacting to source changes
    pub(crate) fn start(&self, reaction: Reaction) {
        self.watch.lock().reaction = Some(reaction);
        if let BindSource::Property(weak) = &self.source {
            self.watch_all(vec![weak.clone()]);
        }
    }

    /// Drop every subscription
    pub(crate) fn stop(&self) {
        let mut watch = self.watch.lock();
        watch.reaction = None;
        watch.watched.clear();
        watch.subscriptions.clear();
    }

    pub(crate) fn watched_count(&self) -> usize {
        self.watch.lock().subscriptions.len()
    }

    fn watch_all(&self, deps: Vec<Weak<StackProperty>>) {
        let mut watch = self.watch.lock();
        let Some(reaction) = watch.reaction.clone() else {
            return;
        };
        if dependency::same_set(&watch.watched, &deps) {
            return;
        }
        watch.subscriptions = deps
            .iter()
            .filter_map(Weak::upgrade)
            .map(|property| {
                let reaction = reaction.clone();
                property
                    .on_changed()
                    .subscription(move |_: &StackProperty| reaction())
            })
            .collect();
        log::trace!("bind: watching {} source properties", watch.subscriptions.len());
        watch.watched = deps;
    }
}

/// Stack entry forwarding to a property or function
pub struct Bind {
    link: SourceLink,
}

impl Bind {
    /// Create an unattached bind
    pub fn new(source: BindSource) -> Arc<Self> {
        Arc::new(Self {
            link: SourceLink::new(source),
        })
    }

    /// The bind source
    pub fn source(&self) -> &BindSource {
        self.link.source()
    }

    /// Number of properties this bind currently listens to
    pub fn watched_count(&self) -> usize {
        self.link.watched_count()
    }
}

impl Value for Bind {
    fn get_value(&self) -> Result<Any, ReturnValue> {
        self.link.read()
    }

    fn set_value(&self, value: &Any) -> ReturnValue {
        match self.link.source() {
            BindSource::Property(weak) => match weak.upgrade() {
                Some(source) => source.set_value(value),
                None => ReturnValue::NotFound,
            },
            BindSource::Function(_) => ReturnValue::NotSupported,
        }
    }

    fn is_compatible(&self, uid: TypeUid) -> bool {
        self.link.source().accepts(uid)
    }

    fn clone_value(&self) -> Option<Arc<dyn Value>> {
        Some(Bind::new(self.link.source().clone()))
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Bind
    }

    fn is_valid(&self) -> bool {
        self.link.source().is_alive()
    }

    fn attach(&self, owner: &Weak<StackProperty>) {
        let target = owner.clone();
        self.link.start(Arc::new(move || {
            if let Some(target) = target.upgrade() {
                target.refresh();
            }
        }));
    }

    fn detach(&self) {
        self.link.stop();
    }
}

impl fmt::Debug for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bind").field("source", self.source()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_source_is_invalid() {
        let source = StackProperty::new("source", Any::new(1i32));
        let bind = Bind::new(BindSource::property(&source));
        assert!(bind.is_valid());
        assert!(bind.is_compatible(void_core::TypeUid::of::<i32>()));
        assert_eq!(bind.get_value().unwrap().get::<i32>(), Some(1));

        drop(source);
        assert!(!bind.is_valid());
        assert_eq!(bind.get_value(), Err(ReturnValue::NotFound));
        assert_eq!(bind.set_value(&Any::new(2i32)), ReturnValue::NotFound);
    }

    #[test]
    fn test_function_source_is_read_only() {
        let function = Function::new("five", |_| Some(Any::new(5i32)));
        let bind = Bind::new(BindSource::function(&function));
        assert_eq!(bind.get_value().unwrap().get::<i32>(), Some(5));
        assert_eq!(bind.set_value(&Any::new(1i32)), ReturnValue::NotSupported);
    }
}
