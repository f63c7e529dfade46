//! MetaObject - named properties, events and functions plus an attachment
//! container
//!
//! Attachments live exactly as long as they stay in the container: they
//! are detached when removed and when the object is dropped. A
//! [`Connector`] is the attachment that routes a source object's event to
//! one of this object's functions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use void_core::{ObjectId, ReturnValue};
use void_event::{Event, Subscription};

use crate::any::{Any, AnyType};
use crate::function::Function;
use crate::property::StackProperty;

/// Object event carrying positional arguments
pub type ObjectEvent = Event<[Any]>;

/// Something that can live in a [`MetaObject`]'s attachment container
pub trait Attachment: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Called before the attachment enters `target`. A failure code keeps
    /// it out of the container.
    fn attaching(&self, _target: &MetaObject) -> ReturnValue {
        ReturnValue::Success
    }

    /// Called when the attachment leaves `target`
    fn detaching(&self, _target: &MetaObject) {}

    /// Downcast to a connector
    fn as_connector(&self) -> Option<&Connector> {
        None
    }
}

fn same_attachment(a: &Arc<dyn Attachment>, b: &Arc<dyn Attachment>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Object with named properties, events, functions and attachments
pub struct MetaObject {
    this: Weak<MetaObject>,
    id: ObjectId,
    name: String,
    properties: RwLock<Vec<Arc<StackProperty>>>,
    events: RwLock<BTreeMap<String, ObjectEvent>>,
    functions: RwLock<BTreeMap<String, Arc<Function>>>,
    attachments: Mutex<Vec<Arc<dyn Attachment>>>,
}

impl MetaObject {
    /// Create an empty object
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            id: ObjectId::next(),
            name: name.into(),
            properties: RwLock::new(Vec::new()),
            events: RwLock::new(BTreeMap::new()),
            functions: RwLock::new(BTreeMap::new()),
            attachments: Mutex::new(Vec::new()),
        })
    }

    /// Object id
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Object name
    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- properties ----

    /// Adopt a property. Names are unique per object.
    pub fn add_property(&self, property: Arc<StackProperty>) -> ReturnValue {
        let mut properties = self.properties.write();
        if properties.iter().any(|p| p.name() == property.name()) {
            log::debug!("{}: property '{}' already exists", self.name, property.name());
            return ReturnValue::InvalidArgument;
        }
        property.set_owner(self.this.clone());
        properties.push(property);
        ReturnValue::Success
    }

    /// Create and adopt a property holding a `T`
    pub fn create_property<T: AnyType>(&self, name: &str, default: T) -> Option<Arc<StackProperty>> {
        let property = StackProperty::of(name, default);
        self.add_property(property.clone()).is_ok().then_some(property)
    }

    /// Property by name
    pub fn property(&self, name: &str) -> Option<Arc<StackProperty>> {
        self.properties.read().iter().find(|p| p.name() == name).cloned()
    }

    /// All properties in creation order
    pub fn properties(&self) -> Vec<Arc<StackProperty>> {
        self.properties.read().clone()
    }

    /// Drop a property from the object
    pub fn remove_property(&self, name: &str) -> Option<Arc<StackProperty>> {
        let mut properties = self.properties.write();
        let index = properties.iter().position(|p| p.name() == name)?;
        let property = properties.remove(index);
        property.set_owner(Weak::new());
        Some(property)
    }

    // ---- events ----

    /// Get or create an event
    pub fn add_event(&self, name: &str) -> ObjectEvent {
        self.events.write().entry(name.to_string()).or_default().clone()
    }

    /// Event by name
    pub fn event(&self, name: &str) -> Option<ObjectEvent> {
        self.events.read().get(name).cloned()
    }

    /// Raise an event
    pub fn invoke_event(&self, name: &str, args: &[Any]) -> ReturnValue {
        match self.event(name) {
            Some(event) => {
                event.invoke(args);
                ReturnValue::Success
            }
            None => ReturnValue::NotFound,
        }
    }

    // ---- functions ----

    /// Register a function, replacing one with the same name
    pub fn add_function(&self, function: Arc<Function>) {
        self.functions.write().insert(function.name().to_string(), function);
    }

    /// Function by name
    pub fn function(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.read().get(name).cloned()
    }

    /// Call a function by name
    pub fn invoke_function(&self, name: &str, args: &[Any]) -> Result<Option<Any>, ReturnValue> {
        let function = self.function(name).ok_or(ReturnValue::NotFound)?;
        Ok(function.call(args))
    }

    // ---- attachments ----

    /// Put an attachment into the container
    pub fn attach(&self, attachment: Arc<dyn Attachment>) -> ReturnValue {
        let code = attachment.attaching(self);
        if code.is_err() {
            log::debug!("{}: attachment '{}' refused ({})", self.name, attachment.name(), code);
            return code;
        }
        self.attachments.lock().push(attachment);
        ReturnValue::Success
    }

    /// Take an attachment out of the container
    pub fn detach(&self, attachment: &Arc<dyn Attachment>) -> ReturnValue {
        let removed = {
            let mut attachments = self.attachments.lock();
            let index = attachments.iter().position(|a| same_attachment(a, attachment));
            index.map(|i| attachments.remove(i))
        };
        match removed {
            Some(attachment) => {
                attachment.detaching(self);
                ReturnValue::Success
            }
            None => ReturnValue::NotFound,
        }
    }

    /// Snapshot of the container
    pub fn attachments(&self) -> Vec<Arc<dyn Attachment>> {
        self.attachments.lock().clone()
    }

    /// Detach everything
    pub fn detach_all(&self) {
        let drained: Vec<_> = self.attachments.lock().drain(..).collect();
        for attachment in drained {
            attachment.detaching(self);
        }
    }

    fn find_connector(&self, source: &Arc<MetaObject>, event: &str, function: &str) -> Option<Arc<dyn Attachment>> {
        self.attachments
            .lock()
            .iter()
            .find(|a| {
                a.as_connector()
                    .map_or(false, |c| c.matches(source, event, function))
            })
            .cloned()
    }
}

impl Drop for MetaObject {
    fn drop(&mut self) {
        self.detach_all();
    }
}

impl fmt::Debug for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("properties", &self.properties.read().len())
            .field("attachments", &self.attachments.lock().len())
            .finish()
    }
}

/// Routes a source object's event into a destination function
pub struct Connector {
    source: Weak<MetaObject>,
    event: String,
    function: String,
    subscription: Mutex<Option<Subscription>>,
}

impl Connector {
    /// Create an unattached connector
    pub fn new(source: &Arc<MetaObject>, event: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            source: Arc::downgrade(source),
            event: event.into(),
            function: function.into(),
            subscription: Mutex::new(None),
        }
    }

    /// Event name on the source
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Function name on the destination
    pub fn function(&self) -> &str {
        &self.function
    }

    /// True while the event subscription is live
    pub fn is_connected(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .map_or(false, Subscription::is_connected)
    }

    fn matches(&self, source: &Arc<MetaObject>, event: &str, function: &str) -> bool {
        self.source.as_ptr() == Arc::as_ptr(source) && self.event == event && self.function == function
    }
}

impl Attachment for Connector {
    fn name(&self) -> &str {
        "connector"
    }

    fn attaching(&self, target: &MetaObject) -> ReturnValue {
        let Some(source) = self.source.upgrade() else {
            return ReturnValue::NotFound;
        };
        let Some(event) = source.event(&self.event) else {
            log::debug!("connect: '{}' has no event '{}'", source.name(), self.event);
            return ReturnValue::NotFound;
        };
        let Some(function) = target.function(&self.function) else {
            log::debug!("connect: '{}' has no function '{}'", target.name(), self.function);
            return ReturnValue::NotFound;
        };
        let function = Arc::downgrade(&function);
        let subscription = event.subscription(move |args: &[Any]| {
            if let Some(function) = function.upgrade() {
                function.call(args);
            }
        });
        *self.subscription.lock() = Some(subscription);
        ReturnValue::Success
    }

    fn detaching(&self, _target: &MetaObject) {
        if let Some(mut subscription) = self.subscription.lock().take() {
            subscription.release();
        }
    }

    fn as_connector(&self) -> Option<&Connector> {
        Some(self)
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("event", &self.event)
            .field("function", &self.function)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Route `source.event` into `dest.function`
pub fn connect(source: &Arc<MetaObject>, event: &str, dest: &MetaObject, function: &str) -> ReturnValue {
    if dest.find_connector(source, event, function).is_some() {
        return ReturnValue::NothingToDo;
    }
    dest.attach(Arc::new(Connector::new(source, event, function)))
}

/// Remove the connector created by [`connect`]
pub fn disconnect(source: &Arc<MetaObject>, event: &str, dest: &MetaObject, function: &str) -> ReturnValue {
    match dest.find_connector(source, event, function) {
        Some(connector) => dest.detach(&connector),
        None => ReturnValue::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_owner() {
        let object = MetaObject::new("light");
        let intensity = object.create_property("intensity", 1.0f32).unwrap();
        assert!(Arc::ptr_eq(&intensity.owner().unwrap(), &object));
        assert!(object.create_property("intensity", 2.0f32).is_none());
        assert!(object.property("intensity").is_some());

        let removed = object.remove_property("intensity").unwrap();
        assert!(removed.owner().is_none());
    }

    #[test]
    fn test_missing_event_refuses_connector() {
        let source = MetaObject::new("source");
        let dest = MetaObject::new("dest");
        dest.add_function(Function::new("f", |_| None));
        assert_eq!(connect(&source, "missing", &dest, "f"), ReturnValue::NotFound);
        assert!(dest.attachments().is_empty());
    }

    #[test]
    fn test_attachment_lifecycle() {
        struct Probe(Arc<parking_lot::Mutex<Vec<&'static str>>>);
        impl Attachment for Probe {
            fn name(&self) -> &str {
                "probe"
            }
            fn attaching(&self, _: &MetaObject) -> ReturnValue {
                self.0.lock().push("attach");
                ReturnValue::Success
            }
            fn detaching(&self, _: &MetaObject) {
                self.0.lock().push("detach");
            }
        }

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let object = MetaObject::new("o");
        object.attach(Arc::new(Probe(log.clone())));
        drop(object);
        assert_eq!(*log.lock(), ["attach", "detach"]);
    }
}
