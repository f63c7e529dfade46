//! StackProperty - a property evaluated through a values stack and a
//! modifiers stack
//!
//! The observable value is produced by reading the top entry of the values
//! stack (or the default when the stack is empty) and running it through
//! the modifiers bottom to top. Writes run the modifiers top to bottom and
//! offer the result to the values stack from the top down; the first entry
//! that accepts it wins. A modifier's edit is kept only if it reports it
//! through [`Evaluation::changed`](crate::evaluation::Evaluation::changed).
//!
//! Both stacks live behind one reentrant lock. Evaluation on the thread
//! holding the lock is guarded by a flag, so a property whose evaluation
//! reaches itself again (directly or through binds) reports
//! [`ReturnValue::RecursiveCall`] instead of recursing.
//!
//! Change notification is raised after the lock is released, at most once
//! per operation, and only when the observable value actually changed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use void_core::{ObjectId, ReturnValue, TypeUid};
use void_event::Event;

use crate::any::{Any, AnyType};
use crate::dependency;
use crate::evaluation::{Action, Evaluation};
use crate::modifier::Modifier;
use crate::object::MetaObject;
use crate::value::{same_value, Bind, BindSource, DefaultValueBind, StoredValue, Value, ValueKind};

struct PropertyState {
    values: RefCell<Vec<Arc<dyn Value>>>,
    modifiers: RefCell<Vec<Arc<dyn Modifier>>>,
    default_value: RefCell<Any>,
    current: RefCell<Any>,
    default_bind: RefCell<Option<Arc<DefaultValueBind>>>,
    is_default: Cell<bool>,
    evaluating: Cell<bool>,
}

impl PropertyState {
    fn accepts(&self, property_uid: TypeUid, uid: TypeUid) -> bool {
        property_uid == uid || self.default_value.borrow().is_compatible(uid)
    }

    fn remove_entries(&self, pred: impl Fn(&Arc<dyn Value>) -> bool) -> Vec<Arc<dyn Value>> {
        let mut values = self.values.borrow_mut();
        let mut removed = Vec::new();
        values.retain(|entry| {
            if pred(entry) {
                removed.push(entry.clone());
                false
            } else {
                true
            }
        });
        if values.is_empty() {
            self.is_default.set(true);
        }
        removed
    }

    fn store_current(&self, value: &Any) -> bool {
        let mut current = self.current.borrow_mut();
        if *current == *value {
            false
        } else {
            *current = value.clone();
            true
        }
    }
}

/// Clears the evaluating flag when evaluation ends, including by panic
struct EvalGuard<'a>(&'a Cell<bool>);

impl<'a> EvalGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.get() {
            None
        } else {
            flag.set(true);
            Some(Self(flag))
        }
    }
}

impl Drop for EvalGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Holds a property's lock across several calls.
///
/// The lock is reentrant: the holder may keep calling the property.
pub struct PropertyLock<'a> {
    _guard: ReentrantMutexGuard<'a, PropertyState>,
}

/// Observable property with a values stack and a modifiers stack
pub struct StackProperty {
    this: Weak<StackProperty>,
    id: ObjectId,
    name: String,
    type_uid: TypeUid,
    owner: RwLock<Weak<MetaObject>>,
    state: ReentrantMutex<PropertyState>,
    on_changed: Event<StackProperty>,
}

impl StackProperty {
    /// Create a property; `default` fixes the value type
    pub fn new(name: impl Into<String>, default: Any) -> Arc<Self> {
        let type_uid = default.type_uid();
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            id: ObjectId::next(),
            name: name.into(),
            type_uid,
            owner: RwLock::new(Weak::new()),
            state: ReentrantMutex::new(PropertyState {
                values: RefCell::new(Vec::new()),
                modifiers: RefCell::new(Vec::new()),
                current: RefCell::new(default.clone()),
                default_value: RefCell::new(default),
                default_bind: RefCell::new(None),
                is_default: Cell::new(true),
                evaluating: Cell::new(false),
            }),
            on_changed: Event::new(),
        })
    }

    /// Create a property holding a `T`
    pub fn of<T: AnyType>(name: impl Into<String>, default: T) -> Arc<Self> {
        Self::new(name, Any::new(default))
    }

    /// Object id
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type
    pub fn type_uid(&self) -> TypeUid {
        self.type_uid
    }

    /// Owning object, if it is still alive
    pub fn owner(&self) -> Option<Arc<MetaObject>> {
        self.owner.read().upgrade()
    }

    pub(crate) fn set_owner(&self, owner: Weak<MetaObject>) {
        *self.owner.write() = owner;
    }

    /// Change notification. Handlers receive the property itself.
    pub fn on_changed(&self) -> &Event<StackProperty> {
        &self.on_changed
    }

    /// Whether values of `uid` can be stored in this property
    pub fn accepts(&self, uid: TypeUid) -> bool {
        self.state.lock().accepts(self.type_uid, uid)
    }

    /// Hold the property lock for a group of operations
    pub fn scoped_lock(&self) -> PropertyLock<'_> {
        PropertyLock {
            _guard: self.state.lock(),
        }
    }

    // ---- evaluation ----

    /// Evaluate the observable value
    pub fn get_value(&self) -> Result<Any, ReturnValue> {
        dependency::record(&self.this);
        let (result, changed) = self.evaluate_and_commit();
        if changed {
            self.notify();
        }
        result
    }

    /// Typed [`get_value`](Self::get_value)
    pub fn get<T: AnyType>(&self) -> Option<T> {
        self.get_value().ok().and_then(|value| value.get::<T>())
    }

    /// Re-evaluate and store the observable value, notifying on change.
    /// Returns `Success` if the value changed.
    pub fn evaluate_and_store(&self) -> ReturnValue {
        let (result, changed) = self.evaluate_and_commit();
        if changed {
            self.notify();
        }
        match result {
            Ok(_) if changed => ReturnValue::Success,
            Ok(_) => ReturnValue::NothingToDo,
            Err(code) => code,
        }
    }

    pub(crate) fn refresh(&self) {
        let code = self.evaluate_and_store();
        if code == ReturnValue::RecursiveCall {
            log::trace!("'{}': refresh skipped while evaluating", self.name);
        }
    }

    fn evaluate_and_commit(&self) -> (Result<Any, ReturnValue>, bool) {
        let state = self.state.lock();
        let Some(_guard) = EvalGuard::enter(&state.evaluating) else {
            log::debug!("'{}': recursive evaluation detected", self.name);
            return (Err(ReturnValue::RecursiveCall), false);
        };
        match self.evaluate(&state) {
            Ok(value) => {
                let changed = state.store_current(&value);
                (Ok(value), changed)
            }
            Err(ReturnValue::RecursiveCall) => (Err(ReturnValue::RecursiveCall), false),
            Err(code) => {
                log::warn!("'{}': evaluation failed ({}), keeping last value", self.name, code);
                let last = state.current.borrow().clone();
                (Ok(last), false)
            }
        }
    }

    fn evaluate(&self, state: &PropertyState) -> Result<Any, ReturnValue> {
        let mut value = self.read_top(state)?;
        let modifiers = state.modifiers.borrow().clone();
        for modifier in &modifiers {
            if !modifier.is_compatible(value.type_uid()) {
                continue;
            }
            let mut next = value.clone();
            let eval = modifier.process_on_get(&mut next);
            if eval.action() == Action::Error {
                log::debug!("'{}': modifier '{}' aborted get", self.name, modifier.name());
                return Err(ReturnValue::Fail);
            }
            self.keep_if_changed(modifier, eval, &mut value, next);
            if eval.action() == Action::Return {
                break;
            }
        }
        Ok(value)
    }

    // Only a step that reports a change may alter the value
    fn keep_if_changed(&self, modifier: &Arc<dyn Modifier>, eval: Evaluation, value: &mut Any, next: Any) {
        if eval.is_changed() {
            *value = next;
        } else if next != *value {
            log::debug!(
                "'{}': modifier '{}' altered the value without reporting it, ignored",
                self.name,
                modifier.name()
            );
        }
    }

    fn read_top(&self, state: &PropertyState) -> Result<Any, ReturnValue> {
        loop {
            let top = state.values.borrow().last().cloned();
            let Some(entry) = top else {
                return Ok(state.default_value.borrow().clone());
            };
            if !entry.is_valid() {
                self.evict(state, &entry);
                continue;
            }
            return entry.get_value();
        }
    }

    fn evict(&self, state: &PropertyState, entry: &Arc<dyn Value>) {
        let removed = state.remove_entries(|e| same_value(e, entry));
        for entry in removed {
            log::debug!("'{}': evicted dead {:?} entry", self.name, entry.kind());
            entry.detach();
        }
    }

    fn notify(&self) {
        self.on_changed.invoke(self);
    }

    // ---- writes ----

    /// Write a value through the modifiers into the values stack
    pub fn set_value(&self, value: &Any) -> ReturnValue {
        let (code, changed) = self.commit_value(value);
        if changed {
            self.notify();
        }
        code
    }

    /// Typed [`set_value`](Self::set_value)
    pub fn set<T: AnyType>(&self, value: T) -> ReturnValue {
        self.set_value(&Any::new(value))
    }

    fn commit_value(&self, value: &Any) -> (ReturnValue, bool) {
        let state = self.state.lock();
        if !state.accepts(self.type_uid, value.type_uid()) {
            log::debug!("'{}': rejected value of type {}", self.name, value.type_name());
            return (ReturnValue::IncompatibleTypes, false);
        }
        let Some(_guard) = EvalGuard::enter(&state.evaluating) else {
            log::debug!("'{}': recursive set detected", self.name);
            return (ReturnValue::RecursiveCall, false);
        };

        let mut new_value = value.clone();
        let current = state.current.borrow().clone();
        let modifiers = state.modifiers.borrow().clone();
        for modifier in modifiers.iter().rev() {
            if !modifier.is_compatible(new_value.type_uid()) {
                continue;
            }
            let mut next = new_value.clone();
            let eval = modifier.process_on_set(&mut next, &current);
            if eval.action() == Action::Error {
                log::debug!("'{}': modifier '{}' vetoed set", self.name, modifier.name());
                return (ReturnValue::Fail, false);
            }
            self.keep_if_changed(modifier, eval, &mut new_value, next);
            if eval.action() == Action::Return {
                break;
            }
        }

        let code = self.store(&state, &new_value);
        if code.is_err() {
            return (code, false);
        }
        state.is_default.set(false);

        match self.evaluate(&state) {
            Ok(observed) => {
                let changed = state.store_current(&observed);
                let code = if changed {
                    ReturnValue::Success
                } else {
                    ReturnValue::NothingToDo
                };
                (code, changed)
            }
            Err(err) => {
                log::debug!("'{}': re-evaluation after set failed ({})", self.name, err);
                (code, false)
            }
        }
    }

    fn store(&self, state: &PropertyState, value: &Any) -> ReturnValue {
        let entries = state.values.borrow().clone();
        for entry in entries.iter().rev() {
            if !entry.is_valid() {
                self.evict(state, entry);
                continue;
            }
            let code = entry.set_value(value);
            if code.is_ok() || code == ReturnValue::RecursiveCall {
                return code;
            }
            log::trace!("'{}': {:?} entry declined write ({})", self.name, entry.kind(), code);
        }
        let entry: Arc<dyn Value> = StoredValue::new(value.clone());
        entry.attach(&self.this);
        state.values.borrow_mut().push(entry);
        ReturnValue::Success
    }

    // ---- values stack ----

    /// Push an entry on top of the values stack
    pub fn push_value(&self, entry: Arc<dyn Value>) -> ReturnValue {
        let index = self.state.lock().values.borrow().len();
        self.insert_value(index, entry)
    }

    /// Insert an entry; index 0 is the bottom of the stack
    pub fn insert_value(&self, index: usize, entry: Arc<dyn Value>) -> ReturnValue {
        if !entry.is_compatible(self.type_uid) {
            return ReturnValue::IncompatibleTypes;
        }
        {
            let state = self.state.lock();
            if index > state.values.borrow().len() {
                return ReturnValue::InvalidArgument;
            }
            entry.attach(&self.this);
            state.values.borrow_mut().insert(index, entry);
            state.is_default.set(false);
        }
        self.refresh();
        ReturnValue::Success
    }

    /// Remove and return the top entry
    pub fn pop_value(&self) -> Option<Arc<dyn Value>> {
        let popped = {
            let state = self.state.lock();
            let popped = state.values.borrow_mut().pop();
            if state.values.borrow().is_empty() {
                state.is_default.set(true);
            }
            popped
        }?;
        popped.detach();
        self.refresh();
        Some(popped)
    }

    /// Remove a specific entry
    pub fn remove_value(&self, entry: &Arc<dyn Value>) -> ReturnValue {
        let removed = self.state.lock().remove_entries(|e| same_value(e, entry));
        if removed.is_empty() {
            return ReturnValue::NotFound;
        }
        for entry in removed {
            entry.detach();
        }
        self.refresh();
        ReturnValue::Success
    }

    /// Snapshot of the values stack, bottom first
    pub fn values(&self) -> Vec<Arc<dyn Value>> {
        self.state.lock().values.borrow().clone()
    }

    /// The entry Get reads from
    pub fn top_value(&self) -> Option<Arc<dyn Value>> {
        self.state.lock().values.borrow().last().cloned()
    }

    /// Drop every value entry; the property reverts to its default
    pub fn reset_value(&self) -> ReturnValue {
        let removed = self.state.lock().remove_entries(|_| true);
        for entry in &removed {
            entry.detach();
        }
        self.refresh();
        if removed.is_empty() {
            ReturnValue::NothingToDo
        } else {
            ReturnValue::Success
        }
    }

    // ---- modifiers stack ----

    /// Append a modifier on top
    pub fn add_modifier(&self, modifier: Arc<dyn Modifier>) -> ReturnValue {
        let index = self.state.lock().modifiers.borrow().len();
        self.insert_modifier(index, modifier)
    }

    /// Insert a modifier; index 0 runs first on get and last on set
    pub fn insert_modifier(&self, index: usize, modifier: Arc<dyn Modifier>) -> ReturnValue {
        {
            let state = self.state.lock();
            let mut modifiers = state.modifiers.borrow_mut();
            if index > modifiers.len() {
                return ReturnValue::InvalidArgument;
            }
            modifiers.insert(index, modifier);
        }
        self.refresh();
        ReturnValue::Success
    }

    /// Remove a modifier
    pub fn remove_modifier(&self, modifier: &Arc<dyn Modifier>) -> ReturnValue {
        {
            let state = self.state.lock();
            let mut modifiers = state.modifiers.borrow_mut();
            let before = modifiers.len();
            modifiers.retain(|m| !std::ptr::eq(Arc::as_ptr(m) as *const (), Arc::as_ptr(modifier) as *const ()));
            if modifiers.len() == before {
                return ReturnValue::NotFound;
            }
        }
        self.refresh();
        ReturnValue::Success
    }

    /// Snapshot of the modifiers stack, bottom first
    pub fn modifiers(&self) -> Vec<Arc<dyn Modifier>> {
        self.state.lock().modifiers.borrow().clone()
    }

    /// Clear both stacks in one locked step
    pub fn remove_all(&self) {
        let removed = {
            let state = self.state.lock();
            state.modifiers.borrow_mut().clear();
            state.remove_entries(|_| true)
        };
        for entry in removed {
            entry.detach();
        }
        self.refresh();
    }

    // ---- default value ----

    /// True until the user overrides the property
    pub fn is_default_value(&self) -> bool {
        self.state.lock().is_default.get()
    }

    /// The default value
    pub fn default_value(&self) -> Any {
        self.state.lock().default_value.borrow().clone()
    }

    /// Replace the default value. Never changes [`is_default_value`](Self::is_default_value).
    pub fn set_default_value(&self, value: &Any) -> ReturnValue {
        let code = {
            let state = self.state.lock();
            if !state.accepts(self.type_uid, value.type_uid()) {
                return ReturnValue::IncompatibleTypes;
            }
            let mut default = state.default_value.borrow_mut();
            match default.set_value(value) {
                ReturnValue::Fail => ReturnValue::IncompatibleTypes,
                code => code,
            }
        };
        if code.changed() {
            self.refresh();
        }
        code
    }

    // ---- binds ----

    /// Replace any existing bind with one to `source`
    pub fn set_bind(&self, source: BindSource) -> ReturnValue {
        if !source.is_alive() {
            return ReturnValue::NotFound;
        }
        if !source.accepts(self.type_uid) {
            return ReturnValue::IncompatibleTypes;
        }
        let bind: Arc<dyn Value> = Bind::new(source);
        let removed = {
            let state = self.state.lock();
            let removed = state.remove_entries(|e| e.kind() == ValueKind::Bind);
            bind.attach(&self.this);
            state.values.borrow_mut().push(bind);
            state.is_default.set(false);
            removed
        };
        for entry in removed {
            entry.detach();
        }
        self.refresh();
        ReturnValue::Success
    }

    /// Remove every bind entry
    pub fn reset_bind(&self) -> ReturnValue {
        let removed = self
            .state
            .lock()
            .remove_entries(|e| e.kind() == ValueKind::Bind);
        if removed.is_empty() {
            return ReturnValue::NothingToDo;
        }
        for entry in removed {
            entry.detach();
        }
        self.refresh();
        ReturnValue::Success
    }

    /// Feed the default value from `source`
    pub fn bind_default(&self, source: BindSource) -> ReturnValue {
        if !source.is_alive() {
            return ReturnValue::NotFound;
        }
        if !source.accepts(self.type_uid) {
            return ReturnValue::IncompatibleTypes;
        }
        let bind = DefaultValueBind::new(source);
        let previous = self.state.lock().default_bind.replace(Some(bind.clone()));
        if let Some(previous) = previous {
            previous.detach();
        }
        bind.attach(&self.this);
        bind.apply()
    }

    /// Stop feeding the default value; the current default is kept
    pub fn reset_default_bind(&self) -> ReturnValue {
        match self.state.lock().default_bind.take() {
            Some(bind) => {
                bind.detach();
                ReturnValue::Success
            }
            None => ReturnValue::NothingToDo,
        }
    }

    /// The active default bind
    pub fn default_bind(&self) -> Option<Arc<DefaultValueBind>> {
        self.state.lock().default_bind.borrow().clone()
    }
}

impl Drop for StackProperty {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for entry in state.values.get_mut().drain(..) {
            entry.detach();
        }
        if let Some(bind) = state.default_bind.get_mut().take() {
            bind.detach();
        }
    }
}

impl fmt::Debug for StackProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let values = state.values.borrow().len();
        let modifiers = state.modifiers.borrow().len();
        f.debug_struct("StackProperty")
            .field("name", &self.name)
            .field("type_uid", &self.type_uid)
            .field("values", &values)
            .field("modifiers", &modifiers)
            .field("is_default", &state.is_default.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{ClampModifier, FnModifier, ReadOnlyModifier};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(property: &StackProperty) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        property.on_changed().subscribe(move |_: &StackProperty| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_default_and_override() {
        let p = StackProperty::of("speed", 1.5f32);
        assert_eq!(p.get::<f32>(), Some(1.5));
        assert!(p.is_default_value());

        assert_eq!(p.set(3.0f32), ReturnValue::Success);
        assert_eq!(p.get::<f32>(), Some(3.0));
        assert!(!p.is_default_value());
        assert_eq!(p.values().len(), 1);

        assert_eq!(p.reset_value(), ReturnValue::Success);
        assert_eq!(p.get::<f32>(), Some(1.5));
        assert!(p.is_default_value());
    }

    #[test]
    fn test_incompatible_set() {
        let p = StackProperty::of("count", 0i32);
        assert_eq!(p.set(1.0f64), ReturnValue::IncompatibleTypes);
        assert_eq!(p.get::<i32>(), Some(0));
    }

    #[test]
    fn test_notification_once_per_change() {
        let p = StackProperty::of("n", 0i32);
        let count = counter(&p);
        p.set(5i32);
        p.set(5i32);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(p.set(5i32), ReturnValue::NothingToDo);
    }

    #[test]
    fn test_top_entry_wins() {
        let p = StackProperty::of("n", 0i32);
        p.push_value(StoredValue::new(Any::new(1i32)));
        p.push_value(StoredValue::new(Any::new(2i32)));
        assert_eq!(p.get::<i32>(), Some(2));

        let top = p.pop_value().unwrap();
        assert_eq!(top.get_value().unwrap().get::<i32>(), Some(2));
        assert_eq!(p.get::<i32>(), Some(1));

        p.insert_value(0, StoredValue::new(Any::new(9i32)));
        assert_eq!(p.get::<i32>(), Some(1));
        assert_eq!(p.insert_value(5, StoredValue::new(Any::new(9i32))), ReturnValue::InvalidArgument);
    }

    #[test]
    fn test_set_falls_through_read_only_entries() {
        let p = StackProperty::of("n", 0i32);
        let stored = StoredValue::new(Any::new(1i32));
        p.push_value(stored.clone());
        p.push_value(crate::value::CustomValue::read_only(Any::new(7i32), || None));

        assert_eq!(p.set(4i32), ReturnValue::NothingToDo);
        assert_eq!(stored.get_value().unwrap().get::<i32>(), Some(4));
        assert_eq!(p.get::<i32>(), Some(7));
    }

    #[test]
    fn test_modifier_order() {
        let p = StackProperty::of("n", 0i32);
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for tag in ["bottom", "top"] {
            let get_log = log.clone();
            let set_log = log.clone();
            p.add_modifier(Arc::new(
                FnModifier::new(tag)
                    .with_get(move |_| {
                        get_log.lock().push(format!("get:{tag}"));
                        Evaluation::CONTINUE
                    })
                    .with_set(move |_, _| {
                        set_log.lock().push(format!("set:{tag}"));
                        Evaluation::CONTINUE
                    }),
            ));
        }
        log.lock().clear();
        p.set(1i32);
        let entries = log.lock().clone();
        assert_eq!(&entries[..4], ["set:top", "set:bottom", "get:bottom", "get:top"]);
    }

    #[test]
    fn test_veto_and_clamp() {
        let p = StackProperty::of("n", 0i32);
        p.add_modifier(Arc::new(ClampModifier::new(0i32, 10)));
        p.set(50i32);
        assert_eq!(p.get::<i32>(), Some(10));

        let read_only: Arc<dyn Modifier> = Arc::new(ReadOnlyModifier);
        p.add_modifier(read_only.clone());
        assert_eq!(p.set(3i32), ReturnValue::Fail);
        assert_eq!(p.get::<i32>(), Some(10));

        assert_eq!(p.remove_modifier(&read_only), ReturnValue::Success);
        assert_eq!(p.remove_modifier(&read_only), ReturnValue::NotFound);
        assert_eq!(p.set(3i32), ReturnValue::Success);
    }

    #[test]
    fn test_remove_all_clears_both_stacks() {
        let p = StackProperty::of("n", 2i32);
        p.add_modifier(Arc::new(ClampModifier::new(0i32, 1)));
        p.set(1i32);
        p.remove_all();
        assert!(p.values().is_empty());
        assert!(p.modifiers().is_empty());
        assert!(p.is_default_value());
        assert_eq!(p.get::<i32>(), Some(2));
    }

    #[test]
    fn test_set_default_keeps_flag() {
        let p = StackProperty::of("n", 1i32);
        let count = counter(&p);
        assert_eq!(p.set_default_value(&Any::new(4i32)), ReturnValue::Success);
        assert!(p.is_default_value());
        assert_eq!(p.get::<i32>(), Some(4));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_lock_is_reentrant() {
        let p = StackProperty::of("n", 1i32);
        let _lock = p.scoped_lock();
        p.set(2i32);
        assert_eq!(p.get::<i32>(), Some(2));
    }

    #[test]
    fn test_debug_reports_stack_sizes() {
        let p = StackProperty::of("n", 1i32);
        p.set(2i32);
        let text = format!("{:?}", p);
        assert!(text.contains("values: 1"));
        assert!(text.contains("modifiers: 0"));
    }

    #[test]
    fn test_self_bind_is_recursive() {
        let p = StackProperty::of("a", 1i32);
        p.set_bind(BindSource::property(&p));
        assert_eq!(p.get_value(), Err(ReturnValue::RecursiveCall));
    }
}
