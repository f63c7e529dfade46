use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use void_core::{ReturnValue, TypeUid};

use super::{Value, ValueKind};
use crate::any::Any;

type Getter = Arc<dyn Fn() -> Option<Any> + Send + Sync>;
type Setter = Arc<dyn Fn(&Any) -> ReturnValue + Send + Sync>;

/// Stack entry backed by a get/set function pair.
///
/// The last value seen through either hook is mirrored locally and served
/// when the getter has nothing to report.
pub struct CustomValue {
    getter: Getter,
    setter: Option<Setter>,
    cache: Mutex<Any>,
}

impl CustomValue {
    /// Read/write hooks; `initial` fixes the value type
    pub fn new<G, S>(initial: Any, getter: G, setter: S) -> Arc<Self>
    where
        G: Fn() -> Option<Any> + Send + Sync + 'static,
        S: Fn(&Any) -> ReturnValue + Send + Sync + 'static,
    {
        Arc::new(Self {
            getter: Arc::new(getter),
            setter: Some(Arc::new(setter)),
            cache: Mutex::new(initial),
        })
    }

    /// Getter only; writes fall through to lower entries
    pub fn read_only<G>(initial: Any, getter: G) -> Arc<Self>
    where
        G: Fn() -> Option<Any> + Send + Sync + 'static,
    {
        Arc::new(Self {
            getter: Arc::new(getter),
            setter: None,
            cache: Mutex::new(initial),
        })
    }

    /// Last mirrored value
    pub fn cached(&self) -> Any {
        self.cache.lock().clone()
    }
}

impl Value for CustomValue {
    fn get_value(&self) -> Result<Any, ReturnValue> {
        match (self.getter)() {
            Some(value) => {
                let mut cache = self.cache.lock();
                if cache.set_value(&value) == ReturnValue::Fail {
                    return Err(ReturnValue::IncompatibleTypes);
                }
                Ok(value)
            }
            None => Ok(self.cache.lock().clone()),
        }
    }

    fn set_value(&self, value: &Any) -> ReturnValue {
        let Some(setter) = &self.setter else {
            return ReturnValue::NotSupported;
        };
        if !self.is_compatible(value.type_uid()) {
            return ReturnValue::IncompatibleTypes;
        }
        let code = setter(value);
        if code.is_ok() {
            self.cache.lock().set_value(value);
        }
        code
    }

    fn is_compatible(&self, uid: TypeUid) -> bool {
        self.cache.lock().is_compatible(uid)
    }

    fn clone_value(&self) -> Option<Arc<dyn Value>> {
        Some(Arc::new(CustomValue {
            getter: self.getter.clone(),
            setter: self.setter.clone(),
            cache: Mutex::new(self.cached()),
        }))
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Custom
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("cache", &*self.cache.lock())
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn test_hooks_and_cache() {
        let backing = Arc::new(AtomicI32::new(4));
        let read = backing.clone();
        let write = backing.clone();
        let entry = CustomValue::new(
            Any::new(0i32),
            move || Some(Any::new(read.load(Ordering::SeqCst))),
            move |value| match value.get::<i32>() {
                Some(v) => {
                    write.store(v, Ordering::SeqCst);
                    ReturnValue::Success
                }
                None => ReturnValue::IncompatibleTypes,
            },
        );

        assert_eq!(entry.get_value().unwrap().get::<i32>(), Some(4));
        assert_eq!(entry.set_value(&Any::new(9i32)), ReturnValue::Success);
        assert_eq!(backing.load(Ordering::SeqCst), 9);
        assert_eq!(entry.cached().get::<i32>(), Some(9));
        assert_eq!(entry.set_value(&Any::new(1.0f64)), ReturnValue::IncompatibleTypes);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let entry = CustomValue::read_only(Any::new(2u8), || None);
        assert_eq!(entry.get_value().unwrap().get::<u8>(), Some(2));
        assert_eq!(entry.set_value(&Any::new(3u8)), ReturnValue::NotSupported);
    }
}
