use std::sync::Arc;

use parking_lot::Mutex;
use void_core::{ReturnValue, TypeUid};

use super::{Value, ValueKind};
use crate::any::Any;

/// Stack entry that owns its value
pub struct StoredValue {
    value: Mutex<Any>,
}

impl StoredValue {
    /// Create an entry holding `value`
    pub fn new(value: Any) -> Arc<Self> {
        Arc::new(Self {
            value: Mutex::new(value),
        })
    }
}

impl Value for StoredValue {
    fn get_value(&self) -> Result<Any, ReturnValue> {
        Ok(self.value.lock().clone())
    }

    fn set_value(&self, value: &Any) -> ReturnValue {
        let mut current = self.value.lock();
        match current.set_value(value) {
            ReturnValue::Fail => ReturnValue::IncompatibleTypes,
            code => code,
        }
    }

    fn is_compatible(&self, uid: TypeUid) -> bool {
        self.value.lock().is_compatible(uid)
    }

    fn clone_value(&self) -> Option<Arc<dyn Value>> {
        Some(StoredValue::new(self.value.lock().clone()))
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_value() {
        let entry = StoredValue::new(Any::new(1i32));
        assert_eq!(entry.set_value(&Any::new(1i32)), ReturnValue::NothingToDo);
        assert_eq!(entry.set_value(&Any::new(2i32)), ReturnValue::Success);
        assert_eq!(entry.set_value(&Any::new(2.0f32)), ReturnValue::IncompatibleTypes);
        assert_eq!(entry.get_value().unwrap().get::<i32>(), Some(2));

        let copy = entry.clone_value().unwrap();
        entry.set_value(&Any::new(3i32));
        assert_eq!(copy.get_value().unwrap().get::<i32>(), Some(2));
    }
}
