//! Named callables exposed by a [`MetaObject`](crate::object::MetaObject)

use std::fmt;
use std::sync::Arc;

use void_core::TypeUid;

use crate::any::Any;

type Callable = Box<dyn Fn(&[Any]) -> Option<Any> + Send + Sync>;

/// Named function over [`Any`] arguments
pub struct Function {
    name: String,
    result_uid: Option<TypeUid>,
    callable: Callable,
}

impl Function {
    /// Function with an undeclared result type
    pub fn new<F>(name: impl Into<String>, f: F) -> Arc<Self>
    where
        F: Fn(&[Any]) -> Option<Any> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            result_uid: None,
            callable: Box::new(f),
        })
    }

    /// Function declaring the type of its result
    pub fn returning<F>(name: impl Into<String>, result_uid: TypeUid, f: F) -> Arc<Self>
    where
        F: Fn(&[Any]) -> Option<Any> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            result_uid: Some(result_uid),
            callable: Box::new(f),
        })
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared result type
    pub fn result_uid(&self) -> Option<TypeUid> {
        self.result_uid
    }

    /// Invoke
    pub fn call(&self, args: &[Any]) -> Option<Any> {
        (self.callable)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("result_uid", &self.result_uid)
            .finish()
    }
}
