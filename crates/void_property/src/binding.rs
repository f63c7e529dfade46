//! Binding - a reusable bind description applied to target properties

use std::sync::{Arc, Weak};

use void_core::ReturnValue;

use crate::function::Function;
use crate::property::StackProperty;
use crate::value::BindSource;

/// Describes what a property should be bound to.
///
/// A function binding takes precedence over a source property; a binding
/// with neither removes existing binds from the target.
#[derive(Clone, Default)]
pub struct Binding {
    source: Option<Weak<StackProperty>>,
    function: Option<Weak<Function>>,
}

impl Binding {
    /// Empty binding; applying it unbinds the target
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a property
    pub fn to_property(source: &Arc<StackProperty>) -> Self {
        Self {
            source: Some(Arc::downgrade(source)),
            function: None,
        }
    }

    /// Bind to a function
    pub fn to_function(function: &Arc<Function>) -> Self {
        Self {
            source: None,
            function: Some(Arc::downgrade(function)),
        }
    }

    /// Set the source property
    pub fn set_source(&mut self, source: &Arc<StackProperty>) {
        self.source = Some(Arc::downgrade(source));
    }

    /// Set the function
    pub fn set_function(&mut self, function: &Arc<Function>) {
        self.function = Some(Arc::downgrade(function));
    }

    /// Apply to `target` under its lock
    pub fn make_bind(&self, target: &StackProperty) -> ReturnValue {
        let _lock = target.scoped_lock();
        if let Some(function) = &self.function {
            target.set_bind(BindSource::Function(function.clone()))
        } else if let Some(source) = &self.source {
            target.set_bind(BindSource::Property(source.clone()))
        } else {
            target.reset_bind()
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("source", &self.source.is_some())
            .field("function", &self.function.is_some())
            .finish()
    }
}
