//! Result codes and error types for the core library

use core::fmt;
use alloc::boxed::Box;

/// Outcome of a property, value or sync operation.
///
/// `NothingToDo` is a successful outcome that reports "value unchanged",
/// so callers can skip change notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnValue {
    /// Operation succeeded and mutated state
    Success,
    /// Operation succeeded, state was already as requested
    NothingToDo,
    /// Generic failure
    Fail,
    /// Argument was rejected
    InvalidArgument,
    /// Value type is not compatible with the target
    IncompatibleTypes,
    /// Target (entry, member, object) does not exist
    NotFound,
    /// Evaluation re-entered itself
    RecursiveCall,
    /// Target cannot perform the operation
    NotSupported,
}

impl ReturnValue {
    /// True for `Success` and `NothingToDo`
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Success | Self::NothingToDo)
    }

    /// True for every failure code
    #[inline]
    pub const fn is_err(self) -> bool {
        !self.is_ok()
    }

    /// True only if state was mutated
    #[inline]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Convert into a `Result`, keeping success codes in `Ok`
    #[inline]
    pub fn into_result(self) -> core::result::Result<ReturnValue, ReturnValue> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(self)
        }
    }
}

impl Default for ReturnValue {
    fn default() -> Self {
        Self::Success
    }
}

impl fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReturnValue::Success => "success",
            ReturnValue::NothingToDo => "nothing to do",
            ReturnValue::Fail => "operation failed",
            ReturnValue::InvalidArgument => "invalid argument",
            ReturnValue::IncompatibleTypes => "incompatible types",
            ReturnValue::NotFound => "not found",
            ReturnValue::RecursiveCall => "recursive call",
            ReturnValue::NotSupported => "not supported",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ReturnValue {}

/// Type registry errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRegistryError {
    /// Type not registered
    NotRegistered(Box<str>),
    /// A different type is already registered under the same uid
    UidCollision { existing: Box<str>, new: Box<str> },
}

impl fmt::Display for TypeRegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRegistryError::NotRegistered(name) => write!(f, "Type not registered: {}", name),
            TypeRegistryError::UidCollision { existing, new } => {
                write!(f, "Type uid collision between '{}' and '{}'", existing, new)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TypeRegistryError {}
