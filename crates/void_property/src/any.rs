//! Type-erased value container
//!
//! [`Any`] is the currency of the property runtime: every property, value
//! entry and modifier exchanges values through it. An `Any` carries a
//! declared [`TypeUid`], the concrete payload and enough function pointers
//! to clone itself between item and array roles without knowing the
//! payload type statically.

use std::any::Any as StdAny;
use std::fmt;

use void_core::{ReturnValue, TypeUid};

/// Bounds every value stored in an [`Any`] must satisfy
pub trait AnyType: Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static> AnyType for T {}

/// Object-safe view of an [`AnyType`]
trait AnyData: Send + Sync + 'static {
    fn as_any(&self) -> &dyn StdAny;
    fn clone_box(&self) -> Box<dyn AnyData>;
    fn eq_data(&self, other: &dyn AnyData) -> bool;
    fn fmt_data(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: AnyType> AnyData for T {
    fn as_any(&self) -> &dyn StdAny {
        self
    }

    fn clone_box(&self) -> Box<dyn AnyData> {
        Box::new(self.clone())
    }

    fn eq_data(&self, other: &dyn AnyData) -> bool {
        other.as_any().downcast_ref::<T>().map_or(false, |other| other == self)
    }

    fn fmt_data(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the clone carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloneValue {
    /// Copy the current value
    Copy,
    /// Produce the type's default value
    Default,
}

/// Shape of the clone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloneRole {
    /// Single value
    Item,
    /// Array of the item type
    Array,
}

/// Options for [`Any::clone_with`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CloneOptions {
    pub value: CloneValue,
    pub role: CloneRole,
}

impl CloneOptions {
    /// Copy of the value in the given role
    pub const fn copy(role: CloneRole) -> Self {
        Self {
            value: CloneValue::Copy,
            role,
        }
    }

    /// Default value in the given role
    pub const fn default_value(role: CloneRole) -> Self {
        Self {
            value: CloneValue::Default,
            role,
        }
    }
}

type RoleFn = fn(&dyn AnyData, CloneValue) -> Option<Any>;

/// Type-erased value with a declared type uid
pub struct Any {
    uid: TypeUid,
    type_name: &'static str,
    role: CloneRole,
    data: Box<dyn AnyData>,
    compatible: Vec<TypeUid>,
    default_fn: fn() -> Box<dyn AnyData>,
    to_array: RoleFn,
    to_item: RoleFn,
}

fn default_data<T: AnyType>() -> Box<dyn AnyData> {
    Box::new(T::default())
}

fn item_to_array<T: AnyType>(data: &dyn AnyData, value: CloneValue) -> Option<Any> {
    let item = data.as_any().downcast_ref::<T>()?;
    let items = match value {
        CloneValue::Copy => vec![item.clone()],
        CloneValue::Default => Vec::new(),
    };
    Some(Any::array(items))
}

fn item_to_item<T: AnyType>(data: &dyn AnyData, value: CloneValue) -> Option<Any> {
    let item = data.as_any().downcast_ref::<T>()?;
    Some(match value {
        CloneValue::Copy => Any::new(item.clone()),
        CloneValue::Default => Any::new(T::default()),
    })
}

fn array_to_item<T: AnyType>(data: &dyn AnyData, value: CloneValue) -> Option<Any> {
    let items = data.as_any().downcast_ref::<Vec<T>>()?;
    Some(match value {
        CloneValue::Copy => Any::new(items.first().cloned().unwrap_or_default()),
        CloneValue::Default => Any::new(T::default()),
    })
}

fn array_to_array<T: AnyType>(data: &dyn AnyData, value: CloneValue) -> Option<Any> {
    let items = data.as_any().downcast_ref::<Vec<T>>()?;
    Some(match value {
        CloneValue::Copy => Any::array(items.clone()),
        CloneValue::Default => Any::array(Vec::<T>::new()),
    })
}

impl Any {
    /// Wrap a single value
    pub fn new<T: AnyType>(value: T) -> Self {
        Self {
            uid: TypeUid::of::<T>(),
            type_name: std::any::type_name::<T>(),
            role: CloneRole::Item,
            data: Box::new(value),
            compatible: Vec::new(),
            default_fn: default_data::<T>,
            to_array: item_to_array::<T>,
            to_item: item_to_item::<T>,
        }
    }

    /// Wrap an array of values
    pub fn array<T: AnyType>(values: Vec<T>) -> Self {
        Self {
            uid: TypeUid::of::<Vec<T>>(),
            type_name: std::any::type_name::<Vec<T>>(),
            role: CloneRole::Array,
            data: Box::new(values),
            compatible: Vec::new(),
            default_fn: default_data::<Vec<T>>,
            to_array: array_to_array::<T>,
            to_item: array_to_item::<T>,
        }
    }

    /// The default value of `T`
    pub fn of_default<T: AnyType>() -> Self {
        Self::new(T::default())
    }

    /// Override the declared uid, e.g. to tag a payload with an engine type
    pub fn with_uid(mut self, uid: TypeUid) -> Self {
        self.uid = uid;
        self
    }

    /// Declare another uid this value accepts assignments from
    pub fn with_compatible(mut self, uid: TypeUid) -> Self {
        if !self.compatible.contains(&uid) {
            self.compatible.push(uid);
        }
        self
    }

    /// Declared type uid
    #[inline]
    pub fn type_uid(&self) -> TypeUid {
        self.uid
    }

    /// Rust type name of the payload
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Item or array
    #[inline]
    pub fn role(&self) -> CloneRole {
        self.role
    }

    /// True if `uid` is the declared uid or one of the compatible uids
    pub fn is_compatible(&self, uid: TypeUid) -> bool {
        self.uid == uid || self.compatible.contains(&uid)
    }

    /// True if the payload is a `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.data.as_any().is::<T>()
    }

    /// Borrow the payload as `T`
    pub fn get_ref<T: 'static>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }

    /// Clone the payload as `T`
    pub fn get<T: AnyType>(&self) -> Option<T> {
        self.get_ref::<T>().cloned()
    }

    /// Payload as `T`, or `T::default()` if it holds something else
    pub fn get_or_default<T: AnyType>(&self) -> T {
        self.get().unwrap_or_default()
    }

    /// Assign from another `Any`.
    ///
    /// Returns `NothingToDo` when the values are already equal and `Fail`
    /// when the types do not match.
    pub fn set_value(&mut self, other: &Any) -> ReturnValue {
        if !self.is_compatible(other.uid) && !other.is_compatible(self.uid) {
            log::debug!(
                "Any: cannot assign {} to {}",
                other.type_name,
                self.type_name
            );
            return ReturnValue::Fail;
        }
        if self.data.as_any().type_id() != other.data.as_any().type_id() {
            return ReturnValue::Fail;
        }
        if self.data.eq_data(other.data.as_ref()) {
            return ReturnValue::NothingToDo;
        }
        self.data = other.data.clone_box();
        ReturnValue::Success
    }

    /// Assign a typed value
    pub fn set<T: AnyType>(&mut self, value: T) -> ReturnValue {
        match self.data.as_any().downcast_ref::<T>() {
            None => ReturnValue::Fail,
            Some(current) if *current == value => ReturnValue::NothingToDo,
            Some(_) => {
                self.data = Box::new(value);
                ReturnValue::Success
            }
        }
    }

    /// Clone with a value and role selection.
    ///
    /// Item to array wraps (one element for `Copy`, none for `Default`),
    /// array to item unwraps the first element.
    pub fn clone_with(&self, options: CloneOptions) -> Option<Any> {
        if options.role == self.role {
            return Some(match options.value {
                CloneValue::Copy => self.clone(),
                CloneValue::Default => self.default_like(),
            });
        }
        let converted = match options.role {
            CloneRole::Array => (self.to_array)(self.data.as_ref(), options.value),
            CloneRole::Item => (self.to_item)(self.data.as_ref(), options.value),
        }?;
        Some(converted)
    }

    /// Same type, compatibility list and uid, default payload
    pub fn default_like(&self) -> Any {
        Any {
            uid: self.uid,
            type_name: self.type_name,
            role: self.role,
            data: (self.default_fn)(),
            compatible: self.compatible.clone(),
            default_fn: self.default_fn,
            to_array: self.to_array,
            to_item: self.to_item,
        }
    }

    /// Check whether the payload equals `T::default()`-style default of its type
    pub fn is_default(&self) -> bool {
        self.data.eq_data((self.default_fn)().as_ref())
    }
}

impl Clone for Any {
    fn clone(&self) -> Self {
        Any {
            uid: self.uid,
            type_name: self.type_name,
            role: self.role,
            data: self.data.clone_box(),
            compatible: self.compatible.clone(),
            default_fn: self.default_fn,
            to_array: self.to_array,
            to_item: self.to_item,
        }
    }
}

impl PartialEq for Any {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid && self.data.eq_data(other.data.as_ref())
    }
}

impl fmt::Debug for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Any<{}>(", self.type_name)?;
        self.data.fmt_data(f)?;
        write!(f, ")")
    }
}
