use glam::{Quat, Vec2, Vec3, Vec4};
use void_core::ReturnValue;

use super::host::HostValue;
use crate::any::AnyType;

/// Values a proxy can address member by member
pub trait ProxyMembers: AnyType {
    /// Member names, in host array order
    const MEMBERS: &'static [&'static str];

    /// Read one member
    fn get_member(&self, name: &str) -> Option<HostValue>;

    /// Write one member. `NotFound` for unknown names, `InvalidArgument`
    /// when the host value has the wrong shape; `self` is untouched on
    /// failure.
    fn set_member(&mut self, name: &str, value: &HostValue) -> ReturnValue;

    /// Whole value as a host value
    fn to_host(&self) -> HostValue {
        HostValue::Array(
            Self::MEMBERS
                .iter()
                .map(|name| self.get_member(name).unwrap_or_default())
                .collect(),
        )
    }

    /// Whole value from a host value
    fn from_host(value: &HostValue) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != Self::MEMBERS.len() {
            return None;
        }
        let mut out = Self::default();
        for (name, item) in Self::MEMBERS.iter().zip(items) {
            if out.set_member(name, item).is_err() {
                return None;
            }
        }
        Some(out)
    }
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> ReturnValue {
    if *slot == value {
        ReturnValue::NothingToDo
    } else {
        *slot = value;
        ReturnValue::Success
    }
}

const SCALAR: &[&str] = &["value"];

impl ProxyMembers for f32 {
    const MEMBERS: &'static [&'static str] = SCALAR;

    fn get_member(&self, name: &str) -> Option<HostValue> {
        (name == "value").then(|| HostValue::from(*self))
    }

    fn set_member(&mut self, name: &str, value: &HostValue) -> ReturnValue {
        if name != "value" {
            return ReturnValue::NotFound;
        }
        match value.as_number() {
            Some(n) => assign(self, n as f32),
            None => ReturnValue::InvalidArgument,
        }
    }

    fn to_host(&self) -> HostValue {
        HostValue::from(*self)
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_number().map(|n| n as f32)
    }
}

impl ProxyMembers for f64 {
    const MEMBERS: &'static [&'static str] = SCALAR;

    fn get_member(&self, name: &str) -> Option<HostValue> {
        (name == "value").then(|| HostValue::from(*self))
    }

    fn set_member(&mut self, name: &str, value: &HostValue) -> ReturnValue {
        if name != "value" {
            return ReturnValue::NotFound;
        }
        match value.as_number() {
            Some(n) => assign(self, n),
            None => ReturnValue::InvalidArgument,
        }
    }

    fn to_host(&self) -> HostValue {
        HostValue::from(*self)
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_number()
    }
}

impl ProxyMembers for i32 {
    const MEMBERS: &'static [&'static str] = SCALAR;

    fn get_member(&self, name: &str) -> Option<HostValue> {
        (name == "value").then(|| HostValue::from(*self))
    }

    fn set_member(&mut self, name: &str, value: &HostValue) -> ReturnValue {
        if name != "value" {
            return ReturnValue::NotFound;
        }
        match value.as_number() {
            Some(n) if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 => assign(self, n as i32),
            _ => ReturnValue::InvalidArgument,
        }
    }

    fn to_host(&self) -> HostValue {
        HostValue::from(*self)
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        let mut out = 0i32;
        out.set_member("value", value).is_ok().then_some(out)
    }
}

impl ProxyMembers for bool {
    const MEMBERS: &'static [&'static str] = SCALAR;

    fn get_member(&self, name: &str) -> Option<HostValue> {
        (name == "value").then(|| HostValue::from(*self))
    }

    fn set_member(&mut self, name: &str, value: &HostValue) -> ReturnValue {
        if name != "value" {
            return ReturnValue::NotFound;
        }
        match value.as_bool() {
            Some(b) => assign(self, b),
            None => ReturnValue::InvalidArgument,
        }
    }

    fn to_host(&self) -> HostValue {
        HostValue::from(*self)
    }

    fn from_host(value: &HostValue) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! vector_members {
    ($ty:ty, [$($field:ident),+]) => {
        impl ProxyMembers for $ty {
            const MEMBERS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn get_member(&self, name: &str) -> Option<HostValue> {
                match name {
                    $(stringify!($field) => Some(HostValue::from(self.$field)),)+
                    _ => None,
                }
            }

            fn set_member(&mut self, name: &str, value: &HostValue) -> ReturnValue {
                let slot = match name {
                    $(stringify!($field) => &mut self.$field,)+
                    _ => return ReturnValue::NotFound,
                };
                match value.as_number() {
                    Some(n) => assign(slot, n as f32),
                    None => ReturnValue::InvalidArgument,
                }
            }
        }
    };
}

vector_members!(Vec2, [x, y]);
vector_members!(Vec3, [x, y, z]);
vector_members!(Vec4, [x, y, z, w]);
vector_members!(Quat, [x, y, z, w]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_members() {
        let mut v = Vec4::ZERO;
        assert_eq!(v.set_member("y", &HostValue::Number(2.0)), ReturnValue::Success);
        assert_eq!(v.set_member("y", &HostValue::Number(2.0)), ReturnValue::NothingToDo);
        assert_eq!(v.set_member("q", &HostValue::Number(1.0)), ReturnValue::NotFound);
        assert_eq!(v.set_member("x", &HostValue::Bool(true)), ReturnValue::InvalidArgument);
        assert_eq!(v, Vec4::new(0.0, 2.0, 0.0, 0.0));
        assert_eq!(v.get_member("y"), Some(HostValue::Number(2.0)));
        assert_eq!(v.get_member("value"), None);
    }

    #[test]
    fn test_host_round_trip_shapes() {
        let host = Vec3::new(1.0, 2.0, 3.0).to_host();
        assert_eq!(host.as_array().map(<[HostValue]>::len), Some(3));
        assert_eq!(Vec3::from_host(&host), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(Vec2::from_host(&host), None);
        assert_eq!(i32::from_host(&HostValue::Number(1.5)), None);
        assert_eq!(bool::from_host(&HostValue::Bool(true)), Some(true));
    }
}
