//! Identifiers: 128-bit type uids and process-unique object ids

use core::sync::atomic::{AtomicU64, Ordering};
use core::fmt;

const FNV128_OFFSET: u128 = 0x6c62272e07bb014262b821756295c58d;
const FNV128_PRIME: u128 = 0x0000000001000000000000000000013B;

/// 128-bit type identifier used to key factories and compatibility checks
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeUid(u128);

impl TypeUid {
    /// The invalid uid
    pub const NONE: TypeUid = TypeUid(0);

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[inline]
    pub const fn to_bits(&self) -> u128 {
        self.0
    }

    /// Check if this uid is valid
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }

    /// Derive a uid from a name (FNV-1a, 128 bit)
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = FNV128_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u128;
            hash = hash.wrapping_mul(FNV128_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Uid of a Rust type, stable for a given compiler and type path
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::from_name(core::any::type_name::<T>())
    }
}

impl Default for TypeUid {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Debug for TypeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeUid({:032x})", self.0)
    }
}

impl fmt::Display for TypeUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Process-unique identifier for objects, properties and proxies
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Null id, never handed out by the generator
    pub const NULL: ObjectId = ObjectId(0);

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        self.0
    }

    /// Check if this id is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Next id from the process-wide generator
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ObjectId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectId(null)")
        } else {
            write!(f, "ObjectId({})", self.0)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_uid_is_deterministic() {
        assert_eq!(TypeUid::of::<f32>(), TypeUid::of::<f32>());
        assert_ne!(TypeUid::of::<f32>(), TypeUid::of::<f64>());
        assert_eq!(TypeUid::from_name("f32"), TypeUid::of::<f32>());
        assert!(TypeUid::of::<u8>().is_valid());
    }

    #[test]
    fn test_object_ids_are_unique() {
        let id1 = ObjectId::next();
        let id2 = ObjectId::next();
        assert_ne!(id1, id2);
        assert!(!id1.is_null());
        assert!(id2.to_bits() > id1.to_bits());
    }
}
