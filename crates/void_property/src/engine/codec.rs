use std::fmt;

use bytemuck::Pod;
use void_core::TypeUid;

use crate::any::{Any, AnyType};

/// Converts between an [`Any`] and the native byte layout of its type
#[derive(Clone, Copy)]
pub struct ByteCodec {
    uid: TypeUid,
    size: usize,
    type_name: &'static str,
    encode: fn(&Any) -> Option<Vec<u8>>,
    decode: fn(&[u8]) -> Option<Any>,
}

fn encode_pod<T: AnyType + Pod>(value: &Any) -> Option<Vec<u8>> {
    value.get_ref::<T>().map(|v| bytemuck::bytes_of(v).to_vec())
}

fn decode_pod<T: AnyType + Pod>(bytes: &[u8]) -> Option<Any> {
    bytemuck::try_pod_read_unaligned::<T>(bytes).ok().map(Any::new)
}

impl ByteCodec {
    /// Codec for a plain-old-data type
    pub fn of<T: AnyType + Pod>() -> Self {
        Self {
            uid: TypeUid::of::<T>(),
            size: std::mem::size_of::<T>(),
            type_name: std::any::type_name::<T>(),
            encode: encode_pod::<T>,
            decode: decode_pod::<T>,
        }
    }

    /// Type this codec handles
    pub fn type_uid(&self) -> TypeUid {
        self.uid
    }

    /// Native size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Native bytes of `value`; `None` if it holds another type
    pub fn encode(&self, value: &Any) -> Option<Vec<u8>> {
        (self.encode)(value)
    }

    /// Value from native bytes; `None` on a size mismatch
    pub fn decode(&self, bytes: &[u8]) -> Option<Any> {
        (self.decode)(bytes)
    }

    /// Value decoded from zeroed memory
    pub fn zeroed(&self) -> Option<Any> {
        self.decode(&vec![0; self.size])
    }
}

impl fmt::Debug for ByteCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteCodec")
            .field("type", &self.type_name)
            .field("size", &self.size)
            .finish()
    }
}
