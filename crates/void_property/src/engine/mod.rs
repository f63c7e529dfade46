//! Engine side - values backed by native component memory
//!
//! Native memory is owned by the engine thread. Every path that writes it
//! either runs there and holds an [`EngineThread`] token, or leaves the
//! write in the [`EngineValue`]'s cache until the next
//! [`EngineValueManager::sync`].

mod codec;
mod manager;
mod thread;
mod value;

pub use codec::ByteCodec;
pub use manager::EngineValueManager;
pub use thread::EngineThread;
pub use value::{
    ConflictPolicy, EnginePropertyParams, EngineSyncDirection, EngineValue, EngineValueOptions, PushMode,
};
