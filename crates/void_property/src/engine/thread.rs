use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static IS_ENGINE_THREAD: Cell<bool> = const { Cell::new(false) };
}

/// Proof that the caller runs on the engine thread.
///
/// The token is `!Send`, so it cannot leave the thread it was obtained on.
/// Operations that touch native component memory take `&EngineThread`.
#[derive(Debug, Clone)]
pub struct EngineThread {
    _not_send: PhantomData<*const ()>,
}

impl EngineThread {
    /// Mark the current thread as the engine thread
    pub fn enter() -> Self {
        IS_ENGINE_THREAD.with(|flag| flag.set(true));
        log::debug!("engine thread entered: {:?}", std::thread::current().id());
        Self { _not_send: PhantomData }
    }

    /// Token for the current thread if it is the engine thread
    pub fn current() -> Option<Self> {
        Self::is_current().then(|| Self { _not_send: PhantomData })
    }

    /// True on the engine thread
    pub fn is_current() -> bool {
        IS_ENGINE_THREAD.with(Cell::get)
    }

    /// Unmark the current thread
    pub fn leave(self) {
        IS_ENGINE_THREAD.with(|flag| flag.set(false));
    }

    #[inline]
    pub(crate) fn debug_check(&self) {
        debug_assert!(Self::is_current(), "engine token used off the engine thread");
    }
}
