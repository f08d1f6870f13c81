/*
 * Opaque identifier for a logical thread. `std::thread::ThreadId` cannot be
 * turned into a number on stable Rust, and sink headers want a printable id,
 * so each thread draws a process-unique key from a counter the first time it
 * asks for one.
 */
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_THREAD_KEY: Cell<Option<ThreadKey>> = const { Cell::new(None) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadKey(u64);

impl ThreadKey {
    // Key of the calling thread. Stable for the thread's whole life.
    pub fn current() -> Self {
        CURRENT_THREAD_KEY.with(|slot| match slot.get() {
            Some(key) => key,
            None => {
                let key = ThreadKey(NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed));
                slot.set(Some(key));
                key
            }
        })
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
