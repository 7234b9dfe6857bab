use std::io;
use std::sync::atomic::{AtomicU32, Ordering};

use stories::{KeyValueStore, MemStore, StoreError};

/// In-memory store counting writes, optionally refusing them.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: MemStore,
    pub fail_writes: bool,
    writes: AtomicU32,
}

impl CountingStore {
    pub fn new() -> Self { Self::default() }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> u32 { self.writes.load(Ordering::SeqCst) }

    /// Puts raw data under the key, bypassing the write counter.
    pub fn put_raw(&self, key: &str, value: &str) { self.inner.set(key, value).unwrap() }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> { self.inner.get(key) }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "disk is full").into());
        }
        self.inner.set(key, value)
    }
}
