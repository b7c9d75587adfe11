//! Transactional message recording.
//!
//! A [`MessageDatabase`] opens one [`RecordingStream`] per producer/handler
//! pair; each recorded message is one transaction, written through a
//! [`Recorder`] and closed with [`Recorder::release`]. Every step may come
//! back empty, in which case the message is simply not recorded.

mod memory;

pub use memory::{MemoryDatabase, MemoryStream, Transaction};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

use crate::message::FieldValue;

/// Stream kind used for report messages.
pub const MESSAGE_STREAM_KIND: &str = "MESSAGES";

/// Recording backend.
pub trait MessageDatabase: Send + Sync {
    /// Open a stream named `name` within `scope`, tagged with `kind`.
    fn open_stream(&self, name: &str, scope: &str, kind: &str) -> Option<Arc<dyn RecordingStream>>;
}

/// An open stream of transactions.
pub trait RecordingStream: Send + Sync {
    /// Begin a transaction; `None` if the stream refuses it.
    fn open_recorder(&self, name: &str, type_name: &str) -> Option<Box<dyn Recorder>>;
}

/// One in-flight transaction.
pub trait Recorder: Send {
    fn record_field(&mut self, name: &str, value: FieldValue);

    /// Close the transaction.
    fn release(self: Box<Self>);
}

type StreamKey = (String, String);

/// Per-key slot. `opener` names the thread running `open_stream` for it.
#[derive(Default)]
struct StreamSlot {
    stream: OnceLock<Option<Arc<dyn RecordingStream>>>,
    opener: Mutex<Option<ThreadId>>,
}

impl StreamSlot {
    fn set_opener(&self, opener: Option<ThreadId>) {
        *self.opener.lock().unwrap_or_else(PoisonError::into_inner) = opener;
    }

    fn is_opened_by(&self, thread: ThreadId) -> bool {
        *self.opener.lock().unwrap_or_else(PoisonError::into_inner) == Some(thread)
    }
}

/// Clears the slot's opener when the open returns or unwinds.
struct OpenerGuard<'a>(&'a StreamSlot);

impl Drop for OpenerGuard<'_> {
    fn drop(&mut self) {
        self.0.set_opener(None);
    }
}

/// Lazily opened streams keyed by `(producer_name, handler_name)`.
#[derive(Default)]
pub(crate) struct StreamCache {
    slots: Mutex<HashMap<StreamKey, Arc<StreamSlot>>>,
}

impl StreamCache {
    /// Cached stream for the pair, opening it through `db` on first use.
    ///
    /// A pair is opened at most once even under concurrent first use: later
    /// callers wait on the key's slot, not on the whole cache, so `db` may
    /// report (and record) through the same server while it opens a stream.
    /// A report recorded into the very key being opened by the same thread
    /// gets no stream. Failed opens are not cached.
    pub(crate) fn get_or_open(
        &self,
        producer: &str,
        handler: &str,
        db: &dyn MessageDatabase,
    ) -> Option<Arc<dyn RecordingStream>> {
        let key = (producer.to_string(), handler.to_string());
        let slot = self.lock().entry(key.clone()).or_default().clone();

        if let Some(stream) = slot.stream.get() {
            return stream.clone();
        }
        let current = thread::current().id();
        if slot.is_opened_by(current) {
            tracing::debug!(producer, handler, "stream open in progress on this thread, not recorded");
            return None;
        }

        let stream = slot
            .stream
            .get_or_init(|| {
                slot.set_opener(Some(current));
                let _guard = OpenerGuard(&slot);
                let stream = db.open_stream(producer, handler, MESSAGE_STREAM_KIND);
                if stream.is_some() {
                    tracing::debug!(producer, handler, "opened message stream");
                }
                stream
            })
            .clone();

        if stream.is_none() {
            let mut slots = self.lock();
            if slots.get(&key).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                slots.remove(&key);
            }
        }
        stream
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StreamKey, Arc<StreamSlot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StreamCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCache").field("streams", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct NoStreams {
        attempts: AtomicUsize,
    }

    impl MessageDatabase for NoStreams {
        fn open_stream(&self, _: &str, _: &str, _: &str) -> Option<Arc<dyn RecordingStream>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn test_cache_opens_once_per_key() {
        let db = MemoryDatabase::new();
        let cache = StreamCache::default();

        assert!(cache.get_or_open("env", "h", &db).is_some());
        assert!(cache.get_or_open("env", "h", &db).is_some());
        assert!(cache.get_or_open("env", "other", &db).is_some());

        assert_eq!(db.stream_count(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_open_not_cached() {
        let db = NoStreams::default();
        let cache = StreamCache::default();

        assert!(cache.get_or_open("env", "h", &db).is_none());
        assert!(cache.get_or_open("env", "h", &db).is_none());

        assert_eq!(db.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_concurrent_first_use_opens_once() {
        let db = Arc::new(MemoryDatabase::new());
        let cache = Arc::new(StreamCache::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                let cache = cache.clone();
                std::thread::spawn(move || cache.get_or_open("env", "h", &*db).is_some())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(db.stream_count(), 1);
    }

    /// Database whose `open_stream` asks the cache for a stream again.
    struct Reentrant {
        inner: MemoryDatabase,
        cache: Arc<StreamCache>,
        nested: Mutex<Vec<bool>>,
    }

    impl MessageDatabase for Reentrant {
        fn open_stream(&self, name: &str, scope: &str, kind: &str) -> Option<Arc<dyn RecordingStream>> {
            let same_key = self.cache.get_or_open(name, scope, self).is_some();
            let other_key = self.cache.get_or_open("db", "internal", &self.inner).is_some();
            self.nested
                .lock()
                .unwrap()
                .extend([same_key, other_key]);
            self.inner.open_stream(name, scope, kind)
        }
    }

    #[test]
    fn test_reentrant_open_does_not_block() {
        let cache = Arc::new(StreamCache::default());
        let db = Reentrant {
            inner: MemoryDatabase::new(),
            cache: cache.clone(),
            nested: Mutex::new(Vec::new()),
        };

        assert!(cache.get_or_open("env", "h", &db).is_some());

        // Same key while it is opening: skipped. Other keys open normally.
        assert_eq!(*db.nested.lock().unwrap(), vec![false, true]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_or_open("env", "h", &db).is_some());
        assert_eq!(db.inner.stream_count(), 2);
    }
}
