//! Batch-scoped tracking of opened data-source streams.
//!
//! Every stream opened to satisfy an attachment is registered in the
//! [`StreamRegistry`] of its batch. The HTTP layer reads from a shared handle,
//! so the registry stays the single owner that closes each stream exactly
//! once when the batch settles, whether it succeeded or failed.

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use log::debug;
use parking_lot::Mutex;
use std::io::{ErrorKind, Read};
use std::sync::Arc;

use crate::source::{AttachedSource, SourceReader};

/// Size of the chunks handed to the HTTP body.
const CHUNK_SIZE: usize = 64 * 1024;

type Slot = Arc<Mutex<Option<SourceReader>>>;

/// Shared handle to an opened source stream.
///
/// Clones refer to the same underlying reader.
#[derive(Clone)]
pub struct TrackedStream {
    slot: Slot,
}

impl std::fmt::Debug for TrackedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl TrackedStream {
    fn new(reader: SourceReader) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(reader))),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Drop the reader. Returns `false` if it was already closed.
    fn close(&self) -> bool {
        let reader = self.slot.lock().take();
        reader.is_some()
    }

    /// Body stream that reads the source in chunks on the blocking pool.
    ///
    /// Reading after the registry closed the stream yields an error, so a
    /// cancelled upload is never mistaken for a complete one.
    pub fn body_stream(&self) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
        stream::try_unfold(Arc::clone(&self.slot), |slot| async move {
            let (slot, chunk) = tokio::task::spawn_blocking(move || {
                let chunk = read_chunk(&slot);
                (slot, chunk)
            })
            .await
            .map_err(std::io::Error::other)?;
            Ok::<_, std::io::Error>(chunk?.map(|bytes| (bytes, slot)))
        })
    }
}

fn read_chunk(slot: &Mutex<Option<SourceReader>>) -> std::io::Result<Option<Bytes>> {
    let mut guard = slot.lock();
    let Some(reader) = guard.as_mut() else {
        return Err(std::io::Error::new(
            ErrorKind::BrokenPipe,
            "attached stream was closed before the upload finished",
        ));
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(n) => {
                buf.truncate(n);
                return Ok(Some(Bytes::from(buf)));
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Streams opened for one batch.
///
/// Dropping the registry closes whatever is still open.
#[derive(Default)]
pub struct StreamRegistry {
    streams: Mutex<Vec<TrackedStream>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `source` and register the resulting stream with this batch.
    pub fn open(&self, source: &dyn AttachedSource, gzip: bool) -> std::io::Result<TrackedStream> {
        let tracked = TrackedStream::new(source.open(gzip)?);
        let mut streams = self.streams.lock();
        streams.push(tracked.clone());
        debug!("[CH_STREAMS] Opened stream #{} (gzip={})", streams.len(), gzip);
        Ok(tracked)
    }

    /// Number of streams currently registered.
    pub fn len(&self) -> usize {
        self.streams.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every registered stream. Returns how many were closed by this call.
    pub fn close_all(&self) -> usize {
        let streams = std::mem::take(&mut *self.streams.lock());
        let closed = streams.iter().filter(|stream| stream.close()).count();
        if closed > 0 {
            debug!("[CH_STREAMS] Closed {} stream(s)", closed);
        }
        closed
    }
}

impl Drop for StreamRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
