//! The paired read/write name-codec factory. `get_for_read` is free;
//! `get_for_write` lazily pools one [`WriteNameCodec`] per thread per
//! feature set, since the compression table it holds must never be
//! shared across concurrent encodes.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::buffer::{ReadBuffer, WriteBuffer};
use crate::error::{Error, IllegalUsageReason};
use crate::name::{Name, NameCodecFeatures, ReadNameCodec, WriteNameCodec};

thread_local! {
    static WRITE_POOL: RefCell<HashMap<NameCodecFeatures, Vec<WriteNameCodec>>> =
        RefCell::new(HashMap::new());
}

/// Vends paired read/write name codecs for one feature set.
#[derive(Debug, Copy, Clone)]
pub struct NameCodecFactory {
    features: NameCodecFeatures,
}

impl NameCodecFactory {
    pub fn new(features: NameCodecFeatures) -> Self {
        NameCodecFactory { features }
    }

    pub fn features(&self) -> NameCodecFeatures {
        self.features
    }

    /// Read instances are stateless and may be freely shared or copied.
    pub fn get_for_read(&self) -> ReadHandle {
        ReadHandle {
            codec: ReadNameCodec {
                features: self.features,
            },
        }
    }

    /// Checks the thread-local pool for an idle write instance with this
    /// feature set before allocating a new one. A non-compressing
    /// feature set is truly stateless, so it skips the pool entirely.
    pub fn get_for_write(&self) -> WriteHandle {
        if !self.features.compression {
            return WriteHandle {
                codec: Some(WriteNameCodec::new(self.features)),
            };
        }
        let codec = WRITE_POOL.with(|pool| {
            pool.borrow_mut()
                .entry(self.features)
                .or_default()
                .pop()
        });
        WriteHandle {
            codec: Some(codec.unwrap_or_else(|| WriteNameCodec::new(self.features))),
        }
    }
}

/// A read-obtained handle. Calling `write_name` on it is an API misuse,
/// reported synchronously rather than silently doing the wrong thing.
pub struct ReadHandle {
    codec: ReadNameCodec,
}

impl ReadHandle {
    pub fn read_name(&self, buf: &mut ReadBuffer) -> Result<Name, Error> {
        self.codec.read_name(buf)
    }

    pub fn write_name(&self, _buf: &mut WriteBuffer, _name: &Name) -> Result<(), Error> {
        Err(Error::IllegalUsage(IllegalUsageReason::ReadInstanceUsedForWrite))
    }
}

/// A write-obtained handle, backed by a pooled [`WriteNameCodec`]. On
/// drop (or explicit `close`), its compression table is reset and it is
/// returned to the thread-local pool for reuse.
pub struct WriteHandle {
    codec: Option<WriteNameCodec>,
}

impl WriteHandle {
    pub fn write_name(&mut self, buf: &mut WriteBuffer, name: &Name) -> Result<(), Error> {
        self.codec
            .as_mut()
            .expect("WriteHandle used after close")
            .write_name(buf, name)
    }

    pub fn read_name(&self, _buf: &mut ReadBuffer) -> Result<Name, Error> {
        Err(Error::IllegalUsage(IllegalUsageReason::WriteInstanceUsedForRead))
    }

    /// Clear the compression table and return this instance to the pool
    /// explicitly. Equivalent to dropping the handle.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut codec) = self.codec.take() {
            if codec.features().compression {
                codec.reset();
                let features = codec.features();
                WRITE_POOL.with(|pool| {
                    pool.borrow_mut().entry(features).or_default().push(codec);
                });
            }
        }
    }
}

impl Drop for WriteHandle {
    fn drop(&mut self) {
        self.release();
    }
}
