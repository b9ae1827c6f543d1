//! Reusable per-channel byte storage.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Byte buffer for one sonar channel that is reused across records.
///
/// Storage is replaced only when a record needs more bytes than the current capacity;
/// smaller records reuse the existing allocation. The number of bytes in use for the
/// current record is tracked separately from the capacity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelBuffer {
    data: Vec<u8>,
    len: usize,
}

impl ChannelBuffer {
    #[must_use]
    pub fn new() -> Self {
        ChannelBuffer::default()
    }

    /// Make room for `needed` bytes and return them for writing.
    ///
    /// # Errors
    /// [Error::MemoryFail] if a larger buffer cannot be allocated. The previous buffer is
    /// kept in that case.
    pub fn ensure_capacity(&mut self, needed: usize) -> Result<&mut [u8]> {
        if needed > self.data.len() {
            let mut data = Vec::new();
            data.try_reserve_exact(needed)
                .map_err(|_| Error::MemoryFail { requested: needed })?;
            data.resize(needed, 0);
            self.data = data;
        }
        self.len = needed;
        Ok(&mut self.data[..needed])
    }

    /// Largest payload seen so far.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes in use by the current record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }
}

/// Resize `v` to `n` elements of `fill`, failing with [Error::MemoryFail] rather than
/// aborting when the count comes from a corrupt stream.
pub(crate) fn resize_checked<T: Clone>(v: &mut Vec<T>, n: usize, fill: T) -> Result<()> {
    if n > v.len() {
        v.try_reserve_exact(n - v.len())
            .map_err(|_| Error::MemoryFail {
                requested: n.saturating_mul(std::mem::size_of::<T>()),
            })?;
    }
    v.resize(n, fill);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_only_when_larger() {
        let mut buf = ChannelBuffer::new();
        assert_eq!(buf.capacity(), 0);

        buf.ensure_capacity(16).unwrap().fill(7);
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.len(), 16);

        let dat = buf.ensure_capacity(4).unwrap();
        assert_eq!(dat.len(), 4);
        assert_eq!(dat, &[7, 7, 7, 7], "smaller request must reuse the old storage");
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.as_slice().len(), 4);

        buf.ensure_capacity(32).unwrap();
        assert_eq!(buf.capacity(), 32);
    }

    #[test]
    fn capacity_is_monotonic() {
        let mut buf = ChannelBuffer::new();
        let mut last = 0;
        for needed in [3, 10, 2, 0, 10, 11, 1, 64, 5] {
            buf.ensure_capacity(needed).unwrap();
            assert!(buf.capacity() >= last);
            assert!(buf.capacity() >= needed);
            assert_eq!(buf.len(), needed);
            last = buf.capacity();
        }
        assert_eq!(last, 64);
    }

    #[test]
    fn resize_checked_fills() {
        let mut v: Vec<u16> = vec![1, 2];
        resize_checked(&mut v, 4, 9).unwrap();
        assert_eq!(v, [1, 2, 9, 9]);
        resize_checked(&mut v, 1, 0).unwrap();
        assert_eq!(v, [1]);
    }
}
