//! Locate record boundaries in a stream by scanning for a magic prefix.
use std::io::Read;

use tracing::debug;

use crate::{bytes::Bytes, error::Result};

/// A located record start.
#[derive(Debug, PartialEq, Eq)]
pub struct Loc {
    /// Stream offset of the first byte of the window.
    pub offset: usize,
    /// Bytes discarded before the window was matched.
    pub skipped: usize,
    /// The matched window: the magic followed by any trailing bytes of the window.
    pub window: Vec<u8>,
}

/// Progress of the most recent scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Discarding bytes until the window starts with the magic.
    #[default]
    Seeking,
    /// Window matched after discarding this many bytes.
    Matched(usize),
}

/// Synchronizer scans a byte stream for a magic prefix, discarding bytes one at a time
/// until the leading bytes of a fixed size window match.
///
/// The window may be longer than the magic; the extra bytes are returned with the match
/// so the caller does not need to read them again.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    magic: Vec<u8>,
    window: usize,
    state: SyncState,
    /// Total bytes discarded over all scans.
    pub skipped: usize,
    /// Number of successful scans.
    pub hits: usize,
}

impl Synchronizer {
    /// Create a synchronizer for `magic`. A `window` shorter than the magic is widened to
    /// the magic's length. An empty magic matches at every position.
    #[must_use]
    pub fn new(magic: &[u8], window: usize) -> Self {
        debug_assert!(!magic.is_empty(), "magic must not be empty");
        Synchronizer {
            magic: magic.to_vec(),
            window: window.max(magic.len()),
            state: SyncState::Seeking,
            skipped: 0,
            hits: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Read until a window starting with the magic is found.
    ///
    /// # Errors
    /// [crate::Error::Eof] if the stream ends before a match, including while filling the
    /// first window. Any other read error as [crate::Error::Io].
    pub fn scan<R: Read>(&mut self, bytes: &mut Bytes<R>) -> Result<Loc> {
        self.state = SyncState::Seeking;
        let mut window = vec![0u8; self.window];
        bytes.read_exact(&mut window)?;

        let mut skipped = 0;
        while window[..self.magic.len()] != self.magic[..] {
            window.rotate_left(1);
            let last = window.len() - 1;
            window[last] = bytes.next()?;
            skipped += 1;
        }

        let offset = bytes.offset() - window.len();
        if skipped > 0 {
            debug!(skipped, offset, "resynchronized on magic");
        }
        self.state = SyncState::Matched(skipped);
        self.skipped += skipped;
        self.hits += 1;

        Ok(Loc {
            offset,
            skipped,
            window,
        })
    }
}
