//! Fixed width value access at byte offsets, and a push-back stream reader.
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};

use serde::{Deserialize, Serialize};

/// Byte order of multi-byte values on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// Byte order of the running host.
    #[must_use]
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }

    #[must_use]
    pub fn is_native(self) -> bool {
        self == Self::native()
    }
}

macro_rules! value_access {
    ($read:ident, $write:ident, $ty:ty) => {
        /// Read a value at `offset`. The caller guarantees the bytes are present.
        #[must_use]
        pub fn $read(buf: &[u8], offset: usize, order: Endianness) -> $ty {
            const N: usize = std::mem::size_of::<$ty>();
            let mut b = [0u8; N];
            b.copy_from_slice(&buf[offset..offset + N]);
            match order {
                Endianness::Big => <$ty>::from_be_bytes(b),
                Endianness::Little => <$ty>::from_le_bytes(b),
            }
        }

        /// Write a value at `offset`. The caller guarantees there is room.
        pub fn $write(buf: &mut [u8], offset: usize, value: $ty, order: Endianness) {
            const N: usize = std::mem::size_of::<$ty>();
            let b = match order {
                Endianness::Big => value.to_be_bytes(),
                Endianness::Little => value.to_le_bytes(),
            };
            buf[offset..offset + N].copy_from_slice(&b);
        }
    };
}

value_access!(read_u16, write_u16, u16);
value_access!(read_i16, write_i16, i16);
value_access!(read_u32, write_u32, u32);
value_access!(read_i32, write_i32, i32);
value_access!(read_f32, write_f32, f32);
value_access!(read_f64, write_f64, f64);

/// Reverse the byte order of every `width` sized value in `buf`.
///
/// `width` of 1 is a no-op. Trailing bytes that do not make up a whole value are left alone.
pub fn swap_in_place(buf: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for chunk in buf.chunks_exact_mut(width) {
        chunk.reverse();
    }
}

/// Sequential decoder over a fixed record buffer.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    order: Endianness,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8], order: Endianness) -> Self {
        Decoder { buf, pos: 0, order }
    }

    /// Start decoding at `pos`, e.g., after a magic number that has already been checked.
    pub fn at(buf: &'a [u8], pos: usize, order: Endianness) -> Self {
        Decoder { buf, pos, order }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn u8(&mut self) -> u8 {
        let v = self.buf[self.pos];
        self.pos += 1;
        v
    }

    pub fn u16(&mut self) -> u16 {
        let v = read_u16(self.buf, self.pos, self.order);
        self.pos += 2;
        v
    }

    pub fn u32(&mut self) -> u32 {
        let v = read_u32(self.buf, self.pos, self.order);
        self.pos += 4;
        v
    }

    pub fn i32(&mut self) -> i32 {
        let v = read_i32(self.buf, self.pos, self.order);
        self.pos += 4;
        v
    }

    pub fn f32(&mut self) -> f32 {
        let v = read_f32(self.buf, self.pos, self.order);
        self.pos += 4;
        v
    }

    pub fn f64(&mut self) -> f64 {
        let v = read_f64(self.buf, self.pos, self.order);
        self.pos += 8;
        v
    }
}

/// Sequential encoder that appends to an owned buffer.
pub struct Encoder {
    buf: Vec<u8>,
    order: Endianness,
}

impl Encoder {
    pub fn with_capacity(capacity: usize, order: Endianness) -> Self {
        Encoder {
            buf: Vec::with_capacity(capacity),
            order,
        }
    }

    fn put<const N: usize>(&mut self, be: [u8; N], le: [u8; N]) {
        match self.order {
            Endianness::Big => self.buf.extend_from_slice(&be),
            Endianness::Little => self.buf.extend_from_slice(&le),
        }
    }

    pub fn bytes(&mut self, dat: &[u8]) {
        self.buf.extend_from_slice(dat);
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.put(v.to_be_bytes(), v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.put(v.to_be_bytes(), v.to_le_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.put(v.to_be_bytes(), v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.put(v.to_be_bytes(), v.to_le_bytes());
    }

    pub fn f64(&mut self, v: f64) {
        self.put(v.to_be_bytes(), v.to_le_bytes());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bytes provides the ability to read bytes from a reader and push them
/// back if they are not needed, i.e., peek-and-push. The original order of
/// the bytes is preserved when pushing bytes back.
pub struct Bytes<R>
where
    R: Read,
{
    reader: R,
    num_read: usize,
    cache: VecDeque<u8>,
}

impl<R> Bytes<R>
where
    R: Read,
{
    pub fn new(reader: R) -> Self {
        Bytes {
            reader,
            num_read: 0,
            cache: VecDeque::new(),
        }
    }

    /// Next single byte.
    ///
    /// # Errors
    /// ``ErrorKind::UnexpectedEof`` at the end of the stream, or any other read error.
    pub fn next(&mut self) -> io::Result<u8> {
        if let Some(b) = self.cache.pop_front() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Err(io::Error::from(ErrorKind::UnexpectedEof)),
                Ok(_) => {
                    self.num_read += 1;
                    return Ok(buf[0]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Fill as much of `buf` as the stream allows and return the number of bytes placed.
    ///
    /// A count smaller than `buf.len()` means the stream ended.
    ///
    /// # Errors
    /// Any read error other than end of stream.
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.cache.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        while n < buf.len() {
            match self.reader.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(k) => {
                    self.num_read += k;
                    n += k;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(n)
    }

    /// Fill all of `buf`.
    ///
    /// # Errors
    /// ``ErrorKind::UnexpectedEof`` if the stream ends first. Bytes that were read are
    /// consumed regardless.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.fill(buf)? == buf.len() {
            Ok(())
        } else {
            Err(io::Error::from(ErrorKind::UnexpectedEof))
        }
    }

    /// Push bytes back so they are produced again, in order, by the next reads.
    pub fn push(&mut self, dat: &[u8]) {
        for b in dat.iter().rev() {
            self.cache.push_front(*b);
        }
    }

    /// Number of bytes consumed from the stream, not counting pushed back bytes.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.num_read - self.cache.len()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_values_in_both_orders() {
        let dat = [0x3d, 0x46, 0x00, 0x00, 0x80, 0x3f];
        assert_eq!(read_u16(&dat, 0, Endianness::Big), 0x3d46);
        assert_eq!(read_u16(&dat, 0, Endianness::Little), 0x463d);
        assert_eq!(read_f32(&dat, 2, Endianness::Little), 1.0);
        assert_eq!(read_i16(&[0xff, 0xfe], 0, Endianness::Big), -2);
    }

    #[test]
    fn write_then_read_at_offset() {
        let mut buf = [0u8; 12];
        write_f64(&mut buf, 4, -12.5, Endianness::Big);
        write_i32(&mut buf, 0, -7, Endianness::Little);
        assert_eq!(read_f64(&buf, 4, Endianness::Big), -12.5);
        assert_eq!(read_i32(&buf, 0, Endianness::Little), -7);
        assert_eq!(&buf[..4], &[0xf9, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn swap_in_place_reverses_each_value() {
        let mut buf = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        swap_in_place(&mut buf, 4);
        assert_eq!(buf, [4, 3, 2, 1, 8, 7, 6, 5, 9]);

        let mut buf = [1, 2];
        swap_in_place(&mut buf, 1);
        assert_eq!(buf, [1, 2]);
    }

    #[test]
    fn decoder_and_encoder_agree() {
        let mut enc = Encoder::with_capacity(16, Endianness::Big);
        enc.u8(7);
        enc.u16(0x3d07);
        enc.i32(-3);
        enc.f32(2.5);
        let buf = enc.into_inner();
        assert_eq!(buf.len(), 11);

        let mut dec = Decoder::new(&buf, Endianness::Big);
        assert_eq!(dec.u8(), 7);
        assert_eq!(dec.u16(), 0x3d07);
        assert_eq!(dec.i32(), -3);
        assert_eq!(dec.f32(), 2.5);
        assert_eq!(dec.position(), 11);
    }

    #[test]
    fn next_and_push_preserve_order() {
        let dat = vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut bytes = Bytes::new(&dat[..]);

        let b = bytes
            .next()
            .expect("Should have produced a byte for first call to next");
        assert_eq!(b, 0, "first byte has bad value");
        assert_eq!(bytes.offset(), 1);

        let b = bytes
            .next()
            .expect("Should have produced a byte after second call to next");
        assert_eq!(b, 1);
        assert_eq!(bytes.offset(), 2);

        bytes.push(&[b]);
        assert_eq!(bytes.offset(), 1);

        let b = bytes.next().unwrap();
        assert_eq!(b, 1, "pushed byte should come back first");
        assert_eq!(bytes.offset(), 2);

        let mut buf = [0u8; 3];
        bytes
            .read_exact(&mut buf)
            .expect("read_exact should not have failed");
        assert_eq!(buf, [2, 3, 4]);
        assert_eq!(bytes.offset(), 5);
    }

    #[test]
    fn read_exact_mixes_cache_and_stream() {
        let dat = vec![1, 2, 3, 4, 5, 6];
        let mut bytes = Bytes::new(&dat[..]);

        let mut buf = [0u8; 3];
        bytes.read_exact(&mut buf).unwrap();
        bytes.push(&buf);
        assert_eq!(bytes.num_read, 3, "should have still only read 3 bytes");
        assert_eq!(bytes.offset(), 0);

        let mut buf = [0u8; 4];
        bytes.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(bytes.num_read, 4);
        assert_eq!(bytes.offset(), 4);
    }

    #[test]
    fn fill_reports_short_reads() {
        let dat = vec![1, 2];
        let mut bytes = Bytes::new(&dat[..]);
        let mut buf = [0u8; 4];
        assert_eq!(bytes.fill(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);

        let err = bytes.next().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
