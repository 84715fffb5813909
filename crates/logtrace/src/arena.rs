use bytes::BytesMut;

use crate::error::{BufferFull, DecodeError};

/// Default arena capacity in bytes.
pub const DEFAULT_ARENA_CAPACITY: usize = 128 * 1024;

/// A fixed-capacity byte region holding encoded trace entries.
///
/// Writes go through the write cursor and only become visible to readers
/// once [`commit_entry`](Self::commit_entry) advances `committed_len`.
/// Reads go through a separate read cursor bounded by `committed_len`.
pub struct LogBuffer {
    buf: BytesMut,
    write_pos: usize,
    read_pos: usize,
    committed_len: usize,
    entry_count: usize,
}

impl AsRef<[u8]> for LogBuffer {
    fn as_ref(&self) -> &[u8] {
        self.committed()
    }
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("capacity", &self.capacity())
            .field("write_pos", &self.write_pos)
            .field("read_pos", &self.read_pos)
            .field("committed_len", &self.committed_len)
            .field("entry_count", &self.entry_count)
            .finish()
    }
}

impl LogBuffer {
    /// Allocates the backing storage up front. Nothing on the write path
    /// allocates afterwards.
    pub fn with_capacity(capacity: usize) -> Self {
        LogBuffer {
            buf: BytesMut::zeroed(capacity),
            write_pos: 0,
            read_pos: 0,
            committed_len: 0,
            entry_count: 0,
        }
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
        self.committed_len = 0;
        self.entry_count = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of committed entries.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn committed_len(&self) -> usize {
        self.committed_len
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0 && self.write_pos == 0
    }

    /// The committed byte range, the only part a flush may look at.
    pub fn committed(&self) -> &[u8] {
        &self.buf[..self.committed_len]
    }

    #[inline]
    pub fn can_write(&self, n: usize) -> bool {
        self.capacity() - self.write_pos >= n
    }

    #[inline]
    pub fn can_read(&self, n: usize) -> bool {
        self.committed_len - self.read_pos >= n
    }

    /// Moves the read cursor back to the first committed entry.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }

    /// Marks everything written since the last commit as one complete entry.
    #[inline]
    pub fn commit_entry(&mut self) {
        self.entry_count += 1;
        self.committed_len = self.write_pos;
    }

    /// Drops everything written since the last commit.
    #[inline]
    pub fn abandon_entry(&mut self) {
        self.write_pos = self.committed_len;
    }

    // === Writes ===

    /// Writes a known number of bytes.
    #[inline]
    fn push_fixed<const N: usize>(&mut self, bytes: [u8; N]) -> Result<(), BufferFull> {
        self.push_bytes(&bytes)
    }

    /// Writes a byte slice verbatim.
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferFull> {
        if !self.can_write(bytes.len()) {
            return Err(BufferFull);
        }
        let end = self.write_pos + bytes.len();
        self.buf[self.write_pos..end].copy_from_slice(bytes);
        self.write_pos = end;
        Ok(())
    }

    #[inline]
    pub fn push_u8(&mut self, v: u8) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_u16(&mut self, v: u16) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_u32(&mut self, v: u32) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_u64(&mut self, v: u64) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_i8(&mut self, v: i8) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_i16(&mut self, v: i16) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_i32(&mut self, v: i32) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    #[inline]
    pub fn push_i64(&mut self, v: i64) -> Result<(), BufferFull> {
        self.push_fixed(v.to_le_bytes())
    }

    // === Reads ===

    fn get_fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let b = self.get_bytes(N)?;
        b.try_into().map_err(|_| DecodeError::Truncated)
    }

    /// Reads `n` committed bytes.
    pub fn get_bytes(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        if !self.can_read(n) {
            return Err(DecodeError::Truncated);
        }
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.buf[start..self.read_pos])
    }

    /// Reads `n` bytes as a string. Invalid UTF-8 is replaced.
    pub fn get_string(&mut self, n: usize) -> Result<String, DecodeError> {
        let b = self.get_bytes(n)?;
        Ok(String::from_utf8_lossy(b).into_owned())
    }

    /// Returns the next committed byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        if !self.can_read(1) {
            return Err(DecodeError::Truncated);
        }
        Ok(self.buf[self.read_pos])
    }

    pub fn get_u8(&mut self) -> Result<u8, DecodeError> {
        self.get_fixed().map(u8::from_le_bytes)
    }

    pub fn get_u16(&mut self) -> Result<u16, DecodeError> {
        self.get_fixed().map(u16::from_le_bytes)
    }

    pub fn get_u32(&mut self) -> Result<u32, DecodeError> {
        self.get_fixed().map(u32::from_le_bytes)
    }

    pub fn get_u64(&mut self) -> Result<u64, DecodeError> {
        self.get_fixed().map(u64::from_le_bytes)
    }

    pub fn get_i8(&mut self) -> Result<i8, DecodeError> {
        self.get_fixed().map(i8::from_le_bytes)
    }

    pub fn get_i16(&mut self) -> Result<i16, DecodeError> {
        self.get_fixed().map(i16::from_le_bytes)
    }

    pub fn get_i32(&mut self) -> Result<i32, DecodeError> {
        self.get_fixed().map(i32::from_le_bytes)
    }

    pub fn get_i64(&mut self) -> Result<i64, DecodeError> {
        self.get_fixed().map(i64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_push_and_get() {
        let mut b = LogBuffer::with_capacity(64);
        b.push_u8(0x42).unwrap();
        b.push_u16(0xBEEF).unwrap();
        b.push_i64(-5).unwrap();
        b.push_bytes(b"hi").unwrap();
        b.commit_entry();

        assert_eq!(b.committed_len(), 1 + 2 + 8 + 2);
        assert_eq!(b.get_u8().unwrap(), 0x42);
        assert_eq!(b.get_u16().unwrap(), 0xBEEF);
        assert_eq!(b.get_i64().unwrap(), -5);
        assert_eq!(b.get_string(2).unwrap(), "hi");
        assert!(!b.can_read(1));
    }

    #[test]
    fn test_little_endian_layout() {
        let mut b = LogBuffer::with_capacity(8);
        b.push_u32(0x0403_0201).unwrap();
        b.commit_entry();
        assert_eq!(b.committed(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_push_full_leaves_buffer_unchanged() {
        let mut b = LogBuffer::with_capacity(10);
        b.push_u64(1).unwrap();
        assert_eq!(b.push_u64(2), Err(BufferFull));
        assert_eq!(b.push_u16(3), Ok(()));
        assert_eq!(b.push_u8(4), Err(BufferFull));
        assert!(!b.can_write(1));
    }

    #[test]
    fn test_reads_stop_at_committed_len() {
        let mut b = LogBuffer::with_capacity(32);
        b.push_u64(7).unwrap();
        b.commit_entry();
        b.push_u64(8).unwrap(); // not committed

        assert_eq!(b.get_u64().unwrap(), 7);
        assert_matches!(b.get_u64(), Err(DecodeError::Truncated));
        assert_matches!(b.peek_u8(), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_abandon_entry() {
        let mut b = LogBuffer::with_capacity(32);
        b.push_u8(1).unwrap();
        b.commit_entry();
        b.push_u64(99).unwrap();
        b.abandon_entry();

        assert_eq!(b.entry_count(), 1);
        assert_eq!(b.committed(), &[1]);
        assert!(b.can_write(31));
    }

    #[test]
    fn test_clear() {
        let mut b = LogBuffer::with_capacity(16);
        b.push_u64(1).unwrap();
        b.commit_entry();
        b.get_u8().unwrap();
        b.clear();

        assert!(b.is_empty());
        assert_eq!(b.committed_len(), 0);
        assert_eq!(b.entry_count(), 0);
        assert!(b.can_write(16));
        assert!(!b.can_read(1));
    }

    #[test]
    fn test_rewind() {
        let mut b = LogBuffer::with_capacity(16);
        b.push_u16(11).unwrap();
        b.commit_entry();
        assert_eq!(b.get_u16().unwrap(), 11);
        b.rewind();
        assert_eq!(b.get_u16().unwrap(), 11);
    }
}
