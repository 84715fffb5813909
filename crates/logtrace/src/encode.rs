//! Argument encoding on top of [`LogBuffer`].
//!
//! An entry is written as a header, one record per captured argument and a
//! sentinel byte. The write either commits completely or leaves the arena
//! exactly as it was.

use crate::arena::LogBuffer;
use crate::error::BufferFull;
use crate::types::{Arg, SENTINEL};

/// Size of the entry header: timestamp, format id, declared argument count.
pub const HEADER_SIZE: usize = 8 + 8 + 1;

/// Size of an argument record before its payload: tag, index, payload size.
pub const RECORD_HEADER_SIZE: usize = 1 + 1 + 2;

/// Argument indices and counts are single bytes on the wire.
pub const MAX_ARGS: usize = u8::MAX as usize;

/// Smallest possible entry: a header with no records.
pub const MIN_ENTRY_SIZE: usize = HEADER_SIZE + 1;

/// Number of bytes an entry with these arguments occupies.
pub fn encoded_len(args: &[Arg<'_>]) -> usize {
    let records: usize = args
        .iter()
        .take(MAX_ARGS)
        .filter_map(|a| a.tag_and_size())
        .map(|(_, size)| RECORD_HEADER_SIZE + size)
        .sum();
    HEADER_SIZE + records + 1
}

impl LogBuffer {
    /// Writes one argument record: `[tag][arg_index][payload_size][payload]`.
    /// Opaque arguments write nothing.
    #[inline]
    pub fn push_arg(&mut self, arg_index: u8, arg: &Arg<'_>) -> Result<(), BufferFull> {
        let Some((tag, size)) = arg.tag_and_size() else {
            return Ok(());
        };
        if !self.can_write(RECORD_HEADER_SIZE + size) {
            return Err(BufferFull);
        }
        self.push_u8(tag as u8)?;
        self.push_u8(arg_index)?;
        self.push_u16(size as u16)?;
        match *arg {
            Arg::I8(v) => self.push_i8(v),
            Arg::I16(v) => self.push_i16(v),
            Arg::I32(v) => self.push_i32(v),
            Arg::I64(v) => self.push_i64(v),
            Arg::U8(v) => self.push_u8(v),
            Arg::U16(v) => self.push_u16(v),
            Arg::U32(v) => self.push_u32(v),
            Arg::U64(v) => self.push_u64(v),
            Arg::Bool(v) => self.push_u8(v as u8),
            Arg::Str(s) => self.push_bytes(&s.as_bytes()[..size]),
            Arg::Opaque => Ok(()),
        }
    }

    /// Encodes the arguments in call order. Every argument advances the
    /// running index by exactly one, whether or not it produced a record.
    /// Arguments past [`MAX_ARGS`] are ignored.
    pub fn save_args(&mut self, args: &[Arg<'_>]) -> Result<(), BufferFull> {
        for (index, arg) in args.iter().take(MAX_ARGS).enumerate() {
            self.push_arg(index as u8, arg)?;
        }
        Ok(())
    }

    /// Writes a complete entry and commits it.
    ///
    /// On `BufferFull` the partially written bytes are discarded, so the
    /// caller can rotate and retry the whole entry.
    pub fn write_entry(
        &mut self,
        timestamp_nanos: i64,
        format_id: u64,
        args: &[Arg<'_>],
    ) -> Result<(), BufferFull> {
        match self.encode_entry(timestamp_nanos, format_id, args) {
            Ok(()) => {
                self.commit_entry();
                Ok(())
            }
            Err(e) => {
                self.abandon_entry();
                Err(e)
            }
        }
    }

    #[inline]
    fn encode_entry(
        &mut self,
        timestamp_nanos: i64,
        format_id: u64,
        args: &[Arg<'_>],
    ) -> Result<(), BufferFull> {
        self.push_i64(timestamp_nanos)?;
        self.push_u64(format_id)?;
        self.push_u8(args.len().min(MAX_ARGS) as u8)?;
        self.save_args(args)?;
        self.push_u8(SENTINEL)
    }
}
