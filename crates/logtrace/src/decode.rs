//! Replays committed entries back into positional values.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::arena::LogBuffer;
use crate::error::DecodeError;
use crate::types::{ArgTag, Value, SENTINEL};

/// A decoded entry. `values` holds exactly `declared` positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub timestamp_nanos: i64,
    pub format_id: u64,
    pub declared: u8,
    pub values: Vec<Value>,
}

impl DecodedEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.timestamp_nanos)
    }

    /// RFC 3339 with nanosecond precision.
    pub fn rendered_timestamp(&self) -> String {
        self.timestamp().to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

impl LogBuffer {
    /// Decodes the entry at the read cursor.
    ///
    /// Gaps left by opaque arguments are filled with placeholders, both
    /// between records and after the last one.
    pub fn read_entry(&mut self) -> Result<DecodedEntry, DecodeError> {
        let timestamp_nanos = self.get_i64()?;
        let format_id = self.get_u64()?;
        let declared = self.get_u8()?;

        let mut values = Vec::with_capacity(declared as usize);
        while self.peek_u8()? != SENTINEL {
            let tag = self.get_u8()?;
            let index = self.get_u8()?;
            let size = self.get_u16()?;

            if (index as usize) < values.len() {
                return Err(DecodeError::IndexOutOfOrder {
                    index,
                    rendered: values.len(),
                });
            }
            while values.len() < index as usize {
                values.push(Value::Placeholder);
            }
            let value = self.arg_value(tag, size)?;
            values.push(value);
        }
        // sentinel
        self.get_u8()?;

        if values.len() > declared as usize {
            return Err(DecodeError::TooManyArguments {
                declared,
                found: values.len(),
            });
        }
        values.resize(declared as usize, Value::Placeholder);

        Ok(DecodedEntry {
            timestamp_nanos,
            format_id,
            declared,
            values,
        })
    }

    fn arg_value(&mut self, tag: u8, size: u16) -> Result<Value, DecodeError> {
        let bad_width = DecodeError::InvalidWidth { tag, size };
        let value = match ArgTag::from_byte(tag) {
            Some(ArgTag::Int) => match size {
                1 => Value::I8(self.get_i8()?),
                2 => Value::I16(self.get_i16()?),
                4 => Value::I32(self.get_i32()?),
                8 => Value::I64(self.get_i64()?),
                _ => return Err(bad_width),
            },
            Some(ArgTag::Uint) => match size {
                1 => Value::U8(self.get_u8()?),
                2 => Value::U16(self.get_u16()?),
                4 => Value::U32(self.get_u32()?),
                8 => Value::U64(self.get_u64()?),
                _ => return Err(bad_width),
            },
            Some(ArgTag::Bool) => match size {
                1 => Value::Bool(self.get_u8()? != 0),
                _ => return Err(bad_width),
            },
            Some(ArgTag::Str) => Value::Str(self.get_string(size as usize)?),
            None => return Err(DecodeError::UnknownTag(tag)),
        };
        Ok(value)
    }

    /// Iterates over the committed entries from the start of the arena.
    ///
    /// The iterator ends after `entry_count` entries, or after the first
    /// error since nothing past a bad entry can be trusted.
    pub fn entries(&mut self) -> Entries<'_> {
        self.rewind();
        let remaining = self.entry_count();
        Entries {
            buf: self,
            remaining,
        }
    }
}

pub struct Entries<'a> {
    buf: &'a mut LogBuffer,
    remaining: usize,
}

impl Iterator for Entries<'_> {
    type Item = Result<DecodedEntry, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.buf.read_entry() {
            Ok(entry) => {
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
