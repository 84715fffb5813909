use std::fmt;

/// Terminates the argument records of an entry.
pub const SENTINEL: u8 = 0x00;

/// Wire tag of an argument record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArgTag {
    Int = 0x01,
    Uint = 0x02,
    Bool = 0x03,
    Str = 0x04,
}

impl ArgTag {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(ArgTag::Int),
            0x02 => Some(ArgTag::Uint),
            0x03 => Some(ArgTag::Bool),
            0x04 => Some(ArgTag::Str),
            _ => None,
        }
    }
}

/// A single argument captured at a trace call site.
///
/// Built with `Arg::from` (the [`trace!`](crate::trace) macro does this for
/// every argument). Anything the wire format cannot carry becomes
/// [`Arg::Opaque`]: it still occupies its position but records no payload,
/// and renders as `?` at flush time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Str(&'a str),
    Opaque,
}

impl Arg<'_> {
    /// Captures a value of a type the wire format does not support.
    #[inline]
    pub fn opaque<T: ?Sized>(_value: &T) -> Self {
        Arg::Opaque
    }

    /// The tag and payload size this argument encodes to, or `None` for
    /// opaque arguments which produce no record.
    #[inline]
    pub(crate) fn tag_and_size(&self) -> Option<(ArgTag, usize)> {
        Some(match self {
            Arg::I8(_) => (ArgTag::Int, 1),
            Arg::I16(_) => (ArgTag::Int, 2),
            Arg::I32(_) => (ArgTag::Int, 4),
            Arg::I64(_) => (ArgTag::Int, 8),
            Arg::U8(_) => (ArgTag::Uint, 1),
            Arg::U16(_) => (ArgTag::Uint, 2),
            Arg::U32(_) => (ArgTag::Uint, 4),
            Arg::U64(_) => (ArgTag::Uint, 8),
            Arg::Bool(_) => (ArgTag::Bool, 1),
            Arg::Str(s) => (ArgTag::Str, truncated_len(s)),
            Arg::Opaque => return None,
        })
    }
}

/// Length in bytes of the longest UTF-8 prefix of `s` that fits in a
/// 16-bit payload size.
#[inline]
pub(crate) fn truncated_len(s: &str) -> usize {
    let max = u16::MAX as usize;
    if s.len() <= max {
        return s.len();
    }
    let mut n = max;
    while !s.is_char_boundary(n) {
        n -= 1;
    }
    n
}

macro_rules! impl_arg_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Arg<'_> {
                #[inline]
                fn from(v: $ty) -> Self {
                    Arg::$variant(v)
                }
            }
        )*
    };
}

impl_arg_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    bool => Bool,
}

impl From<isize> for Arg<'_> {
    #[inline]
    fn from(v: isize) -> Self {
        Arg::I64(v as i64)
    }
}

impl From<usize> for Arg<'_> {
    #[inline]
    fn from(v: usize) -> Self {
        Arg::U64(v as u64)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    #[inline]
    fn from(s: &'a str) -> Self {
        Arg::Str(s)
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    #[inline]
    fn from(s: &'a String) -> Self {
        Arg::Str(s.as_str())
    }
}

// Floats and chars have no wire representation.
macro_rules! impl_arg_opaque {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg<'_> {
                #[inline]
                fn from(_: $ty) -> Self {
                    Arg::Opaque
                }
            }
        )*
    };
}

impl_arg_opaque!(f32, f64, char);

/// A decoded argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Str(String),
    /// Stands in for an argument whose type was not captured.
    Placeholder,
}

impl Value {
    pub const PLACEHOLDER_TOKEN: &'static str = "?";

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Value::Placeholder)
    }

    pub(crate) fn is_integer(&self) -> bool {
        !matches!(self, Value::Bool(_) | Value::Str(_) | Value::Placeholder)
    }
}

impl From<Arg<'_>> for Value {
    fn from(arg: Arg<'_>) -> Self {
        match arg {
            Arg::I8(v) => Value::I8(v),
            Arg::I16(v) => Value::I16(v),
            Arg::I32(v) => Value::I32(v),
            Arg::I64(v) => Value::I64(v),
            Arg::U8(v) => Value::U8(v),
            Arg::U16(v) => Value::U16(v),
            Arg::U32(v) => Value::U32(v),
            Arg::U64(v) => Value::U64(v),
            Arg::Bool(v) => Value::Bool(v),
            Arg::Str(s) => Value::Str(s[..truncated_len(s)].to_string()),
            Arg::Opaque => Value::Placeholder,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I8(v) => v.fmt(f),
            Value::I16(v) => v.fmt(f),
            Value::I32(v) => v.fmt(f),
            Value::I64(v) => v.fmt(f),
            Value::U8(v) => v.fmt(f),
            Value::U16(v) => v.fmt(f),
            Value::U32(v) => v.fmt(f),
            Value::U64(v) => v.fmt(f),
            Value::Bool(v) => v.fmt(f),
            Value::Str(s) => f.write_str(s),
            Value::Placeholder => f.write_str(Self::PLACEHOLDER_TOKEN),
        }
    }
}
