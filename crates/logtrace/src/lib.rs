//! Per-shard binary trace logging with deferred formatting.
//!
//! Trace calls serialize their arguments into fixed-capacity arenas without
//! allocating or formatting anything. Each shard (an execution unit with a
//! stable identity, usually a thread) owns a ring of arenas; when the
//! active arena fills up the ring rotates and the oldest arena is reused.
//! A flush later decodes the arenas oldest first and renders one line per
//! entry, or dumps the raw bytes.
//!
//! # Protocol
//!
//! Every entry is a header, one record per captured argument and a
//! terminating zero byte. All integers are little-endian.
//!
//! | Field          | Size | Notes                                   |
//! |----------------|------|-----------------------------------------|
//! | Timestamp      | 8    | nanoseconds since the Unix epoch        |
//! | Format id      | 8    | index into the ring's template table    |
//! | Argument count | 1    | number of arguments at the call site    |
//! | Records        | ...  | `tag:1 index:1 size:2 payload:size`     |
//! | Sentinel       | 1    | `0x00`                                  |
//!
//! Record tags: `1` signed integer, `2` unsigned integer, `3` boolean,
//! `4` string. Arguments of other types produce no record but still use up
//! an index, and render as `?`.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use logtrace::{trace, Arg, MemorySink, ShardId, ShardRegistry, TraceConfig};
//!
//! let sink = MemorySink::new();
//! let registry = ShardRegistry::new(TraceConfig::default(), Arc::new(sink.clone()));
//!
//! trace!(registry, "value={}", 42);
//! trace!(registry, "a={}, b={}, c={}", 1, Arg::Opaque, "three");
//!
//! registry.flush_current().unwrap();
//! print!("{}", sink.text(ShardId::current()));
//! ```

mod arena;
mod config;
mod decode;
mod encode;
mod error;
pub mod format;
mod registry;
mod render;
mod ring;
mod sink;
mod types;

pub use arena::{LogBuffer, DEFAULT_ARENA_CAPACITY};
pub use config::{FlushMode, TraceConfig};
pub use decode::{DecodedEntry, Entries};
pub use encode::{encoded_len, HEADER_SIZE, MAX_ARGS, MIN_ENTRY_SIZE, RECORD_HEADER_SIZE};
pub use error::{BufferFull, ConfigError, DecodeError, FlushError, FormatError};
pub use registry::{FlushSummary, Shard, ShardId, ShardRegistry};
pub use render::{RawRenderer, TextRenderer};
pub use ring::{Renderer, RingBuffer, TemplateTable, WriteOutcome, DEFAULT_RING_SIZE};
pub use sink::{default_sink, DirectorySink, MemorySink, Sink, StderrSink};
pub use types::{Arg, ArgTag, Value, SENTINEL};

/// Records a trace entry.
///
/// The first argument is anything with a
/// `write(&'static str, &[Arg]) -> WriteOutcome` method: a
/// [`ShardRegistry`], a [`Shard`] or a [`RingBuffer`]. Every further
/// argument is converted with [`Arg::from`]; pass [`Arg::Opaque`] (or
/// [`Arg::opaque`]) for values the encoding does not support.
#[macro_export]
macro_rules! trace {
    ($target:expr, $template:literal $(, $arg:expr)* $(,)?) => {
        $target.write($template, &[$($crate::Arg::from($arg)),*])
    };
}
