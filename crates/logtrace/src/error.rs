/// Returned by arena push operations when the remaining capacity cannot hold
/// the value. This is the expected signal to rotate, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer is full")]
pub struct BufferFull;

/// Errors that can occur while decoding committed entries.
///
/// Any of these means the arena holds data the encoder never produced;
/// the decoder gives up on the rest of the arena.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of committed data")]
    Truncated,

    #[error("unknown argument tag: 0x{0:02x}")]
    UnknownTag(u8),

    #[error("invalid payload size {size} for tag 0x{tag:02x}")]
    InvalidWidth { tag: u8, size: u16 },

    #[error("argument index {index} is behind rendered position {rendered}")]
    IndexOutOfOrder { index: u8, rendered: usize },

    #[error("entry holds {found} arguments but declares {declared}")]
    TooManyArguments { declared: u8, found: usize },

    #[error("unknown format id: {0}")]
    UnknownFormat(u64),
}

/// Errors produced when rendering a template against decoded values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("argument {0} is missing")]
    MissingArgument(usize),

    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),

    #[error("invalid format spec: {0:?}")]
    InvalidSpec(String),
}

/// Errors that can occur while flushing a ring to its destinations.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink error: {0:#}")]
    Sink(#[from] anyhow::Error),
}

/// Errors in a [`TraceConfig`](crate::TraceConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("arena capacity {0} cannot hold a single entry")]
    ArenaTooSmall(usize),

    #[error("ring size must be at least 2, got {0}")]
    RingTooSmall(usize),

    #[error("flush mode {0:?} requires an output directory")]
    MissingOutputDir(crate::FlushMode),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
