use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use crate::config::{FlushMode, TraceConfig};
use crate::error::FlushError;
use crate::render::{RawRenderer, TextRenderer};
use crate::ring::{Renderer, RingBuffer, WriteOutcome};
use crate::sink::{default_sink, Sink};
use crate::types::Arg;

/// Stable identity of an execution unit that owns a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId(pub u32);

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// Hands out thread shard ids.
static NEXT_SHARD_ID: AtomicU32 = AtomicU32::new(0);

thread_local! {
    static CURRENT_SHARD: Cell<Option<ShardId>> = const { Cell::new(None) };
}

impl ShardId {
    /// The calling thread's shard id, assigned on first use and stable for
    /// the life of the thread.
    pub fn current() -> ShardId {
        CURRENT_SHARD.with(|c| match c.get() {
            Some(id) => id,
            None => {
                let id = ShardId(NEXT_SHARD_ID.fetch_add(1, Ordering::Relaxed));
                c.set(Some(id));
                id
            }
        })
    }
}

/// One shard's ring.
///
/// Only the owning execution unit writes to it. The mutex is there for the
/// hand-off with a flush running elsewhere: a flush never reads an arena
/// while a write into it is in progress.
#[derive(Debug)]
pub struct Shard {
    id: ShardId,
    ring: Mutex<RingBuffer>,
}

impl Shard {
    pub fn new(id: ShardId, config: &TraceConfig) -> Self {
        Shard {
            id,
            ring: Mutex::new(RingBuffer::new(config.ring_size, config.arena_capacity)),
        }
    }

    pub fn id(&self) -> ShardId {
        self.id
    }

    /// Locks the ring. A panic while writing leaves the ring in a
    /// consistent state, so poisoning is ignored.
    pub fn ring(&self) -> MutexGuard<'_, RingBuffer> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn write(&self, template: &'static str, args: &[Arg<'_>]) -> WriteOutcome {
        self.ring().write(template, args)
    }

    /// Renders and clears every arena through `renderer`.
    pub fn flush_with<R: Renderer>(&self, renderer: R) -> Result<usize, FlushError> {
        self.ring().flush(renderer)
    }

    /// Flushes to this shard's destinations in `sink`.
    pub fn flush_to(&self, sink: &dyn Sink, mode: FlushMode) -> Result<usize, FlushError> {
        match mode {
            FlushMode::Text => {
                let text = sink.text_writer(self.id)?;
                self.flush_with(TextRenderer::new(text))
            }
            FlushMode::Raw => {
                let raw = sink.raw_writer(self.id)?;
                self.flush_with(RawRenderer::new(raw))
            }
            FlushMode::Both => {
                let raw = sink.raw_writer(self.id)?;
                let text = sink.text_writer(self.id)?;
                self.flush_with((TextRenderer::new(text), RawRenderer::new(raw)))
            }
        }
    }
}

/// Result of flushing every shard.
#[derive(Debug, Default)]
pub struct FlushSummary {
    pub entries: usize,
    pub shards: usize,
    pub failed: Vec<(ShardId, FlushError)>,
}

impl FlushSummary {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Owns the rings of all shards.
///
/// Construct one per process (or per runtime) and share it with the
/// execution units; each of them writes through [`write`](Self::write),
/// which always targets the caller's own ring.
#[derive(Debug)]
pub struct ShardRegistry {
    config: TraceConfig,
    sink: Arc<dyn Sink>,
    shards: DashMap<ShardId, Arc<Shard>>,
}

impl ShardRegistry {
    pub fn new(config: TraceConfig, sink: Arc<dyn Sink>) -> Self {
        ShardRegistry {
            config,
            sink,
            shards: DashMap::new(),
        }
    }

    /// Uses the sink described by the config.
    pub fn with_config(config: TraceConfig) -> Self {
        let sink = default_sink(&config);
        Self::new(config, sink)
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Returns the shard for `id`, creating its ring on first access.
    pub fn shard(&self, id: ShardId) -> Arc<Shard> {
        if let Some(shard) = self.shards.get(&id) {
            return Arc::clone(shard.value());
        }
        let shard = self.shards.entry(id).or_insert_with(|| {
            log::debug!("creating trace ring for shard {id}");
            Arc::new(Shard::new(id, &self.config))
        });
        Arc::clone(shard.value())
    }

    pub fn current_shard(&self) -> Arc<Shard> {
        self.shard(ShardId::current())
    }

    /// Records an entry in the calling thread's ring.
    #[inline]
    pub fn write(&self, template: &'static str, args: &[Arg<'_>]) -> WriteOutcome {
        // The map guard must be gone before the ring lock is taken.
        let shard = self.shard(ShardId::current());
        shard.write(template, args)
    }

    pub fn shard_ids(&self) -> Vec<ShardId> {
        let mut ids: Vec<_> = self.shards.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Flushes the calling thread's shard to its destinations.
    pub fn flush_current(&self) -> Result<usize, FlushError> {
        self.current_shard().flush_to(self.sink.as_ref(), self.config.flush_mode)
    }

    /// Flushes every shard to its destinations. A failing shard does not
    /// stop the others.
    pub fn flush_all(&self) -> FlushSummary {
        // Don't hold map guards while doing IO.
        let shards: Vec<Arc<Shard>> = self.shards.iter().map(|e| Arc::clone(e.value())).collect();

        let mut summary = FlushSummary::default();
        for shard in shards {
            summary.shards += 1;
            match shard.flush_to(self.sink.as_ref(), self.config.flush_mode) {
                Ok(n) => summary.entries += n,
                Err(err) => {
                    log::error!("failed to flush trace shard {}: {err}", shard.id());
                    summary.failed.push((shard.id(), err));
                }
            }
        }
        log::debug!(
            "flushed {} trace entries from {} shards",
            summary.entries,
            summary.shards
        );
        summary
    }
}
