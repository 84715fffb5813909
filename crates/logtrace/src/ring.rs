use std::collections::HashMap;

use crate::arena::LogBuffer;
use crate::encode::encoded_len;
use crate::error::{BufferFull, FlushError};
use crate::types::Arg;

/// Default number of arenas in a ring.
pub const DEFAULT_RING_SIZE: usize = 32;

/// Maps the format identifiers written into entries back to their templates.
///
/// Templates are interned by address and length, so a call site pays a
/// small hash lookup rather than hashing the template text.
#[derive(Debug, Default)]
pub struct TemplateTable {
    ids: HashMap<(usize, usize), u64>,
    templates: Vec<&'static str>,
}

impl TemplateTable {
    pub fn intern(&mut self, template: &'static str) -> u64 {
        let key = (template.as_ptr() as usize, template.len());
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = self.templates.len() as u64;
        self.templates.push(template);
        self.ids.insert(key, id);
        id
    }

    pub fn get(&self, id: u64) -> Option<&'static str> {
        self.templates.get(id as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Consumes the committed contents of one arena during a flush.
pub trait Renderer {
    /// Renders every committed entry of `arena`, returning how many
    /// entries were emitted.
    fn render(
        &mut self,
        arena: &mut LogBuffer,
        templates: &TemplateTable,
    ) -> Result<usize, FlushError>;
}

impl<A: Renderer, B: Renderer> Renderer for (A, B) {
    fn render(
        &mut self,
        arena: &mut LogBuffer,
        templates: &TemplateTable,
    ) -> Result<usize, FlushError> {
        let n = self.0.render(arena, templates)?;
        self.1.render(arena, templates)?;
        Ok(n)
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn render(
        &mut self,
        arena: &mut LogBuffer,
        templates: &TemplateTable,
    ) -> Result<usize, FlushError> {
        (**self).render(arena, templates)
    }
}

/// Outcome of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,
    /// The active arena was full; the entry went into the next one.
    Rotated,
    /// The entry is larger than an empty arena and was discarded.
    Dropped,
}

/// A fixed cycle of arenas with exactly one active arena.
#[derive(Debug)]
pub struct RingBuffer {
    arenas: Vec<LogBuffer>,
    active: usize,
    templates: TemplateTable,
    rotations: u64,
    dropped: u64,
}

impl RingBuffer {
    pub fn new(ring_size: usize, arena_capacity: usize) -> Self {
        let arenas = (0..ring_size.max(1))
            .map(|_| LogBuffer::with_capacity(arena_capacity))
            .collect();
        RingBuffer {
            arenas,
            active: 0,
            templates: TemplateTable::default(),
            rotations: 0,
            dropped: 0,
        }
    }

    pub fn ring_size(&self) -> usize {
        self.arenas.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &LogBuffer {
        &self.arenas[self.active]
    }

    pub fn active_mut(&mut self) -> &mut LogBuffer {
        &mut self.arenas[self.active]
    }

    pub fn arenas(&self) -> &[LogBuffer] {
        &self.arenas
    }

    pub fn templates(&self) -> &TemplateTable {
        &self.templates
    }

    /// Number of rotations since construction.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Number of entries discarded because they could never fit an arena.
    pub fn dropped_entries(&self) -> u64 {
        self.dropped
    }

    /// Total committed entries across all arenas.
    pub fn entry_count(&self) -> usize {
        self.arenas.iter().map(LogBuffer::entry_count).sum()
    }

    /// Makes the next arena active and clears it. The arena it replaces
    /// keeps its entries until the ring comes back around.
    pub fn rotate(&mut self) {
        self.active = (self.active + 1) % self.arenas.len();
        self.arenas[self.active].clear();
        self.rotations += 1;
        log::debug!(
            "trace ring rotated to arena {} (rotation {})",
            self.active,
            self.rotations
        );
    }

    /// Appends an entry stamped with the current time.
    #[inline]
    pub fn write(&mut self, template: &'static str, args: &[Arg<'_>]) -> WriteOutcome {
        self.write_at(now_nanos(), template, args)
    }

    /// Appends an entry with an explicit timestamp.
    ///
    /// Rotates at most once: if the entry does not fit into the active
    /// arena the next one is cleared and the whole entry is written again.
    pub fn write_at(
        &mut self,
        timestamp_nanos: i64,
        template: &'static str,
        args: &[Arg<'_>],
    ) -> WriteOutcome {
        let format_id = self.templates.intern(template);
        match self.active_mut().write_entry(timestamp_nanos, format_id, args) {
            Ok(()) => return WriteOutcome::Committed,
            Err(BufferFull) => {}
        }

        // An entry that no arena can hold must not cost the oldest arena.
        let len = encoded_len(args);
        if len <= self.active().capacity() && !self.active().is_empty() {
            self.rotate();
            if self
                .active_mut()
                .write_entry(timestamp_nanos, format_id, args)
                .is_ok()
            {
                return WriteOutcome::Rotated;
            }
        }

        self.dropped += 1;
        log::warn!(
            "dropping trace entry of {len} bytes, larger than arena capacity {}",
            self.active().capacity()
        );
        WriteOutcome::Dropped
    }

    /// Renders every arena oldest first and clears it.
    ///
    /// Starts at the arena after the active one and ends with the active
    /// arena itself, covering the ring exactly once.
    pub fn flush<R: Renderer>(&mut self, mut renderer: R) -> Result<usize, FlushError> {
        let n = self.arenas.len();
        let mut rendered = 0;
        let mut i = self.active;
        loop {
            i = (i + 1) % n;
            let arena = &mut self.arenas[i];
            if arena.entry_count() > 0 {
                rendered += renderer.render(arena, &self.templates)?;
            }
            arena.clear();
            if i == self.active {
                break;
            }
        }
        log::debug!("flushed {rendered} trace entries");
        Ok(rendered)
    }
}

#[inline]
pub(crate) fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
