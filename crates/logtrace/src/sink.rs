use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;

use crate::config::TraceConfig;
use crate::registry::ShardId;

/// Where flushed shards are written to.
///
/// Every shard gets its own pair of destinations: one for formatted text
/// and one for raw arena bytes.
pub trait Sink: Send + Sync + 'static {
    fn text_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>>;

    fn raw_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>>;
}

impl Debug for dyn Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink").finish()
    }
}

/// Returns the sink described by the config: files in `output_dir` if one
/// is set, stderr otherwise.
pub fn default_sink(config: &TraceConfig) -> Arc<dyn Sink> {
    match &config.output_dir {
        Some(dir) => Arc::new(DirectorySink::new(dir)),
        None => Arc::new(StderrSink),
    }
}

/// Writes formatted text to stderr. Has no raw destination.
#[derive(Debug, Default)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn text_writer(&self, _shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>> {
        Ok(Box::new(std::io::stderr()))
    }

    fn raw_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>> {
        anyhow::bail!("no raw destination for shard {shard}: stderr sink only writes text")
    }
}

/// Appends to `shard-<id>.log` and `shard-<id>.bin` in a directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn text_path(&self, shard: ShardId) -> PathBuf {
        self.dir.join(format!("shard-{shard}.log"))
    }

    pub fn raw_path(&self, shard: ShardId) -> PathBuf {
        self.dir.join(format!("shard-{shard}.bin"))
    }

    fn open(&self, path: &Path) -> anyhow::Result<Box<dyn Write + Send>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create trace dir {}", self.dir.display()))?;
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open trace file {}", path.display()))?;
        Ok(Box::new(std::io::BufWriter::new(file)))
    }
}

impl Sink for DirectorySink {
    fn text_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>> {
        self.open(&self.text_path(shard))
    }

    fn raw_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>> {
        self.open(&self.raw_path(shard))
    }
}

type Buffers = Arc<Mutex<HashMap<(ShardId, bool), Vec<u8>>>>;

/// Keeps everything in memory. Clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffers: Buffers,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatted text written for `shard` so far.
    pub fn text(&self, shard: ShardId) -> String {
        String::from_utf8_lossy(&self.bytes(shard, false)).into_owned()
    }

    /// Raw bytes written for `shard` so far.
    pub fn raw(&self, shard: ShardId) -> Vec<u8> {
        self.bytes(shard, true)
    }

    fn bytes(&self, shard: ShardId, raw: bool) -> Vec<u8> {
        let buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers.get(&(shard, raw)).cloned().unwrap_or_default()
    }

    fn writer(&self, shard: ShardId, raw: bool) -> Box<dyn Write + Send> {
        Box::new(MemoryWriter {
            key: (shard, raw),
            buffers: Arc::clone(&self.buffers),
        })
    }
}

impl Sink for MemorySink {
    fn text_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>> {
        Ok(self.writer(shard, false))
    }

    fn raw_writer(&self, shard: ShardId) -> anyhow::Result<Box<dyn Write + Send>> {
        Ok(self.writer(shard, true))
    }
}

struct MemoryWriter {
    key: (ShardId, bool),
    buffers: Buffers,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers.entry(self.key).or_default().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
