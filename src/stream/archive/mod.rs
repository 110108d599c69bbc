//! Zip archives built from a sequence of entry streams.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    io::{Result, Write},
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_core::stream::Stream;
use futures_util::task::AtomicWaker;
use zip::ZipWriter;

use crate::{config::ArchiveConfig, ByteStream, Error};

mod entry;
mod spool;

pub use self::entry::{ArchiveEntry, EntryMetadata, EntryStats};

use self::{
    entry::{unique_name, ResolvedEntry},
    spool::SpoolWriter,
};

#[derive(Debug, Default)]
struct Signal {
    finalized: AtomicBool,
    waker: AtomicWaker,
}

impl Signal {
    fn finalize(&self) {
        if !self.finalized.swap(true, Ordering::AcqRel) {
            tracing::debug!("archive finalized");
        }
        self.waker.wake();
    }

    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }
}

/// Handle that finalizes an [`ArchiveStream`] from elsewhere, e.g. after the stream itself has
/// been handed to a consumer.
#[derive(Clone, Debug)]
pub struct Finalizer {
    signal: Arc<Signal>,
}

impl Finalizer {
    /// Signals that no further entries will be appended.
    pub fn finalize(&self) {
        self.signal.finalize();
    }

    /// Whether the archive has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.signal.is_finalized()
    }
}

struct PendingEntry {
    resolved: Result<ResolvedEntry>,
    stream: ByteStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
    Done,
}

enum Step {
    Emit(Bytes),
    Continue,
    Pending,
}

/// A zip archive encoder.
///
/// This structure implements a [`Stream`] interface and emits the bytes of a zip archive made of
/// the entries appended to it, in the order they were appended. Entry streams are only read while
/// the archive is being polled.
///
/// The archive is not complete until it is finalized with [`ArchiveStream::finalize`] or a
/// [`Finalizer`]. Once every appended entry has been written an unfinalized archive stays
/// pending; after finalization the closing central directory is emitted and the stream ends.
///
/// Bytes of an entry are emitted once the next entry starts, or at finalization for the last one,
/// since the zip writer updates an entry's local header when the entry is complete.
///
/// An error of an entry stream or of the zip writer is emitted as an item of this stream, after
/// which it ends.
pub struct ArchiveStream {
    writer: Option<ZipWriter<SpoolWriter>>,
    spool: SpoolWriter,
    config: ArchiveConfig,
    pending: VecDeque<PendingEntry>,
    current: Option<ByteStream>,
    ordinal: usize,
    names: HashSet<String>,
    committed: u64,
    signal: Arc<Signal>,
    state: State,
}

impl ArchiveStream {
    /// Creates an empty, unfinalized archive.
    pub fn new(config: ArchiveConfig) -> Self {
        let spool = SpoolWriter::default();
        let mut writer = ZipWriter::new(spool.clone());
        if let Some(comment) = &config.comment {
            writer.set_comment(comment.clone());
        }

        Self {
            writer: Some(writer),
            spool,
            config,
            pending: VecDeque::new(),
            current: None,
            ordinal: 0,
            names: HashSet::new(),
            committed: 0,
            signal: Arc::default(),
            state: State::Open,
        }
    }

    /// Appends an entry.
    ///
    /// Entries without a name are called `file_<n>`, `n` counting appended entries from 1. A name
    /// already used in this archive gets a ` (n)` suffix.
    pub fn append(&mut self, entry: ArchiveEntry) -> crate::Result<()> {
        if self.signal.is_finalized() {
            return Err(Error::ArchiveFinalized);
        }
        self.push(entry);
        Ok(())
    }

    pub(crate) fn push(&mut self, entry: ArchiveEntry) {
        self.ordinal += 1;
        let names = &mut self.names;
        let resolved = ResolvedEntry::resolve(entry.metadata.as_ref(), self.ordinal, &self.config)
            .map(|mut resolved| {
                let name = unique_name(&resolved.name, names);
                if name != resolved.name {
                    tracing::debug!(requested = %resolved.name, entry = %name, "entry renamed");
                }
                names.insert(name.clone());
                resolved.name = name;
                resolved
            });
        self.pending.push_back(PendingEntry {
            resolved,
            stream: entry.stream,
        });
    }

    /// Signals that no further entries will be appended.
    pub fn finalize(&self) {
        self.signal.finalize();
    }

    /// Whether the archive has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.signal.is_finalized()
    }

    /// Returns a handle which can finalize this archive after it has been moved.
    pub fn finalizer(&self) -> Finalizer {
        Finalizer {
            signal: self.signal.clone(),
        }
    }

    /// The configuration this archive was built with.
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    fn step(&mut self, cx: &mut Context<'_>) -> Result<Step> {
        let ready = self.spool.release(self.committed)?;
        if !ready.is_empty() {
            return Ok(Step::Emit(ready));
        }

        let writer = match self.writer.as_mut() {
            Some(writer) => writer,
            None => return Ok(Step::Continue),
        };

        if let Some(stream) = self.current.as_mut() {
            return match stream.as_mut().poll_next(cx) {
                Poll::Pending => Ok(Step::Pending),
                Poll::Ready(Some(chunk)) => {
                    writer.write_all(&chunk?)?;
                    Ok(Step::Continue)
                }
                Poll::Ready(None) => {
                    self.current = None;
                    Ok(Step::Continue)
                }
            };
        }

        if let Some(PendingEntry { resolved, stream }) = self.pending.pop_front() {
            let ResolvedEntry { name, options } = resolved?;
            // Everything before this entry is final once the previous entry is closed, which
            // `start_file` does before writing the new local header.
            let mark = self.spool.end()?;
            tracing::trace!(entry = %name, offset = mark, "archive entry started");
            writer
                .start_file(name, options)
                .map_err(|err| Error::from(err).into_io())?;
            self.committed = mark;
            self.current = Some(stream);
            return Ok(Step::Continue);
        }

        if self.signal.is_finalized() {
            if let Some(writer) = self.writer.take() {
                writer.finish().map_err(|err| Error::from(err).into_io())?;
            }
            self.state = State::Closed;
            return Ok(Step::Continue);
        }

        self.signal.waker.register(cx.waker());
        if self.signal.is_finalized() {
            Ok(Step::Continue)
        } else {
            Ok(Step::Pending)
        }
    }
}

impl Stream for ArchiveStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes>>> {
        let this = self.get_mut();

        loop {
            match this.state {
                State::Done => return Poll::Ready(None),
                State::Closed => {
                    this.state = State::Done;
                    let rest = this.spool.release(u64::MAX)?;
                    if !rest.is_empty() {
                        return Poll::Ready(Some(Ok(rest)));
                    }
                    continue;
                }
                State::Open => {}
            }

            match this.step(cx) {
                Ok(Step::Emit(bytes)) => return Poll::Ready(Some(Ok(bytes))),
                Ok(Step::Continue) => continue,
                Ok(Step::Pending) => return Poll::Pending,
                Err(err) => {
                    this.state = State::Done;
                    this.writer = None;
                    this.current = None;
                    this.pending.clear();
                    return Poll::Ready(Some(Err(err)));
                }
            }
        }
    }
}

impl fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("config", &self.config)
            .field("pending", &self.pending.len())
            .field("ordinal", &self.ordinal)
            .field("finalized", &self.signal.is_finalized())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

const _: () = {
    fn _assert() {
        use crate::util::_assert_send;

        _assert_send::<ArchiveStream>();
        _assert_send::<Finalizer>();
    }
};
