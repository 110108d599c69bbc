//! Types which operate over [`Stream`](futures_core::stream::Stream)`<Item =
//! `[`io::Result`](std::io::Result)`<`[`Bytes`](bytes::Bytes)`>>` streams.
//!
//! Each input `Stream` is treated as a single byte-stream, each item is a chunk of data from this
//! byte-stream and an error item ends it. There is not guaranteed to be a one-to-one relationship
//! between chunks of data from the input streams and the resulting compressed stream, the
//! encoders buffer the incoming data and choose their own boundaries at which to yield a new
//! item.

mod archive;
mod generic;
mod gzip;

pub use self::{
    archive::{ArchiveEntry, ArchiveStream, EntryMetadata, EntryStats, Finalizer},
    gzip::GzipStream,
};
