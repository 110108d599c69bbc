//! Gzip streams and zip archives composed from asynchronous byte streams.
//!
//! Inputs and outputs are [`Stream`]`<Item = `[`io::Result`]`<`[`Bytes`]`>>`s: every `Ok` item
//! is a chunk of data, an `Err` item is the stream failing, and the end of the stream is the end
//! of the data.
//!
//! The [`Facility`] holds a loosely shaped option mapping and, once started, a [`Compressor`]
//! whose configuration keeps only the recognized compression options (see
//! [`CompressionConfig`]). The compressor offers four operations:
//!
//!  Operation | Result
//! -----------|-------
//!  [`create_gzip`](Compressor::create_gzip) | a [`GzipStream`] over one input
//!  [`create_zip`](Compressor::create_zip) | an unfinalized [`ArchiveStream`] over many inputs
//!  [`create_buff_gzip`](Compressor::create_buff_gzip) | a [`Buffered`] with the input, gzip compressed or raw
//!  [`create_buff_zip`](Compressor::create_buff_zip) | one [`Buffered`] archive, or one per raw input
//!
//! Buffered operations spawn their work on the current Tokio runtime.
//!
//! ```no_run
//! # async fn run() -> deflate_facility::Result<()> {
//! use bytes::Bytes;
//! use deflate_facility::{ArchiveEntry, ArchiveOptions, EntryMetadata, Facility};
//! use futures_util::stream;
//!
//! let mut facility = Facility::new(serde_json::json!({ "level": 6 }));
//! facility.start()?;
//!
//! let entry = ArchiveEntry::with_metadata(
//!     Box::pin(stream::iter(vec![Ok(Bytes::from_static(b"hello"))])),
//!     EntryMetadata::named("hello.txt"),
//! );
//! let mut buffers = facility
//!     .compressor()?
//!     .create_buff_zip(vec![entry], true, &ArchiveOptions::default());
//! let archive = buffers.remove(0).await?;
//! # let _ = archive;
//! # Ok(())
//! # }
//! ```
//!
//! [`Stream`]: futures_core::stream::Stream
//! [`io::Result`]: std::io::Result

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_copy_implementations,
    missing_debug_implementations
)]

use std::{io, pin::Pin};

use bytes::Bytes;
use futures_core::stream::Stream;

mod buffer;
mod codec;
pub mod config;
mod error;
mod facility;
pub mod stream;
mod util;

pub use crate::{
    buffer::{buffer_stream, Buffered},
    config::{ArchiveConfig, ArchiveOptions, CompressionConfig},
    error::{Error, Result},
    facility::{Compressor, Facility},
    stream::{ArchiveEntry, ArchiveStream, EntryMetadata, EntryStats, Finalizer, GzipStream},
};

/// A boxed byte stream, the input of an archive entry.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;
