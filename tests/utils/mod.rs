#![allow(unused)] // Different tests use a different subset of functions

use std::io::{self, Cursor, Read};

use bytes::Bytes;
use deflate_facility::{ArchiveEntry, ByteStream, EntryMetadata};
use futures::stream::{self, Stream, StreamExt as _};
use futures_test::stream::StreamTestExt as _;
use proptest_derive::Arbitrary;

#[derive(Arbitrary, Debug, Clone)]
pub struct InputStream(Vec<Vec<u8>>);

impl InputStream {
    pub fn stream(&self) -> impl Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static {
        // The resulting stream here will interleave empty chunks before and after each chunk, and
        // then interleave a `Poll::Pending` between each yielded chunk, that way we test the
        // handling of these two conditions in every point of the tested stream.
        stream::iter(
            self.0
                .clone()
                .into_iter()
                .flat_map(|bytes| vec![vec![], bytes])
                .chain(Some(vec![]))
                .map(Bytes::from)
                .map(Ok),
        )
        .interleave_pending()
    }

    pub fn boxed(&self) -> ByteStream {
        Box::pin(self.stream())
    }

    pub fn entry(&self) -> ArchiveEntry {
        ArchiveEntry::new(self.boxed())
    }

    pub fn named(&self, name: &str) -> ArchiveEntry {
        ArchiveEntry::with_metadata(self.boxed(), EntryMetadata::named(name))
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.iter().flatten().cloned().collect()
    }
}

impl From<Vec<Vec<u8>>> for InputStream {
    fn from(input: Vec<Vec<u8>>) -> InputStream {
        InputStream(input)
    }
}

impl From<&str> for InputStream {
    fn from(input: &str) -> InputStream {
        InputStream(vec![input.as_bytes().to_vec()])
    }
}

impl From<&[&str]> for InputStream {
    fn from(input: &[&str]) -> InputStream {
        InputStream(input.iter().map(|chunk| chunk.as_bytes().to_vec()).collect())
    }
}

/// A stream yielding `chunks` and then failing with `kind`.
pub fn failing(chunks: &[&str], kind: io::ErrorKind) -> ByteStream {
    let items = chunks
        .iter()
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk.as_bytes())))
        .chain(Some(Err(io::Error::new(kind, "input failed"))))
        .collect::<Vec<_>>();
    Box::pin(stream::iter(items).interleave_pending())
}

pub fn gzip_decompress(bytes: &[u8]) -> Vec<u8> {
    let mut output = vec![];
    flate2::read::GzDecoder::new(bytes)
        .read_to_end(&mut output)
        .unwrap();
    output
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnzippedEntry {
    pub name: String,
    pub contents: Vec<u8>,
    pub stored: bool,
    pub mode: Option<u32>,
}

pub fn unzip(bytes: &[u8]) -> Vec<UnzippedEntry> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).unwrap();
            let mut contents = vec![];
            file.read_to_end(&mut contents).unwrap();
            UnzippedEntry {
                name: file.name().to_owned(),
                contents,
                stored: file.compression() == zip::CompressionMethod::Stored,
                mode: file.unix_mode(),
            }
        })
        .collect()
}

pub fn names(bytes: &[u8]) -> Vec<String> {
    unzip(bytes).into_iter().map(|entry| entry.name).collect()
}

pub async fn drain(stream: impl Stream<Item = io::Result<Bytes>>) -> io::Result<Vec<u8>> {
    futures::pin_mut!(stream);
    let mut output = vec![];
    while let Some(chunk) = stream.next().await {
        output.extend_from_slice(&chunk?);
    }
    Ok(output)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
