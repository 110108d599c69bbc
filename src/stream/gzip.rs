use std::{
    io::Result,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_core::stream::Stream;
use pin_project_lite::pin_project;

use crate::{codec, config::CompressionConfig};

pin_project! {
    /// A gzip encoder, or compressor.
    ///
    /// This structure implements a [`Stream`] interface and will read uncompressed data from an
    /// underlying stream and emit a stream of compressed data. Nothing is read until the stream
    /// is polled.
    ///
    /// Errors of the underlying stream are passed through as errors of this stream, after which
    /// it ends.
    #[derive(Debug)]
    pub struct GzipStream<S> {
        #[pin]
        inner: crate::stream::generic::Encoder<S, codec::GzipEncoder>,
    }
}

impl<S: Stream<Item = Result<Bytes>>> GzipStream<S> {
    /// Creates a new encoder which will read uncompressed data from the given stream and emit a
    /// compressed stream, using the default compression options.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, &CompressionConfig::default())
    }

    /// Creates a new encoder using the given compression options.
    ///
    /// Options the codec rejects are reported as the first item of the stream.
    pub fn with_config(stream: S, config: &CompressionConfig) -> Self {
        Self {
            inner: crate::stream::generic::Encoder::new(
                stream,
                codec::GzipEncoder::from_config(config),
                config.flate2_flush(),
                config.effective_chunk_size(),
            ),
        }
    }
}

impl<S> GzipStream<S> {
    /// Acquires a reference to the underlying stream that this encoder is wrapping.
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }

    /// Acquires a mutable reference to the underlying stream that this encoder is wrapping.
    ///
    /// Note that care must be taken to avoid tampering with the state of the stream which may
    /// otherwise confuse this encoder.
    pub fn get_mut(&mut self) -> &mut S {
        self.inner.get_mut()
    }

    /// Acquires a pinned mutable reference to the underlying stream that this encoder is
    /// wrapping.
    ///
    /// Note that care must be taken to avoid tampering with the state of the stream which may
    /// otherwise confuse this encoder.
    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut S> {
        self.project().inner.get_pin_mut()
    }

    /// Consumes this encoder returning the underlying stream.
    ///
    /// Note that this may discard internal state of this encoder, so care should be taken
    /// to avoid losing resources when this is called.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

impl<S: Stream<Item = Result<Bytes>>> Stream for GzipStream<S> {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes>>> {
        self.project().inner.poll_next(cx)
    }
}

const _: () = {
    fn _assert() {
        use crate::util::{_assert_send, _assert_sync};

        _assert_send::<GzipStream<Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>>>();
        _assert_sync::<GzipStream<Pin<Box<dyn Stream<Item = Result<Bytes>> + Sync>>>>();
    }
};

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{executor::block_on, stream, StreamExt, TryStreamExt};
    use std::io::{Error, ErrorKind, Read};

    fn collect<S: Stream<Item = Result<Bytes>>>(stream: S) -> Result<Vec<u8>> {
        block_on(
            stream
                .map_ok(|chunk| chunk.to_vec())
                .try_concat(),
        )
    }

    #[test]
    fn compresses_to_gzip() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::new()),
            Ok(Bytes::from_static(b"world")),
        ]);
        let compressed = collect(GzipStream::new(input)).unwrap();

        let mut output = String::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_string(&mut output)
            .unwrap();
        assert_eq!(output, "hello world");
    }

    #[test]
    fn small_chunks_bound_output() {
        let data = (0..20_000u32).map(|i| (i * 7919 % 251) as u8).collect::<Vec<_>>();
        let input = stream::iter(vec![Ok(Bytes::from(data.clone()))]);
        let config = CompressionConfig::default().chunk_size(64).flush(2);

        let chunks = block_on(GzipStream::with_config(input, &config).try_collect::<Vec<_>>())
            .unwrap();
        assert!(chunks.iter().all(|chunk| chunk.len() <= 64));

        let compressed = chunks.concat();
        let mut output = Vec::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_end(&mut output)
            .unwrap();
        assert_eq!(output, data);
    }

    #[test]
    fn invalid_config_is_first_item() {
        let input = stream::iter(vec![Ok(Bytes::from_static(b"data"))]);
        let config = CompressionConfig::default().window_bits(20);
        let mut gzip = GzipStream::with_config(input, &config);

        let err = block_on(gzip.try_next()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(block_on(gzip.try_next()).unwrap().is_none());
    }

    #[test]
    fn input_error_ends_stream() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"data")),
            Err(Error::new(ErrorKind::BrokenPipe, "gone")),
            Ok(Bytes::from_static(b"more")),
        ]);

        let err = collect(GzipStream::new(input)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn accessors_reach_the_input() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"skipped ")),
            Ok(Bytes::from_static(b"kept")),
        ]);
        let mut gzip = GzipStream::new(input);
        assert_eq!(gzip.get_ref().size_hint(), (2, Some(2)));

        let skipped = block_on(gzip.get_mut().next()).unwrap().unwrap();
        assert_eq!(&skipped[..], b"skipped ");
        assert_eq!(Pin::new(&mut gzip).get_pin_mut().size_hint(), (1, Some(1)));

        let compressed = collect(&mut gzip).unwrap();
        let mut output = String::new();
        flate2::read::GzDecoder::new(&compressed[..])
            .read_to_string(&mut output)
            .unwrap();
        assert_eq!(output, "kept");

        assert_eq!(gzip.into_inner().size_hint(), (0, Some(0)));
    }
}
