mod utils;

use std::io::ErrorKind;

use deflate_facility::{CompressionConfig, Compressor, Error, GzipStream};
use futures::{executor::block_on, TryStreamExt};
use utils::{drain, failing, gzip_decompress, InputStream};

/// Splits the input bytes into the first 10 bytes, the rest and the last 8 bytes, taking apart the
/// 3 parts of compressed gzip data.
fn split(mut input: Vec<u8>) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    assert!(input.len() >= 18);

    let mut body = input.split_off(10);
    let header = input;
    let footer = body.split_off(body.len() - 8);

    (header, body, footer)
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_empty() {
    let input = InputStream::from(vec![]);
    let compressed = block_on(drain(GzipStream::new(input.stream()))).unwrap();

    let (header, _, footer) = split(compressed.clone());
    assert_eq!(&header[..3], &[0x1f, 0x8b, 0x08]);
    assert_eq!(footer, [0; 8]);
    assert_eq!(gzip_decompress(&compressed), b"");
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_short() {
    let input = InputStream::from(vec![vec![1, 2, 3], vec![4, 5, 6]]);
    let compressed = block_on(drain(GzipStream::new(input.stream()))).unwrap();

    assert_eq!(gzip_decompress(&compressed), &[1, 2, 3, 4, 5, 6][..]);
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_long() {
    let input = InputStream::from(vec![
        Vec::from_iter((0..32_768).map(|_| rand::random())),
        Vec::from_iter((0..32_768).map(|_| rand::random())),
    ]);
    let compressed = block_on(drain(GzipStream::new(input.stream()))).unwrap();

    assert_eq!(gzip_decompress(&compressed), input.bytes());
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_sync_flush_yields_per_chunk() {
    let input = InputStream::from(vec![b"first".to_vec(), b"second".to_vec()]);
    let config = CompressionConfig::default().flush(2);

    let chunks =
        block_on(GzipStream::with_config(input.stream(), &config).try_collect::<Vec<_>>()).unwrap();
    // Header, one flushed block per input chunk, the final block and the footer.
    assert!(chunks.len() >= 4);
    assert_eq!(gzip_decompress(&chunks.concat()), b"firstsecond");
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_small_window() {
    let data = b"abcabcabc".repeat(500);
    let input = InputStream::from(vec![data.clone()]);
    let config = CompressionConfig::default().window_bits(8).level(1);

    let compressed = block_on(drain(GzipStream::with_config(input.stream(), &config))).unwrap();
    assert_eq!(compressed[8], 0x04);
    assert_eq!(gzip_decompress(&compressed), data);
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_input_error_surfaces() {
    let err = block_on(drain(GzipStream::new(failing(&["abc"], ErrorKind::TimedOut)))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TimedOut);
}

#[test]
#[ntest::timeout(1000)]
fn gzip_stream_rejects_bad_level() {
    let input = InputStream::from("data");
    let config = CompressionConfig::default().level(42);

    let err = block_on(drain(GzipStream::with_config(input.stream(), &config))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn create_gzip_merges_overrides() {
    let compressor = Compressor::new(CompressionConfig::default().level(1));
    let input = InputStream::from("merge me");

    let fast = drain(compressor.create_gzip(input.stream(), &CompressionConfig::default()))
        .await
        .unwrap();
    assert_eq!(fast[8], 0x04);

    let best = drain(compressor.create_gzip(input.stream(), &CompressionConfig::default().level(9)))
        .await
        .unwrap();
    assert_eq!(best[8], 0x02);

    assert_eq!(gzip_decompress(&fast), gzip_decompress(&best));
}

#[tokio::test]
async fn buffered_gzip_is_smaller_than_raw() {
    let compressor = Compressor::default();
    let input = InputStream::from("a".repeat(1000).as_str());

    let raw = compressor.create_buff_gzip(input.stream(), false, &CompressionConfig::default());
    let gzip = compressor.create_buff_gzip(input.stream(), true, &CompressionConfig::default());

    let raw = raw.await.unwrap();
    let gzip = gzip.await.unwrap();

    assert_eq!(raw.len(), 1000);
    assert!(gzip.len() < 100, "compressed to {} bytes", gzip.len());
    assert_eq!(gzip_decompress(&gzip), raw.to_vec());
}

#[tokio::test]
async fn buffered_gzip_rejects_on_input_error() {
    let compressor = Compressor::default();

    let result = compressor
        .create_buff_gzip(
            failing(&["some", "data"], ErrorKind::UnexpectedEof),
            true,
            &CompressionConfig::default(),
        )
        .await;

    assert!(matches!(result, Err(Error::Io(err)) if err.kind() == ErrorKind::UnexpectedEof));
}
