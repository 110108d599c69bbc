//! Draining byte streams into memory.

use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Bytes, BytesMut};
use futures_core::{ready, stream::Stream};
use futures_util::StreamExt;
use pin_project_lite::pin_project;
use tokio::sync::oneshot;

use crate::{Error, Result};

pin_project! {
    /// The eventual content of a buffered stream.
    ///
    /// Resolves once, to every chunk of the stream concatenated in arrival order, or to the first
    /// error the stream produced.
    #[derive(Debug)]
    #[must_use = "the buffered content is only available by awaiting this future"]
    pub struct Buffered {
        #[pin]
        receiver: oneshot::Receiver<Result<Bytes>>,
    }
}

impl Future for Buffered {
    type Output = Result<Bytes>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let result = ready!(self.project().receiver.poll(cx));
        Poll::Ready(result.unwrap_or(Err(Error::BufferingAborted)))
    }
}

/// Starts draining `stream` into a single buffer.
///
/// The stream is consumed by a task spawned on the current Tokio runtime, so reading begins
/// immediately rather than when the returned future is first polled. Anything buffered before an
/// error is discarded.
///
/// # Panics
///
/// Panics if called outside of a Tokio runtime.
pub fn buffer_stream<S>(stream: S) -> Buffered
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();

    tokio::spawn(async move {
        let result = drain(stream).await;
        match &result {
            Ok(bytes) => tracing::trace!(len = bytes.len(), "buffered stream ended"),
            Err(err) => tracing::trace!(error = %err, "buffered stream failed"),
        }
        // The caller may have dropped the future, nobody is left to tell.
        let _ = sender.send(result);
    });

    Buffered { receiver }
}

async fn drain<S>(stream: S) -> Result<Bytes>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    futures_util::pin_mut!(stream);

    let mut fragments = Vec::new();
    while let Some(chunk) = stream.next().await {
        fragments.push(chunk?);
    }

    Ok(concat(fragments))
}

fn concat(fragments: Vec<Bytes>) -> Bytes {
    match fragments.len() {
        0 => Bytes::new(),
        1 => fragments.into_iter().next().unwrap_or_default(),
        _ => {
            let len = fragments.iter().map(Bytes::len).sum();
            let mut buffer = BytesMut::with_capacity(len);
            for fragment in &fragments {
                buffer.extend_from_slice(fragment);
            }
            buffer.freeze()
        }
    }
}
