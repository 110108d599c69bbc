use std::{
    io::{Error, Result},
    mem,
    pin::Pin,
    task::{Context, Poll},
};

use crate::codec::Encode;
use bytes::{Buf, Bytes, BytesMut};
use flate2::FlushCompress;
use futures_core::stream::Stream;
use pin_project_lite::pin_project;

#[derive(Debug)]
enum State {
    Failed(Error),
    WritingHeader,
    Reading,
    Writing,
    Finishing,
    WritingFooter,
    Done,
    Invalid,
}

pin_project! {
    #[derive(Debug)]
    pub struct Encoder<S, E> {
        #[pin]
        stream: S,
        encoder: Option<E>,
        state: State,
        flush: FlushCompress,
        chunk_size: usize,
        input: Bytes,
        output: BytesMut,
    }
}

impl<S: Stream<Item = Result<Bytes>>, E: Encode> Encoder<S, E> {
    /// An encoder that failed to build reports its error as the first item of the stream.
    pub(crate) fn new(
        stream: S,
        encoder: Result<E>,
        flush: FlushCompress,
        chunk_size: usize,
    ) -> Self {
        let (encoder, state) = match encoder {
            Ok(encoder) => (Some(encoder), State::WritingHeader),
            Err(err) => (None, State::Failed(err)),
        };

        Self {
            stream,
            encoder,
            state,
            flush,
            chunk_size,
            input: Bytes::new(),
            output: BytesMut::new(),
        }
    }
}

impl<S, E> Encoder<S, E> {
    pub(crate) fn get_ref(&self) -> &S {
        &self.stream
    }

    pub(crate) fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub(crate) fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut S> {
        self.project().stream
    }

    pub(crate) fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Stream<Item = Result<Bytes>>, E: Encode> Stream for Encoder<S, E> {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes>>> {
        let mut this = self.project();

        let encoder = match this.encoder.as_mut() {
            Some(encoder) => encoder,
            None => {
                return match mem::replace(this.state, State::Done) {
                    State::Failed(err) => Poll::Ready(Some(Err(err))),
                    _ => Poll::Ready(None),
                }
            }
        };

        loop {
            this.output.resize(*this.chunk_size, 0);

            let produced = match mem::replace(this.state, State::Invalid) {
                State::WritingHeader => {
                    let len = match encoder.write_header(this.output) {
                        Ok(len) => len,
                        Err(err) => {
                            *this.state = State::Done;
                            return Poll::Ready(Some(Err(err)));
                        }
                    };
                    *this.state = State::Reading;
                    len
                }

                State::Reading => {
                    *this.state = match this.stream.as_mut().poll_next(cx) {
                        Poll::Pending => {
                            *this.state = State::Reading;
                            return Poll::Pending;
                        }
                        Poll::Ready(Some(Ok(chunk))) if chunk.is_empty() => State::Reading,
                        Poll::Ready(Some(Ok(chunk))) => {
                            *this.input = chunk;
                            State::Writing
                        }
                        Poll::Ready(Some(Err(err))) => {
                            *this.state = State::Done;
                            return Poll::Ready(Some(Err(err)));
                        }
                        Poll::Ready(None) => State::Finishing,
                    };
                    continue;
                }

                State::Writing => {
                    let (consumed, produced) = match encoder.encode(
                        this.input,
                        this.output,
                        *this.flush,
                    ) {
                        Ok(result) => result,
                        Err(err) => {
                            *this.state = State::Done;
                            return Poll::Ready(Some(Err(err)));
                        }
                    };
                    this.input.advance(consumed);

                    // A full output buffer may still leave pending flushed data behind.
                    *this.state = if this.input.is_empty() && produced < this.output.len() {
                        State::Reading
                    } else {
                        State::Writing
                    };
                    produced
                }

                State::Finishing => {
                    let (done, produced) = match encoder.finish(this.output) {
                        Ok(result) => result,
                        Err(err) => {
                            *this.state = State::Done;
                            return Poll::Ready(Some(Err(err)));
                        }
                    };
                    *this.state = if done {
                        State::WritingFooter
                    } else {
                        State::Finishing
                    };
                    produced
                }

                State::WritingFooter => {
                    *this.state = State::Done;
                    match encoder.write_footer(this.output) {
                        Ok(len) => len,
                        Err(err) => return Poll::Ready(Some(Err(err))),
                    }
                }

                State::Done => return Poll::Ready(None),

                State::Failed(err) => {
                    *this.state = State::Done;
                    return Poll::Ready(Some(Err(err)));
                }

                State::Invalid => panic!("Encoder reached invalid state"),
            };

            if produced > 0 {
                return Poll::Ready(Some(Ok(this.output.split_to(produced).freeze())));
            }
        }
    }
}
