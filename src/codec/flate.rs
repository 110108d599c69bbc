use crate::codec::Encode;
use std::io::{Error, Result};

use flate2::{Compress, Compression, FlushCompress, Status};

/// Raw deflate, no framing of its own.
#[derive(Debug)]
pub struct FlateEncoder {
    compress: Compress,
}

impl FlateEncoder {
    pub(crate) fn new(level: Compression, window_bits: u8) -> Self {
        Self {
            compress: Compress::new_with_window_bits(level, false, window_bits),
        }
    }

    fn do_encode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushCompress,
    ) -> Result<(Status, usize, usize)> {
        let prior_in = self.compress.total_in();
        let prior_out = self.compress.total_out();

        let status = self
            .compress
            .compress(input, output, flush)
            .map_err(Error::other)?;

        let in_length = (self.compress.total_in() - prior_in) as usize;
        let out_length = (self.compress.total_out() - prior_out) as usize;

        Ok((status, in_length, out_length))
    }
}

impl Encode for FlateEncoder {
    fn write_header(&mut self, _output: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    fn encode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushCompress,
    ) -> Result<(usize, usize)> {
        let (status, in_length, out_length) = self.do_encode(input, output, flush)?;

        match status {
            // BufError only means no progress was possible, e.g. a repeated flush with no new
            // input, the caller moves on to the next chunk.
            Status::Ok | Status::BufError => Ok((in_length, out_length)),
            Status::StreamEnd => Err(Error::other(
                "deflate stream ended before input was finished",
            )),
        }
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<(bool, usize)> {
        let (status, _, out_length) = self.do_encode(&[], output, FlushCompress::Finish)?;

        match status {
            Status::Ok => Ok((false, out_length)),
            Status::StreamEnd => Ok((true, out_length)),
            Status::BufError => Err(Error::other("unexpected BufError")),
        }
    }

    fn write_footer(&mut self, _output: &mut [u8]) -> Result<usize> {
        Ok(0)
    }
}
